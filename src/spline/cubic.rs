use super::{check_samples, Curve1D};
use crate::error::SplineResult;

/// Interpolating cubic spline stored as knot values plus second derivatives.
///
/// Each end is either natural (zero curvature) or clamped to a given slope.
/// Queries outside the knot range extrapolate with the end segment's cubic.
#[derive(Debug, Clone, Default)]
pub struct CubicSpline {
    xs: Vec<f32>,
    ys: Vec<f32>,
    ms: Vec<f32>,
}

impl CubicSpline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Parameter range covered by the knots, `(0, 0)` when unfitted.
    pub fn domain(&self) -> (f32, f32) {
        match (self.xs.first(), self.xs.last()) {
            (Some(&a), Some(&b)) => (a, b),
            _ => (0.0, 0.0),
        }
    }

    fn segment(&self, t: f32) -> usize {
        let n = self.xs.len();
        self.xs
            .partition_point(|&x| x <= t)
            .saturating_sub(1)
            .min(n - 2)
    }
}

impl Curve1D for CubicSpline {
    fn fit(
        &mut self,
        params: &[f32],
        values: &[f32],
        start_slope: Option<f32>,
        end_slope: Option<f32>,
    ) -> SplineResult<()> {
        check_samples(params, values)?;

        self.xs = params.to_vec();
        self.ys = values.to_vec();
        let n = params.len();
        if n < 2 {
            self.ms = vec![0.0; n];
            return Ok(());
        }

        let h: Vec<f32> = params.windows(2).map(|w| w[1] - w[0]).collect();
        let secant = |i: usize| (values[i + 1] - values[i]) / h[i];

        // tridiagonal system: sub, diag, sup, rhs
        let mut sub = vec![0.0; n];
        let mut diag = vec![1.0; n];
        let mut sup = vec![0.0; n];
        let mut rhs = vec![0.0; n];

        if let Some(s) = start_slope {
            diag[0] = 2.0 * h[0];
            sup[0] = h[0];
            rhs[0] = 6.0 * (secant(0) - s);
        }
        for i in 1..n - 1 {
            sub[i] = h[i - 1];
            diag[i] = 2.0 * (h[i - 1] + h[i]);
            sup[i] = h[i];
            rhs[i] = 6.0 * (secant(i) - secant(i - 1));
        }
        if let Some(s) = end_slope {
            sub[n - 1] = h[n - 2];
            diag[n - 1] = 2.0 * h[n - 2];
            rhs[n - 1] = 6.0 * (s - secant(n - 2));
        }

        // Thomas algorithm, the system is diagonally dominant
        for i in 1..n {
            let w = sub[i] / diag[i - 1];
            diag[i] -= w * sup[i - 1];
            rhs[i] -= w * rhs[i - 1];
        }
        let mut ms = vec![0.0; n];
        ms[n - 1] = rhs[n - 1] / diag[n - 1];
        for i in (0..n - 1).rev() {
            ms[i] = (rhs[i] - sup[i] * ms[i + 1]) / diag[i];
        }

        self.ms = ms;
        log::trace!("fitted cubic spline through {n} samples");
        Ok(())
    }

    fn eval(&self, t: f32) -> f32 {
        match self.xs.len() {
            0 => 0.0,
            1 => self.ys[0],
            _ => {
                let i = self.segment(t);
                let h = self.xs[i + 1] - self.xs[i];
                let a = (self.xs[i + 1] - t) / h;
                let b = (t - self.xs[i]) / h;
                a * self.ys[i]
                    + b * self.ys[i + 1]
                    + ((a * a * a - a) * self.ms[i] + (b * b * b - b) * self.ms[i + 1]) * h * h
                        / 6.0
            }
        }
    }

    fn eval_slope(&self, t: f32) -> f32 {
        if self.xs.len() < 2 {
            return 0.0;
        }
        let i = self.segment(t);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - t) / h;
        let b = (t - self.xs[i]) / h;
        (self.ys[i + 1] - self.ys[i]) / h
            + ((1.0 - 3.0 * a * a) * self.ms[i] + (3.0 * b * b - 1.0) * self.ms[i + 1]) * h / 6.0
    }
}
