use super::{check_samples, CubicSpline, Curve1D};
use crate::error::SplineResult;

const MAX_DEGREE: usize = 3;
/// Re-sampled points per input sample when converting to a cubic.
const OVERSAMPLING: usize = 4;

/// Knot vector layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KnotType {
    /// Evenly spaced knots, the curve does not touch its end control values.
    Uniform,
    /// Clamped knots, the curve starts and ends on its end control values.
    #[default]
    OpenUniform,
}

/// Scalar rational B-spline over control values.
#[derive(Debug, Clone)]
pub struct NurbsCurve {
    degree: usize,
    values: Vec<f32>,
    weights: Vec<f32>,
    knots: Vec<f32>,
}

impl NurbsCurve {
    /// Builds a curve of at most `degree`, lowered to fit the control count.
    ///
    /// Weights of the wrong length are ignored and treated as all 1.
    pub fn new(values: Vec<f32>, weights: &[f32], degree: usize, knot_type: KnotType) -> Self {
        let count = values.len();
        let degree = degree.min(count.saturating_sub(1)).max(1);
        let weights = if weights.len() == count {
            weights.to_vec()
        } else {
            vec![1.0; count]
        };
        let knots = Self::knot_vector(degree, count, knot_type);
        Self {
            degree,
            values,
            weights,
            knots,
        }
    }

    /// Knot vector of length `count + degree + 1` over `[0, 1]`.
    pub fn knot_vector(degree: usize, count: usize, knot_type: KnotType) -> Vec<f32> {
        let len = count + degree + 1;
        match knot_type {
            KnotType::Uniform => {
                let last = (len - 1) as f32;
                (0..len).map(|j| j as f32 / last).collect()
            }
            KnotType::OpenUniform => (0..len)
                .map(|j| {
                    if j <= degree {
                        0.0
                    } else if j >= count {
                        1.0
                    } else {
                        (j - degree) as f32 / (count - degree) as f32
                    }
                })
                .collect(),
        }
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &[f32] {
        &self.knots
    }

    /// Valid parameter range of the knot vector.
    pub fn domain(&self) -> (f32, f32) {
        if self.values.len() < 2 {
            return (0.0, 1.0);
        }
        (self.knots[self.degree], self.knots[self.values.len()])
    }

    fn find_span(&self, u: f32) -> usize {
        let n = self.values.len() - 1;
        let p = self.degree;

        if u >= self.knots[n + 1] {
            return n;
        }
        if u <= self.knots[p] {
            return p;
        }

        let mut low = p;
        let mut high = n + 1;
        let mut mid = (low + high) / 2;
        while u < self.knots[mid] || u >= self.knots[mid + 1] {
            if u < self.knots[mid] {
                high = mid;
            } else {
                low = mid;
            }
            mid = (low + high) / 2;
        }
        mid
    }

    fn basis_functions(&self, span: usize, u: f32) -> Vec<f32> {
        let p = self.degree;
        let mut basis = vec![0.0; p + 1];
        let mut left = vec![0.0; p + 1];
        let mut right = vec![0.0; p + 1];

        basis[0] = 1.0;
        for j in 1..=p {
            left[j] = u - self.knots[span + 1 - j];
            right[j] = self.knots[span + j] - u;
            let mut saved = 0.0;
            for r in 0..j {
                let denom = right[r + 1] + left[j - r];
                let temp = if denom == 0.0 { 0.0 } else { basis[r] / denom };
                basis[r] = saved + right[r + 1] * temp;
                saved = left[j - r] * temp;
            }
            basis[j] = saved;
        }
        basis
    }

    /// Evaluates at normalized `nt` in `[0, 1]`, mapped onto the domain.
    pub fn evaluate(&self, nt: f32) -> f32 {
        match self.values.len() {
            0 => return 0.0,
            1 => return self.values[0],
            _ => {}
        }

        let (lo, hi) = self.domain();
        let u = lo + nt.clamp(0.0, 1.0) * (hi - lo);
        let span = self.find_span(u);
        let basis = self.basis_functions(span, u);
        let p = self.degree;

        let mut weighted = 0.0;
        let mut w_sum = 0.0;
        for (i, b) in basis.iter().enumerate() {
            let idx = span - p + i;
            let bw = b * self.weights[idx];
            weighted += self.values[idx] * bw;
            w_sum += bw;
        }
        if w_sum.abs() < f32::EPSILON {
            return self.values[span];
        }
        weighted / w_sum
    }
}

/// NURBS shaped curve, re-sampled into a cubic spline for evaluation.
///
/// The samples become control values of an open-uniform curve, which passes
/// through the first and last sample. A start slope pulls the second control
/// value towards `y0 + slope`, an end slope the second to last towards
/// `y_last - slope`. The NURBS is sampled `4 * n` times and a cubic is fitted
/// through the samples, clamped where a slope is given and natural elsewhere.
#[derive(Debug, Clone, Default)]
pub struct NurbsSpline {
    weights: Vec<f32>,
    fitted: CubicSpline,
}

impl NurbsSpline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weights for the next fit, one per sample.
    pub fn set_weights(&mut self, weights: &[f32]) {
        self.weights = weights.to_vec();
    }

    fn control_values(values: &[f32], start_slope: Option<f32>, end_slope: Option<f32>) -> Vec<f32> {
        let n = values.len();
        let mut control = values.to_vec();
        if n < 3 {
            return control;
        }

        let first = values[0];
        let last = values[n - 1];
        match (start_slope, end_slope) {
            // both slopes compete for the single interior value
            (Some(s), Some(e)) if n == 3 => control[1] = 0.5 * ((first + s) + (last - e)),
            (s, e) => {
                if let Some(s) = s {
                    control[1] = first + s;
                }
                if let Some(e) = e {
                    control[n - 2] = last - e;
                }
            }
        }
        control
    }
}

impl Curve1D for NurbsSpline {
    fn fit(
        &mut self,
        params: &[f32],
        values: &[f32],
        start_slope: Option<f32>,
        end_slope: Option<f32>,
    ) -> SplineResult<()> {
        check_samples(params, values)?;

        let n = params.len();
        if n < 2 {
            return self.fitted.fit(params, values, None, None);
        }

        let control = Self::control_values(values, start_slope, end_slope);
        let curve = NurbsCurve::new(control, &self.weights, MAX_DEGREE, KnotType::OpenUniform);

        let x0 = params[0];
        let span = params[n - 1] - x0;
        let samples = OVERSAMPLING * n;
        let mut xs = Vec::with_capacity(samples);
        let mut ys = Vec::with_capacity(samples);
        for i in 0..samples {
            let nt = i as f32 / (samples - 1) as f32;
            xs.push(x0 + nt * span);
            ys.push(if i == samples - 1 {
                values[n - 1]
            } else {
                curve.evaluate(nt)
            });
        }

        self.fitted.fit(&xs, &ys, start_slope, end_slope)?;

        log::trace!(
            "fitted nurbs degree {} through {n} samples, resampled to {samples}",
            curve.degree()
        );
        Ok(())
    }

    fn eval(&self, t: f32) -> f32 {
        self.fitted.eval(t)
    }

    fn eval_slope(&self, t: f32) -> f32 {
        self.fitted.eval_slope(t)
    }
}
