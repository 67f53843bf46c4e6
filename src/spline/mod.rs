//! One-dimensional curve fitting.
//!
//! A track section is three independent `Curve1D` fits (x, y, z) over the same
//! integer-spaced parameter, plus one more for the bank angle. Two strategies
//! exist: a plain cubic spline, and a NURBS build that is re-sampled into a
//! cubic so that repeated queries stay cheap.

mod cubic;
mod nurbs;

pub use cubic::CubicSpline;
pub use nurbs::{KnotType, NurbsCurve, NurbsSpline};

use crate::error::{SplineError, SplineResult};

/// A fitted scalar function of one parameter.
pub trait Curve1D {
    /// Fits the curve through `(params[i], values[i])`.
    ///
    /// `None` slopes leave the end natural (zero curvature), `Some` clamps the
    /// first derivative. Fewer than two samples fit a constant.
    fn fit(
        &mut self,
        params: &[f32],
        values: &[f32],
        start_slope: Option<f32>,
        end_slope: Option<f32>,
    ) -> SplineResult<()>;

    fn eval(&self, t: f32) -> f32;

    fn eval_slope(&self, t: f32) -> f32;
}

/// Fitting strategy used for a section's position curves.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SplineKind {
    #[default]
    Cubic,
    Nurbs,
}

/// Tagged union over the available strategies.
#[derive(Debug, Clone)]
pub enum Spline {
    Cubic(CubicSpline),
    Nurbs(NurbsSpline),
}

impl Spline {
    pub fn new(kind: SplineKind) -> Self {
        match kind {
            SplineKind::Cubic => Self::Cubic(CubicSpline::new()),
            SplineKind::Nurbs => Self::Nurbs(NurbsSpline::new()),
        }
    }

    pub fn kind(&self) -> SplineKind {
        match self {
            Self::Cubic(_) => SplineKind::Cubic,
            Self::Nurbs(_) => SplineKind::Nurbs,
        }
    }

    /// Per-sample weights, only honoured by the NURBS strategy.
    pub fn set_weights(&mut self, weights: &[f32]) {
        if let Self::Nurbs(spline) = self {
            spline.set_weights(weights);
        }
    }
}

impl Curve1D for Spline {
    fn fit(
        &mut self,
        params: &[f32],
        values: &[f32],
        start_slope: Option<f32>,
        end_slope: Option<f32>,
    ) -> SplineResult<()> {
        match self {
            Self::Cubic(s) => s.fit(params, values, start_slope, end_slope),
            Self::Nurbs(s) => s.fit(params, values, start_slope, end_slope),
        }
    }

    fn eval(&self, t: f32) -> f32 {
        match self {
            Self::Cubic(s) => s.eval(t),
            Self::Nurbs(s) => s.eval(t),
        }
    }

    fn eval_slope(&self, t: f32) -> f32 {
        match self {
            Self::Cubic(s) => s.eval_slope(t),
            Self::Nurbs(s) => s.eval_slope(t),
        }
    }
}

/// Validates sample arrays shared by every strategy.
pub(crate) fn check_samples(params: &[f32], values: &[f32]) -> SplineResult<()> {
    if params.len() != values.len() {
        return Err(SplineError::LengthMismatch {
            params: params.len(),
            values: values.len(),
        });
    }
    for (index, (x, y)) in params.iter().zip(values).enumerate() {
        if !x.is_finite() || !y.is_finite() {
            return Err(SplineError::NonFinite { index });
        }
        if index > 0 && *x <= params[index - 1] {
            return Err(SplineError::NonIncreasing { index });
        }
    }
    Ok(())
}
