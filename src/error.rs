//! Error types for fitting, editing and signaling.

use thiserror::Error;

/// Result type alias for curve fitting.
pub type SplineResult<T> = Result<T, SplineError>;

/// Result type alias for track edits.
pub type EditResult<T> = Result<T, EditError>;

/// Result type alias for block signaling setup.
pub type SignalResult<T> = Result<T, SignalError>;

/// Rejected input to a 1-D curve fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SplineError {
    /// Parameter and value slices differ in length.
    #[error("parameter/value length mismatch: {params} parameters, {values} values")]
    LengthMismatch { params: usize, values: usize },

    /// Parameters must be strictly increasing.
    #[error("parameters not strictly increasing at index {index}")]
    NonIncreasing { index: usize },

    /// A sample is NaN or infinite.
    #[error("non-finite sample at index {index}")]
    NonFinite { index: usize },
}

/// A malformed edit, rejected before any state was touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    /// Index outside the addressed list.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The edit would leave fewer control points than a section needs.
    #[error("a section needs at least {min} control points")]
    TooFewPoints { min: usize },

    /// Roll node parameter outside the section domain.
    #[error("roll node parameter {t} outside [0, {max}]")]
    ParameterOutOfDomain { t: f32, max: f32 },

    /// Roll node would break the increasing parameter order.
    #[error("roll node parameter {t} not between its neighbours")]
    RollOrder { t: f32 },

    /// A coordinate, weight or angle is NaN or infinite.
    #[error("non-finite value in edit")]
    NonFinite,

    /// Splitting is only possible at interior control points.
    #[error("cannot split at control point {index}, interior points are 1..{last}")]
    SplitAtBoundary { index: usize, last: usize },
}

impl EditError {
    /// Creates an index out of range error.
    #[must_use]
    pub const fn out_of_range(index: usize, len: usize) -> Self {
        Self::IndexOutOfRange { index, len }
    }
}

/// Invalid block layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// No block sections were given.
    #[error("block ring is empty")]
    EmptyRing,

    /// A block section references a track section that does not exist.
    #[error("block {block} references unknown track section {section}")]
    UnknownSection { block: usize, section: usize },

    /// A block section owns no track sections.
    #[error("block {block} has no track sections")]
    EmptyBlock { block: usize },

    /// A track section belongs to no block or to several.
    #[error("track section {section} is covered {count} times, expected exactly once")]
    Coverage { section: usize, count: usize },
}
