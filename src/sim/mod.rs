//! Math and physics primitives shared by the track and train layers.
//!
//! This module has no dependencies on the rest of the crate.

mod frame;
mod math;
mod physics_params;

pub mod physics;

pub use frame::{Frame, Pose};
pub use math::{Float3, Matrix3, Quaternion};
pub use physics::{EPSILON, G};
pub use physics_params::{SectionPhysics, TrainParams};
