//! Coaster engine - spline-based roller coaster tracks, train physics and block signaling.
//!
//! # Architecture
//!
//! Layered modules with strict inward-only dependencies:
//!
//! - **sim**: Math and physics primitives (Float3, Frame, Pose, section drives)
//! - **spline**: 1-D curve fitting (cubic, NURBS)
//! - **track**: Track sections and the combined coaster track
//! - **train**: Axles, placement and per-tick physics
//! - **signal**: Block sections, sensors and the block controller
//! - **coaster**: One track, its trains and its controller ticked together
//!
//! # Usage
//!
//! ```ignore
//! use coaster_engine::{Coaster, CoasterTrack, TrackDescription};
//! ```

pub mod coaster;
pub mod error;
pub mod signal;
pub mod sim;
pub mod spline;
pub mod track;
pub mod train;

// Re-export commonly used types at crate root
pub use coaster::Coaster;
pub use error::{EditError, SignalError, SplineError};
pub use signal::{
    BlockController, BlockRing, BlockSection, BlockState, Occupancy, SensorEvent, SensorKind,
    SignalConfig, SignalListener,
};
pub use sim::{Float3, Frame, Pose, Quaternion, SectionPhysics, TrainParams};
pub use track::{CoasterTrack, ControlPoint, RollNode, TrackDescription, TrackSection};
pub use train::{Axle, Train};
