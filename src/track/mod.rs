//! Track geometry: sections fitted through control points and the chained track.
//!
//! A `TrackSection` is addressed by a local parameter over its control point
//! indices. `CoasterTrack` concatenates the local domains into one global
//! parameter and keeps neighbouring sections continuous.

mod coaster_track;
mod control;
mod description;
mod sampling;
mod section;

pub use coaster_track::CoasterTrack;
pub use control::{sanitize_roll_nodes, ControlPoint, RollNode, ROLL_MERGE_DISTANCE};
pub use description::TrackDescription;
pub use sampling::{sample_at_arc, sample_section, support_positions, SplinePoint};
pub use section::{RollMode, TrackSection, ARC_STEPS};
