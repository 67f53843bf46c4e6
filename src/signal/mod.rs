//! Block signaling: the ring of blocks, its occupancy and the controller that
//! stops and releases trains through the sections' physics commands.

mod block;
mod controller;
mod sensor;

pub use block::{BlockRing, BlockSection, BlockState, Occupancy};
pub use controller::{BlockController, SignalConfig, SignalListener};
pub use sensor::{auto_place_sensors, sensors_in_window, sort_sensors, SensorEvent, SensorKind};
