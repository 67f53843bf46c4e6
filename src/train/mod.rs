//! Vehicles: axle placement by arc length and the per-tick force integration.

mod axle;
mod dynamics;

pub use axle::Axle;
pub use dynamics::Train;
