/// Shared track geometry settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackDescription {
    /// Distance from the spline down to the rider reference point.
    pub heartline_offset: f32,
    pub track_width: f32,
    /// Arc length covered by one mesh piece, used by `sample_section`.
    pub mesh_length: f32,
}

impl TrackDescription {
    pub const DEFAULT: Self = Self {
        heartline_offset: 0.75,
        track_width: 1.0,
        mesh_length: 1.0,
    };

    pub fn new(heartline_offset: f32, track_width: f32, mesh_length: f32) -> Self {
        Self {
            heartline_offset,
            track_width,
            mesh_length,
        }
    }
}

impl Default for TrackDescription {
    fn default() -> Self {
        Self::DEFAULT
    }
}
