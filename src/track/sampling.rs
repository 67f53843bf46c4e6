use super::section::TrackSection;
use crate::sim::{Float3, Frame, Pose};

/// A section sample tagged with its arc-length position and local parameter.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SplinePoint {
    pub arc: f32,
    pub t: f32,
    pub position: Float3,
    pub direction: Float3,
    pub normal: Float3,
    pub lateral: Float3,
}

impl SplinePoint {
    pub const fn new(
        arc: f32,
        t: f32,
        position: Float3,
        direction: Float3,
        normal: Float3,
        lateral: Float3,
    ) -> Self {
        Self {
            arc,
            t,
            position,
            direction,
            normal,
            lateral,
        }
    }

    pub fn from_pose(arc: f32, t: f32, pose: Pose) -> Self {
        Self::new(
            arc,
            t,
            pose.position,
            pose.frame.direction,
            pose.frame.normal,
            pose.frame.lateral,
        )
    }

    pub fn pose(&self) -> Pose {
        Pose::new(
            self.position,
            Frame::new(self.direction, self.normal, self.lateral),
        )
    }

    pub const DEFAULT: Self = Self::new(
        0.0,
        0.0,
        Float3::ZERO,
        Float3::FORWARD,
        Float3::UP,
        Float3::RIGHT,
    );
}

impl Default for SplinePoint {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Samples a section at even arc-length spacing, the rider pose at each sample.
///
/// The spacing is stretched so a whole number of pieces covers the section,
/// the last sample lands exactly on the section end. Returns `pieces + 1`
/// points, or nothing for a zero-length section or non-positive spacing.
pub fn sample_section(section: &TrackSection, spacing: f32) -> Vec<SplinePoint> {
    let length = section.arc_length();
    if !(spacing > 0.0) || !(length > 0.0) {
        return Vec::new();
    }

    let pieces = ((length / spacing) as usize).max(1);
    let piece = length / pieces as f32;
    let t_max = section.t_max();

    let mut result = Vec::with_capacity(pieces + 1);
    result.push(SplinePoint::from_pose(0.0, 0.0, section.pose(0.0)));

    let mut t = 0.0;
    for i in 0..pieces {
        t = if i == pieces - 1 {
            t_max
        } else {
            (t + section.delta_param_for_arc_length(t, piece)).min(t_max)
        };
        let arc = piece * (i + 1) as f32;
        result.push(SplinePoint::from_pose(arc, t, section.pose(t)));
    }
    result
}

/// Evenly spaced support positions, `distance` metres apart, centred on the
/// section after skipping `offset` metres at its start.
pub fn support_positions(section: &TrackSection, distance: f32, offset: f32) -> Vec<SplinePoint> {
    let usable = section.arc_length() - offset;
    if !(distance > 0.0) || !(usable > 0.0) {
        return Vec::new();
    }

    let count = (usable / distance) as usize;
    if count == 0 {
        return Vec::new();
    }
    let slack = usable - count as f32 * distance;
    let first = offset.max(0.0) + (slack + distance) * 0.5;

    let t_max = section.t_max();
    let mut t = section.delta_param_for_arc_length(0.0, first);
    let mut result = Vec::with_capacity(count);
    for i in 0..count {
        if t > t_max {
            break;
        }
        let arc = first + i as f32 * distance;
        result.push(SplinePoint::from_pose(arc, t, section.pose(t)));
        t += section.delta_param_for_arc_length(t, distance);
    }
    result
}

/// Interpolates between samples at the given arc position.
///
/// Clamps to the end samples and renormalizes the frame vectors.
pub fn sample_at_arc(points: &[SplinePoint], arc: f32) -> Option<SplinePoint> {
    let first = points.first()?;
    let last = points.len() - 1;

    if arc <= first.arc {
        return Some(SplinePoint { arc, ..*first });
    }
    if arc >= points[last].arc {
        return Some(SplinePoint {
            arc,
            ..points[last]
        });
    }

    let mut lo = 0usize;
    let mut hi = last;
    while lo < hi - 1 {
        let mid = (lo + hi) / 2;
        if points[mid].arc <= arc {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let a = &points[lo];
    let b = &points[lo + 1];
    let seg_len = b.arc - a.arc;
    let f = if seg_len > 0.0 {
        (arc - a.arc) / seg_len
    } else {
        0.0
    };

    Some(SplinePoint::new(
        arc,
        a.t + (b.t - a.t) * f,
        a.position.lerp(b.position, f),
        a.direction.lerp(b.direction, f).normalize_or(a.direction),
        a.normal.lerp(b.normal, f).normalize_or(a.normal),
        a.lateral.lerp(b.lateral, f).normalize_or(a.lateral),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TOLERANCE: f32 = 1e-3;

    fn straight(len: f32) -> TrackSection {
        TrackSection::new(vec![Float3::ZERO, Float3::new(0.0, 0.0, len)])
            .with_heartline_offset(0.0)
            .fitted()
    }

    fn curve() -> TrackSection {
        TrackSection::new(vec![
            Float3::ZERO,
            Float3::new(0.0, 1.0, 6.0),
            Float3::new(4.0, 2.0, 10.0),
            Float3::new(10.0, 2.0, 12.0),
        ])
        .fitted()
    }

    #[test]
    fn sample_straight_section_evenly() {
        let samples = sample_section(&straight(10.0), 2.5);
        assert_eq!(samples.len(), 5);
        for (i, s) in samples.iter().enumerate() {
            assert_relative_eq!(s.arc, 2.5 * i as f32, epsilon = TOLERANCE);
            assert_relative_eq!(s.position.z, 2.5 * i as f32, epsilon = TOLERANCE);
        }
        assert_eq!(samples[4].t, 1.0);
    }

    #[test]
    fn spacing_is_stretched_to_fit() {
        let samples = sample_section(&straight(10.0), 3.0);
        assert_eq!(samples.len(), 4);
        assert_relative_eq!(samples[1].position.z, 10.0 / 3.0, epsilon = TOLERANCE);
    }

    #[test]
    fn curved_samples_are_evenly_spaced() {
        let section = curve();
        let samples = sample_section(&section, 1.0);
        let piece = samples[1].arc;
        let (inner, _) = samples.split_at(samples.len() - 1);
        for pair in inner.windows(2) {
            let along = section.arc_length_between(pair[0].t, pair[1].t);
            assert_relative_eq!(along, piece, epsilon = piece * 0.03);
        }
        assert_eq!(samples.last().map(|s| s.t), Some(section.t_max()));
    }

    #[test]
    fn degenerate_sampling_returns_nothing() {
        let unfitted = TrackSection::new(vec![Float3::ZERO, Float3::new(0.0, 0.0, 5.0)]);
        assert!(sample_section(&unfitted, 1.0).is_empty());
        assert!(sample_section(&straight(5.0), 0.0).is_empty());
        assert!(support_positions(&straight(5.0), -1.0, 0.0).is_empty());
    }

    #[test]
    fn supports_are_centred() {
        // 10 m, 3 m apart: three supports, the 1 m slack split between both ends
        let supports = support_positions(&straight(10.0), 3.0, 0.0);
        assert_eq!(supports.len(), 3);
        let zs: Vec<f32> = supports.iter().map(|s| s.position.z).collect();
        assert_relative_eq!(zs[0], 2.0, epsilon = TOLERANCE);
        assert_relative_eq!(zs[1], 5.0, epsilon = TOLERANCE);
        assert_relative_eq!(zs[2], 8.0, epsilon = TOLERANCE);
    }

    #[test]
    fn supports_skip_offset() {
        let supports = support_positions(&straight(10.0), 4.0, 2.0);
        assert_eq!(supports.len(), 2);
        assert_relative_eq!(supports[0].position.z, 4.0, epsilon = TOLERANCE);
        assert_relative_eq!(supports[1].position.z, 8.0, epsilon = TOLERANCE);
    }

    #[test]
    fn sample_at_arc_clamps_and_interpolates() {
        let samples = sample_section(&straight(10.0), 5.0);
        let below = sample_at_arc(&samples, -1.0).unwrap();
        assert_relative_eq!(below.arc, -1.0);
        assert_relative_eq!(below.position.z, 0.0, epsilon = TOLERANCE);

        let mid = sample_at_arc(&samples, 7.5).unwrap();
        assert_relative_eq!(mid.position.z, 7.5, epsilon = TOLERANCE);
        assert_relative_eq!(mid.direction.magnitude(), 1.0, epsilon = 1e-5);

        let above = sample_at_arc(&samples, 12.0).unwrap();
        assert_relative_eq!(above.position.z, 10.0, epsilon = TOLERANCE);
        assert!(sample_at_arc(&[], 1.0).is_none());
    }

    #[test]
    fn spline_point_round_trips_pose() {
        let pose = straight(10.0).pose(0.5);
        let point = SplinePoint::from_pose(5.0, 0.5, pose);
        assert_eq!(point.pose(), pose);
    }
}
