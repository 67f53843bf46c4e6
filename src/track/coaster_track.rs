use super::control::RollNode;
use super::description::TrackDescription;
use super::section::{TrackSection, ARC_STEPS};
use crate::error::{EditError, EditResult};
use crate::sim::physics::MIN_SPEED;
use crate::sim::{Float3, Pose};

/// Default direction and length of a freshly added section.
const NEW_SECTION_SPAN: Float3 = Float3::new(0.0, 0.0, 4.0);

/// Ordered chain of sections addressed by one global parameter.
///
/// Section `i` covers `[start_of(i), start_of(i) + t_max(i))`, the global
/// domain ends at `t_max()`. Closed tracks wrap the parameter, open tracks
/// reject anything outside `[0, t_max)`.
#[derive(Debug, Clone, Default)]
pub struct CoasterTrack {
    sections: Vec<TrackSection>,
    closed: bool,
    description: TrackDescription,
    starts: Vec<f32>,
    t_max: f32,
}

impl CoasterTrack {
    pub fn new(sections: Vec<TrackSection>, closed: bool) -> Self {
        Self::with_description(sections, closed, TrackDescription::default())
    }

    /// Builds a track whose sections all use `description`'s heartline offset.
    pub fn with_description(
        mut sections: Vec<TrackSection>,
        closed: bool,
        description: TrackDescription,
    ) -> Self {
        for section in &mut sections {
            section.set_heartline_offset(description.heartline_offset);
        }
        let mut track = Self {
            sections,
            closed,
            description,
            starts: Vec::new(),
            t_max: 0.0,
        };
        track.combine();
        track
    }

    /// Chains the sections: each one is moved onto its predecessor's end and
    /// starts with its end tangent. Refits everything and recomputes the domain.
    pub fn combine(&mut self) {
        let count = self.sections.len();
        if count == 0 {
            self.starts.clear();
            self.t_max = 0.0;
            return;
        }

        self.sections[0].fit();
        for i in 1..count {
            let (head, tail) = self.sections.split_at_mut(i);
            let prev = &head[i - 1];
            let section = &mut tail[0];

            section.attach_start(prev.last_point(), prev.tangent(prev.t_max()));
            if self.closed && i == count - 1 {
                let first = &head[0];
                section.attach_end(first.first_point(), first.tangent(0.0));
            }
            section.fit();
        }

        for (i, section) in self.sections.iter_mut().enumerate() {
            let prev = match i {
                0 if self.closed => Some(count - 1),
                0 => None,
                _ => Some(i - 1),
            };
            let next = if i + 1 < count {
                Some(i + 1)
            } else if self.closed {
                Some(0)
            } else {
                None
            };
            section.set_links(prev, next);
        }

        self.starts.clear();
        let mut acc = 0.0;
        for section in &self.sections {
            self.starts.push(acc);
            acc += section.t_max();
        }
        self.t_max = acc;

        log::debug!(
            "combined {count} sections, t_max {:.3}, arc length {:.3}, closed {}",
            self.t_max,
            self.total_arc_length(),
            self.closed
        );
    }

    // ---- queries ----

    pub fn t_max(&self) -> f32 {
        self.t_max
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn set_closed(&mut self, closed: bool) {
        self.closed = closed;
        self.combine();
    }

    pub fn description(&self) -> &TrackDescription {
        &self.description
    }

    pub fn sections(&self) -> &[TrackSection] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section(&self, index: usize) -> Option<&TrackSection> {
        self.sections.get(index)
    }

    /// Mutable section access for runtime state such as `physics`.
    /// Geometry edits should go through `edit_section` so the chain is rebuilt.
    pub fn section_mut(&mut self, index: usize) -> Option<&mut TrackSection> {
        self.sections.get_mut(index)
    }

    /// Physical length of the whole track.
    pub fn total_arc_length(&self) -> f32 {
        self.sections.iter().map(TrackSection::arc_length).sum()
    }

    pub fn start_of(&self, index: usize) -> Option<f32> {
        self.starts.get(index).copied()
    }

    /// Maps a global parameter to `(section, local parameter)`.
    pub fn resolve(&self, t: f32) -> Option<(usize, f32)> {
        if self.sections.is_empty() || self.t_max <= 0.0 || !t.is_finite() {
            return None;
        }

        let t = if self.closed {
            let wrapped = t.rem_euclid(self.t_max);
            if wrapped >= self.t_max {
                0.0
            } else {
                wrapped
            }
        } else if t < 0.0 || t >= self.t_max {
            return None;
        } else {
            t
        };

        let index = self
            .starts
            .partition_point(|&start| start <= t)
            .saturating_sub(1);
        let section = &self.sections[index];
        let local = (t - self.starts[index]).min(section.t_max());
        Some((index, local))
    }

    /// Wraps a global parameter on closed tracks, passes it through otherwise.
    pub fn wrap(&self, t: f32) -> f32 {
        if self.closed && self.t_max > 0.0 {
            t.rem_euclid(self.t_max)
        } else {
            t
        }
    }

    pub fn pose(&self, t: f32) -> Option<Pose> {
        self.resolve(t)
            .map(|(index, local)| self.sections[index].pose(local))
    }

    pub fn tangent(&self, t: f32) -> Option<Float3> {
        self.resolve(t)
            .map(|(index, local)| self.sections[index].tangent(local))
    }

    /// Tangent magnitude, clamped onto the ends of an open track.
    fn speed_at(&self, t: f32) -> f32 {
        let t = if self.closed {
            t
        } else {
            t.clamp(0.0, (self.t_max - 1e-4).max(0.0))
        };
        self.tangent(t).map_or(0.0, Float3::magnitude)
    }

    /// Parameter delta (always `<= 0`) walking `distance` metres backwards from `t0`.
    ///
    /// Crosses into previous sections, wraps on closed tracks and stops at the
    /// track start on open ones.
    pub fn delta_arc_length_backward(&self, t0: f32, distance: f32) -> f32 {
        let distance = distance.abs();
        if distance == 0.0 || !distance.is_finite() || self.t_max <= 0.0 {
            return 0.0;
        }
        let speed0 = self.speed_at(t0);
        if !(speed0 >= MIN_SPEED) {
            return 0.0;
        }

        let floor = if self.closed { f32::NEG_INFINITY } else { 0.0 };
        let dt = distance / (ARC_STEPS as f32 * speed0);
        let mut t = t0;
        let mut travelled = 0.0;
        let mut speed = speed0;
        for _ in 0..ARC_STEPS {
            speed = self.speed_at(t);
            let step = speed * dt;
            if travelled + step >= distance {
                let frac = if step > 0.0 {
                    (distance - travelled) / step
                } else {
                    0.0
                };
                return (t - frac * dt).max(floor) - t0;
            }
            travelled += step;
            t -= dt;
            if t <= floor {
                return floor - t0;
            }
        }
        (t - (distance - travelled) / speed.max(MIN_SPEED)).max(floor) - t0
    }

    // ---- structural edits ----

    /// Appends (or inserts at `index`) a short straight continuing the track.
    pub fn add_section(&mut self, index: Option<usize>) -> EditResult<usize> {
        let len = self.sections.len();
        let index = index.unwrap_or(len);
        if index > len {
            return Err(EditError::out_of_range(index, len));
        }

        let direction = index
            .checked_sub(1)
            .and_then(|i| self.sections.get(i))
            .map(|prev| prev.tangent(prev.t_max()))
            .filter(|t| !t.is_zero())
            .unwrap_or(NEW_SECTION_SPAN);
        let section = TrackSection::new(vec![Float3::ZERO, direction])
            .with_roll_nodes(vec![RollNode::new(0.0, 0.0), RollNode::new(1.0, 0.0)])
            .with_heartline_offset(self.description.heartline_offset);

        self.sections.insert(index, section);
        self.combine();
        Ok(index)
    }

    pub fn insert_section(&mut self, index: usize, section: TrackSection) -> EditResult<()> {
        let len = self.sections.len();
        if index > len {
            return Err(EditError::out_of_range(index, len));
        }
        self.sections.insert(index, section);
        self.combine();
        Ok(())
    }

    pub fn remove_section(&mut self, index: usize) -> EditResult<TrackSection> {
        let len = self.sections.len();
        if index >= len {
            return Err(EditError::out_of_range(index, len));
        }
        let removed = self.sections.remove(index);
        self.combine();
        Ok(removed)
    }

    /// Splits section `index` at interior control point `node`.
    pub fn split_section(&mut self, index: usize, node: usize) -> EditResult<()> {
        let len = self.sections.len();
        let section = self
            .sections
            .get_mut(index)
            .ok_or(EditError::out_of_range(index, len))?;
        let tail = section.split_at(node)?;
        self.sections.insert(index + 1, tail);
        self.combine();
        Ok(())
    }

    /// Runs a section edit and rechains the track when it succeeds.
    pub fn edit_section<R>(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut TrackSection) -> EditResult<R>,
    ) -> EditResult<R> {
        let len = self.sections.len();
        let section = self
            .sections
            .get_mut(index)
            .ok_or(EditError::out_of_range(index, len))?;
        let out = edit(section)?;
        self.combine();
        Ok(out)
    }

    /// Replaces all geometry.
    pub fn reset(&mut self, sections: Vec<TrackSection>) {
        self.sections = sections;
        for section in &mut self.sections {
            section.set_heartline_offset(self.description.heartline_offset);
        }
        self.combine();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn straight(len: f32) -> TrackSection {
        TrackSection::new(vec![Float3::ZERO, Float3::new(0.0, 0.0, len)])
    }

    fn three_piece() -> CoasterTrack {
        CoasterTrack::new(
            vec![
                straight(10.0),
                TrackSection::new(vec![
                    Float3::ZERO,
                    Float3::new(5.0, 0.0, 5.0),
                    Float3::new(10.0, 0.0, 0.0),
                ]),
                straight(-10.0),
            ],
            false,
        )
    }

    fn ring() -> CoasterTrack {
        CoasterTrack::new(
            vec![
                TrackSection::new(vec![
                    Float3::ZERO,
                    Float3::new(0.0, 0.0, 10.0),
                    Float3::new(10.0, 0.0, 20.0),
                ]),
                TrackSection::new(vec![
                    Float3::ZERO,
                    Float3::new(10.0, 0.0, -10.0),
                    Float3::new(10.0, 0.0, -20.0),
                ]),
                TrackSection::new(vec![
                    Float3::ZERO,
                    Float3::new(-10.0, 0.0, -10.0),
                    Float3::new(0.0, 0.0, 0.0),
                ]),
            ],
            true,
        )
    }

    #[test]
    fn combine_chains_points_and_tangents() {
        let track = three_piece();
        let s = track.sections();
        for i in 1..s.len() {
            let end = s[i - 1].last_point();
            let start = s[i].first_point();
            assert_relative_eq!(end.distance(start), 0.0, epsilon = 1e-5);
            let t_end = s[i - 1].tangent(s[i - 1].t_max());
            let t_start = s[i].tangent(0.0);
            assert_relative_eq!(t_end.distance(t_start), 0.0, epsilon = 1e-3);
        }
        assert_eq!(track.t_max(), 4.0);
        assert_eq!(s[0].prev(), None);
        assert_eq!(s[1].prev(), Some(0));
        assert_eq!(s[2].next(), None);
    }

    #[test]
    fn combine_is_idempotent() {
        let mut track = ring();
        let before: Vec<Float3> = (0..20).map(|i| track.pose(i as f32 * 0.3).unwrap().position).collect();
        track.combine();
        let after: Vec<Float3> = (0..20).map(|i| track.pose(i as f32 * 0.3).unwrap().position).collect();
        for (a, b) in before.iter().zip(&after) {
            assert_relative_eq!(a.distance(*b), 0.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn closed_track_closes_onto_first_section() {
        let track = ring();
        let s = track.sections();
        assert_relative_eq!(
            s[2].last_point().distance(s[0].first_point()),
            0.0,
            epsilon = 1e-5
        );
        assert_eq!(s[0].prev(), Some(2));
        assert_eq!(s[2].next(), Some(0));
    }

    #[test]
    fn resolve_maps_section_starts() {
        let track = three_piece();
        for i in 0..track.len() {
            let start = track.start_of(i).unwrap();
            assert_eq!(track.resolve(start), Some((i, 0.0)));
            let (section, local) = track.resolve(start + 0.01).unwrap();
            assert_eq!(section, i);
            assert_relative_eq!(local, 0.01, epsilon = 1e-6);
        }
        assert_eq!(track.resolve(track.t_max()), None);
        assert_eq!(track.resolve(-0.1), None);
        assert_eq!(track.start_of(7), None);
    }

    #[test]
    fn closed_track_wraps() {
        let track = ring();
        for &t in &[0.2, 1.7, 3.9, 5.5] {
            let (a, la) = track.resolve(t).unwrap();
            let (b, lb) = track.resolve(t + track.t_max()).unwrap();
            let (c, lc) = track.resolve(t - track.t_max()).unwrap();
            assert_eq!(a, b);
            assert_eq!(a, c);
            assert_relative_eq!(la, lb, epsilon = 1e-4);
            assert_relative_eq!(la, lc, epsilon = 1e-4);
        }
        assert_eq!(track.resolve(track.t_max()), Some((0, 0.0)));
    }

    #[test]
    fn backward_walk_crosses_section_boundary() {
        let track = three_piece();
        let start = track.start_of(1).unwrap();
        let dt = track.delta_arc_length_backward(start + 0.1, 4.0);
        assert!(dt < -0.1);
        let t = start + 0.1 + dt;
        assert_eq!(track.resolve(t).map(|(i, _)| i), Some(0));
    }

    #[test]
    fn backward_walk_on_straight_matches_distance() {
        let track = CoasterTrack::new(vec![straight(10.0)], false);
        let dt = track.delta_arc_length_backward(0.8, 3.0);
        assert_relative_eq!(dt, -0.3, epsilon = 1e-3);
    }

    #[test]
    fn backward_walk_clamps_at_open_start() {
        let track = CoasterTrack::new(vec![straight(10.0)], false);
        let dt = track.delta_arc_length_backward(0.2, 50.0);
        assert_relative_eq!(dt, -0.2, epsilon = 1e-6);
    }

    #[test]
    fn backward_walk_wraps_on_closed_track() {
        let track = ring();
        let dt = track.delta_arc_length_backward(0.05, 5.0);
        let t = track.wrap(0.05 + dt);
        assert_eq!(track.resolve(t).map(|(i, _)| i), Some(2));
    }

    #[test]
    fn add_section_continues_the_track() {
        let mut track = three_piece();
        let index = track.add_section(None).unwrap();
        assert_eq!(index, 3);
        assert_eq!(track.len(), 4);
        let prev = &track.sections()[2];
        let added = &track.sections()[3];
        assert_relative_eq!(prev.last_point().distance(added.first_point()), 0.0, epsilon = 1e-5);
        assert_eq!(track.t_max(), 5.0);
        assert!(track.add_section(Some(9)).is_err());
    }

    #[test]
    fn split_and_remove_rechain() {
        let mut track = three_piece();
        let length = track.total_arc_length();
        track.split_section(1, 1).unwrap();
        assert_eq!(track.len(), 4);
        assert_eq!(track.t_max(), 4.0);
        assert_relative_eq!(track.total_arc_length(), length, epsilon = length * 0.01);

        assert_eq!(
            track.split_section(0, 0),
            Err(EditError::SplitAtBoundary { index: 0, last: 1 })
        );
        assert_eq!(track.split_section(8, 1), Err(EditError::out_of_range(8, 4)));

        let removed = track.remove_section(3).unwrap();
        assert_eq!(removed.control_points().len(), 2);
        assert_eq!(track.len(), 3);
        assert_eq!(track.t_max(), 3.0);
    }

    #[test]
    fn edit_section_rechains_followers() {
        let mut track = three_piece();
        track
            .edit_section(0, |s| s.set_position_node(1, Float3::new(0.0, 2.0, 12.0)))
            .unwrap();
        let s = track.sections();
        assert_relative_eq!(
            s[1].first_point().distance(Float3::new(0.0, 2.0, 12.0)),
            0.0,
            epsilon = 1e-5
        );
        assert_relative_eq!(s[1].last_point().distance(s[2].first_point()), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn empty_track_resolves_nothing() {
        let track = CoasterTrack::default();
        assert_eq!(track.resolve(0.0), None);
        assert_eq!(track.delta_arc_length_backward(0.0, 1.0), 0.0);
        assert_eq!(track.total_arc_length(), 0.0);
    }
}
