use super::control::{sanitize_roll_nodes, ControlPoint, RollNode, ROLL_MERGE_DISTANCE};
use super::description::TrackDescription;
use crate::error::{EditError, EditResult, SplineResult};
use crate::sim::physics::MIN_SPEED;
use crate::sim::{Float3, Frame, Pose, Quaternion, SectionPhysics};
use crate::spline::{CubicSpline, Curve1D, Spline, SplineKind};

/// Integration steps per unit of local parameter, and per arc-length search.
pub const ARC_STEPS: usize = 64;

/// How the banked right vector is interpolated between roll nodes.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RollMode {
    /// Rotate the unbanked right vector by the interpolated roll angle.
    #[default]
    Angle,
    /// Interpolate the right vector's components, sampled at the roll nodes.
    Vector,
}

#[derive(Debug, Clone)]
struct SectionCurves {
    x: Spline,
    y: Spline,
    z: Spline,
    rolls: Vec<RollNode>,
    roll: Option<CubicSpline>,
    right: Option<[CubicSpline; 3]>,
}

impl SectionCurves {
    fn position(&self, t: f32) -> Float3 {
        Float3::new(self.x.eval(t), self.y.eval(t), self.z.eval(t))
    }

    fn tangent(&self, t: f32) -> Float3 {
        Float3::new(
            self.x.eval_slope(t),
            self.y.eval_slope(t),
            self.z.eval_slope(t),
        )
    }

    fn roll(&self, t: f32) -> f32 {
        let (Some(first), Some(last), Some(curve)) =
            (self.rolls.first(), self.rolls.last(), self.roll.as_ref())
        else {
            return 0.0;
        };
        if t < first.t {
            first.angle
        } else if t > last.t {
            last.angle
        } else {
            curve.eval(t)
        }
    }

    fn right_angle(&self, t: f32) -> Float3 {
        banked_right(self.tangent(t), self.roll(t))
    }

    fn right_vector(&self, t: f32, mode: RollMode) -> Float3 {
        let angle = self.right_angle(t);
        let (Some(first), Some(last)) = (self.rolls.first(), self.rolls.last()) else {
            return angle;
        };
        match (mode, &self.right) {
            (RollMode::Vector, Some([rx, ry, rz])) if t >= first.t && t <= last.t => {
                Float3::new(rx.eval(t), ry.eval(t), rz.eval(t)).normalize_or(angle)
            }
            _ => angle,
        }
    }
}

/// Unbanked right vector `-(forward x UP)` rotated about forward by `-roll` degrees.
fn banked_right(tangent: Float3, roll_degrees: f32) -> Float3 {
    let forward = tangent.normalize_or(Float3::FORWARD);
    let flat = (-forward.cross(Float3::UP)).normalize_or(Float3::RIGHT);
    Quaternion::from_axis_angle(forward, -roll_degrees.to_radians()).mul_vec(flat)
}

/// One independently parameterized piece of track.
///
/// The local parameter runs over `[0, n-1]` for `n` control points. Geometry
/// queries on an unfitted section return fallbacks: zero position, `(0,0,1)`
/// tangent and zero roll.
#[derive(Debug, Clone)]
pub struct TrackSection {
    control_points: Vec<ControlPoint>,
    roll_nodes: Vec<RollNode>,
    start_slope: Float3,
    end_slope: Float3,
    spline_kind: SplineKind,
    roll_mode: RollMode,
    heartline_offset: f32,
    pub physics: SectionPhysics,
    prev: Option<usize>,
    next: Option<usize>,
    curves: Option<SectionCurves>,
    arc_length: f32,
}

impl TrackSection {
    /// Creates an unfitted section through `points` with no banking.
    pub fn new(points: Vec<Float3>) -> Self {
        Self::from_control_points(points.into_iter().map(ControlPoint::new).collect())
    }

    pub fn from_control_points(control_points: Vec<ControlPoint>) -> Self {
        Self {
            control_points,
            roll_nodes: Vec::new(),
            start_slope: Float3::ZERO,
            end_slope: Float3::ZERO,
            spline_kind: SplineKind::default(),
            roll_mode: RollMode::default(),
            heartline_offset: TrackDescription::DEFAULT.heartline_offset,
            physics: SectionPhysics::default(),
            prev: None,
            next: None,
            curves: None,
            arc_length: 0.0,
        }
    }

    pub fn with_roll_nodes(mut self, nodes: Vec<RollNode>) -> Self {
        self.roll_nodes = sanitize_roll_nodes(&nodes, self.t_max());
        self
    }

    /// Boundary tangents, a zero vector leaves that end natural.
    pub fn with_slopes(mut self, start: Float3, end: Float3) -> Self {
        self.start_slope = start;
        self.end_slope = end;
        self
    }

    pub fn with_spline_kind(mut self, kind: SplineKind) -> Self {
        self.spline_kind = kind;
        self
    }

    pub fn with_roll_mode(mut self, mode: RollMode) -> Self {
        self.roll_mode = mode;
        self
    }

    pub fn with_heartline_offset(mut self, offset: f32) -> Self {
        self.heartline_offset = offset;
        self
    }

    pub fn with_physics(mut self, physics: SectionPhysics) -> Self {
        self.physics = physics;
        self
    }

    /// Fits the section and returns it.
    pub fn fitted(mut self) -> Self {
        self.fit();
        self
    }

    // ---- fitting ----

    /// Refits every curve. Rejected input is logged and leaves the section unfitted.
    pub fn fit(&mut self) {
        if let Err(err) = self.try_fit() {
            log::warn!("section fit rejected: {err}");
            self.curves = None;
            self.arc_length = 0.0;
        }
    }

    pub fn try_fit(&mut self) -> SplineResult<()> {
        let n = self.control_points.len();
        let ts: Vec<f32> = (0..n).map(|i| i as f32).collect();
        let weights: Vec<f32> = self.control_points.iter().map(|c| c.weight).collect();
        let axis = |f: fn(&Float3) -> f32| -> Vec<f32> {
            self.control_points.iter().map(|c| f(&c.position)).collect()
        };
        let start = (!self.start_slope.is_zero()).then_some(self.start_slope);
        let end = (!self.end_slope.is_zero()).then_some(self.end_slope);

        let fit_axis = |values: Vec<f32>, pick: fn(&Float3) -> f32| -> SplineResult<Spline> {
            let mut spline = Spline::new(self.spline_kind);
            spline.set_weights(&weights);
            spline.fit(&ts, &values, start.as_ref().map(pick), end.as_ref().map(pick))?;
            Ok(spline)
        };
        let x = fit_axis(axis(|p| p.x), |p| p.x)?;
        let y = fit_axis(axis(|p| p.y), |p| p.y)?;
        let z = fit_axis(axis(|p| p.z), |p| p.z)?;

        let rolls = sanitize_roll_nodes(&self.roll_nodes, self.t_max());
        let roll = if rolls.is_empty() {
            None
        } else {
            let rts: Vec<f32> = rolls.iter().map(|r| r.t).collect();
            let angles: Vec<f32> = rolls.iter().map(|r| r.angle).collect();
            let mut curve = CubicSpline::new();
            curve.fit(&rts, &angles, Some(0.0), Some(0.0))?;
            Some(curve)
        };

        let mut curves = SectionCurves {
            x,
            y,
            z,
            rolls,
            roll,
            right: None,
        };

        if curves.rolls.len() >= 2 {
            let rts: Vec<f32> = curves.rolls.iter().map(|r| r.t).collect();
            let rights: Vec<Float3> = rts.iter().map(|&t| curves.right_angle(t)).collect();
            let mut components = [CubicSpline::new(), CubicSpline::new(), CubicSpline::new()];
            let picks: [fn(&Float3) -> f32; 3] = [|v| v.x, |v| v.y, |v| v.z];
            for (curve, pick) in components.iter_mut().zip(picks) {
                let values: Vec<f32> = rights.iter().map(pick).collect();
                curve.fit(&rts, &values, None, None)?;
            }
            curves.right = Some(components);
        }

        self.curves = Some(curves);
        self.arc_length = self.integrate_arc_length();
        log::debug!(
            "fitted section: {n} control points, {} roll nodes, arc length {:.3}",
            self.roll_nodes.len(),
            self.arc_length
        );
        Ok(())
    }

    fn integrate_arc_length(&self) -> f32 {
        let dt = 1.0 / ARC_STEPS as f32;
        let steps = ARC_STEPS * self.control_points.len().saturating_sub(1);
        (0..steps)
            .map(|j| self.tangent(j as f32 * dt).magnitude() * dt)
            .sum()
    }

    // ---- queries ----

    pub fn is_fitted(&self) -> bool {
        self.curves.is_some()
    }

    /// Length of the local parameter domain.
    pub fn t_max(&self) -> f32 {
        self.control_points.len().saturating_sub(1) as f32
    }

    pub fn arc_length(&self) -> f32 {
        self.arc_length
    }

    pub fn position(&self, t: f32) -> Float3 {
        self.curves
            .as_ref()
            .map_or(Float3::ZERO, |c| c.position(t))
    }

    pub fn tangent(&self, t: f32) -> Float3 {
        self.curves
            .as_ref()
            .map_or(Float3::FORWARD, |c| c.tangent(t))
    }

    /// Bank angle in degrees, held constant outside the roll node range.
    pub fn roll(&self, t: f32) -> f32 {
        self.curves.as_ref().map_or(0.0, |c| c.roll(t))
    }

    pub fn right_vector(&self, t: f32, mode: RollMode) -> Float3 {
        match &self.curves {
            Some(c) => c.right_vector(t, mode),
            None => banked_right(Float3::FORWARD, 0.0),
        }
    }

    pub fn up_vector(tangent: Float3, right: Float3) -> Float3 {
        tangent.cross(right).normalize_or(Float3::UP)
    }

    /// Rider pose, offset below the spline by the heartline distance.
    pub fn pose(&self, t: f32) -> Pose {
        let forward = self.tangent(t).normalize_or(Float3::FORWARD);
        let right = self.right_vector(t, self.roll_mode);
        let up = Self::up_vector(forward, right);
        let position = self.position(t) - up * self.heartline_offset;
        Pose::new(position, Frame::look(forward, up))
    }

    /// Parameter increment whose arc length from `t0` reaches `distance`.
    ///
    /// Walks 64 steps sized for the tangent at `t0`, interpolates inside the
    /// crossing step and extrapolates with the last speed when the walk falls short.
    pub fn delta_param_for_arc_length(&self, t0: f32, distance: f32) -> f32 {
        if distance <= 0.0 || !distance.is_finite() {
            return 0.0;
        }
        let speed0 = self.tangent(t0).magnitude();
        if !(speed0 >= MIN_SPEED) {
            return 0.0;
        }

        let dt = distance / (ARC_STEPS as f32 * speed0);
        let mut t = t0;
        let mut travelled = 0.0;
        let mut speed = speed0;
        for _ in 0..ARC_STEPS {
            speed = self.tangent(t).magnitude();
            let step = speed * dt;
            if travelled + step >= distance {
                let frac = if step > 0.0 {
                    (distance - travelled) / step
                } else {
                    0.0
                };
                return t + frac * dt - t0;
            }
            travelled += step;
            t += dt;
        }
        t + (distance - travelled) / speed.max(MIN_SPEED) - t0
    }

    /// Arc length between two local parameters, negative when `t1 < t0`.
    pub fn arc_length_between(&self, t0: f32, t1: f32) -> f32 {
        if t1 < t0 {
            return -self.arc_length_between(t1, t0);
        }
        let span = t1 - t0;
        let steps = ARC_STEPS * (span.ceil() as usize).max(1);
        let dt = span / steps as f32;
        (0..steps)
            .map(|j| self.tangent(t0 + (j as f32 + 0.5) * dt).magnitude() * dt)
            .sum()
    }

    // ---- accessors ----

    pub fn control_points(&self) -> &[ControlPoint] {
        &self.control_points
    }

    pub fn roll_nodes(&self) -> &[RollNode] {
        &self.roll_nodes
    }

    pub fn start_slope(&self) -> Float3 {
        self.start_slope
    }

    pub fn end_slope(&self) -> Float3 {
        self.end_slope
    }

    pub fn spline_kind(&self) -> SplineKind {
        self.spline_kind
    }

    pub fn roll_mode(&self) -> RollMode {
        self.roll_mode
    }

    pub fn heartline_offset(&self) -> f32 {
        self.heartline_offset
    }

    pub fn set_heartline_offset(&mut self, offset: f32) {
        self.heartline_offset = offset;
    }

    pub fn prev(&self) -> Option<usize> {
        self.prev
    }

    pub fn next(&self) -> Option<usize> {
        self.next
    }

    pub fn first_point(&self) -> Float3 {
        self.control_points
            .first()
            .map_or(Float3::ZERO, |c| c.position)
    }

    pub fn last_point(&self) -> Float3 {
        self.control_points
            .last()
            .map_or(Float3::ZERO, |c| c.position)
    }

    // ---- chaining, driven by the owning track ----

    pub(crate) fn set_links(&mut self, prev: Option<usize>, next: Option<usize>) {
        self.prev = prev;
        self.next = next;
    }

    /// Moves the whole section so it starts at `point` leaving with `slope`.
    pub(crate) fn attach_start(&mut self, point: Float3, slope: Float3) {
        let offset = point - self.first_point();
        for cp in &mut self.control_points {
            cp.position += offset;
        }
        self.start_slope = slope;
    }

    /// Pins the last control point and end tangent onto the track start.
    pub(crate) fn attach_end(&mut self, point: Float3, slope: Float3) {
        if let Some(last) = self.control_points.last_mut() {
            last.position = point;
        }
        self.end_slope = slope;
    }

    // ---- edits ----

    /// Inserts a control point at `index`; roll nodes past `index - 1` move up by one.
    pub fn insert_position_node(&mut self, index: usize, position: Float3) -> EditResult<()> {
        let n = self.control_points.len();
        if index > n {
            return Err(EditError::out_of_range(index, n));
        }
        let point = ControlPoint::new(position);
        if !point.is_finite() {
            return Err(EditError::NonFinite);
        }

        self.control_points.insert(index, point);
        let pivot = index as f32 - 1.0;
        for node in &mut self.roll_nodes {
            if node.t > pivot {
                node.t += 1.0;
            }
        }
        self.fit();
        Ok(())
    }

    /// Removes a control point. A roll node sitting on `index` is dropped,
    /// later ones move down by one and the list is re-clamped and merged.
    pub fn remove_position_node(&mut self, index: usize) -> EditResult<()> {
        let n = self.control_points.len();
        if index >= n {
            return Err(EditError::out_of_range(index, n));
        }
        if n <= 2 {
            return Err(EditError::TooFewPoints { min: 2 });
        }

        self.control_points.remove(index);
        let removed = index as f32;
        let shifted: Vec<RollNode> = self
            .roll_nodes
            .iter()
            .filter(|node| (node.t - removed).abs() >= ROLL_MERGE_DISTANCE)
            .map(|node| {
                if node.t > removed {
                    RollNode::new(node.t - 1.0, node.angle)
                } else {
                    *node
                }
            })
            .collect();
        self.roll_nodes = sanitize_roll_nodes(&shifted, self.t_max());
        self.fit();
        Ok(())
    }

    pub fn set_position_node(&mut self, index: usize, position: Float3) -> EditResult<()> {
        let n = self.control_points.len();
        let point = self
            .control_points
            .get_mut(index)
            .ok_or(EditError::out_of_range(index, n))?;
        if !ControlPoint::new(position).is_finite() {
            return Err(EditError::NonFinite);
        }
        point.position = position;
        self.fit();
        Ok(())
    }

    fn check_roll_node(&self, node: RollNode, before: Option<usize>, after: Option<usize>) -> EditResult<()> {
        if !node.t.is_finite() || !node.angle.is_finite() {
            return Err(EditError::NonFinite);
        }
        let max = self.t_max();
        if node.t < 0.0 || node.t > max {
            return Err(EditError::ParameterOutOfDomain { t: node.t, max });
        }
        let below = before
            .and_then(|i| self.roll_nodes.get(i))
            .map_or(true, |b| b.t < node.t);
        let above = after
            .and_then(|i| self.roll_nodes.get(i))
            .map_or(true, |a| a.t > node.t);
        if !(below && above) {
            return Err(EditError::RollOrder { t: node.t });
        }
        Ok(())
    }

    /// Inserts a roll node at list position `index`, keeping parameters increasing.
    pub fn insert_roll_node(&mut self, index: usize, node: RollNode) -> EditResult<()> {
        let len = self.roll_nodes.len();
        if index > len {
            return Err(EditError::out_of_range(index, len));
        }
        self.check_roll_node(node, index.checked_sub(1), Some(index))?;
        self.roll_nodes.insert(index, node);
        self.fit();
        Ok(())
    }

    pub fn remove_roll_node(&mut self, index: usize) -> EditResult<RollNode> {
        let len = self.roll_nodes.len();
        if index >= len {
            return Err(EditError::out_of_range(index, len));
        }
        let node = self.roll_nodes.remove(index);
        self.fit();
        Ok(node)
    }

    pub fn set_roll_node(&mut self, index: usize, node: RollNode) -> EditResult<()> {
        let len = self.roll_nodes.len();
        if index >= len {
            return Err(EditError::out_of_range(index, len));
        }
        self.check_roll_node(node, index.checked_sub(1), Some(index + 1))?;
        self.roll_nodes[index] = node;
        self.fit();
        Ok(())
    }

    pub fn set_start_slope(&mut self, slope: Float3) -> EditResult<()> {
        if !ControlPoint::new(slope).is_finite() {
            return Err(EditError::NonFinite);
        }
        self.start_slope = slope;
        self.fit();
        Ok(())
    }

    pub fn set_end_slope(&mut self, slope: Float3) -> EditResult<()> {
        if !ControlPoint::new(slope).is_finite() {
            return Err(EditError::NonFinite);
        }
        self.end_slope = slope;
        self.fit();
        Ok(())
    }

    pub fn set_spline_kind(&mut self, kind: SplineKind) {
        self.spline_kind = kind;
        self.fit();
    }

    pub fn set_roll_mode(&mut self, mode: RollMode) {
        self.roll_mode = mode;
    }

    /// Cuts the section at interior control point `node` and returns the tail.
    ///
    /// Both halves share the control point and tangent at the cut, and get a
    /// roll node there holding the roll at the cut.
    pub fn split_at(&mut self, node: usize) -> EditResult<TrackSection> {
        let n = self.control_points.len();
        if node == 0 || node + 1 >= n {
            return Err(EditError::SplitAtBoundary {
                index: node,
                last: n.saturating_sub(1),
            });
        }

        let at = node as f32;
        let slope = self.tangent(at);
        let roll = self.roll(at);

        let mut tail_rolls: Vec<RollNode> = self
            .roll_nodes
            .iter()
            .filter(|r| r.t >= at)
            .map(|r| RollNode::new(r.t - at, r.angle))
            .collect();
        if tail_rolls.first().map_or(true, |r| r.t != 0.0) {
            tail_rolls.insert(0, RollNode::new(0.0, roll));
        }

        let mut head_rolls: Vec<RollNode> =
            self.roll_nodes.iter().filter(|r| r.t < at).copied().collect();
        head_rolls.push(RollNode::new(at, roll));

        let mut tail = TrackSection {
            control_points: self.control_points[node..].to_vec(),
            roll_nodes: tail_rolls,
            start_slope: slope,
            end_slope: self.end_slope,
            spline_kind: self.spline_kind,
            roll_mode: self.roll_mode,
            heartline_offset: self.heartline_offset,
            physics: self.physics,
            prev: None,
            next: None,
            curves: None,
            arc_length: 0.0,
        };

        self.control_points.truncate(node + 1);
        self.roll_nodes = head_rolls;
        self.end_slope = slope;
        self.fit();
        tail.fit();
        Ok(tail)
    }
}

impl Default for TrackSection {
    /// Four metre straight with a flat roll profile.
    fn default() -> Self {
        Self::new(vec![Float3::ZERO, Float3::new(0.0, 0.0, 4.0)])
            .with_roll_nodes(vec![RollNode::new(0.0, 0.0), RollNode::new(1.0, 0.0)])
    }
}
