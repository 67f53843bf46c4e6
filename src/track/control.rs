use crate::sim::Float3;

/// Authored position of a section. Its index is the local parameter.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControlPoint {
    pub position: Float3,
    /// NURBS weight, ignored by the cubic strategy.
    pub weight: f32,
}

impl ControlPoint {
    pub const fn new(position: Float3) -> Self {
        Self {
            position,
            weight: 1.0,
        }
    }

    pub const fn weighted(position: Float3, weight: f32) -> Self {
        Self { position, weight }
    }

    pub fn is_finite(&self) -> bool {
        self.position.x.is_finite()
            && self.position.y.is_finite()
            && self.position.z.is_finite()
            && self.weight.is_finite()
    }
}

impl From<Float3> for ControlPoint {
    fn from(position: Float3) -> Self {
        Self::new(position)
    }
}

/// Bank angle in degrees at a section-local parameter.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct RollNode {
    pub t: f32,
    pub angle: f32,
}

impl RollNode {
    pub const fn new(t: f32, angle: f32) -> Self {
        Self { t, angle }
    }
}

/// Distance under which two roll nodes count as the same parameter.
pub const ROLL_MERGE_DISTANCE: f32 = 1e-4;

/// Sorts, clamps to `[0, t_max]` and drops the later of two nodes closer
/// than `ROLL_MERGE_DISTANCE`.
pub fn sanitize_roll_nodes(nodes: &[RollNode], t_max: f32) -> Vec<RollNode> {
    let mut out: Vec<RollNode> = nodes
        .iter()
        .filter(|n| n.t.is_finite() && n.angle.is_finite())
        .map(|n| RollNode::new(n.t.clamp(0.0, t_max.max(0.0)), n.angle))
        .collect();
    out.sort_by(|a, b| a.t.total_cmp(&b.t));
    out.dedup_by(|later, kept| (later.t - kept.t).abs() < ROLL_MERGE_DISTANCE);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_sorts_clamps_and_merges() {
        let nodes = [
            RollNode::new(2.5, 30.0),
            RollNode::new(-1.0, 5.0),
            RollNode::new(1.0, 10.0),
            RollNode::new(1.00001, 99.0),
            RollNode::new(f32::NAN, 1.0),
        ];
        let clean = sanitize_roll_nodes(&nodes, 2.0);
        assert_eq!(
            clean,
            vec![
                RollNode::new(0.0, 5.0),
                RollNode::new(1.0, 10.0),
                RollNode::new(2.0, 30.0),
            ]
        );
    }

    #[test]
    fn control_point_defaults_to_unit_weight() {
        let cp: ControlPoint = Float3::new(1.0, 2.0, 3.0).into();
        assert_eq!(cp.weight, 1.0);
        assert!(cp.is_finite());
        assert!(!ControlPoint::weighted(Float3::ZERO, f32::INFINITY).is_finite());
    }
}
