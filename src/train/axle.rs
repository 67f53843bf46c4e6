use crate::sim::Pose;

/// One wheel assembly of a train, trailing its predecessor by a fixed distance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Axle {
    /// Metres behind the previous axle, or behind the train reference for axle 0.
    pub offset_from_prev: f32,
    t_global: f32,
    pose: Pose,
}

impl Axle {
    pub fn new(offset_from_prev: f32) -> Self {
        Self {
            offset_from_prev: offset_from_prev.max(0.0),
            ..Self::default()
        }
    }

    /// Global parameter of the last successful placement.
    pub fn t_global(&self) -> f32 {
        self.t_global
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub(crate) fn place(&mut self, t_global: f32, pose: Pose) {
        self.t_global = t_global;
        self.pose = pose;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::Float3;

    #[test]
    fn negative_offset_is_clamped() {
        assert_eq!(Axle::new(-2.0).offset_from_prev, 0.0);
        assert_eq!(Axle::new(1.5).offset_from_prev, 1.5);
    }

    #[test]
    fn place_records_parameter_and_pose() {
        let mut axle = Axle::new(1.0);
        let mut pose = Pose::default();
        pose.position = Float3::new(1.0, 2.0, 3.0);
        axle.place(4.5, pose);
        assert_eq!(axle.t_global(), 4.5);
        assert_eq!(axle.pose().position, Float3::new(1.0, 2.0, 3.0));
    }
}
