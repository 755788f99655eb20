//! 关节空间轨迹：逐关节线性插值
//!
//! 第 k 个航点取 t = k / steps（k = 0..steps），不含 t = 1；终点由执行器额外下发一次「锁定」指令。
//! 不做时间最优或加加速度限制。

use crate::motion::JointConfiguration;

#[derive(Debug, Clone, PartialEq)]
pub struct JointTrajectory {
    start: JointConfiguration,
    goal: JointConfiguration,
    steps: u32,
}

impl JointTrajectory {
    /// steps 至少为 1
    pub fn new(start: JointConfiguration, goal: JointConfiguration, steps: u32) -> Self {
        Self {
            start,
            goal,
            steps: steps.max(1),
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn start(&self) -> &JointConfiguration {
        &self.start
    }

    pub fn goal(&self) -> &JointConfiguration {
        &self.goal
    }

    pub fn waypoint(&self, k: u32) -> JointConfiguration {
        let t = f64::from(k) / f64::from(self.steps);
        self.start.lerp(&self.goal, t)
    }

    pub fn waypoints(&self) -> impl Iterator<Item = JointConfiguration> + '_ {
        (0..self.steps).map(move |k| self.waypoint(k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::ARM_DOF;

    #[test]
    fn test_zero_steps_is_raised_to_one() {
        let a = JointConfiguration::new([0.0; ARM_DOF]);
        let traj = JointTrajectory::new(a, a, 0);
        assert_eq!(traj.steps(), 1);
        assert_eq!(traj.waypoints().count(), 1);
    }

    #[test]
    fn test_waypoints_start_at_current_and_stop_short_of_goal() {
        let a = JointConfiguration::new([0.0; ARM_DOF]);
        let b = JointConfiguration::new([1.0; ARM_DOF]);
        let traj = JointTrajectory::new(a, b, 4);
        let points: Vec<_> = traj.waypoints().collect();
        assert_eq!(points.len(), 4);
        assert_eq!(points[0], a);
        assert!((points[3][0] - 0.75).abs() < 1e-12);
    }
}
