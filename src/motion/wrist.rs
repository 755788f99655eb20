//! 手腕旋转：只改第 7 关节，其余关节保持当前值
//!
//! 角度以度为单位相对当前手腕角累加，不做卷绕；超出限位的目标在下发时被夹住。

use std::time::Duration;

use crate::core::MotionError;
use crate::motion::{JointConfiguration, JointTrajectory, MotionExecutor};

#[derive(Clone)]
pub struct WristRotator {
    motion: MotionExecutor,
}

impl WristRotator {
    pub fn new(motion: MotionExecutor) -> Self {
        Self { motion }
    }

    /// 相对旋转 angle_degrees 度，返回锁定的终点构型
    pub async fn rotate_wrist(
        &self,
        angle_degrees: f64,
        steps: u32,
        delay: Duration,
    ) -> Result<JointConfiguration, MotionError> {
        let start = self.motion.current_configuration().await?;
        let wrist = self.motion.arm().profile().wrist_joint();
        let mut goal = start;
        goal.0[wrist] += angle_degrees.to_radians();

        tracing::debug!(angle_degrees, from = start[wrist], to = goal[wrist], "rotate wrist");

        self.motion
            .follow(JointTrajectory::new(start, goal, steps), delay)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{ArmHandle, ArmProfile};
    use crate::sim::{build_cafe_scene, share, JointSpeeds, SimWorld};

    #[tokio::test]
    async fn test_pour_rotation_round_trip_restores_wrist() {
        let mut world = SimWorld::default();
        let scene = build_cafe_scene(&mut world, &ArmProfile::panda(), JointSpeeds::default());
        let arm = ArmHandle::resolve(&world, scene.arm, ArmProfile::panda()).unwrap();
        let (world, shared) = share(world);
        let motion = MotionExecutor::new(shared, arm);
        let wrist = WristRotator::new(motion.clone());

        let before = motion.current_configuration().await.unwrap();

        let tilted = wrist.rotate_wrist(-90.0, 100, Duration::ZERO).await.unwrap();
        assert!((tilted[6] - (before[6] - std::f64::consts::FRAC_PI_2)).abs() < 1e-12);
        for j in 0..6 {
            assert_eq!(tilted[j], before[j]);
        }
        world.lock().await.settle(100_000);

        wrist.rotate_wrist(90.0, 100, Duration::ZERO).await.unwrap();
        world.lock().await.settle(100_000);

        let after = motion.current_configuration().await.unwrap();
        assert!(after.max_abs_diff(&before) < 1e-9);
    }
}
