//! 夹爪控制
//!
//! 低驱动力插值到目标开口，再以保持力锁定，最后固定等待一段时间让接触稳定。

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::MotionError;
use crate::motion::{pace, ArmHandle, MotionExecutor};
use crate::sim::SharedEngine;

/// 锁定后的固定等待时间
pub const DEFAULT_GRIP_SETTLE: Duration = Duration::from_millis(200);

#[derive(Clone)]
pub struct GripperController {
    engine: SharedEngine,
    arm: ArmHandle,
    cancel: CancellationToken,
    settle: Duration,
}

impl GripperController {
    pub fn new(engine: SharedEngine, arm: ArmHandle) -> Self {
        Self {
            engine,
            arm,
            cancel: CancellationToken::new(),
            settle: DEFAULT_GRIP_SETTLE,
        }
    }

    /// 与运动执行器共用引擎、机械臂句柄与取消令牌
    pub fn from_executor(motion: &MotionExecutor) -> Self {
        Self {
            engine: motion.engine().clone(),
            arm: motion.arm().clone(),
            cancel: motion.cancel_token().clone(),
            settle: DEFAULT_GRIP_SETTLE,
        }
    }

    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub async fn aperture(&self) -> Result<f64, MotionError> {
        let engine = self.engine.lock().await;
        Ok(self.arm.aperture(&*engine)?)
    }

    /// 开合到 width（先夹到 [0, max_aperture]），返回实际下发的开口
    pub async fn grab(&self, width: f64, steps: u32, delay: Duration) -> Result<f64, MotionError> {
        let profile = self.arm.profile();
        let width = self.arm.clamp_aperture(width);
        let start = self.aperture().await?;
        let steps = steps.max(1);

        tracing::debug!(from = start, to = width, steps, "gripper");

        for k in 0..steps {
            if self.cancel.is_cancelled() {
                return Err(MotionError::Cancelled);
            }
            let t = f64::from(k) / f64::from(steps);
            {
                let mut engine = self.engine.lock().await;
                self.arm.command_fingers(
                    &mut *engine,
                    start + (width - start) * t,
                    profile.grip_travel_force,
                )?;
            }
            pace(delay).await;
        }

        {
            let mut engine = self.engine.lock().await;
            self.arm
                .command_fingers(&mut *engine, width, profile.grip_hold_force)?;
        }
        tokio::time::sleep(self.settle).await;
        Ok(width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::ArmProfile;
    use crate::sim::{build_cafe_scene, share, JointSpeeds, SimWorld, SimulationEngine};

    fn setup() -> (std::sync::Arc<tokio::sync::Mutex<SimWorld>>, GripperController) {
        let mut world = SimWorld::default();
        let scene = build_cafe_scene(&mut world, &ArmProfile::panda(), JointSpeeds::default());
        let arm = ArmHandle::resolve(&world, scene.arm, ArmProfile::panda()).unwrap();
        let (typed, shared) = share(world);
        (typed, GripperController::new(shared, arm).with_settle(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_close_then_open_restores_max_aperture() {
        let (world, gripper) = setup();

        let closed = gripper.grab(0.0, 50, Duration::ZERO).await.unwrap();
        assert_eq!(closed, 0.0);
        world.lock().await.settle(100_000);
        assert_eq!(gripper.aperture().await.unwrap(), 0.0);

        let opened = gripper.grab(0.04, 50, Duration::ZERO).await.unwrap();
        assert_eq!(opened, 0.04);
        world.lock().await.settle(100_000);
        assert_eq!(gripper.aperture().await.unwrap(), 0.04);
    }

    #[tokio::test]
    async fn test_width_is_clamped_and_held_with_hold_force() {
        let (world, gripper) = setup();
        let width = gripper.grab(0.5, 3, Duration::ZERO).await.unwrap();
        assert_eq!(width, 0.04);

        let w = world.lock().await;
        let body = gripper.arm.body();
        for joint in [9, 10] {
            let motor = w.joint_motor(body, joint).unwrap().unwrap();
            assert_eq!(motor.target, 0.04);
            assert_eq!(motor.force, 60.0);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_grab_waits_for_settle() {
        let (_world, gripper) = setup();
        let gripper = gripper.with_settle(DEFAULT_GRIP_SETTLE);
        let started = tokio::time::Instant::now();
        gripper.grab(0.0, 1, Duration::ZERO).await.unwrap();
        assert!(started.elapsed() >= DEFAULT_GRIP_SETTLE);
    }
}
