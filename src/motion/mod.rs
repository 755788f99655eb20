//! 运动执行层：关节插值移动、夹爪、手腕
//!
//! 三种执行器共享同一个 SharedEngine 与 ArmHandle；每个插值步下发一批电机指令后
//! 让出执行权一段时间，由 tick 调度器推进物理。

mod arm;
mod executor;
mod gripper;
mod trajectory;
mod types;
mod wrist;

use std::time::Duration;

pub use arm::{ArmHandle, ArmProfile};
pub use executor::{MotionExecutor, DEFAULT_IK_MAX_ITERATIONS, DEFAULT_IK_RESIDUAL_THRESHOLD};
pub use gripper::{GripperController, DEFAULT_GRIP_SETTLE};
pub use trajectory::JointTrajectory;
pub use types::{tool_down_orientation, JointConfiguration, JointLimits, Pose, ARM_DOF};
pub use wrist::WristRotator;

/// 插值步之间的停顿；零延迟时仍让出一次，tick 任务得以运行
pub(crate) async fn pace(delay: Duration) {
    if delay.is_zero() {
        tokio::task::yield_now().await;
    } else {
        tokio::time::sleep(delay).await;
    }
}
