//! 运动执行器：末端目标位置 -> IK -> 关节空间插值 -> 锁定终点
//!
//! move_to 读取当前关节构型，以固定向下姿态、关节限位与静态休息位（零空间偏置）请求 IK，
//! 然后逐步下发插值指令，每步之间 sleep(delay) 让物理积分收敛；最后再下发一次精确 IK 解锁定终点，
//! 补偿有限步数留下的跟踪误差。
//!
//! 不校验 IK 解是否可达或退化：坏解也会被执行（已知限制）。
//! 每步只在下发那一批电机指令时持有引擎锁，整条轨迹不持锁，因此中途到达的 reset / swap 会与轨迹竞争。

use std::time::Duration;

use nalgebra::Vector3;
use tokio_util::sync::CancellationToken;

use crate::core::MotionError;
use crate::motion::{pace, ArmHandle, JointConfiguration, JointTrajectory, Pose};
use crate::sim::{IkRequest, SharedEngine};

/// IK 求解器默认最大迭代次数
pub const DEFAULT_IK_MAX_ITERATIONS: u32 = 100;
/// IK 求解器默认残差阈值
pub const DEFAULT_IK_RESIDUAL_THRESHOLD: f64 = 1e-5;

/// 运动执行器：持有共享引擎与已解析的机械臂句柄
#[derive(Clone)]
pub struct MotionExecutor {
    engine: SharedEngine,
    arm: ArmHandle,
    /// 每个插值步检查一次；仅用于进程关闭
    cancel: CancellationToken,
    ik_max_iterations: u32,
    ik_residual_threshold: f64,
}

impl MotionExecutor {
    pub fn new(engine: SharedEngine, arm: ArmHandle) -> Self {
        Self {
            engine,
            arm,
            cancel: CancellationToken::new(),
            ik_max_iterations: DEFAULT_IK_MAX_ITERATIONS,
            ik_residual_threshold: DEFAULT_IK_RESIDUAL_THRESHOLD,
        }
    }

    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn with_ik_tolerance(mut self, max_iterations: u32, residual_threshold: f64) -> Self {
        self.ik_max_iterations = max_iterations;
        self.ik_residual_threshold = residual_threshold;
        self
    }

    pub fn arm(&self) -> &ArmHandle {
        &self.arm
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// 当前 7 关节角度（读自引擎）
    pub async fn current_configuration(&self) -> Result<JointConfiguration, MotionError> {
        let engine = self.engine.lock().await;
        Ok(self.arm.current_configuration(&*engine)?)
    }

    /// 以固定向下姿态求 IK 解
    pub async fn solve_ik(&self, target: Vector3<f64>) -> Result<JointConfiguration, MotionError> {
        let mut engine = self.engine.lock().await;
        let profile = self.arm.profile();
        let request = IkRequest {
            end_effector_link: profile.end_effector_link,
            target: Pose::tool_down(target),
            limits: &profile.limits,
            rest_pose: &profile.rest_pose,
            max_iterations: self.ik_max_iterations,
            residual_threshold: self.ik_residual_threshold,
        };
        Ok(engine.inverse_kinematics(self.arm.body(), &request)?)
    }

    /// 平滑移动到目标位置，返回锁定的终点构型
    pub async fn move_to(
        &self,
        target: Vector3<f64>,
        steps: u32,
        delay: Duration,
    ) -> Result<JointConfiguration, MotionError> {
        let start = self.current_configuration().await?;
        let goal = self.solve_ik(target).await?;
        tracing::debug!(
            target = ?[target.x, target.y, target.z],
            steps,
            max_joint_delta = start.max_abs_diff(&goal),
            "move_to"
        );
        self.follow(JointTrajectory::new(start, goal, steps), delay)
            .await
    }

    /// 插值并锁定：移动与手腕旋转共用的底层过程
    pub async fn follow(
        &self,
        trajectory: JointTrajectory,
        delay: Duration,
    ) -> Result<JointConfiguration, MotionError> {
        for waypoint in trajectory.waypoints() {
            if self.cancel.is_cancelled() {
                return Err(MotionError::Cancelled);
            }
            {
                let mut engine = self.engine.lock().await;
                self.arm.command_configuration(&mut *engine, &waypoint)?;
            }
            pace(delay).await;
        }

        let mut engine = self.engine.lock().await;
        let locked = self.arm.command_configuration(&mut *engine, trajectory.goal())?;
        Ok(locked)
    }
}
