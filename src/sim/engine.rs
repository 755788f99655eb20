//! 仿真引擎接口
//!
//! 运动执行层只通过 SimulationEngine 与世界交互：关节角读写、位置电机设定点、
//! IK 求解、刚体位姿读写与步进。每次调用在调用边界上原子；跨调用的互斥由
//! SharedEngine（单一 tokio Mutex）提供，持锁期间的一批调用对 tick 而言是一个整体。

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::EngineError;
use crate::motion::{JointConfiguration, JointLimits, Pose};

/// 仿真中刚体的稳定身份句柄；构造场景时取得一次，之后贯穿所有调用点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 位置控制电机指令：目标关节值与最大驱动力
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotorCommand {
    pub target: f64,
    pub force: f64,
}

impl MotorCommand {
    pub fn new(target: f64, force: f64) -> Self {
        Self { target, force }
    }
}

/// IK 请求：末端目标位姿 + 限位 / 活动范围 + 零空间偏置（静态休息位）
#[derive(Debug, Clone)]
pub struct IkRequest<'a> {
    pub end_effector_link: usize,
    pub target: Pose,
    pub limits: &'a JointLimits,
    pub rest_pose: &'a JointConfiguration,
    pub max_iterations: u32,
    pub residual_threshold: f64,
}

/// 仿真引擎：世界的唯一真值来源
pub trait SimulationEngine: Send {
    fn is_connected(&self) -> bool;

    fn disconnect(&mut self);

    /// 身份查询：该刚体是否存在
    fn contains_body(&self, body: BodyId) -> bool;

    fn joint_angle(&self, body: BodyId, joint: usize) -> Result<f64, EngineError>;

    /// 瞬移关节（不改变电机设定点）
    fn reset_joint_angle(&mut self, body: BodyId, joint: usize, angle: f64)
        -> Result<(), EngineError>;

    /// 设置位置控制电机的设定点与力
    fn set_joint_motor(
        &mut self,
        body: BodyId,
        joint: usize,
        command: MotorCommand,
    ) -> Result<(), EngineError>;

    /// 当前电机设定点（从未下发过指令时为 None）
    fn joint_motor(&self, body: BodyId, joint: usize) -> Result<Option<MotorCommand>, EngineError>;

    /// 求解 IK；不保证解可达或非退化
    fn inverse_kinematics(
        &mut self,
        body: BodyId,
        request: &IkRequest<'_>,
    ) -> Result<JointConfiguration, EngineError>;

    fn base_pose(&self, body: BodyId) -> Result<Pose, EngineError>;

    fn reset_base_pose(&mut self, body: BodyId, pose: &Pose) -> Result<(), EngineError>;

    /// 推进一个物理时间步；只由 tick 调度器调用
    fn step_simulation(&mut self);
}

/// 所有执行上下文共享的引擎句柄
pub type SharedEngine = Arc<Mutex<dyn SimulationEngine>>;

/// 包装具体引擎为共享句柄
pub fn share<E: SimulationEngine + 'static>(engine: E) -> (Arc<Mutex<E>>, SharedEngine) {
    let typed = Arc::new(Mutex::new(engine));
    let shared: SharedEngine = typed.clone();
    (typed, shared)
}
