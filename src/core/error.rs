//! 错误类型：仿真引擎、运动执行、场景编辑、指令解析与上游推理
//!
//! 每一层一个 thiserror 枚举；BaristaError 汇总各层错误，供编排器与二进制入口使用。
//! 注意：本层不做任何自动重试，重试仅存在于上游 LLM 客户端（见 llm::RetryingLlmClient）。

use thiserror::Error;

use crate::sim::BodyId;

/// 仿真引擎调用失败（单次调用的边界上原子）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Simulation engine is not connected")]
    NotConnected,

    #[error("Unknown body {0}")]
    UnknownBody(BodyId),

    #[error("Body {body} has no joint {joint}")]
    UnknownJoint { body: BodyId, joint: usize },

    #[error("IK solve failed for body {body}: {reason}")]
    IkFailed { body: BodyId, reason: String },
}

/// 运动执行错误（移动 / 夹爪 / 手腕）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MotionError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// 仅在进程关闭时触发：每个插值步检查一次取消令牌
    #[error("Trajectory cancelled")]
    Cancelled,
}

/// 场景编辑错误（reset / swap）
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SceneError {
    /// 交换索引越界，状态不变
    #[error("Invalid bottle index: {first}/{second} (valid range 0..{len})")]
    InvalidIndex {
        first: usize,
        second: usize,
        len: usize,
    },

    /// 自己与自己交换，状态不变
    #[error("Cannot swap bottle {0} with itself")]
    SameIndex(usize),

    #[error("Scene registry must hold exactly {expected} bottles, got {actual}")]
    RegistrySize { expected: usize, actual: usize },

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// 动作指令解析错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    /// 未知的 cmd 标签；调度器将其作为 PlanStep::Unrecognized 跳过
    #[error("Unknown command: {tag}")]
    UnknownCommand { tag: String },

    #[error("Command has no \"cmd\" tag: {0}")]
    MissingTag(String),

    /// 已知标签但字段缺失或类型不对
    #[error("Malformed {tag} command: {reason}")]
    Malformed { tag: String, reason: String },

    #[error("Plan is not a JSON array of commands: {0}")]
    InvalidPlan(String),
}

/// 上游推理失败：中止本单，回到空闲，不执行任何物理动作
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UpstreamError {
    #[error("No recipe could be generated: {0}")]
    NoRecipe(String),

    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Recipe has no steps")]
    EmptyRecipe,

    #[error("Ingredient localization failed: {0}")]
    Localization(String),

    #[error("Missing ingredients: {0:?}")]
    MissingIngredients(Vec<String>),

    #[error("Generated plan is empty")]
    EmptyPlan,

    #[error("Planner failed: {0}")]
    Planner(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("JSON parse error: {0}")]
    JsonParse(String),
}

/// 顶层错误：启动与点单流程
#[derive(Error, Debug)]
pub enum BaristaError {
    /// 机械臂 / 物体身份在构造时无法解析：致命，中止启动
    #[error("Resolution error: {0}")]
    Resolution(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Motion(#[from] MotionError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}
