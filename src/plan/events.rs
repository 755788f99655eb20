//! 计划执行过程事件：供状态面板与日志订阅

use serde::Serialize;

use crate::plan::ActionCommand;

/// 单步执行事件（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// 开始执行第 index 步（从 0 计）
    StepStarted {
        index: usize,
        total: usize,
        command: ActionCommand,
    },
    StepCompleted { index: usize, elapsed_ms: u64 },
    /// 未知指令被跳过
    StepSkipped { index: usize, tag: String },
    /// 计划结束后的归位移动
    Homing,
    PlanFinished { executed: usize, skipped: usize },
}
