//! 动作计划：指令类型、执行事件与顺序调度器

mod command;
mod dispatcher;
mod events;

pub use command::{ActionCommand, Plan, PlanStep, KNOWN_TAGS};
pub use dispatcher::{DispatchReport, MotionSettings, PlanDispatcher};
pub use events::DispatchEvent;
