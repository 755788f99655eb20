//! 核心编排层：错误类型、状态投影、关闭管理、工作单元装配、主控循环

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod shutdown;
pub mod state;

pub use builder::{Workcell, WorkcellBuilder};
pub use error::{BaristaError, CommandError, EngineError, MotionError, SceneError, UpstreamError};
pub use orchestrator::{create_runtime, BaristaRuntime, Command};
pub use shutdown::{
    run_until_shutdown, ShutdownManager, ShutdownReason, ShutdownReport, ShutdownSequence,
    DEFAULT_SHUTDOWN_GRACE,
};
pub use state::{BaristaState, OrderPhase};
