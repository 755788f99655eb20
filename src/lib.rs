//! Barista - 具身咖啡师：机械臂运动执行与场景一致性层
//!
//! 模块划分：
//! - **agent**: 点单流水线（配方 -> 定位 -> 规划 -> 执行）
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、状态投影、关闭管理、工作单元装配、主控循环
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / 智谱 / Mock）
//! - **motion**: IK 目标移动、夹爪、手腕
//! - **plan**: 动作指令与顺序调度器
//! - **scene**: 瓶子登记表、reset / swap、控制台监听、物理 tick
//! - **sim**: 仿真引擎接口与进程内世界
//! - **upstream**: 配方推理、原料定位、轨迹规划的边界

pub mod agent;
pub mod config;
pub mod core;
pub mod llm;
pub mod motion;
pub mod observability;
pub mod plan;
pub mod scene;
pub mod sim;
pub mod upstream;

pub use agent::{CoffeeAgent, OrderReport};
