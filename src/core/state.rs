//! 状态投影：点单流程所处阶段与进度
//!
//! 编排器通过 watch 通道发布 BaristaState，前端（控制台）只读。

use serde::Serialize;

/// 点单流程阶段
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPhase {
    Idle,
    /// [1/4] 生成配方
    Interpreting,
    /// [2/4] 扫描货架、核对库存
    Locating,
    /// [3/4] 生成动作计划
    Planning,
    /// [4/4] 执行动作
    Executing,
    Error,
}

impl OrderPhase {
    /// 控制台显示用的阶段标签
    pub fn label(&self) -> &'static str {
        match self {
            OrderPhase::Idle => "idle",
            OrderPhase::Interpreting => "[1/4] recipe",
            OrderPhase::Locating => "[2/4] locate",
            OrderPhase::Planning => "[3/4] plan",
            OrderPhase::Executing => "[4/4] execute",
            OrderPhase::Error => "error",
        }
    }
}

/// 前端看到的「投影」状态
#[derive(Clone, Debug, Serialize)]
pub struct BaristaState {
    pub phase: OrderPhase,
    pub order: Option<String>,
    pub product: Option<String>,
    /// 执行阶段的进度：(已开始的步数, 总步数)
    pub progress: Option<(usize, usize)>,
    pub error_message: Option<String>,
}

impl Default for BaristaState {
    fn default() -> Self {
        Self {
            phase: OrderPhase::Idle,
            order: None,
            product: None,
            progress: None,
            error_message: None,
        }
    }
}

impl BaristaState {
    pub fn working(order: &str, phase: OrderPhase) -> Self {
        Self {
            phase,
            order: Some(order.to_string()),
            ..Self::default()
        }
    }

    pub fn failed(order: &str, message: impl Into<String>) -> Self {
        Self {
            phase: OrderPhase::Error,
            order: Some(order.to_string()),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }
}
