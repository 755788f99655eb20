//! 轨迹规划器
//!
//! SopPlanner 按固定的「取瓶-倒入-放回」流程为每个原料生成动作；
//! 取放全程沿 Y 轴水平进出货架，不做垂直提起。
//! LlmTrajectoryPlanner 让 LLM 按同一流程生成，输出经清洗后解析。

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::UpstreamError;
use crate::llm::{LlmClient, Message};
use crate::plan::{ActionCommand, Plan};
use crate::scene::{GridCell, COLUMN_SPACING, SHELF_STEP_HEIGHT};
use crate::upstream::{extract_json_array, RecipeLine, TrajectoryPlanner};

/// 工作点
pub const WORK_POSE: [f64; 3] = [0.0, -0.2, 1.0];
/// 倒入点（杯子上方）
pub const CUP_POSE: [f64; 3] = [-0.3, -0.2, 1.0];
/// 货架前的准备 / 后退位置
pub const PRE_GRASP_Y: f64 = -0.05;
/// 抓取接触位置
pub const GRASP_Y: f64 = 0.09;
/// 最低一层抓取高度
const GRASP_BASE_Z: f64 = 0.8;
/// 倾倒流速（ml/s）：WAIT = amount_ml / rate
pub const DEFAULT_POUR_RATE_ML_PER_S: f64 = 50.0;
/// 倾倒时手腕转角
const POUR_ANGLE: f64 = 90.0;

fn grasp_xz(cell: GridCell) -> (f64, f64) {
    (
        (cell.col() as f64 - 1.0) * COLUMN_SPACING,
        GRASP_BASE_Z + cell.row() as f64 * SHELF_STEP_HEIGHT,
    )
}

fn move_to(position: [f64; 3]) -> ActionCommand {
    ActionCommand::Move { position }
}

#[derive(Debug, Clone)]
pub struct SopPlanner {
    pour_rate_ml_per_s: f64,
}

impl SopPlanner {
    pub fn new(pour_rate_ml_per_s: f64) -> Self {
        Self { pour_rate_ml_per_s }
    }

    pub fn actions_for(&self, amount_ml: f64, cell: GridCell) -> Vec<ActionCommand> {
        let (x, z) = grasp_xz(cell);
        let pre = [x, PRE_GRASP_Y, z];
        let grasp = [x, GRASP_Y, z];
        let pour_seconds = if self.pour_rate_ml_per_s > 0.0 {
            (amount_ml / self.pour_rate_ml_per_s).max(0.0)
        } else {
            0.0
        };

        vec![
            move_to(WORK_POSE),
            move_to(pre),
            move_to(grasp),
            ActionCommand::Grab { width: 0.0 },
            move_to(pre),
            move_to(WORK_POSE),
            move_to(CUP_POSE),
            ActionCommand::Wrist {
                angle_degrees: -POUR_ANGLE,
            },
            ActionCommand::Wait {
                seconds: pour_seconds,
            },
            ActionCommand::Wrist {
                angle_degrees: POUR_ANGLE,
            },
            move_to(WORK_POSE),
            move_to(pre),
            move_to(grasp),
            ActionCommand::Grab { width: 0.04 },
            move_to(pre),
            move_to(WORK_POSE),
        ]
    }
}

impl Default for SopPlanner {
    fn default() -> Self {
        Self::new(DEFAULT_POUR_RATE_ML_PER_S)
    }
}

#[async_trait]
impl TrajectoryPlanner for SopPlanner {
    async fn plan_line(&self, line: &RecipeLine, cell: GridCell) -> Result<Plan, UpstreamError> {
        Ok(Plan::from_actions(self.actions_for(line.amount_ml, cell)))
    }
}

fn planner_prompt(pour_rate: f64) -> String {
    format!(
        r#"你负责为机械臂生成取料动作序列。输入是 {{"target": 原料名, "grid": [row, col], "amount_ml": 用量}}。

固定位置：工作点 {work:?}，倒入点 {cup:?}。
目标坐标：X = (col - 1) * 0.2，Z = 0.8 + row * 0.15；准备位 Y = {pre}，抓取位 Y = {grasp}。
取放只能沿 Y 轴水平进出，禁止垂直提起。

动作顺序：
MOVE 工作点 -> MOVE 准备位 -> MOVE 抓取位 -> GRAB 0.0 -> MOVE 准备位 -> MOVE 工作点 -> MOVE 倒入点
-> WRIST -90 -> WAIT amount_ml / {pour_rate} -> WRIST 90
-> MOVE 工作点 -> MOVE 准备位 -> MOVE 抓取位 -> GRAB 0.04 -> MOVE 准备位 -> MOVE 工作点

只输出一个 JSON 数组，每个元素符合以下 Schema：
{schema}"#,
        work = WORK_POSE,
        cup = CUP_POSE,
        pre = PRE_GRASP_Y,
        grasp = GRASP_Y,
        schema = ActionCommand::json_schema(),
    )
}

pub struct LlmTrajectoryPlanner {
    client: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl LlmTrajectoryPlanner {
    pub fn new(client: Arc<dyn LlmClient>, pour_rate_ml_per_s: f64) -> Self {
        Self {
            client,
            system_prompt: planner_prompt(pour_rate_ml_per_s),
        }
    }
}

#[async_trait]
impl TrajectoryPlanner for LlmTrajectoryPlanner {
    async fn plan_line(&self, line: &RecipeLine, cell: GridCell) -> Result<Plan, UpstreamError> {
        let input = serde_json::json!({
            "target": line.ingredient,
            "grid": cell,
            "amount_ml": line.amount_ml,
        });
        tracing::info!(ingredient = %line.ingredient, grid = ?cell, "planning ingredient");

        let raw = self
            .client
            .complete(&[
                Message::system(self.system_prompt.clone()),
                Message::user(input.to_string()),
            ])
            .await
            .map_err(|e| UpstreamError::Llm(e.to_string()))?;

        let body = extract_json_array(&raw)
            .ok_or_else(|| UpstreamError::Planner(format!("no JSON array in: {raw}")))?;
        Plan::from_json_str(&body).map_err(|e| UpstreamError::Planner(e.to_string()))
    }
}
