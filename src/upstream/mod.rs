//! 上游协作者边界：配方推理、原料定位、轨迹规划
//!
//! 三者只产出结构化数据（Recipe / LocationMap / Plan），不触碰仿真。
//! 任何一步失败都以 UpstreamError 中止本单，且发生在第一条物理动作之前。

mod json;
mod locator;
mod planner;
mod recipe;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::UpstreamError;
use crate::plan::Plan;
use crate::scene::GridCell;

pub use json::{extract_json_array, extract_json_object, strip_code_fences};
pub use locator::{FixedLocator, SceneLocator};
pub use planner::{
    LlmTrajectoryPlanner, SopPlanner, CUP_POSE, DEFAULT_POUR_RATE_ML_PER_S, GRASP_Y, PRE_GRASP_Y,
    WORK_POSE,
};
pub use recipe::{LlmRecipeReasoner, RECIPE_SYSTEM_PROMPT};

/// 原料名 -> 货架格子
pub type LocationMap = BTreeMap<String, GridCell>;

/// 配方中的一行：原料与用量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeLine {
    pub ingredient: String,
    pub amount_ml: f64,
}

impl RecipeLine {
    pub fn new(ingredient: impl Into<String>, amount_ml: f64) -> Self {
        Self {
            ingredient: ingredient.into(),
            amount_ml,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub product_name: String,
    #[serde(default)]
    pub total_volume_ml: Option<f64>,
    pub steps: Vec<RecipeLine>,
    #[serde(default)]
    pub message: Option<String>,
}

impl Recipe {
    /// 配方里有但定位结果中没有的原料（保持配方顺序）
    pub fn missing_from(&self, locations: &LocationMap) -> Vec<String> {
        self.steps
            .iter()
            .filter(|line| !locations.contains_key(&line.ingredient))
            .map(|line| line.ingredient.clone())
            .collect()
    }
}

/// 配方推理结果：`{"status":"success",...}` 或 `{"status":"reject","reason":...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status")]
pub enum RecipeVerdict {
    #[serde(rename = "success")]
    Accepted(Recipe),
    #[serde(rename = "reject")]
    Rejected {
        reason: String,
        #[serde(default)]
        message: Option<String>,
    },
}

impl RecipeVerdict {
    /// 拒单与空配方都视为失败
    pub fn into_recipe(self) -> Result<Recipe, UpstreamError> {
        match self {
            RecipeVerdict::Accepted(recipe) if recipe.steps.is_empty() => {
                Err(UpstreamError::EmptyRecipe)
            }
            RecipeVerdict::Accepted(recipe) => Ok(recipe),
            RecipeVerdict::Rejected { reason, message } => Err(UpstreamError::Rejected(
                message.map_or(reason.clone(), |m| format!("{reason} ({m})")),
            )),
        }
    }
}

/// 订单文本 -> 配方
#[async_trait]
pub trait RecipeReasoner: Send + Sync {
    async fn interpret(&self, order: &str) -> Result<RecipeVerdict, UpstreamError>;
}

/// 扫描货架 -> 原料位置
#[async_trait]
pub trait IngredientLocator: Send + Sync {
    async fn locate(&self) -> Result<LocationMap, UpstreamError>;
}

/// 配方 + 位置 -> 动作计划
#[async_trait]
pub trait TrajectoryPlanner: Send + Sync {
    /// 为单个原料生成一段子计划
    async fn plan_line(&self, line: &RecipeLine, cell: GridCell) -> Result<Plan, UpstreamError>;

    /// 按配方顺序拼接各原料的子计划；找不到位置或生成失败的原料记 warn 后跳过
    async fn plan_recipe(&self, recipe: &Recipe, locations: &LocationMap) -> Plan {
        let mut plan = Plan::default();
        for line in &recipe.steps {
            let Some(cell) = locations.get(&line.ingredient) else {
                tracing::warn!(ingredient = %line.ingredient, "no location, skipped");
                continue;
            };
            match self.plan_line(line, *cell).await {
                Ok(part) if !part.is_empty() => plan.extend(part),
                Ok(_) => tracing::warn!(ingredient = %line.ingredient, "empty sub-plan, skipped"),
                Err(e) => {
                    tracing::warn!(ingredient = %line.ingredient, error = %e, "planning failed, skipped")
                }
            }
        }
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_wire_shapes() {
        let ok: RecipeVerdict = serde_json::from_str(
            r#"{"status":"success","product_name":"Latte","total_volume_ml":350,
                "steps":[{"ingredient":"ESPRESSO","amount_ml":40},{"ingredient":"MILK","amount_ml":310}],
                "message":"enjoy"}"#,
        )
        .unwrap();
        let recipe = ok.into_recipe().unwrap();
        assert_eq!(recipe.steps[1], RecipeLine::new("MILK", 310.0));

        let reject: RecipeVerdict =
            serde_json::from_str(r#"{"status":"reject","reason":"no tea","message":"sorry"}"#).unwrap();
        assert!(matches!(reject.into_recipe(), Err(UpstreamError::Rejected(r)) if r.contains("no tea")));
    }

    #[test]
    fn test_empty_recipe_is_an_error() {
        let verdict = RecipeVerdict::Accepted(Recipe {
            product_name: "Nothing".into(),
            total_volume_ml: None,
            steps: vec![],
            message: None,
        });
        assert_eq!(verdict.into_recipe(), Err(UpstreamError::EmptyRecipe));
    }

    #[test]
    fn test_missing_ingredients_keep_recipe_order() {
        let recipe = Recipe {
            product_name: "Mocha".into(),
            total_volume_ml: Some(350.0),
            steps: vec![
                RecipeLine::new("CHOCO", 30.0),
                RecipeLine::new("ESPRESSO", 40.0),
                RecipeLine::new("TEA", 280.0),
            ],
            message: None,
        };
        let mut map = LocationMap::new();
        map.insert("ESPRESSO".into(), GridCell(0, 0));
        assert_eq!(recipe.missing_from(&map), vec!["CHOCO", "TEA"]);
    }
}
