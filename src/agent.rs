//! 点单流水线
//!
//! process_order 依次执行：
//! [1/4] 订单 -> 配方；[2/4] 扫描货架并核对库存；[3/4] 配方 + 位置 -> 动作计划；[4/4] 执行（含归位）。
//! 前三步任何失败都以 UpstreamError 中止，此时机械臂尚未收到任何指令。

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::core::{BaristaError, BaristaState, OrderPhase, UpstreamError};
use crate::plan::{DispatchReport, PlanDispatcher};
use crate::upstream::{IngredientLocator, LocationMap, Recipe, RecipeReasoner, TrajectoryPlanner};

/// 一单的执行记录
#[derive(Debug, Clone, Serialize)]
pub struct OrderReport {
    pub id: Uuid,
    pub order: String,
    pub product_name: String,
    pub recipe: Recipe,
    pub locations: LocationMap,
    pub plan_steps: usize,
    pub dispatch: DispatchReport,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct CoffeeAgent {
    reasoner: Arc<dyn RecipeReasoner>,
    locator: Arc<dyn IngredientLocator>,
    planner: Arc<dyn TrajectoryPlanner>,
    dispatcher: Arc<PlanDispatcher>,
    state_tx: Option<watch::Sender<BaristaState>>,
}

impl CoffeeAgent {
    pub fn new(
        reasoner: Arc<dyn RecipeReasoner>,
        locator: Arc<dyn IngredientLocator>,
        planner: Arc<dyn TrajectoryPlanner>,
        dispatcher: Arc<PlanDispatcher>,
    ) -> Self {
        Self {
            reasoner,
            locator,
            planner,
            dispatcher,
            state_tx: None,
        }
    }

    pub fn with_state(mut self, state_tx: watch::Sender<BaristaState>) -> Self {
        self.state_tx = Some(state_tx);
        self
    }

    fn publish(&self, state: BaristaState) {
        if let Some(tx) = &self.state_tx {
            let _ = tx.send(state);
        }
    }

    fn enter(&self, order: &str, phase: OrderPhase) {
        tracing::info!(phase = phase.label(), "order stage");
        self.publish(BaristaState::working(order, phase));
    }

    pub async fn process_order(&self, order: &str) -> Result<OrderReport, BaristaError> {
        let result = self.run_pipeline(order).await;
        match &result {
            Ok(report) => {
                tracing::info!(
                    id = %report.id,
                    product = %report.product_name,
                    steps = report.plan_steps,
                    "order complete"
                );
                self.publish(BaristaState::default());
            }
            Err(e) => {
                tracing::warn!(order, error = %e, "order aborted");
                self.publish(BaristaState::failed(order, e.to_string()));
            }
        }
        result
    }

    async fn run_pipeline(&self, order: &str) -> Result<OrderReport, BaristaError> {
        let id = Uuid::new_v4();
        let started_at = Utc::now();
        tracing::info!(%id, order, "order received");

        self.enter(order, OrderPhase::Interpreting);
        let recipe = self.reasoner.interpret(order).await?.into_recipe()?;
        tracing::info!(product = %recipe.product_name, lines = recipe.steps.len(), "recipe ready");

        self.enter(order, OrderPhase::Locating);
        let locations = self.locator.locate().await?;
        let missing = recipe.missing_from(&locations);
        if !missing.is_empty() {
            return Err(UpstreamError::MissingIngredients(missing).into());
        }

        self.enter(order, OrderPhase::Planning);
        let plan = self.planner.plan_recipe(&recipe, &locations).await;
        if plan.is_empty() {
            return Err(UpstreamError::EmptyPlan.into());
        }
        tracing::info!(steps = plan.len(), "plan ready");

        self.publish(BaristaState {
            phase: OrderPhase::Executing,
            order: Some(order.to_string()),
            product: Some(recipe.product_name.clone()),
            progress: Some((0, plan.len())),
            error_message: None,
        });
        let dispatch = self.dispatcher.execute(&plan).await?;

        Ok(OrderReport {
            id,
            order: order.to_string(),
            product_name: recipe.product_name.clone(),
            locations,
            plan_steps: plan.len(),
            dispatch,
            recipe,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{MockLlmClient, CANNED_RECIPE};
    use crate::motion::{ArmHandle, ArmProfile, MotionExecutor};
    use crate::plan::MotionSettings;
    use crate::scene::GridCell;
    use crate::sim::{build_cafe_scene, share, JointSpeeds, SimWorld, SimulationEngine};
    use crate::upstream::{FixedLocator, LlmRecipeReasoner, SopPlanner};

    fn agent_with(
        reply: &str,
        locator: FixedLocator,
    ) -> (std::sync::Arc<tokio::sync::Mutex<SimWorld>>, crate::sim::BodyId, CoffeeAgent) {
        let mut world = SimWorld::default();
        let scene = build_cafe_scene(&mut world, &ArmProfile::panda(), JointSpeeds::default());
        let arm = ArmHandle::resolve(&world, scene.arm, ArmProfile::panda()).unwrap();
        let (world, shared) = share(world);
        let dispatcher = PlanDispatcher::new(MotionExecutor::new(shared, arm), MotionSettings::default());
        let llm = Arc::new(MockLlmClient::scripted(vec![Ok(reply.to_string())]));
        let agent = CoffeeAgent::new(
            Arc::new(LlmRecipeReasoner::new(llm)),
            Arc::new(locator),
            Arc::new(SopPlanner::default()),
            Arc::new(dispatcher),
        );
        (world, scene.arm, agent)
    }

    #[tokio::test]
    async fn test_rejected_order_never_moves_the_arm() {
        let (world, arm, agent) = agent_with(
            r#"{"status":"reject","reason":"no strawberry jam"}"#,
            FixedLocator::shelf_default(),
        );
        let err = agent.process_order("strawberry latte").await.unwrap_err();
        assert!(matches!(err, BaristaError::Upstream(UpstreamError::Rejected(_))));
        assert_eq!(world.lock().await.joint_motor(arm, 0).unwrap(), None);
    }

    #[tokio::test]
    async fn test_missing_ingredient_aborts_before_motion() {
        let mut map = LocationMap::new();
        map.insert("ESPRESSO".into(), GridCell(0, 0));
        let (world, arm, agent) = agent_with(CANNED_RECIPE, FixedLocator::new(map));

        let (tx, rx) = watch::channel(BaristaState::default());
        let agent = agent.with_state(tx);
        let err = agent.process_order("americano").await.unwrap_err();
        assert!(matches!(
            err,
            BaristaError::Upstream(UpstreamError::MissingIngredients(ref m)) if m == &vec!["WATER".to_string()]
        ));
        assert_eq!(rx.borrow().phase, OrderPhase::Error);
        assert_eq!(world.lock().await.joint_motor(arm, 0).unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_order_runs_every_planned_step() {
        let (_world, _arm, agent) = agent_with(CANNED_RECIPE, FixedLocator::shelf_default());
        let report = agent.process_order("americano").await.unwrap();
        assert_eq!(report.product_name, "Americano");
        assert_eq!(report.plan_steps, 32);
        assert_eq!(report.dispatch.executed, 32);
        assert_eq!(report.dispatch.skipped, 0);
        assert!(report.finished_at >= report.started_at);
    }
}
