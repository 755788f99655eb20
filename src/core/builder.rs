//! 工作单元构建器：统一的启动装配逻辑
//!
//! 按配置搭建仿真世界与咖啡吧场景，在构造时解析全部身份（机械臂、杯子、瓶子），
//! 再组装运动执行器、调度器、场景管理器与 tick 调度器。主程序与回放程序共用。

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::agent::CoffeeAgent;
use crate::config::{AppConfig, LlmProvider, PlannerKind};
use crate::core::BaristaError;
use crate::llm::LlmClient;
use crate::motion::{ArmHandle, ArmProfile, GripperController, MotionExecutor};
use crate::plan::PlanDispatcher;
use crate::scene::{SceneManager, SceneState, TickScheduler};
use crate::sim::{build_cafe_scene, share, BodyId, JointSpeeds, SharedEngine, SimWorld, SimulationEngine};
use crate::upstream::{
    LlmRecipeReasoner, LlmTrajectoryPlanner, SceneLocator, SopPlanner, TrajectoryPlanner,
};

pub struct WorkcellBuilder {
    config: AppConfig,
    profile: ArmProfile,
    cancel: CancellationToken,
}

impl WorkcellBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            profile: ArmProfile::panda(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_profile(mut self, profile: ArmProfile) -> Self {
        self.profile = profile;
        self
    }

    /// 关闭信号：传给所有执行器
    pub fn with_cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// 搭建世界并解析身份；任何身份缺失都是致命错误
    pub fn build(self) -> Result<Workcell, BaristaError> {
        let sim = &self.config.sim;
        let mut world = SimWorld::new(TickScheduler::period_for(sim.tick_hz).as_secs_f64());
        let scene = build_cafe_scene(
            &mut world,
            &self.profile,
            JointSpeeds {
                arm: sim.arm_joint_speed,
                finger: sim.finger_speed,
            },
        );

        let arm = ArmHandle::resolve(&world, scene.arm, self.profile.clone())
            .map_err(|e| BaristaError::Resolution(format!("arm: {e}")))?;
        if !world.contains_body(scene.cup) {
            return Err(BaristaError::Resolution(format!("cup {} not found", scene.cup)));
        }
        if let Some(b) = scene.bottles.iter().find(|b| !world.contains_body(b.body)) {
            return Err(BaristaError::Resolution(format!(
                "bottle {} ({}) not found",
                b.name, b.body
            )));
        }
        let state = SceneState::new(arm.clone(), scene.bottles)?;
        let bodies = world.body_count();

        let (world, engine) = share(world);
        let motion = MotionExecutor::new(engine.clone(), arm)
            .with_cancel_token(self.cancel.clone())
            .with_ik_tolerance(
                self.config.motion.ik_max_iterations,
                self.config.motion.ik_residual_threshold,
            );

        tracing::info!(tick_hz = sim.tick_hz, bodies, "workcell ready");

        Ok(Workcell {
            scene: SceneManager::new(engine.clone(), state),
            ticker: TickScheduler::new(engine.clone(), sim.tick_hz),
            cup: scene.cup,
            world,
            engine,
            motion,
            config: self.config,
        })
    }
}

/// 装配好的工作单元
pub struct Workcell {
    pub world: Arc<Mutex<SimWorld>>,
    pub engine: SharedEngine,
    pub scene: SceneManager,
    pub motion: MotionExecutor,
    pub ticker: TickScheduler,
    pub cup: BodyId,
    config: AppConfig,
}

impl Workcell {
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// 按 [motion] 配置组装调度器
    pub fn dispatcher(&self) -> PlanDispatcher {
        let gripper = GripperController::from_executor(&self.motion)
            .with_settle(self.config.motion.grip_settle());
        PlanDispatcher::new(self.motion.clone(), self.config.motion.settings()).with_gripper(gripper)
    }

    /// 按 [planner] 配置选择轨迹规划器
    pub fn trajectory_planner(&self, llm: Arc<dyn LlmClient>) -> Arc<dyn TrajectoryPlanner> {
        let planner = &self.config.planner;
        match planner.kind {
            PlannerKind::Llm if self.config.llm.provider == LlmProvider::Mock => {
                tracing::warn!("LLM planner requested with mock provider, using SOP planner");
                Arc::new(SopPlanner::new(planner.pour_rate_ml_per_s))
            }
            PlannerKind::Llm => Arc::new(LlmTrajectoryPlanner::new(llm, planner.pour_rate_ml_per_s)),
            PlannerKind::Sop => Arc::new(SopPlanner::new(planner.pour_rate_ml_per_s)),
        }
    }

    /// 组装点单流水线：LLM 配方、场景定位、按配置选择的规划器
    pub fn agent(&self, llm: Arc<dyn LlmClient>, dispatcher: Arc<PlanDispatcher>) -> CoffeeAgent {
        CoffeeAgent::new(
            Arc::new(LlmRecipeReasoner::new(llm.clone())),
            Arc::new(SceneLocator::new(self.scene.clone())),
            self.trajectory_planner(llm),
            dispatcher,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_build_resolves_scene() {
        let workcell = WorkcellBuilder::new(AppConfig::default()).build().unwrap();
        assert_eq!(workcell.scene.state().bottles().len(), 9);
        assert_eq!(workcell.dispatcher().settings().move_steps, 150);
        let world = workcell.world.lock().await;
        assert!(world.contains_body(workcell.cup));
        assert!(world.contains_body(workcell.motion.arm().body()));
    }
}
