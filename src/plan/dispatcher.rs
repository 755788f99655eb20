//! 计划调度器：严格按顺序、互不重叠地执行动作计划
//!
//! MOVE -> move_to，GRAB -> grab，WRIST -> rotate_wrist，WAIT -> sleep。
//! 未知指令记 warn 后跳过，其余继续执行；计划跑完后固定执行一次归位移动。
//! 单步运动错误中止整份计划（不归位），错误原样返回。

use std::time::Duration;

use nalgebra::Vector3;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::core::MotionError;
use crate::motion::{GripperController, MotionExecutor, WristRotator};
use crate::plan::{ActionCommand, DispatchEvent, Plan, PlanStep};

/// 各类指令的插值步数与步间延时
#[derive(Debug, Clone, PartialEq)]
pub struct MotionSettings {
    pub move_steps: u32,
    pub wrist_steps: u32,
    pub grab_steps: u32,
    pub home_steps: u32,
    pub step_delay: Duration,
    pub home_position: [f64; 3],
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            move_steps: 150,
            wrist_steps: 100,
            grab_steps: 50,
            home_steps: 100,
            step_delay: Duration::from_millis(10),
            home_position: [0.0, -0.4, 1.0],
        }
    }
}

/// 一次计划执行的统计
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DispatchReport {
    pub executed: usize,
    pub skipped: usize,
    pub elapsed_ms: u64,
}

pub struct PlanDispatcher {
    motion: MotionExecutor,
    gripper: GripperController,
    wrist: WristRotator,
    settings: MotionSettings,
    event_tx: Option<mpsc::UnboundedSender<DispatchEvent>>,
}

impl PlanDispatcher {
    pub fn new(motion: MotionExecutor, settings: MotionSettings) -> Self {
        Self {
            gripper: GripperController::from_executor(&motion),
            wrist: WristRotator::new(motion.clone()),
            motion,
            settings,
            event_tx: None,
        }
    }

    /// 替换夹爪控制器（例如使用不同的稳定等待时间）
    pub fn with_gripper(mut self, gripper: GripperController) -> Self {
        self.gripper = gripper;
        self
    }

    pub fn with_events(mut self, event_tx: mpsc::UnboundedSender<DispatchEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    pub fn settings(&self) -> &MotionSettings {
        &self.settings
    }

    fn emit(&self, event: DispatchEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event);
        }
    }

    pub async fn execute(&self, plan: &Plan) -> Result<DispatchReport, MotionError> {
        let started = Instant::now();
        let total = plan.len();
        let mut executed = 0;
        let mut skipped = 0;

        tracing::info!(steps = total, "executing plan");

        for (index, step) in plan.steps().iter().enumerate() {
            match step {
                PlanStep::Action(command) => {
                    tracing::info!(step = index + 1, total, command = %command, "dispatch");
                    self.emit(DispatchEvent::StepStarted {
                        index,
                        total,
                        command: command.clone(),
                    });
                    let step_started = Instant::now();
                    self.run(command).await?;
                    executed += 1;
                    self.emit(DispatchEvent::StepCompleted {
                        index,
                        elapsed_ms: step_started.elapsed().as_millis() as u64,
                    });
                }
                PlanStep::Unrecognized { tag, raw } => {
                    tracing::warn!(step = index + 1, tag = %tag, raw = %raw, "unknown command skipped");
                    skipped += 1;
                    self.emit(DispatchEvent::StepSkipped {
                        index,
                        tag: tag.clone(),
                    });
                }
            }
        }

        self.emit(DispatchEvent::Homing);
        self.home().await?;

        self.emit(DispatchEvent::PlanFinished { executed, skipped });
        let report = DispatchReport {
            executed,
            skipped,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(executed, skipped, elapsed_ms = report.elapsed_ms, "plan finished");
        Ok(report)
    }

    /// 归位到固定 home 位置
    pub async fn home(&self) -> Result<(), MotionError> {
        let s = &self.settings;
        self.motion
            .move_to(Vector3::from(s.home_position), s.home_steps, s.step_delay)
            .await?;
        Ok(())
    }

    async fn run(&self, command: &ActionCommand) -> Result<(), MotionError> {
        let s = &self.settings;
        match *command {
            ActionCommand::Move { position } => {
                self.motion
                    .move_to(Vector3::from(position), s.move_steps, s.step_delay)
                    .await?;
            }
            ActionCommand::Grab { width } => {
                self.gripper.grab(width, s.grab_steps, s.step_delay).await?;
            }
            ActionCommand::Wrist { angle_degrees } => {
                self.wrist
                    .rotate_wrist(angle_degrees, s.wrist_steps, s.step_delay)
                    .await?;
            }
            ActionCommand::Wait { seconds } => {
                // 负数或非有限值按 0 处理
                let pause = Duration::try_from_secs_f64(seconds).unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = tokio::time::sleep(pause) => {}
                    _ = self.motion.cancel_token().cancelled() => return Err(MotionError::Cancelled),
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::{ArmHandle, ArmProfile};
    use crate::sim::{build_cafe_scene, share, JointSpeeds, SimWorld};

    fn dispatcher() -> PlanDispatcher {
        let mut world = SimWorld::default();
        let scene = build_cafe_scene(&mut world, &ArmProfile::panda(), JointSpeeds::default());
        let arm = ArmHandle::resolve(&world, scene.arm, ArmProfile::panda()).unwrap();
        let (_, shared) = share(world);
        PlanDispatcher::new(MotionExecutor::new(shared, arm), MotionSettings::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_plan_order() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = dispatcher().with_events(tx);
        let plan = Plan::from_json_str(r#"[{"cmd":"GRAB","width":0},{"cmd":"FOO"},{"cmd":"WAIT","time":0.5}]"#)
            .unwrap();

        let report = dispatcher.execute(&plan).await.unwrap();
        assert_eq!(report.executed, 2);
        assert_eq!(report.skipped, 1);

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(serde_json::to_value(&event).unwrap()["type"].as_str().unwrap().to_string());
        }
        assert_eq!(
            kinds,
            vec![
                "step_started",
                "step_completed",
                "step_skipped",
                "step_started",
                "step_completed",
                "homing",
                "plan_finished"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timing_is_reported_on_the_runtime_clock() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let dispatcher = dispatcher().with_events(tx);
        let plan = Plan::from_json_str(r#"[{"cmd":"WAIT","time":2.0}]"#).unwrap();

        let report = dispatcher.execute(&plan).await.unwrap();
        assert!(report.elapsed_ms >= 2000, "plan took {}ms", report.elapsed_ms);

        let mut wait_ms = None;
        while let Ok(event) = rx.try_recv() {
            if let DispatchEvent::StepCompleted { index: 0, elapsed_ms } = event {
                wait_ms = Some(elapsed_ms);
            }
        }
        let wait_ms = wait_ms.unwrap();
        assert!((2000..2100).contains(&wait_ms), "wait took {wait_ms}ms");
    }

    #[tokio::test(start_paused = true)]
    async fn test_negative_wait_does_not_sleep() {
        let dispatcher = dispatcher();
        let started = Instant::now();
        dispatcher
            .run(&ActionCommand::Wait { seconds: -3.0 })
            .await
            .unwrap();
        assert!(started.elapsed() < Duration::from_millis(1));
    }
}
