//! 优雅关闭
//!
//! Ctrl+C / SIGTERM / 控制台 q 都汇聚到同一个 CancellationToken：
//! tick 调度器与监听任务退出循环，执行中的轨迹在下一个插值步返回 Cancelled。
//! ShutdownSequence 再按登记顺序等待这些任务收尾（超时则 abort），最后断开仿真引擎。

use std::future::Future;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::sim::SharedEngine;

/// 每个后台任务收尾的默认宽限期
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// 关闭原因；只记录第一次
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl+C、控制台 q 或回放结束
    UserInitiated,
    /// SIGTERM
    Signal,
}

/// 关闭信号管理器
#[derive(Debug, Default)]
pub struct ShutdownManager {
    token: CancellationToken,
    reason: OnceLock<ShutdownReason>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 交给 tick 调度器、监听任务与运动执行器的 token
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 触发关闭；重复调用不会覆盖最初的原因
    pub fn shutdown(&self, reason: ShutdownReason) {
        if self.reason.set(reason).is_ok() {
            tracing::info!(?reason, "shutdown requested");
        }
        self.token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn reason(&self) -> Option<ShutdownReason> {
        self.reason.get().copied()
    }

    pub async fn wait_for_shutdown(&self) {
        self.token.cancelled().await;
    }

    /// 安装系统信号处理器 (Ctrl+C, SIGTERM)
    pub fn install_signal_handlers(self: &Arc<Self>) {
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                manager.shutdown(ShutdownReason::UserInitiated);
            }
        });

        #[cfg(unix)]
        {
            let manager = Arc::clone(self);
            tokio::spawn(async move {
                use tokio::signal::unix::{signal, SignalKind};
                if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                    sigterm.recv().await;
                    manager.shutdown(ShutdownReason::Signal);
                }
            });
        }
    }
}

/// 一次关闭的结果
#[derive(Debug, Default, PartialEq)]
pub struct ShutdownReport {
    /// 在宽限期内自行退出的任务
    pub stopped: Vec<&'static str>,
    /// 超时被 abort 的任务
    pub aborted: Vec<&'static str>,
}

/// 关闭流程：取消 token -> 逐个等待后台任务 -> 断开引擎
pub struct ShutdownSequence {
    manager: Arc<ShutdownManager>,
    engine: SharedEngine,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
    grace: Duration,
}

impl ShutdownSequence {
    pub fn new(manager: Arc<ShutdownManager>, engine: SharedEngine) -> Self {
        Self {
            manager,
            engine,
            tasks: Vec::new(),
            grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// 登记一个需要在断开引擎前结束的任务
    pub fn track(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.tasks.push((name, handle));
    }

    pub async fn run(self) -> ShutdownReport {
        if !self.manager.is_shutdown() {
            self.manager.shutdown(ShutdownReason::UserInitiated);
        }

        let mut report = ShutdownReport::default();
        for (name, mut handle) in self.tasks {
            match tokio::time::timeout(self.grace, &mut handle).await {
                Ok(_) => report.stopped.push(name),
                Err(_) => {
                    tracing::warn!(task = name, grace_ms = self.grace.as_millis() as u64, "task did not stop, aborting");
                    handle.abort();
                    report.aborted.push(name);
                }
            }
        }

        self.engine.lock().await.disconnect();
        tracing::info!(stopped = report.stopped.len(), aborted = report.aborted.len(), "shutdown complete");
        report
    }
}

/// 运行 app 直到它结束或收到关闭信号；被打断时返回 None
pub async fn run_until_shutdown<F: Future>(manager: &ShutdownManager, app: F) -> Option<F::Output> {
    tokio::select! {
        output = app => Some(output),
        _ = manager.wait_for_shutdown() => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MotionError;
    use crate::motion::{ArmHandle, ArmProfile, MotionExecutor};
    use crate::scene::TickScheduler;
    use crate::sim::{build_cafe_scene, share, JointSpeeds, SimWorld, SimulationEngine};
    use nalgebra::Vector3;

    #[test]
    fn test_first_reason_is_kept() {
        let manager = ShutdownManager::new();
        let token = manager.token();
        assert_eq!(manager.reason(), None);

        manager.shutdown(ShutdownReason::Signal);
        manager.shutdown(ShutdownReason::UserInitiated);
        assert!(token.is_cancelled());
        assert_eq!(manager.reason(), Some(ShutdownReason::Signal));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequence_stops_ticker_then_disconnects() {
        let (world, shared) = share(SimWorld::default());
        let manager = Arc::new(ShutdownManager::new());
        let ticker = TickScheduler::new(shared.clone(), 240.0);
        let counter = ticker.clone();

        let mut sequence = ShutdownSequence::new(manager.clone(), shared);
        sequence.track("ticker", ticker.spawn(manager.token()));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let report = sequence.run().await;
        assert_eq!(report.stopped, vec!["ticker"]);
        assert!(report.aborted.is_empty());
        assert_eq!(manager.reason(), Some(ShutdownReason::UserInitiated));

        let world = world.lock().await;
        assert!(!world.is_connected());
        assert_eq!(world.ticks(), counter.ticks());
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_ignoring_token_is_aborted() {
        let (world, shared) = share(SimWorld::default());
        let manager = Arc::new(ShutdownManager::new());
        let mut sequence =
            ShutdownSequence::new(manager, shared).with_grace(Duration::from_millis(100));
        sequence.track(
            "stuck",
            tokio::spawn(tokio::time::sleep(Duration::from_secs(3600))),
        );

        let report = sequence.run().await;
        assert_eq!(report.aborted, vec!["stuck"]);
        assert!(!world.lock().await.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_trajectory_in_flight() {
        let mut world = SimWorld::default();
        let scene = build_cafe_scene(&mut world, &ArmProfile::panda(), JointSpeeds::default());
        let arm = ArmHandle::resolve(&world, scene.arm, ArmProfile::panda()).unwrap();
        let (_world, shared) = share(world);

        let manager = Arc::new(ShutdownManager::new());
        let motion = MotionExecutor::new(shared.clone(), arm).with_cancel_token(manager.token());
        let (result_tx, result_rx) = tokio::sync::oneshot::channel();
        let mut sequence = ShutdownSequence::new(manager, shared);
        sequence.track(
            "move",
            tokio::spawn(async move {
                let result = motion
                    .move_to(Vector3::new(0.0, -0.2, 1.0), 150, Duration::from_millis(10))
                    .await;
                let _ = result_tx.send(result);
            }),
        );

        tokio::time::sleep(Duration::from_millis(200)).await;
        let report = sequence.run().await;
        assert_eq!(report.stopped, vec!["move"]);
        assert_eq!(result_rx.await.unwrap(), Err(MotionError::Cancelled));
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let manager = ShutdownManager::new();
        assert_eq!(run_until_shutdown(&manager, async { 7 }).await, Some(7));

        manager.shutdown(ShutdownReason::Signal);
        let pending = std::future::pending::<()>();
        assert_eq!(run_until_shutdown(&manager, pending).await, None);
    }
}
