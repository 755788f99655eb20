//! 物理 tick 调度器：固定节拍推进仿真时间，是唯一调用 step_simulation 的地方

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::sim::SharedEngine;

#[derive(Clone)]
pub struct TickScheduler {
    engine: SharedEngine,
    period: Duration,
    ticks: Arc<AtomicU64>,
}

/// 节拍周期下限；interval 不接受零周期
pub const MIN_TICK_PERIOD: Duration = Duration::from_micros(1);

impl TickScheduler {
    pub fn new(engine: SharedEngine, tick_hz: f64) -> Self {
        Self {
            engine,
            period: Self::period_for(tick_hz),
            ticks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// tick_hz -> 周期：低于 1 Hz（或 NaN）按 1 Hz，过高的频率夹到 MIN_TICK_PERIOD
    pub fn period_for(tick_hz: f64) -> Duration {
        Duration::try_from_secs_f64(1.0 / tick_hz.max(1.0))
            .unwrap_or(MIN_TICK_PERIOD)
            .max(MIN_TICK_PERIOD)
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// 已执行的 tick 数
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(period_us = self.period.as_micros() as u64, "tick scheduler started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = interval.tick() => {
                        self.engine.lock().await.step_simulation();
                        self.ticks.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            tracing::info!(ticks = self.ticks(), "tick scheduler stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{share, SimWorld};

    #[test]
    fn test_period_is_clamped() {
        assert_eq!(TickScheduler::period_for(1e10), MIN_TICK_PERIOD);
        assert_eq!(TickScheduler::period_for(f64::INFINITY), MIN_TICK_PERIOD);
        assert_eq!(TickScheduler::period_for(0.0), Duration::from_secs(1));
        assert_eq!(TickScheduler::period_for(f64::NAN), Duration::from_secs(1));
        let period = TickScheduler::period_for(240.0);
        assert!((period.as_secs_f64() - 1.0 / 240.0).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_extreme_tick_rate_still_runs() {
        let (_world, shared) = share(SimWorld::default());
        let ticker = TickScheduler::new(shared, 1e10);
        let counter = ticker.clone();
        let shutdown = CancellationToken::new();
        let handle = ticker.spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(1)).await;
        shutdown.cancel();
        handle.await.unwrap();
        assert!(counter.ticks() > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticks_advance_until_shutdown() {
        let (world, shared) = share(SimWorld::default());
        let ticker = TickScheduler::new(shared, 240.0);
        let counter = ticker.clone();
        let shutdown = CancellationToken::new();
        let handle = ticker.spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        shutdown.cancel();
        handle.await.unwrap();

        let n = counter.ticks();
        assert!(n >= 20, "only {n} ticks");
        assert_eq!(world.lock().await.ticks(), n);
    }
}
