//! 回放保存的动作计划
//!
//! 用法: barista-replay <plan.json> [config.toml]
//! 在全新的世界中启动物理 tick，按顺序执行计划（含归位），输出执行统计 JSON。

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use barista::config::load_config_or_default;
use barista::core::{run_until_shutdown, ShutdownManager, ShutdownSequence, WorkcellBuilder};
use barista::plan::Plan;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    barista::observability::init();

    let mut args = std::env::args().skip(1);
    let plan_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: barista-replay <plan.json> [config.toml]")?;
    let config_path = args.next().map(PathBuf::from);

    let text = tokio::fs::read_to_string(&plan_path)
        .await
        .with_context(|| format!("Failed to read {}", plan_path.display()))?;
    let plan = Plan::from_json_str(&text).context("Invalid plan file")?;

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();
    let workcell = WorkcellBuilder::new(load_config_or_default(config_path))
        .with_cancel_token(shutdown.token())
        .build()
        .context("Failed to build workcell")?;

    let mut teardown = ShutdownSequence::new(shutdown.clone(), workcell.engine.clone());
    teardown.track("ticker", workcell.ticker.clone().spawn(shutdown.token()));

    let dispatcher = workcell.dispatcher();
    let outcome = run_until_shutdown(&shutdown, dispatcher.execute(&plan)).await;
    teardown.run().await;

    match outcome {
        Some(Ok(report)) => println!("{}", serde_json::to_string_pretty(&report)?),
        Some(Err(e)) => return Err(e).context("Replay aborted"),
        None => tracing::warn!(reason = ?shutdown.reason(), "replay interrupted"),
    }
    Ok(())
}
