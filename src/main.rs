//! Barista - 具身咖啡师
//!
//! 入口：初始化日志，搭建仿真世界，启动 tick / 场景监听 / 点单三个任务，
//! 然后由唯一的 stdin 读取者分发输入：
//! - `/` 开头的行（去掉前缀）交给场景监听：`/0` 复位，`/13` 交换 1 号与 3 号瓶
//! - `q` 退出
//! - 其余为订单

use std::path::PathBuf;

use anyhow::Context;
use barista::core::{create_runtime, Command, OrderPhase};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    barista::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let mut runtime = create_runtime(config_path)
        .await
        .context("Failed to start workcell")?;
    runtime.shutdown.install_signal_handlers();

    println!("☕ Barista ready. Type an order, /0 to reset the scene, /13 to swap bottles 1 and 3, q to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut last_phase = OrderPhase::Idle;

    loop {
        tokio::select! {
            _ = runtime.shutdown.wait_for_shutdown() => break,
            Some(reply) = runtime.replies.recv() => println!("{reply}"),
            Ok(()) = runtime.state_rx.changed() => {
                let state = runtime.state_rx.borrow_and_update().clone();
                if state.phase != last_phase {
                    last_phase = state.phase;
                    match (&state.phase, &state.error_message) {
                        (OrderPhase::Error, Some(message)) => println!("  ✗ {message}"),
                        (OrderPhase::Idle, _) => {}
                        (phase, _) => println!("  {}", phase.label()),
                    }
                }
            }
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) | Err(_) => {
                        stdin_open = false;
                        let _ = runtime.cmd_tx.send(Command::Quit);
                        continue;
                    }
                };
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }
                if input.eq_ignore_ascii_case("q") {
                    let _ = runtime.cmd_tx.send(Command::Quit);
                } else if let Some(scene_command) = input.strip_prefix('/') {
                    let _ = runtime.scene_tx.send(scene_command.to_string());
                } else {
                    let _ = runtime.cmd_tx.send(Command::Submit(input.to_string()));
                }
            }
        }
    }

    let reason = runtime.shutdown.reason();
    let report = runtime.join().await;
    if !report.aborted.is_empty() {
        tracing::warn!(?reason, aborted = ?report.aborted, "some tasks had to be aborted");
    }
    println!("👋 Bye");
    Ok(())
}
