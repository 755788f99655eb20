//! 编排器：主控循环
//!
//! 负责：加载配置、搭建工作单元、创建 LLM 与点单流水线，启动三个后台任务
//! （物理 tick、场景指令监听、点单循环），并返回前端所需的通道。
//! 点单执行期间场景指令照常处理：两者是独立调度的任务，只共享引擎锁。

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::config::{load_config_or_default, AppConfig, LlmProvider};
use crate::core::{
    BaristaError, BaristaState, ShutdownManager, ShutdownReason, ShutdownReport, ShutdownSequence,
    WorkcellBuilder,
};
use crate::llm::{create_zhipu_client, LlmClient, MockLlmClient, OpenAiClient, RetryingLlmClient};
use crate::plan::DispatchEvent;
use crate::scene::CommandListener;
use crate::sim::SharedEngine;

/// 前端发往编排器的命令
#[derive(Debug, Clone)]
pub enum Command {
    /// 提交一份订单
    Submit(String),
    /// 退出应用
    Quit,
}

/// 根据配置与环境变量选择 LLM 后端（智谱 / OpenAI 兼容 / Mock），外面包一层超时重试
pub(crate) fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    let llm = &cfg.llm;
    let inner: Arc<dyn LlmClient> = match llm.provider {
        LlmProvider::Zhipu
            if std::env::var("ZHIPU_API_KEY").is_ok() || std::env::var("OPENAI_API_KEY").is_ok() =>
        {
            let client =
                create_zhipu_client(llm.model.as_deref(), llm.base_url.as_deref(), None);
            tracing::info!("Using Zhipu LLM ({})", client.model());
            Arc::new(client)
        }
        LlmProvider::OpenAi if std::env::var("OPENAI_API_KEY").is_ok() => {
            let model = llm.model.clone().unwrap_or_else(|| "gpt-4o-mini".to_string());
            tracing::info!("Using OpenAI LLM ({})", model);
            Arc::new(OpenAiClient::new(llm.base_url.as_deref(), &model, None))
        }
        LlmProvider::Mock => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient::new())
        }
        _ => {
            tracing::warn!("No API key set for {:?}, using Mock LLM", llm.provider);
            Arc::new(MockLlmClient::new())
        }
    };
    Arc::new(RetryingLlmClient::new(inner, llm.retry_config()))
}

/// 运行中的系统：前端通过这些通道与后台任务交互
pub struct BaristaRuntime {
    /// 订单 / 退出命令
    pub cmd_tx: mpsc::UnboundedSender<Command>,
    /// 场景指令行（"0"、"13" ...）
    pub scene_tx: mpsc::UnboundedSender<String>,
    /// 场景指令回执与订单结果文本
    pub replies: mpsc::UnboundedReceiver<String>,
    pub state_rx: watch::Receiver<BaristaState>,
    pub shutdown: Arc<ShutdownManager>,
    pub engine: SharedEngine,
    teardown: ShutdownSequence,
}

impl BaristaRuntime {
    /// 停止后台任务并断开引擎
    pub async fn join(self) -> ShutdownReport {
        self.teardown.run().await
    }
}

/// 创建运行时：搭建世界并启动 tick、监听、点单三个任务
pub async fn create_runtime(config_path: Option<PathBuf>) -> Result<BaristaRuntime, BaristaError> {
    let cfg = load_config_or_default(config_path);
    let shutdown = Arc::new(ShutdownManager::new());

    let workcell = WorkcellBuilder::new(cfg.clone())
        .with_cancel_token(shutdown.token())
        .build()?;
    let llm = create_llm_from_config(&cfg);

    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Command>();
    let (scene_tx, scene_rx) = mpsc::unbounded_channel::<String>();
    let (reply_tx, replies) = mpsc::unbounded_channel::<String>();
    let (state_tx, state_rx) = watch::channel(BaristaState::default());
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<DispatchEvent>();

    let dispatcher = Arc::new(workcell.dispatcher().with_events(event_tx));
    let agent = workcell.agent(llm, dispatcher).with_state(state_tx.clone());

    let mut teardown = ShutdownSequence::new(shutdown.clone(), workcell.engine.clone());
    teardown.track("ticker", workcell.ticker.clone().spawn(shutdown.token()));
    teardown.track(
        "listener",
        CommandListener::new(workcell.scene.clone()).spawn(
            scene_rx,
            reply_tx.clone(),
            shutdown.token(),
        ),
    );

    // 执行进度 -> 状态投影
    let progress_tx = state_tx.clone();
    teardown.track("progress", tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            if let DispatchEvent::StepStarted { index, total, .. } = event {
                progress_tx.send_modify(|s| s.progress = Some((index + 1, total)));
            }
        }
    }));

    let order_shutdown = shutdown.clone();
    teardown.track("orders", tokio::spawn(async move {
        let token = order_shutdown.token();
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(Command::Submit(order)) => {
                            let reply = match agent.process_order(&order).await {
                                Ok(report) => format!(
                                    "Your {} is ready ({} steps, {:.1}s)",
                                    report.product_name,
                                    report.plan_steps,
                                    report.dispatch.elapsed_ms as f64 / 1000.0
                                ),
                                Err(e) => format!("Order failed: {e}"),
                            };
                            let _ = reply_tx.send(reply);
                        }
                        Some(Command::Quit) | None => {
                            order_shutdown.shutdown(ShutdownReason::UserInitiated);
                            break;
                        }
                    }
                }
            }
        }
        tracing::debug!("order loop stopped");
    }));

    Ok(BaristaRuntime {
        cmd_tx,
        scene_tx,
        replies,
        state_rx,
        shutdown,
        engine: workcell.engine.clone(),
        teardown,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_provider_is_selected() {
        let mut cfg = AppConfig::default();
        cfg.llm.provider = LlmProvider::Mock;
        let llm = create_llm_from_config(&cfg);
        let reply = llm.complete(&[crate::llm::Message::user("latte")]).await.unwrap();
        assert!(reply.contains("\"status\":\"success\""));
    }

    #[tokio::test]
    async fn test_scene_commands_and_quit() {
        use crate::sim::SimulationEngine;
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[llm]\nprovider = \"mock\"").unwrap();
        let mut runtime = create_runtime(Some(file.path().to_path_buf())).await.unwrap();

        runtime.scene_tx.send("12".to_string()).unwrap();
        let reply = runtime.replies.recv().await.unwrap();
        assert_eq!(reply, "Swapped ESPRESSO <-> WATER");

        runtime.scene_tx.send("5".to_string()).unwrap();
        let reply = runtime.replies.recv().await.unwrap();
        assert!(reply.starts_with("Unrecognized scene command"));

        runtime.cmd_tx.send(Command::Quit).unwrap();
        let engine = runtime.engine.clone();
        runtime.join().await;
        assert!(!engine.lock().await.is_connected());
    }
}
