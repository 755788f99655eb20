//! LLM 客户端抽象与重试包装
//!
//! 所有后端（OpenAI 兼容 / 智谱 / Mock）实现 LlmClient::complete。
//! 重试只发生在这里：RetryingLlmClient 为每次尝试加超时，失败后指数退避重试。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::llm::Message;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Empty response")]
    EmptyResponse,

    #[error("Mock script exhausted")]
    Exhausted,
}

/// LLM 客户端 trait：非流式完成
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError>;

    /// 累计 token 使用统计：(prompt_tokens, completion_tokens, total_tokens)
    fn token_usage(&self) -> (u64, u64, u64) {
        (0, 0, 0)
    }
}

/// 重试参数
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// 首次失败后的最大重试次数
    pub max_retries: u32,
    pub initial_backoff: Duration,
    /// 单次尝试超时
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// 带超时与重试的客户端包装
pub struct RetryingLlmClient {
    inner: Arc<dyn LlmClient>,
    config: RetryConfig,
}

impl RetryingLlmClient {
    pub fn new(inner: Arc<dyn LlmClient>, config: RetryConfig) -> Self {
        Self { inner, config }
    }
}

#[async_trait]
impl LlmClient for RetryingLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let mut backoff = self.config.initial_backoff;
        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(
                self.config.request_timeout,
                self.inner.complete(messages),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(LlmError::Timeout(self.config.request_timeout)),
            };

            match result {
                Ok(content) => return Ok(content),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, backoff_ms = backoff.as_millis() as u64, "LLM call failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn token_usage(&self) -> (u64, u64, u64) {
        self.inner.token_usage()
    }
}
