//! Mock LLM 客户端（用于测试与离线运行，无需 API）
//!
//! 先按顺序返回脚本中的响应；脚本用完后返回固定的美式咖啡配方。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{LlmClient, LlmError, Message};

/// 脚本用完后的默认回复
pub const CANNED_RECIPE: &str = r#"{"status":"success","product_name":"Americano","total_volume_ml":250,"steps":[{"ingredient":"ESPRESSO","amount_ml":50},{"ingredient":"WATER","amount_ml":200}],"message":"One Americano coming up."}"#;

#[derive(Debug, Default)]
pub struct MockLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    /// 脚本用完后是否报错（默认返回 CANNED_RECIPE）
    strict: bool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<Vec<Message>>>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按顺序返回给定响应，用完后报 Exhausted
    pub fn scripted(responses: Vec<Result<String, LlmError>>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            strict: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }

    /// 最近一次调用收到的消息
    pub fn last_prompt(&self) -> Option<Vec<Message>> {
        self.last_prompt.lock().ok().and_then(|g| g.clone())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(messages.to_vec());
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(response) => response,
            None if self.strict => Err(LlmError::Exhausted),
            None => Ok(CANNED_RECIPE.to_string()),
        }
    }
}
