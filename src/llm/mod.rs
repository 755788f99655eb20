//! LLM 层：客户端抽象与实现（OpenAI 兼容 / 智谱 / Mock）

pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;
pub mod zhipu;

pub use message::{Message, Role};
pub use mock::{MockLlmClient, CANNED_RECIPE};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{LlmClient, LlmError, RetryConfig, RetryingLlmClient};
pub use zhipu::{create_zhipu_client, GLM_4_5_FLASH, ZHIPU_BASE_URL};
