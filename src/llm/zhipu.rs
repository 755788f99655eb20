//! 智谱 GLM 客户端（OpenAI 兼容格式）
//!
//! - Base URL: https://open.bigmodel.cn/api/paas/v4/
//! - 默认模型: glm-4.5-flash

use crate::llm::OpenAiClient;

pub const ZHIPU_BASE_URL: &str = "https://open.bigmodel.cn/api/paas/v4/";
pub const GLM_4_5_FLASH: &str = "glm-4.5-flash";

/// 创建智谱客户端
///
/// - API Key 依次取参数、`ZHIPU_API_KEY`、`OPENAI_API_KEY`
/// - 模型依次取参数、`ZHIPU_MODEL`、`glm-4.5-flash`
pub fn create_zhipu_client(model: Option<&str>, base_url: Option<&str>, api_key: Option<&str>) -> OpenAiClient {
    let api_key = api_key
        .map(String::from)
        .or_else(|| std::env::var("ZHIPU_API_KEY").ok())
        .or_else(|| std::env::var("OPENAI_API_KEY").ok())
        .unwrap_or_else(|| "sk-placeholder".to_string());

    let model = model
        .map(String::from)
        .or_else(|| std::env::var("ZHIPU_MODEL").ok())
        .unwrap_or_else(|| GLM_4_5_FLASH.to_string());

    OpenAiClient::new(
        Some(base_url.unwrap_or(ZHIPU_BASE_URL)),
        &model,
        Some(api_key.as_str()),
    )
    .with_temperature(0.1)
}
