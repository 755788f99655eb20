//! 基于 LLM 的配方推理：订单文本 -> RecipeVerdict

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::UpstreamError;
use crate::llm::{LlmClient, Message};
use crate::upstream::{extract_json_object, RecipeReasoner, RecipeVerdict};

pub const RECIPE_SYSTEM_PROMPT: &str = r#"你是咖啡吧的配方师。根据顾客的自然语言订单，给出一份可以直接执行的配方。

可用原料（名称必须逐字匹配，不得使用其他原料）：
ESPRESSO 浓缩咖啡, WATER 热水, MILK 牛奶, VANILLA 香草糖浆, CARAMEL 焦糖糖浆,
CHOCO 巧克力酱, OAT 燕麦奶, SUGAR 砂糖, ICE 冰块

规则：
- 默认总量 350ml；顾客指定容量时以顾客为准；超过 1000ml 拒绝。
- 每种原料给出具体毫升数，主液体取余量。
- 加入顺序：ICE/SUGAR -> ESPRESSO -> 糖浆/酱 -> WATER/MILK/OAT。
- 做不了（缺原料）或明显不合理的订单一律拒绝，并写明原因。

只输出一个 JSON 对象，不要解释。
成功：{"status":"success","product_name":"...","total_volume_ml":350,"steps":[{"ingredient":"ESPRESSO","amount_ml":40}],"message":"..."}
拒绝：{"status":"reject","reason":"...","message":"..."}"#;

pub struct LlmRecipeReasoner {
    client: Arc<dyn LlmClient>,
}

impl LlmRecipeReasoner {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecipeReasoner for LlmRecipeReasoner {
    async fn interpret(&self, order: &str) -> Result<RecipeVerdict, UpstreamError> {
        let messages = [Message::system(RECIPE_SYSTEM_PROMPT), Message::user(order)];
        let raw = self
            .client
            .complete(&messages)
            .await
            .map_err(|e| UpstreamError::NoRecipe(e.to_string()))?;
        let body = extract_json_object(&raw)
            .ok_or_else(|| UpstreamError::JsonParse(format!("no JSON object in: {raw}")))?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::JsonParse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmError, MockLlmClient, Role};

    #[tokio::test]
    async fn test_parses_fenced_reply_and_sends_prompt() {
        let mock = Arc::new(MockLlmClient::scripted(vec![Ok(
            "```json\n{\"status\":\"reject\",\"reason\":\"2L is too much\"}\n```".into(),
        )]));
        let reasoner = LlmRecipeReasoner::new(mock.clone());
        let verdict = reasoner.interpret("a 2 litre coffee").await.unwrap();
        assert!(matches!(verdict, RecipeVerdict::Rejected { ref reason, .. } if reason == "2L is too much"));

        let prompt = mock.last_prompt().unwrap();
        assert_eq!(prompt[0].role, Role::System);
        assert_eq!(prompt[1].content, "a 2 litre coffee");
    }

    #[tokio::test]
    async fn test_llm_failure_means_no_recipe() {
        let mock = Arc::new(MockLlmClient::scripted(vec![Err(LlmError::EmptyResponse)]));
        let reasoner = LlmRecipeReasoner::new(mock);
        assert!(matches!(
            reasoner.interpret("latte").await,
            Err(UpstreamError::NoRecipe(_))
        ));
    }
}
