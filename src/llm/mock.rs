//! Mock LLM 客户端（用于测试与演示，无需 API）
//!
//! 固定返回预设文本，并记录最后一次收到的提示词。

use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;

/// Mock 客户端：返回脚本化回复
#[derive(Debug, Default)]
pub struct MockLlmClient {
    reply: String,
    last_prompt: Mutex<Option<String>>,
}

impl MockLlmClient {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            last_prompt: Mutex::new(None),
        }
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|p| p.clone())
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, prompt: &str) -> Result<String, String> {
        if let Ok(mut last) = self.last_prompt.lock() {
            *last = Some(prompt.to_string());
        }
        if self.reply.is_empty() {
            return Err("mock reply not configured".to_string());
        }
        Ok(self.reply.clone())
    }
}
