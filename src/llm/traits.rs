//! LLM 客户端抽象
//!
//! 链式动作只需要一次非流式补全：输入完整提示词，返回模型原始文本。

use async_trait::async_trait;

/// LLM 客户端 trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// 非流式完成
    async fn complete(&self, prompt: &str) -> Result<String, String>;
}
