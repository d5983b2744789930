//! 抽取：拼提示词 -> 调用 LLM -> 解析并校验动作列表，得到 ExtractedResponse
//!
//! 上下文状态的校验由调用方负责；这里只把传入的对象同时作为 validated / partial 透传。

use std::sync::Arc;

use serde_json::Value;

use crate::actions::ActionRegistry;
use crate::chain::{ChainState, DEFAULT_PLACEHOLDER};
use crate::core::ChainError;
use crate::extract::{
    format_examples, parse_actions, render_prompt, state_description, type_description,
    validate_actions, Example, ExtractedResponse, ValidatedActions, CHAINED_ACTION_PROMPT,
};
use crate::llm::LlmClient;

/// 抽取器：持有 LLM、声明的动作集合（只用于描述与校验，不会被调用）与示例
pub struct Extraction {
    llm: Arc<dyn LlmClient>,
    schema: ActionRegistry,
    examples: Vec<Example>,
    template: String,
    placeholder: String,
}

impl Extraction {
    pub fn new(llm: Arc<dyn LlmClient>, schema: ActionRegistry) -> Self {
        Self {
            llm,
            schema,
            examples: Vec::new(),
            template: CHAINED_ACTION_PROMPT.to_string(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }

    pub fn with_examples(mut self, examples: Vec<Example>) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn type_description(&self) -> String {
        type_description(&self.schema)
    }

    /// 只有 LLM 调用失败才返回 Err；解析 / 校验失败记录在 validated 中
    pub async fn invoke(
        &self,
        input: &str,
        state: Option<Value>,
    ) -> Result<ExtractedResponse, ChainError> {
        let prompt = render_prompt(
            &self.template,
            &self.type_description(),
            &state_description(state.as_ref(), "Current State: ", ", "),
            &format_examples(&self.examples),
            input,
            &self.placeholder,
        );

        let raw = self.llm.complete(&prompt).await.map_err(ChainError::Llm)?;

        let validated = match parse_actions(&raw) {
            Ok(entries) => validate_actions(entries, &self.schema),
            Err(err) => ValidatedActions::failed(Vec::new(), err.to_string()),
        };
        if let Some(error) = &validated.error {
            tracing::warn!(error = %error, "model response failed validation");
        }

        let validated_state = state.clone().filter(Value::is_object);
        Ok(ExtractedResponse {
            input: input.to_string(),
            prompt,
            raw,
            validated: Some(validated),
            state: ChainState {
                validated: validated_state,
                partial: state,
            },
        })
    }
}
