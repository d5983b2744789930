//! 解析后的模型响应：原始文本、校验结果与上下文状态快照
//!
//! ChainEngine::execute 只接受校验成功的响应。

use serde::{Deserialize, Serialize};

use crate::chain::{ActionEntry, ChainState};
use crate::core::ChainError;

/// 动作列表的校验结果；失败时 data 仍保留已解析出的条目
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedActions {
    pub success: bool,
    pub data: Vec<ActionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidatedActions {
    pub fn ok(data: Vec<ActionEntry>) -> Self {
        Self {
            success: true,
            data,
            error: None,
        }
    }

    pub fn failed(data: Vec<ActionEntry>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data,
            error: Some(error.into()),
        }
    }
}

/// 一次抽取的完整结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedResponse {
    pub input: String,
    pub prompt: String,
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated: Option<ValidatedActions>,
    #[serde(default)]
    pub state: ChainState,
}

impl ExtractedResponse {
    /// 由已解码的动作列表直接构造（调用方自行完成了解析与校验）
    pub fn from_actions(entries: Vec<ActionEntry>, state: ChainState) -> Self {
        Self {
            validated: Some(ValidatedActions::ok(entries)),
            state,
            ..Default::default()
        }
    }

    /// 执行前置条件：必须已校验且校验成功
    pub fn validated_actions(&self) -> Result<&[ActionEntry], ChainError> {
        let validated = self
            .validated
            .as_ref()
            .ok_or(ChainError::ResponseNotValidated)?;
        if !validated.success {
            return Err(ChainError::ValidationFailed(
                validated
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown validation error".to_string()),
            ));
        }
        Ok(&validated.data)
    }
}
