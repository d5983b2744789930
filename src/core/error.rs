//! 错误类型
//!
//! 两层：ChainError 为调用方契约违例（在任何步骤执行前直接返回 Err）；
//! StepError 为单步失败，作为数据记录在 StepOutcome 中，从不向调用方抛出。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 调用层错误：响应未校验、校验失败、未提供实现绑定，以及解析 / LLM / 配置错误
#[derive(Error, Debug)]
pub enum ChainError {
    #[error("Response is not validated")]
    ResponseNotValidated,

    #[error("Response is not successfully validated: {0}")]
    ValidationFailed(String),

    #[error("Action bindings are not provided")]
    BindingsMissing,

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}

/// 单步失败的分类（六种，互斥）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepErrorKind {
    /// 动作条目缺少 name/args
    MalformedEntry,
    /// 没有绑定该名称的实现
    Unimplemented,
    /// 权限拒绝
    Unauthorized,
    /// 本次运行中前序步骤已失败
    UpstreamError,
    /// 占位值在两个 bucket 中都找不到
    UnresolvedValue,
    /// 实现本身返回错误或超时
    InvocationFailure,
}

impl StepErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepErrorKind::MalformedEntry => "malformed_entry",
            StepErrorKind::Unimplemented => "unimplemented",
            StepErrorKind::Unauthorized => "unauthorized",
            StepErrorKind::UpstreamError => "upstream_error",
            StepErrorKind::UnresolvedValue => "unresolved_value",
            StepErrorKind::InvocationFailure => "invocation_failure",
        }
    }
}

impl std::fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单步错误：kind + message，可直接序列化为 JSON
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct StepError {
    pub kind: StepErrorKind,
    pub message: String,
}

impl StepError {
    pub fn new(kind: StepErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn malformed() -> Self {
        Self::new(StepErrorKind::MalformedEntry, "Function not found in iteration")
    }

    pub fn unimplemented(name: &str) -> Self {
        Self::new(
            StepErrorKind::Unimplemented,
            format!("Function \"{name}\" is not implemented yet"),
        )
    }

    pub fn unauthorized(name: &str) -> Self {
        Self::new(
            StepErrorKind::Unauthorized,
            format!("Execution of function \"{name}\" is not permitted by user"),
        )
    }

    pub fn upstream() -> Self {
        Self::new(StepErrorKind::UpstreamError, "Error detected in previous action")
    }

    pub fn unresolved(field: &str) -> Self {
        Self::new(
            StepErrorKind::UnresolvedValue,
            format!("Value of \"{field}\" is unknown or not specified"),
        )
    }

    pub fn invocation(message: impl Into<String>) -> Self {
        Self::new(StepErrorKind::InvocationFailure, message)
    }
}
