//! actchain - LLM 链式动作执行引擎
//!
//! 模块划分：
//! - **actions**: Action trait、注册表（实现绑定集合）、强类型动作、绑定工厂
//! - **chain**: 值桶、权限门、调用器、执行引擎、重执行引擎
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误类型
//! - **extract**: 提示词生成、模型输出解析与校验
//! - **llm**: LLM 客户端抽象与 Mock
//! - **observability**: 日志初始化

pub mod actions;
pub mod chain;
pub mod config;
pub mod core;
pub mod extract;
pub mod llm;
pub mod observability;

pub use actions::{Action, ActionRegistry, BindingFactory, FnAction, TypedAction};
pub use chain::{
    ActionEntry, ChainEngine, ChainState, ExecutionTrace, PermissionMap, ProposedAction,
    StepOutcome, StepStatus, ValueBucket,
};
pub use crate::core::{ChainError, StepError, StepErrorKind};
pub use extract::{Extraction, ExtractedResponse};
