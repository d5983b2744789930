//! 链式动作执行：值桶、权限门、调用器、执行引擎、重执行引擎

pub mod bucket;
pub mod engine;
pub mod invoker;
pub mod permission;
pub mod re_execute;
pub mod types;

pub use bucket::{is_scalar, resolve_placeholders, scalar_fields, ValueBucket};
pub use engine::ChainEngine;
pub use invoker::{ActionInvoker, Invocation};
pub use permission::{is_permitted, PermissionMap};
pub use types::{
    ActionEntry, ChainState, ExecutionTrace, ProposedAction, StepOutcome, StepStatus,
    DEFAULT_PLACEHOLDER, UNKNOWN_ACTION,
};
