//! 动作层：Action trait、注册表（实现绑定集合）、强类型动作、闭包动作、绑定工厂

pub mod binding;
pub mod func;
pub mod registry;
pub mod typed;

pub use binding::BindingFactory;
pub use func::FnAction;
pub use registry::{Action, ActionRegistry};
pub use typed::{args_schema, Typed, TypedAction};
