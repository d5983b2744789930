//! 绑定工厂：每次执行 / 重执行时调用一次，根据调用方参数与上下文状态生成本次运行的 ActionRegistry

use crate::actions::ActionRegistry;
use crate::chain::ChainState;

/// 绑定工厂 trait；任何 `Fn(&P, &ChainState) -> ActionRegistry` 闭包都自动实现
pub trait BindingFactory<P>: Send + Sync {
    fn bind(&self, params: &P, state: &ChainState) -> ActionRegistry;
}

impl<P, F> BindingFactory<P> for F
where
    F: Fn(&P, &ChainState) -> ActionRegistry + Send + Sync,
{
    fn bind(&self, params: &P, state: &ChainState) -> ActionRegistry {
        self(params, state)
    }
}
