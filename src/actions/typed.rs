//! 强类型动作：每个动作声明自己的参数结构体（schemars 生成 JSON Schema）与返回类型
//!
//! 引擎层只看到 `Value`；参数的反序列化与结果的序列化都在 Typed 适配器里完成，
//! 开放字段扫描（占位值解析）只存在于 chain::bucket。

use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::actions::{Action, ActionRegistry};

/// 带声明参数 schema 的动作
#[async_trait]
pub trait TypedAction: Send + Sync + 'static {
    type Args: DeserializeOwned + JsonSchema + Send + 'static;
    type Output: Serialize + Send;

    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, String>;
}

/// 将 TypedAction 适配为 Action
pub struct Typed<T>(pub T);

/// 参数类型的 JSON Schema
pub fn args_schema<A: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(A)).unwrap_or_else(|_| serde_json::json!({"type": "object"}))
}

#[async_trait]
impl<T: TypedAction> Action for Typed<T> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn description(&self) -> &str {
        self.0.description()
    }

    fn parameters_schema(&self) -> Value {
        args_schema::<T::Args>()
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        let parsed: T::Args = serde_json::from_value(args)
            .map_err(|e| format!("Invalid arguments for \"{}\": {e}", self.0.name()))?;
        let output = self.0.call(parsed).await?;
        serde_json::to_value(output)
            .map_err(|e| format!("Failed to encode result of \"{}\": {e}", self.0.name()))
    }
}

impl ActionRegistry {
    pub fn register_typed(&mut self, action: impl TypedAction) {
        self.register(Typed(action));
    }

    pub fn with_typed(mut self, action: impl TypedAction) -> Self {
        self.register_typed(action);
        self
    }
}
