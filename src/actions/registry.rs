//! 动作注册表
//!
//! 所有动作实现 Action trait（name / description / parameters_schema / execute），由 ActionRegistry 按名注册与查找。
//! 一个 ActionRegistry 就是一次运行的实现绑定集合，由 BindingFactory 在每次执行 / 重执行时生成。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

/// 动作 trait：名称、描述（供 LLM 理解）、参数 schema、异步执行（args 与返回值均为 JSON）
#[async_trait]
pub trait Action: Send + Sync {
    /// 动作名称（对应响应中 `{"name": {...}}` 的键）
    fn name(&self) -> &str;

    /// 动作描述（写入提示词）
    fn description(&self) -> &str {
        ""
    }

    /// 参数 JSON Schema；默认表示任意对象
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
        })
    }

    /// 执行动作；Err 中的文本会作为 InvocationFailure 的 message
    async fn execute(&self, args: Value) -> Result<Value, String>;
}

/// 动作注册表：按名称存储 Arc<dyn Action>（BTreeMap 保证描述输出顺序稳定）
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, action: impl Action + 'static) {
        self.register_arc(Arc::new(action));
    }

    pub fn register_arc(&mut self, action: Arc<dyn Action>) {
        let name = action.name().to_string();
        self.actions.insert(name, action);
    }

    /// 链式注册，便于在 BindingFactory 闭包里一次性构建
    pub fn with(mut self, action: impl Action + 'static) -> Self {
        self.register(action);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.actions.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn action_names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Action>> {
        self.actions.values()
    }

    /// 返回 [{name, description, parameters}]，用于生成提示词或调试输出
    pub fn to_schema_json(&self) -> Value {
        Value::Array(
            self.actions
                .iter()
                .map(|(name, action)| {
                    serde_json::json!({
                        "name": name,
                        "description": action.description(),
                        "parameters": action.parameters_schema(),
                    })
                })
                .collect(),
        )
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.action_names())
            .finish()
    }
}
