//! 闭包动作：用异步闭包直接绑定一个动作名，参数与返回值均为原始 JSON

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::actions::{Action, ActionRegistry};

type Handler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, String>> + Send + Sync>;

/// 闭包动作
pub struct FnAction {
    name: String,
    description: String,
    handler: Handler,
}

impl FnAction {
    pub fn new<F, Fut>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            handler: Arc::new(move |args: Value| -> BoxFuture<'static, Result<Value, String>> {
                Box::pin(handler(args))
            }),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl Action for FnAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, args: Value) -> Result<Value, String> {
        (self.handler)(args).await
    }
}

impl ActionRegistry {
    /// 注册闭包动作
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, String>> + Send + 'static,
    {
        self.register(FnAction::new(name, handler));
    }
}
