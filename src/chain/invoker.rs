//! 动作调用器
//!
//! 按名从 ActionRegistry 取实现并调用一次，默认等待其自然结束；捕获实现返回的 Err 与 panic，
//! 统一转为 StepStatus；每次调用输出结构化审计日志（JSON）。
//! 超时仅在显式配置时生效，超时会丢弃进行中的调用。

use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};

use futures_util::FutureExt;
use serde_json::Value;
use tokio::time::timeout;

use crate::actions::ActionRegistry;
use crate::chain::StepStatus;
use crate::config::ChainSection;
use crate::core::StepError;

/// 一次调用的结果与耗时
#[derive(Debug, Clone)]
pub struct Invocation {
    pub status: StepStatus,
    pub duration_ms: u64,
}

/// 动作调用器：持有可选的单次调用超时与审计日志的参数预览长度
#[derive(Debug, Clone)]
pub struct ActionInvoker {
    timeout: Option<Duration>,
    args_preview_chars: usize,
}

impl Default for ActionInvoker {
    fn default() -> Self {
        Self::from_config(&ChainSection::default())
    }
}

impl ActionInvoker {
    pub fn new() -> Self {
        Self {
            timeout: None,
            args_preview_chars: 200,
        }
    }

    pub fn from_config(cfg: &ChainSection) -> Self {
        let invoker = Self::new().with_args_preview_chars(cfg.args_preview_chars);
        match cfg.invocation_timeout_secs {
            Some(secs) => invoker.with_timeout(Duration::from_secs(secs)),
            None => invoker,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn with_args_preview_chars(mut self, chars: usize) -> Self {
        self.args_preview_chars = chars;
        self
    }

    /// 调用 name 对应的实现；未绑定返回 Unimplemented，失败 / 超时 / panic 返回 InvocationFailure
    pub async fn invoke(&self, registry: &ActionRegistry, name: &str, args: Value) -> Invocation {
        let Some(action) = registry.get(name) else {
            return Invocation {
                status: StepStatus::Error(StepError::unimplemented(name)),
                duration_ms: 0,
            };
        };

        let start = Instant::now();
        let preview = args_preview(&args, self.args_preview_chars);
        let call = AssertUnwindSafe(action.execute(args)).catch_unwind();
        let result = match self.timeout {
            Some(limit) => timeout(limit, call).await.map_err(|_| limit),
            None => Ok(call.await),
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        let (ok, outcome, status) = match result {
            Ok(Ok(Ok(value))) => (true, "ok", StepStatus::Result(value)),
            Ok(Ok(Err(message))) => (
                false,
                "error",
                StepStatus::Error(StepError::invocation(message)),
            ),
            Ok(Err(panic)) => (
                false,
                "panic",
                StepStatus::Error(StepError::invocation(format!(
                    "Action \"{name}\" panicked: {}",
                    panic_message(panic.as_ref())
                ))),
            ),
            Err(limit) => (
                false,
                "timeout",
                StepStatus::Error(StepError::invocation(format!(
                    "Action \"{name}\" timed out after {}ms",
                    limit.as_millis()
                ))),
            ),
        };

        let audit = serde_json::json!({
            "event": "action_audit",
            "action": name,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": duration_ms,
            "args_preview": preview,
        });
        tracing::info!(audit = %audit.to_string(), "action");

        Invocation {
            status,
            duration_ms,
        }
    }
}

fn args_preview(args: &Value, max_chars: usize) -> String {
    let s = args.to_string();
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
