//! 执行引擎
//!
//! 按顺序驱动动作列表：畸形条目 -> 未实现 -> 权限拒绝 -> 前序已出错 -> 占位值无法解析 -> 调用。
//! 每步恰好产生一个 StepOutcome；运行级错误标志在首次出错时置位，本次运行内不再清除，
//! 之后已授权的步骤一律记为 UpstreamError 而不真正执行。

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use crate::actions::{ActionRegistry, BindingFactory};
use crate::chain::bucket::resolve_placeholders;
use crate::chain::permission::is_permitted;
use crate::chain::{
    ActionEntry, ActionInvoker, ChainState, ExecutionTrace, PermissionMap, StepOutcome,
    StepStatus, ValueBucket, DEFAULT_PLACEHOLDER, UNKNOWN_ACTION,
};
use crate::config::ChainSection;
use crate::core::{ChainError, StepError};
use crate::extract::ExtractedResponse;

/// 一次运行（执行或重执行）的可变上下文；桶只由引擎写入
pub(crate) struct RunContext<'a> {
    pub registry: &'a ActionRegistry,
    pub permissions: &'a PermissionMap,
    pub input: &'a mut ValueBucket,
    pub output: &'a mut ValueBucket,
    pub errored: bool,
}

/// 链式动作引擎：持有绑定工厂、调用器与占位符；P 为调用方传给绑定工厂的参数类型
pub struct ChainEngine<P> {
    bindings: Option<Arc<dyn BindingFactory<P>>>,
    invoker: ActionInvoker,
    placeholder: String,
}

impl<P> Default for ChainEngine<P> {
    fn default() -> Self {
        Self {
            bindings: None,
            invoker: ActionInvoker::default(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

impl<P> ChainEngine<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(cfg: &ChainSection) -> Self {
        Self {
            bindings: None,
            invoker: ActionInvoker::from_config(cfg),
            placeholder: cfg.placeholder.clone(),
        }
    }

    pub fn with_bindings(mut self, factory: impl BindingFactory<P> + 'static) -> Self {
        self.bindings = Some(Arc::new(factory));
        self
    }

    pub fn with_invoker(mut self, invoker: ActionInvoker) -> Self {
        self.invoker = invoker;
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// 调用绑定工厂得到本次运行的实现集合；未提供工厂为调用方契约违例
    pub(crate) fn bind(&self, params: &P, state: &ChainState) -> Result<ActionRegistry, ChainError> {
        let factory = self.bindings.as_ref().ok_or(ChainError::BindingsMissing)?;
        Ok(factory.bind(params, state))
    }

    /// 执行已校验的响应
    ///
    /// 响应未校验、校验失败或未提供绑定时直接返回 Err，不执行任何步骤；
    /// 其余所有失败都记录在对应步骤的 StepOutcome 中。
    pub async fn execute(
        &self,
        response: &ExtractedResponse,
        permissions: &PermissionMap,
        params: &P,
    ) -> Result<ExecutionTrace, ChainError> {
        let entries = response.validated_actions()?;
        self.execute_actions(entries, response.state.clone(), permissions, params)
            .await
    }

    /// 执行一个动作列表（调用方已自行完成解析与校验）
    pub async fn execute_actions(
        &self,
        entries: &[ActionEntry],
        state: ChainState,
        permissions: &PermissionMap,
        params: &P,
    ) -> Result<ExecutionTrace, ChainError> {
        let registry = self.bind(params, &state)?;
        let run_id = Uuid::new_v4();
        let started_at = chrono::Utc::now().timestamp_millis();
        tracing::info!(%run_id, steps = entries.len(), actions = ?registry.action_names(), "chain run started");

        let mut input_bucket = ValueBucket::new();
        let mut output_bucket = ValueBucket::new();
        let mut run = RunContext {
            registry: &registry,
            permissions,
            input: &mut input_bucket,
            output: &mut output_bucket,
            errored: false,
        };

        let mut outcomes = Vec::with_capacity(entries.len());
        for (iteration, entry) in entries.iter().enumerate() {
            let outcome = match entry {
                ActionEntry::Proposed(action) => {
                    self.run_step(&mut run, iteration, &action.name, &action.args)
                        .await
                }
                ActionEntry::Malformed(raw) => malformed_step(&mut run, iteration, raw.clone()),
            };
            outcomes.push(outcome);
        }

        let trace = ExecutionTrace {
            run_id,
            outcomes,
            input_bucket,
            output_bucket,
            state,
            started_at,
            finished_at: chrono::Utc::now().timestamp_millis(),
        };
        log_finished("chain run finished", &trace);
        Ok(trace)
    }

    /// 单步状态机（未实现 -> 权限 -> 前序错误 -> 占位值 -> 调用），执行与重执行共用
    pub(crate) async fn run_step(
        &self,
        run: &mut RunContext<'_>,
        iteration: usize,
        key: &str,
        args: &Value,
    ) -> StepOutcome {
        if !run.registry.contains(key) {
            run.errored = true;
            tracing::warn!(iteration, action = key, "action not implemented");
            return StepOutcome::blocked(key, iteration, None, args.clone(), StepError::unimplemented(key));
        }

        if !is_permitted(key, run.permissions) {
            run.errored = true;
            tracing::warn!(iteration, action = key, "action not permitted");
            return StepOutcome::blocked(
                key,
                iteration,
                Some(false),
                args.clone(),
                StepError::unauthorized(key),
            );
        }

        if run.errored {
            tracing::warn!(iteration, action = key, "skipped after earlier error");
            return StepOutcome::blocked(key, iteration, Some(true), args.clone(), StepError::upstream());
        }

        let resolved = match resolve_placeholders(args, &self.placeholder, run.input, run.output) {
            Ok(resolved) => resolved,
            Err(err) => {
                run.errored = true;
                tracing::warn!(iteration, action = key, error = %err, "unresolved placeholder");
                return StepOutcome::blocked(key, iteration, Some(true), args.clone(), err);
            }
        };

        let invocation = self
            .invoker
            .invoke(run.registry, key, resolved.clone())
            .await;
        match &invocation.status {
            StepStatus::Result(value) => {
                let written = run.output.absorb(value);
                tracing::debug!(iteration, action = key, written, "action executed");
            }
            StepStatus::Error(err) => {
                run.errored = true;
                tracing::warn!(iteration, action = key, error = %err, "action failed");
            }
        }

        StepOutcome {
            key: key.to_string(),
            iteration,
            permission: Some(true),
            args: args.clone(),
            resolved_args: Some(resolved),
            status: invocation.status,
            duration_ms: Some(invocation.duration_ms),
        }
    }
}

/// 畸形条目：记为 MalformedEntry 并置位运行级错误
pub(crate) fn malformed_step(run: &mut RunContext<'_>, iteration: usize, raw: Value) -> StepOutcome {
    run.errored = true;
    tracing::warn!(iteration, "malformed action entry");
    StepOutcome::blocked(UNKNOWN_ACTION, iteration, None, raw, StepError::malformed())
}

pub(crate) fn log_finished(message: &str, trace: &ExecutionTrace) {
    let succeeded = trace.succeeded().count();
    tracing::info!(
        run_id = %trace.run_id,
        succeeded,
        failed = trace.outcomes.len() - succeeded,
        "{}",
        message
    );
}
