//! 重执行引擎
//!
//! 以上一次的 ExecutionTrace 为输入，在新的权限表下重放：已有 result 的步骤原样保留，
//! 其余步骤从记录的 key/args 重新走单步状态机，沿用（不重置）轨迹中的两个值桶。
//! 运行级错误标志每次重执行重新开始；畸形条目永远保持畸形。

use crate::chain::engine::{log_finished, malformed_step, ChainEngine, RunContext};
use crate::chain::{ExecutionTrace, PermissionMap};
use crate::core::{ChainError, StepErrorKind};

impl<P> ChainEngine<P> {
    /// 重执行上一次的轨迹；返回扩展后的新轨迹（run_id 与 started_at 不变）
    pub async fn re_execute(
        &self,
        previous: ExecutionTrace,
        permissions: &PermissionMap,
        params: &P,
    ) -> Result<ExecutionTrace, ChainError> {
        let registry = self.bind(params, &previous.state)?;
        let ExecutionTrace {
            run_id,
            outcomes: previous_outcomes,
            mut input_bucket,
            mut output_bucket,
            state,
            started_at,
            ..
        } = previous;

        let pending = previous_outcomes.iter().filter(|o| !o.is_success()).count();
        tracing::info!(%run_id, pending, "chain re-execution started");

        let mut run = RunContext {
            registry: &registry,
            permissions,
            input: &mut input_bucket,
            output: &mut output_bucket,
            errored: false,
        };

        let mut outcomes = Vec::with_capacity(previous_outcomes.len());
        for outcome in previous_outcomes {
            if outcome.is_success() {
                outcomes.push(outcome);
                continue;
            }

            let next = if outcome.error_kind() == Some(StepErrorKind::MalformedEntry) {
                malformed_step(&mut run, outcome.iteration, outcome.args)
            } else {
                self.run_step(&mut run, outcome.iteration, &outcome.key, &outcome.args)
                    .await
            };
            outcomes.push(next);
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
        log_finished("chain re-execution finished", &trace);
        Ok(trace)
    }
}
