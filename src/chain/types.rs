//! 链式执行的数据类型：动作条目、单步结果、执行轨迹、上下文状态

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::chain::ValueBucket;
use crate::core::{StepError, StepErrorKind};

/// 默认占位符：参数值为此字符串时表示「需从前序上下文解析」
pub const DEFAULT_PLACEHOLDER: &str = "unknown";

/// 畸形条目使用的动作名
pub const UNKNOWN_ACTION: &str = "unknown";

/// 模型提出的一个动作：名称 + 参数对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedAction {
    pub name: String,
    pub args: Value,
}

impl ProposedAction {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// 动作列表中的一条：正常解码为 Proposed，缺少 name/args 对时保留原始 JSON 为 Malformed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionEntry {
    Proposed(ProposedAction),
    Malformed(Value),
}

impl ActionEntry {
    /// 解码 `{"name": {...args}}`；必须是恰好一个键的对象
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) if map.len() == 1 => {
                let mut iter = map.into_iter();
                match iter.next() {
                    Some((name, args)) if !name.is_empty() => {
                        ActionEntry::Proposed(ProposedAction { name, args })
                    }
                    Some((name, args)) => {
                        let mut raw = serde_json::Map::new();
                        raw.insert(name, args);
                        ActionEntry::Malformed(Value::Object(raw))
                    }
                    None => ActionEntry::Malformed(Value::Object(serde_json::Map::new())),
                }
            }
            other => ActionEntry::Malformed(other),
        }
    }

    pub fn proposed(&self) -> Option<&ProposedAction> {
        match self {
            ActionEntry::Proposed(action) => Some(action),
            ActionEntry::Malformed(_) => None,
        }
    }
}

impl From<ProposedAction> for ActionEntry {
    fn from(action: ProposedAction) -> Self {
        ActionEntry::Proposed(action)
    }
}

/// 随请求传入的上下文状态（已校验 / 部分校验），原样透传给 BindingFactory 与轨迹
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainState {
    pub validated: Option<Value>,
    pub partial: Option<Value>,
}

/// 单步状态：result 与 error 恰好其一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Result(Value),
    Error(StepError),
}

/// 一个步骤的结构化记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    /// 动作名
    pub key: String,
    /// 在原始动作列表中的位置（从 0 开始），重执行不改变
    pub iteration: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<bool>,
    /// 提出时的参数（保留占位符），重执行总是从这里重新解析
    pub args: Value,
    /// 实际传给实现的参数；仅在发起调用时存在
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_args: Option<Value>,
    #[serde(flatten)]
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl StepOutcome {
    /// 未发起调用的失败步骤
    pub fn blocked(
        key: impl Into<String>,
        iteration: usize,
        permission: Option<bool>,
        args: Value,
        error: StepError,
    ) -> Self {
        Self {
            key: key.into(),
            iteration,
            permission,
            args,
            resolved_args: None,
            status: StepStatus::Error(error),
            duration_ms: None,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, StepStatus::Result(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.status {
            StepStatus::Result(value) => Some(value),
            StepStatus::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&StepError> {
        match &self.status {
            StepStatus::Result(_) => None,
            StepStatus::Error(err) => Some(err),
        }
    }

    pub fn error_kind(&self) -> Option<StepErrorKind> {
        self.error().map(|e| e.kind)
    }
}

/// 一次运行的完整记录；既返回给调用方，也是重执行的输入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub run_id: Uuid,
    pub outcomes: Vec<StepOutcome>,
    pub input_bucket: ValueBucket,
    pub output_bucket: ValueBucket,
    pub state: ChainState,
    /// 毫秒时间戳
    pub started_at: i64,
    pub finished_at: i64,
}

impl ExecutionTrace {
    pub fn succeeded(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| o.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &StepOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// 因权限被拒的动作名（按出现顺序，可重复）
    pub fn denied_actions(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.error_kind() == Some(StepErrorKind::Unauthorized))
            .map(|o| o.key.as_str())
            .collect()
    }

    /// 所有步骤都已成功
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(StepOutcome::is_success)
    }
}
