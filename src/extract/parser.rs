//! 模型输出解析：提取 JSON 动作数组并按已声明的动作校验
//!
//! 依次尝试 `<json>...</json>` 标签、```json 代码块、首个 `[` 到末个 `]` 之间的文本。

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::actions::ActionRegistry;
use crate::chain::ActionEntry;
use crate::core::ChainError;
use crate::extract::ValidatedActions;

static JSON_TAG_RE: OnceLock<Option<Regex>> = OnceLock::new();
static JSON_FENCE_RE: OnceLock<Option<Regex>> = OnceLock::new();

fn captured<'a>(re: &OnceLock<Option<Regex>>, pattern: &str, text: &'a str) -> Option<&'a str> {
    re.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()?
        .captures(text)?
        .get(1)
        .map(|m| m.as_str().trim())
}

/// 从模型原始输出中找出 JSON 文本
pub fn extract_json(raw: &str) -> Option<&str> {
    if let Some(s) = captured(&JSON_TAG_RE, r"(?s)<json>(.*?)</json>", raw) {
        return Some(s);
    }
    if let Some(s) = captured(&JSON_FENCE_RE, r"(?s)```(?:json)?\s*(.*?)```", raw) {
        return Some(s);
    }
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (end > start).then(|| &raw[start..=end])
}

/// 解析为动作条目列表；顶层必须是数组
pub fn parse_actions(raw: &str) -> Result<Vec<ActionEntry>, ChainError> {
    let json = extract_json(raw)
        .ok_or_else(|| ChainError::Parse(format!("no JSON action list found in: {}", raw.trim())))?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| ChainError::Parse(format!("{e}: {json}")))?;
    match value {
        Value::Array(items) => Ok(items.into_iter().map(ActionEntry::from_value).collect()),
        other => Err(ChainError::Parse(format!("expected a JSON array, got: {other}"))),
    }
}

/// 按已声明的动作集合校验：条目畸形、动作名未声明、参数不是对象都视为失败
pub fn validate_actions(entries: Vec<ActionEntry>, schema: &ActionRegistry) -> ValidatedActions {
    let mut problems = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        match entry {
            ActionEntry::Malformed(raw) => problems.push(format!("[{i}] malformed entry: {raw}")),
            ActionEntry::Proposed(action) if !schema.contains(&action.name) => {
                problems.push(format!("[{i}] unknown action \"{}\"", action.name))
            }
            ActionEntry::Proposed(action) if !action.args.is_object() => problems.push(format!(
                "[{i}] arguments of \"{}\" must be an object",
                action.name
            )),
            ActionEntry::Proposed(_) => {}
        }
    }

    if problems.is_empty() {
        ValidatedActions::ok(entries)
    } else {
        ValidatedActions::failed(entries, problems.join("; "))
    }
}
