//! 值桶与占位值解析
//!
//! 两个桶：input 记录参数中出现过的具体标量值，output 记录成功结果中的标量字段，均按字段名后写覆盖。
//! 每次全新运行创建空桶，整个运行期间与后续重执行中只由引擎写入。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::StepError;

/// 字段名 -> 最近一次看到的标量值
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueBucket(BTreeMap<String, Value>);

impl ValueBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// 将结果对象中的所有标量字段写入桶；返回写入个数（非对象结果不写）
    pub fn absorb(&mut self, result: &Value) -> usize {
        let mut written = 0;
        for (field, value) in scalar_fields(result) {
            self.insert(field.clone(), value.clone());
            written += 1;
        }
        written
    }
}

/// 字符串 / 数字 / 布尔视为标量；null、对象、数组不参与解析
pub fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

/// 遍历对象的标量字段；非对象返回空迭代
pub fn scalar_fields(value: &Value) -> impl Iterator<Item = (&String, &Value)> {
    value
        .as_object()
        .into_iter()
        .flat_map(Map::iter)
        .filter(|(_, v)| is_scalar(v))
}

/// 解析参数中的占位值
///
/// 先把所有具体标量写入 input 桶，再把等于 placeholder 的字段依次用 output、input 桶中的值替换；
/// 任一字段两边都找不到时返回 UnresolvedValue。嵌套对象 / 数组原样保留。
/// 桶中等于 placeholder 的值视为不存在；整个 args 就是 placeholder 时同样阻断。
pub fn resolve_placeholders(
    args: &Value,
    placeholder: &str,
    input: &mut ValueBucket,
    output: &ValueBucket,
) -> Result<Value, StepError> {
    let Some(fields) = args.as_object() else {
        if args.as_str() == Some(placeholder) {
            return Err(StepError::unresolved("args"));
        }
        return Ok(args.clone());
    };

    for (field, value) in scalar_fields(args) {
        if value.as_str() != Some(placeholder) {
            input.insert(field.clone(), value.clone());
        }
    }

    let mut resolved = fields.clone();
    for (field, value) in resolved.iter_mut() {
        if value.as_str() != Some(placeholder) {
            continue;
        }
        let known = |v: &&Value| v.as_str() != Some(placeholder);
        let found = output
            .get(field)
            .filter(known)
            .or_else(|| input.get(field).filter(known));
        match found {
            Some(v) => *value = v.clone(),
            None => return Err(StepError::unresolved(field)),
        }
    }

    Ok(Value::Object(resolved))
}
