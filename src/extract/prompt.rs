//! 提示词生成：动作类型描述、示例、上下文状态描述与模板渲染

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::actions::ActionRegistry;

/// 默认的链式动作提示词模板
pub const CHAINED_ACTION_PROMPT: &str = "\
You translate a user request into an ordered list of actions.
Only use the actions declared below. When an argument depends on the result of an earlier action
or on context you do not have, write the string \"{placeholder}\" as its value.

{type_description}

{state_description}{format_instructions}
Answer with the JSON array wrapped in <json></json> tags and nothing else.

Input: {input_prompt}
Output:";

/// 一条提示词示例
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub input: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<Value>,
    pub output: Vec<Value>,
}

/// 包裹为代码块
pub fn wrap_type(body: &str) -> String {
    format!("```\n{body}\n```")
}

/// 为注册表中的每个动作生成 `type name = <参数 schema>`，末尾附 AvailableActions / OutputActions
pub fn type_description(registry: &ActionRegistry) -> String {
    let mut lines = Vec::new();
    let mut names = Vec::new();
    for action in registry.iter() {
        let description = action.description();
        if !description.is_empty() {
            lines.push(format!("\n// {description}"));
        }
        lines.push(format!(
            "type {} = {}",
            action.name(),
            action.parameters_schema()
        ));
        names.push(action.name().to_string());
    }

    let available = names
        .iter()
        .map(|n| format!("{{{n}: {n}}}"))
        .collect::<Vec<_>>()
        .join(" | ");

    wrap_type(&format!(
        "{}\n\ntype AvailableActions = {available}\n\ntype OutputActions = Array<AvailableActions>",
        lines.join("\n").trim_start()
    ))
}

/// 上下文状态描述：对象的各个值按 sep 拼接
pub fn state_description(state: Option<&Value>, title: &str, sep: &str) -> String {
    let Some(Value::Object(map)) = state else {
        return String::new();
    };
    let values: Vec<String> = map
        .values()
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    format!("{title}{}\n", values.join(sep))
}

/// 示例段落
pub fn format_examples(examples: &[Example]) -> String {
    let mut out = String::new();
    for example in examples {
        out.push_str(&format!("Input: {}\n", example.input));
        if let Some(state) = &example.state {
            out.push_str(&format!("State: {state}\n"));
        }
        out.push_str(&format!(
            "Output: <json>{}</json>\n\n",
            Value::Array(example.output.clone())
        ));
    }
    if out.is_empty() {
        out
    } else {
        format!("Examples:\n\n{out}")
    }
}

/// 渲染模板中的 {type_description} / {state_description} / {format_instructions} / {input_prompt} / {placeholder}
pub fn render_prompt(
    template: &str,
    type_description: &str,
    state_description: &str,
    format_instructions: &str,
    input: &str,
    placeholder: &str,
) -> String {
    template
        .replace("{type_description}", type_description)
        .replace("{state_description}", state_description)
        .replace("{format_instructions}", format_instructions)
        .replace("{placeholder}", placeholder)
        .replace("{input_prompt}", input)
}
