//! 抽取层：提示词生成、LLM 调用、模型输出解析与校验

pub mod extraction;
pub mod parser;
pub mod prompt;
pub mod response;

pub use extraction::Extraction;
pub use parser::{extract_json, parse_actions, validate_actions};
pub use prompt::{
    format_examples, render_prompt, state_description, type_description, wrap_type, Example,
    CHAINED_ACTION_PROMPT,
};
pub use response::{ExtractedResponse, ValidatedActions};
