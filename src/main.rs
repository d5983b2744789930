//! actchain 演示入口
//!
//! 初始化日志与配置，用 Mock LLM 抽取一条三步动作链并执行；
//! 被拒绝的步骤在放开权限后通过重执行补跑，两次轨迹均以 JSON 输出。

use anyhow::Context;
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use actchain::config::load_config;
use actchain::extract::Example;
use actchain::llm::MockLlmClient;
use actchain::{observability, ActionRegistry, ChainEngine, ChainState, Extraction, TypedAction};

const MOCK_REPLY: &str = r#"
<json>[{"search_user_with_name":{"name":"Diane"}},{"create_summary":{"text":"health care"}},{"send_email_to_user":{"email":"unknown","text":"unknown"}}]</json>"#;

/// 传给绑定工厂的调用方参数
#[derive(Debug, Clone)]
struct DemoParams {
    tenant: String,
}

#[derive(Deserialize, JsonSchema)]
struct SearchUserArgs {
    name: String,
}

#[derive(Serialize)]
struct SearchUserResult {
    email: String,
}

struct SearchUserWithName;

#[async_trait]
impl TypedAction for SearchUserWithName {
    type Args = SearchUserArgs;
    type Output = SearchUserResult;

    fn name(&self) -> &str {
        "search_user_with_name"
    }

    fn description(&self) -> &str {
        "When action needs information of a user to continue in order."
    }

    async fn call(&self, args: SearchUserArgs) -> Result<SearchUserResult, String> {
        Ok(SearchUserResult {
            email: format!("{}@gmail.com", args.name.to_lowercase()),
        })
    }
}

#[derive(Deserialize, JsonSchema)]
struct SendEmailArgs {
    email: String,
    text: String,
}

struct SendEmailToUser;

#[async_trait]
impl TypedAction for SendEmailToUser {
    type Args = SendEmailArgs;
    type Output = String;

    fn name(&self) -> &str {
        "send_email_to_user"
    }

    fn description(&self) -> &str {
        "When action is requesting to send an email to someone. Pass email of user as param."
    }

    async fn call(&self, args: SendEmailArgs) -> Result<String, String> {
        Ok(format!(
            "Sending email to {}, with subject: {}",
            args.email, args.text
        ))
    }
}

#[derive(Deserialize, Serialize, JsonSchema)]
struct SummaryText {
    text: String,
}

struct CreateSummary {
    params: DemoParams,
    state: ChainState,
}

#[async_trait]
impl TypedAction for CreateSummary {
    type Args = SummaryText;
    type Output = SummaryText;

    fn name(&self) -> &str {
        "create_summary"
    }

    fn description(&self) -> &str {
        "When action is requesting to create a summary of text. Pass text as param."
    }

    async fn call(&self, args: SummaryText) -> Result<SummaryText, String> {
        tracing::info!(tenant = %self.params.tenant, state = ?self.state.validated, "creating summary");
        Ok(SummaryText {
            text: format!("Summary of {}", args.text),
        })
    }
}

fn demo_bindings(params: &DemoParams, state: &ChainState) -> ActionRegistry {
    ActionRegistry::new()
        .with_typed(SearchUserWithName)
        .with_typed(SendEmailToUser)
        .with_typed(CreateSummary {
            params: params.clone(),
            state: state.clone(),
        })
}

fn examples() -> Vec<Example> {
    vec![
        Example {
            input: "Find user Rajat".into(),
            state: Some(serde_json::json!({"userSelectedContact": "Rajat"})),
            output: vec![serde_json::json!({"search_user_with_name": {"name": "Rajat"}})],
        },
        Example {
            input: "Send email to guy named Alex".into(),
            state: None,
            output: vec![
                serde_json::json!({"search_user_with_name": {"name": "Alex"}}),
                serde_json::json!({"send_email_to_user": {"email": "unknown", "text": "unknown"}}),
            ],
        },
    ]
}

fn print_trace(title: &str, trace: &impl Serialize) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(trace).context("Failed to encode trace")?;
    println!("== {title}\n{json}");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    observability::init();

    let cfg = load_config(None).context("Failed to load config")?;
    let params = DemoParams {
        tenant: cfg.app.name.clone().unwrap_or_else(|| "actchain".to_string()),
    };

    let schema = demo_bindings(&params, &ChainState::default());
    let extraction = Extraction::new(Arc::new(MockLlmClient::new(MOCK_REPLY)), schema)
        .with_examples(examples())
        .with_placeholder(cfg.chain.placeholder.clone());

    let state: Value = serde_json::json!({
        "userSelectedContact": "User selected a contact named Diane from list"
    });
    let response = extraction
        .invoke(
            "find Diane, and send a summary of 'health care' to her on email",
            Some(state),
        )
        .await
        .context("Extraction failed")?;

    let engine = ChainEngine::<DemoParams>::from_config(&cfg.chain).with_bindings(demo_bindings);
    let mut permissions = cfg.chain.permission_map();

    let trace = engine
        .execute(&response, &permissions, &params)
        .await
        .context("Execution failed")?;
    print_trace("execution", &trace)?;

    let denied: Vec<String> = trace.denied_actions().iter().map(|s| s.to_string()).collect();
    if denied.is_empty() {
        return Ok(());
    }

    for name in &denied {
        tracing::info!(action = %name, "granting permission for re-execution");
        permissions.set(name.clone(), true);
    }
    let trace = engine
        .re_execute(trace, &permissions, &params)
        .await
        .context("Re-execution failed")?;
    print_trace("re-execution", &trace)?;

    Ok(())
}
