//! 链式执行集成测试：顺序编号、缺省拒绝、短路、值传递、重执行幂等与补跑

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use actchain::chain::ActionInvoker;
use actchain::extract::{parse_actions, validate_actions, ValidatedActions};
use actchain::llm::MockLlmClient;
use actchain::{
    ActionEntry, ActionRegistry, ChainEngine, ChainError, ChainState, ExtractedResponse,
    Extraction, PermissionMap, StepErrorKind,
};

#[derive(Clone, Default)]
struct Calls {
    lookup: Arc<AtomicUsize>,
    notify: Arc<AtomicUsize>,
}

fn bindings(calls: &Calls) -> ActionRegistry {
    let mut registry = ActionRegistry::new();

    let lookup = calls.lookup.clone();
    registry.register_fn("lookup", move |args: Value| {
        let lookup = lookup.clone();
        async move {
            lookup.fetch_add(1, Ordering::SeqCst);
            let name = args["name"].as_str().unwrap_or_default().to_lowercase();
            Ok::<_, String>(json!({"email": format!("{name}@x.com")}))
        }
    });

    let notify = calls.notify.clone();
    registry.register_fn("notify", move |args: Value| {
        let notify = notify.clone();
        async move {
            notify.fetch_add(1, Ordering::SeqCst);
            Ok::<_, String>(json!({
                "delivered_to": args["email"].clone(),
                "text": args["text"].clone(),
            }))
        }
    });

    registry.register_fn("fail", |_| async { Err::<Value, _>("service down".to_string()) });
    registry
}

fn engine(calls: Calls) -> ChainEngine<()> {
    ChainEngine::new().with_bindings(move |_: &(), _: &ChainState| bindings(&calls))
}

fn response(list: Value) -> ExtractedResponse {
    let entries = list
        .as_array()
        .cloned()
        .unwrap_or_default()
        .into_iter()
        .map(ActionEntry::from_value)
        .collect();
    ExtractedResponse::from_actions(entries, ChainState::default())
}

fn scenario() -> ExtractedResponse {
    response(json!([
        {"lookup": {"name": "Rajat"}},
        {"notify": {"email": "unknown", "text": "hi"}},
    ]))
}

#[tokio::test]
async fn test_scenario_propagates_lookup_result() {
    let calls = Calls::default();
    let perms = PermissionMap::from([("lookup", true), ("notify", true)]);
    let trace = engine(calls.clone())
        .execute(&scenario(), &perms, &())
        .await
        .unwrap();

    assert_eq!(trace.outcomes[0].result(), Some(&json!({"email": "rajat@x.com"})));
    assert_eq!(trace.output_bucket.get("email"), Some(&json!("rajat@x.com")));
    assert_eq!(
        trace.outcomes[1].result(),
        Some(&json!({"delivered_to": "rajat@x.com", "text": "hi"}))
    );
    assert_eq!(trace.input_bucket.get("name"), Some(&json!("Rajat")));
    assert_eq!(trace.input_bucket.get("text"), Some(&json!("hi")));
    assert!(trace.is_complete());
}

#[tokio::test]
async fn test_iteration_matches_position() {
    let perms = PermissionMap::from([("lookup", true)]);
    let trace = engine(Calls::default())
        .execute(
            &response(json!([
                {"lookup": {"name": "A"}},
                {"fail": {}},
                {},
                {"notify": {"email": "a"}},
                {"lookup": {"name": "B"}},
            ])),
            &perms,
            &(),
        )
        .await
        .unwrap();

    assert_eq!(trace.outcomes.len(), 5);
    for (i, outcome) in trace.outcomes.iter().enumerate() {
        assert_eq!(outcome.iteration, i);
    }
}

#[tokio::test]
async fn test_absent_permission_is_never_executed() {
    let calls = Calls::default();
    let perms = PermissionMap::from([("lookup", true)]);
    let trace = engine(calls.clone())
        .execute(
            &response(json!([{"notify": {"email": "a@x.com", "text": "t"}}])),
            &perms,
            &(),
        )
        .await
        .unwrap();

    assert_eq!(trace.outcomes[0].error_kind(), Some(StepErrorKind::Unauthorized));
    assert_eq!(trace.outcomes[0].permission, Some(false));
    assert!(trace.outcomes[0].resolved_args.is_none());
    assert_eq!(calls.notify.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_error_short_circuits_later_steps() {
    let calls = Calls::default();
    let perms = PermissionMap::from([("lookup", true), ("notify", true), ("fail", true)]);
    let trace = engine(calls.clone())
        .execute(
            &response(json!([
                {"lookup": {"name": "A"}},
                {"fail": {}},
                {"lookup": {"name": "B"}},
                {"notify": {"email": "unknown", "text": "x"}},
            ])),
            &perms,
            &(),
        )
        .await
        .unwrap();

    assert!(trace.outcomes[0].is_success());
    assert_eq!(trace.outcomes[1].error_kind(), Some(StepErrorKind::InvocationFailure));
    assert_eq!(trace.outcomes[1].error().unwrap().message, "service down");
    assert_eq!(trace.outcomes[2].error_kind(), Some(StepErrorKind::UpstreamError));
    assert_eq!(trace.outcomes[3].error_kind(), Some(StepErrorKind::UpstreamError));
    assert_eq!(calls.lookup.load(Ordering::SeqCst), 1);
    assert_eq!(calls.notify.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unresolved_placeholder_blocks_step() {
    let calls = Calls::default();
    let perms = PermissionMap::from([("notify", true), ("lookup", true)]);
    let trace = engine(calls.clone())
        .execute(
            &response(json!([
                {"notify": {"email": "unknown", "text": "hi"}},
                {"lookup": {"name": "A"}},
            ])),
            &perms,
            &(),
        )
        .await
        .unwrap();

    let err = trace.outcomes[0].error().unwrap();
    assert_eq!(err.kind, StepErrorKind::UnresolvedValue);
    assert!(err.message.contains("\"email\""));
    assert_eq!(trace.outcomes[1].error_kind(), Some(StepErrorKind::UpstreamError));
    assert_eq!(calls.notify.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_later_result_overwrites_bucket_value() {
    let perms = PermissionMap::from([("lookup", true), ("notify", true)]);
    let trace = engine(Calls::default())
        .execute(
            &response(json!([
                {"lookup": {"name": "First"}},
                {"lookup": {"name": "Second"}},
                {"notify": {"email": "unknown", "text": "x"}},
            ])),
            &perms,
            &(),
        )
        .await
        .unwrap();

    let notify = trace.outcomes[2].resolved_args.as_ref().unwrap();
    assert_eq!(notify["email"], "second@x.com");
    assert_eq!(trace.input_bucket.get("name"), Some(&json!("Second")));
    assert!(trace.is_complete());
}

#[tokio::test]
async fn test_re_execution_is_idempotent_for_successful_steps() {
    let calls = Calls::default();
    let engine = engine(calls.clone());
    let perms = PermissionMap::from([("lookup", true)]);

    let first = engine.execute(&scenario(), &perms, &()).await.unwrap();
    let second = engine.re_execute(first.clone(), &perms, &()).await.unwrap();
    let third = engine.re_execute(second.clone(), &perms, &()).await.unwrap();

    assert_eq!(first.outcomes[0], second.outcomes[0]);
    assert_eq!(second.outcomes[0], third.outcomes[0]);
    assert_eq!(
        serde_json::to_string(&second.outcomes[0]).unwrap(),
        serde_json::to_string(&third.outcomes[0]).unwrap()
    );
    assert_eq!(calls.lookup.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_re_execution_resumes_denied_step() {
    let calls = Calls::default();
    let engine = engine(calls.clone());
    let denied = PermissionMap::from([("lookup", true), ("notify", false)]);

    let first = engine.execute(&scenario(), &denied, &()).await.unwrap();
    assert!(first.outcomes[0].is_success());
    assert_eq!(first.outcomes[1].error_kind(), Some(StepErrorKind::Unauthorized));
    assert_eq!(first.denied_actions(), vec!["notify"]);

    let granted = PermissionMap::from([("lookup", true), ("notify", true)]);
    let lookup = first.outcomes[0].clone();
    let resumed = engine.re_execute(first, &granted, &()).await.unwrap();

    assert_eq!(resumed.outcomes[0], lookup);
    assert_eq!(
        resumed.outcomes[1].result(),
        Some(&json!({"delivered_to": "rajat@x.com", "text": "hi"}))
    );
    assert_eq!(resumed.outcomes[1].iteration, 1);
    assert_eq!(calls.lookup.load(Ordering::SeqCst), 1);
    assert_eq!(calls.notify.load(Ordering::SeqCst), 1);
    assert!(resumed.is_complete());
}

#[tokio::test]
async fn test_re_execution_reaches_dependent_steps_after_grant() {
    let engine = engine(Calls::default());
    let response = response(json!([
        {"lookup": {"name": "Rajat"}},
        {"notify": {"email": "unknown", "text": "first"}},
        {"notify": {"email": "unknown", "text": "second"}},
    ]));

    let first = engine
        .execute(&response, &PermissionMap::from([("notify", true)]), &())
        .await
        .unwrap();
    assert_eq!(first.outcomes[0].error_kind(), Some(StepErrorKind::Unauthorized));
    assert_eq!(first.outcomes[1].error_kind(), Some(StepErrorKind::UpstreamError));
    assert_eq!(first.outcomes[2].error_kind(), Some(StepErrorKind::UpstreamError));

    let all = PermissionMap::from([("lookup", true), ("notify", true)]);
    let resumed = engine.re_execute(first, &all, &()).await.unwrap();
    assert!(resumed.is_complete());
    assert_eq!(resumed.outcomes[2].resolved_args.as_ref().unwrap()["email"], "rajat@x.com");
}

#[tokio::test]
async fn test_invocation_timeout_is_recorded() {
    let engine: ChainEngine<()> = ChainEngine::new()
        .with_invoker(ActionInvoker::new().with_timeout(std::time::Duration::from_millis(20)))
        .with_bindings(|_: &(), _: &ChainState| {
            let mut registry = ActionRegistry::new();
            registry.register_fn("slow", |_| async {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                Ok::<_, String>(Value::Null)
            });
            registry
        });
    let trace = engine
        .execute(
            &response(json!([{"slow": {}}])),
            &PermissionMap::from([("slow", true)]),
            &(),
        )
        .await
        .unwrap();
    assert_eq!(trace.outcomes[0].error_kind(), Some(StepErrorKind::InvocationFailure));
}

#[tokio::test]
async fn test_slow_action_runs_to_completion_by_default() {
    let started = Arc::new(AtomicUsize::new(0));
    let counter = started.clone();
    let engine: ChainEngine<()> = ChainEngine::new().with_bindings(move |_: &(), _: &ChainState| {
        let mut registry = ActionRegistry::new();
        let counter = counter.clone();
        registry.register_fn("send", move |_| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                Ok::<_, String>(json!("sent"))
            }
        });
        registry
    });
    let perms = PermissionMap::from([("send", true)]);

    let first = engine
        .execute(&response(json!([{"send": {"to": "a"}}])), &perms, &())
        .await
        .unwrap();
    assert_eq!(first.outcomes[0].result(), Some(&json!("sent")));

    let second = engine.re_execute(first, &perms, &()).await.unwrap();
    assert!(second.is_complete());
    assert_eq!(started.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_placeholder_from_result_is_never_passed_on() {
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = notified.clone();
    let engine: ChainEngine<()> = ChainEngine::new().with_bindings(move |_: &(), _: &ChainState| {
        let mut registry = ActionRegistry::new();
        registry.register_fn("lookup", |_| async { Ok::<_, String>(json!({"email": "unknown"})) });
        let counter = counter.clone();
        registry.register_fn("notify", move |args: Value| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(args)
            }
        });
        registry
    });
    let perms = PermissionMap::from([("lookup", true), ("notify", true)]);

    let trace = engine
        .execute(
            &response(json!([
                {"lookup": {"name": "Ghost"}},
                {"notify": {"email": "unknown"}},
            ])),
            &perms,
            &(),
        )
        .await
        .unwrap();

    assert!(trace.outcomes[0].is_success());
    assert_eq!(trace.outcomes[1].error_kind(), Some(StepErrorKind::UnresolvedValue));
    assert!(trace.outcomes[1].resolved_args.is_none());
    assert_eq!(notified.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_placeholder_as_whole_args_is_blocked() {
    let calls = Calls::default();
    let trace = engine(calls.clone())
        .execute_actions(
            &[ActionEntry::from_value(json!({"notify": "unknown"}))],
            ChainState::default(),
            &PermissionMap::from([("notify", true)]),
            &(),
        )
        .await
        .unwrap();
    assert_eq!(trace.outcomes[0].error_kind(), Some(StepErrorKind::UnresolvedValue));
    assert_eq!(calls.notify.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_contract_violations_abort_before_any_step() {
    let calls = Calls::default();
    let engine = engine(calls.clone());
    let perms = PermissionMap::from([("lookup", true)]);

    let unvalidated = ExtractedResponse::default();
    assert!(matches!(
        engine.execute(&unvalidated, &perms, &()).await,
        Err(ChainError::ResponseNotValidated)
    ));

    let failed = ExtractedResponse {
        validated: Some(ValidatedActions::failed(
            vec![ActionEntry::from_value(json!({"lookup": {"name": "A"}}))],
            "schema mismatch",
        )),
        ..Default::default()
    };
    assert!(matches!(
        engine.execute(&failed, &perms, &()).await,
        Err(ChainError::ValidationFailed(_))
    ));

    let bare: ChainEngine<()> = ChainEngine::new();
    assert!(matches!(
        bare.execute(&scenario(), &perms, &()).await,
        Err(ChainError::BindingsMissing)
    ));
    assert_eq!(calls.lookup.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_trace_serializes_errors_as_kind_and_message() {
    let engine = engine(Calls::default());
    let trace = engine
        .execute(&scenario(), &PermissionMap::from([("lookup", true)]), &())
        .await
        .unwrap();

    let json = serde_json::to_value(&trace).unwrap();
    assert_eq!(json["outcomes"][1]["error"]["kind"], "unauthorized");
    assert_eq!(json["output_bucket"]["email"], "rajat@x.com");

    let back: actchain::ExecutionTrace = serde_json::from_value(json).unwrap();
    assert_eq!(back, trace);

    let resumed = engine
        .re_execute(back, &PermissionMap::from([("lookup", true), ("notify", true)]), &())
        .await
        .unwrap();
    assert!(resumed.is_complete());
}

#[tokio::test]
async fn test_extraction_to_execution_end_to_end() {
    let calls = Calls::default();
    let schema = bindings(&calls);
    let llm = Arc::new(MockLlmClient::new(
        "Here you go:\n<json>[{\"lookup\":{\"name\":\"Diane\"}},{\"notify\":{\"email\":\"unknown\",\"text\":\"report\"}}]</json>",
    ));
    let response = Extraction::new(llm, schema)
        .invoke("find Diane and send her the report", Some(json!({"contact": "Diane"})))
        .await
        .unwrap();

    let perms = PermissionMap::from([("lookup", true), ("notify", true)]);
    let trace = engine(calls.clone()).execute(&response, &perms, &()).await.unwrap();
    assert!(trace.is_complete());
    assert_eq!(trace.state.validated, Some(json!({"contact": "Diane"})));
    assert_eq!(trace.outcomes[1].resolved_args.as_ref().unwrap()["email"], "diane@x.com");

    let unknown = validate_actions(parse_actions("[{\"teleport\": {}}]").unwrap(), &bindings(&calls));
    assert!(!unknown.success);
}
