//! End-to-end discovery and invocation through an assembled gateway whose
//! process servers are scripted echo servers.

use chrono::{TimeDelta, TimeZone, Utc};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use toolplex::clock::ManualClock;
use toolplex::gateway::{GatewayError, GatewayStack, ToolCallOutcome};
use toolplex::jobs::domain::{Job, JobId, JobStatus};
use toolplex::session::adapters::ScriptedProcessLauncher;
use toolplex::settings::Settings;
use toolplex::tool_registry::domain::{CallerId, ToolServerId};

const SETTINGS: &str = r#"
    [session]
    settle_delay_ms = 0
    termination_grace_secs = 1

    [cache]
    discovery_ttl_secs = 45
    overview_ttl_secs = 600
    deny = [{ server = "hidden", tool = "echo" }]

    [[servers]]
    id = "echo"
    name = "Echo"
    [servers.transport]
    kind = "process"
    command = "echo-rpc-server"

    [[servers]]
    id = "limited"
    rate_limit_per_minute = 2
    [servers.transport]
    kind = "process"
    command = "echo-rpc-server"

    [[servers]]
    id = "batch"
    execution = "long_running"
    [servers.transport]
    kind = "process"
    command = "echo-rpc-server"

    [[servers]]
    id = "hidden"
    [servers.transport]
    kind = "process"
    command = "echo-rpc-server"
"#;

struct Harness {
    launcher: ScriptedProcessLauncher,
    clock: Arc<ManualClock>,
    stack: GatewayStack<ScriptedProcessLauncher, ManualClock>,
}

impl Harness {
    fn tools_list_requests(&self) -> usize {
        self.launcher
            .received_methods()
            .iter()
            .filter(|method| method.as_str() == "tools/list")
            .count()
    }
}

#[fixture]
fn harness() -> Harness {
    let settings = Settings::from_toml_str(SETTINGS).expect("settings should parse");
    let launcher = ScriptedProcessLauncher::echo_server();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid timestamp"),
    ));
    let stack = GatewayStack::assemble(&settings, Arc::new(launcher.clone()), Arc::clone(&clock))
        .expect("stack should assemble");
    Harness {
        launcher,
        clock,
        stack,
    }
}

fn id(value: &str) -> ToolServerId {
    ToolServerId::new(value).expect("valid server id")
}

fn caller() -> CallerId {
    CallerId::new("tester").expect("valid caller id")
}

fn echoed_text(outcome: ToolCallOutcome) -> Value {
    let ToolCallOutcome::Completed(response) = outcome else {
        panic!("expected an inline response, got {outcome:?}");
    };
    let result = response.into_result().expect("tool call should succeed");
    let text = result
        .pointer("/content/0/text")
        .and_then(Value::as_str)
        .expect("text content");
    serde_json::from_str(text).expect("echoed arguments are JSON")
}

async fn wait_for_job(harness: &Harness, job_id: JobId) -> Job {
    for _ in 0..100 {
        let job = harness
            .stack
            .gateway()
            .job_status(job_id)
            .await
            .expect("job should exist");
        if job.status().is_terminal() {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("job {job_id} did not finish");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn discovery_is_cached_until_the_ttl_lapses(harness: Harness) {
    let gateway = harness.stack.gateway();

    let tools = gateway.list_tools(&id("echo")).await.expect("discovery");
    let names: Vec<&str> = tools.iter().map(|tool| tool.name()).collect();
    assert_eq!(names, vec!["echo"]);
    assert_eq!(
        harness.launcher.received_methods(),
        vec!["initialize", "notifications/initialized", "tools/list"]
    );

    harness.clock.advance(TimeDelta::seconds(44));
    gateway.list_tools(&id("echo")).await.expect("cached discovery");
    assert_eq!(harness.tools_list_requests(), 1);

    harness.clock.advance(TimeDelta::seconds(1));
    gateway.list_tools(&id("echo")).await.expect("refreshed discovery");
    assert_eq!(harness.tools_list_requests(), 2);
    assert_eq!(harness.launcher.launch_count(), 1);

    harness.stack.shutdown().await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn interactive_call_echoes_arguments(harness: Harness) {
    let outcome = harness
        .stack
        .gateway()
        .call_tool(&caller(), &id("echo"), "echo", json!({ "text": "hi" }))
        .await
        .expect("call should be delivered");

    assert_eq!(echoed_text(outcome), json!({ "text": "hi" }));
    harness.stack.shutdown().await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn denied_tools_are_hidden_but_the_list_is_cached(harness: Harness) {
    let gateway = harness.stack.gateway();

    let tools = gateway.list_tools(&id("hidden")).await.expect("discovery");
    assert!(tools.is_empty());
    assert_eq!(gateway.router().cache().len(), 1);

    let again = gateway.list_tools(&id("hidden")).await.expect("cached discovery");
    assert!(again.is_empty());
    assert_eq!(harness.tools_list_requests(), 1);
    harness.stack.shutdown().await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn rate_limit_applies_per_minute_window(harness: Harness) {
    let gateway = harness.stack.gateway();
    let limited = id("limited");

    for attempt in 0..2 {
        gateway
            .call_tool(&caller(), &limited, "echo", json!({ "attempt": attempt }))
            .await
            .expect("calls within the limit succeed");
    }
    let rejected = gateway
        .call_tool(&caller(), &limited, "echo", json!({ "attempt": 2 }))
        .await;
    assert!(
        matches!(rejected, Err(GatewayError::RateLimitExceeded { limit: 2, .. })),
        "expected rate limiting, got {rejected:?}"
    );

    harness.clock.advance(TimeDelta::seconds(60));
    gateway
        .call_tool(&caller(), &limited, "echo", json!({ "attempt": 3 }))
        .await
        .expect("a new window admits the call");
    harness.stack.shutdown().await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn long_running_calls_are_queued_and_completed(harness: Harness) {
    let outcome = harness
        .stack
        .gateway()
        .call_tool(&caller(), &id("batch"), "echo", json!({ "rows": 3 }))
        .await
        .expect("call should be queued");
    let ToolCallOutcome::Queued(job_id) = outcome else {
        panic!("expected a queued job, got {outcome:?}");
    };

    let job = wait_for_job(&harness, job_id).await;

    assert_eq!(job.status(), JobStatus::Completed);
    let text = job
        .result()
        .and_then(|result| result.pointer("/content/0/text"))
        .and_then(Value::as_str)
        .expect("job result carries text content");
    assert_eq!(text, r#"{"rows":3}"#);
    let jobs = harness
        .stack
        .gateway()
        .jobs_for_caller(&caller())
        .await
        .expect("jobs listed");
    assert_eq!(jobs.len(), 1);
    harness.stack.shutdown().await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn overview_lists_every_server_and_is_reused(harness: Harness) {
    let gateway = harness.stack.gateway();

    let overview = gateway.tool_overview().await.expect("overview");
    assert_eq!(overview.servers.len(), 4);
    assert_eq!(overview.tool_count(), 3);
    let echo = overview.server(&id("echo")).expect("echo listed");
    assert!(echo.health.is_healthy());
    let requests = harness.tools_list_requests();

    let again = gateway.tool_overview().await.expect("cached overview");
    assert_eq!(again, overview);
    assert_eq!(harness.tools_list_requests(), requests);

    harness.stack.shutdown().await;
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn shutdown_tears_down_every_session(harness: Harness) {
    let gateway = harness.stack.gateway();
    for server in ["echo", "hidden"] {
        gateway.list_tools(&id(server)).await.expect("discovery");
    }
    assert_eq!(harness.stack.sessions().live_sessions().await.len(), 2);

    let sessions = Arc::clone(harness.stack.sessions());
    harness.stack.shutdown().await;

    assert!(sessions.live_sessions().await.is_empty());
}
