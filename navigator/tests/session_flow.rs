//! End-to-end session tests: planner, movement, and trace files together.
//!
//! These use the scripted chat client or a real HTTP client pointed at a
//! closed local port, so no test needs a model server.

use std::time::{Duration, Instant};

use navigator::core::geometry::Point;
use navigator::core::invariants::validate_trace;
use navigator::core::movement::MovementConfig;
use navigator::core::registry::Location;
use navigator::core::routines::Routine;
use navigator::core::types::{MovementStatus, PlanSource};
use navigator::io::config::{LlmConfig, NavConfig};
use navigator::io::llm::HttpChatClient;
use navigator::io::trace_log::{load_trace, write_trace};
use navigator::session::NavigationSession;
use navigator::test_support::{ScriptedChatClient, ScriptedReply, tasks};

fn config_with_budget(max_steps: u32) -> NavConfig {
    NavConfig {
        movement: MovementConfig {
            max_steps,
            ..MovementConfig::default()
        },
        ..NavConfig::default()
    }
}

#[test]
fn gibberish_task_goes_to_default_location() {
    let client = ScriptedChatClient::failing("model unavailable");
    let session = NavigationSession::from_config(&config_with_budget(60), &client).expect("session");
    let trace = session.run(&tasks(&["unknown gibberish"]));

    assert_eq!(trace.plan.source, PlanSource::Fallback);
    assert_eq!(trace.plan.locations, vec!["LivingRoom"]);
    assert!(trace.all_reached());
    assert_eq!(client.call_count(), 1);
}

#[test]
fn unreachable_endpoint_falls_back_promptly() {
    let config = NavConfig {
        llm: LlmConfig {
            api_url: Some("http://127.0.0.1:9/v1/chat/completions".to_string()),
            timeout_secs: 2,
            ..LlmConfig::default()
        },
        ..config_with_budget(60)
    };
    let client = HttpChatClient::from_config(&config.llm)
        .expect("client")
        .expect("url configured");
    let session = NavigationSession::from_config(&config, client).expect("session");
    let task_list = Routine::Morning.task_list();

    let started = Instant::now();
    let plan = session.plan(&task_list);
    assert!(started.elapsed() < Duration::from_secs(10));

    assert_eq!(plan.source, PlanSource::Fallback);
    assert_eq!(plan, session.planner().fallback(&task_list, session.registry()));
    assert_eq!(plan.locations, vec!["Bedroom", "Bathroom", "Kitchen"]);
}

fn config_for_endpoint(url: String) -> NavConfig {
    NavConfig {
        llm: LlmConfig {
            api_url: Some(url),
            timeout_secs: 5,
            ..LlmConfig::default()
        },
        ..config_with_budget(60)
    }
}

#[test]
fn server_error_falls_back_and_success_uses_model_plan() {
    let mut server = mockito::Server::new();
    let url = format!("{}/v1/chat/completions", server.url());
    let config = config_for_endpoint(url);
    let task_list = tasks(&["make coffee", "watch tv"]);

    let failing = server
        .mock("POST", "/v1/chat/completions")
        .with_status(503)
        .with_body("unavailable")
        .expect(1)
        .create();
    let client = HttpChatClient::from_config(&config.llm)
        .expect("client")
        .expect("url configured");
    let session = NavigationSession::from_config(&config, client).expect("session");
    let plan = session.plan(&task_list);
    assert_eq!(plan.source, PlanSource::Fallback);
    assert_eq!(plan.locations, vec!["Kitchen", "LivingRoom"]);
    failing.assert();
    failing.remove();

    server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_body(r#"{"choices":[{"message":{"content":"[\"DiningRoom\", \"Kitchen\"]"}}]}"#)
        .create();
    let plan = session.plan(&task_list);
    assert_eq!(plan.source, PlanSource::Model);
    assert_eq!(plan.locations, vec!["DiningRoom", "Kitchen"]);
}

#[test]
fn default_budget_times_out_short_of_the_kitchen() {
    let session =
        NavigationSession::from_config(&NavConfig::default(), ScriptedChatClient::default())
            .expect("session");
    let trace = session.run(&tasks(&["make coffee"]));

    let outcome = &trace.outcomes[0];
    assert_eq!(outcome.status, MovementStatus::TimedOut);
    assert!(!outcome.reached);
    assert_eq!(outcome.step_count, 25);
    assert!(validate_trace(&trace).is_empty());
}

#[test]
fn model_plan_with_custom_layout_round_trips_through_trace_file() {
    let config = NavConfig {
        locations: vec![
            Location::new("Porch", Point::new(0.0, 1.0)),
            Location::new("Shed", Point::new(-1.0, 0.0)),
            Location::new("LivingRoom", Point::new(0.5, 0.5)),
        ],
        ..config_with_budget(20)
    };
    let client = ScriptedChatClient::new(vec![ScriptedReply::Text(
        "Plan: [\"Shed\", \"Porch\", \"Shed\"]".to_string(),
    )]);
    let session = NavigationSession::from_config(&config, &client).expect("session");
    let trace = session.run(&tasks(&["get the rake", "sweep", "put the rake back"]));

    assert_eq!(trace.plan.source, PlanSource::Model);
    assert_eq!(trace.reached_count(), 3);
    for pair in trace.outcomes.windows(2) {
        assert_eq!(pair[1].start, pair[0].end);
    }
    let prompt = &client.requests()[0].user;
    assert!(prompt.contains("- Shed at (-1.0, 0.0)"));

    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("trace.json");
    write_trace(&path, &trace).expect("write trace");
    let loaded = load_trace(&path).expect("load trace");
    assert_eq!(loaded, trace);
    assert!(validate_trace(&loaded).is_empty());
}

#[test]
fn tampered_trace_is_flagged() {
    let session = NavigationSession::from_config(&config_with_budget(60), ScriptedChatClient::default())
        .expect("session");
    let mut trace = session.run(&tasks(&["make coffee", "watch tv"]));
    trace.outcomes[1].start = Point::new(9.0, 9.0);
    trace.outcomes[0].reached = false;

    let errors = validate_trace(&trace);
    assert!(errors.iter().any(|e| e.contains("starts at")));
    assert!(errors.iter().any(|e| e.contains("contradicts status")));
}
