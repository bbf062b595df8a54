//! Task planning: one model request, deterministic keyword fallback.
//!
//! The planner asks the model for a JSON array of location names. A reply is
//! accepted only when it is a non-empty array of registered names; anything
//! else (transport error, timeout, non-2xx, prose, unknown names) is logged and
//! replaced by the rule table's mapping. Planning therefore never fails.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use jsonschema::Draft;
use regex::Regex;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use crate::core::geometry::Point;
use crate::core::registry::LocationRegistry;
use crate::core::rules::RuleTable;
use crate::core::types::{Plan, PlanSource};
use crate::io::config::LlmConfig;
use crate::io::llm::{ChatClient, ChatRequest};
use crate::io::prompt::PromptEngine;

/// Shortest bracketed spans, tried in order when the model wraps the array in
/// prose.
static ARRAY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").expect("array pattern should be valid"));

/// Turns task lists into ordered location plans.
pub struct TaskPlanner<C: ChatClient> {
    client: C,
    rules: RuleTable,
    prompts: PromptEngine,
    max_tokens: u32,
    timeout: Duration,
}

impl<C: ChatClient> TaskPlanner<C> {
    pub fn new(client: C, rules: RuleTable, llm: &LlmConfig) -> Self {
        Self {
            client,
            rules,
            prompts: PromptEngine::new(),
            max_tokens: llm.max_tokens,
            timeout: llm.timeout(),
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    /// Produce a plan for `tasks`. Never fails; see the module docs.
    #[instrument(skip_all, fields(tasks = tasks.len()))]
    pub fn plan(&self, tasks: &[String], registry: &LocationRegistry, start: Point) -> Plan {
        if tasks.is_empty() {
            debug!("no tasks; returning an empty plan");
            return Plan::new(Vec::new(), PlanSource::Fallback);
        }

        match self.plan_with_model(tasks, registry, start) {
            Ok(locations) => {
                info!(plan = ?locations, "model produced plan");
                Plan::new(locations, PlanSource::Model)
            }
            Err(err) => {
                warn!(error = %format!("{err:#}"), "model planning failed; using keyword fallback");
                let plan = self.fallback(tasks, registry);
                info!(plan = ?plan.locations, "fallback produced plan");
                plan
            }
        }
    }

    /// Keyword-rule plan for `tasks`, one entry per task.
    pub fn fallback(&self, tasks: &[String], registry: &LocationRegistry) -> Plan {
        Plan::new(self.rules.map_tasks(tasks, registry), PlanSource::Fallback)
    }

    fn plan_with_model(
        &self,
        tasks: &[String],
        registry: &LocationRegistry,
        start: Point,
    ) -> Result<Vec<String>> {
        let prompt = self
            .prompts
            .render_planner(tasks, registry, start)
            .context("render planner prompt")?;
        let reply = self.client.complete(&ChatRequest {
            system: prompt.system,
            user: prompt.user,
            max_tokens: self.max_tokens,
            timeout: self.timeout,
        })?;
        debug!(reply = %reply, "model reply");
        parse_plan_reply(&reply, registry)
    }
}

/// Parse a model reply into location names, rejecting anything that is not a
/// non-empty array of registered names.
pub fn parse_plan_reply(reply: &str, registry: &LocationRegistry) -> Result<Vec<String>> {
    let value = extract_json_array(reply)?;
    validate_against_registry(&value, registry)?;
    serde_json::from_value(value).context("decode plan array")
}

fn extract_json_array(reply: &str) -> Result<Value> {
    let trimmed = reply.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }
    ARRAY_RE
        .find_iter(trimmed)
        .filter_map(|span| serde_json::from_str::<Value>(span.as_str()).ok())
        .find(is_name_list)
        .ok_or_else(|| anyhow!("reply contains no JSON array"))
}

fn is_name_list(value: &Value) -> bool {
    value
        .as_array()
        .is_some_and(|items| !items.is_empty() && items.iter().all(Value::is_string))
}

/// JSON Schema accepted for plan replies: a non-empty array of known names.
fn plan_schema(registry: &LocationRegistry) -> Value {
    json!({
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "type": "array",
        "minItems": 1,
        "items": {
            "type": "string",
            "enum": registry.names().collect::<Vec<_>>(),
        },
    })
}

fn validate_against_registry(instance: &Value, registry: &LocationRegistry) -> Result<()> {
    let schema = plan_schema(registry);
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .context("compile plan schema")?;
    let messages: Vec<String> = compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        bail!("plan reply rejected:\n- {}", messages.join("\n- "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::default_rules;
    use crate::test_support::{ScriptedChatClient, ScriptedReply, house_registry, tasks};

    fn planner<C: ChatClient>(client: C) -> TaskPlanner<C> {
        TaskPlanner::new(
            client,
            RuleTable::new(default_rules(), "LivingRoom"),
            &LlmConfig::default(),
        )
    }

    #[test]
    fn model_plan_is_used_verbatim() {
        let client = ScriptedChatClient::replying(r#"["Kitchen", "Bedroom", "Kitchen"]"#);
        let planner = planner(&client);
        let plan = planner.plan(
            &tasks(&["make coffee", "sleep", "more coffee"]),
            &house_registry(),
            Point::ORIGIN,
        );

        assert_eq!(plan.source, PlanSource::Model);
        assert_eq!(plan.locations, vec!["Kitchen", "Bedroom", "Kitchen"]);

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].max_tokens, 256);
        assert_eq!(requests[0].timeout, Duration::from_secs(30));
        assert!(requests[0].user.contains("make coffee"));
        assert!(requests[0].user.contains("Office"));
    }

    #[test]
    fn array_wrapped_in_prose_is_accepted() {
        let client = ScriptedChatClient::replying(
            "Sure! Here is the order:\n```json\n[\"Bathroom\", \"Kitchen\"]\n```",
        );
        let plan = planner(&client).plan(
            &tasks(&["shower", "coffee"]),
            &house_registry(),
            Point::ORIGIN,
        );
        assert_eq!(plan.source, PlanSource::Model);
        assert_eq!(plan.locations, vec!["Bathroom", "Kitchen"]);
    }

    #[test]
    fn trailing_bracketed_prose_does_not_hide_the_array() {
        let registry = house_registry();
        let replies = [
            "[\"Kitchen\"]\nNote: [see above]",
            "Order [best guess]: [\"Office\", \"Kitchen\"] [end]",
            "Step [1] then: [\"Kitchen\"]",
        ];
        let expected = [vec!["Kitchen"], vec!["Office", "Kitchen"], vec!["Kitchen"]];
        for (reply, expected) in replies.iter().zip(expected) {
            assert_eq!(
                parse_plan_reply(reply, &registry).expect("parse"),
                expected,
                "reply {reply:?}"
            );
        }
    }

    #[test]
    fn unknown_name_falls_back() {
        let client = ScriptedChatClient::replying(r#"["Kitchen", "Garage"]"#);
        let plan = planner(&client).plan(
            &tasks(&["make coffee", "fix the car"]),
            &house_registry(),
            Point::ORIGIN,
        );
        assert_eq!(plan.source, PlanSource::Fallback);
        assert_eq!(plan.locations, vec!["Kitchen", "LivingRoom"]);
    }

    #[test]
    fn malformed_empty_and_object_replies_fall_back() {
        let registry = house_registry();
        let task_list = tasks(&["watch tv"]);
        for reply in ["Kitchen please", "[]", r#"{"rooms": ["Kitchen"]}"#, "[\"Kitchen\","] {
            let client = ScriptedChatClient::replying(reply);
            let plan = planner(&client).plan(&task_list, &registry, Point::ORIGIN);
            assert_eq!(plan.source, PlanSource::Fallback, "reply {reply:?}");
            assert_eq!(plan.locations, vec!["LivingRoom"]);
        }
    }

    #[test]
    fn client_failure_matches_fallback_exactly() {
        let registry = house_registry();
        let task_list = tasks(&["Wake up", "Brush teeth", "Make coffee", "gibberish"]);
        let client = ScriptedChatClient::new(vec![ScriptedReply::Error(
            "connection refused".to_string(),
        )]);
        let planner = planner(&client);

        let plan = planner.plan(&task_list, &registry, Point::ORIGIN);
        assert_eq!(plan, planner.fallback(&task_list, &registry));
        assert_eq!(
            plan.locations,
            vec!["Bedroom", "Bathroom", "Kitchen", "LivingRoom"]
        );
        assert_eq!(client.call_count(), 1);
    }

    #[test]
    fn empty_task_list_skips_the_model() {
        let client = ScriptedChatClient::replying(r#"["Kitchen"]"#);
        let plan = planner(&client).plan(&[], &house_registry(), Point::ORIGIN);
        assert!(plan.is_empty());
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn parse_rejects_non_string_items() {
        let err = parse_plan_reply("[1, 2]", &house_registry()).unwrap_err();
        assert!(err.to_string().contains("plan reply rejected"));
    }
}
