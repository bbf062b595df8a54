//! Deterministic keyword rules mapping task text to locations.
//!
//! This is the planner's fallback: it needs no model, never fails, and returns
//! the same plan for the same tasks every time.

use serde::{Deserialize, Serialize};

use crate::core::registry::LocationRegistry;

/// Maps a task to `location` when any keyword occurs in the lower-cased task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keywords: Vec<String>,
    pub location: String,
}

impl KeywordRule {
    pub fn new(location: &str, keywords: &[&str]) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            location: location.to_string(),
        }
        .normalized()
    }

    /// Lower-case and trim every keyword so it compares against lower-cased
    /// task text.
    pub fn normalized(mut self) -> Self {
        for keyword in &mut self.keywords {
            *keyword = keyword.trim().to_lowercase();
        }
        self
    }

    /// `task` must already be lower-cased.
    pub fn matches(&self, task: &str) -> bool {
        self.keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && task.contains(keyword.as_str()))
    }
}

/// Ordered rule table. The first matching rule whose location is registered
/// wins; anything else maps to the default location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Vec<KeywordRule>,
    default_location: String,
}

impl RuleTable {
    /// Keywords are normalized on the way in, so rules read from config match
    /// regardless of how they were written.
    pub fn new(rules: Vec<KeywordRule>, default_location: impl Into<String>) -> Self {
        Self {
            rules: rules.into_iter().map(KeywordRule::normalized).collect(),
            default_location: default_location.into(),
        }
    }

    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    pub fn default_location(&self) -> &str {
        &self.default_location
    }

    /// Map one task to a location name.
    pub fn map_task(&self, task: &str, registry: &LocationRegistry) -> String {
        let lowered = task.to_lowercase();
        self.rules
            .iter()
            .find(|rule| rule.matches(&lowered) && registry.contains(&rule.location))
            .map(|rule| rule.location.clone())
            .unwrap_or_else(|| self.default_location.clone())
    }

    /// Map every task, in order, one location per task.
    pub fn map_tasks(&self, tasks: &[String], registry: &LocationRegistry) -> Vec<String> {
        tasks
            .iter()
            .map(|task| self.map_task(task, registry))
            .collect()
    }
}

/// Built-in keyword table for the house layout.
///
/// Order matters: "brush teeth in the bedroom" should land in the bathroom, so
/// the more specific activity rules come before room-name rules.
pub fn default_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            "Bathroom",
            &["bath", "shower", "brush teeth", "toilet", "wash hands"],
        ),
        KeywordRule::new("Kitchen", &["coffee", "cook", "kitchen", "get water"]),
        KeywordRule::new(
            "DiningRoom",
            &["dining", "dinner", "breakfast", "lunch", "meal"],
        ),
        KeywordRule::new(
            "LivingRoom",
            &["tv", "television", "watch", "relax", "living", "lights"],
        ),
        KeywordRule::new(
            "Bedroom",
            &["sleep", "bed", "wake up", "get dressed", "nap"],
        ),
        KeywordRule::new("Office", &["work", "computer", "desk", "study", "calls"]),
    ]
}
