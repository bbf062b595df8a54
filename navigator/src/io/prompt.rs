//! Prompt rendering for the planning request.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::geometry::Point;
use crate::core::registry::LocationRegistry;

const PLANNER_SYSTEM_TEMPLATE: &str = include_str!("prompts/planner_system.md");
const PLANNER_USER_TEMPLATE: &str = include_str!("prompts/planner_user.md");

#[derive(Debug, Clone, Serialize)]
struct LocationContext<'a> {
    name: &'a str,
    x: f64,
    y: f64,
}

/// Rendered system/user pair for one planning request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannerPrompt {
    pub system: String,
    pub user: String,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner_system", PLANNER_SYSTEM_TEMPLATE)
            .expect("planner system template should be valid");
        env.add_template("planner_user", PLANNER_USER_TEMPLATE)
            .expect("planner user template should be valid");
        Self { env }
    }

    /// Render the planning prompt for `tasks` against the registry's locations.
    pub fn render_planner(
        &self,
        tasks: &[String],
        registry: &LocationRegistry,
        start: Point,
    ) -> Result<PlannerPrompt> {
        let locations: Vec<LocationContext<'_>> = registry
            .iter()
            .map(|location| LocationContext {
                name: &location.name,
                x: location.position.x,
                y: location.position.y,
            })
            .collect();

        let system = self.env.get_template("planner_system")?.render(context! {})?;
        let user = self.env.get_template("planner_user")?.render(context! {
            tasks => tasks.iter().map(|task| task.trim()).collect::<Vec<_>>(),
            locations => locations,
            start => context! { x => start.x, y => start.y },
        })?;

        Ok(PlannerPrompt {
            system: system.trim().to_string(),
            user: user.trim().to_string(),
        })
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new()
    }
}
