//! One navigation session: plan once, then walk the plan in order.

use anyhow::{Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::core::geometry::Point;
use crate::core::invariants::validate_trace;
use crate::core::movement::{AgentState, CollisionProbe, MovementController, OpenFloor};
use crate::core::registry::LocationRegistry;
use crate::core::types::{LocationOutcome, Plan, SessionTrace, StepRecord};
use crate::io::config::NavConfig;
use crate::io::llm::ChatClient;
use crate::planner::TaskPlanner;

/// Couples a planner with a movement controller over a fixed registry.
///
/// Construction is the only fallible step. Once built, every `run*` method
/// produces a complete [`SessionTrace`]: planning failures fall back to the
/// keyword rules, unknown locations become skipped outcomes, and movement
/// always terminates.
pub struct NavigationSession<C: ChatClient, P: CollisionProbe = OpenFloor> {
    registry: LocationRegistry,
    planner: TaskPlanner<C>,
    controller: MovementController<P>,
    initial_position: Point,
}

impl<C: ChatClient> NavigationSession<C, OpenFloor> {
    /// Build a session on open floor from a validated config.
    pub fn from_config(config: &NavConfig, client: C) -> Result<Self> {
        Self::from_config_with_probe(config, client, OpenFloor)
    }
}

impl<C: ChatClient, P: CollisionProbe> NavigationSession<C, P> {
    pub fn new(
        registry: LocationRegistry,
        planner: TaskPlanner<C>,
        controller: MovementController<P>,
        initial_position: Point,
    ) -> Result<Self> {
        controller.config().validate()?;
        let default_location = planner.rules().default_location();
        if !registry.contains(default_location) {
            bail!("fallback location {default_location} is not registered");
        }
        if !initial_position.is_finite() {
            bail!("initial position {initial_position} is not finite");
        }
        Ok(Self {
            registry,
            planner,
            controller,
            initial_position,
        })
    }

    pub fn from_config_with_probe(config: &NavConfig, client: C, probe: P) -> Result<Self> {
        config.validate()?;
        let planner = TaskPlanner::new(client, config.planner.rule_table(), &config.llm);
        let controller = MovementController::with_probe(config.movement, probe);
        Self::new(
            config.registry()?,
            planner,
            controller,
            config.initial_position,
        )
    }

    pub fn registry(&self) -> &LocationRegistry {
        &self.registry
    }

    pub fn planner(&self) -> &TaskPlanner<C> {
        &self.planner
    }

    pub fn initial_position(&self) -> Point {
        self.initial_position
    }

    /// Plan `tasks` from the session's starting position without moving.
    pub fn plan(&self, tasks: &[String]) -> Plan {
        self.planner.plan(tasks, &self.registry, self.initial_position)
    }

    /// Plan `tasks` and execute the plan.
    pub fn run(&self, tasks: &[String]) -> SessionTrace {
        self.run_observed(tasks, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `on_step` with the target name for
    /// every movement tick as it happens.
    pub fn run_observed<F>(&self, tasks: &[String], on_step: F) -> SessionTrace
    where
        F: FnMut(&str, &StepRecord),
    {
        let plan = self.plan(tasks);
        self.execute(plan, on_step)
    }

    /// Execute a plan supplied by the caller, skipping the planner.
    pub fn run_plan(&self, plan: Plan) -> SessionTrace {
        self.execute(plan, |_, _| {})
    }

    #[instrument(skip_all, fields(source = ?plan.source, locations = plan.len()))]
    fn execute<F>(&self, plan: Plan, mut on_step: F) -> SessionTrace
    where
        F: FnMut(&str, &StepRecord),
    {
        let mut agent = AgentState::at(self.initial_position);
        let mut outcomes = Vec::with_capacity(plan.len());

        for name in &plan.locations {
            let Some(location) = self.registry.get(name) else {
                warn!(location = %name, "plan names an unknown location; skipping");
                outcomes.push(LocationOutcome::skipped(name, agent.position));
                continue;
            };

            let mut movement = self.controller.movement(agent.position, location);
            for step in movement.by_ref() {
                on_step(&location.name, &step);
            }
            let outcome = movement.finish();
            agent.position = outcome.end;
            outcomes.push(outcome);
        }

        let trace = SessionTrace {
            plan,
            initial_position: self.initial_position,
            movement: *self.controller.config(),
            outcomes,
        };

        let violations = validate_trace(&trace);
        if !violations.is_empty() {
            debug!(?violations, "session trace violates invariants");
        }
        info!(
            reached = trace.reached_count(),
            total = trace.outcomes.len(),
            steps = trace.total_steps(),
            "session finished"
        );
        trace
    }
}
