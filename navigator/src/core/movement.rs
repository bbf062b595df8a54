//! Step-wise movement state machine.
//!
//! Movement toward a target is a finite, pull-based sequence of
//! [`StepRecord`]s. The host drives it one tick at a time through the
//! [`Movement`] iterator, or runs it to completion with
//! [`MovementController::move_to`].
//!
//! ```text
//! MOVING ──► ARRIVED    distance <= tolerance after the position update
//!        ──► STALLED    the tick moved the agent less than `stall_epsilon`
//!        ──► TIMED_OUT  step_count == max_steps
//! ```
//!
//! Moves are axis-aligned and `step_size` long: the axis with the larger
//! absolute delta moves first, ties move vertically. A step never carries the
//! agent past the target's coordinate on its axis, so distance to the target
//! never grows.

use std::time::Instant;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::core::geometry::Point;
use crate::core::registry::Location;
use crate::core::types::{Direction, LocationOutcome, MovementStatus, StepRecord};

/// Movement tuning. Immutable for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Distance covered by one tick.
    pub step_size: f64,
    /// Arrival radius around the target.
    pub tolerance: f64,
    /// Step budget per location.
    pub max_steps: u32,
    /// A tick that moves the agent less than this is a stall.
    pub stall_epsilon: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            step_size: 0.12,
            tolerance: 0.3,
            max_steps: 25,
            stall_epsilon: 1e-9,
        }
    }
}

impl MovementConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            bail!("movement.step_size must be a positive number");
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            bail!("movement.tolerance must be >= 0");
        }
        if !(self.stall_epsilon.is_finite() && self.stall_epsilon >= 0.0) {
            bail!("movement.stall_epsilon must be >= 0");
        }
        if self.stall_epsilon >= self.step_size {
            bail!("movement.stall_epsilon must be smaller than movement.step_size");
        }
        Ok(())
    }
}

/// Host hook for collision feedback.
///
/// A blocked tick leaves the agent where it is, which the state machine reports
/// as a stall.
pub trait CollisionProbe {
    fn is_blocked(&self, from: Point, to: Point) -> bool;
}

/// Probe for an empty floor plan: nothing ever blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFloor;

impl CollisionProbe for OpenFloor {
    fn is_blocked(&self, _from: Point, _to: Point) -> bool {
        false
    }
}

impl<F: Fn(Point, Point) -> bool> CollisionProbe for F {
    fn is_blocked(&self, from: Point, to: Point) -> bool {
        self(from, to)
    }
}

/// Pick the single-axis direction that reduces the distance from `from` to `to`.
///
/// Returns [`Direction::None`] when there is nothing to reduce or the delta is
/// not finite.
pub fn choose_direction(from: Point, to: Point) -> Direction {
    let (dx, dy) = from.delta_to(to);
    if !dx.is_finite() || !dy.is_finite() || (dx == 0.0 && dy == 0.0) {
        return Direction::None;
    }
    if dx.abs() > dy.abs() {
        if dx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    } else if dy > 0.0 {
        Direction::Up
    } else {
        Direction::Down
    }
}

/// Current state of a [`Movement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementState {
    Moving,
    Arrived,
    TimedOut,
    Stalled,
}

impl MovementState {
    pub fn is_terminal(self) -> bool {
        self != MovementState::Moving
    }
}

/// Mutable agent state. Only the movement controller writes to it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Point,
}

impl AgentState {
    pub fn at(position: Point) -> Self {
        Self { position }
    }
}

/// Drives agents toward targets with a fixed configuration.
#[derive(Debug, Clone)]
pub struct MovementController<P: CollisionProbe = OpenFloor> {
    config: MovementConfig,
    probe: P,
}

impl MovementController<OpenFloor> {
    pub fn new(config: MovementConfig) -> Self {
        Self::with_probe(config, OpenFloor)
    }
}

impl<P: CollisionProbe> MovementController<P> {
    pub fn with_probe(config: MovementConfig, probe: P) -> Self {
        Self { config, probe }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Start a lazy movement from `start` toward `target`.
    pub fn movement<'a>(&'a self, start: Point, target: &'a Location) -> Movement<'a, P> {
        Movement::new(&self.config, &self.probe, start, target)
    }

    /// Run a movement to completion and leave the agent at its end position.
    pub fn move_to(&self, agent: &mut AgentState, target: &Location) -> LocationOutcome {
        let outcome = self.movement(agent.position, target).finish();
        agent.position = outcome.end;
        outcome
    }
}

/// One in-flight movement toward a single target.
///
/// Iterating yields one [`StepRecord`] per tick until a terminal state is
/// reached. Dropping it early is a valid cancellation.
pub struct Movement<'a, P: CollisionProbe> {
    config: &'a MovementConfig,
    probe: &'a P,
    target: &'a Location,
    start: Point,
    position: Point,
    state: MovementState,
    steps: Vec<StepRecord>,
    started: Instant,
}

impl<'a, P: CollisionProbe> Movement<'a, P> {
    fn new(config: &'a MovementConfig, probe: &'a P, start: Point, target: &'a Location) -> Self {
        let state = if start.distance_to(target.position) <= config.tolerance {
            MovementState::Arrived
        } else if config.max_steps == 0 {
            MovementState::TimedOut
        } else {
            MovementState::Moving
        };
        Self {
            config,
            probe,
            target,
            start,
            position: start,
            state,
            steps: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> MovementState {
        self.state
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    fn advance(&mut self) -> Option<StepRecord> {
        if self.state.is_terminal() {
            return None;
        }

        let direction = choose_direction(self.position, self.target.position);
        let candidate = self.stride(direction);
        let next = if direction != Direction::None && self.probe.is_blocked(self.position, candidate)
        {
            debug!(from = %self.position, to = %candidate, "step blocked by collision");
            self.position
        } else {
            candidate
        };

        let moved = self.position.distance_to(next);
        self.position = next;
        let distance = next.distance_to(self.target.position);
        let record = StepRecord {
            step_index: self.steps.len() as u32,
            position: next,
            distance_to_target: distance,
            direction,
        };
        trace!(
            location = %self.target.name,
            step = record.step_index,
            direction = direction.as_str(),
            position = %next,
            distance,
            "movement tick"
        );
        self.steps.push(record.clone());

        // Arrival wins over the other exits so a final tick onto the boundary counts.
        self.state = if distance <= self.config.tolerance {
            MovementState::Arrived
        } else if !(moved >= self.config.stall_epsilon) {
            MovementState::Stalled
        } else if self.steps.len() as u32 >= self.config.max_steps {
            MovementState::TimedOut
        } else {
            MovementState::Moving
        };

        Some(record)
    }

    /// Next position along `direction`. A full step that would pass the
    /// target's coordinate on that axis lands on it instead.
    fn stride(&self, direction: Direction) -> Point {
        let step = self.config.step_size;
        let goal = self.target.position;
        let (dx, dy) = self.position.delta_to(goal);
        match direction {
            Direction::Left | Direction::Right if dx.abs() <= step => {
                Point::new(goal.x, self.position.y)
            }
            Direction::Up | Direction::Down if dy.abs() <= step => {
                Point::new(self.position.x, goal.y)
            }
            _ => {
                let (ux, uy) = direction.unit();
                self.position.offset(ux * step, uy * step)
            }
        }
    }

    /// Drive any remaining ticks and summarize the movement.
    pub fn finish(mut self) -> LocationOutcome {
        while self.advance().is_some() {}

        let status = match self.state {
            MovementState::Arrived => MovementStatus::Arrived,
            MovementState::Stalled => MovementStatus::Stalled,
            MovementState::TimedOut | MovementState::Moving => MovementStatus::TimedOut,
        };
        let outcome = LocationOutcome {
            location: self.target.name.clone(),
            status,
            reached: status == MovementStatus::Arrived,
            step_count: self.steps.len() as u32,
            start: self.start,
            end: self.position,
            elapsed_ms: self.started.elapsed().as_millis() as u64,
            steps: self.steps,
        };
        debug!(
            location = %outcome.location,
            status = status.as_str(),
            steps = outcome.step_count,
            end = %outcome.end,
            "movement finished"
        );
        outcome
    }
}

impl<P: CollisionProbe> Iterator for Movement<'_, P> {
    type Item = StepRecord;

    fn next(&mut self) -> Option<StepRecord> {
        self.advance()
    }
}
