//! Shared deterministic types for planning and movement.
//!
//! These types are the contract between the planner, the movement state
//! machine, the session, and whatever evaluates a finished trace. They carry no
//! I/O and serialize to stable JSON.

use serde::{Deserialize, Serialize};

use crate::core::geometry::Point;
use crate::core::movement::MovementConfig;

/// Single-axis direction of one movement tick. `Up` is +y, `Right` is +x.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Unit displacement for this direction.
    pub fn unit(self) -> (f64, f64) {
        match self {
            Direction::Up => (0.0, 1.0),
            Direction::Down => (0.0, -1.0),
            Direction::Left => (-1.0, 0.0),
            Direction::Right => (1.0, 0.0),
            Direction::None => (0.0, 0.0),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Up => "UP",
            Direction::Down => "DOWN",
            Direction::Left => "LEFT",
            Direction::Right => "RIGHT",
            Direction::None => "NONE",
        }
    }
}

/// Telemetry for one movement tick, recorded after the position update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_index: u32,
    pub position: Point,
    pub distance_to_target: f64,
    pub direction: Direction,
}

/// Terminal state that ended movement toward one location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementStatus {
    Arrived,
    TimedOut,
    Stalled,
    /// The plan named a location the registry does not know.
    Skipped,
}

impl MovementStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementStatus::Arrived => "arrived",
            MovementStatus::TimedOut => "timed_out",
            MovementStatus::Stalled => "stalled",
            MovementStatus::Skipped => "skipped",
        }
    }
}

/// Result of moving toward one plan entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationOutcome {
    pub location: String,
    pub status: MovementStatus,
    pub reached: bool,
    pub step_count: u32,
    pub start: Point,
    pub end: Point,
    pub elapsed_ms: u64,
    pub steps: Vec<StepRecord>,
}

impl LocationOutcome {
    /// Zero-step failure recorded for a plan entry that could not be resolved.
    pub fn skipped(location: &str, at: Point) -> Self {
        Self {
            location: location.to_string(),
            status: MovementStatus::Skipped,
            reached: false,
            step_count: 0,
            start: at,
            end: at,
            elapsed_ms: 0,
            steps: Vec::new(),
        }
    }
}

/// Where a plan came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    Model,
    Fallback,
}

impl PlanSource {
    pub fn as_str(self) -> &'static str {
        match self {
            PlanSource::Model => "model",
            PlanSource::Fallback => "fallback",
        }
    }
}

/// Ordered location names to visit. Duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub locations: Vec<String>,
    pub source: PlanSource,
}

impl Plan {
    pub fn new(locations: Vec<String>, source: PlanSource) -> Self {
        Self { locations, source }
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }
}

/// Everything a session produced, in the order it happened.
///
/// This is the artifact handed to evaluators. It embeds the movement settings
/// so the trace can be checked without the config that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTrace {
    pub plan: Plan,
    pub initial_position: Point,
    pub movement: MovementConfig,
    pub outcomes: Vec<LocationOutcome>,
}

impl SessionTrace {
    pub fn reached_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.reached).count()
    }

    pub fn all_reached(&self) -> bool {
        self.outcomes.iter().all(|o| o.reached)
    }

    /// Agent position after the last outcome (or the initial position).
    pub fn final_position(&self) -> Point {
        self.outcomes
            .last()
            .map(|o| o.end)
            .unwrap_or(self.initial_position)
    }

    pub fn total_steps(&self) -> u32 {
        self.outcomes.iter().map(|o| o.step_count).sum()
    }
}
