//! Semantic invariants of a session trace.

use crate::core::types::{LocationOutcome, MovementStatus, SessionTrace};

/// Check a finished trace:
/// - one outcome per plan entry, in plan order
/// - `step_count == steps.len()` and step indices are `0..n`
/// - `reached` agrees with the final distance and the terminal status
/// - `timed_out` outcomes used exactly `max_steps` steps
/// - each outcome starts where the previous one ended
pub fn validate_trace(trace: &SessionTrace) -> Vec<String> {
    let mut errors = Vec::new();

    if trace.outcomes.len() != trace.plan.len() {
        errors.push(format!(
            "trace has {} outcomes for a plan of {} locations",
            trace.outcomes.len(),
            trace.plan.len()
        ));
    }

    let mut position = trace.initial_position;
    for (idx, outcome) in trace.outcomes.iter().enumerate() {
        let path = format!("outcomes[{idx}] ({})", outcome.location);

        match trace.plan.locations.get(idx) {
            Some(planned) if planned != &outcome.location => {
                errors.push(format!("{path}: plan entry is {planned}"));
            }
            _ => {}
        }
        if outcome.start != position {
            errors.push(format!(
                "{path}: starts at {} but the agent was at {}",
                outcome.start, position
            ));
        }
        validate_outcome(
            outcome,
            trace.movement.tolerance,
            trace.movement.max_steps,
            &path,
            &mut errors,
        );
        position = outcome.end;
    }

    errors
}

fn validate_outcome(
    outcome: &LocationOutcome,
    tolerance: f64,
    max_steps: u32,
    path: &str,
    errors: &mut Vec<String>,
) {
    if outcome.step_count as usize != outcome.steps.len() {
        errors.push(format!(
            "{path}: step_count {} but {} steps recorded",
            outcome.step_count,
            outcome.steps.len()
        ));
    }

    if outcome
        .steps
        .iter()
        .enumerate()
        .any(|(idx, step)| step.step_index as usize != idx)
    {
        errors.push(format!("{path}: step indices must count up from 0"));
    }

    let end = outcome.steps.last().map(|s| s.position).unwrap_or(outcome.start);
    if end != outcome.end {
        errors.push(format!(
            "{path}: end {} does not match last step {}",
            outcome.end, end
        ));
    }

    if outcome.reached != (outcome.status == MovementStatus::Arrived) {
        errors.push(format!(
            "{path}: reached={} contradicts status {}",
            outcome.reached,
            outcome.status.as_str()
        ));
    }

    let final_distance = outcome.steps.last().map(|s| s.distance_to_target);
    if let (true, Some(distance)) = (outcome.reached, final_distance) {
        if distance > tolerance {
            errors.push(format!(
                "{path}: reached but final distance {distance:.3} exceeds tolerance {tolerance}"
            ));
        }
    }

    match outcome.status {
        MovementStatus::TimedOut if outcome.step_count != max_steps => {
            errors.push(format!(
                "{path}: timed out after {} steps, budget is {max_steps}",
                outcome.step_count
            ));
        }
        MovementStatus::Skipped if outcome.step_count != 0 => {
            errors.push(format!("{path}: skipped location recorded steps"));
        }
        _ => {}
    }

    if outcome.step_count > max_steps {
        errors.push(format!(
            "{path}: {} steps exceed the budget of {max_steps}",
            outcome.step_count
        ));
    }
}
