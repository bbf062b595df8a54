//! Session trace files handed to evaluators.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::types::SessionTrace;

/// Write the trace as pretty-printed JSON with a trailing newline.
pub fn write_trace(path: &Path, trace: &SessionTrace) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create trace dir {}", parent.display()))?;
    }
    write_json(path, trace)
}

pub fn load_trace(path: &Path) -> Result<SessionTrace> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read trace {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse trace {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    fs::write(path, buf).with_context(|| format!("write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geometry::Point;
    use crate::core::movement::MovementConfig;
    use crate::core::types::{LocationOutcome, Plan, PlanSource};

    #[test]
    fn trace_file_uses_stable_field_names() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("traces").join("run.json");
        let trace = SessionTrace {
            plan: Plan::new(vec!["Attic".to_string()], PlanSource::Model),
            initial_position: Point::ORIGIN,
            movement: MovementConfig::default(),
            outcomes: vec![LocationOutcome::skipped("Attic", Point::ORIGIN)],
        };

        write_trace(&path, &trace).expect("write");
        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.ends_with('\n'));
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["plan"]["source"], "model");
        assert_eq!(value["outcomes"][0]["status"], "skipped");
        assert_eq!(value["outcomes"][0]["reached"], false);
        assert_eq!(value["outcomes"][0]["step_count"], 0);
        assert_eq!(value["movement"]["max_steps"], 25);

        assert_eq!(load_trace(&path).expect("load"), trace);
    }

    #[test]
    fn load_reports_missing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let err = load_trace(&temp.path().join("nope.json")).unwrap_err();
        assert!(format!("{err:#}").contains("read trace"));
    }
}
