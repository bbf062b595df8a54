//! Predefined task routines used for demos and smoke runs.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Routine {
    Morning,
    Evening,
    Cleaning,
    WorkBreak,
    GuestPreparation,
    Relaxation,
}

impl Routine {
    pub const ALL: [Routine; 6] = [
        Routine::Morning,
        Routine::Evening,
        Routine::Cleaning,
        Routine::WorkBreak,
        Routine::GuestPreparation,
        Routine::Relaxation,
    ];

    pub fn tasks(self) -> &'static [&'static str] {
        match self {
            Routine::Morning => &["Wake up", "Brush teeth", "Make coffee"],
            Routine::Evening => &["Turn on TV", "Dim living room lights", "Go to bedroom"],
            Routine::Cleaning => &["Check kitchen", "Tidy living room", "Make bed"],
            Routine::WorkBreak => &["Get coffee", "Check TV news", "Return to work area"],
            Routine::GuestPreparation => &["Clean living room", "Prepare coffee", "Check bedroom"],
            Routine::Relaxation => &["Turn off all lights", "Watch TV", "Go to bed"],
        }
    }

    pub fn task_list(self) -> Vec<String> {
        self.tasks().iter().map(|task| task.to_string()).collect()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Routine::Morning => "morning",
            Routine::Evening => "evening",
            Routine::Cleaning => "cleaning",
            Routine::WorkBreak => "work-break",
            Routine::GuestPreparation => "guest-preparation",
            Routine::Relaxation => "relaxation",
        }
    }
}

impl FromStr for Routine {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Routine::ALL
            .into_iter()
            .find(|routine| routine.as_str() == raw)
            .ok_or_else(|| {
                let known: Vec<&str> = Routine::ALL.iter().map(|r| r.as_str()).collect();
                format!("unknown routine {raw:?} (expected one of: {})", known.join(", "))
            })
    }
}
