//! I/O helpers: configuration, the model endpoint, prompts, and trace files.

pub mod config;
pub mod llm;
pub mod prompt;
pub mod trace_log;
