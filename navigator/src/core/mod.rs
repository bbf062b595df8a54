//! Deterministic, pure logic shared by the planner and the session.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod geometry;
pub mod invariants;
pub mod movement;
pub mod registry;
pub mod routines;
pub mod rules;
pub mod types;
