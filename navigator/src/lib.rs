//! Task-to-location planning and step-wise movement for a home navigation agent.
//!
//! A session turns natural-language tasks into an ordered list of named
//! locations and then walks an agent to each one, a fixed-size step at a time.
//! The architecture keeps the same split throughout:
//!
//! - **[`core`]**: Pure, deterministic logic (geometry, registry, keyword rules,
//!   the movement state machine, trace invariants). No I/O.
//! - **[`io`]**: Side effects (config files, the chat model client, prompt
//!   templates, trace files). Isolated behind traits so tests can script them.
//!
//! Orchestration modules ([`planner`], [`session`]) combine the two.

pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod planner;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
