//! Thread and turn orchestration.
//!
//! Covers the thread registry, active-turn bookkeeping, event translation,
//! and the task that runs each turn.

pub mod thread_registry;
pub mod translator;
pub mod turn_manager;
pub mod turn_runner;
