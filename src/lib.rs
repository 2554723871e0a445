#![forbid(unsafe_code)]

//! App-server protocol bridge for the `claude` CLI.
//!
//! Speaks newline-delimited JSON-RPC with a frontend and drives the agent
//! through an [`driver::AgentQueryService`], translating its event stream
//! into thread, turn, and item notifications.

pub mod catalog;
pub mod config;
pub mod driver;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod persistence;
pub mod policy;
pub mod rpc;
pub mod server;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
