//! Policy translation from frontend knobs to agent parameters.

pub mod mapper;

pub use mapper::{AccessMode, ApprovalPolicy, PermissionMode};
