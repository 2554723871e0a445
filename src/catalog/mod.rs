//! Static and file-backed listings served to the frontend.

pub mod mcp_servers;
pub mod models;
