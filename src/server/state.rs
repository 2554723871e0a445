//! Shared application state.

use std::sync::Arc;

use tokio_util::task::TaskTracker;

use crate::config::GlobalConfig;
use crate::driver::AgentQueryService;
use crate::orchestrator::thread_registry::ThreadRegistry;
use crate::orchestrator::turn_manager::TurnManager;
use crate::persistence::thread_store::ThreadStore;
use crate::rpc::outbound::Outbound;

/// State shared by the reader, the router, and every turn task.
pub struct AppState {
    /// Validated configuration.
    pub config: Arc<GlobalConfig>,
    /// Every thread known to the process.
    pub threads: ThreadRegistry,
    /// Turns in flight.
    pub turns: Arc<TurnManager>,
    /// Runs agent queries.
    pub agent: Arc<dyn AgentQueryService>,
    /// Frame sink toward the frontend.
    pub outbound: Outbound,
    /// Background work (turn tasks, reverse-channel waiters) awaited on
    /// shutdown.
    pub tasks: TaskTracker,
}

impl AppState {
    /// Build state from `config`, loading persisted threads when enabled.
    #[must_use]
    pub fn new(
        config: Arc<GlobalConfig>,
        agent: Arc<dyn AgentQueryService>,
        outbound: Outbound,
    ) -> Self {
        let store = match config.state_file_path() {
            Some(path) => ThreadStore::at(path),
            None => ThreadStore::disabled(),
        };
        Self::with_registry(config, agent, outbound, ThreadRegistry::new(store))
    }

    /// Build state around an existing registry.
    #[must_use]
    pub fn with_registry(
        config: Arc<GlobalConfig>,
        agent: Arc<dyn AgentQueryService>,
        outbound: Outbound,
        threads: ThreadRegistry,
    ) -> Self {
        let turns = Arc::new(TurnManager::new(config.allow_concurrent_turns));
        Self {
            config,
            threads,
            turns,
            agent,
            outbound,
            tasks: TaskTracker::new(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("threads", &self.threads.len())
            .field("active_turns", &self.turns.active_count())
            .finish_non_exhaustive()
    }
}
