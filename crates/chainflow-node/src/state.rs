//! Application state.

use std::sync::Arc;

use chainflow_contracts::ContractRegistry;
use chainflow_session::SessionManager;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The session manager driving all workflows.
    pub manager: Arc<SessionManager>,

    /// The contract registry, read-only after startup.
    pub registry: Arc<ContractRegistry>,
}
