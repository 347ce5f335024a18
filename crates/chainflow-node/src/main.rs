//! # Chainflow Node
//!
//! Main Chainflow binary with the HTTP API server.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use clap::Parser;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use chainflow_contracts::ContractRegistry;
use chainflow_engine::WorkflowEngine;
use chainflow_llm::{LlmClient, OpenAiClient};
use chainflow_rpc::{ConfirmationPolicy, ConfirmationWaiter, RpcClient};
use chainflow_session::SessionManager;

mod api;
mod state;

use state::AppState;

#[derive(Debug, Parser)]
#[command(name = "chainflow-node", about = "Natural-language on-chain workflow node")]
struct Args {
    /// Address to serve the API on.
    #[arg(long, default_value = "0.0.0.0:3000")]
    listen: SocketAddr,

    /// Chain JSON-RPC endpoint. Without it, confirmations are simulated.
    #[arg(long, env = "CHAINFLOW_RPC_URL")]
    rpc_url: Option<String>,

    /// Path to the contract registry JSON. Defaults to the built-in demo
    /// registry.
    #[arg(long, env = "CHAINFLOW_CONTRACTS")]
    contracts: Option<PathBuf>,

    /// Block confirmations required before a task is considered final.
    #[arg(long, default_value_t = 1)]
    confirmations: u64,

    /// Receipt poll interval in seconds.
    #[arg(long, default_value_t = 2)]
    poll_interval_secs: u64,

    /// Overall confirmation timeout in seconds.
    #[arg(long, default_value_t = 120)]
    confirmation_timeout_secs: u64,

    /// OpenAI-compatible API base URL for task decomposition.
    #[arg(long, env = "CHAINFLOW_LLM_BASE_URL", default_value = "https://api.openai.com/v1")]
    llm_base_url: String,

    /// API key for the model endpoint. Without it, the deterministic keyword
    /// parser handles decomposition.
    #[arg(long, env = "CHAINFLOW_LLM_API_KEY", hide_env_values = true)]
    llm_api_key: Option<String>,

    /// Model to request.
    #[arg(long, env = "CHAINFLOW_LLM_MODEL", default_value = "gpt-4o-mini")]
    llm_model: String,
}

/// Run the Chainflow node server.
pub async fn run_server(args: Args) -> anyhow::Result<()> {
    info!("🚀 Chainflow node starting...");

    let registry = match &args.contracts {
        Some(path) => Arc::new(ContractRegistry::from_path(path)?),
        None => {
            info!("no registry path configured, using built-in demo registry");
            Arc::new(ContractRegistry::builtin())
        }
    };

    let waiter = match &args.rpc_url {
        Some(url) => {
            info!(endpoint = %url, "chain RPC configured");
            Arc::new(ConfirmationWaiter::new(
                RpcClient::new(url.clone()),
                ConfirmationPolicy {
                    required_confirmations: args.confirmations,
                    poll_interval: Duration::from_secs(args.poll_interval_secs),
                    timeout: Duration::from_secs(args.confirmation_timeout_secs),
                },
            ))
        }
        None => {
            warn!("no chain RPC configured, confirmations will be simulated");
            Arc::new(ConfirmationWaiter::simulated())
        }
    };

    let llm: Option<Arc<dyn LlmClient>> = match &args.llm_api_key {
        Some(key) => {
            info!(model = %args.llm_model, "language model client configured");
            Some(Arc::new(OpenAiClient::new(
                args.llm_base_url.clone(),
                key.clone(),
                args.llm_model.clone(),
            )))
        }
        None => {
            warn!("no model API key configured, using the keyword parser only");
            None
        }
    };

    let engine = Arc::new(WorkflowEngine::new(llm, registry.clone(), waiter));
    let manager = Arc::new(SessionManager::new(engine));
    let state = AppState { manager, registry };

    let app = create_router(state);

    info!("🌐 Listening on http://{}", args.listen);
    let listener = TcpListener::bind(args.listen).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the API router.
fn create_router(state: AppState) -> Router {
    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health + registry info
        .route("/health", get(api::health::health_check))
        .route("/api/v1/info", get(api::health::registry_info))
        // Workflow API
        .route("/api/v1/workflow", post(api::workflow::start_workflow))
        .route("/api/v1/workflow/:id", get(api::workflow::get_workflow))
        .route("/api/v1/workflow/:id", delete(api::workflow::cancel_workflow))
        .route(
            "/api/v1/workflow/:id/signature",
            post(api::workflow::submit_signature),
        )
        .route("/api/v1/workflow/:id/poll", get(api::workflow::poll_workflow))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    run_server(Args::parse()).await
}
