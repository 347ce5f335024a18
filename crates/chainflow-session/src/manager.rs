//! The session manager.
//!
//! Owns the session registry and drives workflow execution. Each workflow
//! runs as its own tokio task; suspension returns that task instead of
//! blocking a thread, and submitting a signature spawns a fresh task to
//! resume from the stored context.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chainflow_core::{ChainflowError, Result, SessionStatus};
use chainflow_engine::{WorkflowContext, WorkflowEngine, WorkflowIds, WorkflowResult};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{error, info};
use uuid::Uuid;

use crate::session::{Session, SessionUpdate, SessionView};

/// Response to a workflow start request.
#[derive(Debug, Clone, Serialize)]
pub struct StartedWorkflow {
    pub session_id: Uuid,
    pub workflow_id: Uuid,
    pub status: SessionStatus,
}

/// Outcome of a long-poll call.
#[derive(Debug)]
pub enum PollOutcome {
    Update(SessionUpdate),
    Timeout,
    Cancelled,
}

/// Owns all live sessions and the workflow engine.
pub struct SessionManager {
    engine: Arc<WorkflowEngine>,
    sessions: RwLock<HashMap<Uuid, Arc<Session>>>,
}

impl SessionManager {
    /// Create a manager over an engine.
    pub fn new(engine: Arc<WorkflowEngine>) -> Self {
        Self {
            engine,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create a session for `message` and launch its workflow. Returns
    /// immediately; progress is observed via `status` and `poll`.
    pub async fn start(&self, message: &str) -> StartedWorkflow {
        let session = Arc::new(Session::new(message));
        let started = StartedWorkflow {
            session_id: session.id,
            workflow_id: session.workflow_id,
            status: SessionStatus::Pending,
        };

        self.sessions.write().await.insert(session.id, session.clone());
        info!(session = %session.id, workflow = %session.workflow_id, "session created");

        let engine = self.engine.clone();
        let message = message.to_string();
        tokio::spawn(async move {
            run_workflow(engine, session, message).await;
        });

        started
    }

    /// Snapshot a session's current state.
    pub async fn status(&self, session_id: Uuid) -> Result<SessionView> {
        Ok(self.get(session_id).await?.snapshot().await)
    }

    /// Submit the externally obtained signature for a suspended session.
    ///
    /// Rejected with a typed error, and no mutation, unless the session is
    /// `AwaitingSignature`.
    pub async fn submit_signature(
        &self,
        session_id: Uuid,
        signature: &str,
    ) -> Result<SessionStatus> {
        let session = self.get(session_id).await?;
        let context = session.begin_resume().await?;
        info!(session = %session_id, "signature accepted, resuming workflow");

        let engine = self.engine.clone();
        let signature = signature.to_string();
        tokio::spawn(async move {
            resume_workflow(engine, session, context, signature).await;
        });

        Ok(SessionStatus::Running)
    }

    /// Long-poll the session's next update.
    pub async fn poll(&self, session_id: Uuid, timeout: Duration) -> Result<PollOutcome> {
        let session = self.get(session_id).await?;
        Ok(session.poll(timeout).await)
    }

    /// Cancel a session.
    pub async fn cancel(&self, session_id: Uuid) -> Result<()> {
        let session = self.get(session_id).await?;
        session.cancel().await;
        info!(session = %session_id, "session cancelled");
        Ok(())
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    async fn get(&self, session_id: Uuid) -> Result<Arc<Session>> {
        self.sessions
            .read()
            .await
            .get(&session_id)
            .cloned()
            .ok_or(ChainflowError::SessionNotFound(session_id))
    }
}

async fn run_workflow(engine: Arc<WorkflowEngine>, session: Arc<Session>, message: String) {
    session
        .set_status(SessionStatus::Running, "executing workflow")
        .await;

    let ids = WorkflowIds {
        workflow_id: session.workflow_id,
        session_id: session.id,
    };
    let outcome = engine.execute(&message, ids).await;
    settle(session, outcome).await;
}

async fn resume_workflow(
    engine: Arc<WorkflowEngine>,
    session: Arc<Session>,
    context: WorkflowContext,
    signature: String,
) {
    let outcome = engine.resume(context, &signature).await;
    settle(session, outcome).await;
}

async fn settle(
    session: Arc<Session>,
    outcome: chainflow_core::Result<WorkflowResult>,
) {
    match outcome {
        Ok(WorkflowResult::NeedsSignature { payload, context }) => {
            session.suspend(payload, *context).await;
        }
        Ok(WorkflowResult::Done(result)) => {
            session.complete(result).await;
        }
        Err(e) => {
            error!(session = %session.id, error = %e, "workflow failed");
            session.fail(e.to_string()).await;
        }
    }
}
