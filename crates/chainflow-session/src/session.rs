//! A single workflow session.

use std::time::Duration;

use chainflow_core::{ChainflowError, Result, SessionStatus, SignaturePayload};
use chainflow_engine::WorkflowContext;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::manager::PollOutcome;

/// Capacity of the per-session update channel. When full, updates are
/// dropped rather than blocking the workflow; long-poll callers re-fetch
/// current status directly.
const UPDATE_CHANNEL_CAPACITY: usize = 10;

/// Kind of a pushed session update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Status,
    SignatureRequest,
    Result,
}

/// An update pushed onto a session's long-poll channel.
#[derive(Debug, Clone, Serialize)]
pub struct SessionUpdate {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    pub data: Value,
}

/// Snapshot of a session returned by status queries.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub workflow_id: Uuid,
    pub status: SessionStatus,
    /// The original user request.
    pub request: String,
    /// Human-readable status detail.
    pub message: String,
    pub need_signature: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_request: Option<SignaturePayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mutable session state, guarded by the session's lock.
#[derive(Debug)]
struct SessionState {
    status: SessionStatus,
    message: String,
    signature_request: Option<SignaturePayload>,
    result: Option<Value>,
    error: Option<String>,
    context: Option<WorkflowContext>,
    updated_at: DateTime<Utc>,
}

/// One user-initiated workflow.
pub struct Session {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub request: String,
    pub created_at: DateTime<Utc>,

    state: RwLock<SessionState>,
    update_tx: mpsc::Sender<SessionUpdate>,
    update_rx: Mutex<mpsc::Receiver<SessionUpdate>>,
    cancel: CancellationToken,
}

impl Session {
    /// Create a fresh `Pending` session for a user request.
    pub fn new(request: impl Into<String>) -> Self {
        let (update_tx, update_rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            id: Uuid::new_v4(),
            workflow_id: Uuid::new_v4(),
            request: request.into(),
            created_at: Utc::now(),
            state: RwLock::new(SessionState {
                status: SessionStatus::Pending,
                message: "workflow submitted".to_string(),
                signature_request: None,
                result: None,
                error: None,
                context: None,
                updated_at: Utc::now(),
            }),
            update_tx,
            update_rx: Mutex::new(update_rx),
            cancel: CancellationToken::new(),
        }
    }

    /// Current status.
    pub async fn status(&self) -> SessionStatus {
        self.state.read().await.status
    }

    /// Snapshot for status queries.
    pub async fn snapshot(&self) -> SessionView {
        let state = self.state.read().await;
        SessionView {
            session_id: self.id,
            workflow_id: self.workflow_id,
            status: state.status,
            request: self.request.clone(),
            message: state.message.clone(),
            need_signature: state.status == SessionStatus::AwaitingSignature,
            signature_request: state.signature_request.clone(),
            result: state.result.clone(),
            error: state.error.clone(),
            created_at: self.created_at,
            updated_at: state.updated_at,
        }
    }

    /// Transition to `status`, pushing an update. A cancelled session is
    /// never overwritten.
    pub async fn set_status(&self, status: SessionStatus, message: impl Into<String>) {
        let message = message.into();
        {
            let mut state = self.state.write().await;
            if state.status == SessionStatus::Cancelled {
                return;
            }
            debug!(session = %self.id, from = %state.status, to = %status, "session transition");
            state.status = status;
            state.message = message.clone();
            state.updated_at = Utc::now();
        }
        self.push_update(SessionUpdate {
            kind: UpdateKind::Status,
            data: json!({ "status": status, "message": message }),
        });
    }

    /// Suspend: store the signature request and context, transition to
    /// `AwaitingSignature`.
    pub async fn suspend(&self, payload: SignaturePayload, context: WorkflowContext) {
        {
            let mut state = self.state.write().await;
            if state.status == SessionStatus::Cancelled {
                return;
            }
            state.status = SessionStatus::AwaitingSignature;
            state.message = "waiting for user signature".to_string();
            state.signature_request = Some(payload.clone());
            state.context = Some(context);
            state.updated_at = Utc::now();
        }
        self.push_update(SessionUpdate {
            kind: UpdateKind::SignatureRequest,
            data: serde_json::to_value(payload).unwrap_or(Value::Null),
        });
    }

    /// Complete with a final result.
    pub async fn complete(&self, result: Value) {
        {
            let mut state = self.state.write().await;
            if state.status == SessionStatus::Cancelled {
                return;
            }
            state.status = SessionStatus::Completed;
            state.message = "workflow complete".to_string();
            state.result = Some(result.clone());
            state.signature_request = None;
            state.context = None;
            state.updated_at = Utc::now();
        }
        self.push_update(SessionUpdate {
            kind: UpdateKind::Result,
            data: result,
        });
    }

    /// Fail terminally with a descriptive message.
    pub async fn fail(&self, error: impl Into<String>) {
        let error = error.into();
        {
            let mut state = self.state.write().await;
            if state.status == SessionStatus::Cancelled {
                return;
            }
            state.status = SessionStatus::Failed;
            state.message = error.clone();
            state.error = Some(error.clone());
            state.context = None;
            state.updated_at = Utc::now();
        }
        self.push_update(SessionUpdate {
            kind: UpdateKind::Status,
            data: json!({ "status": SessionStatus::Failed, "message": error }),
        });
    }

    /// Atomically validate that a signature may be submitted and take the
    /// suspended context. On success the session is `Running` again and the
    /// old context is destroyed.
    pub async fn begin_resume(&self) -> Result<WorkflowContext> {
        let context = {
            let mut state = self.state.write().await;
            if state.status != SessionStatus::AwaitingSignature {
                return Err(ChainflowError::InvalidSessionState {
                    id: self.id,
                    expected: SessionStatus::AwaitingSignature,
                    actual: state.status,
                });
            }
            let context = state.context.take().ok_or_else(|| {
                ChainflowError::Internal(format!("session {} has no suspended context", self.id))
            })?;
            state.status = SessionStatus::Running;
            state.message = "processing signature".to_string();
            state.signature_request = None;
            state.updated_at = Utc::now();
            context
        };
        self.push_update(SessionUpdate {
            kind: UpdateKind::Status,
            data: json!({ "status": SessionStatus::Running, "message": "processing signature" }),
        });
        Ok(context)
    }

    /// Long-poll the next update: resolved by the next pushed update, the
    /// timeout, or cancellation, whichever happens first.
    pub async fn poll(&self, timeout: Duration) -> PollOutcome {
        let mut rx = self.update_rx.lock().await;
        // cancellation wins over queued updates
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => PollOutcome::Cancelled,
            update = rx.recv() => match update {
                Some(update) => PollOutcome::Update(update),
                None => PollOutcome::Cancelled,
            },
            _ = tokio::time::sleep(timeout) => PollOutcome::Timeout,
        }
    }

    /// Cancel the session. In-flight polls return `Cancelled` immediately; a
    /// running node finishes its current step before the cancellation is
    /// observed at the next transition.
    pub async fn cancel(&self) {
        {
            let mut state = self.state.write().await;
            if !state.status.is_terminal() {
                state.status = SessionStatus::Cancelled;
                state.message = "session cancelled".to_string();
                state.context = None;
                state.updated_at = Utc::now();
            }
        }
        self.cancel.cancel();
    }

    /// Whether the cancellation signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn push_update(&self, update: SessionUpdate) {
        if let Err(e) = self.update_tx.try_send(update) {
            warn!(session = %self.id, error = %e, "update channel full, dropping update");
        }
    }
}
