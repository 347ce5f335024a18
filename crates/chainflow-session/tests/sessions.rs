//! Session lifecycle scenarios: long-poll, signature submission, typed
//! rejections, cancellation.

use std::sync::Arc;
use std::time::Duration;

use chainflow_contracts::ContractRegistry;
use chainflow_core::{ChainflowError, SessionStatus};
use chainflow_engine::WorkflowEngine;
use chainflow_rpc::ConfirmationWaiter;
use chainflow_session::{PollOutcome, SessionManager};
use uuid::Uuid;

fn manager() -> SessionManager {
    let engine = Arc::new(WorkflowEngine::new(
        None,
        Arc::new(ContractRegistry::builtin()),
        Arc::new(ConfirmationWaiter::simulated()),
    ));
    SessionManager::new(engine)
}

fn signature(fill: &str) -> String {
    format!("0x{}", fill.repeat(32))
}

async fn wait_for_status(manager: &SessionManager, id: Uuid, expected: SessionStatus) {
    for _ in 0..1000 {
        if manager.status(id).await.unwrap().status == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("session {id} never reached {expected}");
}

#[tokio::test(start_paused = true)]
async fn start_suspends_for_the_swap_signature() {
    let manager = manager();
    let started = manager.start("exchange 10 MEER for MTK").await;
    assert_eq!(started.status, SessionStatus::Pending);

    wait_for_status(&manager, started.session_id, SessionStatus::AwaitingSignature).await;

    let view = manager.status(started.session_id).await.unwrap();
    assert!(view.need_signature);
    let request = view.signature_request.expect("signature request stored");
    assert_eq!(request.tx.value, "0x8ac7230489e80000");
}

#[tokio::test(start_paused = true)]
async fn signature_completes_the_workflow() {
    let manager = manager();
    let started = manager.start("exchange 10 MEER for MTK").await;
    wait_for_status(&manager, started.session_id, SessionStatus::AwaitingSignature).await;

    let sig = signature("ab");
    let status = manager
        .submit_signature(started.session_id, &sig)
        .await
        .unwrap();
    assert_eq!(status, SessionStatus::Running);

    wait_for_status(&manager, started.session_id, SessionStatus::Completed).await;

    let view = manager.status(started.session_id).await.unwrap();
    let result = view.result.expect("result cached on session");
    assert_eq!(result["transaction_hash"], sig.as_str());

    // a second status call returns the same cached result, no re-execution
    let again = manager.status(started.session_id).await.unwrap();
    assert_eq!(again.result, Some(result));
}

#[tokio::test(start_paused = true)]
async fn poll_times_out_when_no_update_is_pending() {
    let manager = manager();
    let started = manager.start("exchange 10 MEER for MTK").await;
    wait_for_status(&manager, started.session_id, SessionStatus::AwaitingSignature).await;

    // drain the updates pushed during startup and suspension
    loop {
        match manager
            .poll(started.session_id, Duration::from_millis(50))
            .await
            .unwrap()
        {
            PollOutcome::Update(_) => continue,
            _ => break,
        }
    }

    let begin = tokio::time::Instant::now();
    let outcome = manager
        .poll(started.session_id, Duration::from_secs(1))
        .await
        .unwrap();
    assert!(matches!(outcome, PollOutcome::Timeout));
    assert!(begin.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn signature_to_completed_session_is_rejected_unchanged() {
    let manager = manager();
    let started = manager.start("exchange 10 MEER for MTK").await;
    wait_for_status(&manager, started.session_id, SessionStatus::AwaitingSignature).await;

    manager
        .submit_signature(started.session_id, &signature("ab"))
        .await
        .unwrap();
    wait_for_status(&manager, started.session_id, SessionStatus::Completed).await;

    let before = manager.status(started.session_id).await.unwrap();
    let err = manager
        .submit_signature(started.session_id, &signature("cd"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChainflowError::InvalidSessionState {
            expected: SessionStatus::AwaitingSignature,
            actual: SessionStatus::Completed,
            ..
        }
    ));

    let after = manager.status(started.session_id).await.unwrap();
    assert_eq!(after.status, SessionStatus::Completed);
    assert_eq!(after.result, before.result);
}

#[tokio::test(start_paused = true)]
async fn malformed_signature_fails_the_session() {
    let manager = manager();
    let started = manager.start("exchange 10 MEER for MTK").await;
    wait_for_status(&manager, started.session_id, SessionStatus::AwaitingSignature).await;

    // accepted at the session level, rejected by the validator before any
    // chain interaction
    manager
        .submit_signature(started.session_id, "0xdeadbeef")
        .await
        .unwrap();
    wait_for_status(&manager, started.session_id, SessionStatus::Failed).await;

    let view = manager.status(started.session_id).await.unwrap();
    assert!(view.error.unwrap().contains("malformed signature"));
}

#[tokio::test(start_paused = true)]
async fn cancel_resolves_inflight_polls() {
    let manager = manager();
    let started = manager.start("exchange 10 MEER for MTK").await;
    wait_for_status(&manager, started.session_id, SessionStatus::AwaitingSignature).await;

    manager.cancel(started.session_id).await.unwrap();

    let outcome = manager
        .poll(started.session_id, Duration::from_secs(30))
        .await
        .unwrap();
    assert!(matches!(outcome, PollOutcome::Cancelled));

    let view = manager.status(started.session_id).await.unwrap();
    assert_eq!(view.status, SessionStatus::Cancelled);
}

#[tokio::test(start_paused = true)]
async fn unknown_session_is_a_typed_error() {
    let manager = manager();
    let id = Uuid::new_v4();
    assert!(matches!(
        manager.status(id).await.unwrap_err(),
        ChainflowError::SessionNotFound(_)
    ));
    assert!(matches!(
        manager.submit_signature(id, &signature("ab")).await.unwrap_err(),
        ChainflowError::SessionNotFound(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn sessions_run_concurrently_and_independently() {
    let manager = manager();
    let a = manager.start("exchange 10 MEER for MTK").await;
    let b = manager.start("stake 100 MTK").await;
    assert_ne!(a.session_id, b.session_id);
    assert_eq!(manager.session_count().await, 2);

    wait_for_status(&manager, a.session_id, SessionStatus::AwaitingSignature).await;
    wait_for_status(&manager, b.session_id, SessionStatus::AwaitingSignature).await;

    // b suspends on its approve payload without touching a
    let b_view = manager.status(b.session_id).await.unwrap();
    let request = b_view.signature_request.unwrap();
    assert!(request.tx.data.starts_with("0x095ea7b3"));

    let a_view = manager.status(a.session_id).await.unwrap();
    assert_eq!(a_view.signature_request.unwrap().tx.data, "0xa4821719");
}
