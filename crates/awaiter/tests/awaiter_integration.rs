//! 통합 테스트 -- 폴링 시나리오와 결과 조회 전제조건 검증
//!
//! 스크립트 클라이언트와 가상 시계를 사용하여
//! 대기 → 종료 판정 → 결과 조회 흐름을 호출 횟수 단위로 확인합니다.

use std::sync::Arc;
use std::time::Duration;

use scanwatch_awaiter::{CompletionAwaiter, ResultRetriever};
use scanwatch_core::error::{ErrorKind, Operation, ScanError};
use scanwatch_core::http::{self, Method, RequestContext};
use scanwatch_core::status::ScanStatus;
use scanwatch_core::testing::{CountingScheduler, ScriptedScanClient};
use tokio_util::sync::CancellationToken;

const POLL: Duration = Duration::from_secs(10);

fn setup(
    client: ScriptedScanClient,
) -> (
    Arc<ScriptedScanClient>,
    Arc<CountingScheduler>,
    CompletionAwaiter<ScriptedScanClient, CountingScheduler>,
) {
    let client = Arc::new(client);
    let scheduler = Arc::new(CountingScheduler::new());
    let awaiter = CompletionAwaiter::new(Arc::clone(&client), Arc::clone(&scheduler));
    (client, scheduler, awaiter)
}

// =============================================================================
// 폴링 시나리오
// =============================================================================

#[tokio::test(start_paused = true)]
async fn already_finished_scan_resolves_without_delay() {
    let (client, scheduler, awaiter) =
        setup(ScriptedScanClient::new().then_status(ScanStatus::Completed));
    let scan = client.scan_ref();

    let snapshot = awaiter.await_completion(&scan, POLL).await.unwrap();

    assert_eq!(snapshot.status(), ScanStatus::Completed);
    assert_eq!(client.get_calls(), 1);
    assert_eq!(scheduler.sleep_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn eventually_completes_after_two_scheduled_polls() {
    let (client, scheduler, awaiter) = setup(
        ScriptedScanClient::new()
            .then_status(ScanStatus::Waiting)
            .then_status(ScanStatus::Running)
            .then_status(ScanStatus::Completed),
    );
    let scan = client.scan_ref();
    let start = tokio::time::Instant::now();

    let snapshot = awaiter.await_completion(&scan, POLL).await.unwrap();

    assert_eq!(snapshot.status(), ScanStatus::Completed);
    assert_eq!(snapshot.scan_ref(), scan);
    assert_eq!(scheduler.durations(), vec![POLL, POLL]);
    assert_eq!(client.get_calls(), 3);
    assert_eq!(start.elapsed(), POLL * 2);
}

#[tokio::test(start_paused = true)]
async fn eventually_fails_with_scan_message() {
    let (client, _scheduler, awaiter) = setup(
        ScriptedScanClient::new()
            .then_status(ScanStatus::Waiting)
            .then_status(ScanStatus::Running)
            .then_failed("DNS exploded"),
    );
    let scan = client.scan_ref();

    let err = awaiter.await_completion(&scan, POLL).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::ScanFailed);
    match &err {
        ScanError::ScanFailed { scan: failed, message } => {
            assert_eq!(message, "DNS exploded");
            assert_eq!(failed, &scan);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("DNS exploded"));
    assert!(err.to_string().contains(scan.scan_id()));
}

#[tokio::test(start_paused = true)]
async fn transport_failure_mid_poll_stops_polling() {
    let scripted = ScriptedScanClient::new();
    let request = RequestContext::for_scan(
        Operation::GetScan,
        &scripted.scan_ref(),
        Method::Get,
        "/scans",
    );
    let (client, scheduler, awaiter) = setup(
        scripted
            .then_status(ScanStatus::Waiting)
            .then_status(ScanStatus::Running)
            .then_error(request.transport("connection refused"))
            .then_status(ScanStatus::Completed),
    );
    let scan = client.scan_ref();

    let err = awaiter.await_completion(&scan, POLL).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.is_retryable());

    // 시계를 진행시켜도 추가 조회가 없어야 합니다.
    tokio::time::advance(POLL * 5).await;
    assert_eq!(client.get_calls(), 3);
    assert_eq!(scheduler.sleep_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn remote_rejection_is_returned_unchanged() {
    let scripted = ScriptedScanClient::new();
    let rejection = http::classify(
        RequestContext::for_scan(Operation::GetScan, &scripted.scan_ref(), Method::Get, "/scans"),
        403,
        Some("Forbidden"),
        Some("token expired".to_owned()),
    );
    let (client, _scheduler, awaiter) = setup(scripted.then_error(rejection));
    let scan = client.scan_ref();

    let err = awaiter.await_completion(&scan, POLL).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    let remote = err.as_remote().unwrap();
    assert_eq!(remote.status(), 403);
    assert_eq!(remote.body(), Some("token expired"));
    assert_eq!(client.get_calls(), 1);
}

// =============================================================================
// 취소
// =============================================================================

#[tokio::test(start_paused = true)]
async fn cancellation_stops_all_further_polls() {
    let (client, _scheduler, awaiter) =
        setup(ScriptedScanClient::new().then_status(ScanStatus::Running));
    let scan = client.scan_ref();
    let cancel = CancellationToken::new();

    let task = {
        let awaiter = awaiter.clone();
        let scan = scan.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move { awaiter.await_with_cancel(&scan, POLL, &cancel).await })
    };

    // 0s, 10s, 20s 세 번 조회
    tokio::time::sleep(POLL * 2 + Duration::from_secs(1)).await;
    assert_eq!(client.get_calls(), 3);

    cancel.cancel();
    let err = task.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    tokio::time::advance(POLL * 10).await;
    assert_eq!(client.get_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn spawned_await_can_be_cancelled_through_handle() {
    let (client, _scheduler, awaiter) =
        setup(ScriptedScanClient::new().then_status(ScanStatus::Waiting));
    let scan = client.scan_ref();

    let handle = awaiter.spawn(scan.clone(), POLL);
    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.cancel();
    assert!(handle.is_cancelled());

    let err = handle.join().await.unwrap_err();
    assert!(matches!(err, ScanError::Cancelled { scan: ref cancelled } if cancelled == &scan));

    tokio::time::advance(POLL * 10).await;
    assert_eq!(client.get_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_is_distinct_from_transport_failure() {
    let (client, _scheduler, awaiter) = setup(
        ScriptedScanClient::new()
            .then_status(ScanStatus::Running)
            .with_get_delay(Duration::from_secs(60)),
    );
    let scan = client.scan_ref();

    let err = awaiter
        .await_with_deadline(&scan, POLL, Duration::from_secs(30))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_ne!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("30000ms"));
}

// =============================================================================
// 결과 조회 전제조건
// =============================================================================

#[tokio::test]
async fn retrieval_on_running_snapshot_makes_no_remote_call() {
    let client = Arc::new(ScriptedScanClient::new());
    let retriever = ResultRetriever::new(Arc::clone(&client));
    let running = client.snapshot(ScanStatus::Running);

    let err = retriever.summary_for(&running).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionViolation);
    assert!(err.to_string().starts_with("api misuse"));

    let err = retriever.report_for(&running).await.map(|_| ()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PreconditionViolation);

    assert_eq!(client.summary_calls(), 0);
    assert_eq!(client.report_calls(), 0);
    assert_eq!(client.get_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn awaited_snapshot_unlocks_retrieval() {
    let (client, _scheduler, awaiter) = setup(
        ScriptedScanClient::new()
            .then_status(ScanStatus::Running)
            .then_status(ScanStatus::Completed),
    );
    let scan = client.scan_ref();
    let retriever = ResultRetriever::new(Arc::clone(&client));

    let snapshot = awaiter.await_completion(&scan, POLL).await.unwrap();
    let summary = retriever.summary_for(&snapshot).await.unwrap();

    assert_eq!(summary.scan_id, scan.scan_id());
    assert_eq!(client.summary_calls(), 1);
}

// =============================================================================
// 분류 결정성
// =============================================================================

#[test]
fn classification_is_deterministic() {
    let scan = scanwatch_core::types::ScanRef::new("proj-1", "scan-1");
    let classify = || {
        http::classify(
            RequestContext::for_scan(
                Operation::GetReport,
                &scan,
                Method::Get,
                "/projects/proj-1/scans/scan-1/report",
            ),
            500,
            None,
            Some("{\"error\":\"boom\"}".to_owned()),
        )
    };

    let first = classify();
    let second = classify();

    assert_eq!(first.kind(), ErrorKind::RemoteRejected);
    assert_eq!(first.kind(), second.kind());
    let (a, b) = (first.as_remote().unwrap(), second.as_remote().unwrap());
    assert_eq!(a.diagnostic(), b.diagnostic());
    assert_eq!(
        a.diagnostic(),
        "GET /projects/proj-1/scans/scan-1/report\n500 Internal Server Error\n{\"error\":\"boom\"}"
    );
}
