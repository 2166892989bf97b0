//! 스캔 완료 대기 -- 고정 간격 폴링으로 종료 상태까지 추적
//!
//! [`CompletionAwaiter`]는 [`ScanClient::get`]을 반복 호출하여 스캔이 종료 상태에
//! 도달할 때까지 기다립니다. 폴링 사이의 대기는 주입된 [`Scheduler`]를 사용하므로
//! 테스트에서는 가상 시계로 진행시킬 수 있습니다.
//!
//! # 동작
//! - 첫 조회는 즉시 수행하며, 이미 종료된 스캔은 대기 없이 반환합니다.
//! - `Completed`, `Cancelled`는 스냅샷을, `Failed`는 `ScanFailed`를 반환합니다.
//! - 클라이언트 에러는 그대로 반환하고 더 이상 폴링하지 않습니다 (재시도 없음).

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use scanwatch_core::client::ScanClient;
use scanwatch_core::error::{ErrorKind, Operation, ScanError};
use scanwatch_core::http::{Method, RequestContext};
use scanwatch_core::metrics as m;
use scanwatch_core::scheduler::Scheduler;
use scanwatch_core::status::ScanStatus;
use scanwatch_core::types::{ScanRef, ScanSnapshot};

/// 스캔 완료 대기자
///
/// 클라이언트와 스케줄러는 `Arc`로 공유되므로 여러 스캔을 동시에 기다릴 수 있습니다.
/// 각 대기는 독립적이며 대기 사이에 공유되는 가변 상태는 없습니다.
pub struct CompletionAwaiter<C: ScanClient, S: Scheduler> {
    client: Arc<C>,
    scheduler: Arc<S>,
}

impl<C: ScanClient, S: Scheduler> Clone for CompletionAwaiter<C, S> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            scheduler: Arc::clone(&self.scheduler),
        }
    }
}

impl<C: ScanClient, S: Scheduler> CompletionAwaiter<C, S> {
    /// 새 대기자를 생성합니다.
    pub fn new(client: Arc<C>, scheduler: Arc<S>) -> Self {
        Self { client, scheduler }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn scheduler(&self) -> &Arc<S> {
        &self.scheduler
    }

    /// 스캔이 종료 상태에 도달할 때까지 기다립니다.
    ///
    /// # Errors
    /// - `ScanFailed`: 스캔이 `FAILED`로 종료됨
    /// - `MalformedResponse`: 다른 스캔의 스냅샷이 반환됨
    /// - 그 외: 클라이언트가 반환한 에러 그대로
    pub async fn await_completion(
        &self,
        scan: &ScanRef,
        poll_interval: Duration,
    ) -> Result<ScanSnapshot, ScanError> {
        let started = Instant::now();
        let result = self.poll_until_terminal(scan, poll_interval).await;
        record_settlement(scan, &result, started);
        result
    }

    /// 취소 토큰과 함께 기다립니다.
    ///
    /// 토큰이 취소되면 진행 중인 조회와 대기 타이머를 drop하고
    /// `Cancelled`를 반환합니다. 이후에는 어떤 조회도 수행되지 않습니다.
    pub async fn await_with_cancel(
        &self,
        scan: &ScanRef,
        poll_interval: Duration,
        cancel: &CancellationToken,
    ) -> Result<ScanSnapshot, ScanError> {
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(scan_id = scan.scan_id(), project_id = scan.project_id(), "await cancelled by caller");
                Err(ScanError::Cancelled { scan: scan.clone() })
            }
            result = self.poll_until_terminal(scan, poll_interval) => result,
        };
        record_settlement(scan, &result, started);
        result
    }

    /// 데드라인 안에서 기다립니다.
    ///
    /// 폴링 루프와 `Scheduler::sleep(deadline)`을 경쟁시키며, 데드라인이 먼저
    /// 끝나면 폴링 future를 drop하고 `Timeout`을 반환합니다.
    /// 서버의 스캔은 취소되지 않습니다.
    pub async fn await_with_deadline(
        &self,
        scan: &ScanRef,
        poll_interval: Duration,
        deadline: Duration,
    ) -> Result<ScanSnapshot, ScanError> {
        let started = Instant::now();
        let result = tokio::select! {
            biased;
            result = self.poll_until_terminal(scan, poll_interval) => result,
            () = self.scheduler.sleep(deadline) => {
                warn!(
                    scan_id = scan.scan_id(),
                    deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX),
                    "await deadline exceeded"
                );
                Err(ScanError::Timeout { scan: scan.clone(), waited: deadline })
            }
        };
        record_settlement(scan, &result, started);
        result
    }

    /// 별도 tokio 태스크에서 기다립니다.
    ///
    /// 반환된 [`AwaitHandle`]로 취소하거나 결과를 받을 수 있습니다.
    /// 핸들을 drop하면 대기도 취소됩니다.
    pub fn spawn(&self, scan: ScanRef, poll_interval: Duration) -> AwaitHandle {
        let cancel = CancellationToken::new();
        let awaiter = self.clone();
        let token = cancel.clone();
        let target = scan.clone();
        let task = tokio::spawn(async move {
            awaiter
                .await_with_cancel(&target, poll_interval, &token)
                .await
        });
        AwaitHandle {
            scan,
            guard: cancel.clone().drop_guard(),
            cancel,
            task,
        }
    }

    /// 폴링 루프 본체. 종료 상태 또는 에러에서만 반환합니다.
    pub(crate) async fn poll_until_terminal(
        &self,
        scan: &ScanRef,
        poll_interval: Duration,
    ) -> Result<ScanSnapshot, ScanError> {
        let mut polls: u64 = 0;
        loop {
            polls += 1;
            metrics::counter!(m::AWAITER_POLLS_TOTAL).increment(1);

            let snapshot = match self.client.get(scan.project_id(), scan.scan_id()).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(
                        scan_id = scan.scan_id(),
                        poll = polls,
                        error_kind = e.kind().as_str(),
                        error = %e,
                        "scan poll failed"
                    );
                    return Err(e);
                }
            };
            ensure_same_scan(scan, &snapshot)?;

            debug!(
                scan_id = scan.scan_id(),
                poll = polls,
                status = %snapshot.status(),
                "scan polled"
            );

            if let Some(result) = settle(scan, snapshot) {
                return result;
            }
            self.scheduler.sleep(poll_interval).await;
        }
    }
}

/// 종료 상태라면 대기 결과를 만듭니다. 진행 중이면 `None`.
fn settle(scan: &ScanRef, snapshot: ScanSnapshot) -> Option<Result<ScanSnapshot, ScanError>> {
    match snapshot.status() {
        ScanStatus::Waiting | ScanStatus::Running => None,
        ScanStatus::Completed | ScanStatus::Cancelled => Some(Ok(snapshot)),
        ScanStatus::Failed => Some(Err(ScanError::ScanFailed {
            scan: scan.clone(),
            message: snapshot.error_message().unwrap_or_default().to_owned(),
        })),
    }
}

fn ensure_same_scan(scan: &ScanRef, snapshot: &ScanSnapshot) -> Result<(), ScanError> {
    if snapshot.id() == scan.scan_id() && snapshot.project_id() == scan.project_id() {
        return Ok(());
    }
    let request = RequestContext::for_scan(
        Operation::GetScan,
        scan,
        Method::Get,
        format!("/projects/{}/scans/{}", scan.project_id(), scan.scan_id()),
    );
    Err(request.malformed(format!(
        "response describes scan '{}' in project '{}'",
        snapshot.id(),
        snapshot.project_id()
    )))
}

fn record_settlement(scan: &ScanRef, result: &Result<ScanSnapshot, ScanError>, started: Instant) {
    let outcome = match result {
        Ok(snapshot) if snapshot.is_successful() => "completed",
        Ok(_) => "cancelled",
        Err(e) => match e.kind() {
            ErrorKind::ScanFailed => "failed",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Cancelled => "cancelled",
            _ => "error",
        },
    };
    let elapsed = started.elapsed();
    metrics::counter!(m::AWAITER_AWAITS_TOTAL, m::LABEL_RESULT => outcome).increment(1);
    metrics::histogram!(m::AWAITER_AWAIT_DURATION_SECONDS).record(elapsed.as_secs_f64());

    info!(
        scan_id = scan.scan_id(),
        project_id = scan.project_id(),
        result = outcome,
        elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        "scan await settled"
    );
}

/// 별도 태스크에서 진행 중인 대기
///
/// `join`은 정확히 한 번의 결과를 돌려줍니다.
pub struct AwaitHandle {
    scan: ScanRef,
    cancel: CancellationToken,
    guard: DropGuard,
    task: JoinHandle<Result<ScanSnapshot, ScanError>>,
}

impl AwaitHandle {
    /// 대기 중인 스캔
    pub fn scan(&self) -> &ScanRef {
        &self.scan
    }

    /// 대기를 취소합니다. 이후 조회는 수행되지 않습니다.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// 대기 결과를 기다립니다.
    ///
    /// 태스크가 패닉하면 패닉을 그대로 전파합니다.
    pub async fn join(self) -> Result<ScanSnapshot, ScanError> {
        let Self {
            scan, guard, task, ..
        } = self;
        let joined = task.await;
        drop(guard);
        match joined {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(ScanError::Cancelled { scan }),
        }
    }
}

impl std::fmt::Debug for AwaitHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwaitHandle")
            .field("scan", &self.scan)
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
