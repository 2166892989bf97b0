//! 테스트 지원 -- 스크립트 기반 Mock 클라이언트와 카운팅 스케줄러
//!
//! `test-util` feature 또는 이 크레이트의 `cfg(test)`에서만 컴파일됩니다.
//! 원격 서비스 없이 폴링 순서, 호출 횟수, 에러 전파를 검증할 수 있습니다.
//!
//! ```ignore
//! use scanwatch_core::status::ScanStatus;
//! use scanwatch_core::testing::ScriptedScanClient;
//!
//! let client = ScriptedScanClient::new()
//!     .then_status(ScanStatus::Waiting)
//!     .then_status(ScanStatus::Running)
//!     .then_status(ScanStatus::Completed);
//! ```

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, ReadBuf};

use crate::client::{ReportStream, ScanClient};
use crate::error::{Operation, ScanError};
use crate::http::{Method, RequestContext, classify};
use crate::scheduler::Scheduler;
use crate::status::ScanStatus;
use crate::types::{ScanRef, ScanSnapshot, ScanSummary};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 미리 정한 순서대로 응답하는 Mock 스캔 클라이언트
///
/// `get` 호출마다 스크립트의 다음 항목을 반환합니다. 스크립트가 소진되면
/// 마지막으로 반환한 스냅샷을 반복합니다.
pub struct ScriptedScanClient {
    scan: ScanRef,
    organization_id: String,
    script: Mutex<VecDeque<Result<ScanSnapshot, ScanError>>>,
    last: Mutex<Option<ScanSnapshot>>,
    report: Bytes,
    report_tail: ReportTail,
    report_error: Mutex<Option<ScanError>>,
    summary: Option<ScanSummary>,
    summary_error: Mutex<Option<ScanError>>,
    get_delay: Option<Duration>,
    create_calls: AtomicUsize,
    get_calls: AtomicUsize,
    report_calls: AtomicUsize,
    summary_calls: AtomicUsize,
}

impl Default for ScriptedScanClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedScanClient {
    /// 무작위 스캔 ID를 가진 빈 스크립트 클라이언트를 생성합니다.
    pub fn new() -> Self {
        Self::for_scan(ScanRef::new("proj-1", uuid::Uuid::new_v4().to_string()))
    }

    /// 지정한 스캔에 대한 클라이언트를 생성합니다.
    pub fn for_scan(scan: ScanRef) -> Self {
        Self {
            scan,
            organization_id: "org-1".to_owned(),
            script: Mutex::new(VecDeque::new()),
            last: Mutex::new(None),
            report: Bytes::new(),
            report_tail: ReportTail::End,
            report_error: Mutex::new(None),
            summary: None,
            summary_error: Mutex::new(None),
            get_delay: None,
            create_calls: AtomicUsize::new(0),
            get_calls: AtomicUsize::new(0),
            report_calls: AtomicUsize::new(0),
            summary_calls: AtomicUsize::new(0),
        }
    }

    /// 이 클라이언트가 응답하는 스캔
    pub fn scan_ref(&self) -> ScanRef {
        self.scan.clone()
    }

    /// 이 스캔의 스냅샷을 생성합니다. `Failed`는 [`then_failed`](Self::then_failed)를 사용하세요.
    pub fn snapshot(&self, status: ScanStatus) -> ScanSnapshot {
        let message = (status == ScanStatus::Failed).then(|| "scan failed".to_owned());
        ScanSnapshot::new(
            self.scan.scan_id(),
            self.scan.project_id(),
            self.organization_id.clone(),
            status,
            message,
        )
        .unwrap_or_else(|e| panic!("scripted snapshot must be valid: {e}"))
    }

    /// 다음 `get` 응답으로 해당 상태의 스냅샷을 추가합니다.
    pub fn then_status(self, status: ScanStatus) -> Self {
        let snapshot = self.snapshot(status);
        self.then_snapshot(snapshot)
    }

    /// 다음 `get` 응답으로 실패 스냅샷을 추가합니다.
    pub fn then_failed(self, message: &str) -> Self {
        let snapshot = ScanSnapshot::failed(
            self.scan.scan_id(),
            self.scan.project_id(),
            self.organization_id.clone(),
            message,
        )
        .unwrap_or_else(|e| panic!("scripted snapshot must be valid: {e}"));
        self.then_snapshot(snapshot)
    }

    /// 다음 `get` 응답으로 임의의 스냅샷을 추가합니다.
    pub fn then_snapshot(self, snapshot: ScanSnapshot) -> Self {
        lock(&self.script).push_back(Ok(snapshot));
        self
    }

    /// 다음 `get` 응답으로 에러를 추가합니다.
    pub fn then_error(self, error: ScanError) -> Self {
        lock(&self.script).push_back(Err(error));
        self
    }

    /// 리포트 내용을 설정합니다.
    pub fn with_report(mut self, report: impl Into<Bytes>) -> Self {
        self.report = report.into();
        self
    }

    /// 리포트 스트림이 `prefix`를 내보낸 뒤 연결 끊김 에러로 끝나도록 설정합니다.
    pub fn with_interrupted_report(mut self, prefix: impl Into<Bytes>) -> Self {
        self.report = prefix.into();
        self.report_tail = ReportTail::Reset;
        self
    }

    /// 리포트 스트림이 `prefix`를 내보낸 뒤 영원히 멈추도록 설정합니다.
    pub fn with_stalled_report(mut self, prefix: impl Into<Bytes>) -> Self {
        self.report = prefix.into();
        self.report_tail = ReportTail::Stall;
        self
    }

    /// 첫 리포트 조회가 이 에러로 실패하도록 설정합니다.
    pub fn with_report_error(self, error: ScanError) -> Self {
        *lock(&self.report_error) = Some(error);
        self
    }

    /// 요약을 설정합니다. 설정하지 않으면 0건짜리 요약을 반환합니다.
    pub fn with_summary(mut self, summary: ScanSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// 첫 요약 조회가 이 에러로 실패하도록 설정합니다.
    pub fn with_summary_error(self, error: ScanError) -> Self {
        *lock(&self.summary_error) = Some(error);
        self
    }

    /// 모든 `get` 호출이 응답 전에 이만큼 대기하도록 설정합니다.
    pub fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn report_calls(&self) -> usize {
        self.report_calls.load(Ordering::SeqCst)
    }

    pub fn summary_calls(&self) -> usize {
        self.summary_calls.load(Ordering::SeqCst)
    }

    /// 이 스캔의 기본 요약
    pub fn default_summary(&self) -> ScanSummary {
        ScanSummary {
            id: format!("summary-{}", self.scan.scan_id()),
            scan_id: self.scan.scan_id().to_owned(),
            project_id: self.scan.project_id().to_owned(),
            organization_id: self.organization_id.clone(),
            duration_millis: 0,
            total_results: 0,
            total_new_results: 0,
            total_fixed_results: 0,
            created_at: SystemTime::UNIX_EPOCH,
            modified_at: SystemTime::UNIX_EPOCH,
        }
    }

    fn last_snapshot(&self) -> Option<ScanSnapshot> {
        lock(&self.last).clone()
    }

    fn check_target(
        &self,
        operation: Operation,
        project_id: &str,
        scan_id: &str,
        path: String,
    ) -> Result<(), ScanError> {
        if project_id == self.scan.project_id() && scan_id == self.scan.scan_id() {
            return Ok(());
        }
        let request = RequestContext::for_scan(
            operation,
            &ScanRef::new(project_id, scan_id),
            Method::Get,
            path,
        );
        Err(classify(request, 404, None, None))
    }
}

impl ScanClient for ScriptedScanClient {
    async fn create(
        &self,
        project_id: &str,
        _code_artifact_id: &str,
        _label: &str,
    ) -> Result<ScanSnapshot, ScanError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if project_id != self.scan.project_id() {
            let request = RequestContext::for_project(
                Operation::CreateScan,
                project_id,
                Method::Post,
                format!("/projects/{project_id}/scans"),
            );
            return Err(classify(request, 404, None, None));
        }
        Ok(self.snapshot(ScanStatus::Waiting))
    }

    async fn get(&self, project_id: &str, scan_id: &str) -> Result<ScanSnapshot, ScanError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        self.check_target(
            Operation::GetScan,
            project_id,
            scan_id,
            format!("/projects/{project_id}/scans/{scan_id}"),
        )?;

        let next = lock(&self.script).pop_front();
        match next {
            Some(Ok(snapshot)) => {
                *lock(&self.last) = Some(snapshot.clone());
                Ok(snapshot)
            }
            Some(Err(error)) => Err(error),
            None => match self.last_snapshot() {
                Some(snapshot) => Ok(snapshot),
                None => Err(classify(
                    RequestContext::for_scan(
                        Operation::GetScan,
                        &self.scan,
                        Method::Get,
                        format!("/projects/{project_id}/scans/{scan_id}"),
                    ),
                    404,
                    None,
                    Some("no scripted response".to_owned()),
                )),
            },
        }
    }

    async fn get_report(&self, project_id: &str, scan_id: &str) -> Result<ReportStream, ScanError> {
        self.report_calls.fetch_add(1, Ordering::SeqCst);
        self.check_target(
            Operation::GetReport,
            project_id,
            scan_id,
            format!("/projects/{project_id}/scans/{scan_id}/report"),
        )?;
        if let Some(error) = lock(&self.report_error).take() {
            return Err(error);
        }
        let body = std::io::Cursor::new(self.report.clone());
        let stream: ReportStream = match self.report_tail {
            ReportTail::End => Box::new(body),
            tail => Box::new(body.chain(TailReader(tail))),
        };
        Ok(stream)
    }

    async fn get_summary(&self, project_id: &str, scan_id: &str) -> Result<ScanSummary, ScanError> {
        self.summary_calls.fetch_add(1, Ordering::SeqCst);
        self.check_target(
            Operation::GetSummary,
            project_id,
            scan_id,
            format!("/projects/{project_id}/scans/{scan_id}/summary"),
        )?;
        if let Some(error) = lock(&self.summary_error).take() {
            return Err(error);
        }
        Ok(self
            .summary
            .clone()
            .unwrap_or_else(|| self.default_summary()))
    }
}

/// 리포트 본문 이후의 스트림 동작
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReportTail {
    End,
    Reset,
    Stall,
}

struct TailReader(ReportTail);

impl AsyncRead for TailReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.0 {
            ReportTail::End => Poll::Ready(Ok(())),
            ReportTail::Reset => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))),
            ReportTail::Stall => Poll::Pending,
        }
    }
}

/// 호출 횟수와 대기 시간을 기록하는 tokio 기반 스케줄러
#[derive(Debug, Default)]
pub struct CountingScheduler {
    sleeps: Mutex<Vec<Duration>>,
}

impl CountingScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// 예약된 대기 횟수
    pub fn sleep_count(&self) -> usize {
        lock(&self.sleeps).len()
    }

    /// 예약된 대기 시간 목록 (요청 순서)
    pub fn durations(&self) -> Vec<Duration> {
        lock(&self.sleeps).clone()
    }
}

impl Scheduler for CountingScheduler {
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        lock(&self.sleeps).push(duration);
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn script_is_replayed_in_order_then_repeats_last() {
        let client = ScriptedScanClient::new()
            .then_status(ScanStatus::Waiting)
            .then_status(ScanStatus::Running);
        let scan = client.scan_ref();

        let first = client.get(scan.project_id(), scan.scan_id()).await.unwrap();
        let second = client.get(scan.project_id(), scan.scan_id()).await.unwrap();
        let third = client.get(scan.project_id(), scan.scan_id()).await.unwrap();

        assert_eq!(first.status(), ScanStatus::Waiting);
        assert_eq!(second.status(), ScanStatus::Running);
        assert_eq!(third.status(), ScanStatus::Running);
        assert_eq!(client.get_calls(), 3);
    }

    #[tokio::test]
    async fn empty_script_returns_not_found() {
        let client = ScriptedScanClient::new();
        let scan = client.scan_ref();
        let err = client.get(scan.project_id(), scan.scan_id()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unknown_scan_returns_not_found() {
        let client = ScriptedScanClient::new().then_status(ScanStatus::Running);
        let err = client.get("proj-1", "other").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn report_streams_configured_bytes() {
        let client = ScriptedScanClient::new().with_report(&b"<report/>"[..]);
        let scan = client.scan_ref();
        let mut stream = client
            .get_report(scan.project_id(), scan.scan_id())
            .await
            .unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"<report/>");
        assert_eq!(client.report_calls(), 1);
    }

    #[tokio::test]
    async fn interrupted_report_fails_after_prefix() {
        let client = ScriptedScanClient::new().with_interrupted_report(&b"PARTIAL"[..]);
        let scan = client.scan_ref();
        let mut stream = client
            .get_report(scan.project_id(), scan.scan_id())
            .await
            .unwrap();

        let mut buf = [0u8; 7];
        stream.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"PARTIAL");

        let err = stream.read(&mut buf).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }

    #[tokio::test]
    async fn summary_error_is_returned_once() {
        let scan = ScanRef::new("proj-1", "scan-1");
        let error = RequestContext::for_scan(Operation::GetSummary, &scan, Method::Get, "/s")
            .transport("reset");
        let client = ScriptedScanClient::for_scan(scan.clone()).with_summary_error(error);

        let err = client
            .get_summary(scan.project_id(), scan.scan_id())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transport);

        let summary = client
            .get_summary(scan.project_id(), scan.scan_id())
            .await
            .unwrap();
        assert_eq!(summary.scan_id, "scan-1");
        assert_eq!(client.summary_calls(), 2);
    }

    #[tokio::test]
    async fn create_returns_waiting_snapshot() {
        let client = ScriptedScanClient::new();
        let snapshot = client.create("proj-1", "artifact-1", "nightly").await.unwrap();
        assert_eq!(snapshot.status(), ScanStatus::Waiting);
        assert_eq!(snapshot.scan_ref(), client.scan_ref());
        assert_eq!(client.create_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn counting_scheduler_records_durations() {
        let scheduler = CountingScheduler::new();
        scheduler.sleep(Duration::from_secs(1)).await;
        scheduler.sleep(Duration::from_secs(2)).await;
        assert_eq!(scheduler.sleep_count(), 2);
        assert_eq!(
            scheduler.durations(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
    }
}
