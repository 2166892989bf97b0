//! 결과 조회 -- 완료된 스캔의 리포트와 요약
//!
//! 모든 조회는 [`CompletedScan`]을 요구합니다. 스냅샷에서 시작하는 `*_for` 변형은
//! 완료 여부를 먼저 검사하여 완료되지 않은 스캔이면 원격 호출 없이
//! `PreconditionViolation`을 반환합니다. 결과는 캐시하지 않습니다.

use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, info, warn};

use scanwatch_core::client::{ReportStream, ScanClient};
use scanwatch_core::error::{Operation, ScanError};
use scanwatch_core::http::{Method, RequestContext};
use scanwatch_core::metrics as m;
use scanwatch_core::types::{CompletedScan, ScanSnapshot, ScanSummary};

const COPY_BUF_SIZE: usize = 8 * 1024;

/// 완료된 스캔의 결과 조회기
pub struct ResultRetriever<C: ScanClient> {
    client: Arc<C>,
}

impl<C: ScanClient> Clone for ResultRetriever<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
        }
    }
}

impl<C: ScanClient> ResultRetriever<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// 리포트를 스트림으로 가져옵니다. 스트림은 호출자가 소유하고 닫습니다.
    pub async fn report(&self, scan: &CompletedScan) -> Result<ReportStream, ScanError> {
        let target = scan.scan_ref();
        debug!(scan_id = target.scan_id(), "fetching scan report");
        let result = self
            .client
            .get_report(target.project_id(), target.scan_id())
            .await;
        record_fetch("report", &result);
        result
    }

    /// 요약을 가져옵니다.
    pub async fn summary(&self, scan: &CompletedScan) -> Result<ScanSummary, ScanError> {
        let target = scan.scan_ref();
        debug!(scan_id = target.scan_id(), "fetching scan summary");
        let result = self
            .client
            .get_summary(target.project_id(), target.scan_id())
            .await;
        record_fetch("summary", &result);
        if let Ok(summary) = &result {
            info!(
                scan_id = target.scan_id(),
                total_results = summary.total_results,
                new_results = summary.total_new_results,
                fixed_results = summary.total_fixed_results,
                "scan summary retrieved"
            );
        }
        result
    }

    /// 완료 여부를 확인한 뒤 리포트를 가져옵니다.
    pub async fn report_for(&self, snapshot: &ScanSnapshot) -> Result<ReportStream, ScanError> {
        let completed = CompletedScan::require(snapshot, Operation::GetReport)?;
        self.report(&completed).await
    }

    /// 완료 여부를 확인한 뒤 요약을 가져옵니다.
    pub async fn summary_for(&self, snapshot: &ScanSnapshot) -> Result<ScanSummary, ScanError> {
        let completed = CompletedScan::require(snapshot, Operation::GetSummary)?;
        self.summary(&completed).await
    }

    /// 리포트를 그대로 파일에 저장하고 기록한 바이트 수를 반환합니다.
    ///
    /// 상위 디렉토리가 없으면 생성합니다. 같은 디렉토리의 임시 파일에 먼저 쓰고,
    /// 스트림을 끝까지 받은 뒤에만 대상 경로로 rename 합니다. 실패하거나 future가
    /// drop 되면 임시 파일은 삭제되고 기존 파일은 그대로 남습니다.
    ///
    /// 스트림 읽기 실패는 원격 전송 실패(`Transport`)로, 로컬 파일 실패는 `Io`로
    /// 구분합니다.
    pub async fn save_report(&self, scan: &CompletedScan, path: &Path) -> Result<u64, ScanError> {
        let mut report = self.report(scan).await?;
        let target = scan.scan_ref();
        let io_error = |error: std::io::Error| ScanError::Io {
            operation: Operation::SaveReport,
            scan: target.clone(),
            path: path.to_path_buf(),
            error,
        };

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        tokio::fs::create_dir_all(dir).await.map_err(io_error)?;

        let (file, temp_path) = tempfile::Builder::new()
            .prefix(".scanwatch-")
            .suffix(".part")
            .tempfile_in(dir)
            .map_err(io_error)?
            .into_parts();
        let mut file = tokio::fs::File::from_std(file);

        let mut buf = vec![0u8; COPY_BUF_SIZE];
        let mut written: u64 = 0;
        loop {
            let n = report.read(&mut buf).await.map_err(|e| {
                RequestContext::for_scan(
                    Operation::GetReport,
                    &target,
                    Method::Get,
                    format!(
                        "/projects/{}/scans/{}/report",
                        target.project_id(),
                        target.scan_id()
                    ),
                )
                .transport(format!("report stream interrupted after {written} bytes: {e}"))
            })?;
            if n == 0 {
                break;
            }
            file.write_all(&buf[..n]).await.map_err(io_error)?;
            written += n as u64;
        }
        file.flush().await.map_err(io_error)?;
        file.sync_all().await.map_err(io_error)?;
        drop(file);

        temp_path.persist(path).map_err(|e| io_error(e.error))?;

        metrics::counter!(m::RETRIEVAL_REPORT_BYTES_TOTAL).increment(written);
        info!(
            scan_id = scan.snapshot().id(),
            path = %path.display(),
            bytes = written,
            "scan report saved"
        );
        Ok(written)
    }
}

fn record_fetch<T>(kind: &'static str, result: &Result<T, ScanError>) {
    metrics::counter!(m::RETRIEVAL_FETCHES_TOTAL, m::LABEL_KIND => kind).increment(1);
    if let Err(e) = result {
        metrics::counter!(
            m::RETRIEVAL_FAILURES_TOTAL,
            m::LABEL_KIND => kind,
            m::LABEL_ERROR_KIND => e.kind().as_str()
        )
        .increment(1);
        warn!(kind, error = %e, "scan result retrieval failed");
    }
}
