//! 스캔 워크플로우 -- 시작, 완료 대기, 결과 수집을 하나의 데드라인 안에서 조합
//!
//! ```text
//! start() ──> ScanSnapshot ──> ScanHandoff (선택)
//!
//! run(scan) ── deadline ──────────────────────────────────────┐
//!   await_completion ──> Completed ──> try_join(summary, save_report)
//!                    └─> Cancelled ──> 결과 없음
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use scanwatch_core::client::ScanClient;
use scanwatch_core::error::{ConfigError, ScanError, ScanwatchError};
use scanwatch_core::handoff::ScanHandoff;
use scanwatch_core::scheduler::Scheduler;
use scanwatch_core::types::{CompletedScan, ScanRef, ScanSnapshot, ScanSummary};

use crate::awaiter::CompletionAwaiter;
use crate::config::AwaiterConfig;
use crate::retrieval::ResultRetriever;

/// 워크플로우 실행 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// 종료 시점의 스냅샷 (`Completed` 또는 `Cancelled`)
    pub snapshot: ScanSnapshot,
    /// 요약 (`Completed`일 때만)
    pub summary: Option<ScanSummary>,
    /// 저장된 리포트 경로 (`Completed`일 때만)
    pub report_path: Option<PathBuf>,
    /// 저장된 리포트 크기
    pub report_bytes: u64,
}

impl ScanOutcome {
    pub fn is_completed(&self) -> bool {
        self.snapshot.is_successful()
    }
}

/// 스캔 시작부터 결과 저장까지의 조합
pub struct ScanWorkflow<C: ScanClient, S: Scheduler> {
    awaiter: CompletionAwaiter<C, S>,
    retriever: ResultRetriever<C>,
    config: AwaiterConfig,
}

impl<C: ScanClient, S: Scheduler> ScanWorkflow<C, S> {
    /// 설정을 검증하고 워크플로우를 생성합니다.
    pub fn new(
        client: Arc<C>,
        scheduler: Arc<S>,
        config: AwaiterConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            retriever: ResultRetriever::new(Arc::clone(&client)),
            awaiter: CompletionAwaiter::new(client, scheduler),
            config,
        })
    }

    pub fn config(&self) -> &AwaiterConfig {
        &self.config
    }

    pub fn awaiter(&self) -> &CompletionAwaiter<C, S> {
        &self.awaiter
    }

    pub fn retriever(&self) -> &ResultRetriever<C> {
        &self.retriever
    }

    /// 새 스캔을 시작합니다.
    pub async fn start(
        &self,
        project_id: &str,
        code_artifact_id: &str,
        label: &str,
    ) -> Result<ScanSnapshot, ScanError> {
        let snapshot = self
            .awaiter
            .client()
            .create(project_id, code_artifact_id, label)
            .await?;
        info!(
            scan_id = snapshot.id(),
            project_id = snapshot.project_id(),
            status = %snapshot.status(),
            label,
            "scan started"
        );
        Ok(snapshot)
    }

    /// 스캔을 시작하고 핸드오프 파일을 기록합니다.
    pub async fn start_with_handoff(
        &self,
        project_id: &str,
        code_artifact_id: &str,
        label: &str,
        handoff_path: &Path,
    ) -> Result<ScanSnapshot, ScanwatchError> {
        let snapshot = self.start(project_id, code_artifact_id, label).await?;
        ScanHandoff::from_snapshot(&snapshot)
            .write(handoff_path)
            .await?;
        Ok(snapshot)
    }

    /// 완료를 기다린 뒤 요약 조회와 리포트 저장을 동시에 수행합니다.
    ///
    /// 전체 과정은 `config.timeout` 안에서 끝나야 하며, 초과하면 진행 중인 모든
    /// 작업을 drop하고 `Timeout`을 반환합니다. 원격에서 취소된 스캔은 결과 없이
    /// 성공으로 반환합니다.
    pub async fn run(&self, scan: &ScanRef) -> Result<ScanOutcome, ScanError> {
        let deadline = self.config.timeout;
        tokio::select! {
            biased;
            result = self.run_to_completion(scan) => result,
            () = self.awaiter.scheduler().sleep(deadline) => {
                warn!(
                    scan_id = scan.scan_id(),
                    deadline_secs = deadline.as_secs(),
                    "scan workflow deadline exceeded"
                );
                Err(ScanError::Timeout { scan: scan.clone(), waited: deadline })
            }
        }
    }

    /// 핸드오프 파일에 기록된 스캔을 이어서 실행합니다.
    pub async fn resume(&self, handoff_path: &Path) -> Result<ScanOutcome, ScanwatchError> {
        let handoff = ScanHandoff::read(handoff_path).await?;
        info!(
            scan_id = handoff.scan_id.as_str(),
            recorded_status = %handoff.status,
            "resuming scan from handoff"
        );
        Ok(self.run(&handoff.scan_ref()).await?)
    }

    async fn run_to_completion(&self, scan: &ScanRef) -> Result<ScanOutcome, ScanError> {
        let snapshot = self
            .awaiter
            .await_completion(scan, self.config.poll_interval)
            .await?;

        let completed = match CompletedScan::try_from(snapshot) {
            Ok(completed) => completed,
            Err(snapshot) => {
                info!(
                    scan_id = snapshot.id(),
                    status = %snapshot.status(),
                    "scan ended without results"
                );
                return Ok(ScanOutcome {
                    snapshot,
                    summary: None,
                    report_path: None,
                    report_bytes: 0,
                });
            }
        };

        let path = self.config.report_path();
        let (summary, report_bytes) = tokio::try_join!(
            self.retriever.summary(&completed),
            self.retriever.save_report(&completed, &path),
        )?;

        Ok(ScanOutcome {
            snapshot: completed.into_snapshot(),
            summary: Some(summary),
            report_path: Some(path),
            report_bytes,
        })
    }
}
