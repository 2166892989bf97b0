//! 도메인 타입 -- 스캔 식별자, 스냅샷, 요약
//!
//! 모든 값은 생성 후 불변입니다. 진행 상황은 새 스냅샷을 조회해야만 관측할 수 있습니다.

use std::fmt;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use crate::error::{Operation, ScanError};
use crate::status::ScanStatus;

/// 스캔 식별자 (프로젝트 ID + 스캔 ID)
///
/// 스캔 ID는 프로젝트 안에서만 유일하므로 후속 호출에는 항상 둘 다 필요합니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanRef {
    project_id: String,
    scan_id: String,
}

impl ScanRef {
    pub fn new(project_id: impl Into<String>, scan_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            scan_id: scan_id.into(),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn scan_id(&self) -> &str {
        &self.scan_id
    }
}

impl fmt::Display for ScanRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan '{}' (project '{}')", self.scan_id, self.project_id)
    }
}

/// 스냅샷 불변식 위반
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidSnapshot {
    /// 스캔 ID가 비어 있음
    #[error("scan id must not be empty")]
    EmptyId,

    /// FAILED 상태인데 에러 메시지가 없음
    #[error("scan '{id}' is FAILED but carries no error message")]
    MissingErrorMessage { id: String },

    /// FAILED가 아닌데 에러 메시지가 있음
    #[error("scan '{id}' has status {status} but carries an error message")]
    UnexpectedErrorMessage { id: String, status: ScanStatus },
}

/// 스캔 상태 조회 결과 (한 시점의 불변 스냅샷)
///
/// 불변식: `error_message`는 `status == Failed`일 때만, 그리고 그때는 반드시
/// 비어 있지 않은 값으로 존재합니다. 역직렬화도 같은 검증을 거칩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSnapshot", into = "RawSnapshot")]
pub struct ScanSnapshot {
    id: String,
    project_id: String,
    organization_id: String,
    status: ScanStatus,
    error_message: Option<String>,
}

impl ScanSnapshot {
    /// 불변식을 검증하며 스냅샷을 생성합니다.
    ///
    /// 빈 에러 메시지는 없는 것으로 취급합니다.
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        organization_id: impl Into<String>,
        status: ScanStatus,
        error_message: Option<String>,
    ) -> Result<Self, InvalidSnapshot> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(InvalidSnapshot::EmptyId);
        }
        let error_message = error_message.filter(|m| !m.trim().is_empty());

        match (status, &error_message) {
            (ScanStatus::Failed, None) => return Err(InvalidSnapshot::MissingErrorMessage { id }),
            (ScanStatus::Failed, Some(_)) => {}
            (_, Some(_)) => return Err(InvalidSnapshot::UnexpectedErrorMessage { id, status }),
            (_, None) => {}
        }

        Ok(Self {
            id,
            project_id: project_id.into(),
            organization_id: organization_id.into(),
            status,
            error_message,
        })
    }

    /// FAILED가 아닌 상태의 스냅샷을 생성합니다.
    pub fn with_status(
        id: impl Into<String>,
        project_id: impl Into<String>,
        organization_id: impl Into<String>,
        status: ScanStatus,
    ) -> Result<Self, InvalidSnapshot> {
        Self::new(id, project_id, organization_id, status, None)
    }

    /// FAILED 상태의 스냅샷을 생성합니다.
    pub fn failed(
        id: impl Into<String>,
        project_id: impl Into<String>,
        organization_id: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Result<Self, InvalidSnapshot> {
        Self::new(
            id,
            project_id,
            organization_id,
            ScanStatus::Failed,
            Some(error_message.into()),
        )
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn organization_id(&self) -> &str {
        &self.organization_id
    }

    pub fn status(&self) -> ScanStatus {
        self.status
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn is_successful(&self) -> bool {
        self.status.is_successful()
    }

    /// 후속 호출용 식별자
    pub fn scan_ref(&self) -> ScanRef {
        ScanRef::new(self.project_id.clone(), self.id.clone())
    }
}

impl fmt::Display for ScanSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scan '{}' [{}]", self.id, self.status)?;
        if let Some(msg) = &self.error_message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct RawSnapshot {
    id: String,
    project_id: String,
    #[serde(default)]
    organization_id: String,
    status: ScanStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl TryFrom<RawSnapshot> for ScanSnapshot {
    type Error = InvalidSnapshot;

    fn try_from(raw: RawSnapshot) -> Result<Self, Self::Error> {
        Self::new(
            raw.id,
            raw.project_id,
            raw.organization_id,
            raw.status,
            raw.error_message,
        )
    }
}

impl From<ScanSnapshot> for RawSnapshot {
    fn from(snapshot: ScanSnapshot) -> Self {
        Self {
            id: snapshot.id,
            project_id: snapshot.project_id,
            organization_id: snapshot.organization_id,
            status: snapshot.status,
            error_message: snapshot.error_message,
        }
    }
}

/// 완료된 스캔의 집계 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// 요약 ID
    pub id: String,
    /// 스캔 ID
    pub scan_id: String,
    /// 프로젝트 ID
    pub project_id: String,
    /// 조직 ID
    pub organization_id: String,
    /// 분석 소요 시간 (밀리초)
    pub duration_millis: u64,
    /// 전체 결과 수
    pub total_results: u64,
    /// 새로 발견된 결과 수
    pub total_new_results: u64,
    /// 수정된 결과 수
    pub total_fixed_results: u64,
    /// 생성 시각
    pub created_at: SystemTime,
    /// 수정 시각
    pub modified_at: SystemTime,
}

impl ScanSummary {
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_millis)
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "scan '{}': {} results ({} new, {} fixed) in {}ms",
            self.scan_id,
            self.total_results,
            self.total_new_results,
            self.total_fixed_results,
            self.duration_millis
        )
    }
}

/// `Completed` 상태가 확인된 스냅샷
///
/// 결과 조회는 이 타입만 받으므로 "완료된 스캔에서만 조회"라는 전제조건이
/// 타입 수준에서 보장됩니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedScan {
    snapshot: ScanSnapshot,
}

impl CompletedScan {
    /// 스냅샷이 완료 상태인지 검사합니다.
    ///
    /// 완료가 아니면 `PreconditionViolation`을 반환합니다.
    pub fn require(snapshot: &ScanSnapshot, operation: Operation) -> Result<Self, ScanError> {
        Self::try_from(snapshot.clone()).map_err(|rejected| ScanError::PreconditionViolation {
            operation,
            scan: rejected.scan_ref(),
            status: rejected.status(),
        })
    }

    pub fn snapshot(&self) -> &ScanSnapshot {
        &self.snapshot
    }

    pub fn scan_ref(&self) -> ScanRef {
        self.snapshot.scan_ref()
    }

    pub fn into_snapshot(self) -> ScanSnapshot {
        self.snapshot
    }
}

impl TryFrom<ScanSnapshot> for CompletedScan {
    /// 거부된 스냅샷을 그대로 돌려줍니다.
    type Error = ScanSnapshot;

    fn try_from(snapshot: ScanSnapshot) -> Result<Self, Self::Error> {
        if snapshot.status().is_successful() {
            Ok(Self { snapshot })
        } else {
            Err(snapshot)
        }
    }
}
