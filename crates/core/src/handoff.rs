//! 스캔 핸드오프 레코드
//!
//! 스캔을 시작한 작업과 결과를 기다리는 작업이 분리되어 있을 때,
//! 식별자를 명시적인 JSON 파일로 전달합니다. 프로세스 전역 상태는 사용하지 않습니다.

use std::path::Path;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, ScanwatchError};
use crate::status::ScanStatus;
use crate::types::{ScanRef, ScanSnapshot};

/// 시작된 스캔의 식별 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanHandoff {
    pub project_id: String,
    pub scan_id: String,
    #[serde(default)]
    pub organization_id: String,
    /// 기록 시점의 상태
    pub status: ScanStatus,
    pub recorded_at: SystemTime,
}

impl ScanHandoff {
    /// 스냅샷에서 핸드오프 레코드를 만듭니다.
    pub fn from_snapshot(snapshot: &ScanSnapshot) -> Self {
        Self {
            project_id: snapshot.project_id().to_owned(),
            scan_id: snapshot.id().to_owned(),
            organization_id: snapshot.organization_id().to_owned(),
            status: snapshot.status(),
            recorded_at: SystemTime::now(),
        }
    }

    pub fn scan_ref(&self) -> ScanRef {
        ScanRef::new(&self.project_id, &self.scan_id)
    }

    /// JSON 파일로 기록합니다. 상위 디렉토리가 없으면 생성합니다.
    pub async fn write(&self, path: impl AsRef<Path>) -> Result<(), ScanwatchError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|e| ConfigError::ParseFailed {
            reason: format!("failed to encode handoff: {e}"),
        })?;
        tokio::fs::write(path, json).await?;
        debug!(path = %path.display(), scan_id = %self.scan_id, "scan handoff written");
        Ok(())
    }

    /// JSON 파일에서 읽습니다.
    pub async fn read(path: impl AsRef<Path>) -> Result<Self, ScanwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScanwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScanwatchError::Io(e)
            }
        })?;
        let handoff: Self = serde_json::from_slice(&content).map_err(|e| {
            ConfigError::ParseFailed {
                reason: format!("invalid handoff '{}': {e}", path.display()),
            }
        })?;
        if handoff.project_id.is_empty() || handoff.scan_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "handoff".to_owned(),
                reason: "project_id and scan_id must not be empty".to_owned(),
            }
            .into());
        }
        Ok(handoff)
    }
}
