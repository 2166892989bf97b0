//! 설정 관리 -- scanwatch.toml 파싱 및 런타임 설정
//!
//! [`ScanwatchConfig`]는 로깅과 스캔 대기 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. 환경변수 (`SCANWATCH_SCAN_POLL_INTERVAL_MS=2000` 형식)
//! 2. 설정 파일 (`scanwatch.toml`)
//! 3. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), scanwatch_core::error::ScanwatchError> {
//! use scanwatch_core::config::ScanwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = ScanwatchConfig::load("scanwatch.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ScanwatchConfig::parse("[scan]\npoll_interval_ms = 2000")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ScanwatchError};

/// 폴링 간격 하한 (밀리초)
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
/// 폴링 간격 상한 (밀리초, 1시간)
pub const MAX_POLL_INTERVAL_MS: u64 = 3_600_000;
/// 대기 타임아웃 상한 (초, 24시간)
pub const MAX_TIMEOUT_SECS: u64 = 86_400;

/// Scanwatch 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 스캔 대기 설정
    #[serde(default)]
    pub scan: ScanConfig,
}

impl ScanwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ScanwatchError> {
        let mut config = Self::read_file(path.as_ref()).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ScanwatchError> {
        let config = Self::read_file(path.as_ref()).await?;
        config.validate()?;
        Ok(config)
    }

    /// 파일을 읽어 파싱만 합니다. 검증은 호출자가 합니다.
    async fn read_file(path: &Path) -> Result<Self, ScanwatchError> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ScanwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ScanwatchError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ScanwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            ScanwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SCANWATCH_{SECTION}_{FIELD}`
    /// 예: `SCANWATCH_SCAN_TIMEOUT_SECS=600`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SCANWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SCANWATCH_GENERAL_LOG_FORMAT");

        // Scan
        override_u64(
            &mut self.scan.poll_interval_ms,
            "SCANWATCH_SCAN_POLL_INTERVAL_MS",
        );
        override_u64(&mut self.scan.timeout_secs, "SCANWATCH_SCAN_TIMEOUT_SECS");
        override_string(&mut self.scan.report_dir, "SCANWATCH_SCAN_REPORT_DIR");
        override_string(
            &mut self.scan.report_file_name,
            "SCANWATCH_SCAN_REPORT_FILE_NAME",
        );
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ScanwatchError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if !(MIN_POLL_INTERVAL_MS..=MAX_POLL_INTERVAL_MS).contains(&self.scan.poll_interval_ms) {
            return Err(ConfigError::InvalidValue {
                field: "scan.poll_interval_ms".to_owned(),
                reason: format!("must be {MIN_POLL_INTERVAL_MS}-{MAX_POLL_INTERVAL_MS}"),
            }
            .into());
        }

        if self.scan.timeout_secs == 0 || self.scan.timeout_secs > MAX_TIMEOUT_SECS {
            return Err(ConfigError::InvalidValue {
                field: "scan.timeout_secs".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}"),
            }
            .into());
        }

        if self.scan.report_dir.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "scan.report_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            }
            .into());
        }

        validate_file_name(&self.scan.report_file_name).map_err(|reason| {
            ConfigError::InvalidValue {
                field: "scan.report_file_name".to_owned(),
                reason,
            }
        })?;

        Ok(())
    }
}

/// 리포트 파일 이름은 단일 경로 컴포넌트여야 합니다.
pub fn validate_file_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("must not be empty".to_owned());
    }
    if name == "." || name == ".." || name.contains('/') || name.contains('\\') {
        return Err(format!("'{name}' must be a plain file name"));
    }
    Ok(())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 스캔 대기 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// 폴링 간격 (밀리초)
    pub poll_interval_ms: u64,
    /// 완료 대기 + 결과 조회 전체 데드라인 (초)
    pub timeout_secs: u64,
    /// 리포트 저장 디렉토리
    pub report_dir: String,
    /// 리포트 파일 이름
    pub report_file_name: String,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            timeout_secs: 1_800, // 30 minutes
            report_dir: "target/scanwatch".to_owned(),
            report_file_name: "scan-report.sarif".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
