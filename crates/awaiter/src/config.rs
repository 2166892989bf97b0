//! Awaiter 설정
//!
//! [`AwaiterConfig`]는 core의 [`ScanConfig`](scanwatch_core::config::ScanConfig)를
//! 기반으로 폴링 간격과 데드라인을 `Duration`으로 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use scanwatch_core::config::ScanwatchConfig;
//! use scanwatch_awaiter::config::AwaiterConfig;
//!
//! let core_config = ScanwatchConfig::default();
//! let config = AwaiterConfig::from_core(&core_config.scan);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use scanwatch_core::config::{
    MAX_POLL_INTERVAL_MS, MAX_TIMEOUT_SECS, MIN_POLL_INTERVAL_MS, ScanConfig, validate_file_name,
};
use scanwatch_core::error::ConfigError;

/// 스캔 대기 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaiterConfig {
    /// 상태 조회 간격 (고정, 백오프 없음)
    pub poll_interval: Duration,
    /// 완료 대기와 결과 조회 전체에 적용되는 데드라인
    pub timeout: Duration,
    /// 리포트 저장 디렉토리
    pub report_dir: PathBuf,
    /// 리포트 파일 이름
    pub report_file_name: String,
}

impl Default for AwaiterConfig {
    fn default() -> Self {
        Self::from_core(&ScanConfig::default())
    }
}

impl AwaiterConfig {
    /// core의 `ScanConfig`에서 awaiter 설정을 생성합니다.
    pub fn from_core(core: &ScanConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(core.poll_interval_ms),
            timeout: Duration::from_secs(core.timeout_secs),
            report_dir: PathBuf::from(&core.report_dir),
            report_file_name: core.report_file_name.clone(),
        }
    }

    /// 리포트가 저장될 전체 경로
    pub fn report_path(&self) -> PathBuf {
        self.report_dir.join(&self.report_file_name)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let min_poll = Duration::from_millis(MIN_POLL_INTERVAL_MS);
        let max_poll = Duration::from_millis(MAX_POLL_INTERVAL_MS);
        if self.poll_interval < min_poll || self.poll_interval > max_poll {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval".to_owned(),
                reason: format!("must be {MIN_POLL_INTERVAL_MS}-{MAX_POLL_INTERVAL_MS}ms"),
            });
        }

        if self.timeout < Duration::from_secs(1)
            || self.timeout > Duration::from_secs(MAX_TIMEOUT_SECS)
        {
            return Err(ConfigError::InvalidValue {
                field: "timeout".to_owned(),
                reason: format!("must be 1-{MAX_TIMEOUT_SECS}s"),
            });
        }

        if self.timeout < self.poll_interval {
            return Err(ConfigError::InvalidValue {
                field: "timeout".to_owned(),
                reason: "must not be shorter than poll_interval".to_owned(),
            });
        }

        if self.report_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "report_dir".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        validate_file_name(&self.report_file_name).map_err(|reason| ConfigError::InvalidValue {
            field: "report_file_name".to_owned(),
            reason,
        })
    }
}

/// Awaiter 설정 빌더
#[derive(Default)]
pub struct AwaiterConfigBuilder {
    config: AwaiterConfig,
}

impl AwaiterConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 폴링 간격을 설정합니다.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// 전체 데드라인을 설정합니다.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// 리포트 저장 디렉토리를 설정합니다.
    pub fn report_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.report_dir = dir.into();
        self
    }

    /// 리포트 파일 이름을 설정합니다.
    pub fn report_file_name(mut self, name: impl Into<String>) -> Self {
        self.config.report_file_name = name.into();
        self
    }

    /// 설정을 검증하고 `AwaiterConfig`를 생성합니다.
    pub fn build(self) -> Result<AwaiterConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
