//! 스캔 상태 머신 -- 스냅샷 상태 분류 및 종료 여부 판정
//!
//! 상태는 닫힌 열거형이며 모든 판정은 exhaustive `match`로 수행됩니다.
//! 새 상태를 추가하면 이 모듈의 모든 판정 함수에서 컴파일 에러가 발생합니다.
//!
//! # 상태 분류
//!
//! ```text
//!  초기 상태            종료 상태
//! ┌─────────┐      ┌───────────┐
//! │ Waiting │ ───▶ │ Cancelled │
//! ├─────────┤      ├───────────┤
//! │ Running │ ───▶ │ Completed │
//! └─────────┘      ├───────────┤
//!                  │  Failed   │
//!                  └───────────┘
//! ```
//!
//! 폴링은 현재 상태를 다시 읽는 방식(level-triggered)이므로
//! `Waiting -> Running` 순서를 검증하는 전이 테이블은 두지 않습니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 원격 스캔 작업의 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanStatus {
    /// 대기열에서 실행을 기다리는 중
    Waiting,
    /// 분석 실행 중
    Running,
    /// 사용자 또는 서버에 의해 취소됨
    Cancelled,
    /// 분석 성공
    Completed,
    /// 분석 실패 (스냅샷에 에러 메시지 포함)
    Failed,
}

impl ScanStatus {
    /// 모든 상태 목록
    pub const ALL: [ScanStatus; 5] = [
        ScanStatus::Waiting,
        ScanStatus::Running,
        ScanStatus::Cancelled,
        ScanStatus::Completed,
        ScanStatus::Failed,
    ];

    /// 더 이상 진행되지 않는 상태인지 확인합니다.
    pub fn is_terminal(self) -> bool {
        is_terminal(self)
    }

    /// 결과(리포트, 요약)를 조회할 수 있는 상태인지 확인합니다.
    pub fn is_successful(self) -> bool {
        is_successful(self)
    }

    /// 처음 관측될 수 있는 상태인지 확인합니다.
    pub fn is_initial(self) -> bool {
        is_initial(self)
    }

    /// 와이어 형식 문자열을 반환합니다.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "WAITING",
            Self::Running => "RUNNING",
            Self::Cancelled => "CANCELLED",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }
}

/// 종료 상태 판정: `Cancelled`, `Completed`, `Failed`
pub fn is_terminal(status: ScanStatus) -> bool {
    match status {
        ScanStatus::Cancelled | ScanStatus::Completed | ScanStatus::Failed => true,
        ScanStatus::Waiting | ScanStatus::Running => false,
    }
}

/// 성공 판정: `Completed`만 해당
pub fn is_successful(status: ScanStatus) -> bool {
    match status {
        ScanStatus::Completed => true,
        ScanStatus::Waiting | ScanStatus::Running | ScanStatus::Cancelled | ScanStatus::Failed => {
            false
        }
    }
}

/// 초기 상태 판정: `Waiting`, `Running`
///
/// 첫 조회 시점에 이미 실행 중일 수 있으므로 둘 다 초기 상태입니다.
pub fn is_initial(status: ScanStatus) -> bool {
    !is_terminal(status)
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 알 수 없는 상태 문자열
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown scan status: '{0}'")]
pub struct UnknownStatus(pub String);

impl FromStr for ScanStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WAITING" => Ok(Self::Waiting),
            "RUNNING" => Ok(Self::Running),
            "CANCELLED" => Ok(Self::Cancelled),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            _ => Err(UnknownStatus(s.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_iff_cancelled_completed_or_failed() {
        for status in ScanStatus::ALL {
            let expected = matches!(
                status,
                ScanStatus::Cancelled | ScanStatus::Completed | ScanStatus::Failed
            );
            assert_eq!(is_terminal(status), expected, "status {status}");
            assert_eq!(status.is_terminal(), expected);
        }
    }

    #[test]
    fn successful_iff_completed() {
        for status in ScanStatus::ALL {
            assert_eq!(
                is_successful(status),
                status == ScanStatus::Completed,
                "status {status}"
            );
        }
    }

    #[test]
    fn initial_states_are_the_non_terminal_ones() {
        assert!(ScanStatus::Waiting.is_initial());
        assert!(ScanStatus::Running.is_initial());
        assert!(!ScanStatus::Completed.is_initial());
        assert!(!ScanStatus::Failed.is_initial());
        assert!(!ScanStatus::Cancelled.is_initial());
    }

    #[test]
    fn successful_implies_terminal() {
        for status in ScanStatus::ALL {
            if status.is_successful() {
                assert!(status.is_terminal());
            }
        }
    }

    #[test]
    fn parse_wire_strings() {
        assert_eq!("WAITING".parse::<ScanStatus>().unwrap(), ScanStatus::Waiting);
        assert_eq!("running".parse::<ScanStatus>().unwrap(), ScanStatus::Running);
        assert_eq!(
            " Completed ".parse::<ScanStatus>().unwrap(),
            ScanStatus::Completed
        );
        assert_eq!("FAILED".parse::<ScanStatus>().unwrap(), ScanStatus::Failed);
        assert_eq!(
            "CANCELLED".parse::<ScanStatus>().unwrap(),
            ScanStatus::Cancelled
        );
    }

    #[test]
    fn parse_unknown_status_fails() {
        let err = "PAUSED".parse::<ScanStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("PAUSED".to_owned()));
        assert!(err.to_string().contains("PAUSED"));
    }

    #[test]
    fn display_matches_wire_format() {
        for status in ScanStatus::ALL {
            let parsed: ScanStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn serde_uses_screaming_case() {
        let json = serde_json::to_string(&ScanStatus::Completed).unwrap();
        assert_eq!(json, "\"COMPLETED\"");
        let back: ScanStatus = serde_json::from_str("\"WAITING\"").unwrap();
        assert_eq!(back, ScanStatus::Waiting);
    }
}
