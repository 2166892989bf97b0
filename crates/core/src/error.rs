//! 에러 타입 -- 스캔 완료 프로토콜의 에러 분류 체계
//!
//! # 에러 종류
//!
//! | 종류 | 생성 위치 | 재시도 |
//! |------|-----------|--------|
//! | `Unauthorized` / `NotFound` / `RemoteRejected` | HTTP 분류기 ([`crate::http`]) | X |
//! | `MalformedResponse` | 클라이언트 구현 / awaiter | X |
//! | `Transport` | 클라이언트 구현 | O |
//! | `ScanFailed` | awaiter (원격 작업 자체의 실패) | X |
//! | `Timeout` | 데드라인 합성 | O |
//! | `PreconditionViolation` | 결과 조회 (API 오용) | X |
//! | `Cancelled` | 호출자 취소 | X |
//!
//! 원격 호출 에러는 경계에서 한 번만 분류되며 상위 컴포넌트는 재분류 없이 전파합니다.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::http::{Method, RequestContext};
use crate::status::ScanStatus;
use crate::types::ScanRef;

/// Scanwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ScanwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 스캔 프로토콜 에러
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 시도한 작업
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// 스캔 생성
    CreateScan,
    /// 스캔 상태 조회
    GetScan,
    /// 리포트 스트림 조회
    GetReport,
    /// 요약 조회
    GetSummary,
    /// 완료 대기
    AwaitCompletion,
    /// 리포트 파일 저장
    SaveReport,
}

impl Operation {
    /// 진단 메시지에 쓰이는 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateScan => "create scan",
            Self::GetScan => "get scan",
            Self::GetReport => "get report",
            Self::GetSummary => "get summary",
            Self::AwaitCompletion => "await completion",
            Self::SaveReport => "save report",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 에러 종류 판별자
///
/// 호출자가 에러 종류별로 다르게 대응할 때 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    RemoteRejected,
    MalformedResponse,
    Transport,
    ScanFailed,
    Timeout,
    PreconditionViolation,
    Cancelled,
    Io,
}

impl ErrorKind {
    /// 메트릭 레이블 등에 쓰이는 snake_case 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::RemoteRejected => "remote_rejected",
            Self::MalformedResponse => "malformed_response",
            Self::Transport => "transport",
            Self::ScanFailed => "scan_failed",
            Self::Timeout => "timeout",
            Self::PreconditionViolation => "precondition_violation",
            Self::Cancelled => "cancelled",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 원격 거부 종류 (HTTP 상태 코드 계열)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteErrorKind {
    /// 401 / 403
    Unauthorized,
    /// 404
    NotFound,
    /// 그 외 성공이 아닌 상태
    Rejected,
}

impl RemoteErrorKind {
    /// 상태 코드로 종류를 결정합니다.
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            _ => Self::Rejected,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not found",
            Self::Rejected => "rejected by remote",
        }
    }
}

/// 원격 서버가 거부한 요청
///
/// 상태 코드 계열마다 별도 타입을 두지 않고 `kind` 판별자와
/// 공통 컨텍스트(메서드, 경로, 상태, 본문)를 가진 단일 값으로 표현합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    kind: RemoteErrorKind,
    request: RequestContext,
    status: u16,
    status_text: String,
    body: Option<String>,
}

impl RemoteError {
    /// 분류기에서만 생성합니다.
    pub(crate) fn new(
        request: RequestContext,
        status: u16,
        status_text: String,
        body: Option<String>,
    ) -> Self {
        Self {
            kind: RemoteErrorKind::from_status(status),
            request,
            status,
            status_text,
            body,
        }
    }

    pub fn kind(&self) -> RemoteErrorKind {
        self.kind
    }

    pub fn request(&self) -> &RequestContext {
        &self.request
    }

    pub fn method(&self) -> Method {
        self.request.method()
    }

    pub fn path(&self) -> &str {
        self.request.path()
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// 결정적인 진단 문자열을 생성합니다.
    ///
    /// ```text
    /// GET /projects/p-1/scans/s-1
    /// 404 Not Found
    /// {"message":"scan not found"}
    /// ```
    ///
    /// 본문이 없으면 마지막 줄은 생략됩니다.
    pub fn diagnostic(&self) -> String {
        let mut out = format!(
            "{} {}\n{} {}",
            self.request.method(),
            self.request.path(),
            self.status,
            self.status_text
        );
        if let Some(body) = &self.body {
            out.push('\n');
            out.push_str(body);
        }
        out
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}\n{}",
            self.request,
            self.kind.describe(),
            self.diagnostic()
        )
    }
}

impl std::error::Error for RemoteError {}

/// 스캔 프로토콜 도메인 에러
///
/// 모든 variant의 `Display`는 시도한 작업과 대상 스캔(또는 프로젝트)을 포함합니다.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    /// 원격 서버가 요청을 거부함 (401/403, 404, 기타)
    #[error("{0}")]
    Remote(RemoteError),

    /// 응답을 기대한 형태로 해석할 수 없음
    #[error("{request}: malformed response: {reason}")]
    MalformedResponse {
        request: RequestContext,
        reason: String,
    },

    /// 응답을 받기 전에 요청 전송 또는 연결이 실패함
    #[error("{request}: transport error: {reason}")]
    Transport {
        request: RequestContext,
        reason: String,
    },

    /// 원격 스캔 작업 자체가 실패로 끝남
    #[error("scan failed: {scan}: {message}")]
    ScanFailed { scan: ScanRef, message: String },

    /// 호출자가 지정한 데드라인 초과 (스캔은 서버에서 계속 실행 중일 수 있음)
    #[error("await completion of {scan}: timed out after {}ms, scan may still be running", .waited.as_millis())]
    Timeout { scan: ScanRef, waited: Duration },

    /// 완료되지 않은 스캔에 결과 조회를 시도함 (API 오용)
    #[error("api misuse: {operation} for {scan} requires a completed scan, but status is {status}")]
    PreconditionViolation {
        operation: Operation,
        scan: ScanRef,
        status: ScanStatus,
    },

    /// 호출자가 대기를 취소함
    #[error("await completion of {scan}: cancelled by caller")]
    Cancelled { scan: ScanRef },

    /// 로컬 파일 I/O 실패
    #[error("{operation} for {scan}: io error at {}: {error}", .path.display())]
    Io {
        operation: Operation,
        scan: ScanRef,
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl ScanError {
    /// 에러 종류를 반환합니다.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Remote(remote) => match remote.kind() {
                RemoteErrorKind::Unauthorized => ErrorKind::Unauthorized,
                RemoteErrorKind::NotFound => ErrorKind::NotFound,
                RemoteErrorKind::Rejected => ErrorKind::RemoteRejected,
            },
            Self::MalformedResponse { .. } => ErrorKind::MalformedResponse,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::ScanFailed { .. } => ErrorKind::ScanFailed,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::PreconditionViolation { .. } => ErrorKind::PreconditionViolation,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// 같은 호출을 다시 시도할 가치가 있는지 여부
    ///
    /// 전송 실패와 타임아웃만 일시적 조건으로 봅니다.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Timeout)
    }

    /// 원격 실패가 아닌 API 오용인지 여부
    pub fn is_api_misuse(&self) -> bool {
        matches!(self, Self::PreconditionViolation { .. })
    }

    /// 원격 거부 에러라면 상세 정보를 반환합니다.
    pub fn as_remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(remote) => Some(remote),
            _ => None,
        }
    }
}

impl From<RemoteError> for ScanError {
    fn from(err: RemoteError) -> Self {
        Self::Remote(err)
    }
}
