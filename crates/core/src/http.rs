//! HTTP 응답 분류기
//!
//! 원격 호출이 실패했을 때 상태 코드와 본문을 도메인 에러로 변환합니다.
//! 분류는 원시 응답이 타입 있는 에러로 바뀌는 경계에서 **한 번만** 수행됩니다.
//!
//! | 상태 코드 | 에러 종류 |
//! |-----------|-----------|
//! | 2xx | 에러 아님 |
//! | 401, 403 | `Unauthorized` |
//! | 404 | `NotFound` |
//! | 그 외 | `RemoteRejected` |
//!
//! 같은 (상태, 본문) 입력은 항상 같은 종류와 같은 진단 문자열을 만듭니다.

use std::fmt;

use crate::error::{Operation, RemoteError, ScanError};
use crate::types::ScanRef;

/// HTTP 메서드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 실패한 요청의 컨텍스트
///
/// 분류된 모든 원격 에러는 이 컨텍스트를 보존하여
/// 진단 메시지를 결정적으로 재구성할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    operation: Operation,
    project_id: String,
    scan_id: Option<String>,
    method: Method,
    path: String,
}

impl RequestContext {
    /// 특정 스캔을 대상으로 하는 요청
    pub fn for_scan(
        operation: Operation,
        scan: &ScanRef,
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            project_id: scan.project_id().to_owned(),
            scan_id: Some(scan.scan_id().to_owned()),
            method,
            path: path.into(),
        }
    }

    /// 아직 스캔 ID가 없는 프로젝트 단위 요청 (스캔 생성 등)
    pub fn for_project(
        operation: Operation,
        project_id: impl Into<String>,
        method: Method,
        path: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            project_id: project_id.into(),
            scan_id: None,
            method,
            path: path.into(),
        }
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn scan_id(&self) -> Option<&str> {
        self.scan_id.as_deref()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// 응답 수신 전 전송 실패 에러를 생성합니다.
    pub fn transport(self, reason: impl Into<String>) -> ScanError {
        ScanError::Transport {
            request: self,
            reason: reason.into(),
        }
    }

    /// 응답 해석 실패 에러를 생성합니다.
    pub fn malformed(self, reason: impl Into<String>) -> ScanError {
        ScanError::MalformedResponse {
            request: self,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.scan_id {
            Some(scan_id) => write!(
                f,
                "{} for scan '{}' (project '{}')",
                self.operation, scan_id, self.project_id
            ),
            None => write!(f, "{} in project '{}'", self.operation, self.project_id),
        }
    }
}

/// 성공 응답(2xx)인지 확인합니다.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// 실패한 원격 호출을 분류합니다.
///
/// `status_text`가 없으면 표준 reason phrase를 사용합니다.
/// 비어 있거나 공백뿐인 본문은 없는 것으로 취급합니다.
pub fn classify(
    request: RequestContext,
    status: u16,
    status_text: Option<&str>,
    body: Option<String>,
) -> ScanError {
    let status_text = match status_text.map(str::trim) {
        Some(text) if !text.is_empty() => text.to_owned(),
        _ => reason_phrase(status).to_owned(),
    };
    let body = body.filter(|b| !b.trim().is_empty());

    ScanError::Remote(RemoteError::new(request, status, status_text, body))
}

/// 응답 상태를 검사하여 성공이 아니면 분류된 에러를 반환합니다.
pub fn check_response(
    request: RequestContext,
    status: u16,
    status_text: Option<&str>,
    body: Option<String>,
) -> Result<(), ScanError> {
    if is_success(status) {
        Ok(())
    } else {
        Err(classify(request, status, status_text, body))
    }
}

/// 표준 HTTP reason phrase
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        202 => "Accepted",
        204 => "No Content",
        301 => "Moved Permanently",
        302 => "Found",
        304 => "Not Modified",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        408 => "Request Timeout",
        409 => "Conflict",
        410 => "Gone",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "Unknown Status",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn request() -> RequestContext {
        RequestContext::for_scan(
            Operation::GetSummary,
            &ScanRef::new("proj-9", "scan-42"),
            Method::Get,
            "/projects/proj-9/scans/scan-42/summary",
        )
    }

    #[test]
    fn classify_401_and_403_as_unauthorized() {
        for status in [401, 403] {
            let err = classify(request(), status, None, None);
            assert_eq!(err.kind(), ErrorKind::Unauthorized, "status {status}");
        }
    }

    #[test]
    fn classify_404_as_not_found() {
        let err = classify(request(), 404, None, None);
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn classify_other_statuses_as_rejected() {
        for status in [400, 409, 422, 429, 500, 502, 503, 302] {
            let err = classify(request(), status, None, None);
            assert_eq!(err.kind(), ErrorKind::RemoteRejected, "status {status}");
        }
    }

    #[test]
    fn classification_is_deterministic() {
        let a = classify(request(), 503, None, Some("try later".to_owned()));
        let b = classify(request(), 503, None, Some("try later".to_owned()));
        assert_eq!(a.kind(), b.kind());
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(a.as_remote(), b.as_remote());
    }

    #[test]
    fn missing_status_text_uses_reason_phrase() {
        let err = classify(request(), 404, None, None);
        assert_eq!(err.as_remote().unwrap().status_text(), "Not Found");

        let err = classify(request(), 404, Some("   "), None);
        assert_eq!(err.as_remote().unwrap().status_text(), "Not Found");
    }

    #[test]
    fn explicit_status_text_is_kept() {
        let err = classify(request(), 403, Some("Token Expired"), None);
        assert_eq!(err.as_remote().unwrap().status_text(), "Token Expired");
    }

    #[test]
    fn blank_body_is_treated_as_absent() {
        let err = classify(request(), 500, None, Some("\n  ".to_owned()));
        let remote = err.as_remote().unwrap();
        assert!(remote.body().is_none());
        assert_eq!(remote.diagnostic().lines().count(), 2);
    }

    #[test]
    fn remote_error_keeps_request_context() {
        let err = classify(request(), 500, None, Some("oops".to_owned()));
        let remote = err.as_remote().unwrap();
        assert_eq!(remote.method(), Method::Get);
        assert_eq!(remote.path(), "/projects/proj-9/scans/scan-42/summary");
        assert_eq!(remote.status(), 500);
        assert_eq!(remote.body(), Some("oops"));
        assert_eq!(remote.request().operation(), Operation::GetSummary);
        assert_eq!(remote.request().scan_id(), Some("scan-42"));
    }

    #[test]
    fn check_response_passes_2xx() {
        for status in [200, 201, 202, 204] {
            check_response(request(), status, None, None).unwrap();
        }
    }

    #[test]
    fn check_response_classifies_failures() {
        let err = check_response(request(), 401, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
    }

    #[test]
    fn project_request_display_has_no_scan_id() {
        let ctx = RequestContext::for_project(
            Operation::CreateScan,
            "proj-1",
            Method::Post,
            "/projects/proj-1/scans",
        );
        assert_eq!(ctx.to_string(), "create scan in project 'proj-1'");
        assert!(ctx.scan_id().is_none());
    }

    #[test]
    fn scan_request_display() {
        assert_eq!(
            request().to_string(),
            "get summary for scan 'scan-42' (project 'proj-9')"
        );
    }

    #[test]
    fn unknown_status_has_fallback_phrase() {
        assert_eq!(reason_phrase(599), "Unknown Status");
    }
}
