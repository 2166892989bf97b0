//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! awaiter와 결과 조회 모듈은 이 상수로 `metrics::counter!()`,
//! `metrics::histogram!()` 매크로를 호출합니다. 레코더가 설치되지 않았다면
//! 매크로는 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `scanwatch_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (completed, cancelled, failed, error, timeout)
pub const LABEL_RESULT: &str = "result";

/// 조회 종류 레이블 키 (report, summary)
pub const LABEL_KIND: &str = "kind";

/// 에러 종류 레이블 키 ([`ErrorKind::as_str`](crate::error::ErrorKind::as_str))
pub const LABEL_ERROR_KIND: &str = "error_kind";

// ─── Awaiter 메트릭 ─────────────────────────────────────────────────

/// Awaiter: 수행한 스캔 상태 조회 수 (counter)
pub const AWAITER_POLLS_TOTAL: &str = "scanwatch_awaiter_polls_total";

/// Awaiter: 종료된 대기 수 (counter, label: result)
pub const AWAITER_AWAITS_TOTAL: &str = "scanwatch_awaiter_awaits_total";

/// Awaiter: 대기 소요 시간 (histogram, 초)
pub const AWAITER_AWAIT_DURATION_SECONDS: &str = "scanwatch_awaiter_await_duration_seconds";

// ─── Retrieval 메트릭 ───────────────────────────────────────────────

/// Retrieval: 결과 조회 수 (counter, label: kind)
pub const RETRIEVAL_FETCHES_TOTAL: &str = "scanwatch_retrieval_fetches_total";

/// Retrieval: 결과 조회 실패 수 (counter, labels: kind, error_kind)
pub const RETRIEVAL_FAILURES_TOTAL: &str = "scanwatch_retrieval_failures_total";

/// Retrieval: 저장된 리포트 바이트 수 (counter)
pub const RETRIEVAL_REPORT_BYTES_TOTAL: &str = "scanwatch_retrieval_report_bytes_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        AWAITER_POLLS_TOTAL,
        "Total number of scan state polls issued by the awaiter"
    );
    describe_counter!(
        AWAITER_AWAITS_TOTAL,
        "Total number of settled awaits by result"
    );
    describe_histogram!(
        AWAITER_AWAIT_DURATION_SECONDS,
        "Time from the first poll to settlement in seconds"
    );
    describe_counter!(
        RETRIEVAL_FETCHES_TOTAL,
        "Total number of report and summary fetches"
    );
    describe_counter!(
        RETRIEVAL_FAILURES_TOTAL,
        "Total number of failed report and summary fetches"
    );
    describe_counter!(
        RETRIEVAL_REPORT_BYTES_TOTAL,
        "Total number of report bytes written to disk"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        AWAITER_POLLS_TOTAL,
        AWAITER_AWAITS_TOTAL,
        AWAITER_AWAIT_DURATION_SECONDS,
        RETRIEVAL_FETCHES_TOTAL,
        RETRIEVAL_FAILURES_TOTAL,
        RETRIEVAL_REPORT_BYTES_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_scanwatch_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("scanwatch_"),
                "Metric '{}' does not start with 'scanwatch_' prefix",
                name
            );
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_RESULT, LABEL_KIND, LABEL_ERROR_KIND] {
            assert_eq!(label.to_lowercase(), label);
        }
    }
}
