#![doc = include_str!("../README.md")]

pub mod client;
pub mod config;
pub mod error;
pub mod handoff;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod status;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    ConfigError, ErrorKind, Operation, RemoteError, RemoteErrorKind, ScanError, ScanwatchError,
};

// 설정
pub use config::ScanwatchConfig;

// 상태 머신
pub use status::{ScanStatus, UnknownStatus};

// 원격 서비스 경계
pub use client::{ReportStream, ScanClient};
pub use http::{Method, RequestContext};
pub use scheduler::{Scheduler, TokioScheduler};

// 도메인 타입
pub use handoff::ScanHandoff;
pub use types::{CompletedScan, InvalidSnapshot, ScanRef, ScanSnapshot, ScanSummary};
