//! 타이머 추상화 -- 폴링 간격과 데드라인 대기
//!
//! [`Scheduler`]는 호출자가 소유하고 여러 동시 대기 작업이 공유하는 타이머 기능입니다.
//! 폴링 사이의 대기는 워커 스레드를 막지 않는 future로 표현되며,
//! future를 drop하면 예약된 타이머도 함께 해제됩니다.

use std::future::Future;
use std::time::Duration;

/// 비동기 타이머 기능
///
/// `Send + Sync + 'static`이므로 `Arc`로 감싸 여러 대기 작업에서 공유할 수 있습니다.
pub trait Scheduler: Send + Sync + 'static {
    /// `duration` 후에 완료되는 future를 반환합니다.
    ///
    /// 반환된 future를 drop하면 타이머가 취소됩니다.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// tokio 타이머 기반 스케줄러
///
/// `tokio::time::pause()` 상태에서는 가상 시계를 따르므로 테스트에서
/// `tokio::time::advance`로 시간을 진행시킬 수 있습니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_follows_paused_clock() {
        let scheduler = TokioScheduler;
        let start = tokio::time::Instant::now();
        scheduler.sleep(Duration::from_secs(30)).await;
        assert_eq!(start.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sleeps_share_one_scheduler() {
        let scheduler = std::sync::Arc::new(TokioScheduler);
        let start = tokio::time::Instant::now();

        let a = {
            let s = std::sync::Arc::clone(&scheduler);
            tokio::spawn(async move { s.sleep(Duration::from_secs(5)).await })
        };
        let b = {
            let s = std::sync::Arc::clone(&scheduler);
            tokio::spawn(async move { s.sleep(Duration::from_secs(10)).await })
        };
        a.await.unwrap();
        b.await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[test]
    fn scheduler_is_send_sync() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<TokioScheduler>();
    }
}
