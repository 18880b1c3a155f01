//! 재시도 데코레이터.
//!
//! 코어 전략은 재시도하지 않는다. 필요한 호스트만 이 래퍼로 감싼다.
//! exponential backoff: 1초에서 시작해 두 배씩, 최대 30초.

use async_trait::async_trait;
use pagepulse_core::error::CoreError;
use pagepulse_core::models::event::ObserveEvent;
use pagepulse_core::ports::transport::Transport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// 실패한 전송을 backoff로 다시 시도하는 전송 래퍼
pub struct RetryTransport {
    inner: Arc<dyn Transport>,
    max_retries: u32,
    initial_delay: Duration,
}

impl RetryTransport {
    pub fn new(inner: Arc<dyn Transport>) -> Self {
        Self {
            inner,
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }
}

#[async_trait]
impl Transport for RetryTransport {
    async fn send(&self, events: &[ObserveEvent]) -> Result<(), CoreError> {
        let mut retry_delay = self.initial_delay;
        let mut attempt = 0;
        loop {
            match self.inner.send(events).await {
                Ok(()) => {
                    if attempt > 0 {
                        debug!("재시도 전송 성공 (시도 {})", attempt + 1);
                    }
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    warn!(
                        "배치 전송 실패 (시도 {}/{}): {e}",
                        attempt + 1,
                        self.max_retries + 1
                    );
                    tokio::time::sleep(retry_delay).await;
                    retry_delay = (retry_delay * 2).min(MAX_DELAY);
                    attempt += 1;
                }
                Err(e) => {
                    error!("배치 전송 최종 실패: {e}");
                    return Err(e);
                }
            }
        }
    }

    /// 동기 경로(비콘 큐잉)는 전달 확인이 없으므로 재시도 없이 위임
    fn send_now(&self, events: &[ObserveEvent]) -> Option<Result<(), CoreError>> {
        self.inner.send_now(events)
    }

    fn teardown(&self) {
        self.inner.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_events, RecordingTransport};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn recovers_after_transient_failure() {
        let inner = Arc::new(RecordingTransport::failing(2));
        let transport = RetryTransport::new(inner.clone())
            .with_initial_delay(Duration::from_millis(5));

        transport.send(&sample_events(3)).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::Relaxed), 3);
        assert_eq!(inner.batches.lock().len(), 1);
        assert_eq!(inner.batches.lock()[0].len(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let inner = Arc::new(RecordingTransport::failing(u32::MAX));
        let transport = RetryTransport::new(inner.clone())
            .with_max_retries(2)
            .with_initial_delay(Duration::from_millis(5));

        let result = transport.send(&sample_events(1)).await;

        assert!(matches!(result, Err(CoreError::Network(_))));
        assert_eq!(inner.calls.load(Ordering::Relaxed), 3);
        assert!(inner.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn send_now_delegates_without_retry() {
        let inner = Arc::new(RecordingTransport::failing(u32::MAX));
        let transport = RetryTransport::new(inner.clone());

        assert!(transport.send_now(&sample_events(1)).is_none());
        assert_eq!(inner.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn teardown_delegates() {
        let inner = Arc::new(RecordingTransport::default());
        let transport = RetryTransport::new(inner.clone());
        transport.teardown();
        assert!(inner.torn_down.load(Ordering::Relaxed));
    }
}
