//! # pagepulse-network
//!
//! 전송 어댑터.
//! 배치 한 건을 최선형으로 전달 시도하는 세 가지 전략과 재시도 데코레이터를 제공한다.
//! 모든 실패는 에러 콜백으로만 보고되며 코어 전략은 재시도하지 않는다.
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! use pagepulse_network::hybrid::HybridTransport;
//!
//! let transport = HybridTransport::for_endpoint("https://collect.example.com/v1", page, None)?;
//! ```

pub mod beacon;
pub mod fetch;
pub mod hybrid;
pub mod retry;

pub use beacon::{BeaconTransport, HttpBeacon};
pub use fetch::FetchTransport;
pub use hybrid::HybridTransport;
pub use retry::RetryTransport;

#[cfg(test)]
pub(crate) mod testing {
    use async_trait::async_trait;
    use pagepulse_core::error::CoreError;
    use pagepulse_core::models::event::ObserveEvent;
    use pagepulse_core::ports::transport::Transport;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// 호출을 기록하고 앞의 `fail_until`회는 실패하는 전송
    #[derive(Default)]
    pub struct RecordingTransport {
        pub batches: Mutex<Vec<Vec<ObserveEvent>>>,
        pub calls: AtomicU32,
        pub fail_until: u32,
        pub torn_down: std::sync::atomic::AtomicBool,
    }

    impl RecordingTransport {
        pub fn failing(fail_until: u32) -> Self {
            Self {
                fail_until,
                ..Self::default()
            }
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, events: &[ObserveEvent]) -> Result<(), CoreError> {
            let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
            if call <= self.fail_until {
                return Err(CoreError::Network("일시적 실패".to_string()));
            }
            self.batches.lock().push(events.to_vec());
            Ok(())
        }

        fn teardown(&self) {
            self.torn_down.store(true, Ordering::Relaxed);
        }
    }

    pub fn sample_events(count: usize) -> Vec<ObserveEvent> {
        let ts = chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap_or_default();
        (0..count)
            .map(|i| ObserveEvent::custom(&format!("metric_{i:03}"), i as f64, ts))
            .collect()
    }
}
