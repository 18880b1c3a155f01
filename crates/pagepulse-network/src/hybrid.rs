//! 하이브리드 전송.
//!
//! 페이지가 보이는 동안은 즉시 요청, 떠나는 중(hidden/pagehide)이면 비콘으로 보낸다.
//! `send_now`는 호출 시점의 플래그로 전략을 고른다. 이탈 중이면 비콘 작업을
//! 호출 스택 안에서 끝내거나 (비동기 비콘이면) 그 자리에서 띄운다.

use async_trait::async_trait;
use pagepulse_core::error::CoreError;
use pagepulse_core::models::event::ObserveEvent;
use pagepulse_core::models::page::{PageSignal, Visibility};
use pagepulse_core::ports::page_events::PageEvents;
use pagepulse_core::ports::transport::{ErrorCallback, Transport};
use pagepulse_core::ports::SubscriptionId;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::debug;

use crate::beacon::{BeaconTransport, HttpBeacon};
use crate::fetch::FetchTransport;

/// 페이지 상태에 따라 전략을 고르는 전송
pub struct HybridTransport {
    immediate: Arc<dyn Transport>,
    beacon: Arc<dyn Transport>,
    leaving: Arc<AtomicBool>,
    page: Arc<dyn PageEvents>,
    subscription: Mutex<Option<SubscriptionId>>,
    /// 생성 시점의 런타임 (런타임 밖 스레드에서 온 언로드 신호용)
    runtime: Option<Handle>,
}

impl HybridTransport {
    /// 두 전략을 묶고 페이지 라이프사이클 리스너 등록
    pub fn new(
        immediate: Arc<dyn Transport>,
        beacon: Arc<dyn Transport>,
        page: Arc<dyn PageEvents>,
    ) -> Self {
        let leaving = Arc::new(AtomicBool::new(false));
        let flag = leaving.clone();
        let id = page.subscribe(Arc::new(move |signal: &PageSignal| match signal {
            PageSignal::VisibilityChange(Visibility::Hidden) | PageSignal::PageHide => {
                flag.store(true, Ordering::Release);
            }
            PageSignal::VisibilityChange(Visibility::Visible) => {
                flag.store(false, Ordering::Release);
            }
            _ => {}
        }));

        Self {
            immediate,
            beacon,
            leaving,
            page,
            subscription: Mutex::new(Some(id)),
            runtime: Handle::try_current().ok(),
        }
    }

    /// 엔드포인트 하나로 즉시 요청 + HTTP 비콘 구성
    pub fn for_endpoint(
        endpoint: &str,
        page: Arc<dyn PageEvents>,
        on_error: Option<ErrorCallback>,
    ) -> Result<Self, CoreError> {
        let immediate = FetchTransport::new(endpoint)?.with_error_callback(on_error.clone());
        let beacon = BeaconTransport::new(Arc::new(HttpBeacon::new()?), endpoint)
            .with_error_callback(on_error);
        Ok(Self::new(Arc::new(immediate), Arc::new(beacon), page))
    }

    pub fn is_page_leaving(&self) -> bool {
        self.leaving.load(Ordering::Acquire)
    }
}

#[async_trait]
impl Transport for HybridTransport {
    async fn send(&self, events: &[ObserveEvent]) -> Result<(), CoreError> {
        if self.is_page_leaving() {
            debug!("페이지 이탈 중 — 비콘 전송");
            self.beacon.send(events).await
        } else {
            self.immediate.send(events).await
        }
    }

    fn send_now(&self, events: &[ObserveEvent]) -> Option<Result<(), CoreError>> {
        if !self.is_page_leaving() {
            return None;
        }
        if let Some(result) = self.beacon.send_now(events) {
            debug!("페이지 이탈 중 — 비콘 즉시 큐잉: {}개 이벤트", events.len());
            return Some(result);
        }

        let runtime = Handle::try_current().ok().or_else(|| self.runtime.clone())?;
        let beacon = self.beacon.clone();
        let events = events.to_vec();
        debug!("페이지 이탈 중 — 비콘 전송 시작: {}개 이벤트", events.len());
        runtime.spawn(async move {
            if let Err(e) = beacon.send(&events).await {
                debug!("비콘 전달 실패 (에러 콜백으로 보고됨): {e}");
            }
        });
        Some(Ok(()))
    }

    fn teardown(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.page.unsubscribe(id);
        }
        self.immediate.teardown();
        self.beacon.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_events, RecordingTransport};
    use pagepulse_monitor::PageSignalHub;

    fn setup() -> (
        Arc<PageSignalHub>,
        Arc<RecordingTransport>,
        Arc<RecordingTransport>,
        HybridTransport,
    ) {
        let hub = Arc::new(PageSignalHub::new());
        let immediate = Arc::new(RecordingTransport::default());
        let beacon = Arc::new(RecordingTransport::default());
        let transport = HybridTransport::new(immediate.clone(), beacon.clone(), hub.clone());
        (hub, immediate, beacon, transport)
    }

    #[tokio::test]
    async fn visible_page_uses_immediate() {
        let (_hub, immediate, beacon, transport) = setup();
        transport.send(&sample_events(2)).await.unwrap();

        assert_eq!(immediate.batches.lock().len(), 1);
        assert!(beacon.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn hidden_page_switches_to_beacon_and_back() {
        let (hub, immediate, beacon, transport) = setup();

        hub.dispatch(PageSignal::VisibilityChange(Visibility::Hidden));
        assert!(transport.is_page_leaving());
        transport.send(&sample_events(1)).await.unwrap();

        hub.dispatch(PageSignal::VisibilityChange(Visibility::Visible));
        transport.send(&sample_events(1)).await.unwrap();

        hub.dispatch(PageSignal::PageHide);
        transport.send(&sample_events(1)).await.unwrap();

        assert_eq!(beacon.batches.lock().len(), 2);
        assert_eq!(immediate.batches.lock().len(), 1);
    }

    #[tokio::test]
    async fn teardown_detaches_listener_but_keeps_sending() {
        let (hub, immediate, beacon, transport) = setup();
        assert_eq!(hub.page_subscriber_count(), 1);

        transport.teardown();
        transport.teardown();
        assert_eq!(hub.page_subscriber_count(), 0);
        assert!(immediate.torn_down.load(Ordering::Relaxed));
        assert!(beacon.torn_down.load(Ordering::Relaxed));

        hub.dispatch(PageSignal::PageHide);
        assert!(!transport.is_page_leaving());
        transport.send(&sample_events(1)).await.unwrap();
        assert_eq!(immediate.batches.lock().len(), 1);
    }

    #[derive(Default)]
    struct QueuedBeacons {
        payloads: Mutex<Vec<Vec<u8>>>,
    }

    impl pagepulse_core::ports::transport::BeaconSink for QueuedBeacons {
        fn send_beacon(&self, _url: &str, payload: Vec<u8>) -> bool {
            self.payloads.lock().push(payload);
            true
        }
    }

    #[tokio::test]
    async fn visible_page_defers_to_async_send() {
        let (_hub, immediate, beacon, transport) = setup();
        assert!(transport.send_now(&sample_events(1)).is_none());
        assert!(immediate.batches.lock().is_empty());
        assert!(beacon.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn leaving_page_queues_beacon_in_call_stack() {
        let hub = Arc::new(PageSignalHub::new());
        let sink = Arc::new(QueuedBeacons::default());
        let immediate = Arc::new(RecordingTransport::default());
        let beacon = BeaconTransport::new(sink.clone(), "https://collect.example.com");
        let transport = HybridTransport::new(immediate.clone(), Arc::new(beacon), hub.clone());

        hub.dispatch(PageSignal::PageHide);
        assert!(matches!(transport.send_now(&sample_events(2)), Some(Ok(()))));
        assert_eq!(sink.payloads.lock().len(), 1);

        // 돌아와도 이미 고른 전략은 바뀌지 않는다
        hub.dispatch(PageSignal::VisibilityChange(Visibility::Visible));
        tokio::task::yield_now().await;
        assert!(immediate.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn async_beacon_strategy_is_fixed_at_trigger_time() {
        let (hub, immediate, beacon, transport) = setup();

        hub.dispatch(PageSignal::VisibilityChange(Visibility::Hidden));
        assert!(transport.send_now(&sample_events(1)).is_some());
        hub.dispatch(PageSignal::VisibilityChange(Visibility::Visible));

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(beacon.batches.lock().len(), 1);
        assert!(immediate.batches.lock().is_empty());
    }

    #[tokio::test]
    async fn inner_failure_propagates() {
        let hub = Arc::new(PageSignalHub::new());
        let immediate = Arc::new(RecordingTransport::failing(1));
        let beacon = Arc::new(RecordingTransport::default());
        let transport = HybridTransport::new(immediate, beacon, hub);

        assert!(transport.send(&sample_events(1)).await.is_err());
    }
}
