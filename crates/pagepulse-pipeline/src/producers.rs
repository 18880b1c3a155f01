//! 외부 이벤트 생산자.
//!
//! 모두 `PipelineRegistry`에 바인딩되어 생성된다. 활성 파이프라인이 없으면
//! `emit` 계열 메서드는 이벤트를 버리고 false를 돌려준다.

use pagepulse_core::models::event::{
    CustomMetricEvent, IdentifyEvent, ObserveEvent, TransitionEvent,
};
use pagepulse_core::ports::clock::{Clock, SystemClock};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::registry::{PipelineRegistry, RegistrationToken};

/// 사용자 정의 지표 생산자
pub struct CustomMetricEmitter {
    registry: Arc<PipelineRegistry>,
    clock: Arc<dyn Clock>,
}

impl CustomMetricEmitter {
    pub fn new(registry: Arc<PipelineRegistry>) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: Arc<PipelineRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    pub fn emit(&self, name: &str, value: f64) -> bool {
        self.emit_tagged(name, value, BTreeMap::new())
    }

    pub fn emit_tagged(&self, name: &str, value: f64, tags: BTreeMap<String, String>) -> bool {
        self.registry
            .emit(ObserveEvent::CustomMetric(CustomMetricEvent {
                name: name.to_string(),
                value,
                tags,
                timestamp: self.clock.now(),
                session_id: None,
            }))
    }
}

/// 상태 기계 전이 생산자
///
/// 마지막으로 진입한 상태를 상태 getter로 등록해 에러 이벤트에 주석으로 남긴다.
/// drop 시 getter를 해제한다.
pub struct TransitionEmitter {
    registry: Arc<PipelineRegistry>,
    clock: Arc<dyn Clock>,
    machine_id: String,
    state: Arc<Mutex<Option<String>>>,
    getter_token: RegistrationToken,
}

impl TransitionEmitter {
    pub fn new(registry: Arc<PipelineRegistry>, machine_id: &str) -> Self {
        Self::with_clock(registry, machine_id, Arc::new(SystemClock))
    }

    pub fn with_clock(
        registry: Arc<PipelineRegistry>,
        machine_id: &str,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let state = Arc::new(Mutex::new(None));
        let getter_state = state.clone();
        let getter_token = registry.register_state_getter(
            machine_id,
            Arc::new(move || getter_state.lock().clone()),
        );
        Self {
            registry,
            clock,
            machine_id: machine_id.to_string(),
            state,
            getter_token,
        }
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    /// 마지막으로 진입한 상태
    pub fn current_state(&self) -> Option<String> {
        self.state.lock().clone()
    }

    /// 전이 기록. 현재 상태는 파이프라인 유무와 무관하게 갱신된다.
    pub fn transition(&self, from: &str, to: &str, event: &str) -> bool {
        *self.state.lock() = Some(to.to_string());
        self.registry.emit(ObserveEvent::Transition(TransitionEvent {
            machine_id: self.machine_id.clone(),
            from: from.to_string(),
            to: to.to_string(),
            event: event.to_string(),
            timestamp: self.clock.now(),
            session_id: None,
        }))
    }
}

impl Drop for TransitionEmitter {
    fn drop(&mut self) {
        self.registry.deregister_state_getter(self.getter_token);
    }
}

/// 사용자 식별 생산자
pub struct IdentifyEmitter {
    registry: Arc<PipelineRegistry>,
    clock: Arc<dyn Clock>,
}

impl IdentifyEmitter {
    pub fn new(registry: Arc<PipelineRegistry>) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    pub fn with_clock(registry: Arc<PipelineRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    pub fn identify(
        &self,
        user_id: &str,
        traits: BTreeMap<String, serde_json::Value>,
    ) -> bool {
        self.registry.emit(ObserveEvent::Identify(IdentifyEvent {
            user_id: user_id.to_string(),
            traits,
            timestamp: self.clock.now(),
            session_id: None,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::EventSink;
    use pagepulse_core::ports::clock::ManualClock;
    use std::sync::Weak;

    #[derive(Default)]
    struct CollectingSink {
        events: Mutex<Vec<ObserveEvent>>,
    }

    impl EventSink for CollectingSink {
        fn buffer_event(&self, event: ObserveEvent) {
            self.events.lock().push(event);
        }
    }

    fn bind(registry: &PipelineRegistry) -> Arc<CollectingSink> {
        let sink = Arc::new(CollectingSink::default());
        let dyn_sink: Arc<dyn EventSink> = sink.clone();
        let weak: Weak<dyn EventSink> = Arc::downgrade(&dyn_sink);
        registry.register(weak);
        sink
    }

    #[test]
    fn custom_metric_carries_tags_and_time() {
        let registry = Arc::new(PipelineRegistry::new());
        let sink = bind(&registry);
        let emitter =
            CustomMetricEmitter::with_clock(registry, Arc::new(ManualClock::at_millis(42_000)));

        let tags = BTreeMap::from([("route".to_string(), "/cart".to_string())]);
        assert!(emitter.emit_tagged("cart_render", 18.5, tags));

        let events = sink.events.lock();
        let ObserveEvent::CustomMetric(event) = &events[0] else {
            panic!("custom 이벤트가 아님");
        };
        assert_eq!(event.name, "cart_render");
        assert_eq!(event.tags["route"], "/cart");
        assert_eq!(event.timestamp.timestamp_millis(), 42_000);
    }

    #[test]
    fn transition_tracks_state_for_error_annotation() {
        let registry = Arc::new(PipelineRegistry::new());
        let emitter = TransitionEmitter::new(registry.clone(), "checkout");

        // 파이프라인이 없어도 상태는 갱신
        assert!(!emitter.transition("cart", "payment", "SUBMIT"));
        assert_eq!(emitter.current_state().as_deref(), Some("payment"));
        assert_eq!(registry.state_snapshot()["checkout"], "payment");

        drop(emitter);
        assert!(registry.state_snapshot().is_empty());
    }

    #[test]
    fn identify_routes_through_registry() {
        let registry = Arc::new(PipelineRegistry::new());
        let sink = bind(&registry);
        let emitter = IdentifyEmitter::new(registry);

        let traits = BTreeMap::from([("plan".to_string(), serde_json::json!("pro"))]);
        assert!(emitter.identify("user-7", traits));
        assert_eq!(sink.events.lock()[0].type_name(), "identify");
    }
}
