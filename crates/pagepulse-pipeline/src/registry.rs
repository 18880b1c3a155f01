//! 파이프라인 레지스트리.
//!
//! 활성 파이프라인 슬롯 하나와 상태 getter 목록을 가진다. 외부 생산자는
//! 이 레지스트리에 바인딩되어 파이프라인을 직접 알지 않고도 이벤트를 넣는다.
//! 활성 파이프라인이 없으면 이벤트는 버려진다 (큐잉하지 않음).

use pagepulse_core::models::event::ObserveEvent;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// 이벤트를 받아들이는 쪽 (활성 파이프라인)
pub trait EventSink: Send + Sync {
    fn buffer_event(&self, event: ObserveEvent);
}

/// 현재 논리 상태 조회 (에러 이벤트 주석용). None이면 생략.
pub type StateGetter = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// 레지스트리 등록 토큰
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistrationToken(u64);

struct ActivePipeline {
    token: RegistrationToken,
    sink: Weak<dyn EventSink>,
}

/// 활성 파이프라인 + 상태 getter 레지스트리
#[derive(Default)]
pub struct PipelineRegistry {
    next_token: AtomicU64,
    active: Mutex<Option<ActivePipeline>>,
    getters: Mutex<BTreeMap<RegistrationToken, (String, StateGetter)>>,
}

impl PipelineRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn issue(&self) -> RegistrationToken {
        RegistrationToken(self.next_token.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// 활성 파이프라인 교체. 이전 파이프라인의 버퍼는 건드리지 않는다.
    pub fn register(&self, sink: Weak<dyn EventSink>) -> RegistrationToken {
        let token = self.issue();
        let previous = self.active.lock().replace(ActivePipeline { token, sink });
        if previous.is_some() {
            debug!("활성 파이프라인 교체 (이전 등록 해제 없이)");
        }
        token
    }

    /// 토큰이 현재 등록과 같을 때만 슬롯을 비운다
    pub fn unregister(&self, token: RegistrationToken) -> bool {
        let mut active = self.active.lock();
        if active.as_ref().is_some_and(|a| a.token == token) {
            *active = None;
            return true;
        }
        false
    }

    pub fn has_active(&self) -> bool {
        self.current().is_some()
    }

    fn current(&self) -> Option<Arc<dyn EventSink>> {
        self.active.lock().as_ref().and_then(|a| a.sink.upgrade())
    }

    /// 활성 파이프라인으로 이벤트 전달. 없으면 버리고 false.
    pub fn emit(&self, event: ObserveEvent) -> bool {
        match self.current() {
            Some(sink) => {
                sink.buffer_event(event);
                true
            }
            None => {
                debug!("활성 파이프라인 없음 — {} 이벤트 폐기", event.type_name());
                false
            }
        }
    }

    /// 상태 getter 등록
    pub fn register_state_getter(&self, name: &str, getter: StateGetter) -> RegistrationToken {
        let token = self.issue();
        self.getters
            .lock()
            .insert(token, (name.to_string(), getter));
        token
    }

    pub fn deregister_state_getter(&self, token: RegistrationToken) {
        self.getters.lock().remove(&token);
    }

    /// 등록된 모든 getter의 현재 상태 (이름 → 상태)
    pub fn state_snapshot(&self) -> BTreeMap<String, String> {
        let getters: Vec<(String, StateGetter)> = self.getters.lock().values().cloned().collect();
        getters
            .into_iter()
            .filter_map(|(name, getter)| getter().map(|state| (name, state)))
            .collect()
    }
}
