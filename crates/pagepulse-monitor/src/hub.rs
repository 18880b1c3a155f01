//! 인프로세스 신호 허브.
//!
//! 호스트 바인딩(또는 테스트)이 성능 엔트리와 페이지 신호를 밀어넣으면
//! 구독자에게 등록 순서대로 전달한다. `PerformanceEntrySource`와
//! `PageEvents` 포트를 함께 구현한다.

use pagepulse_core::models::entry::{EntryType, PerformanceEntry};
use pagepulse_core::models::page::PageSignal;
use pagepulse_core::ports::entry_source::{EntryHandler, PerformanceEntrySource};
use pagepulse_core::ports::page_events::{PageEvents, PageHandler};
use pagepulse_core::ports::SubscriptionId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// 유형별 버퍼 보관 상한 (늦은 구독자 재생용)
const MAX_BUFFERED_ENTRIES: usize = 150;

/// 엔트리 소스 + 페이지 이벤트 허브
///
/// 콜백 호출 중에는 어떤 락도 잡지 않는다. 핸들러 안에서 구독/해지가 가능하다.
pub struct PageSignalHub {
    next_id: AtomicU64,
    unsupported: HashSet<EntryType>,
    entry_subs: Mutex<BTreeMap<SubscriptionId, (EntryType, EntryHandler)>>,
    page_subs: Mutex<BTreeMap<SubscriptionId, PageHandler>>,
    buffered: Mutex<HashMap<EntryType, Vec<PerformanceEntry>>>,
}

impl PageSignalHub {
    /// 모든 엔트리 유형을 지원하는 허브
    pub fn new() -> Self {
        Self::with_unsupported(&[])
    }

    /// 일부 엔트리 유형을 지원하지 않는 허브 (구형 브라우저 흉내)
    pub fn with_unsupported(types: &[EntryType]) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            unsupported: types.iter().copied().collect(),
            entry_subs: Mutex::new(BTreeMap::new()),
            page_subs: Mutex::new(BTreeMap::new()),
            buffered: Mutex::new(HashMap::new()),
        }
    }

    fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// 엔트리 배치 전달 (한 번의 관찰 알림)
    pub fn push_entries(&self, entries: Vec<PerformanceEntry>) {
        let mut by_type: BTreeMap<EntryType, Vec<PerformanceEntry>> = BTreeMap::new();
        for entry in entries {
            if self.unsupported.contains(&entry.entry_type()) {
                continue;
            }
            by_type.entry(entry.entry_type()).or_default().push(entry);
        }

        for (entry_type, batch) in by_type {
            {
                let mut buffered = self.buffered.lock();
                let slot = buffered.entry(entry_type).or_default();
                slot.extend(batch.iter().cloned());
                if slot.len() > MAX_BUFFERED_ENTRIES {
                    let excess = slot.len() - MAX_BUFFERED_ENTRIES;
                    slot.drain(..excess);
                }
            }

            let handlers: Vec<EntryHandler> = self
                .entry_subs
                .lock()
                .values()
                .filter(|(t, _)| *t == entry_type)
                .map(|(_, h)| h.clone())
                .collect();

            debug!(
                "엔트리 {}개 전달: {entry_type} → 구독자 {}",
                batch.len(),
                handlers.len()
            );
            for handler in handlers {
                handler(&batch);
            }
        }
    }

    /// 단일 엔트리 전달
    pub fn push_entry(&self, entry: PerformanceEntry) {
        self.push_entries(vec![entry]);
    }

    /// 페이지 신호 전달 (등록 순서대로)
    pub fn dispatch(&self, signal: PageSignal) {
        let handlers: Vec<PageHandler> = self.page_subs.lock().values().cloned().collect();
        for handler in handlers {
            handler(&signal);
        }
    }

    /// 현재 엔트리 구독자 수
    pub fn entry_subscriber_count(&self) -> usize {
        self.entry_subs.lock().len()
    }

    /// 현재 페이지 신호 구독자 수
    pub fn page_subscriber_count(&self) -> usize {
        self.page_subs.lock().len()
    }
}

impl Default for PageSignalHub {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceEntrySource for PageSignalHub {
    fn supports(&self, entry_type: EntryType) -> bool {
        !self.unsupported.contains(&entry_type)
    }

    fn subscribe(&self, entry_type: EntryType, handler: EntryHandler) -> SubscriptionId {
        let id = self.allocate_id();
        self.entry_subs
            .lock()
            .insert(id, (entry_type, handler.clone()));

        // buffered 재생: 이미 발생한 엔트리를 재생
        let replay = self
            .buffered
            .lock()
            .get(&entry_type)
            .cloned()
            .unwrap_or_default();
        if !replay.is_empty() {
            handler(&replay);
        }
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.entry_subs.lock().remove(&id);
    }
}

impl PageEvents for PageSignalHub {
    fn subscribe(&self, handler: PageHandler) -> SubscriptionId {
        let id = self.allocate_id();
        self.page_subs.lock().insert(id, handler);
        id
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.page_subs.lock().remove(&id);
    }
}
