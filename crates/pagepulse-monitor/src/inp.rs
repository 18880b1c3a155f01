//! Interaction to Next Paint 관찰자.
//!
//! 상호작용 ID가 있는 이산 이벤트만 센다. pointerdown+pointerup처럼
//! 한 상호작용의 여러 단계는 첫 엔트리만 반영한다.
//! CLS와 같은 트리거(숨김, pagehide)에서 한 번 확정한다.

use pagepulse_core::models::entry::{EntryType, EventTimingEntry, PerformanceEntry};
use pagepulse_core::models::metric::{Metric, MetricName};
use pagepulse_core::models::page::PageSignal;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

use crate::observer::{ObserverContext, ObserverHandle, ReportCallback, Subscriptions};

/// 중복 제거 집합 상한 (넘으면 비운다)
pub const MAX_TRACKED_INTERACTIONS: usize = 1_000;

/// INP 누적 상태
#[derive(Debug, Clone, Default)]
pub struct InpState {
    seen: HashSet<u64>,
    max_duration: Option<f64>,
    finalized: bool,
}

impl InpState {
    /// 이벤트 타이밍 엔트리 반영
    pub fn record(&mut self, entry: &EventTimingEntry) {
        if self.finalized || entry.interaction_id == 0 {
            return;
        }
        if self.seen.contains(&entry.interaction_id) {
            return;
        }
        if self.seen.len() >= MAX_TRACKED_INTERACTIONS {
            self.seen.clear();
        }
        self.seen.insert(entry.interaction_id);

        let duration = entry.duration.max(0.0);
        self.max_duration = Some(match self.max_duration {
            Some(current) => current.max(duration),
            None => duration,
        });
    }

    pub fn value(&self) -> Option<f64> {
        self.max_duration
    }

    /// 추적 중인 상호작용 ID 수
    pub fn tracked(&self) -> usize {
        self.seen.len()
    }

    pub fn finalize(&mut self) -> Option<f64> {
        if self.finalized {
            return None;
        }
        self.finalized = true;
        self.max_duration
    }
}

/// INP 관찰 시작
pub fn observe_inp(ctx: &ObserverContext, report: ReportCallback) -> ObserverHandle {
    if !ctx.entries.supports(EntryType::Event) {
        debug!("event timing 미지원 — INP 관찰 생략");
        return ObserverHandle::noop();
    }

    let state = Arc::new(Mutex::new(InpState::default()));
    let subs = Subscriptions::new(ctx);

    let finish = {
        let state = state.clone();
        let subs = subs.clone();
        let clock = ctx.clock.clone();
        Arc::new(move || {
            let finalized = state.lock().finalize();
            if let Some(value) = finalized {
                debug!("INP 확정: {value:.1}ms");
                report(Metric::new(MetricName::Inp, value, None, clock.now()));
            }
            subs.close();
        })
    };

    let entry_state = state.clone();
    let id = ctx.entries.subscribe(
        EntryType::Event,
        Arc::new(move |entries: &[PerformanceEntry]| {
            let mut state = entry_state.lock();
            for entry in entries {
                if let PerformanceEntry::Event(timing) = entry {
                    state.record(timing);
                }
            }
        }),
    );
    subs.add_entry(id);

    let on_leave = finish.clone();
    let id = ctx.page.subscribe(Arc::new(move |signal: &PageSignal| {
        if signal.is_page_leaving() {
            on_leave();
        }
    }));
    subs.add_page(id);

    ObserverHandle::new(move || finish())
}
