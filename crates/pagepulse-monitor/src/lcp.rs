//! Largest Contentful Paint 관찰자.
//!
//! 브라우저는 LCP 값을 키우기만 하므로 알림 배치마다 마지막 엔트리가 이긴다.
//! 첫 사용자 입력 또는 페이지 숨김 중 먼저 오는 쪽에서 한 번 확정한다.

use pagepulse_core::models::entry::{EntryType, PerformanceEntry};
use pagepulse_core::models::metric::{Metric, MetricName};
use pagepulse_core::models::page::PageSignal;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::observer::{ObserverContext, ObserverHandle, ReportCallback, Subscriptions};

/// LCP 누적 상태
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LcpState {
    value: Option<f64>,
    stopped: bool,
}

impl LcpState {
    /// 알림 배치 반영 (마지막 LCP 엔트리 채택)
    pub fn record_batch(&mut self, entries: &[PerformanceEntry]) {
        if self.stopped {
            return;
        }
        let last = entries.iter().rev().find_map(|entry| match entry {
            PerformanceEntry::LargestContentfulPaint(lcp) => Some(lcp.start_time),
            _ => None,
        });
        if let Some(start_time) = last {
            self.value = Some(start_time.max(0.0));
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// 관찰 종료. 처음 종료할 때만 마지막 값을 돌려준다.
    pub fn finalize(&mut self) -> Option<f64> {
        if self.stopped {
            return None;
        }
        self.stopped = true;
        self.value
    }
}

fn is_finalizing_signal(signal: &PageSignal) -> bool {
    matches!(signal, PageSignal::Input(_)) || signal.is_page_leaving()
}

/// LCP 관찰 시작
pub fn observe_lcp(ctx: &ObserverContext, report: ReportCallback) -> ObserverHandle {
    if !ctx.entries.supports(EntryType::LargestContentfulPaint) {
        debug!("largest-contentful-paint 미지원 — LCP 관찰 생략");
        return ObserverHandle::noop();
    }

    let state = Arc::new(Mutex::new(LcpState::default()));
    let subs = Subscriptions::new(ctx);

    let finish = {
        let state = state.clone();
        let subs = subs.clone();
        let clock = ctx.clock.clone();
        Arc::new(move || {
            let finalized = state.lock().finalize();
            if let Some(value) = finalized {
                debug!("LCP 확정: {value:.1}ms");
                report(Metric::new(MetricName::Lcp, value, None, clock.now()));
            }
            subs.close();
        })
    };

    let entry_state = state.clone();
    let id = ctx.entries.subscribe(
        EntryType::LargestContentfulPaint,
        Arc::new(move |entries: &[PerformanceEntry]| entry_state.lock().record_batch(entries)),
    );
    subs.add_entry(id);

    let on_signal = finish.clone();
    let id = ctx.page.subscribe(Arc::new(move |signal: &PageSignal| {
        if is_finalizing_signal(signal) {
            on_signal();
        }
    }));
    subs.add_page(id);

    ObserverHandle::new(move || finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::PageSignalHub;
    use pagepulse_core::models::page::{InputKind, Visibility};
    use pagepulse_core::ports::clock::ManualClock;

    fn setup() -> (Arc<PageSignalHub>, ObserverContext, Arc<Mutex<Vec<Metric>>>, ReportCallback) {
        let hub = Arc::new(PageSignalHub::new());
        let ctx =
            ObserverContext::new(hub.clone(), hub.clone(), Arc::new(ManualClock::at_millis(0)));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let report: ReportCallback = Arc::new(move |m: Metric| sink.lock().push(m));
        (hub, ctx, reports, report)
    }

    #[test]
    fn last_entry_in_batch_wins() {
        let mut state = LcpState::default();
        state.record_batch(&[
            PerformanceEntry::largest_paint(800.0),
            PerformanceEntry::largest_paint(1_400.0),
        ]);
        state.record_batch(&[PerformanceEntry::largest_paint(2_100.0)]);
        assert_eq!(state.value(), Some(2_100.0));
    }

    #[test]
    fn input_finalizes_once() {
        let (hub, ctx, reports, report) = setup();
        let _handle = observe_lcp(&ctx, report);

        hub.push_entry(PerformanceEntry::largest_paint(1_000.0));
        hub.push_entry(PerformanceEntry::largest_paint(1_900.0));
        hub.dispatch(PageSignal::Input(InputKind::KeyDown));
        // 입력 이후 엔트리는 무시
        hub.push_entry(PerformanceEntry::largest_paint(5_000.0));
        hub.dispatch(PageSignal::Input(InputKind::Click));
        hub.dispatch(PageSignal::VisibilityChange(Visibility::Hidden));

        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].value, 1_900.0);
        assert_eq!(hub.page_subscriber_count(), 0);
    }

    #[test]
    fn hidden_finalizes_when_no_input() {
        let (hub, ctx, reports, report) = setup();
        let mut handle = observe_lcp(&ctx, report);

        hub.push_entry(PerformanceEntry::largest_paint(3_200.0));
        hub.dispatch(PageSignal::VisibilityChange(Visibility::Hidden));
        handle.teardown();

        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].value, 3_200.0);
    }

    #[test]
    fn teardown_reports_last_known_value() {
        let (hub, ctx, reports, report) = setup();
        // 구독 전에 발생한 엔트리도 버퍼에서 재생된다
        hub.push_entry(PerformanceEntry::largest_paint(1_250.0));
        let mut handle = observe_lcp(&ctx, report);

        handle.teardown();
        assert_eq!(reports.lock().len(), 1);
        assert_eq!(reports.lock()[0].value, 1_250.0);
    }

    #[test]
    fn teardown_without_entries_reports_nothing() {
        let (_hub, ctx, reports, report) = setup();
        let mut handle = observe_lcp(&ctx, report);
        handle.teardown();
        assert!(reports.lock().is_empty());
    }
}
