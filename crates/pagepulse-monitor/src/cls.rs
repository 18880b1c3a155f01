//! Cumulative Layout Shift 관찰자.
//!
//! 연속된 레이아웃 이동을 세션 윈도우로 묶고, 윈도우 합계의 최댓값을 추적한다.
//! 이동마다 보고하지 않고 페이지가 숨겨지거나 떠날 때 한 번만 확정한다.

use pagepulse_core::models::entry::{EntryType, LayoutShiftEntry, PerformanceEntry};
use pagepulse_core::models::metric::{Metric, MetricName};
use pagepulse_core::models::page::PageSignal;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::observer::{ObserverContext, ObserverHandle, ReportCallback, Subscriptions};

/// 직전 이동 이후 이 간격을 넘으면 새 윈도우
pub const SESSION_GAP_MS: f64 = 1_000.0;

/// 윈도우 첫 이동 이후 이 길이를 넘으면 새 윈도우
pub const SESSION_MAX_DURATION_MS: f64 = 5_000.0;

/// CLS 누적 상태
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClsState {
    window_first: f64,
    window_last: f64,
    window_value: f64,
    /// 지금까지 본 윈도우 합계 최댓값
    session_value: f64,
    shifts: usize,
    finalized: bool,
}

impl ClsState {
    /// 이동 엔트리 반영
    pub fn record_shift(&mut self, shift: &LayoutShiftEntry) {
        if self.finalized || shift.had_recent_input {
            return;
        }

        let continues_window = self.shifts > 0
            && shift.start_time - self.window_last <= SESSION_GAP_MS
            && shift.start_time - self.window_first <= SESSION_MAX_DURATION_MS;

        if continues_window {
            self.window_value += shift.value;
        } else {
            self.window_first = shift.start_time;
            self.window_value = shift.value;
        }
        self.window_last = shift.start_time;
        self.shifts += 1;

        if self.window_value > self.session_value {
            self.session_value = self.window_value;
        }
    }

    pub fn value(&self) -> f64 {
        self.session_value
    }

    pub fn has_value(&self) -> bool {
        self.shifts > 0
    }

    /// 확정. 이미 확정됐거나 `require_value`인데 이동이 없으면 None.
    pub fn finalize(&mut self, require_value: bool) -> Option<f64> {
        if self.finalized || (require_value && !self.has_value()) {
            return None;
        }
        self.finalized = true;
        Some(self.session_value)
    }
}

/// CLS 관찰 시작
pub fn observe_cls(ctx: &ObserverContext, report: ReportCallback) -> ObserverHandle {
    if !ctx.entries.supports(EntryType::LayoutShift) {
        debug!("layout-shift 미지원 — CLS 관찰 생략");
        return ObserverHandle::noop();
    }

    let state = Arc::new(Mutex::new(ClsState::default()));
    let subs = Subscriptions::new(ctx);

    let finish = {
        let state = state.clone();
        let subs = subs.clone();
        let clock = ctx.clock.clone();
        Arc::new(move |require_value: bool| {
            let finalized = state.lock().finalize(require_value);
            if let Some(value) = finalized {
                debug!("CLS 확정: {value:.4}");
                report(Metric::new(MetricName::Cls, value, None, clock.now()));
            }
            subs.close();
        })
    };

    let entry_state = state.clone();
    let id = ctx.entries.subscribe(
        EntryType::LayoutShift,
        Arc::new(move |entries: &[PerformanceEntry]| {
            let mut state = entry_state.lock();
            for entry in entries {
                if let PerformanceEntry::LayoutShift(shift) = entry {
                    state.record_shift(shift);
                }
            }
        }),
    );
    subs.add_entry(id);

    let on_leave = finish.clone();
    let id = ctx.page.subscribe(Arc::new(move |signal: &PageSignal| {
        if signal.is_page_leaving() {
            on_leave(false);
        }
    }));
    subs.add_page(id);

    ObserverHandle::new(move || finish(true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::PageSignalHub;
    use pagepulse_core::models::page::Visibility;
    use pagepulse_core::ports::clock::ManualClock;

    fn shift(start_time: f64, value: f64) -> LayoutShiftEntry {
        LayoutShiftEntry {
            start_time,
            value,
            had_recent_input: false,
        }
    }

    fn setup() -> (Arc<PageSignalHub>, ObserverContext, Arc<Mutex<Vec<Metric>>>, ReportCallback) {
        let hub = Arc::new(PageSignalHub::new());
        let ctx = ObserverContext::new(
            hub.clone(),
            hub.clone(),
            Arc::new(ManualClock::at_millis(1_000)),
        );
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let report: ReportCallback = Arc::new(move |m: Metric| sink.lock().push(m));
        (hub, ctx, reports, report)
    }

    #[test]
    fn gap_over_one_second_starts_new_window() {
        let mut state = ClsState::default();
        state.record_shift(&shift(0.0, 0.1));
        state.record_shift(&shift(1_001.0, 0.1));
        assert!((state.value() - 0.1).abs() < 1e-9);
    }

    #[test]
    fn gap_under_one_second_stays_in_window() {
        let mut state = ClsState::default();
        state.record_shift(&shift(0.0, 0.1));
        state.record_shift(&shift(999.0, 0.1));
        assert!((state.value() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn window_duration_cap() {
        // 900ms 간격으로 계속 이어져도 5초를 넘으면 새 윈도우
        let mut state = ClsState::default();
        for i in 0..7 {
            state.record_shift(&shift(f64::from(i) * 900.0, 0.01));
        }
        // 0..=4500 (6개) 한 윈도우, 5400에서 새 윈도우
        assert!((state.value() - 0.06).abs() < 1e-9);
    }

    #[test]
    fn max_window_not_sum() {
        let mut state = ClsState::default();
        state.record_shift(&shift(0.0, 0.05));
        state.record_shift(&shift(200.0, 0.03));
        state.record_shift(&shift(6_000.0, 0.2));
        assert!((state.value() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn recent_input_shifts_excluded() {
        let mut state = ClsState::default();
        state.record_shift(&LayoutShiftEntry {
            start_time: 0.0,
            value: 0.5,
            had_recent_input: true,
        });
        assert!(!state.has_value());
        assert_eq!(state.finalize(true), None);
    }

    #[test]
    fn reports_once_on_hidden() {
        let (hub, ctx, reports, report) = setup();
        let mut handle = observe_cls(&ctx, report);

        hub.push_entries(vec![
            PerformanceEntry::layout_shift(0.0, 0.05),
            PerformanceEntry::layout_shift(200.0, 0.03),
        ]);
        hub.push_entry(PerformanceEntry::layout_shift(6_000.0, 0.2));

        hub.dispatch(PageSignal::VisibilityChange(Visibility::Hidden));
        hub.dispatch(PageSignal::PageHide);
        handle.teardown();

        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert!((reports[0].value - 0.2).abs() < 1e-9);
        assert_eq!(reports[0].delta, 0.0);
        assert_eq!(reports[0].name, MetricName::Cls);
    }

    #[test]
    fn teardown_reports_unreported_value() {
        let (hub, ctx, reports, report) = setup();
        let mut handle = observe_cls(&ctx, report);
        hub.push_entry(PerformanceEntry::layout_shift(0.0, 0.3));

        handle.teardown();
        handle.teardown();

        assert_eq!(reports.lock().len(), 1);
        assert_eq!(hub.entry_subscriber_count(), 0);
        assert_eq!(hub.page_subscriber_count(), 0);
    }

    #[test]
    fn teardown_without_shifts_reports_nothing() {
        let (_hub, ctx, reports, report) = setup();
        let mut handle = observe_cls(&ctx, report);
        handle.teardown();
        assert!(reports.lock().is_empty());
    }

    #[test]
    fn unsupported_returns_noop_handle() {
        let hub = Arc::new(PageSignalHub::with_unsupported(&[EntryType::LayoutShift]));
        let ctx =
            ObserverContext::new(hub.clone(), hub.clone(), Arc::new(ManualClock::at_millis(0)));
        let mut handle = observe_cls(&ctx, Arc::new(|_: Metric| panic!("보고되면 안 됨")));
        assert!(!handle.is_active());
        handle.teardown();
        assert_eq!(hub.page_subscriber_count(), 0);
    }
}
