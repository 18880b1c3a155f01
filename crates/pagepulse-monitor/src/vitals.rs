//! 선택된 Web Vitals 관찰자 일괄 시작.

use pagepulse_core::config::VitalsSelection;
use pagepulse_core::models::metric::MetricName;

use crate::cls::observe_cls;
use crate::inp::observe_inp;
use crate::lcp::observe_lcp;
use crate::observer::{ObserverContext, ObserverHandle, ReportCallback};
use crate::single_shot::{observe_fcp, observe_fid, observe_ttfb};

/// 이름에 해당하는 관찰자 시작
pub fn observe_metric(
    name: MetricName,
    ctx: &ObserverContext,
    report: ReportCallback,
) -> ObserverHandle {
    match name {
        MetricName::Cls => observe_cls(ctx, report),
        MetricName::Lcp => observe_lcp(ctx, report),
        MetricName::Inp => observe_inp(ctx, report),
        MetricName::Fcp => observe_fcp(ctx, report),
        MetricName::Fid => observe_fid(ctx, report),
        MetricName::Ttfb => observe_ttfb(ctx, report),
    }
}

/// 선택된 관찰자를 모두 시작하고 해제 핸들 목록 반환
pub fn start_vitals(
    selection: &VitalsSelection,
    ctx: &ObserverContext,
    report: ReportCallback,
) -> Vec<ObserverHandle> {
    MetricName::ALL
        .into_iter()
        .filter(|name| selection.includes(*name))
        .map(|name| observe_metric(name, ctx, report.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::PageSignalHub;
    use pagepulse_core::models::entry::{EntryType, PerformanceEntry};
    use pagepulse_core::models::metric::Metric;
    use pagepulse_core::models::page::{PageSignal, Visibility};
    use pagepulse_core::ports::clock::ManualClock;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn selection_limits_observers() {
        let hub = Arc::new(PageSignalHub::new());
        let ctx =
            ObserverContext::new(hub.clone(), hub.clone(), Arc::new(ManualClock::at_millis(0)));
        let handles = start_vitals(
            &VitalsSelection::Only(vec![MetricName::Cls, MetricName::Ttfb]),
            &ctx,
            Arc::new(|_: Metric| {}),
        );
        assert_eq!(handles.len(), 2);
        assert_eq!(hub.entry_subscriber_count(), 2);
    }

    #[test]
    fn disabled_starts_nothing() {
        let hub = Arc::new(PageSignalHub::new());
        let ctx =
            ObserverContext::new(hub.clone(), hub.clone(), Arc::new(ManualClock::at_millis(0)));
        let handles =
            start_vitals(&VitalsSelection::Enabled(false), &ctx, Arc::new(|_: Metric| {}));
        assert!(handles.is_empty());
    }

    #[test]
    fn finalizing_metrics_report_on_hidden() {
        let hub = Arc::new(PageSignalHub::with_unsupported(&[EntryType::FirstInput]));
        let ctx =
            ObserverContext::new(hub.clone(), hub.clone(), Arc::new(ManualClock::at_millis(0)));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let mut handles = start_vitals(
            &VitalsSelection::Enabled(true),
            &ctx,
            Arc::new(move |m: Metric| sink.lock().push(m.name)),
        );
        assert_eq!(handles.iter().filter(|h| h.is_active()).count(), 5);

        hub.push_entries(vec![
            PerformanceEntry::layout_shift(10.0, 0.01),
            PerformanceEntry::largest_paint(1_200.0),
            PerformanceEntry::interaction("click", 3, 64.0),
        ]);
        hub.dispatch(PageSignal::VisibilityChange(Visibility::Hidden));
        for handle in &mut handles {
            handle.teardown();
        }

        let names = reports.lock().clone();
        assert_eq!(names, vec![MetricName::Cls, MetricName::Lcp, MetricName::Inp]);
    }
}
