//! 단발성 관찰자: FCP, FID, TTFB.
//!
//! 첫 유효 엔트리에서 즉시 보고하고 구독을 해지한다. 이후 엔트리는 처리하지 않는다.

use pagepulse_core::models::entry::{EntryType, PerformanceEntry};
use pagepulse_core::models::metric::{Metric, MetricName};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::observer::{ObserverContext, ObserverHandle, ReportCallback, Subscriptions};

/// 엔트리에서 지표 값을 뽑는 함수 (유효하지 않으면 None)
type Extractor = fn(&PerformanceEntry) -> Option<f64>;

fn first_contentful_paint(entry: &PerformanceEntry) -> Option<f64> {
    match entry {
        PerformanceEntry::Paint(paint) if paint.name == "first-contentful-paint" => {
            Some(paint.start_time.max(0.0))
        }
        _ => None,
    }
}

fn first_input_delay(entry: &PerformanceEntry) -> Option<f64> {
    match entry {
        PerformanceEntry::FirstInput(input) => {
            Some((input.processing_start - input.start_time).max(0.0))
        }
        _ => None,
    }
}

/// back/forward 캐시 복원 시간은 서버 지연에서 제외한다
fn time_to_first_byte(entry: &PerformanceEntry) -> Option<f64> {
    match entry {
        PerformanceEntry::Navigation(nav) => {
            Some((nav.response_start - nav.activation_start).max(0.0))
        }
        _ => None,
    }
}

fn observe_single_shot(
    ctx: &ObserverContext,
    name: MetricName,
    entry_type: EntryType,
    extract: Extractor,
    report: ReportCallback,
) -> ObserverHandle {
    if !ctx.entries.supports(entry_type) {
        debug!("{entry_type} 미지원 — {name} 관찰 생략");
        return ObserverHandle::noop();
    }

    let done = Arc::new(AtomicBool::new(false));
    let subs = Subscriptions::new(ctx);

    let handler_done = done.clone();
    let handler_subs = subs.clone();
    let clock = ctx.clock.clone();
    let id = ctx.entries.subscribe(
        entry_type,
        Arc::new(move |entries: &[PerformanceEntry]| {
            if handler_done.load(Ordering::Acquire) {
                return;
            }
            let Some(value) = entries.iter().find_map(extract) else {
                return;
            };
            if handler_done.swap(true, Ordering::AcqRel) {
                return;
            }
            debug!("{name} 확정: {value:.1}ms");
            report(Metric::new(name, value, None, clock.now()));
            handler_subs.close();
        }),
    );
    subs.add_entry(id);

    ObserverHandle::new(move || {
        done.store(true, Ordering::Release);
        subs.close();
    })
}

/// FCP 관찰 시작
pub fn observe_fcp(ctx: &ObserverContext, report: ReportCallback) -> ObserverHandle {
    observe_single_shot(
        ctx,
        MetricName::Fcp,
        EntryType::Paint,
        first_contentful_paint,
        report,
    )
}

/// FID 관찰 시작
pub fn observe_fid(ctx: &ObserverContext, report: ReportCallback) -> ObserverHandle {
    observe_single_shot(
        ctx,
        MetricName::Fid,
        EntryType::FirstInput,
        first_input_delay,
        report,
    )
}

/// TTFB 관찰 시작
pub fn observe_ttfb(ctx: &ObserverContext, report: ReportCallback) -> ObserverHandle {
    observe_single_shot(
        ctx,
        MetricName::Ttfb,
        EntryType::Navigation,
        time_to_first_byte,
        report,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::PageSignalHub;
    use pagepulse_core::models::entry::{FirstInputEntry, NavigationEntry, PaintEntry};
    use pagepulse_core::ports::clock::ManualClock;
    use parking_lot::Mutex;

    fn setup() -> (Arc<PageSignalHub>, ObserverContext, Arc<Mutex<Vec<Metric>>>, ReportCallback) {
        let hub = Arc::new(PageSignalHub::new());
        let ctx =
            ObserverContext::new(hub.clone(), hub.clone(), Arc::new(ManualClock::at_millis(0)));
        let reports = Arc::new(Mutex::new(Vec::new()));
        let sink = reports.clone();
        let report: ReportCallback = Arc::new(move |m: Metric| sink.lock().push(m));
        (hub, ctx, reports, report)
    }

    fn paint(name: &str, start_time: f64) -> PerformanceEntry {
        PerformanceEntry::Paint(PaintEntry {
            name: name.to_string(),
            start_time,
        })
    }

    #[test]
    fn fcp_ignores_first_paint_and_stops_after_report() {
        let (hub, ctx, reports, report) = setup();
        let _handle = observe_fcp(&ctx, report);

        hub.push_entries(vec![paint("first-paint", 300.0), paint("first-contentful-paint", 420.0)]);
        hub.push_entry(paint("first-contentful-paint", 999.0));

        let reports = reports.lock();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].value, 420.0);
        assert_eq!(hub.entry_subscriber_count(), 0);
    }

    #[test]
    fn fid_is_processing_delay() {
        let (hub, ctx, reports, report) = setup();
        let _handle = observe_fid(&ctx, report);

        hub.push_entry(PerformanceEntry::FirstInput(FirstInputEntry {
            name: "pointerdown".to_string(),
            start_time: 1_000.0,
            processing_start: 1_035.5,
        }));

        assert_eq!(reports.lock()[0].value, 35.5);
    }

    #[test]
    fn ttfb_excludes_activation_and_clamps() {
        let (hub, ctx, reports, report) = setup();
        hub.push_entry(PerformanceEntry::Navigation(NavigationEntry {
            response_start: 500.0,
            activation_start: 320.0,
        }));
        // 버퍼된 엔트리로 구독 직후 보고 + 즉시 해지
        let _handle = observe_ttfb(&ctx, report);

        assert_eq!(reports.lock().len(), 1);
        assert_eq!(reports.lock()[0].value, 180.0);
        assert_eq!(hub.entry_subscriber_count(), 0);

        assert_eq!(
            time_to_first_byte(&PerformanceEntry::Navigation(NavigationEntry {
                response_start: 100.0,
                activation_start: 250.0,
            })),
            Some(0.0)
        );
    }

    #[test]
    fn teardown_before_entry_reports_nothing() {
        let (hub, ctx, reports, report) = setup();
        let mut handle = observe_fcp(&ctx, report);
        handle.teardown();

        hub.push_entry(paint("first-contentful-paint", 420.0));
        assert!(reports.lock().is_empty());
    }
}
