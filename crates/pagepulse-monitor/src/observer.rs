//! 관찰자 공통 구성요소.
//!
//! 모든 관찰자는 같은 컨텍스트(엔트리 소스, 페이지 이벤트, 시계)로 시작하고
//! 언제든 호출 가능한 해제 핸들을 돌려준다. 기능이 없으면 no-op 핸들을 준다.

use pagepulse_core::models::metric::Metric;
use pagepulse_core::ports::clock::Clock;
use pagepulse_core::ports::entry_source::PerformanceEntrySource;
use pagepulse_core::ports::page_events::PageEvents;
use pagepulse_core::ports::SubscriptionId;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// 확정 지표 보고 콜백
pub type ReportCallback = Arc<dyn Fn(Metric) + Send + Sync>;

/// 관찰자 실행 컨텍스트
#[derive(Clone)]
pub struct ObserverContext {
    pub entries: Arc<dyn PerformanceEntrySource>,
    pub page: Arc<dyn PageEvents>,
    pub clock: Arc<dyn Clock>,
}

impl ObserverContext {
    pub fn new(
        entries: Arc<dyn PerformanceEntrySource>,
        page: Arc<dyn PageEvents>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            entries,
            page,
            clock,
        }
    }
}

/// 관찰자 해제 핸들
///
/// `teardown()`은 여러 번 호출해도 안전하다. 첫 호출만 효과가 있다.
pub struct ObserverHandle {
    teardown: Option<Box<dyn FnOnce() + Send>>,
}

impl ObserverHandle {
    pub(crate) fn new<F>(teardown: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            teardown: Some(Box::new(teardown)),
        }
    }

    /// 아무 일도 하지 않는 핸들 (미지원 기능)
    pub fn noop() -> Self {
        Self { teardown: None }
    }

    pub fn teardown(&mut self) {
        if let Some(teardown) = self.teardown.take() {
            teardown();
        }
    }

    /// 아직 해제되지 않은 실제 관찰자인지
    pub fn is_active(&self) -> bool {
        self.teardown.is_some()
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

#[derive(Default)]
struct SubscriptionIds {
    closed: bool,
    entries: Vec<SubscriptionId>,
    page: Vec<SubscriptionId>,
}

/// 관찰자 하나가 가진 구독 목록
///
/// 닫힌 뒤 늦게 도착한 구독 ID는 즉시 해지한다
/// (버퍼 재생 중 관찰자가 스스로 종료하는 경우).
pub(crate) struct Subscriptions {
    entries: Arc<dyn PerformanceEntrySource>,
    page: Arc<dyn PageEvents>,
    ids: Mutex<SubscriptionIds>,
}

impl Subscriptions {
    pub(crate) fn new(ctx: &ObserverContext) -> Arc<Self> {
        Arc::new(Self {
            entries: ctx.entries.clone(),
            page: ctx.page.clone(),
            ids: Mutex::new(SubscriptionIds::default()),
        })
    }

    pub(crate) fn add_entry(&self, id: SubscriptionId) {
        let mut ids = self.ids.lock();
        if ids.closed {
            drop(ids);
            self.entries.unsubscribe(id);
        } else {
            ids.entries.push(id);
        }
    }

    pub(crate) fn add_page(&self, id: SubscriptionId) {
        let mut ids = self.ids.lock();
        if ids.closed {
            drop(ids);
            self.page.unsubscribe(id);
        } else {
            ids.page.push(id);
        }
    }

    /// 모든 구독 해지
    pub(crate) fn close(&self) {
        let (entry_ids, page_ids) = {
            let mut ids = self.ids.lock();
            ids.closed = true;
            (
                std::mem::take(&mut ids.entries),
                std::mem::take(&mut ids.page),
            )
        };
        for id in entry_ids {
            self.entries.unsubscribe(id);
        }
        for id in page_ids {
            self.page.unsubscribe(id);
        }
    }
}
