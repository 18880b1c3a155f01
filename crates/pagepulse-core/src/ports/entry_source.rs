//! 성능 엔트리 소스 포트.
//!
//! 엔트리 유형별 구독/해지 계약. 기능이 없는 플랫폼은 null 대신
//! 항상 비어 있는 [`EmptyEntrySource`]를 제공해 호출부를 균일하게 유지한다.

use std::sync::Arc;

use super::SubscriptionId;
use crate::models::entry::{EntryType, PerformanceEntry};

/// 엔트리 배치 핸들러. 한 번의 알림에 여러 엔트리가 올 수 있다.
pub type EntryHandler = Arc<dyn Fn(&[PerformanceEntry]) + Send + Sync>;

/// 성능 엔트리 관찰 기능
pub trait PerformanceEntrySource: Send + Sync {
    /// 해당 엔트리 유형 관찰 지원 여부
    fn supports(&self, entry_type: EntryType) -> bool;

    /// 구독. 이미 버퍼된 엔트리가 있으면 구독 직후 전달될 수 있다.
    fn subscribe(&self, entry_type: EntryType, handler: EntryHandler) -> SubscriptionId;

    /// 구독 해지 (알 수 없는 ID는 무시)
    fn unsubscribe(&self, id: SubscriptionId);
}

/// 아무 엔트리도 전달하지 않는 소스
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyEntrySource;

impl PerformanceEntrySource for EmptyEntrySource {
    fn supports(&self, _entry_type: EntryType) -> bool {
        false
    }

    fn subscribe(&self, _entry_type: EntryType, _handler: EntryHandler) -> SubscriptionId {
        SubscriptionId(0)
    }

    fn unsubscribe(&self, _id: SubscriptionId) {}
}
