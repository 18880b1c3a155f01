//! 페이지 이벤트 포트.
//!
//! 가시성/언로드/입력/에러 신호 구독. 리스너는 등록 순서대로 호출되어야 한다.

use std::sync::Arc;

use super::SubscriptionId;
use crate::models::page::PageSignal;

pub type PageHandler = Arc<dyn Fn(&PageSignal) + Send + Sync>;

/// 페이지 라이프사이클 신호 소스
pub trait PageEvents: Send + Sync {
    fn subscribe(&self, handler: PageHandler) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId);
}
