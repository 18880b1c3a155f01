//! 포트 인터페이스 (trait).
//!
//! 호스트 환경(브라우저 바인딩, 테스트 하네스)이 제공하는 기능의 경계.
//! 각 어댑터 crate가 이 trait들을 구현하며,
//! `pagepulse-pipeline`에서 `Arc<dyn T>`로 와이어링한다.
//!
//! 전송만 비동기이고 나머지는 모두 동기 핸들러 모델을 따른다.

pub mod clock;
pub mod entry_source;
pub mod page_events;
pub mod random;
pub mod storage;
pub mod transport;

/// 구독 식별자 (구독/해지 쌍을 맞추는 키)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);
