//! PAGEPULSE 도메인 모델.
//!
//! 관찰자, 파이프라인, 전송 계층이 공유하는 데이터 구조체를 정의한다.
//! 와이어/저장 형식에 나가는 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod entry;
pub mod event;
pub mod metric;
pub mod page;
pub mod session;
