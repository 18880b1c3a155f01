//! # pagepulse-monitor
//!
//! Web Vitals 관찰자.
//! 여러 번 반복 발생하는 원시 성능 엔트리를 페이지 라이프사이클당
//! 하나의 확정 지표로 바꾼다. 누적 상태는 관찰자 인스턴스별 상태 구조체에 있고
//! 순수 전이 함수로 갱신된다.
//!
//! ## 모듈
//! - `hub`: 호스트가 신호를 밀어넣는 인프로세스 엔트리 소스/페이지 이벤트 허브
//! - `observer`: 관찰자 공통 컨텍스트, 보고 콜백, 해제 핸들
//! - `cls` / `lcp` / `inp`: 확정형 관찰자 (1회 보고)
//! - `single_shot`: FCP / FID / TTFB (첫 엔트리에서 보고 후 해제)
//! - `vitals`: 선택된 관찰자 일괄 시작

pub mod cls;
pub mod hub;
pub mod inp;
pub mod lcp;
pub mod observer;
pub mod single_shot;
pub mod vitals;

pub use hub::PageSignalHub;
pub use observer::{ObserverContext, ObserverHandle, ReportCallback};
pub use vitals::start_vitals;
