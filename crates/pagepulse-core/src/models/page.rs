//! 페이지 라이프사이클 신호 모델.
//!
//! 가시성 변경, 언로드, 사용자 입력, 런타임 에러를 하나의 신호 enum으로 표현.

use serde::{Deserialize, Serialize};

/// 페이지 가시성
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

/// LCP 확정을 트리거하는 입력 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Click,
    KeyDown,
    PointerDown,
}

/// 처리되지 않은 런타임 에러
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    pub filename: Option<String>,
    pub lineno: Option<u32>,
    pub colno: Option<u32>,
    pub stack: Option<String>,
}

/// 처리되지 않은 Promise 거부
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RejectionReport {
    pub reason: String,
    pub stack: Option<String>,
}

/// 호스트 페이지에서 발생하는 신호
#[derive(Debug, Clone, PartialEq)]
pub enum PageSignal {
    /// 가시성 변경 (visibilitychange)
    VisibilityChange(Visibility),
    /// 페이지 언로드 (pagehide)
    PageHide,
    /// 사용자 입력
    Input(InputKind),
    /// 런타임 에러
    Error(ErrorReport),
    /// 처리되지 않은 거부
    UnhandledRejection(RejectionReport),
}

impl PageSignal {
    /// 페이지가 숨겨지거나 떠나는 중인지 (지표 확정 트리거)
    pub fn is_page_leaving(&self) -> bool {
        matches!(
            self,
            PageSignal::VisibilityChange(Visibility::Hidden) | PageSignal::PageHide
        )
    }
}
