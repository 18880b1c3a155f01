//! 성능 엔트리 모델.
//!
//! 호스트의 성능 관찰 기능이 전달하는 원시 엔트리.
//! 모든 시각은 내비게이션 시작 기준 상대 밀리초다.

use serde::{Deserialize, Serialize};
use std::fmt;

/// 구독 단위가 되는 엔트리 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryType {
    LayoutShift,
    LargestContentfulPaint,
    Event,
    Paint,
    FirstInput,
    Navigation,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::LayoutShift => "layout-shift",
            EntryType::LargestContentfulPaint => "largest-contentful-paint",
            EntryType::Event => "event",
            EntryType::Paint => "paint",
            EntryType::FirstInput => "first-input",
            EntryType::Navigation => "navigation",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 레이아웃 이동 엔트리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutShiftEntry {
    pub start_time: f64,
    /// 이동 크기
    pub value: f64,
    /// 최근 사용자 입력으로 인한 이동 여부 (CLS 제외 대상)
    #[serde(default)]
    pub had_recent_input: bool,
}

/// 최대 콘텐츠 페인트 엔트리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LargestContentfulPaintEntry {
    pub start_time: f64,
    #[serde(default)]
    pub size: u64,
}

/// 이벤트 타이밍 엔트리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTimingEntry {
    /// 이벤트 이름 (pointerdown, keyup ...)
    pub name: String,
    pub start_time: f64,
    pub duration: f64,
    /// 0이면 이산 상호작용이 아님 (scroll 등)
    #[serde(default)]
    pub interaction_id: u64,
}

/// 페인트 타이밍 엔트리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaintEntry {
    /// "first-paint" 또는 "first-contentful-paint"
    pub name: String,
    pub start_time: f64,
}

/// 첫 입력 엔트리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirstInputEntry {
    pub name: String,
    pub start_time: f64,
    pub processing_start: f64,
}

/// 내비게이션 타이밍 엔트리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationEntry {
    pub response_start: f64,
    /// back/forward 캐시 복원일 때만 0이 아님
    #[serde(default)]
    pub activation_start: f64,
}

/// 호스트가 전달하는 성능 엔트리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entryType", rename_all = "kebab-case")]
pub enum PerformanceEntry {
    LayoutShift(LayoutShiftEntry),
    LargestContentfulPaint(LargestContentfulPaintEntry),
    Event(EventTimingEntry),
    Paint(PaintEntry),
    FirstInput(FirstInputEntry),
    Navigation(NavigationEntry),
}

impl PerformanceEntry {
    pub fn entry_type(&self) -> EntryType {
        match self {
            PerformanceEntry::LayoutShift(_) => EntryType::LayoutShift,
            PerformanceEntry::LargestContentfulPaint(_) => EntryType::LargestContentfulPaint,
            PerformanceEntry::Event(_) => EntryType::Event,
            PerformanceEntry::Paint(_) => EntryType::Paint,
            PerformanceEntry::FirstInput(_) => EntryType::FirstInput,
            PerformanceEntry::Navigation(_) => EntryType::Navigation,
        }
    }

    /// 레이아웃 이동 엔트리 생성 헬퍼
    pub fn layout_shift(start_time: f64, value: f64) -> Self {
        PerformanceEntry::LayoutShift(LayoutShiftEntry {
            start_time,
            value,
            had_recent_input: false,
        })
    }

    /// LCP 엔트리 생성 헬퍼
    pub fn largest_paint(start_time: f64) -> Self {
        PerformanceEntry::LargestContentfulPaint(LargestContentfulPaintEntry {
            start_time,
            size: 0,
        })
    }

    /// 이벤트 타이밍 엔트리 생성 헬퍼
    pub fn interaction(name: &str, interaction_id: u64, duration: f64) -> Self {
        PerformanceEntry::Event(EventTimingEntry {
            name: name.to_string(),
            start_time: 0.0,
            duration,
            interaction_id,
        })
    }
}
