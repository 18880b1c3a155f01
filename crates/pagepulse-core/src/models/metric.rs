//! 성능 지표 모델.
//!
//! 관찰자가 페이지 라이프사이클마다 확정하는 Web Vitals 값과 등급 테이블을 정의.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 지표 이름
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetricName {
    /// Cumulative Layout Shift
    Cls,
    /// Largest Contentful Paint
    Lcp,
    /// Interaction to Next Paint
    Inp,
    /// First Contentful Paint
    Fcp,
    /// First Input Delay
    Fid,
    /// Time To First Byte
    Ttfb,
}

impl MetricName {
    /// 전체 지표 목록 (관찰자 등록 순서)
    pub const ALL: [MetricName; 6] = [
        MetricName::Cls,
        MetricName::Lcp,
        MetricName::Inp,
        MetricName::Fcp,
        MetricName::Fid,
        MetricName::Ttfb,
    ];

    /// 와이어 표기 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Cls => "CLS",
            MetricName::Lcp => "LCP",
            MetricName::Inp => "INP",
            MetricName::Fcp => "FCP",
            MetricName::Fid => "FID",
            MetricName::Ttfb => "TTFB",
        }
    }

    /// 등급 임계값 (good / poor 경계)
    pub fn thresholds(&self) -> Thresholds {
        match self {
            MetricName::Cls => Thresholds::new(0.1, 0.25),
            MetricName::Lcp => Thresholds::new(2_500.0, 4_000.0),
            MetricName::Inp => Thresholds::new(200.0, 500.0),
            MetricName::Fcp => Thresholds::new(1_800.0, 3_000.0),
            MetricName::Fid => Thresholds::new(100.0, 300.0),
            MetricName::Ttfb => Thresholds::new(800.0, 1_800.0),
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 지표 등급
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

/// 2단계 임계값 테이블
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// 이 값 이하이면 good
    pub good: f64,
    /// 이 값 이하이면 needs-improvement, 초과하면 poor
    pub poor: f64,
}

impl Thresholds {
    pub const fn new(good: f64, poor: f64) -> Self {
        Self { good, poor }
    }

    /// 값에 대한 등급 산출
    pub fn rate(&self, value: f64) -> Rating {
        if value <= self.good {
            Rating::Good
        } else if value <= self.poor {
            Rating::NeedsImprovement
        } else {
            Rating::Poor
        }
    }
}

/// 확정된 단일 성능 지표
///
/// 생성 후 변경하지 않는다. 관찰자는 보고할 때마다 새 값을 만든다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: MetricName,
    pub value: f64,
    pub rating: Rating,
    /// 직전 보고값과의 차이 (첫 보고는 0)
    pub delta: f64,
    /// 확정 시각 (epoch ms)
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Metric {
    /// 새 지표 생성. 등급은 이름별 테이블에서 결정된다.
    pub fn new(
        name: MetricName,
        value: f64,
        previous: Option<f64>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            name,
            value,
            rating: name.thresholds().rate(value),
            delta: previous.map(|p| value - p).unwrap_or(0.0),
            timestamp,
        }
    }
}
