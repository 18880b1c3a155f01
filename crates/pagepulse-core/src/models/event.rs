//! 이벤트 모델.
//!
//! 파이프라인 버퍼에 쌓이고 배치로 전송되는 이벤트의 통합 enum.
//! 버퍼에 들어간 이벤트는 변경하지 않고 읽기/직렬화만 한다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::metric::Metric;

/// 샘플링 카테고리
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamplingCategory {
    Vitals,
    Errors,
    Custom,
    Transitions,
    Identify,
}

/// 파이프라인이 다루는 모든 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ObserveEvent {
    /// 확정된 Web Vital
    #[serde(rename = "vital")]
    Vital(VitalEvent),
    /// 런타임 에러
    #[serde(rename = "error")]
    Error(ErrorEvent),
    /// 처리되지 않은 거부
    #[serde(rename = "unhandledrejection")]
    UnhandledRejection(UnhandledRejectionEvent),
    /// 상태 머신 전이
    #[serde(rename = "transition")]
    Transition(TransitionEvent),
    /// 사용자 정의 지표
    #[serde(rename = "custom")]
    CustomMetric(CustomMetricEvent),
    /// 사용자 식별
    #[serde(rename = "identify")]
    Identify(IdentifyEvent),
}

/// Web Vital 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalEvent {
    pub metric: Metric,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// 런타임 에러 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEvent {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineno: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colno: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// 등록된 상태 제공자별 현재 논리 상태
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state: BTreeMap<String, String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// 처리되지 않은 거부 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnhandledRejectionEvent {
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub state: BTreeMap<String, String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// 상태 머신 전이 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    pub machine_id: String,
    pub from: String,
    pub to: String,
    /// 전이를 일으킨 이벤트 이름
    pub event: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// 사용자 정의 지표 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomMetricEvent {
    pub name: String,
    pub value: f64,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// 사용자 식별 이벤트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifyEvent {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub traits: BTreeMap<String, serde_json::Value>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ObserveEvent {
    /// 판별자 문자열 (와이어의 `type` 필드)
    pub fn type_name(&self) -> &'static str {
        match self {
            ObserveEvent::Vital(_) => "vital",
            ObserveEvent::Error(_) => "error",
            ObserveEvent::UnhandledRejection(_) => "unhandledrejection",
            ObserveEvent::Transition(_) => "transition",
            ObserveEvent::CustomMetric(_) => "custom",
            ObserveEvent::Identify(_) => "identify",
        }
    }

    /// 샘플링 카테고리 매핑
    pub fn category(&self) -> SamplingCategory {
        match self {
            ObserveEvent::Vital(_) => SamplingCategory::Vitals,
            ObserveEvent::Error(_) | ObserveEvent::UnhandledRejection(_) => {
                SamplingCategory::Errors
            }
            ObserveEvent::Transition(_) => SamplingCategory::Transitions,
            ObserveEvent::CustomMetric(_) => SamplingCategory::Custom,
            ObserveEvent::Identify(_) => SamplingCategory::Identify,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            ObserveEvent::Vital(e) => e.timestamp,
            ObserveEvent::Error(e) => e.timestamp,
            ObserveEvent::UnhandledRejection(e) => e.timestamp,
            ObserveEvent::Transition(e) => e.timestamp,
            ObserveEvent::CustomMetric(e) => e.timestamp,
            ObserveEvent::Identify(e) => e.timestamp,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match self {
            ObserveEvent::Vital(e) => e.session_id.as_deref(),
            ObserveEvent::Error(e) => e.session_id.as_deref(),
            ObserveEvent::UnhandledRejection(e) => e.session_id.as_deref(),
            ObserveEvent::Transition(e) => e.session_id.as_deref(),
            ObserveEvent::CustomMetric(e) => e.session_id.as_deref(),
            ObserveEvent::Identify(e) => e.session_id.as_deref(),
        }
    }

    /// 세션 ID가 부착된 새 이벤트 반환
    pub fn with_session_id(self, session_id: String) -> Self {
        let id = Some(session_id);
        match self {
            ObserveEvent::Vital(e) => ObserveEvent::Vital(VitalEvent { session_id: id, ..e }),
            ObserveEvent::Error(e) => ObserveEvent::Error(ErrorEvent { session_id: id, ..e }),
            ObserveEvent::UnhandledRejection(e) => {
                ObserveEvent::UnhandledRejection(UnhandledRejectionEvent { session_id: id, ..e })
            }
            ObserveEvent::Transition(e) => {
                ObserveEvent::Transition(TransitionEvent { session_id: id, ..e })
            }
            ObserveEvent::CustomMetric(e) => {
                ObserveEvent::CustomMetric(CustomMetricEvent { session_id: id, ..e })
            }
            ObserveEvent::Identify(e) => {
                ObserveEvent::Identify(IdentifyEvent { session_id: id, ..e })
            }
        }
    }

    /// 지표로부터 Vital 이벤트 생성
    pub fn vital(metric: Metric) -> Self {
        ObserveEvent::Vital(VitalEvent {
            timestamp: metric.timestamp,
            metric,
            session_id: None,
        })
    }

    /// 사용자 정의 지표 이벤트 생성
    pub fn custom(name: &str, value: f64, timestamp: DateTime<Utc>) -> Self {
        ObserveEvent::CustomMetric(CustomMetricEvent {
            name: name.to_string(),
            value,
            tags: BTreeMap::new(),
            timestamp,
            session_id: None,
        })
    }
}
