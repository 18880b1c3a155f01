//! `observe()` 설정 구조체.
//!
//! 직렬화 가능한 [`ObserveSettings`]와, 콜백/커스텀 전송을 함께 담는
//! 런타임 설정 [`ObserveConfig`]로 나뉜다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::CoreError;
use crate::models::event::{ObserveEvent, SamplingCategory};
use crate::models::metric::MetricName;
use crate::ports::transport::{ErrorCallback, Transport};

/// 기본 배치 크기
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// 기본 플러시 간격 (밀리초)
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5_000;

/// 기본 세션 비활동 타임아웃 (30분)
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 30 * 60 * 1_000;

/// 이벤트 필터 (false면 조용히 폐기)
pub type EventFilter = Arc<dyn Fn(&ObserveEvent) -> bool + Send + Sync>;

// ============================================================
// Vitals 선택
// ============================================================

/// 관찰할 Web Vitals 선택 (`true`/`false` 또는 이름 목록)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VitalsSelection {
    Enabled(bool),
    Only(Vec<MetricName>),
}

impl Default for VitalsSelection {
    fn default() -> Self {
        VitalsSelection::Enabled(true)
    }
}

impl VitalsSelection {
    pub fn includes(&self, name: MetricName) -> bool {
        match self {
            VitalsSelection::Enabled(enabled) => *enabled,
            VitalsSelection::Only(names) => names.contains(&name),
        }
    }
}

// ============================================================
// 샘플링 설정
// ============================================================

/// 카테고리별 샘플링 비율 (미지정 카테고리는 1)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryRates {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitals: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identify: Option<f64>,
}

/// 샘플링 설정: 단일 비율 또는 카테고리별 맵
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SamplingConfig {
    /// 모든 카테고리에 적용 (`identify`는 항상 1)
    Rate(f64),
    PerCategory(CategoryRates),
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig::Rate(1.0)
    }
}

impl SamplingConfig {
    /// 카테고리의 유지 확률
    pub fn rate_for(&self, category: SamplingCategory) -> f64 {
        match self {
            SamplingConfig::Rate(_) if category == SamplingCategory::Identify => 1.0,
            SamplingConfig::Rate(rate) => *rate,
            SamplingConfig::PerCategory(rates) => {
                let rate = match category {
                    SamplingCategory::Vitals => rates.vitals,
                    SamplingCategory::Errors => rates.errors,
                    SamplingCategory::Custom => rates.custom,
                    SamplingCategory::Transitions => rates.transitions,
                    SamplingCategory::Identify => rates.identify,
                };
                rate.unwrap_or(1.0)
            }
        }
    }

    fn rates(&self) -> Vec<(&'static str, f64)> {
        match self {
            SamplingConfig::Rate(rate) => vec![("sampling", *rate)],
            SamplingConfig::PerCategory(r) => [
                ("sampling.vitals", r.vitals),
                ("sampling.errors", r.errors),
                ("sampling.custom", r.custom),
                ("sampling.transitions", r.transitions),
                ("sampling.identify", r.identify),
            ]
            .into_iter()
            .filter_map(|(field, rate)| rate.map(|r| (field, r)))
            .collect(),
        }
    }
}

// ============================================================
// 세션 설정
// ============================================================

/// 세션 저장소 종류
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// 탭 범위 영속 저장소
    #[default]
    Session,
    /// 탭 간 공유 영속 저장소
    Local,
    /// 영속화 없음 (프로세스 메모리만)
    Memory,
}

/// 세션 추적 옵션
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionOptions {
    /// 비활동 타임아웃 (밀리초)
    #[serde(default = "default_session_timeout_ms", alias = "timeout")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub storage: StorageKind,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SESSION_TIMEOUT_MS,
            storage: StorageKind::Session,
        }
    }
}

/// 세션 추적 설정 (`false`, `true` 또는 옵션 객체)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionTracking {
    Enabled(bool),
    Custom(SessionOptions),
}

impl Default for SessionTracking {
    fn default() -> Self {
        SessionTracking::Enabled(false)
    }
}

impl SessionTracking {
    /// 비활성이면 None
    pub fn resolve(&self) -> Option<SessionOptions> {
        match self {
            SessionTracking::Enabled(false) => None,
            SessionTracking::Enabled(true) => Some(SessionOptions::default()),
            SessionTracking::Custom(options) => Some(options.clone()),
        }
    }
}

// ============================================================
// 파이프라인 설정
// ============================================================

/// 직렬화 가능한 파이프라인 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ObserveSettings {
    /// 수집 엔드포인트 (커스텀 전송이 있으면 무시)
    pub endpoint: Option<String>,
    pub vitals: VitalsSelection,
    /// 런타임 에러/거부 수집
    pub capture_errors: bool,
    /// 이 개수에 도달하면 즉시 플러시
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    pub sampling: SamplingConfig,
    pub session: SessionTracking,
    /// 이벤트/플러시 로그를 info 레벨로 출력
    pub debug: bool,
}

impl Default for ObserveSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            vitals: VitalsSelection::default(),
            capture_errors: true,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            sampling: SamplingConfig::default(),
            session: SessionTracking::default(),
            debug: false,
        }
    }
}

impl ObserveSettings {
    /// JSON 문자열에서 로드 (누락 필드는 기본값)
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

fn default_session_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MS
}

/// 런타임 파이프라인 설정
#[derive(Clone, Default)]
pub struct ObserveConfig {
    pub settings: ObserveSettings,
    /// 커스텀 전송 (엔드포인트보다 우선)
    pub transport: Option<Arc<dyn Transport>>,
    pub filter: Option<EventFilter>,
    /// 전송 실패 보고
    pub on_error: Option<ErrorCallback>,
}

impl fmt::Debug for ObserveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserveConfig")
            .field("settings", &self.settings)
            .field("transport", &self.transport.is_some())
            .field("filter", &self.filter.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl ObserveConfig {
    pub fn new(settings: ObserveSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// 엔드포인트 설정
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.settings.endpoint = Some(endpoint.to_string());
        self
    }

    /// 커스텀 전송 설정
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// 이벤트 필터 설정
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&ObserveEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// 전송 에러 콜백 설정
    pub fn with_error_callback(mut self, on_error: ErrorCallback) -> Self {
        self.on_error = Some(on_error);
        self
    }

    /// 설정 유효성 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        let settings = &self.settings;

        if settings.batch_size == 0 {
            return Err(validation("batchSize", "1 이상이어야 함"));
        }
        if settings.flush_interval_ms == 0 {
            return Err(validation("flushIntervalMs", "0보다 커야 함"));
        }
        for (field, rate) in settings.sampling.rates() {
            if !(0.0..=1.0).contains(&rate) {
                return Err(validation(field, &format!("[0, 1] 범위 밖: {rate}")));
            }
        }

        if self.transport.is_none() {
            let Some(endpoint) = settings.endpoint.as_deref() else {
                return Err(CoreError::Config(
                    "endpoint 또는 transport 중 하나가 필요함".to_string(),
                ));
            };
            let url = url::Url::parse(endpoint)
                .map_err(|e| validation("endpoint", &format!("URL 파싱 실패: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(validation("endpoint", "http(s) URL이어야 함"));
            }
        }

        Ok(())
    }
}

fn validation(field: &str, message: &str) -> CoreError {
    CoreError::Validation {
        field: field.to_string(),
        message: message.to_string(),
    }
}
