//! 비콘 전송: 언로드 중에도 살아남는 fire-and-forget 전달.
//!
//! 비콘 프리미티브는 페이로드 크기 상한이 있다. 직렬화 결과가 상한을 넘으면
//! 배치를 반으로 나눠 각각 다시 시도한다. 분할 깊이는 `max_split_depth`로 제한한다.

use async_trait::async_trait;
use pagepulse_core::error::CoreError;
use pagepulse_core::models::event::ObserveEvent;
use pagepulse_core::ports::transport::{
    report_error, serialize_batch, BeaconSink, ErrorCallback, Transport,
};
use reqwest::header::CONTENT_TYPE;
use std::sync::Arc;
use tracing::{debug, warn};

/// 비콘 페이로드 상한 (64KiB)
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 65_536;

/// 최대 분할 깊이
pub const DEFAULT_MAX_SPLIT_DEPTH: u32 = 8;

/// 크기 인지 비콘 전송
pub struct BeaconTransport {
    sink: Arc<dyn BeaconSink>,
    endpoint: String,
    max_payload_bytes: usize,
    max_split_depth: u32,
    on_error: Option<ErrorCallback>,
}

impl BeaconTransport {
    /// 새 비콘 전송 생성
    pub fn new(sink: Arc<dyn BeaconSink>, endpoint: &str) -> Self {
        Self {
            sink,
            endpoint: endpoint.to_string(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
            max_split_depth: DEFAULT_MAX_SPLIT_DEPTH,
            on_error: None,
        }
    }

    pub fn with_max_payload_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    pub fn with_max_split_depth(mut self, max_split_depth: u32) -> Self {
        self.max_split_depth = max_split_depth;
        self
    }

    pub fn with_error_callback(mut self, on_error: Option<ErrorCallback>) -> Self {
        self.on_error = on_error;
        self
    }

    /// 배치 하나를 전달하거나 분할해서 재귀 전달. 발생한 에러를 모두 모은다.
    fn deliver(&self, events: &[ObserveEvent], depth: u32, errors: &mut Vec<CoreError>) {
        if events.is_empty() {
            return;
        }

        let payload = match serialize_batch(events) {
            Ok(payload) => payload,
            Err(e) => {
                errors.push(e);
                return;
            }
        };
        let size = payload.len();

        if size <= self.max_payload_bytes {
            if self.sink.send_beacon(&self.endpoint, payload) {
                debug!("비콘 큐잉: {}개 이벤트, {size} bytes", events.len());
            } else {
                errors.push(CoreError::BeaconRejected { size });
            }
            return;
        }

        if events.len() == 1 {
            errors.push(CoreError::PayloadTooLarge {
                size,
                limit: self.max_payload_bytes,
            });
            return;
        }

        if depth >= self.max_split_depth {
            errors.push(CoreError::SplitDepthExceeded {
                depth,
                dropped: events.len(),
            });
            return;
        }

        let (left, right) = events.split_at(events.len() / 2);
        debug!(
            "비콘 페이로드 {size} bytes 상한 초과 — 분할 (깊이 {}): {} + {}",
            depth + 1,
            left.len(),
            right.len()
        );
        self.deliver(left, depth + 1, errors);
        self.deliver(right, depth + 1, errors);
    }

    /// 분할 전달 후 에러를 보고하고 첫 에러를 반환
    fn deliver_batch(&self, events: &[ObserveEvent]) -> Result<(), CoreError> {
        let mut errors = Vec::new();
        self.deliver(events, 0, &mut errors);

        for error in &errors {
            warn!("비콘 전송 실패: {error}");
            report_error(self.on_error.as_ref(), error);
        }

        match errors.into_iter().next() {
            Some(first) => Err(first),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Transport for BeaconTransport {
    async fn send(&self, events: &[ObserveEvent]) -> Result<(), CoreError> {
        self.deliver_batch(events)
    }

    /// 비콘 큐잉은 항상 동기
    fn send_now(&self, events: &[ObserveEvent]) -> Option<Result<(), CoreError>> {
        Some(self.deliver_batch(events))
    }
}

/// reqwest 기반 비콘 프리미티브
///
/// 요청을 런타임에 띄우고 즉시 반환한다. 응답은 기다리지 않는다.
pub struct HttpBeacon {
    client: reqwest::Client,
    max_payload_bytes: usize,
}

impl HttpBeacon {
    pub fn new() -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;
        Ok(Self {
            client,
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        })
    }

    pub fn with_max_payload_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }
}

impl BeaconSink for HttpBeacon {
    fn send_beacon(&self, url: &str, payload: Vec<u8>) -> bool {
        if payload.len() > self.max_payload_bytes {
            return false;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("비콘 거부: 실행 중인 런타임 없음");
            return false;
        };

        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        handle.spawn(async move {
            if let Err(e) = request.send().await {
                debug!("비콘 요청 실패 (무시): {e}");
            }
        });
        true
    }
}
