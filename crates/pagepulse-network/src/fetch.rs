//! 즉시 요청 전송.
//!
//! 배치를 JSON 배열로 직렬화해 POST 한다. 요청은 파이프라인 해제와 무관하게
//! 끝까지 진행된다. 실패는 에러 콜백으로 보고하고 재시도하지 않는다.

use async_trait::async_trait;
use pagepulse_core::error::CoreError;
use pagepulse_core::models::event::ObserveEvent;
use pagepulse_core::ports::transport::{report_error, serialize_batch, ErrorCallback, Transport};
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use tracing::{debug, warn};

/// 기본 요청 타임아웃
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP POST 전송: `Transport` 포트 구현
pub struct FetchTransport {
    client: reqwest::Client,
    endpoint: String,
    on_error: Option<ErrorCallback>,
}

impl FetchTransport {
    /// 새 전송 생성
    pub fn new(endpoint: &str) -> Result<Self, CoreError> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: &str, timeout: Duration) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            on_error: None,
        })
    }

    /// 에러 콜백 설정
    pub fn with_error_callback(mut self, on_error: Option<ErrorCallback>) -> Self {
        self.on_error = on_error;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, events: &[ObserveEvent]) -> Result<(), CoreError> {
        let body = serialize_batch(events)?;
        let resp = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("배치 전송 요청 실패: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::HttpStatus {
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Transport for FetchTransport {
    async fn send(&self, events: &[ObserveEvent]) -> Result<(), CoreError> {
        if events.is_empty() {
            return Ok(());
        }

        match self.post(events).await {
            Ok(()) => {
                debug!("배치 전송 성공: {}개 이벤트", events.len());
                Ok(())
            }
            Err(e) => {
                warn!("배치 전송 실패: {e}");
                report_error(self.on_error.as_ref(), &e);
                Err(e)
            }
        }
    }
}
