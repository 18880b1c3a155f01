//! 전송 포트.
//!
//! 구현: `pagepulse-network` crate (reqwest 즉시 요청, 비콘, 하이브리드, 재시도)

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::CoreError;
use crate::models::event::ObserveEvent;

/// 전송 실패 보고 콜백
pub type ErrorCallback = Arc<dyn Fn(&CoreError) + Send + Sync>;

/// 배치 전달 시도
///
/// 실패는 구현체가 자체 에러 콜백으로 보고한다. 반환값은 데코레이터
/// (재시도 등)가 결과를 관찰하기 위한 것이며 파이프라인은 로그만 남긴다.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, events: &[ObserveEvent]) -> Result<(), CoreError>;

    /// 호출 스택 안에서 끝나는 전달 (비콘 큐잉)
    ///
    /// `Some`이면 전달 시도가 이미 끝났고 호출자는 `send`를 띄우지 않는다.
    /// `None`이면 호출자가 `send`를 비동기로 실행한다. 언로드 핸들러가
    /// 반환되기 전에 비콘을 큐잉하는 경로다.
    fn send_now(&self, _events: &[ObserveEvent]) -> Option<Result<(), CoreError>> {
        None
    }

    /// 라이프사이클 리스너 해제. 이후에도 `send`는 호출 가능해야 한다.
    fn teardown(&self) {}
}

/// 언로드에도 살아남는 fire-and-forget 전달 프리미티브 (비콘)
///
/// 호출 즉시 반환한다. `false`는 큐잉 거부(크기 초과 등)를 뜻한다.
pub trait BeaconSink: Send + Sync {
    fn send_beacon(&self, url: &str, payload: Vec<u8>) -> bool;
}

/// 배치를 JSON 배열로 직렬화
pub fn serialize_batch(events: &[ObserveEvent]) -> Result<Vec<u8>, CoreError> {
    Ok(serde_json::to_vec(events)?)
}

/// 콜백이 설정되어 있으면 에러 보고
pub fn report_error(on_error: Option<&ErrorCallback>, error: &CoreError) {
    if let Some(callback) = on_error {
        callback(error);
    }
}
