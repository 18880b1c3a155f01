//! PAGEPULSE 핵심 에러 타입.
//!
//! 모든 어댑터 crate가 같은 `CoreError`를 반환한다.
//! 전송/저장소 에러는 파이프라인 밖으로 던져지지 않고 콜백으로만 보고된다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 — {field}: {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// 서버가 실패 상태 코드로 응답
    #[error("전송 실패 (HTTP {status})")]
    HttpStatus {
        /// 응답 상태 코드
        status: u16,
    },

    /// 비콘 프리미티브가 페이로드를 거부
    #[error("비콘 거부: {size} bytes")]
    BeaconRejected {
        /// 거부된 페이로드 크기
        size: usize,
    },

    /// 단일 이벤트가 페이로드 상한을 초과 (분할 불가)
    #[error("페이로드 상한 초과: {size} bytes > {limit} bytes")]
    PayloadTooLarge {
        /// 직렬화된 크기
        size: usize,
        /// 상한
        limit: usize,
    },

    /// 최대 분할 깊이 도달로 남은 이벤트 폐기
    #[error("최대 분할 깊이 {depth} 초과, 이벤트 {dropped}개 폐기")]
    SplitDepthExceeded {
        /// 도달한 깊이
        depth: u32,
        /// 폐기된 이벤트 수
        dropped: usize,
    },

    /// 저장소 접근 실패 (용량 초과, 프라이빗 모드 등)
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 호스트가 기능을 제공하지 않음
    #[error("미지원 기능: {0}")]
    Unsupported(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}
