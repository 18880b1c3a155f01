//! # pagepulse-core
//!
//! PAGEPULSE 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 관찰자/파이프라인/전송 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 지표, 이벤트, 세션, 성능 엔트리 (serde Serialize/Deserialize)
//! - [`ports`]: 호스트 환경 포트 인터페이스 (엔트리 소스, 페이지 이벤트, 전송, 저장소)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: `observe()` 설정 구조체

pub mod config;
pub mod error;
pub mod models;
pub mod ports;

#[cfg(test)]
mod tests {
    use crate::models::metric::{MetricName, Rating};

    #[test]
    fn rating_tables_cover_every_metric() {
        for name in MetricName::ALL {
            let t = name.thresholds();
            assert!(t.good < t.poor, "{name}: good < poor");
            assert_eq!(t.rate(t.good), Rating::Good);
            assert_eq!(t.rate(t.poor), Rating::NeedsImprovement);
        }
    }

    #[test]
    fn config_defaults() {
        let settings = crate::config::ObserveSettings::default();
        assert_eq!(settings.batch_size, 10);
        assert_eq!(settings.flush_interval_ms, 5_000);
        assert!(settings.capture_errors);
        assert!(!settings.debug);
        assert!(settings.session.resolve().is_none());
    }
}
