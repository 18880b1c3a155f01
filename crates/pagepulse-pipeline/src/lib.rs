//! # pagepulse-pipeline
//!
//! 관찰자, 전송, 저장소를 묶는 오케스트레이션 crate.
//!
//! - [`sampler`]: 카테고리별 확률 샘플링
//! - [`session`]: 세션 ID 발급/만료/영속화
//! - [`registry`]: 활성 파이프라인 슬롯 + 상태 getter
//! - [`producers`]: 레지스트리를 통해 이벤트를 넣는 외부 생산자
//! - [`pipeline`]: `EventPipeline::observe()` 진입점
//!
//! ## 사용 예시
//!
//! ```rust,ignore
//! let hub = Arc::new(PageSignalHub::new());
//! let deps = PipelineDeps::from_hub(hub.clone());
//! let config = ObserveConfig::default().with_endpoint("https://collect.example.com/v1");
//! let pipeline = EventPipeline::observe(config, deps)?;
//! ```

pub mod pipeline;
pub mod producers;
pub mod registry;
pub mod sampler;
pub mod session;

pub use pipeline::{EventPipeline, PipelineDeps, PipelineStats};
pub use producers::{CustomMetricEmitter, IdentifyEmitter, TransitionEmitter};
pub use registry::{EventSink, PipelineRegistry, RegistrationToken, StateGetter};
pub use sampler::Sampler;
pub use session::SessionManager;
