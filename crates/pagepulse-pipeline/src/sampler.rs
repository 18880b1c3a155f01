//! 카테고리별 확률 샘플링.
//!
//! 호출마다 독립적으로 판정한다. 같은 상호작용에서 나온 이벤트라도
//! 일부만 남을 수 있다.

use pagepulse_core::config::SamplingConfig;
use pagepulse_core::models::event::SamplingCategory;
use pagepulse_core::ports::random::RandomSource;
use std::sync::Arc;

/// 샘플러
pub struct Sampler {
    config: SamplingConfig,
    random: Arc<dyn RandomSource>,
}

impl Sampler {
    pub fn new(config: SamplingConfig, random: Arc<dyn RandomSource>) -> Self {
        Self { config, random }
    }

    /// 카테고리의 유지 확률
    pub fn rate_for(&self, category: SamplingCategory) -> f64 {
        self.config.rate_for(category)
    }

    /// 이벤트 유지 여부. 확률이 0 이하/1 이상이면 난수를 뽑지 않는다.
    pub fn should_sample(&self, category: SamplingCategory) -> bool {
        let rate = self.rate_for(category);
        if rate >= 1.0 {
            return true;
        }
        if rate <= 0.0 {
            return false;
        }
        self.random.next_f64() < rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRandom;
    use pagepulse_core::config::CategoryRates;
    use pagepulse_core::ports::random::ThreadRandom;

    #[test]
    fn extremes_are_deterministic_and_draw_nothing() {
        let random = Arc::new(ScriptedRandom::constant(0.5));
        let always = Sampler::new(SamplingConfig::Rate(1.0), random.clone());
        let never = Sampler::new(SamplingConfig::Rate(0.0), random.clone());

        for _ in 0..100 {
            assert!(always.should_sample(SamplingCategory::Vitals));
            assert!(!never.should_sample(SamplingCategory::Errors));
        }
        assert_eq!(random.draws(), 0);
    }

    #[test]
    fn draw_below_rate_keeps() {
        let random = Arc::new(ScriptedRandom::new(&[0.29, 0.3, 0.99], 0.0));
        let sampler = Sampler::new(SamplingConfig::Rate(0.3), random.clone());

        assert!(sampler.should_sample(SamplingCategory::Custom));
        assert!(!sampler.should_sample(SamplingCategory::Custom));
        assert!(!sampler.should_sample(SamplingCategory::Custom));
        assert_eq!(random.draws(), 3);
    }

    #[test]
    fn global_rate_leaves_identify_alone() {
        let random = Arc::new(ScriptedRandom::constant(0.99));
        let sampler = Sampler::new(SamplingConfig::Rate(0.1), random.clone());

        assert!(sampler.should_sample(SamplingCategory::Identify));
        assert_eq!(random.draws(), 0);
    }

    #[test]
    fn per_category_defaults_to_keep() {
        let sampler = Sampler::new(
            SamplingConfig::PerCategory(CategoryRates {
                vitals: Some(0.0),
                ..CategoryRates::default()
            }),
            Arc::new(ThreadRandom),
        );
        assert!(!sampler.should_sample(SamplingCategory::Vitals));
        assert!(sampler.should_sample(SamplingCategory::Errors));
        assert!(sampler.should_sample(SamplingCategory::Transitions));
    }

    #[test]
    fn keep_fraction_converges_to_rate() {
        let sampler = Sampler::new(SamplingConfig::Rate(0.25), Arc::new(ThreadRandom));
        let trials = 20_000;
        let kept = (0..trials)
            .filter(|_| sampler.should_sample(SamplingCategory::Vitals))
            .count();
        let fraction = kept as f64 / trials as f64;
        assert!((fraction - 0.25).abs() < 0.02, "keep fraction {fraction}");
    }
}
