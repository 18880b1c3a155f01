//! 난수 포트.
//!
//! 샘플링과 세션 ID 생성이 사용한다. 테스트에서는 고정 시퀀스로 대체한다.

/// [0, 1) 균등 분포 난수 제공자
pub trait RandomSource: Send + Sync {
    fn next_f64(&self) -> f64;

    /// 세션 ID 접미사용 정수
    fn next_u32(&self) -> u32 {
        (self.next_f64() * f64::from(u32::MAX)) as u32
    }
}

/// 스레드 로컬 RNG (`rand`)
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_f64(&self) -> f64 {
        rand::random::<f64>()
    }

    fn next_u32(&self) -> u32 {
        rand::random::<u32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_is_unit_interval() {
        let rng = ThreadRandom;
        for _ in 0..1_000 {
            let v = rng.next_f64();
            assert!((0.0..1.0).contains(&v));
        }
    }
}
