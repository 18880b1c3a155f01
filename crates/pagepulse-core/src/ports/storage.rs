//! 키-값 저장소 포트.
//!
//! 세션 영속화용. 구현: `pagepulse-storage` crate (탭 범위 메모리, SQLite 공유)

use crate::error::CoreError;

/// 동기 키-값 저장소 (get/set/remove)
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError>;

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError>;

    fn remove(&self, key: &str) -> Result<(), CoreError>;
}
