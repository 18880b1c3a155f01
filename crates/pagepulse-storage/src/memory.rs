//! 탭 범위 메모리 저장소.

use pagepulse_core::error::CoreError;
use pagepulse_core::ports::storage::KeyValueStore;
use parking_lot::Mutex;
use std::collections::HashMap;

/// 탭 하나의 수명 동안만 유지되는 키-값 저장소
#[derive(Debug, Default)]
pub struct TabStore {
    entries: Mutex<HashMap<String, String>>,
}

impl TabStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl KeyValueStore for TabStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        self.entries
            .lock()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
