//! SQLite 공유 저장소.
//!
//! 같은 파일을 여는 모든 탭이 값을 공유한다.

use pagepulse_core::error::CoreError;
use pagepulse_core::ports::storage::KeyValueStore;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

use crate::migration;

/// SQLite 키-값 저장소: `KeyValueStore` 포트 구현
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// 파일 기반 저장소 생성
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let conn = Connection::open(path)
            .map_err(|e| CoreError::Storage(format!("SQLite 열기 실패: {e}")))?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA busy_timeout=2000;
            ",
        )
        .map_err(|e| CoreError::Storage(format!("PRAGMA 설정 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        info!("SQLite 저장소 초기화: {}", path.display());
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 인메모리 저장소 생성 (테스트용)
    pub fn open_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| CoreError::Storage(format!("인메모리 SQLite 생성 실패: {e}")))?;

        migration::run_migrations(&conn)
            .map_err(|e| CoreError::Storage(format!("마이그레이션 실패: {e}")))?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, CoreError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| CoreError::Storage(format!("값 조회 실패: {e}")))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value],
        )
        .map_err(|e| CoreError::Storage(format!("값 저장 실패: {e}")))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), CoreError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
            .map_err(|e| CoreError::Storage(format!("값 삭제 실패: {e}")))?;
        Ok(())
    }
}
