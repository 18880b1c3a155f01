//! # pagepulse-storage
//!
//! `KeyValueStore` 포트 구현.
//!
//! - `memory`: 탭 범위 저장소 (프로세스 메모리, 탭이 닫히면 사라짐)
//! - `sqlite`: 탭 간 공유 저장소 (파일 기반 SQLite)

pub mod memory;
pub mod migration;
pub mod sqlite;

pub use memory::TabStore;
pub use sqlite::SqliteStore;
