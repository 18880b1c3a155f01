//! 세션 모델.
//!
//! 사용자 활동 구간을 식별하는 세션. 저장소에는 JSON 한 건으로 보존된다.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 활동 세션
///
/// 저장 형식: `{"id": string, "startedAt": number, "lastActivity": number}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// 세션 고유 ID (타임스탬프 + 랜덤 접미사)
    pub id: String,
    /// 세션 시작 시각
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    /// 마지막 활동 시각
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// 새 세션 시작
    pub fn start(id: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            started_at: now,
            last_activity: now,
        }
    }

    /// 비활동 시간이 timeout을 초과했는지 (경계값은 유효)
    pub fn is_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        now - self.last_activity > timeout
    }

    /// 활동 시각을 갱신한 세션 반환
    pub fn touched(&self, now: DateTime<Utc>) -> Self {
        Self {
            last_activity: now,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persisted_format() {
        let now = DateTime::from_timestamp_millis(1_000).unwrap();
        let session = Session::start("1000-abc".to_string(), now);
        let json = serde_json::to_string(&session).unwrap();
        assert_eq!(
            json,
            r#"{"id":"1000-abc","startedAt":1000,"lastActivity":1000}"#
        );
    }

    #[test]
    fn expiry_boundary() {
        let start = DateTime::from_timestamp_millis(0).unwrap();
        let session = Session::start("s".to_string(), start);
        let timeout = Duration::milliseconds(1_000);
        assert!(!session.is_expired(start + Duration::milliseconds(1_000), timeout));
        assert!(session.is_expired(start + Duration::milliseconds(1_001), timeout));
    }
}
