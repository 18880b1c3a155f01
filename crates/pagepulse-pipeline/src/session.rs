//! 세션 관리.
//!
//! 선택된 저장소에 세션 한 건을 JSON으로 보존한다. 저장소 접근이 실패하면
//! 그 뒤로는 영속화 없이 메모리 세션만 쓴다.

use chrono::Duration;
use pagepulse_core::error::CoreError;
use pagepulse_core::models::session::Session;
use pagepulse_core::ports::clock::Clock;
use pagepulse_core::ports::random::RandomSource;
use pagepulse_core::ports::storage::KeyValueStore;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// 세션 저장 키
pub const SESSION_STORAGE_KEY: &str = "pagepulse_session";

struct SessionState {
    current: Option<Session>,
    /// 저장소 장애로 메모리 전용 동작 중
    degraded: bool,
}

/// 세션 관리자
pub struct SessionManager {
    store: Option<Arc<dyn KeyValueStore>>,
    clock: Arc<dyn Clock>,
    random: Arc<dyn RandomSource>,
    timeout: Duration,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// 새 세션 관리자 생성. `store`가 None이면 메모리 전용.
    pub fn new(
        store: Option<Arc<dyn KeyValueStore>>,
        clock: Arc<dyn Clock>,
        random: Arc<dyn RandomSource>,
        timeout_ms: u64,
    ) -> Self {
        let timeout = Duration::milliseconds(i64::try_from(timeout_ms).unwrap_or(i64::MAX));
        Self {
            store,
            clock,
            random,
            timeout,
            state: Mutex::new(SessionState {
                current: None,
                degraded: false,
            }),
        }
    }

    /// 현재 세션 ID. 없거나 만료되었으면 새로 발급하고, 유효하면 활동 시각을 갱신한다.
    pub fn get_session_id(&self) -> String {
        let mut state = self.state.lock();
        let now = self.clock.now();

        let existing = self.load(&mut state).or_else(|| state.current.clone());
        let session = match existing {
            Some(session) if !session.is_expired(now, self.timeout) => session.touched(now),
            Some(expired) => {
                debug!("세션 만료: {}", expired.id);
                self.new_session()
            }
            None => self.new_session(),
        };

        self.persist(&mut state, &session);
        let id = session.id.clone();
        state.current = Some(session);
        id
    }

    /// 타임아웃과 무관하게 새 세션 시작
    pub fn reset(&self) -> String {
        let mut state = self.state.lock();
        let session = self.new_session();
        self.persist(&mut state, &session);
        let id = session.id.clone();
        state.current = Some(session);
        id
    }

    /// 메모리와 저장소의 세션 모두 삭제
    pub fn destroy(&self) {
        let mut state = self.state.lock();
        state.current = None;
        if let Some(store) = self.usable_store(&state) {
            if let Err(e) = store.remove(SESSION_STORAGE_KEY) {
                degrade(&mut state, &e);
            }
        }
    }

    /// 활동 갱신 없이 현재 세션 조회
    pub fn current(&self) -> Option<Session> {
        self.state.lock().current.clone()
    }

    /// 저장소 장애로 메모리 전용 동작 중인지
    pub fn is_degraded(&self) -> bool {
        self.state.lock().degraded
    }

    fn usable_store(&self, state: &SessionState) -> Option<&Arc<dyn KeyValueStore>> {
        if state.degraded {
            None
        } else {
            self.store.as_ref()
        }
    }

    fn load(&self, state: &mut SessionState) -> Option<Session> {
        let store = self.usable_store(state)?.clone();
        match store.get(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<Session>(&raw) {
                Ok(session) => Some(session),
                Err(e) => {
                    warn!("저장된 세션 파싱 실패 — 새 세션 발급: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                degrade(state, &e);
                None
            }
        }
    }

    fn persist(&self, state: &mut SessionState, session: &Session) {
        let Some(store) = self.usable_store(state).cloned() else {
            return;
        };
        let result = serde_json::to_string(session)
            .map_err(CoreError::from)
            .and_then(|raw| store.set(SESSION_STORAGE_KEY, &raw));
        if let Err(e) = result {
            degrade(state, &e);
        }
    }

    fn new_session(&self) -> Session {
        let now = self.clock.now();
        let id = format!(
            "{}-{}",
            now.timestamp_millis(),
            to_base36(self.random.next_u32())
        );
        debug!("새 세션 발급: {id}");
        Session::start(id, now)
    }
}

fn degrade(state: &mut SessionState, error: &CoreError) {
    if !state.degraded {
        warn!("세션 저장소 사용 불가 — 메모리 세션으로 전환: {error}");
    }
    state.degraded = true;
}

fn to_base36(mut value: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
