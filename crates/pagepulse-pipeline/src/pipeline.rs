//! 이벤트 파이프라인.
//!
//! 관찰자가 보고한 지표와 페이지 에러를 버퍼에 모아 전송으로 넘긴다.
//! 버퍼 추출은 동기 단계 하나에서 끝나고 전송은 그 뒤 런타임에서 비동기로 진행된다.
//! 따라서 앞선 전송이 진행 중이어도 같은 이벤트가 두 번 나가지 않는다.
//! 전송이 `send_now`로 동기 전달을 받아들이면 (언로드 중 비콘) 플러시 안에서 끝난다.
//!
//! 플러시 트리거: 배치 크기 도달, 주기 타이머, 페이지 숨김, pagehide, 해제.

use pagepulse_core::config::{EventFilter, ObserveConfig, StorageKind};
use pagepulse_core::error::CoreError;
use pagepulse_core::models::event::{ErrorEvent, ObserveEvent, UnhandledRejectionEvent};
use pagepulse_core::models::metric::Metric;
use pagepulse_core::models::page::{ErrorReport, PageSignal, RejectionReport};
use pagepulse_core::ports::clock::{Clock, SystemClock};
use pagepulse_core::ports::entry_source::PerformanceEntrySource;
use pagepulse_core::ports::page_events::PageEvents;
use pagepulse_core::ports::random::{RandomSource, ThreadRandom};
use pagepulse_core::ports::storage::KeyValueStore;
use pagepulse_core::ports::transport::Transport;
use pagepulse_core::ports::SubscriptionId;
use pagepulse_monitor::{
    start_vitals, ObserverContext, ObserverHandle, PageSignalHub, ReportCallback,
};
use pagepulse_network::HybridTransport;
use pagepulse_storage::{SqliteStore, TabStore};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::registry::{EventSink, PipelineRegistry, RegistrationToken};
use crate::sampler::Sampler;
use crate::session::SessionManager;

/// debug 설정이 켜져 있으면 info, 아니면 debug 레벨로 기록
macro_rules! pipeline_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+);
        } else {
            debug!($($arg)+);
        }
    };
}

/// 파이프라인이 사용하는 호스트 기능 묶음
#[derive(Clone)]
pub struct PipelineDeps {
    pub entries: Arc<dyn PerformanceEntrySource>,
    pub page: Arc<dyn PageEvents>,
    pub clock: Arc<dyn Clock>,
    pub random: Arc<dyn RandomSource>,
    /// 탭 범위 저장소 (`storage: "session"`)
    pub tab_store: Option<Arc<dyn KeyValueStore>>,
    /// 탭 간 공유 저장소 (`storage: "local"`)
    pub shared_store: Option<Arc<dyn KeyValueStore>>,
    pub registry: Arc<PipelineRegistry>,
}

impl PipelineDeps {
    pub fn new(entries: Arc<dyn PerformanceEntrySource>, page: Arc<dyn PageEvents>) -> Self {
        Self {
            entries,
            page,
            clock: Arc::new(SystemClock),
            random: Arc::new(ThreadRandom),
            tab_store: Some(Arc::new(TabStore::new())),
            shared_store: None,
            registry: Arc::new(PipelineRegistry::new()),
        }
    }

    /// 신호 허브 하나로 엔트리 소스와 페이지 이벤트를 모두 공급
    pub fn from_hub(hub: Arc<PageSignalHub>) -> Self {
        Self::new(hub.clone(), hub)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random(mut self, random: Arc<dyn RandomSource>) -> Self {
        self.random = random;
        self
    }

    pub fn with_tab_store(mut self, store: Option<Arc<dyn KeyValueStore>>) -> Self {
        self.tab_store = store;
        self
    }

    pub fn with_shared_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.shared_store = Some(store);
        self
    }

    /// 파일 기반 SQLite를 탭 간 공유 저장소로 사용
    pub fn with_shared_sqlite(self, path: &Path) -> Result<Self, CoreError> {
        let store = SqliteStore::open(path)?;
        Ok(self.with_shared_store(Arc::new(store)))
    }

    pub fn with_registry(mut self, registry: Arc<PipelineRegistry>) -> Self {
        self.registry = registry;
        self
    }

    fn store_for(&self, kind: StorageKind) -> Option<Arc<dyn KeyValueStore>> {
        let store = match kind {
            StorageKind::Session => self.tab_store.clone(),
            StorageKind::Local => self.shared_store.clone(),
            StorageKind::Memory => None,
        };
        if store.is_none() && kind != StorageKind::Memory {
            debug!("{kind:?} 저장소 없음 — 메모리 세션 사용");
        }
        store
    }
}

/// 파이프라인 통계
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// 현재 버퍼된 이벤트 수
    pub buffered: usize,
    /// 전송으로 넘긴 배치 수
    pub flushes: u64,
    /// 필터가 거부한 이벤트 수
    pub filtered: u64,
    /// 샘플링으로 제외된 이벤트 수
    pub sampled_out: u64,
}

#[derive(Default)]
struct Counters {
    flushes: AtomicU64,
    filtered: AtomicU64,
    sampled_out: AtomicU64,
}

struct PipelineInner {
    buffer: Mutex<Vec<ObserveEvent>>,
    transport: Arc<dyn Transport>,
    filter: Option<EventFilter>,
    sampler: Sampler,
    session: Option<SessionManager>,
    registry: Arc<PipelineRegistry>,
    clock: Arc<dyn Clock>,
    runtime: Handle,
    batch_size: usize,
    capture_errors: bool,
    verbose: bool,
    counters: Counters,
}

impl PipelineInner {
    /// 필터 → 샘플링 → 세션 부착 → 버퍼 추가 → 배치 크기 도달 시 플러시
    fn push(&self, event: ObserveEvent) {
        if let Some(filter) = &self.filter {
            if !filter(&event) {
                self.counters.filtered.fetch_add(1, Ordering::Relaxed);
                pipeline_log!(self.verbose, "필터 제외: {}", event.type_name());
                return;
            }
        }

        if !self.sampler.should_sample(event.category()) {
            self.counters.sampled_out.fetch_add(1, Ordering::Relaxed);
            pipeline_log!(self.verbose, "샘플링 제외: {}", event.type_name());
            return;
        }

        let event = match &self.session {
            Some(session) => event.with_session_id(session.get_session_id()),
            None => event,
        };

        let type_name = event.type_name();
        let len = {
            let mut buffer = self.buffer.lock();
            buffer.push(event);
            buffer.len()
        };
        pipeline_log!(self.verbose, "이벤트 버퍼 추가: {type_name}, 현재 크기: {len}");

        if len >= self.batch_size {
            self.flush();
        }
    }

    fn flush(&self) -> Option<JoinHandle<()>> {
        let events = std::mem::take(&mut *self.buffer.lock());
        if events.is_empty() {
            return None;
        }

        self.counters.flushes.fetch_add(1, Ordering::Relaxed);
        let count = events.len();
        pipeline_log!(self.verbose, "배치 플러시: {count}개 이벤트");

        if let Some(result) = self.transport.send_now(&events) {
            match result {
                Ok(()) => pipeline_log!(self.verbose, "배치 즉시 전달: {count}개 이벤트"),
                Err(e) => debug!("배치 즉시 전달 실패 (에러 콜백으로 보고됨): {e}"),
            }
            return None;
        }

        let transport = self.transport.clone();
        let verbose = self.verbose;
        Some(self.runtime.spawn(async move {
            match transport.send(&events).await {
                Ok(()) => pipeline_log!(verbose, "배치 전달 완료: {count}개 이벤트"),
                Err(e) => debug!("배치 전달 실패 (에러 콜백으로 보고됨): {e}"),
            }
        }))
    }

    fn on_page_signal(&self, signal: &PageSignal) {
        match signal {
            PageSignal::Error(report) if self.capture_errors => self.capture_error(report),
            PageSignal::UnhandledRejection(report) if self.capture_errors => {
                self.capture_rejection(report)
            }
            signal if signal.is_page_leaving() => {
                pipeline_log!(self.verbose, "페이지 이탈 — 플러시");
                self.flush();
            }
            _ => {}
        }
    }

    fn capture_error(&self, report: &ErrorReport) {
        self.push(ObserveEvent::Error(ErrorEvent {
            message: report.message.clone(),
            filename: report.filename.clone(),
            lineno: report.lineno,
            colno: report.colno,
            stack: report.stack.clone(),
            state: self.registry.state_snapshot(),
            timestamp: self.clock.now(),
            session_id: None,
        }));
    }

    fn capture_rejection(&self, report: &RejectionReport) {
        self.push(ObserveEvent::UnhandledRejection(UnhandledRejectionEvent {
            reason: report.reason.clone(),
            stack: report.stack.clone(),
            state: self.registry.state_snapshot(),
            timestamp: self.clock.now(),
            session_id: None,
        }));
    }

    fn stats(&self) -> PipelineStats {
        PipelineStats {
            buffered: self.buffer.lock().len(),
            flushes: self.counters.flushes.load(Ordering::Relaxed),
            filtered: self.counters.filtered.load(Ordering::Relaxed),
            sampled_out: self.counters.sampled_out.load(Ordering::Relaxed),
        }
    }
}

impl EventSink for PipelineInner {
    fn buffer_event(&self, event: ObserveEvent) {
        self.push(event);
    }
}

/// 이벤트 파이프라인 인스턴스
///
/// drop 시 `teardown()`과 같은 정리를 수행한다.
pub struct EventPipeline {
    inner: Arc<PipelineInner>,
    page: Arc<dyn PageEvents>,
    observers: Mutex<Vec<ObserverHandle>>,
    page_subscription: Mutex<Option<SubscriptionId>>,
    shutdown: watch::Sender<bool>,
    timer: Mutex<Option<JoinHandle<()>>>,
    registration: RegistrationToken,
    torn_down: AtomicBool,
}

impl EventPipeline {
    /// 관찰 시작. tokio 런타임 안에서 호출해야 한다.
    pub fn observe(config: ObserveConfig, deps: PipelineDeps) -> Result<Self, CoreError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| {
            CoreError::Config("observe()는 tokio 런타임 안에서 호출해야 함".to_string())
        })?;

        let settings = &config.settings;
        let transport = build_transport(&config, &deps)?;
        let session = settings.session.resolve().map(|options| {
            SessionManager::new(
                deps.store_for(options.storage),
                deps.clock.clone(),
                deps.random.clone(),
                options.timeout_ms,
            )
        });

        let inner = Arc::new(PipelineInner {
            buffer: Mutex::new(Vec::with_capacity(settings.batch_size)),
            transport,
            filter: config.filter.clone(),
            sampler: Sampler::new(settings.sampling.clone(), deps.random.clone()),
            session,
            registry: deps.registry.clone(),
            clock: deps.clock.clone(),
            runtime: runtime.clone(),
            batch_size: settings.batch_size,
            capture_errors: settings.capture_errors,
            verbose: settings.debug,
            counters: Counters::default(),
        });

        // 관찰자 (버퍼된 엔트리 재생으로 즉시 보고할 수 있음)
        let report_inner = inner.clone();
        let report: ReportCallback =
            Arc::new(move |metric: Metric| report_inner.push(ObserveEvent::vital(metric)));
        let ctx = ObserverContext::new(deps.entries.clone(), deps.page.clone(), deps.clock.clone());
        let observers = start_vitals(&settings.vitals, &ctx, report);

        let signal_inner = inner.clone();
        let page_subscription = deps
            .page
            .subscribe(Arc::new(move |signal: &PageSignal| signal_inner.on_page_signal(signal)));

        // 주기 플러시 루프
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let period = settings.flush_interval();
        let timer_inner = inner.clone();
        let timer = runtime.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        timer_inner.flush();
                    }
                    _ = shutdown_rx.changed() => {
                        debug!("주기 플러시 루프 종료");
                        break;
                    }
                }
            }
        });

        let sink: Arc<dyn EventSink> = inner.clone();
        let registration = deps.registry.register(Arc::downgrade(&sink));

        pipeline_log!(
            settings.debug,
            "파이프라인 시작: 관찰자 {}개, 배치 {}, 주기 {}ms",
            observers.iter().filter(|h| h.is_active()).count(),
            settings.batch_size,
            settings.flush_interval_ms
        );

        Ok(Self {
            inner,
            page: deps.page,
            observers: Mutex::new(observers),
            page_subscription: Mutex::new(Some(page_subscription)),
            shutdown,
            timer: Mutex::new(Some(timer)),
            registration,
            torn_down: AtomicBool::new(false),
        })
    }

    /// 이벤트 하나를 파이프라인에 넣는다
    pub fn buffer_event(&self, event: ObserveEvent) {
        self.inner.push(event);
    }

    /// 버퍼를 비우고 전송 시작.
    ///
    /// 버퍼가 비어 있거나 전송이 호출 스택 안에서 끝났으면 (언로드 중 비콘) None.
    ///
    /// 반환된 핸들을 drop해도 전송은 취소되지 않는다.
    pub fn flush(&self) -> Option<JoinHandle<()>> {
        self.inner.flush()
    }

    pub fn stats(&self) -> PipelineStats {
        self.inner.stats()
    }

    /// 세션 추적이 켜져 있으면 현재 세션 ID
    pub fn session_id(&self) -> Option<String> {
        self.inner.session.as_ref().map(SessionManager::get_session_id)
    }

    pub fn session(&self) -> Option<&SessionManager> {
        self.inner.session.as_ref()
    }

    pub fn registration(&self) -> RegistrationToken {
        self.registration
    }

    pub fn is_active(&self) -> bool {
        !self.torn_down.load(Ordering::Acquire)
    }

    /// 관찰자 해제 → 마지막 플러시 → 리스너 해제 → 타이머 중지 → 레지스트리 해제
    ///
    /// 두 번째 호출부터는 아무것도 하지 않는다.
    pub fn teardown(&self) -> Option<JoinHandle<()>> {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return None;
        }

        let observers = std::mem::take(&mut *self.observers.lock());
        for mut observer in observers {
            observer.teardown();
        }

        let last_flush = self.inner.flush();

        if let Some(id) = self.page_subscription.lock().take() {
            self.page.unsubscribe(id);
        }
        let _ = self.shutdown.send(true);
        self.timer.lock().take();
        self.inner.transport.teardown();
        self.inner.registry.unregister(self.registration);

        pipeline_log!(self.inner.verbose, "파이프라인 해제");
        last_flush
    }
}

impl Drop for EventPipeline {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// 커스텀 전송이 있으면 그것을, 없으면 엔드포인트로 하이브리드 전송 구성
fn build_transport(
    config: &ObserveConfig,
    deps: &PipelineDeps,
) -> Result<Arc<dyn Transport>, CoreError> {
    if let Some(transport) = &config.transport {
        return Ok(transport.clone());
    }
    let endpoint = config
        .settings
        .endpoint
        .as_deref()
        .ok_or_else(|| CoreError::Config("endpoint 또는 transport 중 하나가 필요함".to_string()))?;
    let transport =
        HybridTransport::for_endpoint(endpoint, deps.page.clone(), config.on_error.clone())?;
    Ok(Arc::new(transport))
}
