use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::{HttpResumeBackend, ResumeBackend};
use super::errors::CoreError;
use super::models::{CanonicalRecord, RecordId, RuntimeSettings, SelectedFile, ViewModel};
use super::normalizer::{normalize_record, normalize_records};
use super::session::{
    DetailModal, DropPayload, SessionState, SubmitDecision, Tab, Ticket, DETAIL_FAILED,
};
use super::view_model::derive_view_model;

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Uploaded(CanonicalRecord),
    NoFileSelected,
    AlreadySubmitting,
    Failed,
    Abandoned,
}

/// Owns the session state and applies backend completions to it. Every
/// completion re-checks the service lifetime and its request ticket before
/// touching state.
pub struct SessionService<B: ResumeBackend + 'static> {
    backend: Arc<B>,
    state: Arc<Mutex<SessionState>>,
    notice_ttl: Duration,
    notify_detail_errors: bool,
    lifetime: CancellationToken,
}

impl SessionService<HttpResumeBackend> {
    pub fn http(settings: &RuntimeSettings) -> anyhow::Result<Self> {
        let backend = HttpResumeBackend::from_settings(settings)?;
        info!("using resume backend at {}", backend.base());
        Ok(Self::new(backend, settings))
    }
}

impl<B: ResumeBackend + 'static> SessionService<B> {
    pub fn new(backend: B, settings: &RuntimeSettings) -> Self {
        Self {
            backend: Arc::new(backend),
            state: Arc::new(Mutex::new(SessionState::new())),
            notice_ttl: Duration::from_millis(settings.notice_ttl_ms),
            notify_detail_errors: settings.notify_detail_errors,
            lifetime: CancellationToken::new(),
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn select_file(&self, file: SelectedFile) -> bool {
        let accepted = self.state.lock().await.select_file(file);
        if !accepted {
            debug!("selection ignored while an upload is in flight");
        }
        accepted
    }

    pub async fn drop_payload(&self, payload: DropPayload) -> bool {
        self.state.lock().await.drop_payload(payload)
    }

    pub async fn switch_tab(&self, tab: Tab) {
        let ticket = self.state.lock().await.switch_tab(tab);
        if let Some(ticket) = ticket {
            self.load_history(ticket).await;
        }
    }

    /// Re-runs the listing fetch while the history view is showing.
    pub async fn refresh_history(&self) {
        let ticket = {
            let mut state = self.state.lock().await;
            if state.tab != Tab::History {
                return;
            }
            state.begin_history_fetch()
        };
        self.load_history(ticket).await;
    }

    pub async fn submit(&self) -> SubmitOutcome {
        let decision = self.state.lock().await.begin_submit();
        let file = match decision {
            SubmitDecision::Start(file) => file,
            SubmitDecision::NoFile(ticket) => {
                self.schedule_notice_expiry(ticket);
                return SubmitOutcome::NoFileSelected;
            }
            SubmitDecision::AlreadySubmitting => {
                debug!("submit ignored, upload already in flight");
                return SubmitOutcome::AlreadySubmitting;
            }
        };

        info!(file = %file.name, "submitting resume");
        let result = self.backend.upload(&file).await;
        let Some(mut state) = self.live_state().await else {
            return SubmitOutcome::Abandoned;
        };
        match result {
            Ok(raw) => {
                let record = normalize_record(&raw);
                info!(id = ?record.id, "upload processed");
                state.finish_submit_ok(record.clone());
                SubmitOutcome::Uploaded(record)
            }
            Err(err) => {
                warn!("upload failed: {err:#}");
                let ticket = state.finish_submit_err();
                drop(state);
                self.schedule_notice_expiry(ticket);
                SubmitOutcome::Failed
            }
        }
    }

    /// Fetches one record and opens it in the detail view. A failure leaves
    /// the modal untouched and is only surfaced when `notify_detail_errors`
    /// is enabled.
    pub async fn open_details(&self, id: &RecordId) -> bool {
        let ticket = self.state.lock().await.begin_detail();
        let result = self.backend.get_resume(id).await;
        let Some(mut state) = self.live_state().await else {
            return false;
        };
        match result {
            Ok(raw) => state.finish_detail(ticket, normalize_record(&raw)),
            Err(err) => {
                let not_found = err
                    .downcast_ref::<CoreError>()
                    .is_some_and(CoreError::is_not_found);
                if not_found {
                    debug!(%id, "resume not found");
                } else {
                    warn!(%id, "detail fetch failed: {err:#}");
                }
                if state.fail_detail(ticket) && self.notify_detail_errors {
                    let notice = state.raise_notice(DETAIL_FAILED);
                    drop(state);
                    self.schedule_notice_expiry(notice);
                }
                false
            }
        }
    }

    pub async fn close_detail(&self) {
        self.state.lock().await.close_detail();
    }

    pub async fn close_result(&self, to_history: bool) {
        let ticket = self.state.lock().await.close_result(to_history);
        if let Some(ticket) = ticket {
            self.load_history(ticket).await;
        }
    }

    pub async fn active_view(&self) -> Option<ViewModel> {
        self.state
            .lock()
            .await
            .active_result
            .as_ref()
            .map(derive_view_model)
    }

    pub async fn detail_view(&self) -> Option<ViewModel> {
        match &self.state.lock().await.detail {
            DetailModal::Open(record) => Some(derive_view_model(record)),
            DetailModal::Closed => None,
        }
    }

    pub async fn history(&self) -> Vec<CanonicalRecord> {
        self.state.lock().await.history.clone()
    }

    /// Ends the session; completions still in flight are discarded.
    pub fn shutdown(&self) {
        self.lifetime.cancel();
    }

    async fn load_history(&self, ticket: Ticket) {
        let result = self.backend.list_resumes().await;
        let Some(mut state) = self.live_state().await else {
            return;
        };
        match result {
            Ok(rows) => {
                let rows = normalize_records(&rows);
                let count = rows.len();
                if state.finish_history(ticket, rows) {
                    debug!(count, "history loaded");
                }
            }
            Err(err) => {
                warn!("history fetch failed: {err:#}");
                state.fail_history(ticket, format!("{err:#}"));
            }
        }
    }

    /// The state guard, unless the session ended before or while it was
    /// being acquired.
    async fn live_state(&self) -> Option<MutexGuard<'_, SessionState>> {
        let state = tokio::select! {
            _ = self.lifetime.cancelled() => return None,
            state = self.state.lock() => state,
        };
        if self.lifetime.is_cancelled() {
            return None;
        }
        Some(state)
    }

    fn schedule_notice_expiry(&self, ticket: Ticket) {
        let state = Arc::clone(&self.state);
        let lifetime = self.lifetime.clone();
        let ttl = self.notice_ttl;

        tokio::spawn(async move {
            tokio::select! {
                _ = lifetime.cancelled() => {}
                _ = tokio::time::sleep(ttl) => {
                    let mut state = state.lock().await;
                    if !lifetime.is_cancelled() {
                        state.expire_notice(ticket);
                    }
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use super::*;
    use crate::core::models::RawRecord;
    use crate::core::session::{UploadPhase, NO_FILE_SELECTED, UPLOAD_FAILED};

    #[derive(Default)]
    struct FakeBackend {
        upload_calls: AtomicUsize,
        list_calls: AtomicUsize,
        upload_delay_ms: u64,
        fail_upload: bool,
        records: HashMap<String, RawRecord>,
        detail_delays_ms: HashMap<String, u64>,
        list_delay_ms: u64,
        fail_list: bool,
    }

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("fixture must be an object"),
        }
    }

    #[async_trait]
    impl ResumeBackend for FakeBackend {
        async fn upload(&self, file: &SelectedFile) -> anyhow::Result<RawRecord> {
            self.upload_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.upload_delay_ms)).await;
            if self.fail_upload {
                return Err(CoreError::BackendApi {
                    status: 500,
                    body: "boom".to_string(),
                }
                .into());
            }

            Ok(raw(json!({
                "id": 77,
                "filename": file.name,
                "display_name": "Ana Silva",
                "llm_raw": "{\"name\": \"Ana Silva\", \"technical_skills\": [\"Rust\"]}"
            })))
        }

        async fn list_resumes(&self) -> anyhow::Result<Vec<RawRecord>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(self.list_delay_ms)).await;
            if self.fail_list {
                anyhow::bail!("connection refused");
            }
            Ok(self.records.values().cloned().collect())
        }

        async fn get_resume(&self, id: &RecordId) -> anyhow::Result<RawRecord> {
            let delay = self.detail_delays_ms.get(id.as_str()).copied().unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.records.get(id.as_str()).cloned().ok_or_else(|| {
                CoreError::BackendApi {
                    status: 404,
                    body: "Not found".to_string(),
                }
                .into()
            })
        }
    }

    fn settings() -> RuntimeSettings {
        RuntimeSettings::default()
    }

    fn pdf(name: &str) -> SelectedFile {
        SelectedFile::new(name, b"%PDF-1.7".to_vec())
    }

    fn notice_text(state: &SessionState) -> Option<&str> {
        state.notice.as_ref().map(|n| n.message.as_str())
    }

    #[tokio::test(start_paused = true)]
    async fn successful_upload_sets_result_and_clears_selection() {
        let service = SessionService::new(FakeBackend::default(), &settings());
        service.select_file(pdf("ana.pdf")).await;

        let outcome = service.submit().await;
        let state = service.snapshot().await;

        assert!(matches!(outcome, SubmitOutcome::Uploaded(_)));
        assert_eq!(state.upload, UploadPhase::Idle);
        assert_eq!(state.tab, Tab::Upload);
        let active = state.active_result.unwrap();
        assert_eq!(active.filename.as_deref(), Some("ana.pdf"));

        let view = service.active_view().await.unwrap();
        assert_eq!(view.name, "Ana Silva");
        assert_eq!(view.score, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn submit_without_file_makes_no_network_call() {
        let service = SessionService::new(FakeBackend::default(), &settings());

        assert_eq!(service.submit().await, SubmitOutcome::NoFileSelected);
        assert_eq!(service.backend.upload_calls.load(Ordering::SeqCst), 0);
        assert_eq!(notice_text(&service.snapshot().await), Some(NO_FILE_SELECTED));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_double_submit_makes_one_call() {
        let backend = FakeBackend {
            upload_delay_ms: 500,
            ..FakeBackend::default()
        };
        let service = SessionService::new(backend, &settings());
        service.select_file(pdf("ana.pdf")).await;

        let (first, second) = tokio::join!(service.submit(), service.submit());

        assert!(matches!(first, SubmitOutcome::Uploaded(_)));
        assert_eq!(second, SubmitOutcome::AlreadySubmitting);
        assert_eq!(service.backend.upload_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_upload_keeps_file_and_notifies() {
        let backend = FakeBackend {
            fail_upload: true,
            ..FakeBackend::default()
        };
        let service = SessionService::new(backend, &settings());
        service.select_file(pdf("ana.pdf")).await;

        assert_eq!(service.submit().await, SubmitOutcome::Failed);
        let state = service.snapshot().await;
        assert_eq!(state.upload, UploadPhase::FileSelected(pdf("ana.pdf")));
        assert_eq!(notice_text(&state), Some(UPLOAD_FAILED));
        assert!(state.active_result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn notice_clears_after_delay() {
        let service = SessionService::new(FakeBackend::default(), &settings());
        service.submit().await;

        tokio::time::sleep(Duration::from_millis(1999)).await;
        assert_eq!(notice_text(&service.snapshot().await), Some(NO_FILE_SELECTED));

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(service.snapshot().await.notice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_notice_restarts_the_delay() {
        let service = SessionService::new(FakeBackend::default(), &settings());
        service.submit().await;

        tokio::time::sleep(Duration::from_millis(1500)).await;
        service.submit().await;

        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(notice_text(&service.snapshot().await), Some(NO_FILE_SELECTED));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(service.snapshot().await.notice.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn open_details_opens_modal_and_failure_is_silent() {
        let mut records = HashMap::new();
        records.insert("1".to_string(), raw(json!({"id": 1, "file_name": "a.pdf", "name": "Ana"})));
        let backend = FakeBackend {
            records,
            ..FakeBackend::default()
        };
        let service = SessionService::new(backend, &settings());

        assert!(!service.open_details(&RecordId::new("404")).await);
        let state = service.snapshot().await;
        assert_eq!(state.detail, DetailModal::Closed);
        assert!(state.notice.is_none());

        assert!(service.open_details(&RecordId::new("1")).await);
        assert_eq!(service.detail_view().await.unwrap().name, "Ana");

        service.close_detail().await;
        assert!(service.detail_view().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn detail_failure_can_be_surfaced() {
        let settings = RuntimeSettings {
            notify_detail_errors: true,
            ..RuntimeSettings::default()
        };
        let service = SessionService::new(FakeBackend::default(), &settings);

        assert!(!service.open_details(&RecordId::new("404")).await);
        assert_eq!(notice_text(&service.snapshot().await), Some(DETAIL_FAILED));
    }

    #[tokio::test(start_paused = true)]
    async fn later_detail_request_supersedes_slow_one() {
        let mut records = HashMap::new();
        records.insert("slow".to_string(), raw(json!({"id": "slow", "name": "Slow"})));
        records.insert("fast".to_string(), raw(json!({"id": "fast", "name": "Fast"})));
        let mut detail_delays_ms = HashMap::new();
        detail_delays_ms.insert("slow".to_string(), 1000);
        let backend = FakeBackend {
            records,
            detail_delays_ms,
            ..FakeBackend::default()
        };
        let service = SessionService::new(backend, &settings());

        let slow = RecordId::new("slow");
        let fast = RecordId::new("fast");
        let (slow_applied, fast_applied) =
            tokio::join!(service.open_details(&slow), async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                service.open_details(&fast).await
            });

        assert!(!slow_applied);
        assert!(fast_applied);
        assert_eq!(service.detail_view().await.unwrap().name, "Fast");
    }

    #[tokio::test(start_paused = true)]
    async fn history_loads_on_tab_entry_and_ignores_late_rows() {
        let mut records = HashMap::new();
        records.insert("1".to_string(), raw(json!({"id": 1, "file_name": "a.pdf"})));
        let backend = FakeBackend {
            records,
            list_delay_ms: 300,
            ..FakeBackend::default()
        };
        let service = Arc::new(SessionService::new(backend, &settings()));

        service.switch_tab(Tab::History).await;
        assert_eq!(service.history().await.len(), 1);
        assert_eq!(service.history().await[0].filename.as_deref(), Some("a.pdf"));
        service.refresh_history().await;
        assert_eq!(service.backend.list_calls.load(Ordering::SeqCst), 2);

        service.switch_tab(Tab::Upload).await;
        let pending = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.switch_tab(Tab::History).await })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        service.switch_tab(Tab::Upload).await;
        pending.await.unwrap();

        let state = service.snapshot().await;
        assert_eq!(state.tab, Tab::Upload);
        assert!(!state.is_loading_history());
        assert_eq!(service.backend.list_calls.load(Ordering::SeqCst), 3);

        service.refresh_history().await;
        assert_eq!(service.backend.list_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_discards_in_flight_upload() {
        let backend = FakeBackend {
            upload_delay_ms: 1000,
            ..FakeBackend::default()
        };
        let service = Arc::new(SessionService::new(backend, &settings()));
        service.select_file(pdf("ana.pdf")).await;

        let pending = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.submit().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        service.shutdown();

        assert_eq!(pending.await.unwrap(), SubmitOutcome::Abandoned);
        assert!(service.snapshot().await.active_result.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_listing_is_distinguishable_from_empty_history() {
        let backend = FakeBackend {
            fail_list: true,
            ..FakeBackend::default()
        };
        let service = SessionService::new(backend, &settings());

        service.switch_tab(Tab::History).await;
        let state = service.snapshot().await;
        assert!(state.history.is_empty());
        assert!(!state.is_loading_history());
        assert_eq!(state.history_error.as_deref(), Some("connection refused"));

        let service = SessionService::new(FakeBackend::default(), &settings());
        service.switch_tab(Tab::History).await;
        let state = service.snapshot().await;
        assert!(state.history.is_empty());
        assert!(state.history_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_while_waiting_for_state_discards_completion() {
        let backend = FakeBackend {
            upload_delay_ms: 100,
            ..FakeBackend::default()
        };
        let service = Arc::new(SessionService::new(backend, &settings()));
        service.select_file(pdf("ana.pdf")).await;

        let pending = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.submit().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;

        let guard = service.state.lock().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        service.shutdown();
        drop(guard);

        assert_eq!(pending.await.unwrap(), SubmitOutcome::Abandoned);
        let state = service.snapshot().await;
        assert!(state.active_result.is_none());
        assert!(state.is_submitting());
    }

    #[tokio::test(start_paused = true)]
    async fn closing_result_to_history_fetches_listing() {
        let service = SessionService::new(FakeBackend::default(), &settings());
        service.select_file(pdf("ana.pdf")).await;
        service.submit().await;

        service.close_result(true).await;
        let state = service.snapshot().await;
        assert!(state.active_result.is_none());
        assert_eq!(state.tab, Tab::History);
        assert_eq!(service.backend.list_calls.load(Ordering::SeqCst), 1);
    }
}
