use crate::application::bootstrap::bootstrap_workspace;
use crate::application::event_store::EventStore;
use crate::application::suggestions::{PendingBatch, SuggestionService};
use crate::domain::aggregation::{
    CategoryShare, DashboardStats, MONTH_SHORT_LABELS, active_on, category_distribution,
    dashboard_stats, monthly_load, sorted_by_date, upcoming,
};
use crate::domain::date_range::{MONTH_NAMES, MonthGrid, events_in_month, month_grid};
use crate::domain::error::ValidationError;
use crate::domain::id_allocator::SequentialIdAllocator;
use crate::domain::import_validator::ImportValidator;
use crate::domain::models::{CalendarEvent, CandidateEvent};
use crate::infrastructure::config::{AppConfig, optional_lookup_value};
use crate::infrastructure::credential_store::{
    CredentialStore, KeyringCredentialStore, resolve_secret,
};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::state_repository::SqliteStateRepository;
use crate::infrastructure::suggestion_client::{
    ReqwestGeminiClient, SuggestionClient, SuggestionDirective,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const API_KEY_ENV_KEYS: [&str; 3] = ["TAKWIM_GEMINI_API_KEY", "GEMINI_API_KEY", "API_KEY"];
const MODEL_ENV_KEYS: [&str; 2] = ["TAKWIM_GEMINI_MODEL", "GEMINI_MODEL"];
const ADMIN_SECRET_ENV_KEYS: [&str; 1] = ["TAKWIM_ADMIN_SECRET"];

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct AppState {
    logs_dir: PathBuf,
    config: AppConfig,
    store: EventStore<SqliteStateRepository>,
    session: Mutex<SessionState>,
    admin_credentials: Arc<dyn CredentialStore>,
    api_key_credentials: Arc<dyn CredentialStore>,
    suggestion_client: Option<Arc<dyn SuggestionClient>>,
    env_lookup: EnvLookup,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config = bootstrap.config;
        let validator = ImportValidator::new(
            config.academic_year,
            Arc::new(SequentialIdAllocator::default()),
        );
        let store = EventStore::new(
            Arc::new(SqliteStateRepository::new(&bootstrap.database_path)),
            config.storage_key.clone(),
            validator,
        );

        Ok(Self {
            logs_dir: workspace_root.join("logs"),
            config,
            store,
            session: Mutex::new(SessionState::default()),
            admin_credentials: Arc::new(KeyringCredentialStore::admin_secret()),
            api_key_credentials: Arc::new(KeyringCredentialStore::api_key()),
            suggestion_client: None,
            env_lookup: Arc::new(|key: &str| std::env::var(key).ok()),
            log_guard: Mutex::new(()),
        })
    }

    pub fn with_admin_credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.admin_credentials = store;
        self
    }

    pub fn with_api_key_credentials(mut self, store: Arc<dyn CredentialStore>) -> Self {
        self.api_key_credentials = store;
        self
    }

    /// Replaces the HTTP collaborator, e.g. with a local model or a fake.
    pub fn with_suggestion_client(mut self, client: Arc<dyn SuggestionClient>) -> Self {
        self.suggestion_client = Some(client);
        self
    }

    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env_lookup = Arc::new(lookup);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    fn lookup(&self, key: &str) -> Option<String> {
        (self.env_lookup)(key)
    }

    fn today(&self) -> Result<NaiveDate, InfraError> {
        let tz = self.config.time_zone()?;
        Ok(Utc::now().with_timezone(&tz).date_naive())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    authorized: bool,
    pending: Option<PendingBatch>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authorized: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_batch_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ImportResponse {
    pub imported: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PendingBatchResponse {
    pub batch_id: String,
    pub prompt: String,
    pub created_at: String,
    pub events: Vec<CalendarEvent>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyLoadEntry {
    pub month: u32,
    pub label: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub stats: DashboardStats,
    pub distribution: Vec<CategoryShare>,
    pub monthly: Vec<MonthlyLoadEntry>,
    pub upcoming: Vec<CalendarEvent>,
    pub active_today: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthViewResponse {
    pub month_name: String,
    pub grid: MonthGrid,
    pub events: Vec<CalendarEvent>,
}

pub fn session_impl(state: &AppState) -> Result<SessionResponse, InfraError> {
    let session = lock_session(state)?;
    Ok(SessionResponse {
        authorized: session.authorized,
        pending_batch_id: session.pending.as_ref().map(|batch| batch.id.clone()),
    })
}

pub fn login_impl(state: &AppState, secret: String) -> Result<SessionResponse, InfraError> {
    let lookup = |key: &str| state.lookup(key);
    let expected = resolve_secret(&lookup, &ADMIN_SECRET_ENV_KEYS, state.admin_credentials.as_ref())?
        .ok_or_else(|| InfraError::InvalidConfig("admin secret is not configured".to_string()))?;
    let expected = expected.trim();

    if secret.trim().is_empty() || secret.trim() != expected {
        state.log_error("login", "rejected admin login");
        return Err(InfraError::Unauthorized);
    }

    let mut session = lock_session(state)?;
    session.authorized = true;
    drop(session);
    state.log_info("login", "admin session started");
    session_impl(state)
}

pub fn logout_impl(state: &AppState) -> Result<SessionResponse, InfraError> {
    let mut session = lock_session(state)?;
    session.authorized = false;
    if let Some(batch) = session.pending.take() {
        batch.reject();
    }
    drop(session);
    state.log_info("logout", "admin session ended");
    session_impl(state)
}

/// All events ordered by start date.
pub fn list_events_impl(state: &AppState) -> Result<Vec<CalendarEvent>, InfraError> {
    Ok(sorted_by_date(&state.store.load()?))
}

pub fn add_event_impl(state: &AppState, candidate: CandidateEvent) -> Result<CalendarEvent, InfraError> {
    require_admin(state)?;
    let event = state.store.validator().validate(&CandidateEvent {
        id: None,
        ..candidate
    })?;
    state.store.add(event.clone())?;
    state.log_info(
        "add_event",
        &format!("added event_id={} date={}", event.id, event.date),
    );
    Ok(event)
}

pub fn delete_event_impl(state: &AppState, event_id: String) -> Result<bool, InfraError> {
    require_admin(state)?;
    let event_id = event_id.trim();
    if event_id.is_empty() {
        return Err(ValidationError::EmptyId.into());
    }

    let (_, removed) = state.store.remove_existing(event_id)?;
    if removed {
        state.log_info("delete_event", &format!("deleted event_id={event_id}"));
    }
    Ok(removed)
}

/// Bulk import of a JSON array of candidate events, validated as one batch.
pub fn import_json_impl(state: &AppState, payload: String) -> Result<ImportResponse, InfraError> {
    require_admin(state)?;
    let candidates: Vec<CandidateEvent> = serde_json::from_str(payload.trim())?;
    let imported = candidates.len();
    let total = state.store.import_candidates(&candidates)?.len();
    state.log_info("import_json", &format!("imported={imported} total={total}"));
    Ok(ImportResponse { imported, total })
}

pub async fn generate_suggestions_impl(
    state: &AppState,
    prompt: String,
) -> Result<PendingBatchResponse, InfraError> {
    require_admin(state)?;
    let service = suggestion_service(state)?;
    let batch = service.generate(&prompt).await?;
    let response = to_pending_batch_response(&batch);

    let mut session = lock_session(state)?;
    if !session.authorized {
        drop(session);
        batch.reject();
        state.log_error("generate_suggestions", "session ended before generation finished");
        return Err(InfraError::Unauthorized);
    }
    if let Some(previous) = session.pending.replace(batch) {
        previous.reject();
    }
    drop(session);

    state.log_info(
        "generate_suggestions",
        &format!("batch_id={} events={}", response.batch_id, response.events.len()),
    );
    Ok(response)
}

pub fn confirm_import_impl(state: &AppState, batch_id: String) -> Result<ImportResponse, InfraError> {
    require_admin(state)?;
    let batch = take_pending(state, &batch_id)?;
    let imported = batch.events.len();
    let total = batch.confirm(&state.store)?.len();
    state.log_info(
        "confirm_import",
        &format!("batch_id={} imported={imported} total={total}", batch_id.trim()),
    );
    Ok(ImportResponse { imported, total })
}

pub fn reject_import_impl(state: &AppState, batch_id: String) -> Result<bool, InfraError> {
    require_admin(state)?;
    take_pending(state, &batch_id)?.reject();
    state.log_info("reject_import", &format!("batch_id={}", batch_id.trim()));
    Ok(true)
}

pub fn dashboard_impl(state: &AppState) -> Result<DashboardResponse, InfraError> {
    let events = state.store.load()?;
    let monthly = monthly_load(&events, state.config.academic_year)
        .into_iter()
        .enumerate()
        .map(|(index, count)| MonthlyLoadEntry {
            month: index as u32 + 1,
            label: MONTH_SHORT_LABELS[index].to_string(),
            count,
        })
        .collect();

    Ok(DashboardResponse {
        stats: dashboard_stats(&events),
        distribution: category_distribution(&events),
        monthly,
        upcoming: upcoming(&events, state.config.upcoming_limit),
        active_today: active_on(&events, state.today()?),
    })
}

/// Month grid plus the events touching it. Without an explicit month the
/// view opens on the current month when it falls in the academic year, and
/// on January of that year otherwise.
pub fn month_view_impl(
    state: &AppState,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<MonthViewResponse, InfraError> {
    let (year, month) = match (year, month) {
        (Some(year), Some(month)) => (year, month),
        (year, month) => {
            let today = state.today()?;
            let year = year.unwrap_or(state.config.academic_year);
            let month = month.unwrap_or(if today.year() == year { today.month() } else { 1 });
            (year, month)
        }
    };

    let events = state.store.load()?;
    let grid = month_grid(&events, year, month).ok_or_else(|| {
        InfraError::InvalidConfig(format!("month must be 1-12, got {month}"))
    })?;
    let month_events = events_in_month(&events, year, month)
        .into_iter()
        .cloned()
        .collect();

    Ok(MonthViewResponse {
        month_name: format!("{} {year}", MONTH_NAMES[month as usize - 1]),
        grid,
        events: month_events,
    })
}

fn lock_session(state: &AppState) -> Result<MutexGuard<'_, SessionState>, InfraError> {
    state
        .session
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("session lock poisoned: {error}")))
}

fn require_admin(state: &AppState) -> Result<(), InfraError> {
    if lock_session(state)?.authorized {
        Ok(())
    } else {
        Err(InfraError::Unauthorized)
    }
}

fn take_pending(state: &AppState, batch_id: &str) -> Result<PendingBatch, InfraError> {
    let batch_id = batch_id.trim();
    let mut session = lock_session(state)?;
    match session.pending.take() {
        Some(batch) if batch.id == batch_id => Ok(batch),
        other => {
            session.pending = other;
            Err(InfraError::NoPendingBatch(batch_id.to_string()))
        }
    }
}

fn suggestion_service(state: &AppState) -> Result<SuggestionService, InfraError> {
    let client = match &state.suggestion_client {
        Some(client) => Arc::clone(client),
        None => {
            let lookup = |key: &str| state.lookup(key);
            let api_key = resolve_secret(&lookup, &API_KEY_ENV_KEYS, state.api_key_credentials.as_ref())?
                .ok_or_else(|| InfraError::Credential("suggestion api key is not configured".to_string()))?;
            let model = optional_lookup_value(&lookup, &MODEL_ENV_KEYS)
                .unwrap_or_else(|| state.config.suggestion.model.clone());
            let directive = SuggestionDirective {
                school_name: state.config.school_name.clone(),
                academic_year: state.config.academic_year,
            };
            Arc::new(ReqwestGeminiClient::new(api_key, model, directive)) as Arc<dyn SuggestionClient>
        }
    };

    Ok(SuggestionService::new(
        client,
        state.store.validator().clone(),
        Duration::from_secs(state.config.suggestion.timeout_seconds),
    ))
}

fn to_pending_batch_response(batch: &PendingBatch) -> PendingBatchResponse {
    PendingBatchResponse {
        batch_id: batch.id.clone(),
        prompt: batch.prompt.clone(),
        created_at: batch.created_at.to_rfc3339(),
        events: batch.events.clone(),
    }
}
