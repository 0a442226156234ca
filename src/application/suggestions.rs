use crate::application::event_store::EventStore;
use crate::domain::import_validator::ImportValidator;
use crate::domain::models::CalendarEvent;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::state_repository::StateRepository;
use crate::infrastructure::suggestion_client::SuggestionClient;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

static NEXT_BATCH: AtomicU64 = AtomicU64::new(1);

/// A validated preview batch, invisible to the store until confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingBatch {
    pub id: String,
    pub prompt: String,
    pub events: Vec<CalendarEvent>,
    pub created_at: DateTime<Utc>,
}

impl PendingBatch {
    fn new(prompt: &str, events: Vec<CalendarEvent>) -> Self {
        let sequence = NEXT_BATCH.fetch_add(1, Ordering::Relaxed);
        let created_at = Utc::now();
        Self {
            id: format!("batch-{}-{sequence}", created_at.timestamp_micros()),
            prompt: prompt.to_string(),
            events,
            created_at,
        }
    }

    pub fn confirm<R>(self, store: &EventStore<R>) -> Result<Vec<CalendarEvent>, InfraError>
    where
        R: StateRepository,
    {
        tracing::info!(batch = %self.id, count = self.events.len(), "confirming suggestion batch");
        store.merge(self.events)
    }

    pub fn reject(self) {
        tracing::info!(batch = %self.id, count = self.events.len(), "rejected suggestion batch");
    }
}

pub struct SuggestionService {
    client: Arc<dyn SuggestionClient>,
    validator: ImportValidator,
    timeout: Duration,
}

impl SuggestionService {
    pub fn new(client: Arc<dyn SuggestionClient>, validator: ImportValidator, timeout: Duration) -> Self {
        Self {
            client,
            validator,
            timeout,
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<PendingBatch, InfraError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(InfraError::Collaborator("prompt must not be empty".to_string()));
        }

        let candidates = tokio::time::timeout(self.timeout, self.client.suggest(prompt))
            .await
            .map_err(|_| InfraError::CollaboratorTimeout {
                seconds: self.timeout.as_secs(),
            })??;
        let events = self.validator.validate_batch(&candidates)?;
        let batch = PendingBatch::new(prompt, events);
        tracing::info!(batch = %batch.id, count = batch.events.len(), "generated suggestion batch");
        Ok(batch)
    }
}
