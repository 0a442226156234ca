use crate::domain::error::ValidationError;
use crate::domain::import_validator::ImportValidator;
use crate::domain::models::{CalendarEvent, CandidateEvent, seed_events, validate_collection};
use crate::infrastructure::collection_codec::{decode_collection, encode_collection};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::state_repository::StateRepository;
use chrono::Utc;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

const MAX_ID_ATTEMPTS: usize = 32;

/// The event collection, persisted as one record and rewritten in full on
/// every mutation. All operations run under a single lock.
pub struct EventStore<R>
where
    R: StateRepository,
{
    repository: Arc<R>,
    storage_key: String,
    validator: ImportValidator,
    write_lock: Mutex<()>,
}

impl<R> EventStore<R>
where
    R: StateRepository,
{
    pub fn new(repository: Arc<R>, storage_key: impl Into<String>, validator: ImportValidator) -> Self {
        Self {
            repository,
            storage_key: storage_key.into(),
            validator,
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    pub fn validator(&self) -> &ImportValidator {
        &self.validator
    }

    pub fn backup_key(&self) -> String {
        format!("{}.corrupt", self.storage_key)
    }

    pub fn load(&self) -> Result<Vec<CalendarEvent>, InfraError> {
        let _guard = self.lock()?;
        self.read_locked()
    }

    pub fn add(&self, mut event: CalendarEvent) -> Result<Vec<CalendarEvent>, InfraError> {
        let _guard = self.lock()?;
        let mut events = self.read_locked()?;
        let existing: HashSet<&str> = events.iter().map(|stored| stored.id.as_str()).collect();

        if event.id.trim().is_empty() {
            event.id = self.allocate_id(&existing)?;
        } else if existing.contains(event.id.as_str()) {
            return Err(ValidationError::DuplicateId(event.id).into());
        }
        event.validate(self.validator.academic_year())?;

        debug!(id = %event.id, title = %event.title, "adding event");
        events.push(event);
        self.write_locked(&events)?;
        Ok(events)
    }

    /// Removing an absent id leaves the collection unchanged.
    pub fn remove(&self, id: &str) -> Result<Vec<CalendarEvent>, InfraError> {
        self.remove_existing(id).map(|(events, _)| events)
    }

    /// Like [`EventStore::remove`], also reporting whether an event was dropped.
    pub fn remove_existing(&self, id: &str) -> Result<(Vec<CalendarEvent>, bool), InfraError> {
        let _guard = self.lock()?;
        let mut events = self.read_locked()?;
        let before = events.len();
        events.retain(|event| event.id != id);
        let removed = events.len() < before;
        if !removed {
            debug!(id, "remove of unknown event id ignored");
        }
        self.write_locked(&events)?;
        Ok((events, removed))
    }

    /// Validates the whole batch before anything is written. Missing or
    /// colliding ids are reallocated.
    pub fn merge(&self, incoming: Vec<CalendarEvent>) -> Result<Vec<CalendarEvent>, InfraError> {
        let _guard = self.lock()?;
        let mut events = self.read_locked()?;
        let mut taken: HashSet<String> = events.iter().map(|event| event.id.clone()).collect();
        let academic_year = self.validator.academic_year();

        let mut accepted = Vec::with_capacity(incoming.len());
        for (index, mut event) in incoming.into_iter().enumerate() {
            if event.id.trim().is_empty() || taken.contains(&event.id) {
                let fresh = self.allocate_id_from(&taken)?;
                if !event.id.trim().is_empty() {
                    debug!(index, previous = %event.id, id = %fresh, "reassigned colliding import id");
                }
                event.id = fresh;
            }
            event
                .validate(academic_year)
                .map_err(|error| ValidationError::in_batch(index, event.title.trim(), error))?;
            taken.insert(event.id.clone());
            accepted.push(event);
        }

        let count = accepted.len();
        events.extend(accepted);
        self.write_locked(&events)?;
        info!(count, total = events.len(), "merged event batch");
        Ok(events)
    }

    pub fn import_candidates(&self, candidates: &[CandidateEvent]) -> Result<Vec<CalendarEvent>, InfraError> {
        let batch = self.validator.validate_batch(candidates)?;
        self.merge(batch)
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>, InfraError> {
        self.write_lock
            .lock()
            .map_err(|error| InfraError::Persistence(format!("event store lock poisoned: {error}")))
    }

    fn read_locked(&self) -> Result<Vec<CalendarEvent>, InfraError> {
        let Some(raw) = self.repository.read(&self.storage_key)? else {
            info!(key = %self.storage_key, "no stored events, writing seed collection");
            return self.reseed_locked();
        };

        let academic_year = self.validator.academic_year();
        let checked = decode_collection(&raw).and_then(|decoded| {
            validate_collection(&decoded.events, academic_year)?;
            Ok(decoded)
        });

        match checked {
            Ok(decoded) => {
                if decoded.legacy {
                    debug!(key = %self.storage_key, "read legacy event payload without schema envelope");
                }
                Ok(decoded.events)
            }
            Err(error) => {
                let backup_key = self.backup_key();
                warn!(
                    key = %self.storage_key,
                    backup = %backup_key,
                    %error,
                    "stored events are unreadable or invalid, keeping a backup and reseeding"
                );
                self.repository.write(&backup_key, &raw)?;
                self.reseed_locked()
            }
        }
    }

    /// Seeds only the founding events that fall in the managed year.
    fn reseed_locked(&self) -> Result<Vec<CalendarEvent>, InfraError> {
        let academic_year = self.validator.academic_year();
        let seed: Vec<CalendarEvent> = seed_events()
            .into_iter()
            .filter(|event| event.validate(academic_year).is_ok())
            .collect();
        if seed.is_empty() {
            info!(academic_year, "no seed events for this academic year, starting empty");
        }
        self.write_locked(&seed)?;
        Ok(seed)
    }

    fn write_locked(&self, events: &[CalendarEvent]) -> Result<(), InfraError> {
        let encoded = encode_collection(events)?;
        self.repository.write(&self.storage_key, &encoded)
    }

    fn allocate_id(&self, existing: &HashSet<&str>) -> Result<String, InfraError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.validator.id_allocator().new_id();
            if !existing.contains(candidate.as_str()) {
                return Ok(candidate);
            }
        }
        Err(id_exhausted())
    }

    fn allocate_id_from(&self, taken: &HashSet<String>) -> Result<String, InfraError> {
        for _ in 0..MAX_ID_ATTEMPTS {
            let candidate = self.validator.id_allocator().new_id();
            if !taken.contains(&candidate) {
                return Ok(candidate);
            }
        }
        Err(id_exhausted())
    }
}

fn id_exhausted() -> InfraError {
    InfraError::Persistence(format!(
        "could not allocate a unique event id after {MAX_ID_ATTEMPTS} attempts at {}",
        Utc::now().to_rfc3339()
    ))
}
