use crate::domain::error::ValidationError;
use crate::domain::id_allocator::IdAllocator;
use crate::domain::models::{CalendarEvent, CandidateEvent, EventType, parse_calendar_date};
use std::sync::Arc;

/// Turns untrusted candidates into events for the managed academic year.
#[derive(Clone)]
pub struct ImportValidator {
    academic_year: i32,
    id_allocator: Arc<dyn IdAllocator>,
}

impl ImportValidator {
    pub fn new(academic_year: i32, id_allocator: Arc<dyn IdAllocator>) -> Self {
        Self {
            academic_year,
            id_allocator,
        }
    }

    pub fn academic_year(&self) -> i32 {
        self.academic_year
    }

    pub fn id_allocator(&self) -> &Arc<dyn IdAllocator> {
        &self.id_allocator
    }

    pub fn validate(&self, candidate: &CandidateEvent) -> Result<CalendarEvent, ValidationError> {
        let title = candidate.display_title();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let date = match non_blank(candidate.date.as_deref()) {
            Some(raw) => parse_calendar_date(raw, "event.date")?,
            None => return Err(ValidationError::MissingDate { field: "event.date" }),
        };

        let event_type = match non_blank(candidate.event_type.as_deref()) {
            Some(raw) => raw.parse::<EventType>()?,
            None => return Err(ValidationError::UnrecognizedCategory(String::new())),
        };

        let end_date = non_blank(candidate.end_date.as_deref())
            .filter(|raw| !raw.eq_ignore_ascii_case("null"))
            .map(|raw| parse_calendar_date(raw, "event.endDate"))
            .transpose()?;

        let id = non_blank(candidate.id.as_deref())
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| self.id_allocator.new_id());

        let event = CalendarEvent {
            id,
            title: title.to_string(),
            date,
            end_date,
            event_type,
            description: non_blank(candidate.description.as_deref()).map(ToOwned::to_owned),
        };
        event.validate(self.academic_year)?;
        Ok(event)
    }

    /// All-or-nothing: the first failing candidate aborts the batch.
    pub fn validate_batch(
        &self,
        candidates: &[CandidateEvent],
    ) -> Result<Vec<CalendarEvent>, ValidationError> {
        candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| {
                self.validate(candidate).map_err(|error| {
                    tracing::debug!(index, %error, "rejected import candidate");
                    ValidationError::in_batch(index, candidate.display_title(), error)
                })
            })
            .collect()
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
