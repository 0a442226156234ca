use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("event.id must not be empty")]
    EmptyId,
    #[error("event.title must not be empty")]
    EmptyTitle,
    #[error("{field} is required")]
    MissingDate { field: &'static str },
    #[error("{field} must be YYYY-MM-DD, got '{value}'")]
    MalformedDate { field: &'static str, value: String },
    #[error("{field} {date} is outside academic year {year}")]
    OutsideAcademicYear {
        field: &'static str,
        date: NaiveDate,
        year: i32,
    },
    #[error("event.endDate {end_date} is before event.date {date}")]
    EndBeforeStart { date: NaiveDate, end_date: NaiveDate },
    #[error("unrecognized event category '{0}'")]
    UnrecognizedCategory(String),
    #[error("event id '{0}' already exists")]
    DuplicateId(String),
    #[error("candidate #{index} ('{title}'): {source}")]
    InBatch {
        index: usize,
        title: String,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    pub fn in_batch(index: usize, title: impl Into<String>, source: ValidationError) -> Self {
        Self::InBatch {
            index,
            title: title.into(),
            source: Box::new(source),
        }
    }

    /// The rule that failed, unwrapping batch context.
    pub fn root(&self) -> &ValidationError {
        match self {
            Self::InBatch { source, .. } => source.root(),
            other => other,
        }
    }
}
