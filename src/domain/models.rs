use crate::domain::error::ValidationError;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_ACADEMIC_YEAR: i32 = 2026;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventType {
    #[serde(rename = "Cuti")]
    Cuti,
    #[serde(rename = "Kurikulum")]
    Kurikulum,
    #[serde(rename = "HEM")]
    Hem,
    #[serde(rename = "Koko")]
    Koko,
    #[serde(rename = "Diniah")]
    Diniah,
    #[serde(rename = "Pentadbiran Am")]
    PentadbiranAm,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::Cuti,
        EventType::Kurikulum,
        EventType::Hem,
        EventType::Koko,
        EventType::Diniah,
        EventType::PentadbiranAm,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Cuti => "Cuti",
            Self::Kurikulum => "Kurikulum",
            Self::Hem => "HEM",
            Self::Koko => "Koko",
            Self::Diniah => "Diniah",
            Self::PentadbiranAm => "Pentadbiran Am",
        }
    }

    /// What the category covers, as given to the suggestion service.
    pub fn scope_hint(self) -> &'static str {
        match self {
            Self::Cuti => "Holidays, Breaks",
            Self::Kurikulum => "Academic, Exams, Classes",
            Self::Hem => "Student Affairs, Discipline, Welfare",
            Self::Koko => "Co-curriculum, Sports, Clubs",
            Self::Diniah => "Religious events, Islamic studies, spiritual programs",
            Self::PentadbiranAm => "Administration, Registration, Teachers Meeting",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EventType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        EventType::ALL
            .into_iter()
            .find(|candidate| candidate.label() == trimmed)
            .ok_or_else(|| ValidationError::UnrecognizedCategory(value.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CalendarEvent {
    pub fn effective_end(&self) -> NaiveDate {
        self.end_date.unwrap_or(self.date)
    }

    pub fn is_multi_day(&self) -> bool {
        self.effective_end() > self.date
    }

    pub fn validate(&self, academic_year: i32) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if self.date.year() != academic_year {
            return Err(ValidationError::OutsideAcademicYear {
                field: "event.date",
                date: self.date,
                year: academic_year,
            });
        }
        if let Some(end_date) = self.end_date {
            if end_date < self.date {
                return Err(ValidationError::EndBeforeStart {
                    date: self.date,
                    end_date,
                });
            }
        }
        Ok(())
    }
}

/// Checks every event and id uniqueness; the first failure carries its index.
pub fn validate_collection(events: &[CalendarEvent], academic_year: i32) -> Result<(), ValidationError> {
    let mut seen = HashSet::with_capacity(events.len());
    for (index, event) in events.iter().enumerate() {
        event
            .validate(academic_year)
            .map_err(|error| ValidationError::in_batch(index, event.title.trim(), error))?;
        if !seen.insert(event.id.as_str()) {
            return Err(ValidationError::in_batch(
                index,
                event.title.trim(),
                ValidationError::DuplicateId(event.id.clone()),
            ));
        }
    }
    Ok(())
}

/// Untrusted event shape from the suggestion service or a bulk import file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CandidateEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, rename = "type")]
    pub event_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CandidateEvent {
    pub fn display_title(&self) -> &str {
        self.title.as_deref().map(str::trim).unwrap_or("")
    }
}

/// Parses a calendar date, dropping any time-of-day suffix.
pub fn parse_calendar_date(value: &str, field: &'static str) -> Result<NaiveDate, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingDate { field });
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date_time) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(date_time.date_naive());
    }
    if let Ok(date_time) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(date_time.date());
    }
    Err(ValidationError::MalformedDate {
        field,
        value: value.to_string(),
    })
}

pub fn seed_events() -> Vec<CalendarEvent> {
    fn seed(
        id: &str,
        title: &str,
        date: (i32, u32, u32),
        end_date: Option<(i32, u32, u32)>,
        event_type: EventType,
        description: &str,
    ) -> CalendarEvent {
        let to_date = |(year, month, day): (i32, u32, u32)| {
            NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
        };
        CalendarEvent {
            id: id.to_string(),
            title: title.to_string(),
            date: to_date(date),
            end_date: end_date.map(to_date),
            event_type,
            description: Some(description.to_string()),
        }
    }

    vec![
        seed("1", "Cuti Tahun Baru", (2026, 1, 1), None, EventType::Cuti, "Cuti Umum"),
        seed(
            "2",
            "Hari Pendaftaran Sesi Baru",
            (2026, 1, 3),
            Some((2026, 1, 4)),
            EventType::PentadbiranAm,
            "Pendaftaran Murid Tahun 1",
        ),
        seed(
            "3",
            "Minggu Orientasi",
            (2026, 1, 5),
            Some((2026, 1, 9)),
            EventType::Hem,
            "Untuk semua murid baru",
        ),
        seed(
            "4",
            "Mesyuarat Guru Bil 1",
            (2026, 1, 15),
            None,
            EventType::Kurikulum,
            "Perancangan Tahunan",
        ),
        seed(
            "5",
            "Latihan Rumah Sukan",
            (2026, 2, 4),
            None,
            EventType::Koko,
            "Persiapan Hari Sukan",
        ),
        seed(
            "6",
            "Sambutan Maulidur Rasul",
            (2026, 9, 4),
            None,
            EventType::Diniah,
            "Perarakan dan Ceramah",
        ),
        seed(
            "7",
            "Cuti Pertengahan Penggal 1",
            (2026, 3, 27),
            Some((2026, 4, 4)),
            EventType::Cuti,
            "Cuti Sekolah",
        ),
    ]
}
