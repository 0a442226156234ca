//! Day-granularity range queries over events. Everything here works on
//! `NaiveDate`, so results do not depend on locale or timezone.

use crate::domain::models::{CalendarEvent, EventType};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn covers_date(event: &CalendarEvent, date: NaiveDate) -> bool {
    event.date <= date && date <= event.effective_end()
}

/// First and last day of `month` (1-based), or `None` for an invalid month.
pub fn month_bounds(year: i32, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((first, next_first.pred_opt()?))
}

pub fn overlaps_month(event: &CalendarEvent, year: i32, month: u32) -> bool {
    let Some((first, last)) = month_bounds(year, month) else {
        return false;
    };
    event.date <= last && event.effective_end() >= first
}

pub fn events_on(events: &[CalendarEvent], date: NaiveDate) -> Vec<&CalendarEvent> {
    events.iter().filter(|event| covers_date(event, date)).collect()
}

/// Events touching the month, ordered by start date.
pub fn events_in_month(events: &[CalendarEvent], year: i32, month: u32) -> Vec<&CalendarEvent> {
    let mut selected: Vec<&CalendarEvent> = events
        .iter()
        .filter(|event| overlaps_month(event, year, month))
        .collect();
    selected.sort_by_key(|event| event.date);
    selected
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthLayout {
    pub year: i32,
    pub month: u32,
    pub days_in_month: u32,
    /// Blank cells before day 1 in a Sunday-first week grid.
    pub leading_blanks: u32,
}

pub fn month_layout(year: i32, month: u32) -> Option<MonthLayout> {
    let (first, last) = month_bounds(year, month)?;
    Some(MonthLayout {
        year,
        month,
        days_in_month: last.day(),
        leading_blanks: first.weekday().num_days_from_sunday(),
    })
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub day: u32,
    pub date: NaiveDate,
    pub event_ids: Vec<String>,
    pub is_holiday: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthGrid {
    pub layout: MonthLayout,
    pub days: Vec<DayCell>,
}

pub fn month_grid(events: &[CalendarEvent], year: i32, month: u32) -> Option<MonthGrid> {
    let layout = month_layout(year, month)?;
    let month_events = events_in_month(events, year, month);

    let days = (1..=layout.days_in_month)
        .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
        .map(|date| {
            let covering: Vec<&&CalendarEvent> = month_events
                .iter()
                .filter(|event| covers_date(event, date))
                .collect();
            DayCell {
                day: date.day(),
                date,
                event_ids: covering.iter().map(|event| event.id.clone()).collect(),
                is_holiday: covering
                    .iter()
                    .any(|event| event.event_type == EventType::Cuti),
            }
        })
        .collect();

    Some(MonthGrid { layout, days })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::seed_events;
    use proptest::prelude::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn event(id: &str, start: &str, end: Option<&str>, event_type: EventType) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            title: format!("Event {id}"),
            date: date(start),
            end_date: end.map(date),
            event_type,
            description: None,
        }
    }

    #[test]
    fn mid_term_break_spans_march_and_april() {
        let break_event = event("7", "2026-03-27", Some("2026-04-04"), EventType::Cuti);
        assert!(covers_date(&break_event, date("2026-04-01")));
        assert!(covers_date(&break_event, date("2026-03-27")));
        assert!(covers_date(&break_event, date("2026-04-04")));
        assert!(!covers_date(&break_event, date("2026-04-05")));
        assert!(overlaps_month(&break_event, 2026, 3));
        assert!(overlaps_month(&break_event, 2026, 4));
        assert!(!overlaps_month(&break_event, 2026, 5));
        assert!(!overlaps_month(&break_event, 2026, 2));
    }

    #[test]
    fn invalid_month_never_overlaps() {
        let single = event("1", "2026-01-01", None, EventType::Cuti);
        assert!(!overlaps_month(&single, 2026, 0));
        assert!(!overlaps_month(&single, 2026, 13));
    }

    #[test]
    fn month_bounds_handle_leap_and_december() {
        assert_eq!(
            month_bounds(2028, 2),
            Some((date("2028-02-01"), date("2028-02-29")))
        );
        assert_eq!(
            month_bounds(2026, 12),
            Some((date("2026-12-01"), date("2026-12-31")))
        );
    }

    #[test]
    fn month_layout_for_january_2026_starts_on_thursday() {
        let layout = month_layout(2026, 1).expect("valid month");
        assert_eq!(layout.days_in_month, 31);
        assert_eq!(layout.leading_blanks, 4);
    }

    #[test]
    fn events_in_month_are_sorted_and_include_spanning_events() {
        let events = seed_events();
        let april: Vec<&str> = events_in_month(&events, 2026, 4)
            .into_iter()
            .map(|event| event.id.as_str())
            .collect();
        assert_eq!(april, vec!["7"]);

        let january: Vec<&str> = events_in_month(&events, 2026, 1)
            .into_iter()
            .map(|event| event.id.as_str())
            .collect();
        assert_eq!(january, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn month_grid_marks_holiday_days() {
        let events = seed_events();
        let grid = month_grid(&events, 2026, 4).expect("valid month");
        assert_eq!(grid.days.len(), 30);
        assert!(grid.days[0].is_holiday);
        assert_eq!(grid.days[3].event_ids, vec!["7".to_string()]);
        assert!(!grid.days[4].is_holiday);
        assert!(grid.days[4].event_ids.is_empty());

        let january = month_grid(&events, 2026, 1).expect("valid month");
        assert_eq!(january.days[5].event_ids, vec!["3".to_string()]);
        assert!(!january.days[5].is_holiday);
    }

    #[test]
    fn events_on_returns_every_covering_event() {
        let events = vec![
            event("a", "2026-06-01", Some("2026-06-10"), EventType::Cuti),
            event("b", "2026-06-05", None, EventType::Koko),
            event("c", "2026-06-06", None, EventType::Hem),
        ];
        let ids: Vec<&str> = events_on(&events, date("2026-06-05"))
            .into_iter()
            .map(|event| event.id.as_str())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    fn arb_date() -> impl Strategy<Value = NaiveDate> {
        (0i64..365).prop_map(|offset| date("2026-01-01") + chrono::Duration::days(offset))
    }

    proptest! {
        #[test]
        fn single_day_event_covers_only_its_date(start in arb_date()) {
            let single = CalendarEvent {
                id: "p".to_string(),
                title: "Single".to_string(),
                date: start,
                end_date: None,
                event_type: EventType::Kurikulum,
                description: None,
            };
            prop_assert!(covers_date(&single, start));
            prop_assert!(!covers_date(&single, start - chrono::Duration::days(1)));
            prop_assert!(!covers_date(&single, start + chrono::Duration::days(1)));
            prop_assert!(overlaps_month(&single, start.year(), start.month()));
        }

        #[test]
        fn overlap_matches_covered_day_within_month(
            start in arb_date(),
            span in 0i64..60,
            month in 1u32..=12
        ) {
            let spanning = CalendarEvent {
                id: "p".to_string(),
                title: "Span".to_string(),
                date: start,
                end_date: Some(start + chrono::Duration::days(span)),
                event_type: EventType::Cuti,
                description: None,
            };
            let (first, last) = month_bounds(2026, month).expect("valid month");
            let any_day_covered = first
                .iter_days()
                .take_while(|day| *day <= last)
                .any(|day| covers_date(&spanning, day));
            prop_assert_eq!(overlaps_month(&spanning, 2026, month), any_day_covered);
        }
    }
}
