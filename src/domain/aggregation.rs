use crate::domain::date_range::covers_date;
use crate::domain::models::{CalendarEvent, EventType};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Short month labels for the monthly load chart.
pub const MONTH_SHORT_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mac", "Apr", "Mei", "Jun", "Jul", "Ogo", "Sep", "Okt", "Nov", "Dis",
];

pub fn count_by_type(events: &[CalendarEvent]) -> BTreeMap<EventType, usize> {
    let mut counts: BTreeMap<EventType, usize> =
        EventType::ALL.into_iter().map(|event_type| (event_type, 0)).collect();
    for event in events {
        *counts.entry(event.event_type).or_insert(0) += 1;
    }
    counts
}

/// Events per start month, January first. Spans are not spread over the
/// months they cross.
pub fn monthly_load(events: &[CalendarEvent], year: i32) -> [usize; 12] {
    let mut months = [0usize; 12];
    for event in events.iter().filter(|event| event.date.year() == year) {
        months[event.date.month0() as usize] += 1;
    }
    months
}

/// Events ordered by start date. Ties keep collection order.
pub fn sorted_by_date(events: &[CalendarEvent]) -> Vec<CalendarEvent> {
    let mut sorted = events.to_vec();
    sorted.sort_by_key(|event| event.date);
    sorted
}

/// Earliest `limit` events by start date over the whole collection.
pub fn upcoming(events: &[CalendarEvent], limit: usize) -> Vec<CalendarEvent> {
    let mut sorted = sorted_by_date(events);
    sorted.truncate(limit);
    sorted
}

/// Like [`upcoming`], but skips events that ended before `reference`.
pub fn upcoming_from(
    events: &[CalendarEvent],
    reference: NaiveDate,
    limit: usize,
) -> Vec<CalendarEvent> {
    let mut sorted: Vec<&CalendarEvent> = events
        .iter()
        .filter(|event| event.effective_end() >= reference)
        .collect();
    sorted.sort_by_key(|event| event.date);
    sorted.into_iter().take(limit).cloned().collect()
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub event_type: EventType,
    pub count: usize,
    pub share: f64,
}

/// Category proportions for the distribution chart; empty categories are left out.
pub fn category_distribution(events: &[CalendarEvent]) -> Vec<CategoryShare> {
    let total = events.len();
    count_by_type(events)
        .into_iter()
        .filter(|(_, count)| *count > 0)
        .map(|(event_type, count)| CategoryShare {
            event_type,
            count,
            share: count as f64 / total as f64,
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_events: usize,
    pub cuti: usize,
    pub kurikulum: usize,
    pub hem: usize,
    pub koko: usize,
    pub diniah: usize,
    pub pentadbiran: usize,
}

pub fn dashboard_stats(events: &[CalendarEvent]) -> DashboardStats {
    let counts = count_by_type(events);
    let count = |event_type: EventType| counts.get(&event_type).copied().unwrap_or(0);
    DashboardStats {
        total_events: events.len(),
        cuti: count(EventType::Cuti),
        kurikulum: count(EventType::Kurikulum),
        hem: count(EventType::Hem),
        koko: count(EventType::Koko),
        diniah: count(EventType::Diniah),
        pentadbiran: count(EventType::PentadbiranAm),
    }
}

/// Number of events running on `date`, for the "today" badge.
pub fn active_on(events: &[CalendarEvent], date: NaiveDate) -> usize {
    events.iter().filter(|event| covers_date(event, date)).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::seed_events;
    use proptest::prelude::*;

    fn date(value: &str) -> NaiveDate {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("valid date")
    }

    fn event(id: &str, start: &str, event_type: EventType) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            title: format!("Event {id}"),
            date: date(start),
            end_date: None,
            event_type,
            description: None,
        }
    }

    #[test]
    fn monthly_load_over_seed_counts_start_months() {
        let seeds = seed_events();
        let load = monthly_load(&seeds, 2026);
        assert_eq!(load, [4, 1, 1, 0, 0, 0, 0, 0, 1, 0, 0, 0]);
        assert_eq!(load.iter().sum::<usize>(), seeds.len());
    }

    #[test]
    fn upcoming_over_seed_returns_five_earliest() {
        let seeds = seed_events();
        let earliest = upcoming(&seeds, 5);
        let ids: Vec<&str> = earliest.iter().map(|event| event.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(earliest[0].date, date("2026-01-01"));
        assert!(earliest.windows(2).all(|pair| pair[0].date <= pair[1].date));
        assert_eq!(seeds, seed_events());
    }

    #[test]
    fn upcoming_returns_whole_collection_when_smaller_than_limit() {
        let events = vec![event("b", "2026-12-01", EventType::Koko), event("a", "2026-01-01", EventType::Hem)];
        let result = upcoming(&events, 5);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].id, "a");
    }

    #[test]
    fn upcoming_breaks_ties_by_collection_order() {
        let events = vec![
            event("z", "2026-03-01", EventType::Koko),
            event("a", "2026-03-01", EventType::Hem),
            event("m", "2026-02-01", EventType::Cuti),
        ];
        let ids: Vec<String> = upcoming(&events, 3).into_iter().map(|event| event.id).collect();
        assert_eq!(ids, vec!["m", "z", "a"]);
    }

    #[test]
    fn sorted_by_date_is_stable_and_non_destructive() {
        let events = vec![
            event("late", "2026-11-02", EventType::Koko),
            event("first", "2026-02-10", EventType::Hem),
            event("second", "2026-02-10", EventType::Cuti),
            event("early", "2026-01-05", EventType::Diniah),
        ];
        let ids: Vec<String> = sorted_by_date(&events).into_iter().map(|event| event.id).collect();
        assert_eq!(ids, vec!["early", "first", "second", "late"]);
        assert_eq!(events[0].id, "late");
    }

    #[test]
    fn upcoming_from_skips_finished_events() {
        let seeds = seed_events();
        let ids: Vec<String> = upcoming_from(&seeds, date("2026-04-01"), 5)
            .into_iter()
            .map(|event| event.id)
            .collect();
        assert_eq!(ids, vec!["7", "6"]);
    }

    #[test]
    fn count_by_type_includes_every_category() {
        let counts = count_by_type(&seed_events());
        assert_eq!(counts.len(), 6);
        assert_eq!(counts[&EventType::Cuti], 2);
        assert_eq!(counts[&EventType::Kurikulum], 1);
        assert_eq!(counts[&EventType::PentadbiranAm], 1);

        let empty = count_by_type(&[]);
        assert!(empty.values().all(|count| *count == 0));
    }

    #[test]
    fn distribution_excludes_empty_categories() {
        let events = vec![
            event("1", "2026-01-01", EventType::Cuti),
            event("2", "2026-01-02", EventType::Cuti),
            event("3", "2026-01-03", EventType::Koko),
        ];
        let distribution = category_distribution(&events);
        assert_eq!(distribution.len(), 2);
        assert_eq!(distribution[0].event_type, EventType::Cuti);
        assert_eq!(distribution[0].count, 2);
        assert!((distribution[0].share - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!(category_distribution(&[]).is_empty());
    }

    #[test]
    fn dashboard_stats_match_seed() {
        let stats = dashboard_stats(&seed_events());
        assert_eq!(
            stats,
            DashboardStats {
                total_events: 7,
                cuti: 2,
                kurikulum: 1,
                hem: 1,
                koko: 1,
                diniah: 1,
                pentadbiran: 1,
            }
        );
    }

    #[test]
    fn active_on_counts_spanning_events() {
        let seeds = seed_events();
        assert_eq!(active_on(&seeds, date("2026-01-07")), 1);
        assert_eq!(active_on(&seeds, date("2026-06-07")), 0);
    }

    fn arb_events() -> impl Strategy<Value = Vec<CalendarEvent>> {
        prop::collection::vec((0i64..365, 0usize..6), 0..40).prop_map(|items| {
            items
                .into_iter()
                .enumerate()
                .map(|(index, (offset, type_index))| CalendarEvent {
                    id: index.to_string(),
                    title: format!("Event {index}"),
                    date: date("2026-01-01") + chrono::Duration::days(offset),
                    end_date: None,
                    event_type: EventType::ALL[type_index],
                    description: None,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn monthly_load_sums_to_collection_size(events in arb_events()) {
            prop_assert_eq!(monthly_load(&events, 2026).iter().sum::<usize>(), events.len());
        }

        #[test]
        fn category_counts_sum_to_collection_size(events in arb_events()) {
            prop_assert_eq!(count_by_type(&events).values().sum::<usize>(), events.len());
            let shares: f64 = category_distribution(&events).iter().map(|entry| entry.share).sum();
            if !events.is_empty() {
                prop_assert!((shares - 1.0).abs() < 1e-9);
            }
        }

        #[test]
        fn upcoming_is_sorted_prefix(events in arb_events(), limit in 0usize..10) {
            let result = upcoming(&events, limit);
            prop_assert_eq!(result.len(), limit.min(events.len()));
            prop_assert!(result.windows(2).all(|pair| pair[0].date <= pair[1].date));
            if let (Some(last), true) = (result.last(), result.len() < events.len()) {
                let selected: Vec<&str> = result.iter().map(|event| event.id.as_str()).collect();
                prop_assert!(events
                    .iter()
                    .filter(|event| !selected.contains(&event.id.as_str()))
                    .all(|event| event.date >= last.date));
            }
        }
    }
}
