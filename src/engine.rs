//! Local filter/sort pipeline over the current record set.
//!
//! Stages run in a fixed order: search, category, view, sort. The engine
//! only reads precomputed upstream fields (`daysToSubmit`,
//! `submissionOpen`); it never looks at the clock.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::RegexSet;
use serde::Serialize;

use crate::filters::{FilterState, SortKey, ViewMode};
use crate::models::Event;

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static MONTH_SET: Lazy<RegexSet> = Lazy::new(|| {
    RegexSet::new(MONTHS.iter().map(|month| format!("(?i){month}"))).expect("valid month set")
});

/// Filters and orders `records` for `filters`, returning borrowed records.
pub fn apply<'a>(records: &'a [Event], filters: &FilterState) -> Vec<&'a Event> {
    let needle = filters.search.to_lowercase();

    let mut result: Vec<&Event> = records
        .iter()
        .filter(|event| needle.is_empty() || matches_search(event, &needle))
        .filter(|event| {
            filters.category.is_empty()
                || filters.view == ViewMode::All
                || event.category == filters.category
        })
        .filter(|event| filters.view != ViewMode::DeadlineSoon || event.is_closing_soon())
        .collect();

    sort(&mut result, filters.sort);
    result
}

fn matches_search(event: &Event, needle: &str) -> bool {
    let fields = [
        Some(event.name.as_str()),
        Some(event.category.as_str()),
        event.description(),
        event.when.as_deref(),
    ];
    fields
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
}

fn sort(records: &mut [&Event], key: SortKey) {
    // `sort_by` is stable, so equal keys keep upstream order.
    match key {
        SortKey::DeadlineAscending => records.sort_by(|a, b| {
            open_first(a, b).then_with(|| days_key(a).cmp(&days_key(b)))
        }),
        SortKey::DateAscending => records.sort_by_key(|event| month_rank(event)),
        SortKey::DateDescending => records.sort_by(|a, b| month_rank(b).cmp(&month_rank(a))),
        SortKey::Relevance => records.sort_by(|a, b| open_first(a, b)),
    }
}

fn open_first(a: &Event, b: &Event) -> Ordering {
    b.is_open().cmp(&a.is_open())
}

/// Records without a recognisable month rank above December: last when
/// ascending, first when descending.
fn month_rank(event: &Event) -> u8 {
    month_index(event.when.as_deref()).unwrap_or(u8::MAX)
}

/// Missing values sort after every real deadline.
fn days_key(event: &Event) -> i64 {
    event.days_to_submit.unwrap_or(i64::MAX)
}

/// Month (0 = January) of the first calendar month named anywhere in `when`.
pub fn month_index(when: Option<&str>) -> Option<u8> {
    MONTH_SET
        .matches(when?)
        .into_iter()
        .next()
        .map(|index| index as u8)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSummary {
    pub shown: usize,
    pub open: usize,
    pub closing_soon: usize,
}

pub fn summarize(records: &[&Event]) -> GridSummary {
    GridSummary {
        shown: records.len(),
        open: records.iter().filter(|event| event.is_open()).count(),
        closing_soon: records
            .iter()
            .filter(|event| event.is_closing_soon())
            .count(),
    }
}
