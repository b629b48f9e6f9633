//! Filter state for the events grid and its URL query-string codec.
//!
//! The query string is the canonical, shareable form of a [`FilterState`].
//! Parameters equal to their default are omitted, and the emitted order is
//! always `view`, `search`, `type`, `sort`, so two equal states always
//! produce byte-identical URLs.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

const PARAM_VIEW: &str = "view";
const PARAM_SEARCH: &str = "search";
const PARAM_CATEGORY: &str = "type";
const PARAM_SORT: &str = "sort";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewMode {
    All,
    #[default]
    Open,
    Upcoming,
    DeadlineSoon,
}

impl ViewMode {
    pub const VARIANTS: [ViewMode; 4] = [
        ViewMode::All,
        ViewMode::Open,
        ViewMode::Upcoming,
        ViewMode::DeadlineSoon,
    ];

    pub fn as_param(&self) -> &'static str {
        match self {
            ViewMode::All => "all",
            ViewMode::Open => "open",
            ViewMode::Upcoming => "upcoming",
            ViewMode::DeadlineSoon => "deadlineSoon",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::VARIANTS
            .into_iter()
            .find(|view| view.as_param().eq_ignore_ascii_case(value))
    }

    pub fn label(&self) -> &'static str {
        match self {
            ViewMode::All => "All Events",
            ViewMode::Open => "Open Submissions",
            ViewMode::Upcoming => "Upcoming",
            ViewMode::DeadlineSoon => "Deadline Soon",
        }
    }

    /// Banner shown above the grid for the narrowed views.
    pub fn caption(&self) -> Option<&'static str> {
        match self {
            ViewMode::All => None,
            ViewMode::Open => Some("Currently accepting submissions"),
            ViewMode::Upcoming => Some("Upcoming events"),
            ViewMode::DeadlineSoon => Some("Closing within 14 days"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Relevance,
    DateAscending,
    DateDescending,
    #[default]
    DeadlineAscending,
}

impl SortKey {
    pub const VARIANTS: [SortKey; 4] = [
        SortKey::Relevance,
        SortKey::DateAscending,
        SortKey::DateDescending,
        SortKey::DeadlineAscending,
    ];

    pub fn as_param(&self) -> &'static str {
        match self {
            SortKey::Relevance => "relevance",
            SortKey::DateAscending => "dateAsc",
            SortKey::DateDescending => "dateDesc",
            SortKey::DeadlineAscending => "deadlineAsc",
        }
    }

    pub fn from_param(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::VARIANTS
            .into_iter()
            .find(|sort| sort.as_param().eq_ignore_ascii_case(value))
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::Relevance => "Relevance",
            SortKey::DateAscending => "Date (earliest)",
            SortKey::DateDescending => "Date (latest)",
            SortKey::DeadlineAscending => "Deadline (soonest)",
        }
    }
}

/// The user's current query over the grid. One value per axis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub search: String,
    pub category: String,
    pub view: ViewMode,
    pub sort: SortKey,
}

impl FilterState {
    /// Parses a query string (with or without a leading path and `?`).
    ///
    /// Never fails: unknown parameters are ignored and unrecognised values
    /// fall back to the field default. Parameter names and enumerated values
    /// match case-insensitively; the first occurrence of a name wins.
    pub fn decode(query: &str) -> Self {
        let query = match query.split_once('?') {
            Some((_, rest)) => rest,
            None => query,
        };
        let query = query.split('#').next().unwrap_or_default();

        let mut view: Option<String> = None;
        let mut search: Option<String> = None;
        let mut category: Option<String> = None;
        let mut sort: Option<String> = None;

        for pair in query.split('&').filter(|pair| !pair.is_empty()) {
            let (raw_name, raw_value) = pair.split_once('=').unwrap_or((pair, ""));
            let name = decode_component(raw_name);
            let slot = if name.eq_ignore_ascii_case(PARAM_VIEW) {
                &mut view
            } else if name.eq_ignore_ascii_case(PARAM_SEARCH) {
                &mut search
            } else if name.eq_ignore_ascii_case(PARAM_CATEGORY) {
                &mut category
            } else if name.eq_ignore_ascii_case(PARAM_SORT) {
                &mut sort
            } else {
                continue;
            };
            if slot.is_none() {
                *slot = Some(decode_component(raw_value).into_owned());
            }
        }

        Self {
            search: search.unwrap_or_default(),
            category: category.unwrap_or_default(),
            view: view
                .as_deref()
                .and_then(ViewMode::from_param)
                .unwrap_or_default(),
            sort: sort
                .as_deref()
                .and_then(SortKey::from_param)
                .unwrap_or_default(),
        }
    }

    /// Minimal canonical query string, without the leading `?`.
    pub fn encode(&self) -> String {
        let mut pairs: Vec<(&str, Cow<'_, str>)> = Vec::with_capacity(4);
        if self.view != ViewMode::default() {
            pairs.push((PARAM_VIEW, Cow::Borrowed(self.view.as_param())));
        }
        if !self.search.is_empty() {
            pairs.push((PARAM_SEARCH, encode_component(&self.search)));
        }
        if !self.category.is_empty() {
            pairs.push((PARAM_CATEGORY, encode_component(&self.category)));
        }
        if self.sort != SortKey::default() {
            pairs.push((PARAM_SORT, Cow::Borrowed(self.sort.as_param())));
        }

        pairs
            .into_iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Home-page location for this state, `/` when everything is default.
    pub fn href(&self) -> String {
        let query = self.encode();
        if query.is_empty() {
            "/".to_string()
        } else {
            format!("/?{query}")
        }
    }

    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Search and category are the "active filters" counted on the filter button.
    pub fn active_filter_count(&self) -> usize {
        [&self.search, &self.category]
            .into_iter()
            .filter(|value| !value.is_empty())
            .count()
    }

    pub fn with_view(&self, view: ViewMode) -> Self {
        Self {
            view,
            ..self.clone()
        }
    }

    pub fn with_sort(&self, sort: SortKey) -> Self {
        Self {
            sort,
            ..self.clone()
        }
    }

    pub fn with_category(&self, category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            ..self.clone()
        }
    }

    pub fn with_search(&self, search: impl Into<String>) -> Self {
        Self {
            search: search.into(),
            ..self.clone()
        }
    }

    pub fn remove_search(&self) -> Self {
        self.with_search("")
    }

    pub fn remove_category(&self) -> Self {
        self.with_category("")
    }

    pub fn clear() -> Self {
        Self::default()
    }
}

fn decode_component(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['+', '%']) {
        return Cow::Borrowed(raw);
    }
    let spaced = raw.replace('+', " ");
    let bytes = urlencoding::decode_binary(spaced.as_bytes());
    Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
}

fn encode_component(value: &str) -> Cow<'_, str> {
    match urlencoding::encode(value) {
        Cow::Borrowed(unchanged) => Cow::Borrowed(unchanged),
        Cow::Owned(encoded) => Cow::Owned(encoded.replace("%20", "+")),
    }
}
