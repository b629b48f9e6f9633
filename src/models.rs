use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::filters::ViewMode;

/// Days-remaining window used by the "closing soon" badge and the
/// `deadlineSoon` view.
pub const CLOSING_SOON_DAYS: i64 = 14;

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Enrichment {
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub logo_url: Option<String>,
    pub location: Option<String>,
    pub organizer: Option<String>,
    pub twitter: Option<String>,
    pub discord: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "_id")]
    pub id: String,
    pub slug: Option<String>,
    pub name: String,
    #[serde(rename = "type", default)]
    pub category: String,
    pub frequency: Option<String>,
    pub deadline: Option<String>,
    #[serde(default, deserialize_with = "lenient_days")]
    pub days_to_submit: Option<i64>,
    pub submission_open: Option<bool>,
    pub when: Option<String>,
    pub price: Option<String>,
    pub comments: Option<String>,
    pub event_official_page: Option<String>,
    pub submission_form: Option<String>,
    pub latest_steam_page: Option<String>,
    pub has_steam_page: Option<String>,
    pub worth_it: Option<String>,
    pub enrichment: Option<Enrichment>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusBadge {
    ClosingSoon { pulse: bool },
    Open,
    Closed,
}

impl StatusBadge {
    pub fn label(&self) -> &'static str {
        match self {
            StatusBadge::ClosingSoon { .. } => "Closing Soon",
            StatusBadge::Open => "Open",
            StatusBadge::Closed => "Closed",
        }
    }

    /// View a badge click switches the grid to, if any.
    pub fn view(&self) -> Option<ViewMode> {
        match self {
            StatusBadge::ClosingSoon { .. } => Some(ViewMode::DeadlineSoon),
            StatusBadge::Open => Some(ViewMode::Open),
            StatusBadge::Closed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Urgency {
    Critical,
    Soon,
    Upcoming,
    Normal,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Critical => "critical",
            Urgency::Soon => "soon",
            Urgency::Upcoming => "upcoming",
            Urgency::Normal => "normal",
        }
    }
}

impl Event {
    pub fn title(&self) -> &str {
        let name = self.name.trim();
        if name.is_empty() {
            "Untitled Event"
        } else {
            name
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.enrichment
            .as_ref()
            .and_then(|e| e.description.as_deref())
            .filter(|d| !d.trim().is_empty())
    }

    /// Slug when present, id otherwise.
    pub fn route_key(&self) -> &str {
        match self.slug.as_deref() {
            Some(slug) if !slug.trim().is_empty() => slug,
            _ => &self.id,
        }
    }

    pub fn path(&self) -> String {
        format!("/events/{}", urlencoding::encode(self.route_key()))
    }

    pub fn is_open(&self) -> bool {
        self.submission_open == Some(true)
    }

    pub fn is_closing_soon(&self) -> bool {
        self.is_open()
            && self
                .days_to_submit
                .is_some_and(|days| (0..=CLOSING_SOON_DAYS).contains(&days))
    }

    pub fn status_badge(&self) -> Option<StatusBadge> {
        match self.days_to_submit {
            Some(days) if self.is_open() && days >= 0 => {
                if days <= CLOSING_SOON_DAYS {
                    Some(StatusBadge::ClosingSoon { pulse: days <= 3 })
                } else {
                    Some(StatusBadge::Open)
                }
            }
            Some(days) if days < 0 => Some(StatusBadge::Closed),
            _ => None,
        }
    }

    pub fn urgency(&self) -> Option<Urgency> {
        match self.days_to_submit? {
            d if d < 0 => None,
            d if d <= 3 => Some(Urgency::Critical),
            d if d <= 7 => Some(Urgency::Soon),
            d if d <= CLOSING_SOON_DAYS => Some(Urgency::Upcoming),
            _ => Some(Urgency::Normal),
        }
    }
}

/// Upstream sends `daysToSubmit` as an integer, but floats, numeric
/// strings and nulls have all been seen; anything unreadable becomes `None`.
fn lenient_days<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.ceil() as i64)),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// Shared `{ success, data }` wrapper of every upstream response.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub count: Option<u64>,
    pub total: Option<u64>,
    pub data: Option<T>,
    pub error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct TypeCount {
    #[serde(rename = "type")]
    pub category: String,
    pub count: u64,
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum TypeCounts {
    List(Vec<TypeCount>),
    Map(BTreeMap<String, Value>),
}

impl Default for TypeCounts {
    fn default() -> Self {
        TypeCounts::List(Vec::new())
    }
}

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FestivalStats {
    pub total: u64,
    pub by_type: TypeCounts,
    pub open_submissions: Option<u64>,
    pub with_open_submissions: Option<u64>,
}

impl FestivalStats {
    pub fn open_count(&self) -> u64 {
        self.open_submissions
            .or(self.with_open_submissions)
            .unwrap_or(0)
    }

    /// Largest categories first; ties keep upstream order.
    pub fn top_types(&self, limit: usize) -> Vec<TypeCount> {
        let mut counts: Vec<TypeCount> = match &self.by_type {
            TypeCounts::List(list) => list.clone(),
            TypeCounts::Map(map) => map
                .iter()
                .map(|(category, value)| TypeCount {
                    category: category.clone(),
                    count: value.as_u64().unwrap_or(0),
                })
                .collect(),
        };
        counts.sort_by(|a, b| b.count.cmp(&a.count));
        counts.truncate(limit);
        counts
    }
}
