use std::collections::HashSet;

use tracing::warn;

use crate::models::Event;

/// Working set of event records and category labels for one page.
///
/// Records are replaced wholesale on every `load`; UI state keyed by
/// record id (expanded notes) survives only for ids still present.
#[derive(Debug, Default, Clone)]
pub struct EventStore {
    records: Vec<Event>,
    categories: Vec<String>,
    expanded_notes: HashSet<String>,
}

impl EventStore {
    pub fn new(records: Vec<Event>, categories: Vec<String>) -> Self {
        let mut store = Self::default();
        store.load(records, categories);
        store
    }

    pub fn load(&mut self, records: Vec<Event>, categories: Vec<String>) {
        let total = records.len();
        let records: Vec<Event> = records.into_iter().filter(accept_record).collect();
        if records.len() != total {
            warn!(
                dropped = total - records.len(),
                "dropped event records without id or name"
            );
        }

        let ids: HashSet<&str> = records.iter().map(|event| event.id.as_str()).collect();
        self.expanded_notes.retain(|id| ids.contains(id.as_str()));

        self.categories = normalize_categories(categories);
        self.records = records;
    }

    /// Replaces records only, keeping the known category labels.
    pub fn replace_records(&mut self, records: Vec<Event>) {
        let categories = std::mem::take(&mut self.categories);
        self.load(records, categories);
    }

    pub fn current(&self) -> &[Event] {
        &self.records
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Flips the "important notes" toggle of a record. Unknown ids are ignored.
    pub fn toggle_notes(&mut self, id: &str) -> bool {
        if !self.records.iter().any(|event| event.id == id) {
            return false;
        }
        if !self.expanded_notes.remove(id) {
            self.expanded_notes.insert(id.to_string());
        }
        self.expanded_notes.contains(id)
    }

    pub fn notes_expanded(&self, id: &str) -> bool {
        self.expanded_notes.contains(id)
    }
}

fn accept_record(event: &Event) -> bool {
    !event.id.trim().is_empty() && !event.name.trim().is_empty()
}

fn normalize_categories(categories: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    categories
        .into_iter()
        .map(|label| label.trim().to_string())
        .filter(|label| !label.is_empty())
        .filter(|label| seen.insert(label.clone()))
        .collect()
}
