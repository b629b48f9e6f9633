use crate::filters::{FilterState, SortKey, ViewMode};

/// Staged view/category/sort selection edited in the filter sidebar.
///
/// Only ever applied as a whole; dropping the editor discards it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEditor {
    base: FilterState,
    pending: PendingFilters,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PendingFilters {
    pub view: ViewMode,
    pub category: String,
    pub sort: SortKey,
}

impl PendingFilters {
    fn from_state(state: &FilterState) -> Self {
        Self {
            view: state.view,
            category: state.category.clone(),
            sort: state.sort,
        }
    }
}

impl FilterEditor {
    pub fn open(current: &FilterState) -> Self {
        Self {
            base: current.clone(),
            pending: PendingFilters::from_state(current),
        }
    }

    pub fn pending(&self) -> &PendingFilters {
        &self.pending
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.pending.view = view;
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.pending.category = category.into();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.pending.sort = sort;
    }

    /// Resets the staged values to defaults without applying them.
    pub fn reset(&mut self) {
        self.pending = PendingFilters::default();
    }

    pub fn has_pending_changes(&self) -> bool {
        self.pending != PendingFilters::from_state(&self.base)
    }

    /// Staged values merged onto `current`, which keeps its search text.
    pub fn apply(self, current: &FilterState) -> FilterState {
        FilterState {
            search: current.search.clone(),
            category: self.pending.category,
            view: self.pending.view,
            sort: self.pending.sort,
        }
    }

    pub fn cancel(self) {}
}
