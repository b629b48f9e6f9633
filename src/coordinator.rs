//! Decides when a filter change needs fresh records from upstream, and
//! makes sure only the newest request's answer is ever applied.

use tracing::{debug, warn};

use crate::api::{ApiError, EventSource, ListParams};
use crate::filters::{FilterState, ViewMode};
use crate::models::Event;

pub const DEFAULT_UPCOMING_DAYS: u32 = 365;
pub const DEFAULT_LISTING_LIMIT: u32 = 500;

/// Logical upstream request backing a [`FilterState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchPlan {
    /// General listing; the only plan that filters server-side.
    Listing {
        category: Option<String>,
        search: Option<String>,
        limit: u32,
    },
    Open,
    Upcoming {
        days: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefetchPolicy {
    pub upcoming_days: u32,
    pub listing_limit: u32,
}

impl Default for RefetchPolicy {
    fn default() -> Self {
        Self {
            upcoming_days: DEFAULT_UPCOMING_DAYS,
            listing_limit: DEFAULT_LISTING_LIMIT,
        }
    }
}

impl RefetchPolicy {
    pub fn plan(&self, filters: &FilterState) -> FetchPlan {
        match filters.view {
            ViewMode::Open | ViewMode::DeadlineSoon => FetchPlan::Open,
            ViewMode::Upcoming => FetchPlan::Upcoming {
                days: self.upcoming_days,
            },
            ViewMode::All => FetchPlan::Listing {
                category: non_empty(&filters.category),
                search: non_empty(&filters.search),
                limit: self.listing_limit,
            },
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Runs `plan` against `source`.
pub async fn execute(source: &dyn EventSource, plan: &FetchPlan) -> Result<Vec<Event>, ApiError> {
    match plan {
        FetchPlan::Listing {
            category,
            search,
            limit,
        } => {
            source
                .list(&ListParams {
                    limit: Some(*limit),
                    skip: None,
                    category: category.clone(),
                    search: search.clone(),
                })
                .await
        }
        FetchPlan::Open => source.open().await,
        FetchPlan::Upcoming { days } => source.upcoming(*days).await,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Ready,
    Loading,
    Failed(String),
}

/// Proof that a fetch was issued for a given generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    generation: u64,
    plan: FetchPlan,
}

impl Ticket {
    pub fn plan(&self) -> &FetchPlan {
        &self.plan
    }
}

#[derive(Debug)]
pub enum Resolution {
    Apply(Vec<Event>),
    Failed,
    /// A newer ticket was issued; the result must be dropped.
    Stale,
}

#[derive(Debug, Default)]
pub struct RefetchCoordinator {
    policy: RefetchPolicy,
    generation: u64,
    current_plan: Option<FetchPlan>,
    status: LoadStatus,
}

impl RefetchCoordinator {
    pub fn new(policy: RefetchPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    /// Marks `filters`' plan as already satisfied by records loaded elsewhere.
    pub fn seed(&mut self, filters: &FilterState) {
        self.current_plan = Some(self.policy.plan(filters));
        self.status = LoadStatus::Ready;
    }

    /// Returns a ticket when moving to `filters` needs new upstream records.
    ///
    /// Unchanged plans re-filter locally, unless the last fetch failed.
    pub fn transition(&mut self, filters: &FilterState) -> Option<Ticket> {
        let plan = self.policy.plan(filters);
        let failed = matches!(self.status, LoadStatus::Failed(_));
        if !failed && self.current_plan.as_ref() == Some(&plan) {
            return None;
        }
        Some(self.issue(plan))
    }

    /// Re-issues the current plan, e.g. from the error state's retry action.
    pub fn retry(&mut self) -> Option<Ticket> {
        let plan = self.current_plan.clone()?;
        Some(self.issue(plan))
    }

    fn issue(&mut self, plan: FetchPlan) -> Ticket {
        self.generation += 1;
        self.current_plan = Some(plan.clone());
        self.status = LoadStatus::Loading;
        debug!(generation = self.generation, ?plan, "issuing festival fetch");
        Ticket {
            generation: self.generation,
            plan,
        }
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        ticket.generation == self.generation
    }

    pub fn resolve(&mut self, ticket: &Ticket, result: Result<Vec<Event>, ApiError>) -> Resolution {
        if !self.is_current(ticket) {
            debug!(
                generation = ticket.generation,
                latest = self.generation,
                "discarding superseded festival response"
            );
            return Resolution::Stale;
        }
        match result {
            Ok(records) => {
                self.status = LoadStatus::Ready;
                Resolution::Apply(records)
            }
            Err(err) => {
                warn!(error = %err, plan = ?ticket.plan, "festival fetch failed");
                self.status = LoadStatus::Failed(error_message(&err));
                Resolution::Failed
            }
        }
    }
}

fn error_message(err: &ApiError) -> String {
    match err {
        ApiError::Unsuccessful(_) => "Failed to fetch events".to_string(),
        _ => "Failed to load events. Please try again.".to_string(),
    }
}
