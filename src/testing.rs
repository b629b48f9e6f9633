//! In-memory [`EventSource`] used by unit tests.
//!
//! In gated mode every record fetch parks on a oneshot channel until the
//! test resolves it, which lets tests complete requests out of order.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::api::{ApiError, EventSource, ListParams};
use crate::models::{Event, FestivalStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCall {
    List(ListParams),
    Open,
    Upcoming(u32),
}

type Reply = Result<Vec<Event>, ApiError>;

pub struct Gate {
    pub call: FetchCall,
    tx: oneshot::Sender<Reply>,
}

impl Gate {
    pub fn resolve(self, records: Vec<Event>) {
        let _ = self.tx.send(Ok(records));
    }
}

#[derive(Default)]
pub struct FakeSource {
    gated: bool,
    calls: Mutex<Vec<FetchCall>>,
    canned: Mutex<Vec<(FetchCall, Vec<Event>)>>,
    failures: Mutex<usize>,
    meta_failures: Mutex<usize>,
    gates: Mutex<VecDeque<Gate>>,
    pub stats: FestivalStats,
    pub categories: Vec<String>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Self::default()
        }
    }

    pub fn with_records(self, call: FetchCall, records: Vec<Event>) -> Self {
        self.canned.lock().unwrap().push((call, records));
        self
    }

    pub fn with_categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn fail_next(&self, count: usize) {
        *self.failures.lock().unwrap() = count;
    }

    /// Fails the next `count` stats or category lookups.
    pub fn fail_meta_next(&self, count: usize) {
        *self.meta_failures.lock().unwrap() = count;
    }

    fn take_meta_failure(&self) -> Result<(), ApiError> {
        let mut failures = self.meta_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(ApiError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }

    pub fn calls(&self) -> Vec<FetchCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Waits until a gated fetch is parked and hands it to the test.
    pub async fn take_gate(&self) -> Gate {
        loop {
            let next = self.gates.lock().unwrap().pop_front();
            if let Some(gate) = next {
                return gate;
            }
            tokio::task::yield_now().await;
        }
    }

    async fn fetch(&self, call: FetchCall) -> Reply {
        self.calls.lock().unwrap().push(call.clone());

        if self.gated {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(Gate { call, tx });
            return rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Http("gate dropped".into())));
        }

        {
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(ApiError::Http("connection refused".into()));
            }
        }

        Ok(self
            .canned
            .lock()
            .unwrap()
            .iter()
            .find(|(canned, _)| *canned == call)
            .map(|(_, records)| records.clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl EventSource for FakeSource {
    async fn list(&self, params: &ListParams) -> Result<Vec<Event>, ApiError> {
        self.fetch(FetchCall::List(params.clone())).await
    }

    async fn open(&self) -> Result<Vec<Event>, ApiError> {
        self.fetch(FetchCall::Open).await
    }

    async fn upcoming(&self, days: u32) -> Result<Vec<Event>, ApiError> {
        self.fetch(FetchCall::Upcoming(days)).await
    }

    async fn stats(&self) -> Result<FestivalStats, ApiError> {
        self.take_meta_failure()?;
        Ok(self.stats.clone())
    }

    async fn categories(&self) -> Result<Vec<String>, ApiError> {
        self.take_meta_failure()?;
        Ok(self.categories.clone())
    }

    async fn event(&self, key: &str) -> Result<Event, ApiError> {
        self.canned
            .lock()
            .unwrap()
            .iter()
            .flat_map(|(_, records)| records.iter())
            .find(|event| event.route_key() == key || event.id == key)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(key.to_string()))
    }
}

pub fn event(id: &str, name: &str, category: &str) -> Event {
    Event {
        id: id.to_string(),
        slug: Some(format!("{id}-slug")),
        name: name.to_string(),
        category: category.to_string(),
        ..Event::default()
    }
}

pub fn open_event(id: &str, days: i64) -> Event {
    Event {
        submission_open: Some(true),
        days_to_submit: Some(days),
        ..event(id, &format!("Festival {id}"), "Festival")
    }
}
