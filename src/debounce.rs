use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Single-slot delayed action. Scheduling again restarts the delay and
/// drops whatever was waiting; only the latest action can ever run.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// Runs `action` after the delay unless cancelled or rescheduled first.
    ///
    /// `action` must not await anything long-lived; the timer is aborted
    /// on reschedule, so anything still running at that point is dropped.
    pub fn schedule<F>(&mut self, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        }));
    }

    /// Returns true when a scheduled action was still waiting.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test(start_paused = true)]
    async fn only_the_latest_action_runs() {
        let fired = Arc::new(Mutex::new(Vec::new()));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));

        for value in ["j", "ja", "jam"] {
            let fired = Arc::clone(&fired);
            debouncer.schedule(async move {
                fired.lock().unwrap().push(value);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(fired.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(*fired.lock().unwrap(), vec!["jam"]);
        assert!(!debouncer.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_the_pending_action() {
        let fired = Arc::new(Mutex::new(false));
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        {
            let fired = Arc::clone(&fired);
            debouncer.schedule(async move {
                *fired.lock().unwrap() = true;
            });
        }
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!*fired.lock().unwrap());
        assert!(!debouncer.cancel());
    }
}
