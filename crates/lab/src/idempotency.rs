//! Single-flight idempotency ledger for mutating requests.
//!
//! Clients may tag a submission with `X-CM-LAB-REQUEST-ID`. The first
//! request with a given id executes, and its successful response is
//! recorded; retries get the recorded response back without re-running side
//! effects. Two concurrent requests with the same unseen id never both
//! execute: each id owns an async slot, and the second caller waits on the
//! slot's lock until the first has stored a result.
//!
//! Failed executions are not recorded, so a retry after an error executes
//! again. Requests without an id are never deduplicated.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::{Duration, Instant};

use tokio::sync::Mutex as AsyncMutex;

/// How long a recorded response stays replayable.
const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

struct Slot<T> {
    cell: Arc<AsyncMutex<Option<T>>>,
    expires_at: Instant,
}

pub struct IdempotencyLedger<T> {
    ttl: Duration,
    slots: StdMutex<HashMap<String, Slot<T>>>,
}

/// Outcome of [`IdempotencyLedger::execute`].
#[derive(Debug)]
pub enum Outcome<T> {
    /// The operation ran on this call.
    Executed(T),
    /// A recorded response was replayed; the operation did not run.
    Replayed(T),
}

impl<T> Outcome<T> {
    pub fn into_inner(self) -> T {
        match self {
            Outcome::Executed(value) | Outcome::Replayed(value) => value,
        }
    }
}

impl<T: Clone> IdempotencyLedger<T> {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: StdMutex::new(HashMap::new()),
        }
    }

    /// Run `op` at most once per request id and return its response.
    pub async fn execute<F, Fut, E>(
        &self,
        request_id: Option<&str>,
        op: F,
    ) -> Result<Outcome<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(id) = request_id else {
            return op().await.map(Outcome::Executed);
        };

        let cell = self.slot(id);
        let mut guard = cell.lock().await;
        if let Some(stored) = guard.as_ref() {
            return Ok(Outcome::Replayed(stored.clone()));
        }

        let value = op().await?;
        *guard = Some(value.clone());
        Ok(Outcome::Executed(value))
    }

    /// Get or create the slot for `id`, pruning expired entries on the way.
    fn slot(&self, id: &str) -> Arc<AsyncMutex<Option<T>>> {
        let mut slots = self.slots.lock().expect("ledger mutex poisoned");
        let now = Instant::now();
        slots.retain(|_, slot| slot.expires_at > now);

        let slot = slots.entry(id.to_string()).or_insert_with(|| Slot {
            cell: Arc::new(AsyncMutex::new(None)),
            expires_at: now + self.ttl,
        });
        Arc::clone(&slot.cell)
    }
}

impl<T: Clone> Default for IdempotencyLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}
