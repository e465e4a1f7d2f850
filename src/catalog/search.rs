//! Debounced free-text search with last-write-wins semantics.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Identifies one search invocation; later invocations get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchTicket(u64);

#[derive(Debug)]
pub struct SearchDebouncer {
    delay: Duration,
    latest: AtomicU64,
    pending: Mutex<CancellationToken>,
}

impl Default for SearchDebouncer {
    fn default() -> Self {
        Self::new(SEARCH_DEBOUNCE)
    }
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            latest: AtomicU64::new(0),
            pending: Mutex::new(CancellationToken::new()),
        }
    }

    /// Start a new invocation, cancelling whichever one was pending.
    pub fn issue(&self) -> (SearchTicket, CancellationToken) {
        let ticket = SearchTicket(self.latest.fetch_add(1, Ordering::SeqCst) + 1);
        let token = CancellationToken::new();
        let previous = {
            let mut guard = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *guard, token.clone())
        };
        previous.cancel();
        (ticket, token)
    }

    pub fn is_latest(&self, ticket: SearchTicket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Drop any pending invocation without starting a new one (keyword cleared).
    pub fn cancel(&self) {
        let _ = self.issue();
    }

    /// Wait out the debounce delay, then run `search`.
    ///
    /// Returns `None` when a newer invocation started before this one finished;
    /// its result must not be committed.
    pub async fn run<F, Fut, T>(&self, search: F) -> Option<(SearchTicket, T)>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let (ticket, token) = self.issue();

        tokio::select! {
            _ = token.cancelled() => return None,
            _ = tokio::time::sleep(self.delay) => {}
        }

        let output = tokio::select! {
            _ = token.cancelled() => return None,
            out = search() => out,
        };

        if self.is_latest(ticket) {
            Some((ticket, output))
        } else {
            tracing::debug!(?ticket, "Discarding superseded search result");
            None
        }
    }
}
