//! Page controllers: they own a page's data-fetch lifecycle and wire user intents to the backend
//! and the store.
//!
//! Controllers contain failures: a failed fetch or submit records the normalized message in the
//! page's error slot and leaves the data in the store as it was. The error is also returned so
//! that a caller can stop.

mod categories;
mod dashboard;
mod expenses;

pub use categories::CategoriesController;
pub use dashboard::{DashboardController, DateRange};
pub use expenses::{ExpensesController, QuickFilter};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// The default wait before a search string is applied.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// What happened to a fetch's response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetch {
    /// The response was committed to the store.
    Applied,
    /// A newer request was issued while this one was in flight; the response was dropped.
    Stale,
}

/// The outcome of a delete request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The user declined the confirmation. Nothing was sent.
    Cancelled,
    /// The client refused to send the request, e.g. a category that still has expenses.
    Blocked,
}

/// Asks the user to approve a destructive action.
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Approves everything, e.g. when the user passed `--yes`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _: &str) -> bool {
        true
    }
}

/// Identifies one request in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Issues monotonically increasing tickets so that only the response to the most recent request
/// is committed.
#[derive(Debug, Default)]
pub struct RequestSeq(AtomicU64);

impl RequestSeq {
    pub fn issue(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Whether `ticket` is the latest one issued.
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0.load(Ordering::SeqCst) == ticket.0
    }
}

/// Collapses bursts of calls: each call waits out the delay and only the last call of a burst
/// reports that it should proceed.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Waits for the delay. Returns `true` if no other call was made in the meantime.
    pub async fn settle(&self) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.generation.load(Ordering::SeqCst) == generation
    }
}

/// The current page of a paginated list. Never less than 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    current_page: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self { current_page: 1 }
    }
}

impl Pagination {
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn go_to(&mut self, page: u32) {
        self.current_page = page.max(1);
    }

    pub fn next(&mut self) {
        self.current_page = self.current_page.saturating_add(1);
    }

    pub fn prev(&mut self) {
        self.current_page = self.current_page.saturating_sub(1).max(1);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination() {
        let mut p = Pagination::default();
        p.prev();
        assert_eq!(p.current_page(), 1);
        p.next();
        p.next();
        assert_eq!(p.current_page(), 3);
        p.go_to(0);
        assert_eq!(p.current_page(), 1);
        p.go_to(7);
        p.reset();
        assert_eq!(p, Pagination::default());
    }

    #[test]
    fn test_request_seq() {
        let seq = RequestSeq::default();
        let first = seq.issue();
        assert!(seq.is_current(first));
        let second = seq.issue();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn test_closure_confirm() {
        let deny = |_: &str| false;
        assert!(!deny.confirm("Delete?"));
        assert!(AssumeYes.confirm("Delete?"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_keeps_last_call() {
        let debouncer = Debouncer::new(Duration::from_millis(500));
        let first = {
            let d = debouncer.clone();
            tokio::spawn(async move { d.settle().await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;
        let second = {
            let d = debouncer.clone();
            tokio::spawn(async move { d.settle().await })
        };
        assert!(!first.await.unwrap());
        assert!(second.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_single_call_proceeds() {
        let debouncer = Debouncer::default();
        let start = tokio::time::Instant::now();
        assert!(debouncer.settle().await);
        assert!(start.elapsed() >= DEFAULT_DEBOUNCE);
    }
}
