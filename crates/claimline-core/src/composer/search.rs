use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::models::MentionCandidate;
use crate::services::UserDirectory;

/// Identifies one issued candidate search.
///
/// `composer` distinguishes composer instances so results for a closed reply
/// box can never land in a newly opened one; `seq` increases with every
/// search a composer issues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SearchTicket {
    pub composer: u64,
    pub seq: u64,
}

/// Last-issued-wins sequencing for one composer's searches.
///
/// Shared between the composer and the search futures it hands out so an
/// in-flight search can notice it went stale without borrowing the composer.
#[derive(Clone, Debug, Default)]
pub struct SearchGate {
    latest: Arc<AtomicU64>,
}

impl SearchGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next sequence number; every earlier one becomes stale
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Make every outstanding sequence number stale without issuing a search
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq != 0 && self.latest.load(Ordering::SeqCst) == seq
    }
}

/// A search the caller should run and hand back to the composer that issued it
#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub ticket: SearchTicket,
    pub query: String,
    pub limit: usize,
    gate: SearchGate,
}

/// Finished search, ready to be applied to the composer that issued it
#[derive(Debug)]
pub struct SearchOutcome {
    pub ticket: SearchTicket,
    pub result: Result<Vec<MentionCandidate>>,
}

impl SearchRequest {
    pub(crate) fn new(ticket: SearchTicket, query: String, limit: usize, gate: SearchGate) -> Self {
        Self {
            ticket,
            query,
            limit,
            gate,
        }
    }

    /// Whether this is still the latest search its composer issued
    pub fn is_current(&self) -> bool {
        self.gate.is_current(self.ticket.seq)
    }

    /// Wait out the debounce window, then query the directory unless a newer
    /// search superseded this one in the meantime.
    ///
    /// Returns `None` when the search was skipped.
    pub async fn execute(self, directory: &dyn UserDirectory, debounce: Duration) -> Option<SearchOutcome> {
        if !debounce.is_zero() {
            tokio::time::sleep(debounce).await;
        }
        if !self.is_current() {
            debug!(query = %self.query, seq = self.ticket.seq, "Skipping superseded mention search");
            return None;
        }

        let result = directory
            .search_users(&self.query, self.limit)
            .await
            .map(|users| users.into_iter().map(MentionCandidate::from).collect());

        Some(SearchOutcome {
            ticket: self.ticket,
            result,
        })
    }
}
