use crate::chain::TxHash;
use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

/// One settled (or VRF-pending) wager as recorded on chain. Immutable once
/// created; `rolled` is `None` while the randomness callback is still
/// outstanding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub chosen: u8,
    pub rolled: Option<u8>,
    pub amount: u64,
    pub payout: u64,
    pub won: bool,
    pub timestamp: DateTime<Utc>,
    pub tx: TxHash,
}

impl HistoryEntry {
    pub fn settled(&self) -> bool {
        self.rolled.is_some()
    }
}

/// Win/loss totals derived from the cache, shown in the UI footer.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountStats {
    pub bets: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_wagered: u64,
    pub total_paid: u64,
}

/// Read-through cache of an account's bet history. Entries are only ever
/// appended; a refresh merges chain data in by transaction hash so a VRF
/// fulfillment observed later replaces its pending placeholder.
#[derive(Clone, Debug, Default)]
pub struct HistoryCache {
    entries: Vec<HistoryEntry>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn find_by_tx(&self, tx: TxHash) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.tx == tx)
    }

    /// Insert a single resolved entry, newest first. A settled entry wins
    /// over a pending placeholder for the same transaction; a duplicate of
    /// an already-settled entry is dropped.
    pub fn insert(&mut self, entry: HistoryEntry) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.tx == entry.tx) {
            if !existing.settled() && entry.settled() {
                *existing = entry;
            }
            return;
        }
        self.entries.insert(0, entry);
    }

    /// Merge a chain read into the cache.
    pub fn merge(&mut self, fresh: Vec<HistoryEntry>) {
        for entry in fresh {
            self.insert(entry);
        }
        self.entries
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    }

    /// Drop everything, e.g. on account switch.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> AccountStats {
        let mut stats = AccountStats::default();
        for entry in self.entries.iter().filter(|e| e.settled()) {
            stats.bets += 1;
            stats.total_wagered += entry.amount;
            stats.total_paid += entry.payout;
            if entry.won {
                stats.wins += 1;
            } else {
                stats.losses += 1;
            }
        }
        stats
    }

    /// Dump the session's history as JSON for inspection.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.entries)
    }
}
