use crate::chain::{
    Address,
    ChainClient,
    PendingBet,
    RollOutcome,
    TxReceipt,
};
use crate::history::HistoryEntry;
use chrono::TimeDelta;
use std::time::Duration;
use tokio::time;
use tracing::{
    debug,
    warn,
};

/// Terminal result of outcome reconciliation. `TimedOut` does not mean the
/// wager failed, only that its result could not be confirmed within the
/// poll budget; the entry may still show up in history later.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reconciliation {
    Resolved {
        outcome: RollOutcome,
        entry: HistoryEntry,
    },
    TimedOut {
        retries: u32,
    },
}

/// Resolve a confirmed wager to its rolled result. If the contract settled
/// the roll inside the bet transaction the receipt already carries it and
/// no polling happens. Otherwise the randomness callback is outstanding
/// and the account's history is polled at a fixed interval, correlating
/// either by transaction hash or by timestamp proximity, until the entry
/// appears or the budget runs out. Always terminates within
/// `poll_budget x poll_interval`.
pub async fn reconcile_outcome(
    chain: &dyn ChainClient,
    account: Address,
    pending: &PendingBet,
    receipt: &TxReceipt,
    poll_interval: Duration,
    poll_budget: u32,
    correlation_window: TimeDelta,
) -> Reconciliation {
    if let Some(outcome) = receipt.outcome {
        debug!(tx = %pending.tx, rolled = outcome.rolled, "result embedded in bet transaction");
        return Reconciliation::Resolved {
            outcome,
            entry: entry_from_outcome(pending, outcome),
        };
    }

    let mut retries = 0;
    while retries < poll_budget {
        time::sleep(poll_interval).await;
        retries += 1;

        let history = match chain.bet_history(account).await {
            Ok(history) => history,
            Err(e) => {
                // A failed read burns a poll attempt like an empty one.
                warn!(%account, %retries, error = %e, "history poll failed");
                continue;
            }
        };

        if let Some(entry) = correlate(&history, pending, correlation_window) {
            let outcome = RollOutcome {
                rolled: entry.rolled.unwrap_or(0),
                payout: entry.payout,
            };
            debug!(tx = %pending.tx, %retries, "pending bet matched history entry");
            return Reconciliation::Resolved {
                outcome,
                entry: entry.clone(),
            };
        }
        debug!(tx = %pending.tx, %retries, "no matching history entry yet");
    }

    warn!(tx = %pending.tx, %retries, "outcome reconciliation exhausted its poll budget");
    Reconciliation::TimedOut { retries }
}

/// A history entry matches the pending bet when it is settled and either
/// carries the same transaction hash or landed within the correlation
/// window of the submission.
fn correlate<'a>(
    history: &'a [HistoryEntry],
    pending: &PendingBet,
    window: TimeDelta,
) -> Option<&'a HistoryEntry> {
    history.iter().filter(|e| e.settled()).find(|e| {
        e.tx == pending.tx
            || (e.chosen == pending.number
                && (e.timestamp - pending.submitted_at).abs() <= window)
    })
}

fn entry_from_outcome(pending: &PendingBet, outcome: RollOutcome) -> HistoryEntry {
    HistoryEntry {
        chosen: pending.number,
        rolled: Some(outcome.rolled),
        amount: pending.amount,
        payout: outcome.payout,
        won: outcome.won(),
        timestamp: pending.submitted_at,
        tx: pending.tx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::TxHash;
    use chrono::Utc;

    fn pending() -> PendingBet {
        PendingBet {
            tx: TxHash([9; 32]),
            number: 3,
            amount: 100,
            submitted_at: Utc::now(),
        }
    }

    fn history_entry(tx_byte: u8, chosen: u8, offset_secs: i64) -> HistoryEntry {
        HistoryEntry {
            chosen,
            rolled: Some(5),
            amount: 100,
            payout: 0,
            won: false,
            timestamp: Utc::now() + TimeDelta::seconds(offset_secs),
            tx: TxHash([tx_byte; 32]),
        }
    }

    #[test]
    fn correlate__matches_by_tx_hash() {
        let history = vec![history_entry(9, 3, -500)];
        assert!(correlate(&history, &pending(), TimeDelta::seconds(60)).is_some());
    }

    #[test]
    fn correlate__matches_by_timestamp_proximity() {
        let history = vec![history_entry(1, 3, 30)];
        assert!(correlate(&history, &pending(), TimeDelta::seconds(60)).is_some());
    }

    #[test]
    fn correlate__rejects_outside_window_with_different_hash() {
        let history = vec![history_entry(1, 3, 120)];
        assert!(correlate(&history, &pending(), TimeDelta::seconds(60)).is_none());
    }

    #[test]
    fn correlate__skips_unsettled_entries() {
        let mut entry = history_entry(9, 3, 0);
        entry.rolled = None;
        assert!(correlate(&[entry], &pending(), TimeDelta::seconds(60)).is_none());
    }
}
