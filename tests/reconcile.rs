//! Outcome reconciliation: the embedded fast path, history correlation
//! by hash and by timestamp, and the bounded poll budget.

use chrono::{
    TimeDelta,
    Utc,
};
use gama_dice::{
    TxHash,
    chain::ChainClient,
    history::HistoryEntry,
    reconcile::{
        Reconciliation,
        reconcile_outcome,
    },
    test_helpers::{
        ALICE,
        TestContext,
    },
};
use std::time::{
    Duration,
    Instant,
};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const POLL_BUDGET: u32 = 5;

#[tokio::test]
async fn reconcile__embedded_outcome_resolves_without_polling() {
    let ctx = TestContext::with_allowance(1_000).await;
    ctx.chain.set_sync_results(true);
    ctx.chain.set_fixed_roll(3);

    let pending = ctx.chain.place_bet(ALICE, 3, 100).await.unwrap();
    let receipt = ctx.chain.wait_for_receipt(pending.tx).await.unwrap();

    let started = Instant::now();
    let reconciliation = reconcile_outcome(
        ctx.chain.as_ref(),
        ALICE,
        &pending,
        &receipt,
        POLL_INTERVAL,
        POLL_BUDGET,
        TimeDelta::seconds(60),
    )
    .await;

    match reconciliation {
        Reconciliation::Resolved { outcome, entry } => {
            assert_eq!(outcome.rolled, 3);
            assert!(outcome.won());
            assert_eq!(entry.tx, pending.tx);
        }
        other => panic!("expected resolution, got {other:?}"),
    }
    // fast path: no poll interval elapsed
    assert!(started.elapsed() < POLL_INTERVAL);
}

#[tokio::test]
async fn reconcile__finds_the_fulfillment_by_transaction_hash() {
    let ctx = TestContext::with_allowance(1_000).await;
    ctx.chain.set_fixed_roll(5);
    ctx.chain.set_fulfillment_delay(2);

    let pending = ctx.chain.place_bet(ALICE, 5, 100).await.unwrap();
    let receipt = ctx.chain.wait_for_receipt(pending.tx).await.unwrap();
    assert!(receipt.outcome.is_none());

    let reconciliation = reconcile_outcome(
        ctx.chain.as_ref(),
        ALICE,
        &pending,
        &receipt,
        POLL_INTERVAL,
        POLL_BUDGET,
        TimeDelta::seconds(60),
    )
    .await;

    match reconciliation {
        Reconciliation::Resolved { outcome, entry } => {
            assert_eq!(outcome.rolled, 5);
            assert_eq!(entry.tx, pending.tx);
        }
        other => panic!("expected resolution, got {other:?}"),
    }
}

#[tokio::test]
async fn reconcile__falls_back_to_timestamp_proximity() {
    let ctx = TestContext::with_allowance(1_000).await;
    ctx.chain.lose_next_fulfillment();

    let pending = ctx.chain.place_bet(ALICE, 4, 100).await.unwrap();
    let receipt = ctx.chain.wait_for_receipt(pending.tx).await.unwrap();

    // the fulfillment landed under a different hash (the VRF callback
    // transaction), close to the submission time
    ctx.chain.push_history_entry(
        ALICE,
        HistoryEntry {
            chosen: 4,
            rolled: Some(4),
            amount: 100,
            payout: 600,
            won: true,
            timestamp: Utc::now() + TimeDelta::seconds(2),
            tx: TxHash([0xfe; 32]),
        },
    );

    let reconciliation = reconcile_outcome(
        ctx.chain.as_ref(),
        ALICE,
        &pending,
        &receipt,
        POLL_INTERVAL,
        POLL_BUDGET,
        TimeDelta::seconds(60),
    )
    .await;

    match reconciliation {
        Reconciliation::Resolved { outcome, entry } => {
            assert_eq!(outcome.payout, 600);
            assert_eq!(entry.tx, TxHash([0xfe; 32]));
        }
        other => panic!("expected resolution, got {other:?}"),
    }
}

#[tokio::test]
async fn reconcile__terminates_within_the_poll_budget() {
    let ctx = TestContext::with_allowance(1_000).await;
    ctx.chain.lose_next_fulfillment();

    let pending = ctx.chain.place_bet(ALICE, 2, 100).await.unwrap();
    let receipt = ctx.chain.wait_for_receipt(pending.tx).await.unwrap();

    let started = Instant::now();
    let reconciliation = reconcile_outcome(
        ctx.chain.as_ref(),
        ALICE,
        &pending,
        &receipt,
        POLL_INTERVAL,
        POLL_BUDGET,
        TimeDelta::seconds(60),
    )
    .await;

    assert_eq!(reconciliation, Reconciliation::TimedOut { retries: POLL_BUDGET });
    // budget x interval, with slack for scheduling
    assert!(started.elapsed() < POLL_INTERVAL * POLL_BUDGET * 10);
}

#[tokio::test]
async fn reconcile__history_read_failures_burn_poll_attempts() {
    let ctx = TestContext::with_allowance(1_000).await;
    ctx.chain.lose_next_fulfillment();

    let pending = ctx.chain.place_bet(ALICE, 6, 100).await.unwrap();
    let receipt = ctx.chain.wait_for_receipt(pending.tx).await.unwrap();
    ctx.chain.fail_next_reads(POLL_BUDGET);

    let reconciliation = reconcile_outcome(
        ctx.chain.as_ref(),
        ALICE,
        &pending,
        &receipt,
        POLL_INTERVAL,
        POLL_BUDGET,
        TimeDelta::seconds(60),
    )
    .await;

    assert_eq!(reconciliation, Reconciliation::TimedOut { retries: POLL_BUDGET });
}
