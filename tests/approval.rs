//! Approval coordinator behavior: sufficiency, read-after-write lag
//! tolerance, transient retry, and terminal user rejection.

use gama_dice::{
    BetPhase,
    BetRequest,
    funds::approval_sufficient,
    notify::Severity,
    test_helpers::TestContext,
};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]
    #[test]
    fn approval_sufficient__holds_for_all_pairs(allowance: u64, amount: u64) {
        prop_assert_eq!(
            approval_sufficient(allowance, amount),
            amount == 0 || allowance >= amount
        );
    }
}

#[tokio::test]
async fn approval__confirmed_transaction_wins_over_a_stale_allowance_read() {
    let mut ctx = TestContext::new().await;
    ctx.chain.set_fixed_roll(3);
    // the verification read (and one more) still serves the old value
    ctx.chain.lag_allowance_reads(2);

    let phase = ctx
        .controller
        .place_bet(BetRequest { number: 3, amount: 500 })
        .await;

    // the lagging read did not block the bet
    assert_eq!(phase, BetPhase::Resolved);
    assert_eq!(ctx.chain.mutation_log(), vec!["approve", "bet"]);
    let _ = ctx.drain_notices();
}

#[tokio::test]
async fn approval__user_rejection_is_terminal_and_not_retried() {
    let mut ctx = TestContext::new().await;
    ctx.chain.reject_next_approval();

    let phase = ctx
        .controller
        .place_bet(BetRequest { number: 3, amount: 500 })
        .await;

    assert_eq!(phase, BetPhase::Errored);
    assert_eq!(ctx.chain.bets_submitted(), 0);
    assert!(ctx.chain.mutation_log().is_empty());
    let notices = ctx.drain_notices();
    assert!(notices.iter().any(|n| n.severity == Severity::Warning
        && n.message.contains("rejected")));
}

#[tokio::test]
async fn approval__transient_broadcast_failure_is_retried_once() {
    let mut ctx = TestContext::new().await;
    ctx.chain.set_fixed_roll(3);
    ctx.chain.fail_next_approvals(1);

    let phase = ctx
        .controller
        .place_bet(BetRequest { number: 3, amount: 500 })
        .await;

    assert_eq!(phase, BetPhase::Resolved);
    assert_eq!(ctx.chain.mutation_log(), vec!["approve", "bet"]);
    let _ = ctx.drain_notices();
}

#[tokio::test]
async fn approval__exhausted_retries_surface_as_an_error() {
    let mut ctx = TestContext::new().await;
    // both attempts in the budget fail
    ctx.chain.fail_next_approvals(2);

    let phase = ctx
        .controller
        .place_bet(BetRequest { number: 3, amount: 500 })
        .await;

    assert_eq!(phase, BetPhase::Errored);
    assert_eq!(ctx.chain.bets_submitted(), 0);
    let notices = ctx.drain_notices();
    assert!(notices.iter().any(|n| n.severity == Severity::Error));
}
