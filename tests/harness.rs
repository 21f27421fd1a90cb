//! End-to-end walks of the bet lifecycle state machine against the
//! simulated chain.

use gama_dice::{
    BetPhase,
    BetRequest,
    notify::Severity,
    test_helpers::{
        STARTING_CHIPS,
        TestContext,
    },
};

fn request(number: u8, amount: u64) -> BetRequest {
    BetRequest { number, amount }
}

#[tokio::test]
async fn place_bet__approves_then_bets_when_allowance_is_short() {
    // given: balance 1000, allowance 0
    let mut ctx = TestContext::new().await;
    ctx.chain.set_fixed_roll(3);

    // when: 500 on number 3
    let phase = ctx.controller.place_bet(request(3, 500)).await;

    // then: approval transaction lands before the bet transaction
    assert_eq!(phase, BetPhase::Resolved);
    assert_eq!(ctx.chain.mutation_log(), vec!["approve", "bet"]);

    let notices = ctx.drain_notices();
    assert!(notices.iter().any(|n| n.message.contains("spending approved")));
    assert!(notices.iter().any(|n| n.severity == Severity::Success
        && n.message.contains("won")));
}

#[tokio::test]
async fn place_bet__skips_approval_when_allowance_covers_the_stake() {
    let mut ctx = TestContext::with_allowance(1_000).await;
    ctx.chain.set_fixed_roll(6);

    let phase = ctx.controller.place_bet(request(3, 500)).await;

    assert_eq!(phase, BetPhase::Resolved);
    assert_eq!(ctx.chain.mutation_log(), vec!["bet"]);
    let result = ctx.controller.lifecycle().unwrap().result.unwrap();
    assert_eq!(result.rolled, 6);
    assert!(!result.won());
    let _ = ctx.drain_notices();
}

#[tokio::test]
async fn place_bet__invalid_number_is_rejected_without_any_transaction() {
    // given: balance 1000, allowance 1000
    let mut ctx = TestContext::with_allowance(1_000).await;

    // when: 500 on number 7
    let phase = ctx.controller.place_bet(request(7, 500)).await;

    // then: stays Idle, nothing submitted
    assert_eq!(phase, BetPhase::Idle);
    assert!(ctx.chain.mutation_log().is_empty());
    assert_eq!(ctx.chain.bets_submitted(), 0);
    let notices = ctx.drain_notices();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, Severity::Warning);
}

#[tokio::test]
async fn place_bet__resolved_funds_come_from_the_chain_not_the_optimistic_guess() {
    let mut ctx = TestContext::with_allowance(1_000).await;
    ctx.chain.set_fixed_roll(2);

    let phase = ctx.controller.place_bet(request(2, 100)).await;

    // 1000 - 100 stake + 600 settlement credit
    assert_eq!(phase, BetPhase::Resolved);
    assert_eq!(ctx.controller.funds().balance, STARTING_CHIPS - 100 + 600);
    let _ = ctx.drain_notices();
}

#[tokio::test]
async fn place_bet__errored_restores_the_optimistic_balance() {
    let mut ctx = TestContext::with_allowance(1_000).await;
    ctx.chain
        .revert_next_bet(gama_dice::error::RevertReason::PayoutUnavailable);

    let phase = ctx.controller.place_bet(request(4, 400)).await;

    assert_eq!(phase, BetPhase::Errored);
    // the displayed balance is back at the last known-good value
    assert_eq!(ctx.controller.funds().balance, STARTING_CHIPS);
    let notices = ctx.drain_notices();
    assert!(notices.iter().any(|n| n.severity == Severity::Error
        && n.message.contains("payout")));
}

#[tokio::test]
async fn place_bet__lost_fulfillment_times_out_with_check_history_guidance() {
    let mut ctx = TestContext::with_allowance(1_000).await;
    ctx.chain.lose_next_fulfillment();

    let phase = ctx.controller.place_bet(request(5, 250)).await;

    assert_eq!(phase, BetPhase::TimedOut);
    let lifecycle = ctx.controller.lifecycle().unwrap();
    assert!(lifecycle.timed_out);
    assert_eq!(lifecycle.retry_count, 5);
    // optimistic decrement reverted; the stake may still land later
    assert_eq!(ctx.controller.funds().balance, STARTING_CHIPS);
    let notices = ctx.drain_notices();
    assert!(notices.iter().any(|n| n.severity == Severity::Warning
        && n.message.contains("check your bet history")));
}

#[tokio::test]
async fn place_bet__terminal_lifecycle_is_superseded_by_the_next_bet() {
    let mut ctx = TestContext::with_allowance(10_000).await;
    ctx.chain.set_fixed_roll(1);

    assert_eq!(ctx.controller.place_bet(request(2, 100)).await, BetPhase::Resolved);
    assert_eq!(ctx.controller.place_bet(request(1, 100)).await, BetPhase::Resolved);

    assert_eq!(ctx.chain.bets_submitted(), 2);
    assert_eq!(ctx.controller.history().stats().bets, 2);
    let _ = ctx.drain_notices();
}

#[tokio::test]
async fn place_bet__without_a_connected_wallet_stays_idle() {
    let mut ctx = TestContext::new().await;
    ctx.controller.set_account(None).await;

    let phase = ctx.controller.place_bet(request(3, 100)).await;

    assert_eq!(phase, BetPhase::Idle);
    assert_eq!(ctx.chain.bets_submitted(), 0);
    let notices = ctx.drain_notices();
    assert!(notices.iter().any(|n| n.message.contains("connect a wallet")));
}

#[tokio::test]
async fn set_account__tears_down_the_previous_session() {
    let mut ctx = TestContext::with_allowance(1_000).await;
    ctx.chain.set_fixed_roll(3);
    ctx.controller.place_bet(request(3, 100)).await;
    assert!(!ctx.controller.history().is_empty());

    let bob = gama_dice::Address([0xb0; 20]);
    ctx.chain.fund(bob, 50, 1_000_000);
    ctx.controller.set_account(Some(bob)).await;

    assert!(ctx.controller.history().is_empty());
    assert!(ctx.controller.lifecycle().is_none());
    assert_eq!(ctx.controller.phase(), BetPhase::Idle);
    assert_eq!(ctx.controller.funds().balance, 50);
    let _ = ctx.drain_notices();
}
