//! Shared fixture for the integration tests: a [`BetController`] wired to
//! a [`SimChain`] with millisecond policy values and a captured notice
//! channel.

use crate::{
    chain::{
        Address,
        ChainClient,
    },
    config::Network,
    lifecycle::{
        BetController,
        BetPolicy,
    },
    notify::{
        Notice,
        NoticeSink,
    },
    sim::SimChain,
};
use chrono::TimeDelta;
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::sync::mpsc;

pub const ALICE: Address = Address([0xa1; 20]);

pub const STARTING_CHIPS: u64 = 1_000;
pub const STARTING_NATIVE: u64 = 1_000_000;

/// Policy with the production structure but millisecond timings, so a
/// full reconciliation timeout costs tens of milliseconds of test time.
pub fn fast_policy() -> BetPolicy {
    BetPolicy {
        poll_interval: Duration::from_millis(5),
        poll_budget: 5,
        correlation_window: TimeDelta::seconds(60),
        confirmation_timeout: Duration::from_millis(500),
        phase_timeout: Duration::from_millis(500),
        approval_attempts: 2,
        submit_attempts: 2,
        read_retries: 2,
        retry_backoff: Duration::from_millis(1),
    }
}

pub struct TestContext {
    pub chain: Arc<SimChain>,
    pub controller: BetController,
    pub notices: mpsc::UnboundedReceiver<Notice>,
}

impl TestContext {
    /// Alice connected with 1000 chips, plenty of gas, and no allowance.
    pub async fn new() -> Self {
        let chain = Arc::new(SimChain::new(Network::Apothem.config()));
        chain.fund(ALICE, STARTING_CHIPS, STARTING_NATIVE);

        let (sink, notices) = NoticeSink::channel();
        let client: Arc<dyn ChainClient> = chain.clone();
        let mut controller = BetController::new(client, fast_policy(), sink);
        controller.set_account(Some(ALICE)).await;

        Self {
            chain,
            controller,
            notices,
        }
    }

    pub async fn with_allowance(allowance: u64) -> Self {
        let chain = Arc::new(SimChain::new(Network::Apothem.config()));
        chain.fund(ALICE, STARTING_CHIPS, STARTING_NATIVE);
        chain.set_allowance(ALICE, allowance);

        let (sink, notices) = NoticeSink::channel();
        let client: Arc<dyn ChainClient> = chain.clone();
        let mut controller = BetController::new(client, fast_policy(), sink);
        controller.set_account(Some(ALICE)).await;

        Self {
            chain,
            controller,
            notices,
        }
    }

    /// Everything notified so far, without waiting.
    pub fn drain_notices(&mut self) -> Vec<Notice> {
        let mut out = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            out.push(notice);
        }
        out
    }
}
