use crate::{
    approval::ensure_allowance,
    chain::{
        Address,
        ChainClient,
        RollOutcome,
        TxHash,
        TxStatus,
        with_retries,
    },
    error::{
        DiceError,
        Result,
    },
    funds::{
        FundsSnapshot,
        approval_sufficient,
        read_funds,
    },
    history::HistoryCache,
    notify::NoticeSink,
    reconcile::{
        Reconciliation,
        reconcile_outcome,
    },
    submit::{
        BetRequest,
        submit_bet,
        validate,
    },
};
use chrono::TimeDelta;
use std::{
    sync::Arc,
    time::Duration,
};
use tokio::time;
use tracing::{
    error,
    info,
};

/// Retry and timeout policy for one bet lifecycle. The defaults are the
/// values observed in production; tests shrink them to milliseconds.
#[derive(Copy, Clone, Debug)]
pub struct BetPolicy {
    pub poll_interval: Duration,
    pub poll_budget: u32,
    pub correlation_window: TimeDelta,
    pub confirmation_timeout: Duration,
    pub phase_timeout: Duration,
    pub approval_attempts: u32,
    pub submit_attempts: u32,
    pub read_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for BetPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            poll_budget: 5,
            correlation_window: TimeDelta::seconds(60),
            confirmation_timeout: Duration::from_secs(90),
            phase_timeout: Duration::from_secs(90),
            approval_attempts: 2,
            submit_attempts: 2,
            read_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BetPhase {
    #[default]
    Idle,
    Validating,
    ApprovalPending,
    Submitting,
    AwaitingConfirmation,
    AwaitingResult,
    Resolved,
    Errored,
    TimedOut,
}

impl BetPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Errored | Self::TimedOut)
    }

    /// True while a wager is somewhere between submission trigger and a
    /// terminal phase.
    pub fn in_flight(&self) -> bool {
        !matches!(self, Self::Idle) && !self.is_terminal()
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::ApprovalPending => "approving",
            Self::Submitting => "submitting",
            Self::AwaitingConfirmation => "confirming",
            Self::AwaitingResult => "waiting for roll",
            Self::Resolved => "resolved",
            Self::Errored => "failed",
            Self::TimedOut => "timed out",
        }
    }
}

/// The mutable state of one in-flight wager. Superseded by the next
/// `place_bet` once terminal.
#[derive(Clone, Debug)]
pub struct BetLifecycle {
    pub phase: BetPhase,
    pub request: BetRequest,
    pub tx: Option<TxHash>,
    pub result: Option<RollOutcome>,
    pub retry_count: u32,
    pub timed_out: bool,
    pub error: Option<DiceError>,
}

impl BetLifecycle {
    fn new(request: BetRequest) -> Self {
        Self {
            phase: BetPhase::Validating,
            request,
            tx: None,
            result: None,
            retry_count: 0,
            timed_out: false,
            error: None,
        }
    }
}

/// Sequences one wager from form submission to a terminal phase:
/// validation, approval when the allowance is short, submission,
/// confirmation, and outcome reconciliation. Publishes every user-visible
/// event to the notice channel and keeps the displayed funds consistent
/// with chain state across optimistic updates. At most one lifecycle is
/// in flight per account; a second submission is rejected until the
/// current one reaches a terminal phase.
pub struct BetController {
    chain: Arc<dyn ChainClient>,
    policy: BetPolicy,
    notices: NoticeSink,
    account: Option<Address>,
    funds: FundsSnapshot,
    funds_before_bet: Option<FundsSnapshot>,
    history: HistoryCache,
    lifecycle: Option<BetLifecycle>,
    in_progress: bool,
}

impl BetController {
    pub fn new(chain: Arc<dyn ChainClient>, policy: BetPolicy, notices: NoticeSink) -> Self {
        Self {
            chain,
            policy,
            notices,
            account: None,
            funds: FundsSnapshot::default(),
            funds_before_bet: None,
            history: HistoryCache::new(),
            lifecycle: None,
            in_progress: false,
        }
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn funds(&self) -> FundsSnapshot {
        self.funds
    }

    pub fn history(&self) -> &HistoryCache {
        &self.history
    }

    pub fn lifecycle(&self) -> Option<&BetLifecycle> {
        self.lifecycle.as_ref()
    }

    pub fn phase(&self) -> BetPhase {
        self.lifecycle.as_ref().map(|l| l.phase).unwrap_or_default()
    }

    /// Switch the active account. Tears down the previous account's cache
    /// and lifecycle so nothing from the old session leaks into the new
    /// one.
    pub async fn set_account(&mut self, account: Option<Address>) {
        self.account = account;
        self.history.clear();
        self.lifecycle = None;
        self.funds_before_bet = None;
        self.funds = FundsSnapshot::default();
        if let Some(account) = account {
            self.refresh_funds().await;
            self.refresh_history().await;
            info!(%account, "account connected");
        }
    }

    /// Re-read balance and allowance. Skipped while a bet is in flight so
    /// a background tick cannot clobber the optimistic adjustment.
    pub async fn refresh_funds(&mut self) {
        if self.in_progress {
            return;
        }
        if let Some(account) = self.account {
            self.funds = read_funds(
                self.chain.as_ref(),
                account,
                self.funds,
                self.policy.read_retries,
                self.policy.retry_backoff,
            )
            .await;
        }
    }

    /// Merge the chain's view of bet history into the cache.
    pub async fn refresh_history(&mut self) {
        let Some(account) = self.account else {
            return;
        };
        match self.chain.bet_history(account).await {
            Ok(fresh) => self.history.merge(fresh),
            Err(e) => info!(%account, error = %e, "history refresh failed"),
        }
    }

    /// Run one wager to a terminal phase. Pre-flight rejections (no
    /// wallet, invalid input, a bet already in flight) leave the machine
    /// in `Idle` and only produce a notice; every failure past that point
    /// lands in `Errored` or `TimedOut` with the optimistic funds
    /// adjustment reverted.
    pub async fn place_bet(&mut self, request: BetRequest) -> BetPhase {
        let Some(account) = self.account else {
            self.notices.warning(DiceError::WalletNotConnected.to_string());
            return BetPhase::Idle;
        };
        if self.in_progress || self.phase().in_flight() {
            self.notices.warning(DiceError::BetInFlight.to_string());
            return self.phase();
        }

        // Validating: reject locally before any network call.
        if let Err(e) = validate(&request, self.funds.balance) {
            self.notices.warning(e.to_string());
            self.lifecycle = None;
            return BetPhase::Idle;
        }
        self.lifecycle = Some(BetLifecycle::new(request));

        self.in_progress = true;
        let driven = self.drive(account, request).await;
        self.in_progress = false;

        if let Err(e) = driven {
            self.revert_optimistic();
            self.notify_failure(&e);
            if let Some(lifecycle) = self.lifecycle.as_mut() {
                lifecycle.error = Some(e);
            }
            self.set_phase(BetPhase::Errored);
        }
        self.phase()
    }

    async fn drive(&mut self, account: Address, request: BetRequest) -> Result<()> {
        let chain = Arc::clone(&self.chain);

        if !approval_sufficient(self.funds.allowance, request.amount) {
            self.set_phase(BetPhase::ApprovalPending);
            self.notices.info("approving chip spending for the dice contract");
            time::timeout(
                self.policy.phase_timeout,
                ensure_allowance(
                    chain.as_ref(),
                    account,
                    request.amount,
                    self.policy.approval_attempts,
                    self.policy.retry_backoff,
                ),
            )
            .await
            .map_err(|_| DiceError::timeout("approval did not complete"))??;
            self.notices.success("spending approved");
        }

        self.set_phase(BetPhase::Submitting);
        self.apply_optimistic(request.amount);
        let pending = time::timeout(
            self.policy.phase_timeout,
            with_retries(
                "submit_bet",
                self.policy.submit_attempts,
                self.policy.retry_backoff,
                || submit_bet(chain.as_ref(), account, request),
            ),
        )
        .await
        .map_err(|_| DiceError::timeout("bet submission did not complete"))??;
        if let Some(lifecycle) = self.lifecycle.as_mut() {
            lifecycle.tx = Some(pending.tx);
        }
        self.notices
            .info(format!("bet placed: {} on {}", request.amount, request.number));

        self.set_phase(BetPhase::AwaitingConfirmation);
        let receipt = time::timeout(
            self.policy.confirmation_timeout,
            chain.wait_for_receipt(pending.tx),
        )
        .await
        .map_err(|_| DiceError::timeout("transaction confirmation"))??;
        if let TxStatus::Reverted(reason) = receipt.status {
            return Err(reason.into());
        }

        if receipt.outcome.is_none() {
            // VRF callback pending; fall back to history polling.
            self.set_phase(BetPhase::AwaitingResult);
            self.notices.info("waiting for the roll result");
        }
        let reconciliation = reconcile_outcome(
            chain.as_ref(),
            account,
            &pending,
            &receipt,
            self.policy.poll_interval,
            self.policy.poll_budget,
            self.policy.correlation_window,
        )
        .await;

        match reconciliation {
            Reconciliation::Resolved { outcome, entry } => {
                self.history.insert(entry);
                if let Some(lifecycle) = self.lifecycle.as_mut() {
                    lifecycle.result = Some(outcome);
                }
                self.set_phase(BetPhase::Resolved);
                if outcome.won() {
                    self.notices.success(format!(
                        "rolled {} - won {} chips",
                        outcome.rolled, outcome.payout
                    ));
                } else {
                    self.notices.info(format!(
                        "rolled {} - lost {} chips",
                        outcome.rolled, request.amount
                    ));
                }
                // Replace the optimistic figures with confirmed ones.
                self.funds_before_bet = None;
                self.funds = read_funds(
                    chain.as_ref(),
                    account,
                    self.funds,
                    self.policy.read_retries,
                    self.policy.retry_backoff,
                )
                .await;
            }
            Reconciliation::TimedOut { retries } => {
                if let Some(lifecycle) = self.lifecycle.as_mut() {
                    lifecycle.retry_count = retries;
                    lifecycle.timed_out = true;
                }
                self.revert_optimistic();
                self.set_phase(BetPhase::TimedOut);
                self.notices.warning(
                    "could not confirm the roll result - check your bet history",
                );
            }
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: BetPhase) {
        if let Some(lifecycle) = self.lifecycle.as_mut() {
            info!(from = lifecycle.phase.label(), to = phase.label(), "phase transition");
            lifecycle.phase = phase;
        }
    }

    /// Show the post-bet figures before the chain confirms them, so the
    /// form reflects the spend immediately.
    fn apply_optimistic(&mut self, amount: u64) {
        self.funds_before_bet = Some(self.funds);
        self.funds.balance = self.funds.balance.saturating_sub(amount);
        self.funds.allowance = self.funds.allowance.saturating_sub(amount);
    }

    /// Restore the last known-good figures. Idempotent: the stash is
    /// consumed on first use.
    fn revert_optimistic(&mut self) {
        if let Some(before) = self.funds_before_bet.take() {
            self.funds = before;
        }
    }

    #[cfg(test)]
    pub(crate) fn force_in_progress(&mut self, value: bool) {
        self.in_progress = value;
    }

    fn notify_failure(&self, e: &DiceError) {
        match e {
            DiceError::UserRejected => {
                self.notices.warning("signature request rejected in wallet");
            }
            DiceError::Reverted(reason) => {
                error!(error = %reason, "bet transaction reverted");
                self.notices.error(reason.to_string());
            }
            DiceError::InsufficientGas { need, available } => {
                self.notices.error(format!(
                    "not enough native currency for gas (need {need}, have {available})"
                ));
            }
            DiceError::Timeout(what) => {
                self.notices.error(format!("{what}; you can retry"));
            }
            other => {
                error!(error = %other, "bet failed");
                self.notices.error(format!("bet failed: {other}"));
            }
        }
    }
}
