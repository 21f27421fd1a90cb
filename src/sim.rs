use crate::{
    chain::{
        Address,
        ChainClient,
        PendingBet,
        RollOutcome,
        TxHash,
        TxReceipt,
        TxStatus,
    },
    config::NetworkConfig,
    error::{
        DiceError,
        Result,
        RevertReason,
    },
    history::HistoryEntry,
    submit::{
        MAX_NUMBER,
        MIN_NUMBER,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use sha2::{
    Digest,
    Sha256,
};
use std::{
    collections::HashMap,
    sync::Mutex,
};

/// Winnings multiplier for a matched number: a 1-in-6 pick pays five
/// times the stake on top of keeping it.
pub const WIN_MULTIPLIER: u64 = 5;

#[derive(Clone, Debug)]
struct SimRoll {
    tx: TxHash,
    account: Address,
    number: u8,
    amount: u64,
    rolled: u8,
    payout: u64,
    revert: Option<RevertReason>,
    submitted_at: chrono::DateTime<Utc>,
    // None = the fulfillment was lost and the roll never settles.
    reads_until_settled: Option<u32>,
    settled: bool,
}

#[derive(Debug, Default)]
struct Inner {
    chip_balances: HashMap<Address, u64>,
    native_balances: HashMap<Address, u64>,
    allowances: HashMap<Address, u64>,
    rolls: Vec<SimRoll>,
    injected_history: HashMap<Address, Vec<HistoryEntry>>,
    nonce: u64,
    mutation_log: Vec<&'static str>,

    // behavior switches, set by tests and the demo binary
    sync_results: bool,
    fulfillment_delay_reads: u32,
    lose_next_fulfillment: bool,
    fixed_roll: Option<u8>,
    read_failures_remaining: u32,
    approve_failures_remaining: u32,
    reject_next_approval: bool,
    revert_next_bet: Option<RevertReason>,
    pending_allowance_lag: u32,
    allowance_lag_reads: u32,
    stale_allowance: u64,
}

/// In-process stand-in for the chip token and dice contracts, playing
/// the role a local devnet with a settable fake VRF plays in end-to-end
/// testing. Rolls settle either inside the bet transaction
/// (`sync_results`) or after a configurable number of history reads,
/// which models the out-of-band randomness callback. Faults
/// (transient read failures, wallet rejection, reverts, allowance read
/// lag, lost fulfillments) are scriptable per call.
#[derive(Debug)]
pub struct SimChain {
    config: NetworkConfig,
    inner: Mutex<Inner>,
}

impl SimChain {
    /// Stand up the simulated deployment described by `config`; the
    /// contract addresses feed transaction-hash derivation so hashes
    /// differ per deployment the way they would on a real chain.
    pub fn new(config: NetworkConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                fulfillment_delay_reads: 1,
                ..Inner::default()
            }),
        }
    }

    pub fn config(&self) -> NetworkConfig {
        self.config
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // Sim state is only touched between awaits; poisoning cannot
        // happen outside a panicking test.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn fund(&self, account: Address, chips: u64, native: u64) {
        let mut inner = self.lock();
        inner.chip_balances.insert(account, chips);
        inner.native_balances.insert(account, native);
    }

    pub fn set_allowance(&self, account: Address, allowance: u64) {
        self.lock().allowances.insert(account, allowance);
    }

    /// Settle rolls inside the bet transaction instead of via the
    /// delayed-callback path.
    pub fn set_sync_results(&self, sync: bool) {
        self.lock().sync_results = sync;
    }

    /// How many history reads a roll stays pending for before its
    /// fulfillment lands.
    pub fn set_fulfillment_delay(&self, reads: u32) {
        self.lock().fulfillment_delay_reads = reads;
    }

    /// The next roll's fulfillment never arrives.
    pub fn lose_next_fulfillment(&self) {
        self.lock().lose_next_fulfillment = true;
    }

    /// Force the die for deterministic assertions.
    pub fn set_fixed_roll(&self, rolled: u8) {
        self.lock().fixed_roll = Some(rolled);
    }

    /// Fail the next `n` read calls with a transient RPC error.
    pub fn fail_next_reads(&self, n: u32) {
        self.lock().read_failures_remaining = n;
    }

    /// The next approval prompt is rejected in the wallet.
    pub fn reject_next_approval(&self) {
        self.lock().reject_next_approval = true;
    }

    /// Fail the next `n` approval submissions with a transient RPC error.
    pub fn fail_next_approvals(&self, n: u32) {
        self.lock().approve_failures_remaining = n;
    }

    /// The next bet transaction confirms but reverts with `reason`.
    pub fn revert_next_bet(&self, reason: RevertReason) {
        self.lock().revert_next_bet = Some(reason);
    }

    /// After the next approval, serve `n` allowance reads from the
    /// pre-approval value, modelling RPC read-after-write lag.
    pub fn lag_allowance_reads(&self, n: u32) {
        self.lock().pending_allowance_lag = n;
    }

    /// Inject a raw history entry, e.g. one settled by a different
    /// transaction hash.
    pub fn push_history_entry(&self, account: Address, entry: HistoryEntry) {
        self.lock().injected_history.entry(account).or_default().push(entry);
    }

    /// Ordered record of state-mutating transactions ("approve", "bet"),
    /// for sequencing assertions.
    pub fn mutation_log(&self) -> Vec<&'static str> {
        self.lock().mutation_log.clone()
    }

    pub fn bets_submitted(&self) -> usize {
        self.lock().rolls.len()
    }
}

impl Inner {
    fn next_tx(&mut self, contract: Address, account: Address) -> TxHash {
        self.nonce += 1;
        let mut hasher = Sha256::new();
        hasher.update(contract.0);
        hasher.update(account.0);
        hasher.update(self.nonce.to_be_bytes());
        TxHash(hasher.finalize().into())
    }

    fn fail_read_if_scripted(&mut self) -> Result<()> {
        if self.read_failures_remaining > 0 {
            self.read_failures_remaining -= 1;
            return Err(DiceError::rpc("simulated rpc outage"));
        }
        Ok(())
    }

    fn roll_die(&mut self) -> u8 {
        match self.fixed_roll {
            Some(rolled) => rolled,
            None => rand::rng().random_range(MIN_NUMBER..=MAX_NUMBER),
        }
    }

    /// Advance pending fulfillments by one history read for `account`.
    fn tick_fulfillments(&mut self, account: Address) {
        let mut credits = 0u64;
        for roll in self
            .rolls
            .iter_mut()
            .filter(|r| r.account == account && !r.settled && r.revert.is_none())
        {
            if let Some(reads) = roll.reads_until_settled.as_mut() {
                *reads = reads.saturating_sub(1);
                if *reads == 0 {
                    roll.settled = true;
                    credits += roll.payout;
                }
            }
        }
        if credits > 0 {
            *self.chip_balances.entry(account).or_default() += credits;
        }
    }

    fn entry_for(roll: &SimRoll) -> HistoryEntry {
        HistoryEntry {
            chosen: roll.number,
            rolled: roll.settled.then_some(roll.rolled),
            amount: roll.amount,
            payout: if roll.settled { roll.payout } else { 0 },
            won: roll.settled && roll.payout > 0,
            timestamp: roll.submitted_at,
            tx: roll.tx,
        }
    }
}

#[async_trait]
impl ChainClient for SimChain {
    async fn chip_balance(&self, account: Address) -> Result<u64> {
        let mut inner = self.lock();
        inner.fail_read_if_scripted()?;
        Ok(inner.chip_balances.get(&account).copied().unwrap_or(0))
    }

    async fn allowance(&self, owner: Address) -> Result<u64> {
        let mut inner = self.lock();
        inner.fail_read_if_scripted()?;
        if inner.allowance_lag_reads > 0 {
            inner.allowance_lag_reads -= 1;
            return Ok(inner.stale_allowance);
        }
        Ok(inner.allowances.get(&owner).copied().unwrap_or(0))
    }

    async fn native_balance(&self, account: Address) -> Result<u64> {
        let mut inner = self.lock();
        inner.fail_read_if_scripted()?;
        Ok(inner.native_balances.get(&account).copied().unwrap_or(0))
    }

    async fn approve_max(&self, owner: Address) -> Result<TxHash> {
        let mut inner = self.lock();
        if std::mem::take(&mut inner.reject_next_approval) {
            return Err(DiceError::UserRejected);
        }
        if inner.approve_failures_remaining > 0 {
            inner.approve_failures_remaining -= 1;
            return Err(DiceError::rpc("simulated broadcast failure"));
        }
        inner.stale_allowance = inner.allowances.get(&owner).copied().unwrap_or(0);
        inner.allowance_lag_reads = std::mem::take(&mut inner.pending_allowance_lag);
        inner.allowances.insert(owner, u64::MAX);
        inner.mutation_log.push("approve");
        Ok(inner.next_tx(self.config.chip_token, owner))
    }

    async fn place_bet(&self, account: Address, number: u8, amount: u64) -> Result<PendingBet> {
        let mut inner = self.lock();
        let tx = inner.next_tx(self.config.dice_contract, account);
        let submitted_at = Utc::now();
        inner.mutation_log.push("bet");

        let revert = inner.revert_next_bet.take().or_else(|| {
            let allowance = inner.allowances.get(&account).copied().unwrap_or(0);
            let balance = inner.chip_balances.get(&account).copied().unwrap_or(0);
            if allowance < amount {
                Some(RevertReason::AllowanceTooLow)
            } else if balance < amount {
                Some(RevertReason::InvalidAmount)
            } else {
                None
            }
        });

        let (rolled, payout) = if revert.is_none() {
            // Stake moves on inclusion; winnings come back on settlement.
            *inner.chip_balances.entry(account).or_default() -= amount;
            if let Some(allowance) = inner.allowances.get_mut(&account) {
                *allowance = allowance.saturating_sub(amount);
            }
            let rolled = inner.roll_die();
            let payout = if rolled == number {
                amount + amount * WIN_MULTIPLIER
            } else {
                0
            };
            (rolled, payout)
        } else {
            (0, 0)
        };

        let sync = inner.sync_results;
        let reads_until_settled = if std::mem::take(&mut inner.lose_next_fulfillment) {
            None
        } else {
            Some(inner.fulfillment_delay_reads.max(1))
        };

        let mut roll = SimRoll {
            tx,
            account,
            number,
            amount,
            rolled,
            payout,
            revert,
            submitted_at,
            reads_until_settled,
            settled: false,
        };
        if sync && roll.revert.is_none() {
            roll.settled = true;
            *inner.chip_balances.entry(account).or_default() += roll.payout;
        }
        inner.rolls.push(roll);

        Ok(PendingBet {
            tx,
            number,
            amount,
            submitted_at,
        })
    }

    async fn wait_for_receipt(&self, tx: TxHash) -> Result<TxReceipt> {
        let inner = self.lock();
        let roll = inner
            .rolls
            .iter()
            .find(|r| r.tx == tx)
            .ok_or_else(|| DiceError::rpc(format!("unknown transaction {tx}")))?;
        let status = match &roll.revert {
            Some(reason) => TxStatus::Reverted(reason.clone()),
            None => TxStatus::Confirmed,
        };
        let outcome = (roll.settled && inner.sync_results).then_some(RollOutcome {
            rolled: roll.rolled,
            payout: roll.payout,
        });
        Ok(TxReceipt { tx, status, outcome })
    }

    async fn bet_history(&self, account: Address) -> Result<Vec<HistoryEntry>> {
        let mut inner = self.lock();
        inner.fail_read_if_scripted()?;
        inner.tick_fulfillments(account);

        let mut entries: Vec<HistoryEntry> = inner
            .rolls
            .iter()
            .filter(|r| r.account == account && r.revert.is_none())
            .map(Inner::entry_for)
            .collect();
        if let Some(injected) = inner.injected_history.get(&account) {
            entries.extend(injected.iter().cloned());
        }
        entries.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(entries)
    }
}
