use crate::{
    error::{
        DiceError,
        Result,
        RevertReason,
    },
    history::HistoryEntry,
};
use async_trait::async_trait;
use chrono::{
    DateTime,
    Utc,
};
use std::{
    fmt,
    time::Duration,
};
use tokio::time;
use tracing::warn;

/// A 20-byte account or contract address, rendered 0x-prefixed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn parse(s: &str) -> Result<Self> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped)
            .map_err(|e| DiceError::validation(format!("bad address {s}: {e}")))?;
        let bytes: [u8; 20] = bytes
            .try_into()
            .map_err(|_| DiceError::validation(format!("address {s} is not 20 bytes")))?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// A 32-byte transaction hash.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// Addresses and hashes serialize as 0x-hex strings so exported history is
// readable next to block-explorer output.
impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(d)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl serde::Serialize for TxHash {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for TxHash {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(d)?;
        let stripped = raw.strip_prefix("0x").unwrap_or(&raw);
        let bytes = hex::decode(stripped).map_err(serde::de::Error::custom)?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("tx hash is not 32 bytes"))?;
        Ok(Self(bytes))
    }
}

/// Result of a settled wager, either embedded in the bet transaction's
/// events or recovered later from history.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RollOutcome {
    pub rolled: u8,
    pub payout: u64,
}

impl RollOutcome {
    pub fn won(&self) -> bool {
        self.payout > 0
    }
}

/// Handle returned as soon as a wager transaction enters the pool.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PendingBet {
    pub tx: TxHash,
    pub number: u8,
    pub amount: u64,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxStatus {
    Confirmed,
    Reverted(RevertReason),
}

/// Inclusion receipt for a wager or approval transaction. `outcome` is
/// present only when the contract settles the roll inside the same
/// transaction; the VRF-callback build leaves it empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx: TxHash,
    pub status: TxStatus,
    pub outcome: Option<RollOutcome>,
}

/// Everything the bet lifecycle needs from the chain. Production builds
/// implement this over a JSON-RPC client; tests and the demo binary use
/// [`crate::sim::SimChain`].
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Chip-token balance of `account`.
    async fn chip_balance(&self, account: Address) -> Result<u64>;

    /// Chip-token allowance granted by `owner` to the dice contract.
    async fn allowance(&self, owner: Address) -> Result<u64>;

    /// Native-currency balance of `account`, for gas preflight.
    async fn native_balance(&self, account: Address) -> Result<u64>;

    /// Approve the dice contract for the maximum representable amount and
    /// wait for inclusion. Returns the approval transaction hash.
    async fn approve_max(&self, owner: Address) -> Result<TxHash>;

    /// Submit a wager; resolves as soon as the transaction is accepted
    /// into the pool, not when it confirms.
    async fn place_bet(&self, account: Address, number: u8, amount: u64) -> Result<PendingBet>;

    /// Wait for the inclusion receipt of a previously submitted
    /// transaction.
    async fn wait_for_receipt(&self, tx: TxHash) -> Result<TxReceipt>;

    /// Settled wagers recorded for `account`, newest first.
    async fn bet_history(&self, account: Address) -> Result<Vec<HistoryEntry>>;
}

/// Run `op` up to `attempts` times, sleeping `backoff` between tries.
/// Only transient errors are retried; anything final is returned as-is.
pub async fn with_retries<T, F, Fut>(
    label: &str,
    attempts: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(%label, %attempt, error = %e, "transient failure, retrying");
                time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}
