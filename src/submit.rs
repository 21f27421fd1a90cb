use crate::{
    chain::{
        Address,
        ChainClient,
        PendingBet,
    },
    error::{
        DiceError,
        Result,
    },
};
use tracing::info;

pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 6;

/// Rough native-currency floor for one wager transaction. The preflight
/// only has to distinguish "out of gas money" from a contract failure.
const ESTIMATED_BET_GAS: u64 = 50_000;

/// A user's wager intent, immutable once submitted.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BetRequest {
    pub number: u8,
    pub amount: u64,
}

/// Local validation, run before any network call.
pub fn validate(request: &BetRequest, balance: u64) -> Result<()> {
    if !(MIN_NUMBER..=MAX_NUMBER).contains(&request.number) {
        return Err(DiceError::validation(format!(
            "pick a number between {MIN_NUMBER} and {MAX_NUMBER}"
        )));
    }
    if request.amount == 0 {
        return Err(DiceError::validation("bet amount must be positive"));
    }
    if request.amount > balance {
        return Err(DiceError::validation(format!(
            "bet of {} exceeds balance of {}",
            request.amount, balance
        )));
    }
    Ok(())
}

/// Submit a validated wager. The chip balance is re-read here so a stale
/// form value cannot race a spend that happened since the last refresh;
/// the native balance is checked so gas exhaustion surfaces as its own
/// error. Resolves once the transaction is accepted into the pool.
pub async fn submit_bet(
    chain: &dyn ChainClient,
    account: Address,
    request: BetRequest,
) -> Result<PendingBet> {
    let balance = chain.chip_balance(account).await?;
    validate(&request, balance)?;

    let native = chain.native_balance(account).await?;
    if native < ESTIMATED_BET_GAS {
        return Err(DiceError::InsufficientGas {
            need: ESTIMATED_BET_GAS,
            available: native,
        });
    }

    let pending = chain.place_bet(account, request.number, request.amount).await?;
    info!(%account, tx = %pending.tx, number = request.number, amount = request.amount, "bet submitted");
    Ok(pending)
}
