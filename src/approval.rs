use crate::{
    chain::{
        Address,
        ChainClient,
    },
    error::{
        DiceError,
        Result,
    },
    funds::approval_sufficient,
};
use std::time::Duration;
use tokio::time;
use tracing::{
    debug,
    info,
    warn,
};

/// Make sure the dice contract may spend at least `amount` of the
/// account's chips, approving the maximum representable allowance when it
/// may not. Confirmed approvals count as success even when the follow-up
/// allowance read still shows the old value, since RPC reads can lag a
/// write by a few blocks; an unconfirmed or reverted approval never does.
/// The whole flow is retried up to `attempts` times on transient failure.
/// A wallet-reported rejection is terminal.
pub async fn ensure_allowance(
    chain: &dyn ChainClient,
    account: Address,
    amount: u64,
    attempts: u32,
    backoff: Duration,
) -> Result<()> {
    let current = chain.allowance(account).await.unwrap_or(0);
    if approval_sufficient(current, amount) {
        return Ok(());
    }

    let mut attempt = 0;
    loop {
        attempt += 1;
        match approve_once(chain, account, amount).await {
            Ok(()) => return Ok(()),
            Err(e @ DiceError::UserRejected) => return Err(e),
            Err(e) if e.is_transient() && attempt < attempts => {
                warn!(%account, %attempt, error = %e, "approval attempt failed, retrying");
                time::sleep(backoff).await;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn approve_once(chain: &dyn ChainClient, account: Address, amount: u64) -> Result<()> {
    let tx = chain.approve_max(account).await?;
    info!(%account, %tx, "approval confirmed");

    // Verify the increase; a stale read is tolerated, the confirmed
    // transaction is authoritative.
    let refreshed = chain.allowance(account).await.unwrap_or(0);
    if !approval_sufficient(refreshed, amount) {
        debug!(%tx, %refreshed, "allowance read lags confirmed approval, proceeding");
    }
    Ok(())
}
