use crate::chain::{
    Address,
    ChainClient,
    with_retries,
};
use std::time::Duration;
use tracing::warn;

/// Point-in-time view of the connected account's chip balance and the
/// dice contract's spending allowance. `degraded` is set when either read
/// kept failing and the last known-good value was kept; callers render it
/// as a stale indicator instead of an error.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FundsSnapshot {
    pub balance: u64,
    pub allowance: u64,
    pub degraded: bool,
}

/// Whether the current allowance covers a requested amount. Pure function
/// of its two inputs; a zero amount never needs approval.
pub fn approval_sufficient(allowance: u64, amount: u64) -> bool {
    amount == 0 || allowance >= amount
}

/// Read balance and allowance concurrently, retrying each read a bounded
/// number of times. Never fails: a persistent error keeps the figure from
/// `current` and marks the snapshot stale, so a flaky RPC endpoint cannot
/// block the betting form by itself. The submission-time balance re-check
/// stays the authoritative guard.
pub async fn read_funds(
    chain: &dyn ChainClient,
    account: Address,
    current: FundsSnapshot,
    read_retries: u32,
    backoff: Duration,
) -> FundsSnapshot {
    let (balance, allowance) = futures::join!(
        with_retries("chip_balance", read_retries, backoff, || chain
            .chip_balance(account)),
        with_retries("allowance", read_retries, backoff, || chain.allowance(account)),
    );

    let degraded = balance.is_err() || allowance.is_err();
    if let Err(e) = &balance {
        warn!(%account, error = %e, "balance read failed, keeping last known value");
    }
    if let Err(e) = &allowance {
        warn!(%account, error = %e, "allowance read failed, keeping last known value");
    }

    FundsSnapshot {
        balance: balance.unwrap_or(current.balance),
        allowance: allowance.unwrap_or(current.allowance),
        degraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Network,
        sim::SimChain,
    };
    use proptest::prelude::*;

    #[tokio::test]
    async fn read_funds__keeps_known_good_figures_when_reads_fail() {
        let chain = SimChain::new(Network::Apothem.config());
        let account = Address([0x77; 20]);
        chain.fund(account, 800, 1_000);
        chain.set_allowance(account, 300);

        let good =
            read_funds(&chain, account, FundsSnapshot::default(), 2, Duration::from_millis(1))
                .await;
        assert_eq!(
            good,
            FundsSnapshot { balance: 800, allowance: 300, degraded: false }
        );

        // both reads fail through their full retry budgets
        chain.fail_next_reads(4);
        let stale = read_funds(&chain, account, good, 2, Duration::from_millis(1)).await;
        assert!(stale.degraded);
        assert_eq!(stale.balance, 800);
        assert_eq!(stale.allowance, 300);

        // the next successful refresh clears the flag
        let recovered = read_funds(&chain, account, stale, 2, Duration::from_millis(1)).await;
        assert!(!recovered.degraded);
        assert_eq!(recovered.balance, 800);
    }

    #[test]
    fn approval_sufficient__zero_amount_never_needs_approval() {
        assert!(approval_sufficient(0, 0));
        assert!(approval_sufficient(u64::MAX, 0));
    }

    #[test]
    fn approval_sufficient__boundary() {
        assert!(approval_sufficient(500, 500));
        assert!(!approval_sufficient(499, 500));
    }

    proptest! {
        #[test]
        fn approval_sufficient__matches_definition(allowance: u64, amount: u64) {
            prop_assert_eq!(
                approval_sufficient(allowance, amount),
                amount == 0 || allowance >= amount
            );
        }
    }
}
