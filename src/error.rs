use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiceError>;

/// Contract-level revert reasons the dice contract is known to emit.
/// Anything unrecognized lands in `Other` and gets the generic message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RevertReason {
    #[error("chosen number is outside the playable range")]
    InvalidNumber,

    #[error("bet amount rejected by the contract")]
    InvalidAmount,

    #[error("token allowance too low for this bet")]
    AllowanceTooLow,

    #[error("contract cannot cover the payout for this bet")]
    PayoutUnavailable,

    #[error("transaction failed: {0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiceError {
    #[error("invalid bet: {0}")]
    Validation(String),

    #[error("connect a wallet before placing a bet")]
    WalletNotConnected,

    #[error("a bet is already in flight, wait for it to finish")]
    BetInFlight,

    #[error("signature request rejected in wallet")]
    UserRejected,

    #[error("not enough native currency for gas: need {need}, have {available}")]
    InsufficientGas { need: u64, available: u64 },

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error(transparent)]
    Reverted(#[from] RevertReason),

    #[error("operation timed out: {0}")]
    Timeout(String),
}

impl DiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn rpc(msg: impl Into<String>) -> Self {
        Self::Rpc(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Transient failures are worth another attempt; everything else is
    /// either final on-chain or requires a user decision.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Rpc(_) | Self::Timeout(_))
    }
}
