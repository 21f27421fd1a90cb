//! Client-side core for the GAMA dice game: wallet funds tracking,
//! spending approval, wager submission, and reconciliation of each bet
//! against its asynchronously delivered roll result.
//!
//! The rendering layer and notification sink are collaborators, not part
//! of this crate: the [`lifecycle::BetController`] publishes notices over
//! a channel and exposes pull-based snapshots, and reaches the chain only
//! through the [`chain::ChainClient`] trait.

pub mod approval;
pub mod chain;
pub mod config;
pub mod error;
pub mod funds;
pub mod history;
pub mod lifecycle;
pub mod notify;
pub mod reconcile;
pub mod sim;
pub mod submit;

pub mod test_helpers;

pub use chain::{
    Address,
    ChainClient,
    TxHash,
};
pub use error::{
    DiceError,
    Result,
};
pub use lifecycle::{
    BetController,
    BetPhase,
    BetPolicy,
};
pub use submit::BetRequest;
