//! Ledger error types

use kirbec_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: u64, required: u64 },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid reward id: {0}")]
    InvalidRewardId(usize),

    #[error("Unknown reward: {0}")]
    UnknownReward(String),

    #[error("Usage: {0}")]
    UsageError(String),

    #[error("Presence source error: {0}")]
    Presence(String),

    #[error("Store error: {0}")]
    Store(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
