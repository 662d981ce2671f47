//! Bet engine error types

use crate::bet::BetId;
use kirbec_ledger::{LedgerError, UserId};
use kirbec_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BetError {
    #[error("Usage: {0}")]
    UsageError(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Bet not found: {0}")]
    InvalidBetId(BetId),

    #[error("Invalid option: {0}")]
    InvalidOption(usize),

    #[error("User {0} is not the bet creator or an administrator")]
    NotAuthorized(UserId),

    #[error("Insufficient funds: balance {balance}, required {required}")]
    InsufficientFunds { balance: u64, required: u64 },

    #[error("Betting is closed for bet {0}")]
    BettingClosed(BetId),

    #[error("Already wagered on option '{existing}'; only one option per bet")]
    MultipleOptionsNotAllowed { existing: String },

    #[error("Already wagered on option '{option}'")]
    DuplicateWager { option: String },

    #[error("Bet {0} is already completed")]
    AlreadyCompleted(BetId),

    #[error(transparent)]
    Ledger(LedgerError),

    #[error("Store error: {0}")]
    Store(#[from] StorageError),
}

impl From<LedgerError> for BetError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientFunds { balance, required } => {
                BetError::InsufficientFunds { balance, required }
            }
            LedgerError::Store(e) => BetError::Store(e),
            other => BetError::Ledger(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, BetError>;
