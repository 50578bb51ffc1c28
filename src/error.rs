//! Ledger error types

use serde::Serialize;
use thiserror::Error;

/// Rejection reasons for ledger operations.
///
/// Every failure leaves the ledger exactly as it was before the call.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("caller is not an admin")]
    NotAdmin,

    #[error("cannot pay out to the zero address")]
    CannotPayoutZeroAddress,

    #[error("invalid percentage {0}: must be between 0 and 100")]
    InvalidPercentage(u32),

    #[error("no funds attached")]
    NoFundsAttached,

    #[error("bounty id must not be empty")]
    EmptyBountyId,

    #[error("no bounty with id '{0}'")]
    NoBountyWithId(String),

    #[error("caller is already working on this bounty")]
    AlreadyWorking,

    #[error("transfer failed: {0}")]
    TransferFailed(String),

    #[error("bounty pool overflow")]
    PoolOverflow,

    #[error("bounty pool underflow")]
    PoolUnderflow,

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Coarse classification of a [`LedgerError`], used by transports to pick a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    InvalidArgument,
    NotFound,
    Conflict,
    TransferFailed,
    Internal,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::NotAdmin => ErrorKind::Unauthorized,
            LedgerError::CannotPayoutZeroAddress
            | LedgerError::InvalidPercentage(_)
            | LedgerError::NoFundsAttached
            | LedgerError::EmptyBountyId
            | LedgerError::InvalidAddress(_) => ErrorKind::InvalidArgument,
            LedgerError::NoBountyWithId(_) => ErrorKind::NotFound,
            LedgerError::AlreadyWorking => ErrorKind::Conflict,
            LedgerError::TransferFailed(_) => ErrorKind::TransferFailed,
            LedgerError::PoolOverflow
            | LedgerError::PoolUnderflow
            | LedgerError::Storage(_)
            | LedgerError::Corrupt(_) => ErrorKind::Internal,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
