//! Closed table of typed errors reported by the rental contract.
//!
//! The numeric codes are fixed by the contract's interface descriptor.
//! Code 5 is reserved and unused; anything outside the table decodes to
//! `Error::UnknownContractError` rather than panicking.

use thiserror::Error;

/// Business-rule violation reported by the remote contract.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContractError {
    #[error("ContractInitialized")]
    ContractInitialized,
    #[error("ContractNotInitialized")]
    ContractNotInitialized,
    #[error("CarNotFound")]
    CarNotFound,
    #[error("AdminTokenConflict")]
    AdminTokenConflict,
    #[error("CarAlreadyExist")]
    CarAlreadyExist,
    #[error("AmountMustBePositive")]
    AmountMustBePositive,
    #[error("RentalNotFound")]
    RentalNotFound,
    #[error("InsufficientBalance")]
    InsufficientBalance,
    #[error("BalanceNotAvailableForAmountRequested")]
    BalanceNotAvailableForAmountRequested,
    #[error("RentalDurationCannotBeZero")]
    RentalDurationCannotBeZero,
    #[error("SelfRentalNotAllowed")]
    SelfRentalNotAllowed,
    #[error("CarAlreadyRented")]
    CarAlreadyRented,
    #[error("CarNotReturned")]
    CarNotReturned,
}

impl ContractError {
    /// Map a wire code to its typed error. `None` for reserved or unmapped codes.
    pub fn from_code(code: u32) -> Option<Self> {
        let error = match code {
            0 => Self::ContractInitialized,
            1 => Self::ContractNotInitialized,
            2 => Self::CarNotFound,
            3 => Self::AdminTokenConflict,
            4 => Self::CarAlreadyExist,
            6 => Self::AmountMustBePositive,
            7 => Self::RentalNotFound,
            8 => Self::InsufficientBalance,
            9 => Self::BalanceNotAvailableForAmountRequested,
            10 => Self::RentalDurationCannotBeZero,
            11 => Self::SelfRentalNotAllowed,
            12 => Self::CarAlreadyRented,
            13 => Self::CarNotReturned,
            _ => return None,
        };
        Some(error)
    }

    pub fn code(&self) -> u32 {
        match self {
            Self::ContractInitialized => 0,
            Self::ContractNotInitialized => 1,
            Self::CarNotFound => 2,
            Self::AdminTokenConflict => 3,
            Self::CarAlreadyExist => 4,
            Self::AmountMustBePositive => 6,
            Self::RentalNotFound => 7,
            Self::InsufficientBalance => 8,
            Self::BalanceNotAvailableForAmountRequested => 9,
            Self::RentalDurationCannotBeZero => 10,
            Self::SelfRentalNotAllowed => 11,
            Self::CarAlreadyRented => 12,
            Self::CarNotReturned => 13,
        }
    }
}
