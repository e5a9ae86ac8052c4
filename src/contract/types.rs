//! Typed values carried by contract results.

use serde::{Deserialize, Serialize};

/// Listing state as reported by `get_car_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarStatus {
    Available,
    Rented,
    Maintenance,
}

impl CarStatus {
    pub fn name(&self) -> &'static str {
        match self {
            CarStatus::Available => "available",
            CarStatus::Rented => "rented",
            CarStatus::Maintenance => "maintenance",
        }
    }
}

/// Return shape a method declares in the contract's interface descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// Success carries no value (`void` or typed error).
    Void,
    /// A signed 128-bit amount (balances, commission).
    Amount,
    /// A `CarStatus` variant.
    CarStatus,
}

/// Decoded success value of a contract call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnValue {
    Void,
    Amount(i128),
    CarStatus(CarStatus),
}

impl ReturnValue {
    pub fn as_amount(&self) -> Option<i128> {
        match self {
            ReturnValue::Amount(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_car_status(&self) -> Option<CarStatus> {
        match self {
            ReturnValue::CarStatus(s) => Some(*s),
            _ => None,
        }
    }
}
