//! Error types for the rent-a-car client

use crate::contract::ContractError;
use crate::session::Role;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The user closed the wallet selection flow without picking a backend.
    #[error("Wallet connection aborted by the user")]
    ConnectionAborted,

    /// A signing or session operation was attempted without a connected wallet.
    #[error("No wallet connected")]
    NotConnected,

    /// The signing agent declined to sign the envelope.
    #[error("Signing rejected by the wallet: {0}")]
    SigningRejected(String),

    /// The relay rejected the envelope or was unreachable before a hash existed.
    #[error("Submission error: {0}")]
    Submission(String),

    /// The session's role is not allowed to invoke the method.
    #[error("Role {role} may not invoke {method}")]
    RoleViolation { method: String, role: Role },

    /// An argument was missing or malformed before the call left the process.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The remote call completed and reported a typed business-rule violation.
    #[error("Contract error: {0}")]
    Contract(#[from] ContractError),

    /// The failure payload carried a code outside the closed contract table.
    #[error("Unknown contract error code {0}")]
    UnknownContractError(u32),

    /// The transaction failed on the ledger without a decodable payload.
    #[error("Transaction failed")]
    TransactionFailed,

    /// A result payload did not match the method's declared return shape.
    #[error("Malformed result payload: {0}")]
    Decode(String),

    /// Transport-level failure talking to a signing daemon.
    #[error("Wallet bridge error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
