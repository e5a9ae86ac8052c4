//! Rent-a-car orchestration client
//!
//! Turns a typed user intent ("rent this car for N days") into a signed,
//! submitted, and confirmed ledger transaction against the remote rental
//! contract:
//!
//! - Role-gates every intent before anything is built
//! - Encodes calls against the contract's closed method table
//! - Delegates signing to external, user-controlled wallet daemons
//! - Submits to the network relay and polls to a terminal outcome
//!
//! # Failure model
//!
//! Nothing here retries a ledger write automatically and nothing is fatal
//! to the process: every path returns a classified error, and a submission
//! whose attempt budget runs out is reported as *unresolved* — it may
//! still finalize, and any follow-up is the caller's.

pub mod access;
pub mod audit;
pub mod client;
pub mod config;
pub mod contract;
pub mod pipeline;
pub mod relay;
pub mod session;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use client::{Components, RentACar};
pub use config::{Config, CONTRACT_ID_ENV, RELAY_URL_ENV};
pub use contract::{CarStatus, ContractError, Method};
pub use error::{Error, Result};
pub use pipeline::{Outcome, PollPolicy};
pub use session::{Role, Session};
