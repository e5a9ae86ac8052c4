//! Session state: who is connected and as what role.
//!
//! One logical session per process. The session struct is owned by the
//! coordinator and passed by reference to its readers (access gate, wallet
//! callers); it is mutated only by explicit connect, role-selection, and
//! disconnect actions — never by an in-flight invocation.

mod store;

pub use store::{FileStore, KvStore, MemoryStore, SessionStore};

use serde::{Deserialize, Serialize};

/// Capability assigned to a session, gating which contract methods it may
/// invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Owner,
    Renter,
    /// No role selected yet.
    #[default]
    None,
}

impl Role {
    pub fn name(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Owner => "owner",
            Role::Renter => "renter",
            Role::None => "none",
        }
    }

    pub fn from_name(name: &str) -> Role {
        match name {
            "admin" => Role::Admin,
            "owner" => Role::Owner,
            "renter" => Role::Renter,
            _ => Role::None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The single active session.
///
/// Invariant: `connected == true` iff `address` is non-empty. The role may
/// be selected before connecting, but access checks require both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    /// Identifier of the wallet backend the address came from.
    pub backend_id: Option<String>,
    pub address: String,
    pub role: Role,
    pub connected: bool,
}

impl Session {
    /// The empty, disconnected session created at process start.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected && !self.address.is_empty()
    }
}
