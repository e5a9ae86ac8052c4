//! Access gate: role-based authorization for contract methods.
//!
//! The policy table is fixed at compile time and is checked before a call
//! is ever built, so a disallowed invocation produces no network traffic.

use crate::contract::Method;
use crate::session::{Role, Session};
use crate::{Error, Result};

/// Pure function of session and method: allow, or deny with the violated
/// role requirement. Requires a connected session for every method.
pub fn authorize(session: &Session, method: Method) -> Result<()> {
    if !session.is_connected() {
        return Err(Error::NotConnected);
    }

    let allowed: &[Role] = match method {
        Method::SetAdminCommission | Method::PayoutAdmin | Method::RemoveCar => &[Role::Admin],
        Method::AddCar | Method::PayoutOwner => &[Role::Owner],
        Method::Rental | Method::ReturnCar => &[Role::Renter],
        // Read-only queries: any connected session.
        Method::GetAdminCommission | Method::GetCarStatus | Method::GetAdminBalance => {
            return Ok(())
        }
    };

    if allowed.contains(&session.role) {
        return Ok(());
    }

    Err(Error::RoleViolation {
        method: method.name().to_string(),
        role: session.role,
    })
}
