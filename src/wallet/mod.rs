//! Wallet bridge: one capability surface over heterogeneous signing agents.
//!
//! The signing agents are external and user-controlled; key material never
//! enters this process. `WalletKit` multiplexes the configured backends and
//! owns the connect flow: selection is a single future resolved exactly
//! once (the chosen backend) or failed exactly once (`ConnectionAborted`).
//! Connecting may wait on a human indefinitely, so it must never block an
//! unrelated in-flight submission — callers await it as an ordinary task.

mod bridge;

pub use bridge::{AlbedoBridge, BridgeConfig, FreighterBridge, XbullBridge};

use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The supported signing backend kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Freighter,
    Xbull,
    Albedo,
}

impl BackendKind {
    pub fn id(&self) -> &'static str {
        match self {
            BackendKind::Freighter => "freighter",
            BackendKind::Xbull => "xbull",
            BackendKind::Albedo => "albedo",
        }
    }

    pub fn from_id(id: &str) -> Option<BackendKind> {
        match id {
            "freighter" => Some(BackendKind::Freighter),
            "xbull" => Some(BackendKind::Xbull),
            "albedo" => Some(BackendKind::Albedo),
            _ => None,
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// An external signing agent.
#[async_trait]
pub trait SigningBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// The account address the agent signs for.
    async fn address(&self) -> Result<String>;

    /// Sign an unsigned envelope. Fails with `SigningRejected` when the
    /// user declines in the agent.
    async fn sign(&self, envelope: &str, network_passphrase: &str, address: &str)
        -> Result<String>;

    /// Tell the agent the session is over. Best effort.
    async fn disconnect(&self) -> Result<()>;
}

/// Resolves the backend-selection interaction. Returning `None` means the
/// user cancelled.
#[async_trait]
pub trait BackendSelector: Send + Sync {
    async fn select(&self, options: &[BackendKind]) -> Option<BackendKind>;
}

/// Multiplexer over the configured signing backends.
pub struct WalletKit {
    backends: Vec<Arc<dyn SigningBackend>>,
    active: RwLock<Option<Arc<dyn SigningBackend>>>,
}

impl WalletKit {
    pub fn new(backends: Vec<Arc<dyn SigningBackend>>) -> Self {
        Self {
            backends,
            active: RwLock::new(None),
        }
    }

    pub fn kinds(&self) -> Vec<BackendKind> {
        self.backends.iter().map(|b| b.kind()).collect()
    }

    pub async fn active_kind(&self) -> Option<BackendKind> {
        self.active.read().await.as_ref().map(|b| b.kind())
    }

    /// Re-activate a backend by id, as persisted in a restored session.
    pub async fn activate(&self, backend_id: &str) -> Result<()> {
        let kind = BackendKind::from_id(backend_id)
            .ok_or_else(|| Error::Wallet(format!("unknown wallet backend `{backend_id}`")))?;
        let backend = self
            .backends
            .iter()
            .find(|b| b.kind() == kind)
            .cloned()
            .ok_or_else(|| Error::Wallet(format!("backend `{backend_id}` is not configured")))?;
        *self.active.write().await = Some(backend);
        Ok(())
    }

    /// Run the selection flow and connect to the chosen backend.
    ///
    /// Suspends until the selector resolves. Cancellation surfaces as
    /// `ConnectionAborted` and leaves no backend active.
    pub async fn connect(&self, selector: &dyn BackendSelector) -> Result<String> {
        let options = self.kinds();
        let kind = selector
            .select(&options)
            .await
            .ok_or(Error::ConnectionAborted)?;

        let backend = self
            .backends
            .iter()
            .find(|b| b.kind() == kind)
            .cloned()
            .ok_or_else(|| Error::Wallet(format!("backend `{kind}` is not configured")))?;

        let address = backend.address().await?;
        if address.is_empty() {
            // An empty address would break the session invariant.
            return Err(Error::Wallet(format!("backend `{kind}` returned no address")));
        }
        info!(backend = %kind, %address, "Wallet connected");
        *self.active.write().await = Some(backend);
        Ok(address)
    }

    /// Sign an envelope with the active backend.
    pub async fn sign(
        &self,
        envelope: &str,
        network_passphrase: &str,
        address: &str,
    ) -> Result<String> {
        let backend = {
            let active = self.active.read().await;
            active.clone().ok_or(Error::NotConnected)?
        };
        backend.sign(envelope, network_passphrase, address).await
    }

    /// Disconnect the active backend, if any. Idempotent and infallible
    /// locally: a failing backend call is logged and swallowed so the
    /// session is always cleared.
    pub async fn disconnect(&self) {
        let backend = self.active.write().await.take();
        if let Some(backend) = backend {
            if let Err(e) = backend.disconnect().await {
                warn!(backend = %backend.kind(), error = %e, "Backend disconnect failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct FakeBackend {
        kind: BackendKind,
        fail_disconnect: bool,
        disconnected: AtomicBool,
    }

    impl FakeBackend {
        fn new(kind: BackendKind) -> Self {
            Self {
                kind,
                fail_disconnect: false,
                disconnected: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl SigningBackend for FakeBackend {
        fn kind(&self) -> BackendKind {
            self.kind
        }

        async fn address(&self) -> Result<String> {
            Ok(format!("G{}", self.kind.id().to_uppercase()))
        }

        async fn sign(&self, envelope: &str, _: &str, _: &str) -> Result<String> {
            Ok(format!("signed:{envelope}"))
        }

        async fn disconnect(&self) -> Result<()> {
            self.disconnected.store(true, Ordering::SeqCst);
            if self.fail_disconnect {
                return Err(Error::Wallet("agent unreachable".to_string()));
            }
            Ok(())
        }
    }

    struct Pick(BackendKind);

    #[async_trait]
    impl BackendSelector for Pick {
        async fn select(&self, _: &[BackendKind]) -> Option<BackendKind> {
            Some(self.0)
        }
    }

    struct Cancel;

    #[async_trait]
    impl BackendSelector for Cancel {
        async fn select(&self, _: &[BackendKind]) -> Option<BackendKind> {
            None
        }
    }

    fn kit() -> WalletKit {
        WalletKit::new(vec![
            Arc::new(FakeBackend::new(BackendKind::Freighter)),
            Arc::new(FakeBackend::new(BackendKind::Xbull)),
        ])
    }

    #[tokio::test]
    async fn connect_resolves_selected_backend() {
        let kit = kit();
        let address = kit.connect(&Pick(BackendKind::Xbull)).await.unwrap();
        assert_eq!(address, "GXBULL");
        assert_eq!(kit.active_kind().await, Some(BackendKind::Xbull));
    }

    #[tokio::test]
    async fn cancelled_selection_aborts_connection() {
        let kit = kit();
        let err = kit.connect(&Cancel).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionAborted));
        assert_eq!(kit.active_kind().await, None);
    }

    #[tokio::test]
    async fn sign_without_connection_fails() {
        let kit = kit();
        let err = kit.sign("envelope", "passphrase", "GADDR").await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
    }

    #[tokio::test]
    async fn disconnect_swallows_backend_failure() {
        let backend = Arc::new(FakeBackend {
            kind: BackendKind::Albedo,
            fail_disconnect: true,
            disconnected: AtomicBool::new(false),
        });
        let kit = WalletKit::new(vec![backend.clone()]);
        kit.connect(&Pick(BackendKind::Albedo)).await.unwrap();

        kit.disconnect().await;
        assert!(backend.disconnected.load(Ordering::SeqCst));
        assert_eq!(kit.active_kind().await, None);

        // Idempotent.
        kit.disconnect().await;
    }

    #[tokio::test]
    async fn activate_restores_persisted_backend() {
        let kit = kit();
        kit.activate("freighter").await.unwrap();
        assert_eq!(kit.active_kind().await, Some(BackendKind::Freighter));
        assert!(kit.activate("ledger").await.is_err());
    }
}
