//! Client coordinator.
//!
//! Owns the single session and wires the orchestration path: access gate →
//! contract proxy → wallet kit → submission pipeline, with every
//! submission audited. The session is the only shared mutable state;
//! invocations read a snapshot of it and never write it back. Multiple
//! invocations may be in flight concurrently, including while a connect
//! flow waits on the user.

use crate::access;
use crate::audit::AuditLog;
use crate::config::Config;
use crate::contract::{ContractProxy, Method};
use crate::pipeline::{Outcome, PollPolicy, SubmissionPipeline};
use crate::relay::{HttpRelay, Relay};
use crate::session::{FileStore, KvStore, Role, Session, SessionStore};
use crate::wallet::{
    AlbedoBridge, BackendSelector, BridgeConfig, FreighterBridge, SigningBackend, WalletKit,
    XbullBridge,
};
use crate::Result;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Pluggable pieces of the client; production wiring comes from `Config`,
/// tests inject stores, backends, and relays directly.
pub struct Components {
    pub kv: Arc<dyn KvStore>,
    pub backends: Vec<Arc<dyn SigningBackend>>,
    pub relay: Arc<dyn Relay>,
    pub poll: PollPolicy,
    pub audit: Option<AuditLog>,
}

/// The orchestration client for the rental contract.
pub struct RentACar {
    session: RwLock<Session>,
    store: SessionStore,
    kit: WalletKit,
    proxy: ContractProxy,
    relay: Arc<dyn Relay>,
    pipeline: SubmissionPipeline,
    audit: Option<AuditLog>,
}

impl RentACar {
    /// Production wiring from configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let backends: Vec<Arc<dyn SigningBackend>> = vec![
            Arc::new(FreighterBridge::new(BridgeConfig::new(
                config.bridges.freighter_url.clone(),
            ))),
            Arc::new(XbullBridge::new(BridgeConfig::new(
                config.bridges.xbull_url.clone(),
            ))),
            Arc::new(AlbedoBridge::new(BridgeConfig::new(
                config.bridges.albedo_url.clone(),
            ))),
        ];
        let components = Components {
            kv: Arc::new(FileStore::new(&config.session_dir)),
            backends,
            relay: Arc::new(HttpRelay::new(config.relay_url.clone())),
            poll: PollPolicy::new(
                Duration::from_millis(config.poll.interval_ms),
                config.poll.max_attempts,
            ),
            audit: config.audit_log_path.as_ref().map(AuditLog::new),
        };
        Ok(Self::assemble(
            &config.contract_id,
            &config.network_passphrase,
            components,
        ))
    }

    pub fn assemble(contract_id: &str, network_passphrase: &str, parts: Components) -> Self {
        Self {
            session: RwLock::new(Session::empty()),
            store: SessionStore::new(parts.kv),
            kit: WalletKit::new(parts.backends),
            proxy: ContractProxy::new(contract_id),
            relay: parts.relay,
            pipeline: SubmissionPipeline::new(parts.poll, network_passphrase),
            audit: parts.audit,
        }
    }

    /// Snapshot of the current session.
    pub async fn session(&self) -> Session {
        self.session.read().await.clone()
    }

    /// Restore the persisted session, re-activating its wallet backend.
    pub async fn restore(&self) -> Session {
        let restored = self.store.restore().await;
        if let Some(backend_id) = restored.backend_id.as_deref() {
            if restored.is_connected() {
                if let Err(e) = self.kit.activate(backend_id).await {
                    warn!(backend = backend_id, error = %e, "Could not re-activate wallet backend");
                }
            }
        }
        let mut session = self.session.write().await;
        *session = restored.clone();
        restored
    }

    /// Run the wallet selection flow and connect. Resolves with the
    /// address, or `ConnectionAborted` when the user cancels.
    pub async fn connect(&self, selector: &dyn BackendSelector) -> Result<String> {
        let address = self.kit.connect(selector).await?;
        let backend_id = self
            .kit
            .active_kind()
            .await
            .map(|kind| kind.id().to_string())
            .unwrap_or_default();

        self.store.persist_identity(&backend_id, &address).await?;
        let mut session = self.session.write().await;
        session.backend_id = Some(backend_id);
        session.address = address.clone();
        session.connected = true;
        Ok(address)
    }

    /// Select the session role. May happen before connecting.
    pub async fn select_role(&self, role: Role) -> Result<()> {
        self.store.persist_role(role).await?;
        self.session.write().await.role = role;
        info!(%role, "Role selected");
        Ok(())
    }

    /// Disconnect and clear the session. The in-memory session is cleared
    /// even when the backend call or the storage write fails.
    pub async fn disconnect(&self) -> Result<()> {
        self.kit.disconnect().await;
        *self.session.write().await = Session::empty();
        self.store.clear().await
    }

    // Contract method surface.

    pub async fn set_admin_commission(&self, commission: i128) -> Result<Outcome> {
        self.invoke(
            Method::SetAdminCommission,
            args(&[("commission", amount(commission))]),
        )
        .await
    }

    pub async fn get_admin_commission(&self) -> Result<Outcome> {
        self.invoke(Method::GetAdminCommission, Map::new()).await
    }

    pub async fn add_car(&self, owner: &str, price_per_day: i128) -> Result<Outcome> {
        self.invoke(
            Method::AddCar,
            args(&[
                ("owner", json!(owner)),
                ("price_per_day", amount(price_per_day)),
            ]),
        )
        .await
    }

    pub async fn get_car_status(&self, owner: &str) -> Result<Outcome> {
        self.invoke(Method::GetCarStatus, args(&[("owner", json!(owner))]))
            .await
    }

    pub async fn rental(
        &self,
        renter: &str,
        owner: &str,
        total_days_to_rent: u32,
    ) -> Result<Outcome> {
        self.invoke(
            Method::Rental,
            args(&[
                ("renter", json!(renter)),
                ("owner", json!(owner)),
                ("total_days_to_rent", json!(total_days_to_rent)),
            ]),
        )
        .await
    }

    pub async fn return_car(&self, renter: &str, owner: &str) -> Result<Outcome> {
        self.invoke(
            Method::ReturnCar,
            args(&[("renter", json!(renter)), ("owner", json!(owner))]),
        )
        .await
    }

    pub async fn remove_car(&self, owner: &str) -> Result<Outcome> {
        self.invoke(Method::RemoveCar, args(&[("owner", json!(owner))]))
            .await
    }

    pub async fn payout_owner(&self, owner: &str, amount_requested: i128) -> Result<Outcome> {
        self.invoke(
            Method::PayoutOwner,
            args(&[
                ("owner", json!(owner)),
                ("amount", amount(amount_requested)),
            ]),
        )
        .await
    }

    pub async fn payout_admin(&self, amount_requested: i128) -> Result<Outcome> {
        self.invoke(
            Method::PayoutAdmin,
            args(&[("amount", amount(amount_requested))]),
        )
        .await
    }

    pub async fn get_admin_balance(&self) -> Result<Outcome> {
        self.invoke(Method::GetAdminBalance, Map::new()).await
    }

    /// One full orchestrated invocation: gate, build, sign, submit, poll.
    pub async fn invoke(&self, method: Method, arguments: Map<String, Value>) -> Result<Outcome> {
        let session = self.session().await;
        access::authorize(&session, method)?;

        let call = self.proxy.build(method, arguments, &session.address)?;
        let audit_args = Value::Object(call.args.clone());

        let invocation_id = match &self.audit {
            Some(audit) => Some(audit.submission_started(method.name(), &audit_args).await),
            None => None,
        };
        let started = Instant::now();

        let result = self
            .pipeline
            .run(call, &session.address, &self.kit, self.relay.as_ref())
            .await;

        if let (Some(audit), Some(invocation_id)) = (&self.audit, invocation_id) {
            let duration_ms = started.elapsed().as_millis() as u64;
            let (hash, status, error) = match &result {
                Ok(Outcome::Success { hash, .. }) => (Some(hash.as_str()), "success", None),
                Ok(Outcome::Unresolved { hash }) => (Some(hash.as_str()), "unresolved", None),
                Err(e) => (None, "error", Some(e.to_string())),
            };
            audit
                .submission_completed(
                    invocation_id,
                    method.name(),
                    &audit_args,
                    hash,
                    status,
                    error.as_deref(),
                    duration_ms,
                )
                .await;
        }

        result
    }
}

fn args(pairs: &[(&str, Value)]) -> Map<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Amounts within i64 travel as JSON numbers; larger ones as decimal
/// strings, matching the proxy's validation.
fn amount(value: i128) -> Value {
    match i64::try_from(value) {
        Ok(v) => json!(v),
        Err(_) => json!(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractError;
    use crate::relay::{StatusReport, Submission, TxStatus};
    use crate::Error;
    use crate::session::MemoryStore;
    use crate::wallet::BackendKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct StubBackend {
        fail_disconnect: bool,
    }

    #[async_trait]
    impl SigningBackend for StubBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Freighter
        }

        async fn address(&self) -> Result<String> {
            Ok("GADDR".to_string())
        }

        async fn sign(&self, envelope: &str, _: &str, _: &str) -> Result<String> {
            Ok(format!("signed:{envelope}"))
        }

        async fn disconnect(&self) -> Result<()> {
            if self.fail_disconnect {
                return Err(Error::Wallet("daemon gone".to_string()));
            }
            Ok(())
        }
    }

    struct PickFirst;

    #[async_trait]
    impl BackendSelector for PickFirst {
        async fn select(&self, options: &[BackendKind]) -> Option<BackendKind> {
            options.first().copied()
        }
    }

    /// Relay that always succeeds on the first status query.
    struct InstantRelay {
        submits: AtomicU32,
        result: Option<Value>,
    }

    impl InstantRelay {
        fn new(result: Option<Value>) -> Self {
            Self {
                submits: AtomicU32::new(0),
                result,
            }
        }
    }

    #[async_trait]
    impl Relay for InstantRelay {
        async fn submit(&self, _: &str) -> Result<Submission> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            Ok(Submission {
                hash: "deadbeef".to_string(),
                status: TxStatus::Pending,
            })
        }

        async fn get_status(&self, _: &str) -> Result<StatusReport> {
            Ok(StatusReport {
                status: TxStatus::Success,
                result: self.result.clone(),
            })
        }
    }

    fn client_with(relay: Arc<dyn Relay>, kv: Arc<dyn KvStore>, fail_disconnect: bool) -> RentACar {
        RentACar::assemble(
            "CCONTRACT",
            "Test SDF Network ; September 2015",
            Components {
                kv,
                backends: vec![Arc::new(StubBackend { fail_disconnect })],
                relay,
                poll: PollPolicy::immediate(10),
                audit: None,
            },
        )
    }

    async fn connected_client(relay: Arc<dyn Relay>, role: Role) -> RentACar {
        let client = client_with(relay, Arc::new(MemoryStore::new()), false);
        client.connect(&PickFirst).await.unwrap();
        client.select_role(role).await.unwrap();
        client
    }

    #[tokio::test]
    async fn denied_call_never_reaches_the_relay() {
        let relay = Arc::new(InstantRelay::new(Some(json!({"status": "ok"}))));
        let client = connected_client(relay.clone(), Role::Owner).await;

        // An owner may not rent.
        let err = client.rental("GRENTER", "GOWNER", 3).await.unwrap_err();
        assert!(matches!(err, Error::RoleViolation { .. }));
        assert_eq!(relay.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn schema_mismatch_precedes_signing_and_submission() {
        let relay = Arc::new(InstantRelay::new(Some(json!({"status": "ok"}))));
        let client = connected_client(relay.clone(), Role::Renter).await;

        let err = client.rental("GRENTER", "GOWNER", 0).await.unwrap_err();
        assert!(matches!(err, Error::SchemaMismatch(_)));
        assert_eq!(relay.submits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn owner_adds_car_and_resolves_success() {
        let relay = Arc::new(InstantRelay::new(Some(json!({"status": "ok"}))));
        let client = connected_client(relay.clone(), Role::Owner).await;

        let outcome = client.add_car("GOWNER", 100).await.unwrap();
        assert!(outcome.is_resolved());
        assert_eq!(outcome.hash(), "deadbeef");
        assert_eq!(relay.submits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn query_decodes_typed_balance() {
        let relay = Arc::new(InstantRelay::new(Some(json!({"status": "ok", "value": 77}))));
        let client = connected_client(relay, Role::Renter).await;

        let outcome = client.get_admin_balance().await.unwrap();
        assert_eq!(outcome.amount().unwrap(), 77);
    }

    #[tokio::test]
    async fn contract_error_surfaces_by_name() {
        let relay = Arc::new(InstantRelay::new(Some(json!({"status": "err", "code": 11}))));
        let client = connected_client(relay, Role::Renter).await;

        let err = client.rental("GADDR", "GADDR", 2).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Contract(ContractError::SelfRentalNotAllowed)
        ));
        assert!(err.to_string().contains("SelfRentalNotAllowed"));
    }

    #[tokio::test]
    async fn disconnect_clears_session_despite_backend_failure() {
        let relay = Arc::new(InstantRelay::new(None));
        let kv = Arc::new(MemoryStore::new());
        let client = client_with(relay, kv.clone(), true);
        client.connect(&PickFirst).await.unwrap();
        client.select_role(Role::Admin).await.unwrap();

        client.disconnect().await.unwrap();
        assert_eq!(client.session().await, Session::empty());

        // Storage is cleared too: a fresh client restores nothing.
        let restored = SessionStore::new(kv).restore().await;
        assert_eq!(restored, Session::empty());
    }

    #[tokio::test]
    async fn session_restores_across_clients() {
        let kv = Arc::new(MemoryStore::new());
        let relay: Arc<dyn Relay> = Arc::new(InstantRelay::new(None));

        let client = client_with(relay.clone(), kv.clone(), false);
        client.connect(&PickFirst).await.unwrap();
        client.select_role(Role::Owner).await.unwrap();

        // New client over the same storage, as after a restart.
        let revived = client_with(relay, kv, false);
        let session = revived.restore().await;
        assert!(session.is_connected());
        assert_eq!(session.address, "GADDR");
        assert_eq!(session.role, Role::Owner);
        assert_eq!(session.backend_id.as_deref(), Some("freighter"));

        // The re-activated backend can sign again without reconnecting.
        let outcome = revived.payout_owner("GOWNER", 10).await;
        assert!(outcome.is_ok());
    }

    #[tokio::test]
    async fn unconnected_client_is_denied() {
        let relay = Arc::new(InstantRelay::new(None));
        let client = client_with(relay.clone(), Arc::new(MemoryStore::new()), false);
        let err = client.get_admin_balance().await.unwrap_err();
        assert!(matches!(err, Error::NotConnected));
        assert_eq!(relay.submits.load(Ordering::SeqCst), 0);
    }
}
