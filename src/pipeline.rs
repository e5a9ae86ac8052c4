//! Submission pipeline: sign, submit, poll, classify.
//!
//! One run per invocation, advancing strictly through
//! `Built → Signed → Submitted → Polling → Terminal` and never regressing.
//! Distinct invocations never share a hash (the relay assigns them), so
//! there is at most one poll loop per hash. The pipeline never resubmits:
//! retries are the caller's decision.
//!
//! Each wait-then-requery cycle is a pure suspension point; no lock is held
//! across the sleep, so concurrent invocations poll independently.

use crate::contract::{self, PendingCall, ReturnValue};
use crate::relay::{Relay, StatusReport, TxStatus};
use crate::wallet::WalletKit;
use crate::{Error, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Polling behavior, injected so tests can run with zero delay.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    /// Wait between status queries.
    pub interval: Duration,
    /// Maximum number of status queries before giving up.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 10,
        }
    }
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Zero-delay policy for tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(Duration::ZERO, max_attempts)
    }
}

/// Where an invocation currently stands. Logged, never externally driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Built,
    Signed,
    Submitted,
    Polling,
    Terminal,
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            State::Built => "built",
            State::Signed => "signed",
            State::Submitted => "submitted",
            State::Polling => "polling",
            State::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

/// Terminal result of one invocation.
///
/// `Unresolved` is not a failure: the attempt budget ran out while the
/// relay still said pending, and the transaction may yet finalize. The
/// caller owns any follow-up query for the returned hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { hash: String, value: ReturnValue },
    Unresolved { hash: String },
}

impl Outcome {
    pub fn hash(&self) -> &str {
        match self {
            Outcome::Success { hash, .. } | Outcome::Unresolved { hash } => hash,
        }
    }

    pub fn value(&self) -> Option<&ReturnValue> {
        match self {
            Outcome::Success { value, .. } => Some(value),
            Outcome::Unresolved { .. } => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// The decoded amount of a resolved query outcome.
    pub fn amount(&self) -> Result<i128> {
        self.value()
            .and_then(ReturnValue::as_amount)
            .ok_or_else(|| Error::Decode("outcome carries no amount".to_string()))
    }

    /// The decoded car status of a resolved query outcome.
    pub fn car_status(&self) -> Result<crate::contract::CarStatus> {
        self.value()
            .and_then(ReturnValue::as_car_status)
            .ok_or_else(|| Error::Decode("outcome carries no car status".to_string()))
    }
}

/// Drives one built call to a terminal outcome.
pub struct SubmissionPipeline {
    policy: PollPolicy,
    network_passphrase: String,
}

impl SubmissionPipeline {
    pub fn new(policy: PollPolicy, network_passphrase: impl Into<String>) -> Self {
        Self {
            policy,
            network_passphrase: network_passphrase.into(),
        }
    }

    /// Sign `call` for `address`, submit it, and poll to a terminal
    /// outcome. Signing failures abort before any network effect; a relay
    /// failure at submit never enters polling.
    pub async fn run(
        &self,
        call: PendingCall,
        address: &str,
        kit: &WalletKit,
        relay: &dyn Relay,
    ) -> Result<Outcome> {
        let method = call.method;
        debug!(%method, state = %State::Built, "Invocation built");

        let signed = kit
            .sign(&call.envelope, &self.network_passphrase, address)
            .await?;
        debug!(%method, state = %State::Signed, "Envelope signed");

        let submission = relay
            .submit(&signed)
            .await
            .map_err(into_submission_error)?;
        let hash = submission.hash;
        let mut status = submission.status;
        debug!(%method, %hash, ?status, state = %State::Submitted, "Envelope submitted");

        let mut report: Option<StatusReport> = None;
        if !status.is_terminal() {
            debug!(%method, %hash, state = %State::Polling, "Awaiting terminal status");
            for attempt in 1..=self.policy.max_attempts {
                tokio::time::sleep(self.policy.interval).await;
                let latest = relay.get_status(&hash).await?;
                status = latest.status;
                debug!(%method, %hash, ?status, attempt, "Status queried");
                if status.is_terminal() {
                    report = Some(latest);
                    break;
                }
            }
        }

        match status {
            TxStatus::Success => {
                let report = match report {
                    Some(report) => report,
                    // Terminal straight from submit; fetch the payload once.
                    None => relay.get_status(&hash).await?,
                };
                let value = match &report.result {
                    Some(payload) => contract::decode(payload, method)?,
                    None => ReturnValue::Void,
                };
                info!(%method, %hash, state = %State::Terminal, "Transaction succeeded");
                Ok(Outcome::Success { hash, value })
            }
            TxStatus::Failed => {
                let report = match report {
                    Some(report) => report,
                    None => relay.get_status(&hash).await?,
                };
                warn!(%method, %hash, state = %State::Terminal, "Transaction failed");
                match &report.result {
                    Some(payload) => match contract::decode(payload, method) {
                        // A failed transaction with an ok payload makes no
                        // sense; fall back to the generic failure.
                        Ok(_) => Err(Error::TransactionFailed),
                        Err(e) => Err(e),
                    },
                    None => Err(Error::TransactionFailed),
                }
            }
            TxStatus::Error => {
                warn!(%method, %hash, state = %State::Terminal, "Relay reported error");
                Err(Error::Submission(format!(
                    "relay reported ERROR for {hash}"
                )))
            }
            TxStatus::Pending | TxStatus::Duplicate => {
                // Attempt budget exhausted; the transaction may still
                // finalize. Unresolved, not failed.
                info!(%method, %hash, state = %State::Terminal, "Attempt budget exhausted");
                Ok(Outcome::Unresolved { hash })
            }
        }
    }
}

/// Relay failures before a hash exists are submission errors by taxonomy.
fn into_submission_error(error: Error) -> Error {
    match error {
        Error::Network(e) => Error::Submission(e.to_string()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{CarStatus, ContractError, ContractProxy, Method};
    use crate::relay::Submission;
    use crate::wallet::{BackendKind, BackendSelector, SigningBackend, WalletKit};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    const PASSPHRASE: &str = "Test SDF Network ; September 2015";

    struct StubBackend {
        reject: bool,
    }

    #[async_trait]
    impl SigningBackend for StubBackend {
        fn kind(&self) -> BackendKind {
            BackendKind::Freighter
        }

        async fn address(&self) -> crate::Result<String> {
            Ok("GADDR".to_string())
        }

        async fn sign(&self, envelope: &str, _: &str, _: &str) -> crate::Result<String> {
            if self.reject {
                return Err(Error::SigningRejected("declined".to_string()));
            }
            Ok(format!("signed:{envelope}"))
        }

        async fn disconnect(&self) -> crate::Result<()> {
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

    async fn connected_kit(reject: bool) -> WalletKit {
        let kit = WalletKit::new(vec![Arc::new(StubBackend { reject })]);
        kit.connect(&PickFirst).await.unwrap();
        kit
    }

    /// Relay that replays a fixed script of status reports and counts calls.
    struct ScriptedRelay {
        submit_response: Option<Submission>,
        reports: Mutex<VecDeque<StatusReport>>,
        submits: AtomicU32,
        queries: AtomicU32,
    }

    impl ScriptedRelay {
        fn new(initial: TxStatus, reports: Vec<StatusReport>) -> Self {
            Self {
                submit_response: Some(Submission {
                    hash: "abc123".to_string(),
                    status: initial,
                }),
                reports: Mutex::new(reports.into_iter().collect()),
                submits: AtomicU32::new(0),
                queries: AtomicU32::new(0),
            }
        }

        fn failing_submit() -> Self {
            Self {
                submit_response: None,
                reports: Mutex::new(VecDeque::new()),
                submits: AtomicU32::new(0),
                queries: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl Relay for ScriptedRelay {
        async fn submit(&self, _signed: &str) -> crate::Result<Submission> {
            self.submits.fetch_add(1, Ordering::SeqCst);
            self.submit_response
                .clone()
                .ok_or_else(|| Error::Submission("relay unreachable".to_string()))
        }

        async fn get_status(&self, _hash: &str) -> crate::Result<StatusReport> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            let mut reports = self.reports.lock().await;
            reports
                .pop_front()
                .ok_or_else(|| Error::Submission("script exhausted".to_string()))
        }
    }

    fn report(status: TxStatus, result: Option<serde_json::Value>) -> StatusReport {
        StatusReport { status, result }
    }

    fn pending_reports(n: usize) -> Vec<StatusReport> {
        (0..n).map(|_| report(TxStatus::Pending, None)).collect()
    }

    fn pipeline() -> SubmissionPipeline {
        SubmissionPipeline::new(PollPolicy::immediate(10), PASSPHRASE)
    }

    fn build_call(method: Method, args: &[(&str, serde_json::Value)]) -> PendingCall {
        let proxy = ContractProxy::new("CCONTRACT");
        let args = args
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        proxy.build(method, args, "GADDR").unwrap()
    }

    fn void_call() -> PendingCall {
        build_call(Method::ReturnCar, &[
            ("renter", json!("GRENTER")),
            ("owner", json!("GOWNER")),
        ])
    }

    #[tokio::test]
    async fn nine_pending_then_success_is_exactly_ten_queries() {
        let mut reports = pending_reports(9);
        reports.push(report(TxStatus::Success, Some(json!({"status": "ok"}))));
        let relay = ScriptedRelay::new(TxStatus::Pending, reports);
        let kit = connected_kit(false).await;

        let outcome = pipeline()
            .run(void_call(), "GADDR", &kit, &relay)
            .await
            .unwrap();

        assert_eq!(relay.queries.load(Ordering::SeqCst), 10);
        assert_eq!(
            outcome,
            Outcome::Success {
                hash: "abc123".to_string(),
                value: ReturnValue::Void
            }
        );
    }

    #[tokio::test]
    async fn budget_exhaustion_is_unresolved_with_hash() {
        // Eleven pendings scripted; only ten may ever be consumed.
        let relay = ScriptedRelay::new(TxStatus::Pending, pending_reports(11));
        let kit = connected_kit(false).await;

        let outcome = pipeline()
            .run(void_call(), "GADDR", &kit, &relay)
            .await
            .unwrap();

        assert_eq!(relay.queries.load(Ordering::SeqCst), 10);
        assert_eq!(
            outcome,
            Outcome::Unresolved {
                hash: "abc123".to_string()
            }
        );
        assert!(!outcome.is_resolved());
    }

    #[tokio::test]
    async fn duplicate_polls_like_pending() {
        let reports = vec![
            report(TxStatus::Duplicate, None),
            report(TxStatus::Success, Some(json!({"status": "ok"}))),
        ];
        let relay = ScriptedRelay::new(TxStatus::Duplicate, reports);
        let kit = connected_kit(false).await;

        let outcome = pipeline()
            .run(void_call(), "GADDR", &kit, &relay)
            .await
            .unwrap();
        assert!(outcome.is_resolved());
        assert_eq!(relay.queries.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_submit_never_enters_polling() {
        let relay = ScriptedRelay::failing_submit();
        let kit = connected_kit(false).await;

        let err = pipeline()
            .run(void_call(), "GADDR", &kit, &relay)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Submission(_)));
        assert_eq!(relay.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn signing_rejection_aborts_before_any_network_effect() {
        let relay = ScriptedRelay::new(TxStatus::Pending, pending_reports(1));
        let kit = connected_kit(true).await;

        let err = pipeline()
            .run(void_call(), "GADDR", &kit, &relay)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::SigningRejected(_)));
        assert_eq!(relay.submits.load(Ordering::SeqCst), 0);
        assert_eq!(relay.queries.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn relay_error_status_terminates_with_submission_error() {
        let reports = vec![report(TxStatus::Error, None)];
        let relay = ScriptedRelay::new(TxStatus::Pending, reports);
        let kit = connected_kit(false).await;

        let err = pipeline()
            .run(void_call(), "GADDR", &kit, &relay)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Submission(_)));
        // Terminal observed on the first query; no further queries issued.
        assert_eq!(relay.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_with_payload_surfaces_contract_error() {
        let reports = vec![report(
            TxStatus::Failed,
            Some(json!({"status": "err", "code": 8})),
        )];
        let relay = ScriptedRelay::new(TxStatus::Pending, reports);
        let kit = connected_kit(false).await;

        let err = pipeline()
            .run(void_call(), "GADDR", &kit, &relay)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Contract(ContractError::InsufficientBalance)
        ));
    }

    #[tokio::test]
    async fn failed_without_payload_is_generic_failure() {
        let reports = vec![report(TxStatus::Failed, None)];
        let relay = ScriptedRelay::new(TxStatus::Pending, reports);
        let kit = connected_kit(false).await;

        let err = pipeline()
            .run(void_call(), "GADDR", &kit, &relay)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::TransactionFailed));
    }

    #[tokio::test]
    async fn query_success_decodes_typed_value() {
        let reports = vec![report(
            TxStatus::Success,
            Some(json!({"status": "ok", "value": "available"})),
        )];
        let relay = ScriptedRelay::new(TxStatus::Pending, reports);
        let kit = connected_kit(false).await;

        let call = build_call(Method::GetCarStatus, &[("owner", json!("GOWNER"))]);
        let outcome = pipeline().run(call, "GADDR", &kit, &relay).await.unwrap();
        assert_eq!(
            outcome.value().and_then(|v| v.as_car_status()),
            Some(CarStatus::Available)
        );
    }

    #[tokio::test]
    async fn immediate_success_fetches_payload_once() {
        let relay = ScriptedRelay::new(
            TxStatus::Success,
            vec![report(
                TxStatus::Success,
                Some(json!({"status": "ok", "value": 42})),
            )],
        );
        let kit = connected_kit(false).await;

        let call = build_call(Method::GetAdminBalance, &[]);
        let outcome = pipeline().run(call, "GADDR", &kit, &relay).await.unwrap();
        assert_eq!(outcome.value().and_then(|v| v.as_amount()), Some(42));
        assert_eq!(relay.queries.load(Ordering::SeqCst), 1);
    }
}
