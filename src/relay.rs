//! Network relay client.
//!
//! The relay accepts a signed envelope and reports its progress toward
//! finality. Two operations only: submit and status query. Statuses form
//! one closed enum compared uniformly everywhere — there is no
//! string-typed special case for `ERROR`.

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use url::Url;

/// Relay-reported transaction status.
///
/// `Pending` and `Duplicate` are transient; `Success`, `Failed`, and
/// `Error` are terminal. `Duplicate` only means the same envelope was seen
/// before, so the pipeline treats it exactly like `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Pending,
    Duplicate,
    Success,
    Failed,
    Error,
}

impl TxStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TxStatus::Success | TxStatus::Failed | TxStatus::Error)
    }
}

/// What `submit` yields: the relay-assigned hash plus an initial status.
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub hash: String,
    pub status: TxStatus,
}

/// A status query answer, with the result payload once one exists.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusReport {
    pub status: TxStatus,
    #[serde(default)]
    pub result: Option<Value>,
}

/// The network relay boundary.
#[async_trait]
pub trait Relay: Send + Sync {
    /// Hand a signed envelope to the relay. Failing here (transport error,
    /// relay rejection, or a response without a hash) is a submission
    /// error; no hash exists, so there is nothing to poll.
    async fn submit(&self, signed_envelope: &str) -> Result<Submission>;

    /// Query the status of a previously submitted envelope.
    async fn get_status(&self, hash: &str) -> Result<StatusReport>;
}

/// JSON-over-HTTP relay client.
pub struct HttpRelay {
    url: Url,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct RpcRequest {
    jsonrpc: &'static str,
    id: u32,
    method: &'static str,
    params: Value,
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

impl HttpRelay {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            http: reqwest::Client::new(),
        }
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };
        let response: RpcResponse<T> = self
            .http
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(Error::Submission(format!(
                "relay error {}: {}",
                error.code, error.message
            )));
        }
        response
            .result
            .ok_or_else(|| Error::Submission(format!("relay returned no result for {method}")))
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn submit(&self, signed_envelope: &str) -> Result<Submission> {
        let submission: Submission = self
            .call("sendTransaction", json!({ "transaction": signed_envelope }))
            .await?;
        if submission.hash.is_empty() {
            return Err(Error::Submission("relay returned no hash".to_string()));
        }
        Ok(submission)
    }

    async fn get_status(&self, hash: &str) -> Result<StatusReport> {
        self.call("getTransaction", json!({ "hash": hash })).await
    }
}
