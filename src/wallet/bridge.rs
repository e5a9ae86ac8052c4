//! HTTP bridges to locally running signing daemons.
//!
//! Each supported wallet exposes its own small HTTP surface; the bridges
//! normalize them behind `SigningBackend`. A daemon answering 401/403 to a
//! sign request means the user declined in the wallet UI, which maps to
//! `SigningRejected`; transport failures stay transport errors.

use super::{BackendKind, SigningBackend};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

/// Where a signing daemon listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub base_url: Url,
}

impl BridgeConfig {
    pub fn new(base_url: Url) -> Self {
        Self { base_url }
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Wallet(format!("invalid bridge endpoint `{path}`: {e}")))
    }
}

async fn post_json<T: DeserializeOwned>(
    http: &reqwest::Client,
    url: Url,
    body: serde_json::Value,
) -> Result<T> {
    let response = http.post(url).json(&body).send().await?;
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        let reason = response.text().await.unwrap_or_default();
        return Err(Error::SigningRejected(if reason.is_empty() {
            "declined in wallet".to_string()
        } else {
            reason
        }));
    }
    Ok(response.error_for_status()?.json::<T>().await?)
}

/// Freighter-compatible daemon.
pub struct FreighterBridge {
    config: BridgeConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct FreighterAddress {
    #[serde(rename = "publicKey")]
    public_key: String,
}

#[derive(Deserialize)]
struct FreighterSigned {
    #[serde(rename = "signedTxXdr")]
    signed_tx_xdr: String,
}

impl FreighterBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SigningBackend for FreighterBridge {
    fn kind(&self) -> BackendKind {
        BackendKind::Freighter
    }

    async fn address(&self) -> Result<String> {
        let url = self.config.endpoint("address")?;
        let response: FreighterAddress = post_json(&self.http, url, json!({})).await?;
        Ok(response.public_key)
    }

    async fn sign(
        &self,
        envelope: &str,
        network_passphrase: &str,
        address: &str,
    ) -> Result<String> {
        let url = self.config.endpoint("sign-transaction")?;
        let body = json!({
            "transactionXdr": envelope,
            "networkPassphrase": network_passphrase,
            "address": address,
        });
        let response: FreighterSigned = post_json(&self.http, url, body).await?;
        Ok(response.signed_tx_xdr)
    }

    async fn disconnect(&self) -> Result<()> {
        let url = self.config.endpoint("disconnect")?;
        self.http.post(url).send().await?.error_for_status()?;
        Ok(())
    }
}

/// xBull-compatible daemon.
pub struct XbullBridge {
    config: BridgeConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct XbullConnect {
    address: String,
}

#[derive(Deserialize)]
struct XbullSigned {
    xdr: String,
}

impl XbullBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SigningBackend for XbullBridge {
    fn kind(&self) -> BackendKind {
        BackendKind::Xbull
    }

    async fn address(&self) -> Result<String> {
        let url = self.config.endpoint("connect")?;
        let response: XbullConnect =
            post_json(&self.http, url, json!({ "canRequestSign": true })).await?;
        Ok(response.address)
    }

    async fn sign(
        &self,
        envelope: &str,
        network_passphrase: &str,
        address: &str,
    ) -> Result<String> {
        let url = self.config.endpoint("sign")?;
        let body = json!({
            "xdr": envelope,
            "network": network_passphrase,
            "publicKey": address,
        });
        let response: XbullSigned = post_json(&self.http, url, body).await?;
        Ok(response.xdr)
    }

    async fn disconnect(&self) -> Result<()> {
        let url = self.config.endpoint("disconnect")?;
        self.http.post(url).send().await?.error_for_status()?;
        Ok(())
    }
}

/// Albedo-compatible daemon. Albedo speaks a single intent endpoint rather
/// than per-operation routes.
pub struct AlbedoBridge {
    config: BridgeConfig,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct AlbedoPubkey {
    pubkey: String,
}

#[derive(Deserialize)]
struct AlbedoSigned {
    signed_envelope_xdr: String,
}

impl AlbedoBridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SigningBackend for AlbedoBridge {
    fn kind(&self) -> BackendKind {
        BackendKind::Albedo
    }

    async fn address(&self) -> Result<String> {
        let url = self.config.endpoint("intent")?;
        let response: AlbedoPubkey =
            post_json(&self.http, url, json!({ "intent": "public_key" })).await?;
        Ok(response.pubkey)
    }

    async fn sign(
        &self,
        envelope: &str,
        network_passphrase: &str,
        address: &str,
    ) -> Result<String> {
        let url = self.config.endpoint("intent")?;
        let body = json!({
            "intent": "tx",
            "xdr": envelope,
            "network": network_passphrase,
            "pubkey": address,
        });
        let response: AlbedoSigned = post_json(&self.http, url, body).await?;
        Ok(response.signed_envelope_xdr)
    }

    async fn disconnect(&self) -> Result<()> {
        // Albedo has no session to tear down; nothing to tell the daemon.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_relative_paths() {
        let config = BridgeConfig::new("http://127.0.0.1:7100/".parse().unwrap());
        let url = config.endpoint("sign-transaction").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:7100/sign-transaction");
    }
}
