//! Configuration for the rent-a-car client

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

/// Environment variable overriding the deployed contract id.
pub const CONTRACT_ID_ENV: &str = "RENT_A_CAR_CONTRACT_ID";
/// Environment variable overriding the relay endpoint.
pub const RELAY_URL_ENV: &str = "RENT_A_CAR_RELAY_URL";

/// Test network passphrase; doubles as the network id handed to signers.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// Contract id embedded as a fallback when none is configured.
const DEFAULT_CONTRACT_ID: &str = "CCEEACX7Y6WUEUJQ37IDBY7V2T4SLUMJG464EQZ5MUBXREEFZILNYOZG";

fn default_relay_url() -> Url {
    Url::parse("https://soroban-testnet.stellar.org").expect("static url")
}

fn parse_local(port: u16) -> Url {
    Url::parse(&format!("http://127.0.0.1:{port}/")).expect("static url")
}

/// Where the signing daemons listen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletBridges {
    pub freighter_url: Url,
    pub xbull_url: Url,
    pub albedo_url: Url,
}

impl Default for WalletBridges {
    fn default() -> Self {
        Self {
            freighter_url: parse_local(7100),
            xbull_url: parse_local(7101),
            albedo_url: parse_local(7102),
        }
    }
}

/// Polling behavior of the submission pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PollConfig {
    /// Wait between status queries (milliseconds).
    pub interval_ms: u64,
    /// Maximum status queries per submission.
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2_000,
            max_attempts: 10,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Deployed rental contract id.
    pub contract_id: String,
    /// Network passphrase envelopes are signed against.
    pub network_passphrase: String,
    /// Relay endpoint (submit + status queries).
    pub relay_url: Url,
    /// Signing daemon endpoints.
    #[serde(default)]
    pub bridges: WalletBridges,
    /// Submission polling policy.
    #[serde(default)]
    pub poll: PollConfig,
    /// Directory holding the persisted session keys.
    pub session_dir: PathBuf,
    /// Path to the submission audit log (JSONL); `None` disables auditing.
    pub audit_log_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            contract_id: DEFAULT_CONTRACT_ID.to_string(),
            network_passphrase: TESTNET_PASSPHRASE.to_string(),
            relay_url: default_relay_url(),
            bridges: WalletBridges::default(),
            poll: PollConfig::default(),
            session_dir: PathBuf::from(".rent-a-car"),
            audit_log_path: Some(PathBuf::from("audit.jsonl")),
        }
    }
}

impl Config {
    /// Load from a JSON file when given, else start from defaults; then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                serde_json::from_str(&contents)?
            }
            None => Self::default(),
        };

        if let Ok(contract_id) = std::env::var(CONTRACT_ID_ENV) {
            if !contract_id.is_empty() {
                config.contract_id = contract_id;
            }
        }
        if let Ok(relay_url) = std::env::var(RELAY_URL_ENV) {
            config.relay_url = relay_url
                .parse()
                .map_err(|e| Error::Config(format!("{RELAY_URL_ENV}: {e}")))?;
        }

        Ok(config)
    }
}
