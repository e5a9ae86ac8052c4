//! Session persistence.
//!
//! The persisted layout is an opaque key/value store holding one scalar per
//! key (wallet backend id, address, connected flag, selected role), each
//! independently readable and writable with no schema versioning. Restore
//! fails safe: absent or malformed storage yields the empty session.

use super::{Role, Session};
use crate::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

const KEY_BACKEND_ID: &str = "walletBackendId";
const KEY_ADDRESS: &str = "walletAddress";
const KEY_CONNECTED: &str = "isConnected";
const KEY_ROLE: &str = "selectedRole";

/// Scalar key/value storage behind the session store.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// File-per-key store rooted at a directory.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.path_for(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store, for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Persists the session across restarts. Purely local; no polling, no
/// network. Each operation is a scoped write performed immediately.
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// Reconstruct the session from storage. Any missing or malformed key
    /// degrades to the empty/disconnected value for that field.
    pub async fn restore(&self) -> Session {
        let address = self.read_or_default(KEY_ADDRESS).await;
        let connected = self.read_or_default(KEY_CONNECTED).await == "true";
        let role = Role::from_name(&self.read_or_default(KEY_ROLE).await);
        let backend_id = match self.kv.get(KEY_BACKEND_ID).await {
            Ok(Some(id)) if !id.is_empty() => Some(id),
            _ => None,
        };

        // Connected without an address would violate the session invariant;
        // treat it as disconnected.
        if address.is_empty() || !connected {
            return Session {
                role,
                ..Session::empty()
            };
        }

        debug!(%address, %role, "Restored session from storage");
        Session {
            backend_id,
            address,
            role,
            connected: true,
        }
    }

    /// Record the connected identity.
    pub async fn persist_identity(&self, backend_id: &str, address: &str) -> Result<()> {
        self.kv.put(KEY_BACKEND_ID, backend_id).await?;
        self.kv.put(KEY_ADDRESS, address).await?;
        self.kv.put(KEY_CONNECTED, "true").await?;
        Ok(())
    }

    /// Record the selected role.
    pub async fn persist_role(&self, role: Role) -> Result<()> {
        self.kv.put(KEY_ROLE, role.name()).await
    }

    /// Remove every persisted session key.
    pub async fn clear(&self) -> Result<()> {
        self.kv.remove(KEY_BACKEND_ID).await?;
        self.kv.remove(KEY_ADDRESS).await?;
        self.kv.remove(KEY_CONNECTED).await?;
        self.kv.remove(KEY_ROLE).await?;
        Ok(())
    }

    async fn read_or_default(&self, key: &str) -> String {
        self.kv.get(key).await.ok().flatten().unwrap_or_default()
    }
}
