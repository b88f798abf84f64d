//! Session store
//!
//! Holds the one `Session` of a running client. Clones share the same
//! session, so a refresh performed through one handle is visible to every
//! other holder immediately.

use std::sync::Arc;
use tokio::sync::RwLock;

use super::constants::SESSION_STORAGE_KEY;
use super::models::{PersistedSession, Session, SessionUpdate};
use crate::config::KeyValueStorage;

#[derive(Clone)]
pub struct SessionStore {
    session: Arc<RwLock<Session>>,
    storage: Option<Arc<dyn KeyValueStorage>>,
}

impl SessionStore {
    /// Empty, unauthenticated store
    pub fn new(api_version: impl Into<String>, persist: bool) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::new(api_version, persist))),
            storage: None,
        }
    }

    /// Store backed by durable storage
    pub fn with_storage(
        api_version: impl Into<String>,
        persist: bool,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Self {
        Self {
            session: Arc::new(RwLock::new(Session::new(api_version, persist))),
            storage: Some(storage),
        }
    }

    /// Snapshot of the current session
    pub async fn get(&self) -> Session {
        self.session.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_authenticated()
    }

    /// Merge `update` into the current session, keeping fields it leaves out
    ///
    /// When persistence is on and the access token or instance URL changed,
    /// the merged session overwrites the durable copy. The in-memory session
    /// is updated even if that write fails.
    pub async fn set(&self, update: SessionUpdate) -> anyhow::Result<Session> {
        let (merged, changed) = {
            let mut session = self.session.write().await;
            let changed = merge(&mut session, update);
            (session.clone(), changed)
        };

        if merged.persist && changed {
            self.write_persisted(&merged).await?;
        }

        Ok(merged)
    }

    /// Only the display name changes; it is not part of the durable record
    pub async fn set_display_name(&self, display_name: Option<String>) {
        self.session.write().await.display_name = display_name;
    }

    /// Drop every field and the durable copy
    pub async fn clear(&self) -> anyhow::Result<()> {
        {
            let mut session = self.session.write().await;
            let api_version = session.api_version.clone();
            let persist = session.persist;
            *session = Session::new(api_version, persist);
        }
        self.remove_persisted().await
    }

    /// Prior session from durable storage, if persistence is on and one exists
    pub async fn load_persisted(&self) -> anyhow::Result<Option<PersistedSession>> {
        let persist = self.session.read().await.persist;
        let Some(storage) = self.storage.as_ref().filter(|_| persist) else {
            return Ok(None);
        };

        let Some(raw) = storage.get(SESSION_STORAGE_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str::<PersistedSession>(&raw) {
            Ok(persisted) => {
                log::debug!("Loaded persisted session for instance {:?}", persisted.instance_url);
                Ok(Some(persisted))
            }
            Err(e) => {
                log::warn!("Ignoring unreadable persisted session: {}", e);
                Ok(None)
            }
        }
    }

    /// Remove any durable copy without touching the in-memory session
    pub async fn remove_persisted(&self) -> anyhow::Result<()> {
        if let Some(storage) = &self.storage {
            storage.remove(SESSION_STORAGE_KEY).await?;
        }
        Ok(())
    }

    async fn write_persisted(&self, session: &Session) -> anyhow::Result<()> {
        let (Some(storage), Some(persisted)) = (self.storage.as_ref(), session.to_persisted())
        else {
            return Ok(());
        };
        let json = serde_json::to_string(&persisted)?;
        storage.put(SESSION_STORAGE_KEY, &json).await?;
        log::debug!("Persisted session for instance {:?}", session.instance_url);
        Ok(())
    }
}

/// Returns whether the access token or instance URL changed
fn merge(session: &mut Session, update: SessionUpdate) -> bool {
    let mut changed = session.access_token.as_deref() != Some(update.access_token.as_str());
    session.access_token = Some(update.access_token);

    if let Some(refresh_token) = update.refresh_token {
        session.refresh_token = Some(refresh_token);
    }
    if let Some(instance_url) = update.instance_url {
        changed |= session.instance_url.as_deref() != Some(instance_url.as_str());
        session.instance_url = Some(instance_url);
    }
    if let Some(api_version) = update.api_version {
        session.api_version = api_version;
    }
    if let Some(user_id) = update.user_id {
        session.user_id = Some(user_id);
    }
    changed
}
