// Session context
// Owns the credential store and announces lifecycle changes

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::credentials::CredentialStore;
use super::types::{CredentialPair, SessionEvent, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY};

const EVENT_CAPACITY: usize = 16;

/// Explicit session context shared by the gateway and the application
///
/// All credential reads and writes go through here. Subscribers receive
/// [`SessionEvent`]s; the library itself never prompts or navigates.
pub struct Session {
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self { store, events }
    }

    /// Listen for session lifecycle events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn access_token(&self) -> Result<Option<String>> {
        self.store.get(ACCESS_TOKEN_KEY)
    }

    pub fn refresh_token(&self) -> Result<Option<String>> {
        self.store.get(REFRESH_TOKEN_KEY)
    }

    /// True when an access token is stored
    pub fn is_signed_in(&self) -> Result<bool> {
        Ok(self.access_token()?.is_some())
    }

    /// Start a session with a freshly issued credential pair
    pub fn begin(&self, pair: &CredentialPair) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, &pair.access_token)?;
        self.store.set(REFRESH_TOKEN_KEY, &pair.refresh_token)?;
        tracing::info!("Session started");
        self.notify(SessionEvent::SignedIn);
        Ok(())
    }

    /// End the session on user request
    pub fn end(&self) -> Result<()> {
        self.clear()?;
        tracing::info!("Session ended");
        self.notify(SessionEvent::SignedOut);
        Ok(())
    }

    /// Terminate the session after an irrecoverable refresh failure
    pub(crate) fn expire(&self) {
        if let Err(e) = self.clear() {
            tracing::error!("Failed to clear credentials after refresh failure: {:#}", e);
        }
        tracing::warn!("Session expired, credentials cleared");
        self.notify(SessionEvent::Expired);
    }

    pub(crate) fn store_access_token(&self, token: &str) -> Result<()> {
        self.store.set(ACCESS_TOKEN_KEY, token)
    }

    pub(crate) fn store_refresh_token(&self, token: &str) -> Result<()> {
        self.store.set(REFRESH_TOKEN_KEY, token)
    }

    fn clear(&self) -> Result<()> {
        self.store.remove(ACCESS_TOKEN_KEY)?;
        self.store.remove(REFRESH_TOKEN_KEY)?;
        Ok(())
    }

    fn notify(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
