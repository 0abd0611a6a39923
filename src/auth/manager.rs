use anyhow::{Context, Result};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::refresh;
use super::session::Session;

/// Authentication manager
/// Reads credentials for outgoing requests and runs the refresh procedure
pub struct AuthManager {
    /// Session context holding the credential store
    session: Arc<Session>,

    /// Bare HTTP client for refresh requests (bypasses the gateway)
    client: Client,

    /// Absolute URL of the refresh endpoint
    refresh_url: String,

    /// Number of completed refresh attempts
    generation: AtomicU64,

    /// Outcome of the most recent refresh, guarded by the single-flight lock
    last_refresh: Mutex<Option<String>>,
}

impl AuthManager {
    /// Create a new AuthManager for the API at `base_url`
    pub fn new(session: Arc<Session>, base_url: &str, refresh_timeout: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(refresh_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self::with_client(session, client, base_url))
    }

    /// Create an AuthManager around an existing client
    pub fn with_client(session: Arc<Session>, client: Client, base_url: &str) -> Self {
        Self {
            session,
            client,
            refresh_url: refresh::refresh_url(base_url),
            generation: AtomicU64::new(0),
            last_refresh: Mutex::new(None),
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Current refresh generation
    ///
    /// Read it before the request goes out and hand it back to [`refresh`](Self::refresh)
    /// so that a refresh finished in the meantime is reused.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Stored access token, if any
    pub fn access_token(&self) -> Result<Option<String>> {
        self.session.access_token()
    }

    /// Obtain a new access token after a 401
    ///
    /// Only one refresh runs at a time. Callers that saw generation `seen`
    /// and arrive after a newer refresh completed get that refresh's outcome
    /// without another network call.
    ///
    /// On failure the session is expired (credentials cleared, `Expired`
    /// event sent) and `None` is returned.
    pub async fn refresh(&self, seen: u64) -> Option<String> {
        let mut last = self.last_refresh.lock().await;

        if self.generation() > seen {
            tracing::debug!(
                seen,
                current = self.generation(),
                "Reusing outcome of concurrent refresh"
            );
            return last.clone();
        }

        let outcome = match self.refresh_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::error!("Token refresh failed: {:#}", e);
                self.session.expire();
                None
            }
        };

        *last = outcome.clone();
        self.generation.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    /// Refresh the access token and persist the result
    async fn refresh_token(&self) -> Result<String> {
        tracing::debug!("Refreshing access token...");

        let refresh_token = self
            .session
            .refresh_token()?
            .context("No refresh token available")?;

        let token_data =
            refresh::request_new_token(&self.client, &self.refresh_url, &refresh_token).await?;

        self.session
            .store_access_token(&token_data.access_token)
            .context("Failed to store refreshed access token")?;

        // Keep the stored refresh token unless the server rotated it
        if let Some(ref new_refresh_token) = token_data.refresh_token {
            self.session
                .store_refresh_token(new_refresh_token)
                .context("Failed to store rotated refresh token")?;
        }

        Ok(token_data.access_token)
    }
}
