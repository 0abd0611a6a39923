// Token refresh logic

use anyhow::{Context, Result};
use reqwest::Client;

use super::types::{RefreshRequest, RefreshResponse, TokenData};

/// Path of the refresh endpoint, relative to the API base URL
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Build the absolute refresh URL for a base URL
pub fn refresh_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), REFRESH_PATH)
}

/// Exchange a refresh token for a new access token
///
/// Talks to the transport directly; the gateway pipeline is not involved.
pub async fn request_new_token(client: &Client, url: &str, refresh_token: &str) -> Result<TokenData> {
    tracing::info!("Refreshing access token...");

    let request = RefreshRequest {
        refresh_token: refresh_token.to_string(),
    };

    let response = client
        .post(url)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
        .context("Failed to send refresh request")?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        anyhow::bail!("Token refresh failed: {} - {}", status, error_text);
    }

    let data: RefreshResponse = response
        .json()
        .await
        .context("Failed to parse refresh response")?;

    if data.access_token.is_empty() {
        anyhow::bail!("Refresh response does not contain accessToken");
    }

    tracing::info!(
        rotated = data.refresh_token.is_some(),
        "Access token refreshed"
    );

    Ok(TokenData {
        access_token: data.access_token,
        refresh_token: data.refresh_token.filter(|t| !t.is_empty()),
    })
}
