// Authentication types

use serde::{Deserialize, Serialize};

/// Key under which the access token is stored
pub const ACCESS_TOKEN_KEY: &str = "accessToken";

/// Key under which the refresh token is stored
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Complete credential set issued at sign-in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token data from refresh response
#[derive(Debug, Clone)]
pub struct TokenData {
    pub access_token: String,
    /// Present only when the server rotates the refresh token
    pub refresh_token: Option<String>,
}

/// Refresh request body
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Refresh response body
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Session lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credential pair was stored
    SignedIn,

    /// The user ended the session
    SignedOut,

    /// Refresh failed irrecoverably, credentials were cleared.
    /// The application should ask the user to sign in again.
    Expired,
}
