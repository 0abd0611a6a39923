use crate::error::Result;
use crate::http_client::{ApiRequest, GatewayClient};
use crate::models::auth::{AuthResponse, SignInRequest, SignUpRequest, User};

/// Register a new account
///
/// The tokens returned by sign-up are not stored; the session starts at sign-in.
pub async fn sign_up(gateway: &GatewayClient, request: &SignUpRequest) -> Result<AuthResponse> {
    let request = ApiRequest::post("/auth/sign-up").json(request)?;
    gateway.send_json(request).await
}

/// Sign in and start a session with the returned credential pair
pub async fn sign_in(gateway: &GatewayClient, request: &SignInRequest) -> Result<AuthResponse> {
    let api_request = ApiRequest::post("/auth/sign-in").json(request)?;
    let response: AuthResponse = gateway.send_json(api_request).await?;

    gateway.auth().session().begin(&response.credentials())?;
    tracing::info!(user_id = response.user.id, "Signed in");

    Ok(response)
}

/// End the local session
pub fn sign_out(gateway: &GatewayClient) -> Result<()> {
    gateway.auth().session().end()?;
    Ok(())
}

/// Current user
pub async fn me(gateway: &GatewayClient) -> Result<User> {
    gateway.send_json(ApiRequest::get("/users/me")).await
}
