use reqwest::StatusCode;

use crate::error::Result;
use crate::http_client::{ApiRequest, GatewayClient};
use crate::models::profile::{
    CreateProfileRequest, EditLock, EditStatus, PingRequest, Profile, ProfileList, ProfileQuery,
    ProfileUpdate,
};

fn profile_path(code: &str) -> String {
    format!("/profiles/{}", code)
}

fn ping_path(code: &str) -> String {
    format!("/profiles/{}/ping", code)
}

/// Paged profile list, optionally filtered by name
pub async fn list(gateway: &GatewayClient, query: &ProfileQuery) -> Result<ProfileList> {
    let request = ApiRequest::get("/profiles")
        .query_opt("page", query.page)
        .query_opt("pageSize", query.page_size)
        .query_opt("name", query.name.as_deref().filter(|n| !n.is_empty()));
    gateway.send_json(request).await
}

pub async fn get(gateway: &GatewayClient, code: &str) -> Result<Profile> {
    gateway.send_json(ApiRequest::get(profile_path(code))).await
}

/// Create the signed-in user's wiki profile
pub async fn create(gateway: &GatewayClient, request: &CreateProfileRequest) -> Result<Profile> {
    let request = ApiRequest::post("/profiles").json(request)?;
    gateway.send_json(request).await
}

/// Check whether someone is editing the wiki
pub async fn edit_status(gateway: &GatewayClient, code: &str) -> Result<EditStatus> {
    let response = gateway.send(ApiRequest::get(ping_path(code))).await?;

    if response.status() == StatusCode::NO_CONTENT {
        return Ok(EditStatus::Available);
    }

    let bytes = response.bytes().await?;
    let lock = serde_json::from_slice::<EditLock>(&bytes).ok();
    Ok(EditStatus::InUse(lock))
}

/// Answer the security quiz; a correct answer grants the edit lock
pub async fn answer_quiz(gateway: &GatewayClient, code: &str, answer: &str) -> Result<EditLock> {
    let request = ApiRequest::post(ping_path(code)).json(&PingRequest {
        security_answer: answer.trim().to_string(),
    })?;
    gateway.send_json(request).await
}

/// Save wiki edits
pub async fn update(gateway: &GatewayClient, code: &str, update: &ProfileUpdate) -> Result<Profile> {
    let request = ApiRequest::patch(profile_path(code)).json(update)?;
    gateway.send_json(request).await
}
