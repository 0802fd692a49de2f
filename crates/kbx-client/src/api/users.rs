//! User profile endpoints.

use serde_json::{Map, Value};

use super::types::{AvatarResponse, ProfileUpdate, User};
use crate::client::ApiClient;
use crate::error::ApiResult;

pub const PROFILE: &str = "/users/profile";
pub const AVATAR: &str = "/users/avatar";

/// Fetches the profile for the current token.
///
/// # Errors
/// Fails with the classified error; 401/403 mean the token is no longer
/// accepted.
pub async fn profile(client: &ApiClient) -> ApiResult<User> {
    client.get(PROFILE, None).await
}

/// Updates profile fields, returning the server's view of the profile.
///
/// # Errors
/// Fails with the classified error when the update is rejected.
pub async fn update_profile(client: &ApiClient, update: &ProfileUpdate) -> ApiResult<User> {
    let mut body = Map::new();
    if let Some(username) = &update.username {
        body.insert("username".to_string(), Value::String(username.clone()));
    }
    if let Some(email) = &update.email {
        body.insert("email".to_string(), Value::String(email.clone()));
    }
    client.put(PROFILE, Some(&Value::Object(body))).await
}

/// Uploads a new avatar image as multipart form data.
///
/// # Errors
/// Fails with the classified error when the upload is rejected.
pub async fn upload_avatar(
    client: &ApiClient,
    filename: &str,
    bytes: Vec<u8>,
) -> ApiResult<AvatarResponse> {
    let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
    let form = reqwest::multipart::Form::new().part("file", part);
    client.upload(AVATAR, form).await
}
