//! Authentication endpoints.

use serde_json::{Value, json};

use super::types::{AuthResponse, Credentials, Registration, TokenResponse};
use crate::client::ApiClient;
use crate::error::ApiResult;

pub const LOGIN: &str = "/auth/login";
pub const REGISTER: &str = "/auth/register";
pub const LOGOUT: &str = "/auth/logout";
pub const REFRESH: &str = "/auth/refresh";
pub const CHANGE_PASSWORD: &str = "/auth/change-password";
pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
pub const RESET_PASSWORD: &str = "/auth/reset-password";

/// Exchanges credentials for a token and profile.
///
/// # Errors
/// Fails with the classified error when authentication is rejected.
pub async fn login(client: &ApiClient, credentials: &Credentials) -> ApiResult<AuthResponse> {
    let body = json!({
        "username": credentials.username,
        "password": credentials.password,
    });
    client.post(LOGIN, Some(&body)).await
}

/// Registers a new account; the backend signs the new user in directly.
///
/// # Errors
/// Fails with the classified error when registration is rejected.
pub async fn register(client: &ApiClient, registration: &Registration) -> ApiResult<AuthResponse> {
    let body = json!({
        "username": registration.username,
        "email": registration.email,
        "password": registration.password,
    });
    client.post(REGISTER, Some(&body)).await
}

/// Notifies the backend of a logout. Callers treat failures as advisory.
///
/// # Errors
/// Fails with the classified error when the call does not complete.
pub async fn logout(client: &ApiClient) -> ApiResult<Value> {
    client.post(LOGOUT, None).await
}

/// Exchanges the current token for a fresh one.
///
/// # Errors
/// Fails with the classified error when the token is no longer refreshable.
pub async fn refresh(client: &ApiClient) -> ApiResult<TokenResponse> {
    client.post(REFRESH, None).await
}

/// Changes the password for the signed-in user.
///
/// # Errors
/// Fails with the classified error when the old password is rejected.
pub async fn change_password(
    client: &ApiClient,
    old_password: &str,
    new_password: &str,
) -> ApiResult<Value> {
    let body = json!({
        "oldPassword": old_password,
        "newPassword": new_password,
    });
    client.post(CHANGE_PASSWORD, Some(&body)).await
}

/// Requests a password-reset mail for the given address.
///
/// # Errors
/// Fails with the classified error when the request is rejected.
pub async fn forgot_password(client: &ApiClient, email: &str) -> ApiResult<Value> {
    let body = json!({ "email": email });
    client.post(FORGOT_PASSWORD, Some(&body)).await
}

/// Completes a password reset with the mailed token.
///
/// # Errors
/// Fails with the classified error when the reset token is invalid.
pub async fn reset_password(
    client: &ApiClient,
    reset_token: &str,
    new_password: &str,
) -> ApiResult<Value> {
    let body = json!({
        "token": reset_token,
        "password": new_password,
    });
    client.post(RESET_PASSWORD, Some(&body)).await
}
