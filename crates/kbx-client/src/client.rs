//! HTTP client core with the request/response interceptor pipeline.
//!
//! Every outgoing call is stamped with the bearer token read from the
//! session store at dispatch time. Every response runs through one
//! classification path: 2xx passes the body through; anything else becomes
//! a categorized [`ApiError`] and surfaces exactly one notice event. A 401
//! on anything but the login attempt itself also invalidates the session.
//! Navigation is not performed here; the UI reacts to the emitted
//! `SessionInvalidated` event.

use std::sync::Arc;

use bytes::Bytes;
use reqwest::{Method, StatusCode, header, multipart};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::api::auth::LOGIN;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult, ErrorCategory};
use crate::events::{ClientEvent, EventSender};
use crate::session::SessionContext;

/// API client for the knowledge-base backend.
pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
    session: Arc<SessionContext>,
    events: EventSender,
}

impl ApiClient {
    /// Creates a new client over the shared session context.
    ///
    /// # Panics
    /// Panics if the underlying TLS backend cannot be initialized.
    pub fn new(config: ClientConfig, session: Arc<SessionContext>, events: EventSender) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(config.default_headers.clone())
            .build()
            .expect("Failed to build HTTP client");
        Self {
            config,
            http,
            session,
            events,
        }
    }

    /// Returns the shared session context.
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Sends a JSON request and decodes the response body.
    ///
    /// # Errors
    /// Fails with the classified [`ApiError`] for non-2xx responses,
    /// timeouts, and connection failures.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: Option<&[(&str, &str)]>,
    ) -> ApiResult<Value> {
        let response = self.dispatch(method, path, body, query, None).await?;
        self.handle_json(path, response).await
    }

    /// GET decoding into `T`.
    ///
    /// # Errors
    /// Fails with the classified [`ApiError`].
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Option<&[(&str, &str)]>,
    ) -> ApiResult<T> {
        let value = self.send(Method::GET, path, None, query).await?;
        decode(value)
    }

    /// POST decoding into `T`.
    ///
    /// # Errors
    /// Fails with the classified [`ApiError`].
    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> ApiResult<T> {
        let value = self.send(Method::POST, path, body, None).await?;
        decode(value)
    }

    /// PUT decoding into `T`.
    ///
    /// # Errors
    /// Fails with the classified [`ApiError`].
    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&Value>,
    ) -> ApiResult<T> {
        let value = self.send(Method::PUT, path, body, None).await?;
        decode(value)
    }

    /// Fetches raw bytes (exports, downloads). The response interceptor
    /// leaves the payload untouched apart from failure classification.
    ///
    /// # Errors
    /// Fails with the classified [`ApiError`].
    pub async fn download(
        &self,
        path: &str,
        query: Option<&[(&str, &str)]>,
    ) -> ApiResult<Bytes> {
        let response = self.dispatch(Method::GET, path, None, query, None).await?;
        let status = response.status();
        if status.is_success() {
            return response
                .bytes()
                .await
                .map_err(|err| self.transport_error(&err));
        }
        let body = response.text().await.unwrap_or_default();
        Err(self.fail(path, status.as_u16(), &body).await)
    }

    /// Uploads multipart form data (avatar, documents) and decodes the JSON
    /// response.
    ///
    /// # Errors
    /// Fails with the classified [`ApiError`].
    pub async fn upload<T: DeserializeOwned>(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> ApiResult<T> {
        let response = self
            .dispatch(Method::POST, path, None, None, Some(form))
            .await?;
        let value = self.handle_json(path, response).await?;
        decode(value)
    }

    /// Builds and sends the request. The bearer token is read from the
    /// session store here, at dispatch time, never earlier.
    async fn dispatch(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        query: Option<&[(&str, &str)]>,
        form: Option<multipart::Form>,
    ) -> ApiResult<reqwest::Response> {
        let url = format!("{}{}", self.config.base_url, path);
        let mut builder = self.http.request(method, &url);
        if let Some(query) = query {
            builder = builder.query(query);
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        if let Some(form) = form {
            builder = builder.multipart(form);
        }
        if let Some(token) = self.session.store().token() {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        tracing::debug!(%url, "dispatching request");
        builder
            .send()
            .await
            .map_err(|err| self.transport_error(&err))
    }

    /// Response interceptor for JSON calls: 2xx decodes the body, anything
    /// else is classified and surfaced as one notice.
    async fn handle_json(&self, path: &str, response: reqwest::Response) -> ApiResult<Value> {
        let status = response.status();
        if status.is_success() {
            if status == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            let text = response
                .text()
                .await
                .map_err(|err| self.transport_error(&err))?;
            if text.is_empty() {
                return Ok(Value::Null);
            }
            return serde_json::from_str(&text).map_err(|err| {
                let error = ApiError::new(
                    ErrorCategory::Unknown,
                    format!("Malformed response body: {err}"),
                );
                self.events.notify(error.category, error.message.clone());
                error
            });
        }

        let body = response.text().await.unwrap_or_default();
        Err(self.fail(path, status.as_u16(), &body).await)
    }

    /// Classifies a failed response, emits the notice, and invalidates the
    /// session on 401, unless the failing request was the login attempt
    /// itself, where a 401 just means bad credentials.
    async fn fail(&self, path: &str, status: u16, body: &str) -> ApiError {
        let error = ApiError::from_response(status, body);
        self.events.notify(error.category, error.message.clone());
        if error.is_unauthorized() && path != LOGIN {
            self.invalidate_session().await;
        }
        error
    }

    /// Maps a connection-level failure: timeouts surface as the Timeout
    /// category, everything else (no response at all) as Network.
    fn transport_error(&self, err: &reqwest::Error) -> ApiError {
        let error = if err.is_timeout() {
            ApiError::timeout()
        } else {
            ApiError::network()
        };
        tracing::debug!("request transport failure: {err}");
        self.events.notify(error.category, error.message.clone());
        error
    }

    /// Clears both the persisted record and the in-memory session, then
    /// tells the navigation layer. Clearing an already-empty session is a
    /// no-op.
    async fn invalidate_session(&self) {
        self.session.clear();
        self.events
            .send_important(ClientEvent::SessionInvalidated)
            .await;
    }
}

/// Decodes an interceptor-approved body into the caller's type.
fn decode<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(|err| {
        ApiError::new(
            ErrorCategory::Unknown,
            format!("Unexpected response shape: {err}"),
        )
    })
}
