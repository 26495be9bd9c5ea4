//! REST client for the PropTrade API.
//!
//! Every request carries the stored access token as a bearer header. A 401 is
//! answered by one coordinated token refresh and a single replay of the
//! request; when the refresh itself fails the session is wiped and a
//! [`SessionEvent::Expired`] is broadcast so the front-end can send the user
//! back to the login screen.

pub mod admin;
pub mod agent;
pub mod auth;
pub mod payments;
pub mod profile;
pub mod programs;
pub mod refresh;
pub mod uploads;

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ApiError;
use crate::routing::LOGIN_ROUTE;
use crate::storage::TokenStore;

pub use admin::AdminApi;
pub use agent::AgentApi;
pub use auth::AuthApi;
pub use payments::PaymentsApi;
pub use profile::ProfileApi;
pub use programs::ProgramsApi;
pub use refresh::{RefreshCoordinator, RefreshFailure};
pub use uploads::UploadsApi;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The refresh token was rejected; tokens are gone and the user must log in again.
    Expired { redirect: &'static str },
}

#[derive(Debug, Clone)]
pub enum FormField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Multipart(Vec<FormField>),
}

/// A request description that can be sent more than once (the replay after a
/// refresh rebuilds it from scratch).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: RequestBody,
    idempotency_key: Option<String>,
    refresh_on_401: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            idempotency_key: None,
            refresh_on_401: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        self.body = RequestBody::Json(value);
        Ok(self)
    }

    pub fn query_param(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn multipart(mut self, fields: Vec<FormField>) -> Self {
        self.body = RequestBody::Multipart(fields);
        self
    }

    /// Attach a fresh idempotency key. The same key is reused if the request is replayed.
    pub fn idempotent(mut self) -> Self {
        self.idempotency_key = Some(uuid::Uuid::new_v4().to_string());
        self
    }

    /// Credential exchanges answer 401 for bad credentials, not for an expired session.
    pub fn without_refresh(mut self) -> Self {
        self.refresh_on_401 = false;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
    refresher: RefreshCoordinator,
    events: broadcast::Sender<SessionEvent>,
}

impl ApiClient {
    pub fn new(config: &Config, tokens: Arc<dyn TokenStore>) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ApiError::Network)?;
        let (events, _) = broadcast::channel(16);

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            tokens,
            refresher: RefreshCoordinator::new(),
            events,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn auth(&self) -> AuthApi<'_> {
        AuthApi::new(self)
    }

    pub fn programs(&self) -> ProgramsApi<'_> {
        ProgramsApi::new(self)
    }

    pub fn payments(&self) -> PaymentsApi<'_> {
        PaymentsApi::new(self)
    }

    pub fn uploads(&self) -> UploadsApi<'_> {
        UploadsApi::new(self)
    }

    pub fn profile(&self) -> ProfileApi<'_> {
        ProfileApi::new(self)
    }

    pub fn admin(&self) -> AdminApi<'_> {
        AdminApi::new(self)
    }

    pub fn agent(&self) -> AgentApi<'_> {
        AgentApi::new(self)
    }

    pub(crate) fn notify(&self, event: SessionEvent) {
        // No receiver just means nobody is listening for redirects.
        let _ = self.events.send(event);
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send the request, refreshing the access token once on a 401.
    pub async fn execute(&self, request: &ApiRequest) -> Result<reqwest::Response, ApiError> {
        let bearer = self.tokens.access_token();
        let response = self.send_once(request, bearer.as_deref()).await?;

        if response.status() != StatusCode::UNAUTHORIZED
            || !request.refresh_on_401
            || self.tokens.refresh_token().is_none()
        {
            return check_status(response).await;
        }

        debug!(
            "{} {} returned 401, refreshing access token",
            request.method, request.path
        );

        let fresh = self
            .refresher
            .refresh(self.tokens.as_ref(), bearer.as_deref(), |refresh_token| {
                self.exchange_refresh_token(refresh_token)
            })
            .await;

        let access_token = match fresh {
            Ok(token) => token,
            Err(RefreshFailure::Rejected(_)) => {
                warn!("Session expired, redirecting to {}", LOGIN_ROUTE);
                self.notify(SessionEvent::Expired {
                    redirect: LOGIN_ROUTE,
                });
                return Err(ApiError::SessionExpired);
            }
            Err(RefreshFailure::NoSession) => return Err(ApiError::SessionExpired),
        };

        let replay = self.send_once(request, Some(&access_token)).await?;
        check_status(replay).await
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        let response = self.execute(&request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::Decode(format!("{} {}: {}", request.method, request.path, e))
        })
    }

    pub async fn send_unit(&self, request: ApiRequest) -> Result<(), ApiError> {
        self.execute(&request).await?;
        Ok(())
    }

    async fn send_once(
        &self,
        request: &ApiRequest,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        let mut builder = self
            .http
            .request(request.method.clone(), self.url(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = &request.idempotency_key {
            builder = builder.header(IDEMPOTENCY_HEADER, key);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(fields) => builder.multipart(build_form(fields)?),
        };

        Ok(builder.send().await?)
    }

    /// `POST /auth/refresh`, sent outside the 401 handling above.
    async fn exchange_refresh_token(&self, refresh_token: String) -> Result<String, ApiError> {
        let response = self
            .http
            .post(self.url("/auth/refresh"))
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: RefreshResponse = response.json().await?;
        Ok(body.access_token)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.json::<Value>().await.ok();
    Err(ApiError::from_status(status.as_u16(), body))
}

fn build_form(fields: &[FormField]) -> Result<Form, ApiError> {
    let mut form = Form::new();
    for field in fields {
        form = match field {
            FormField::Text { name, value } => form.text(name.clone(), value.clone()),
            FormField::File {
                name,
                file_name,
                mime,
                bytes,
            } => {
                let mut part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                if let Some(mime) = mime {
                    part = part
                        .mime_str(mime)
                        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
                }
                form.part(name.clone(), part)
            }
        };
    }
    Ok(form)
}

/// `{"message": "..."}` acknowledgements.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryTokenStore;

    fn client(base: &str) -> ApiClient {
        ApiClient::new(&Config::for_base_url(base), Arc::new(MemoryTokenStore::new())).unwrap()
    }

    #[test]
    fn url_joins_without_double_slashes() {
        let client = client("http://localhost:5000/api/v1/");
        assert_eq!(client.url("/programs"), "http://localhost:5000/api/v1/programs");
        assert_eq!(client.url("auth/me"), "http://localhost:5000/api/v1/auth/me");
    }

    #[test]
    fn idempotency_key_survives_clone() {
        let request = ApiRequest::post("/payments/confirm-payment").idempotent();
        let replay = request.clone();
        assert!(request.idempotency_key().is_some());
        assert_eq!(request.idempotency_key(), replay.idempotency_key());
    }

    #[test]
    fn multipart_form_rejects_bad_mime() {
        let fields = vec![FormField::File {
            name: "file".into(),
            file_name: "id.png".into(),
            mime: Some("not a mime".into()),
            bytes: vec![1, 2, 3],
        }];
        assert!(matches!(build_form(&fields), Err(ApiError::InvalidRequest(_))));
    }
}
