use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ApiClient, ApiRequest, MessageResponse};
use crate::error::ApiError;
use crate::models::User;

/// Body of `POST /auth/login` and `POST /auth/login/2fa`.
///
/// With 2FA enabled the first call only carries `requires_2fa` and `user_id`;
/// every other field is present once the session is issued.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub requires_2fa: bool,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterResponse {
    #[serde(default)]
    pub message: String,
    pub user: User,
    #[serde(default)]
    pub verification_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserEnvelope {
    #[serde(default)]
    pub message: Option<String>,
    pub user: User,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordResetTicket {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reset_token: Option<String>,
}

/// Provisioning data for an authenticator app.
#[derive(Debug, Clone, Deserialize)]
pub struct TwoFactorSetup {
    #[serde(default)]
    pub message: String,
    pub uri: String,
    pub secret: String,
}

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        let req = ApiRequest::post("/auth/register")
            .json(request)?
            .without_refresh();
        self.client.send_json(req).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let req = ApiRequest::post("/auth/login")
            .json(&json!({ "email": email, "password": password }))?
            .without_refresh();
        self.client.send_json(req).await
    }

    pub async fn login_2fa(&self, user_id: i64, token: &str) -> Result<LoginResponse, ApiError> {
        let req = ApiRequest::post("/auth/login/2fa")
            .json(&json!({ "user_id": user_id, "token": token }))?
            .without_refresh();
        self.client.send_json(req).await
    }

    pub async fn logout(&self) -> Result<MessageResponse, ApiError> {
        self.client.send_json(ApiRequest::post("/auth/logout")).await
    }

    pub async fn me(&self) -> Result<User, ApiError> {
        let envelope: UserEnvelope = self.client.send_json(ApiRequest::get("/auth/me")).await?;
        Ok(envelope.user)
    }

    pub async fn verify_email(&self, token: &str) -> Result<UserEnvelope, ApiError> {
        let req = ApiRequest::get(format!("/auth/verify-email/{}", token)).without_refresh();
        self.client.send_json(req).await
    }

    pub async fn request_password_reset(
        &self,
        email: &str,
    ) -> Result<PasswordResetTicket, ApiError> {
        let req = ApiRequest::post("/auth/password/reset-request")
            .json(&json!({ "email": email }))?
            .without_refresh();
        self.client.send_json(req).await
    }

    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<UserEnvelope, ApiError> {
        let req = ApiRequest::post("/auth/password/reset")
            .json(&json!({ "token": token, "new_password": new_password }))?
            .without_refresh();
        self.client.send_json(req).await
    }

    pub async fn enable_2fa(&self) -> Result<TwoFactorSetup, ApiError> {
        self.client.send_json(ApiRequest::post("/auth/2fa/enable")).await
    }

    pub async fn confirm_2fa(&self, token: &str) -> Result<User, ApiError> {
        let req = ApiRequest::post("/auth/2fa/confirm").json(&json!({ "token": token }))?;
        let envelope: UserEnvelope = self.client.send_json(req).await?;
        Ok(envelope.user)
    }

    pub async fn disable_2fa(&self, password: &str) -> Result<User, ApiError> {
        let req = ApiRequest::post("/auth/2fa/disable").json(&json!({ "password": password }))?;
        let envelope: UserEnvelope = self.client.send_json(req).await?;
        Ok(envelope.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_factor_challenge_has_no_tokens() {
        let body: LoginResponse = serde_json::from_value(json!({
            "message": "2FA required",
            "requires_2fa": true,
            "user_id": 42
        }))
        .unwrap();
        assert!(body.requires_2fa);
        assert_eq!(body.user_id, Some(42));
        assert!(body.access_token.is_none() && body.user.is_none());
    }

    #[test]
    fn register_request_omits_unset_optionals() {
        let request = RegisterRequest {
            email: "a@b.co".into(),
            password: "Secret123!".into(),
            first_name: "A".into(),
            last_name: "B".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("phone").is_none());
        assert!(value.get("tenant_id").is_none());
        assert_eq!(value["email"], "a@b.co");
    }
}
