use serde::{Deserialize, Serialize};

use super::{ApiClient, ApiRequest, MessageResponse};
use crate::error::ApiError;
use crate::models::User;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

#[derive(Deserialize)]
struct ProfileEnvelope {
    user: User,
}

pub struct ProfileApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ProfileApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<User, ApiError> {
        let body: ProfileEnvelope = self.client.send_json(ApiRequest::get("/profile")).await?;
        Ok(body.user)
    }

    pub async fn update(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        let req = ApiRequest::put("/profile").json(update)?;
        let body: ProfileEnvelope = self.client.send_json(req).await?;
        Ok(body.user)
    }

    pub async fn change_password(
        &self,
        current: &str,
        new: &str,
    ) -> Result<MessageResponse, ApiError> {
        let req = ApiRequest::put("/profile/password").json(&serde_json::json!({
            "current_password": current,
            "new_password": new,
        }))?;
        self.client.send_json(req).await
    }
}
