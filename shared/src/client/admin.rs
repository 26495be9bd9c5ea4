use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ApiClient, ApiRequest, MessageResponse};
use crate::error::ApiError;
use crate::models::{AdminDashboardStats, KycSubmission, PaymentList, Role, User, UserList};

#[derive(Debug, Clone, Default)]
pub struct UserQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub role: Option<Role>,
    /// `active` or `inactive`.
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PaymentQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
}

/// Fields accepted by admin user create/update. `password` is required on create.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AdminUserInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
}

#[derive(Deserialize)]
struct UserEnvelope {
    user: User,
}

#[derive(Deserialize)]
struct PendingKyc {
    pending_kyc: Vec<KycSubmission>,
}

pub struct AdminApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AdminApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn users(&self, query: &UserQuery) -> Result<UserList, ApiError> {
        let mut req = ApiRequest::get("/admin/users");
        if let Some(page) = query.page {
            req = req.query_param("page", page);
        }
        if let Some(per_page) = query.per_page {
            req = req.query_param("per_page", per_page);
        }
        if let Some(role) = query.role {
            req = req.query_param("role", role.as_str());
        }
        if let Some(status) = &query.status {
            req = req.query_param("status", status);
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            req = req.query_param("search", search);
        }
        self.client.send_json(req).await
    }

    pub async fn user(&self, id: i64) -> Result<User, ApiError> {
        self.client
            .send_json(ApiRequest::get(format!("/admin/users/{}", id)))
            .await
    }

    pub async fn create_user(&self, input: &AdminUserInput) -> Result<User, ApiError> {
        let req = ApiRequest::post("/admin/users").json(input)?;
        let body: UserEnvelope = self.client.send_json(req).await?;
        Ok(body.user)
    }

    pub async fn update_user(&self, id: i64, input: &AdminUserInput) -> Result<User, ApiError> {
        let req = ApiRequest::put(format!("/admin/users/{}", id)).json(input)?;
        let body: UserEnvelope = self.client.send_json(req).await?;
        Ok(body.user)
    }

    /// Soft delete: the server deactivates the account.
    pub async fn delete_user(&self, id: i64) -> Result<MessageResponse, ApiError> {
        self.client
            .send_json(ApiRequest::delete(format!("/admin/users/{}", id)))
            .await
    }

    pub async fn toggle_user_status(&self, id: i64) -> Result<User, ApiError> {
        let req = ApiRequest::post(format!("/admin/users/{}/toggle-status", id));
        let body: UserEnvelope = self.client.send_json(req).await?;
        Ok(body.user)
    }

    pub async fn dashboard_stats(&self) -> Result<AdminDashboardStats, ApiError> {
        self.client
            .send_json(ApiRequest::get("/admin/dashboard/stats"))
            .await
    }

    /// Platform settings are a free-form document.
    pub async fn settings(&self) -> Result<Value, ApiError> {
        self.client.send_json(ApiRequest::get("/admin/settings")).await
    }

    pub async fn update_settings(&self, settings: &Value) -> Result<Value, ApiError> {
        let req = ApiRequest::put("/admin/settings").json(settings)?;
        self.client.send_json(req).await
    }

    pub async fn payments(&self, query: &PaymentQuery) -> Result<PaymentList, ApiError> {
        let mut req = ApiRequest::get("/admin/payments");
        if let Some(page) = query.page {
            req = req.query_param("page", page);
        }
        if let Some(per_page) = query.per_page {
            req = req.query_param("per_page", per_page);
        }
        if let Some(status) = &query.status {
            req = req.query_param("status", status);
        }
        self.client.send_json(req).await
    }

    pub async fn pending_kyc(&self) -> Result<Vec<KycSubmission>, ApiError> {
        let body: PendingKyc = self.client.send_json(ApiRequest::get("/admin/kyc/pending")).await?;
        Ok(body.pending_kyc)
    }

    pub async fn approve_kyc(&self, user_id: i64) -> Result<MessageResponse, ApiError> {
        self.client
            .send_json(ApiRequest::post(format!("/admin/kyc/{}/approve", user_id)))
            .await
    }

    pub async fn reject_kyc(
        &self,
        user_id: i64,
        reason: &str,
        notes: Option<&str>,
    ) -> Result<MessageResponse, ApiError> {
        let req = ApiRequest::post(format!("/admin/kyc/{}/reject", user_id))
            .json(&json!({ "reason": reason, "notes": notes.unwrap_or_default() }))?;
        self.client.send_json(req).await
    }
}
