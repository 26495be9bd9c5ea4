use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{Challenge, Program, ProgramAddon, ProgramType};

#[derive(Debug, Clone, Default)]
pub struct ProgramFilter {
    pub tenant_id: Option<i64>,
    pub program_type: Option<ProgramType>,
}

/// Fields accepted by program create and update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgramInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub program_type: Option<ProgramType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_daily_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_total_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profit_split: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AddonInput {
    pub name: String,
    pub price: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_type: Option<String>,
}

/// Result of `POST /programs/{id}/purchase`: a pending challenge awaiting payment.
#[derive(Debug, Clone, Deserialize)]
pub struct PurchaseReceipt {
    #[serde(default)]
    pub message: String,
    pub challenge: Challenge,
    #[serde(default)]
    pub total_price: f64,
    #[serde(default)]
    pub payment_required: bool,
}

#[derive(Deserialize)]
struct ProgramList {
    programs: Vec<Program>,
}

#[derive(Deserialize)]
struct ProgramEnvelope {
    program: Program,
}

#[derive(Deserialize)]
struct AddonEnvelope {
    addon: ProgramAddon,
}

#[derive(Deserialize)]
struct ChallengeList {
    challenges: Vec<Challenge>,
}

pub struct ProgramsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ProgramsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, filter: &ProgramFilter) -> Result<Vec<Program>, ApiError> {
        let mut req = ApiRequest::get("/programs/");
        if let Some(tenant_id) = filter.tenant_id {
            req = req.query_param("tenant_id", tenant_id);
        }
        if let Some(program_type) = filter.program_type {
            req = req.query_param("type", program_type.as_str());
        }
        let body: ProgramList = self.client.send_json(req).await?;
        Ok(body.programs)
    }

    /// Single program with its active add-ons.
    pub async fn get(&self, id: i64) -> Result<Program, ApiError> {
        self.client
            .send_json(ApiRequest::get(format!("/programs/{}", id)))
            .await
    }

    pub async fn create(&self, input: &ProgramInput) -> Result<Program, ApiError> {
        let req = ApiRequest::post("/programs/").json(input)?;
        let body: ProgramEnvelope = self.client.send_json(req).await?;
        Ok(body.program)
    }

    pub async fn update(&self, id: i64, input: &ProgramInput) -> Result<Program, ApiError> {
        let req = ApiRequest::put(format!("/programs/{}", id)).json(input)?;
        let body: ProgramEnvelope = self.client.send_json(req).await?;
        Ok(body.program)
    }

    pub async fn purchase(&self, id: i64, addon_ids: &[i64]) -> Result<PurchaseReceipt, ApiError> {
        let req = ApiRequest::post(format!("/programs/{}/purchase", id))
            .json(&json!({ "addon_ids": addon_ids }))?;
        self.client.send_json(req).await
    }

    pub async fn my_challenges(&self) -> Result<Vec<Challenge>, ApiError> {
        let body: ChallengeList = self
            .client
            .send_json(ApiRequest::get("/programs/my-challenges"))
            .await?;
        Ok(body.challenges)
    }

    pub async fn challenge(&self, id: i64) -> Result<Challenge, ApiError> {
        self.client
            .send_json(ApiRequest::get(format!("/programs/challenges/{}", id)))
            .await
    }

    pub async fn create_addon(
        &self,
        program_id: i64,
        input: &AddonInput,
    ) -> Result<ProgramAddon, ApiError> {
        let req = ApiRequest::post(format!("/programs/{}/addons", program_id)).json(input)?;
        let body: AddonEnvelope = self.client.send_json(req).await?;
        Ok(body.addon)
    }
}
