use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{ApiClient, ApiRequest};
use crate::error::ApiError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmation {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub challenge_id: Option<i64>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub amount: f64,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentStatus {
    pub status: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub created: Option<i64>,
}

pub struct PaymentsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> PaymentsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn create_payment_intent(
        &self,
        challenge_id: i64,
    ) -> Result<PaymentIntent, ApiError> {
        let req = ApiRequest::post("/payments/create-payment-intent")
            .json(&json!({ "challenge_id": challenge_id }))?;
        self.client.send_json(req).await
    }

    /// Confirm a paid intent. Carries an idempotency key so a replay after a
    /// token refresh cannot activate the challenge twice.
    pub async fn confirm_payment(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentConfirmation, ApiError> {
        let req = ApiRequest::post("/payments/confirm-payment")
            .json(&json!({ "payment_intent_id": payment_intent_id }))?
            .idempotent();
        self.client.send_json(req).await
    }

    pub async fn refund(
        &self,
        challenge_id: i64,
        reason: Option<&str>,
    ) -> Result<RefundReceipt, ApiError> {
        let req = ApiRequest::post(format!("/payments/refund/{}", challenge_id))
            .json(&json!({ "reason": reason }))?
            .idempotent();
        self.client.send_json(req).await
    }

    pub async fn status(&self, payment_intent_id: &str) -> Result<PaymentIntentStatus, ApiError> {
        self.client
            .send_json(ApiRequest::get(format!("/payments/status/{}", payment_intent_id)))
            .await
    }
}
