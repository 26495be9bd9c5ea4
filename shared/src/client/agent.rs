use serde::Deserialize;

use super::{ApiClient, ApiRequest};
use crate::error::ApiError;
use crate::models::{AgentTrader, Commission};
use crate::stats::CommissionPeriod;

#[derive(Deserialize)]
struct CommissionList {
    commissions: Vec<Commission>,
}

#[derive(Deserialize)]
struct TraderList {
    traders: Vec<AgentTrader>,
}

pub struct AgentApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AgentApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    /// Commissions of the signed-in agent.
    pub async fn commissions(&self, period: CommissionPeriod) -> Result<Vec<Commission>, ApiError> {
        let req = ApiRequest::get("/agent/commissions").query_param("period", period.as_str());
        let body: CommissionList = self.client.send_json(req).await?;
        Ok(body.commissions)
    }

    pub async fn traders(&self) -> Result<Vec<AgentTrader>, ApiError> {
        let body: TraderList = self
            .client
            .send_json(ApiRequest::get("/agent/traders"))
            .await?;
        Ok(body.traders)
    }
}
