use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::stats::{filter_commissions, CommissionPeriod};
use shared::{AgentTrader, ChallengeStatus, Commission};

use crate::error::{SandboxError, SandboxResult};
use crate::store::{SandboxState, Store};

#[derive(Debug, Default, Deserialize)]
pub struct CommissionQuery {
    pub period: Option<String>,
}

pub async fn commissions(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Query(query): Query<CommissionQuery>,
) -> SandboxResult<Json<Value>> {
    let period = match query.period.as_deref() {
        None | Some("") => CommissionPeriod::All,
        Some(raw) => CommissionPeriod::parse(raw)
            .ok_or_else(|| SandboxError::bad_request(format!("Unknown period: {}", raw)))?,
    };

    let store = state.store().await;
    let agent = store.authenticate_agent(&headers)?;
    let mut own: Vec<Commission> = store
        .commissions
        .iter()
        .filter(|(agent_id, _)| *agent_id == agent.id || agent.role.is_admin())
        .map(|(_, c)| c.clone())
        .collect();
    own.sort_by(|a, b| b.date.cmp(&a.date));
    Ok(Json(json!({ "commissions": filter_commissions(&own, period, Utc::now()) })))
}

/// Summary of one referred trader, built from their most recent challenge.
fn trader_row(store: &Store, trader_id: i64) -> Option<AgentTrader> {
    let account = store.accounts.get(&trader_id)?;
    let latest = store
        .challenges
        .values()
        .filter(|c| c.user_id == Some(trader_id))
        .max_by_key(|c| c.id);
    let (total_trades, win_rate) = store.trade_stats.get(&trader_id).copied().unwrap_or((0, 0.0));
    let (status, current_balance, profit_loss) = match latest {
        Some(c) => {
            let current = c.current_balance.unwrap_or_default();
            let initial = c.initial_balance.unwrap_or(current);
            (c.status, current, current - initial)
        }
        None => (ChallengeStatus::Pending, 0.0, 0.0),
    };
    Some(AgentTrader {
        id: trader_id,
        name: account.user.full_name(),
        email: account.user.email.clone(),
        status,
        current_balance,
        profit_loss,
        total_trades,
        win_rate,
    })
}

pub async fn traders(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> SandboxResult<Json<Value>> {
    let store = state.store().await;
    let agent = store.authenticate_agent(&headers)?;
    let traders: Vec<AgentTrader> = store
        .accounts
        .values()
        .filter(|a| a.referred_by == Some(agent.id))
        .filter_map(|a| trader_row(&store, a.user.id))
        .collect();
    Ok(Json(json!({ "traders": traders })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::DEMO_TRADER;

    #[test]
    fn trader_rows_follow_latest_challenge() {
        let store = Store::seeded().unwrap();
        let trader = store.account_by_email(DEMO_TRADER.0).unwrap().user.id;
        let row = trader_row(&store, trader).unwrap();
        assert_eq!(row.status, ChallengeStatus::Passed);
        assert_eq!(row.profit_loss, 1_050.0);
        assert_eq!(row.total_trades, 42);
        assert!(trader_row(&store, 9_999).is_none());
    }
}
