use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use shared::{
    ChallengeStatus, Commission, CommissionStatus, CommissionType, Payment, PaymentStatus,
    TraderRef,
};
use tracing::{info, warn};
use uuid::Uuid;

use super::idempotency_key;
use crate::error::{SandboxError, SandboxResult};
use crate::store::{IdempotencyScope, PaymentIntentRecord, SandboxState, Store};

pub const CURRENCY: &str = "usd";
/// Share of the purchase price credited to the referring agent.
pub const ENROLLMENT_RATE: f64 = 10.0;

pub async fn create_payment_intent(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let challenge_id = body
        .get("challenge_id")
        .and_then(Value::as_i64)
        .ok_or_else(|| SandboxError::bad_request("challenge_id is required"))?;

    let mut store = state.store().await;
    let user = store.authenticate(&headers)?;
    let challenge = store
        .challenges
        .get(&challenge_id)
        .ok_or_else(|| SandboxError::not_found("Challenge"))?;
    if challenge.user_id != Some(user.id) {
        return Err(SandboxError::forbidden());
    }
    if challenge.payment_status.as_deref() == Some("paid") {
        return Err(SandboxError::Conflict("Challenge is already paid".to_string()));
    }

    let amount = store
        .challenge_totals
        .get(&challenge_id)
        .copied()
        .or_else(|| challenge.program.as_ref().map(|p| p.price))
        .unwrap_or_default();
    let intent_id = format!("pi_{}", Uuid::new_v4().simple());
    let client_secret = format!("{}_secret_{}", intent_id, Uuid::new_v4().simple());
    store.intents.insert(
        intent_id.clone(),
        PaymentIntentRecord {
            challenge_id,
            user_id: user.id,
            amount,
            status: "requires_confirmation".to_string(),
            created: Utc::now().timestamp(),
        },
    );
    info!("Created payment intent {} for challenge {}", intent_id, challenge_id);

    Ok(Json(json!({
        "client_secret": client_secret,
        "payment_intent_id": intent_id,
        "amount": amount,
        "currency": CURRENCY,
    })))
}

/// Scope a request's `Idempotency-Key` to its caller and route.
fn scoped(headers: &HeaderMap, user_id: i64, route: String) -> Option<IdempotencyScope> {
    idempotency_key(headers).map(|key| IdempotencyScope { user_id, route, key })
}

/// The stored response, if this caller already sent this key on this route.
fn replay(store: &Store, scope: Option<&IdempotencyScope>) -> Option<Value> {
    scope.and_then(|s| store.idempotent.get(s)).cloned()
}

fn remember(store: &mut Store, scope: Option<IdempotencyScope>, response: &Value) {
    if let Some(scope) = scope {
        store.idempotent.insert(scope, response.clone());
    }
}

/// Record the raw header before authentication, so rejected attempts show up too.
fn log_key(store: &mut Store, headers: &HeaderMap) {
    if let Some(key) = idempotency_key(headers) {
        store.idempotency_log.push(key);
    }
}

fn credit_referrer(store: &mut Store, user_id: i64, amount: f64, program: Option<String>) {
    let Some(account) = store.accounts.get(&user_id) else {
        return;
    };
    let Some(agent_id) = account.referred_by else {
        return;
    };
    let trader = TraderRef {
        id: Some(user_id),
        name: account.user.full_name(),
    };
    let id = store.next_id();
    store.commissions.push((
        agent_id,
        Commission {
            id: Some(id),
            date: Some(Utc::now()),
            trader,
            kind: CommissionType::Enrollment,
            program,
            rate: ENROLLMENT_RATE,
            amount: (amount * ENROLLMENT_RATE).round() / 100.0,
            status: CommissionStatus::Pending,
            payout_date: None,
        },
    ));
}

pub async fn confirm_payment(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let intent_id = body
        .get("payment_intent_id")
        .and_then(Value::as_str)
        .ok_or_else(|| SandboxError::bad_request("payment_intent_id is required"))?
        .to_string();

    let mut store = state.store().await;
    log_key(&mut store, &headers);
    let user = store.authenticate(&headers)?;
    let owner = store
        .intents
        .get(&intent_id)
        .ok_or_else(|| SandboxError::not_found("Payment intent"))?
        .user_id;
    if owner != user.id {
        return Err(SandboxError::forbidden());
    }
    let scope = scoped(&headers, user.id, "/payments/confirm-payment".to_string());
    if let Some(previous) = replay(&store, scope.as_ref()) {
        info!("Replaying confirmation of {} for user {}", intent_id, user.id);
        return Ok(Json(previous));
    }

    let Some(intent) = store.intents.get_mut(&intent_id) else {
        return Err(SandboxError::not_found("Payment intent"));
    };
    let challenge_id = intent.challenge_id;
    let amount = intent.amount;
    let first_confirmation = intent.status != "succeeded";
    intent.status = "succeeded".to_string();

    if first_confirmation {
        let program = match store.challenges.get_mut(&challenge_id) {
            Some(challenge) => {
                challenge.payment_status = Some("paid".to_string());
                challenge.status = ChallengeStatus::Active;
                challenge.program.as_ref().map(|p| (p.id, p.name.clone()))
            }
            None => None,
        };
        let payment_id = store.next_id();
        store.payments.push(Payment {
            id: payment_id,
            transaction_id: Some(intent_id.clone()),
            user_id: Some(user.id),
            program_id: program.as_ref().map(|(id, _)| *id),
            amount,
            currency: Some(CURRENCY.to_string()),
            status: PaymentStatus::Completed,
            payment_method: Some("card".to_string()),
            created_at: Some(Utc::now()),
        });
        credit_referrer(&mut store, user.id, amount, program.map(|(_, name)| name));
        info!("Payment {} confirmed for challenge {}", intent_id, challenge_id);
    }

    let response = json!({
        "message": "Payment confirmed successfully",
        "challenge_id": challenge_id,
        "status": "succeeded",
    });
    remember(&mut store, scope, &response);
    Ok(Json(response))
}

pub async fn refund(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(challenge_id): Path<i64>,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let reason = body.get("reason").and_then(Value::as_str).unwrap_or("requested_by_customer");

    let mut store = state.store().await;
    log_key(&mut store, &headers);
    let user = store.authenticate(&headers)?;
    let owner = store
        .challenges
        .get(&challenge_id)
        .ok_or_else(|| SandboxError::not_found("Challenge"))?
        .user_id;
    if owner != Some(user.id) && !user.role.is_admin() {
        return Err(SandboxError::forbidden());
    }
    let scope = scoped(&headers, user.id, format!("/payments/refund/{}", challenge_id));
    if let Some(previous) = replay(&store, scope.as_ref()) {
        info!("Replaying refund of challenge {} for user {}", challenge_id, user.id);
        return Ok(Json(previous));
    }

    let transaction_ids: Vec<String> = store
        .intents
        .iter()
        .filter(|(_, intent)| intent.challenge_id == challenge_id)
        .map(|(id, _)| id.clone())
        .collect();
    let payment = store
        .payments
        .iter_mut()
        .find(|p| {
            p.status == PaymentStatus::Completed
                && p.transaction_id.as_ref().is_some_and(|t| {
                    transaction_ids.contains(t) || *t == format!("pi_seed_{}", challenge_id)
                })
        })
        .ok_or_else(|| SandboxError::bad_request("No completed payment for this challenge"))?;
    payment.status = PaymentStatus::Refunded;
    let amount = payment.amount;

    if let Some(challenge) = store.challenges.get_mut(&challenge_id) {
        challenge.payment_status = Some("refunded".to_string());
    }
    warn!("Refunded challenge {} ({}), reason: {}", challenge_id, amount, reason);

    let response = json!({
        "refund_id": format!("re_{}", Uuid::new_v4().simple()),
        "amount": amount,
        "status": "succeeded",
    });
    remember(&mut store, scope, &response);
    Ok(Json(response))
}

pub async fn status(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(intent_id): Path<String>,
) -> SandboxResult<Json<Value>> {
    let store = state.store().await;
    let user = store.authenticate(&headers)?;
    let intent = store
        .intents
        .get(&intent_id)
        .ok_or_else(|| SandboxError::not_found("Payment intent"))?;
    if intent.user_id != user.id && !user.role.is_admin() {
        return Err(SandboxError::forbidden());
    }
    Ok(Json(json!({
        "status": intent.status,
        "amount": intent.amount,
        "currency": CURRENCY,
        "created": intent.created,
    })))
}
