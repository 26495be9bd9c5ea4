use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{ChallengeStatus, Program, ProgramAddon, ProgramType};
use tracing::info;

use super::{f64_field, require_fields, str_field};
use crate::error::{SandboxError, SandboxResult};
use crate::store::SandboxState;

#[derive(Debug, Deserialize)]
pub struct ProgramListQuery {
    pub tenant_id: Option<i64>,
    #[serde(rename = "type")]
    pub program_type: Option<String>,
}

pub async fn list(
    State(state): State<SandboxState>,
    Query(query): Query<ProgramListQuery>,
) -> Json<Value> {
    let kind = query.program_type.as_deref().and_then(ProgramType::parse);
    let store = state.store().await;
    let programs: Vec<&Program> = store
        .programs
        .values()
        .filter(|p| p.is_active)
        .filter(|p| query.tenant_id.map_or(true, |t| p.tenant_id == Some(t)))
        .filter(|p| kind.map_or(true, |k| p.program_type == k))
        .collect();
    Json(json!({ "programs": programs }))
}

pub async fn get(
    State(state): State<SandboxState>,
    Path(id): Path<i64>,
) -> SandboxResult<Json<Program>> {
    let store = state.store().await;
    Ok(Json(store.program(id)?.clone()))
}

fn apply_program_fields(program: &mut Program, body: &Value) -> SandboxResult<()> {
    if let Some(name) = str_field(body, "name") {
        program.name = name;
    }
    if let Some(raw) = str_field(body, "type") {
        program.program_type = ProgramType::parse(&raw).ok_or_else(|| {
            SandboxError::bad_request(format!("Invalid program type: {}", raw))
        })?;
    }
    if let Some(description) = str_field(body, "description") {
        program.description = Some(description);
    }
    if let Some(size) = f64_field(body, "account_size") {
        program.account_size = size;
    }
    if let Some(price) = f64_field(body, "price") {
        program.price = price;
    }
    if let Some(target) = f64_field(body, "profit_target") {
        program.profit_target = Some(target);
    }
    if let Some(limit) = f64_field(body, "max_daily_loss") {
        program.max_daily_loss = Some(limit);
    }
    if let Some(limit) = f64_field(body, "max_total_loss") {
        program.max_total_loss = Some(limit);
    }
    if let Some(split) = f64_field(body, "profit_split") {
        program.profit_split = split;
    }
    if let Some(active) = body.get("is_active").and_then(Value::as_bool) {
        program.is_active = active;
    }
    Ok(())
}

pub async fn create(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> SandboxResult<(StatusCode, Json<Value>)> {
    let mut store = state.store().await;
    store.authenticate_admin(&headers)?;

    let missing: Vec<&str> = ["name", "type", "account_size", "price"]
        .into_iter()
        .filter(|f| body.get(*f).map_or(true, Value::is_null))
        .collect();
    if !missing.is_empty() {
        return Err(SandboxError::bad_request(format!("Missing fields: {}", missing.join(", "))));
    }

    let id = store.next_id();
    let mut program = Program {
        id,
        tenant_id: body.get("tenant_id").and_then(Value::as_i64),
        name: String::new(),
        program_type: ProgramType::Unknown,
        description: None,
        account_size: 0.0,
        price: 0.0,
        profit_target: None,
        max_daily_loss: None,
        max_total_loss: None,
        profit_split: 80.0,
        min_trading_days: None,
        is_active: true,
        addons: Vec::new(),
    };
    apply_program_fields(&mut program, &body)?;
    store.programs.insert(id, program.clone());
    info!("Created program {} ({})", id, program.name);

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Program created successfully", "program": program })),
    ))
}

pub async fn update(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    store.authenticate_admin(&headers)?;
    let program = store
        .programs
        .get_mut(&id)
        .ok_or_else(|| SandboxError::not_found("Program"))?;
    apply_program_fields(program, &body)?;
    Ok(Json(json!({ "message": "Program updated successfully", "program": program })))
}

pub async fn create_addon(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(program_id): Path<i64>,
    Json(body): Json<Value>,
) -> SandboxResult<(StatusCode, Json<Value>)> {
    require_fields(&body, &["name", "price"])?;
    let mut store = state.store().await;
    store.authenticate_admin(&headers)?;
    store.program(program_id)?;

    let addon = ProgramAddon {
        id: store.next_id(),
        program_id: Some(program_id),
        name: str_field(&body, "name").unwrap_or_default(),
        description: str_field(&body, "description"),
        price: f64_field(&body, "price").unwrap_or_default(),
        price_type: str_field(&body, "price_type").or_else(|| Some("fixed".to_string())),
        is_active: true,
    };
    if let Some(program) = store.programs.get_mut(&program_id) {
        program.addons.push(addon.clone());
    }
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Add-on created successfully", "addon": addon })),
    ))
}

pub async fn purchase(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(program_id): Path<i64>,
    Json(body): Json<Value>,
) -> SandboxResult<(StatusCode, Json<Value>)> {
    let mut store = state.store().await;
    let user = store.authenticate(&headers)?;
    let program = store.program(program_id)?.clone();
    if !program.is_active {
        return Err(SandboxError::bad_request("Program is not available"));
    }

    let addon_ids: Vec<i64> = body
        .get("addon_ids")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    let total_price = program.price
        + program
            .addons
            .iter()
            .filter(|a| a.is_active && addon_ids.contains(&a.id))
            .map(|a| a.price)
            .sum::<f64>();

    let challenge_id =
        store.add_challenge(user.id, program_id, ChallengeStatus::Pending, 0.0, 0.0, false)?;
    store.challenge_totals.insert(challenge_id, total_price);
    let challenge = match store.challenges.get_mut(&challenge_id) {
        Some(challenge) => {
            challenge.created_at = Some(Utc::now());
            challenge.clone()
        }
        None => return Err(SandboxError::Internal("Failed to purchase program".to_string())),
    };
    info!("User {} purchased program {} as challenge {}", user.id, program_id, challenge_id);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Challenge created, awaiting payment",
            "challenge": challenge,
            "total_price": total_price,
            "payment_required": true,
        })),
    ))
}

pub async fn my_challenges(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> SandboxResult<Json<Value>> {
    let store = state.store().await;
    let user = store.authenticate(&headers)?;
    let challenges: Vec<_> = store
        .challenges
        .values()
        .filter(|c| c.user_id == Some(user.id))
        .collect();
    Ok(Json(json!({ "challenges": challenges })))
}

pub async fn challenge(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> SandboxResult<Json<Value>> {
    let store = state.store().await;
    let user = store.authenticate(&headers)?;
    let challenge = store
        .challenges
        .get(&id)
        .ok_or_else(|| SandboxError::not_found("Challenge"))?;
    if challenge.user_id != Some(user.id) && !user.role.is_admin() {
        return Err(SandboxError::forbidden());
    }
    Ok(Json(json!(challenge)))
}
