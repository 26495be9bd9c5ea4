use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use tracing::info;

use super::{check_password, require_fields, str_field};
use crate::error::{SandboxError, SandboxResult};
use crate::store::SandboxState;

pub async fn get_profile(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> SandboxResult<Json<Value>> {
    let user = state.store().await.authenticate(&headers)?;
    Ok(Json(json!({ "user": user })))
}

pub async fn update_profile(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    let user = store.authenticate(&headers)?;
    let account = store.account_mut(user.id)?;
    if let Some(first_name) = str_field(&body, "first_name") {
        account.user.first_name = first_name;
    }
    if let Some(last_name) = str_field(&body, "last_name") {
        account.user.last_name = last_name;
    }
    if body.get("phone").is_some() {
        account.user.phone = str_field(&body, "phone");
    }
    if body.get("country_code").is_some() {
        account.user.country_code = str_field(&body, "country_code");
    }
    if let Some(date_of_birth) = str_field(&body, "date_of_birth") {
        chrono::NaiveDate::parse_from_str(&date_of_birth, "%Y-%m-%d")
            .map_err(|_| SandboxError::bad_request("date_of_birth must be YYYY-MM-DD"))?;
        account.user.date_of_birth = Some(date_of_birth);
    }
    Ok(Json(json!({
        "message": "Profile updated successfully",
        "user": account.user,
    })))
}

pub async fn change_password(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    require_fields(&body, &["current_password", "new_password"])?;
    let current = body.get("current_password").and_then(Value::as_str).unwrap_or_default();
    let new_password = body.get("new_password").and_then(Value::as_str).unwrap_or_default();

    let mut store = state.store().await;
    let user = store.authenticate(&headers)?;
    let account = store.account_mut(user.id)?;
    if account.password != current {
        return Err(SandboxError::bad_request("Current password is incorrect"));
    }
    check_password(new_password)?;
    account.password = new_password.to_string();
    info!("User {} changed their password", user.id);
    Ok(Json(json!({ "message": "Password updated successfully" })))
}
