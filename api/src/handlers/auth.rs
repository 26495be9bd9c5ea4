use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use shared::{KycStatus, Role, User};
use tracing::info;
use uuid::Uuid;

use super::{check_password, require_fields, str_field};
use crate::error::{SandboxError, SandboxResult};
use crate::store::{bearer_token, Account, SandboxState};
use crate::totp;

pub async fn register(
    State(state): State<SandboxState>,
    Json(body): Json<Value>,
) -> SandboxResult<(StatusCode, Json<Value>)> {
    require_fields(&body, &["email", "password", "first_name", "last_name"])?;
    let email = str_field(&body, "email").unwrap_or_default().to_lowercase();
    let password = str_field(&body, "password").unwrap_or_default();
    if !email.contains('@') {
        return Err(SandboxError::bad_request(format!("Invalid email: {}", email)));
    }
    check_password(&password)?;

    let mut store = state.store().await;
    if store.account_by_email(&email).is_some() {
        return Err(SandboxError::bad_request("Email already registered"));
    }

    let id = store.next_id();
    let verification_token = Uuid::new_v4().to_string();
    let user = User {
        id,
        email,
        first_name: str_field(&body, "first_name").unwrap_or_default(),
        last_name: str_field(&body, "last_name").unwrap_or_default(),
        phone: str_field(&body, "phone"),
        country_code: str_field(&body, "country_code"),
        date_of_birth: None,
        role: Role::Trader,
        kyc_status: KycStatus::NotSubmitted,
        is_active: true,
        is_verified: false,
        two_factor_enabled: false,
        created_at: Some(Utc::now()),
        last_login_at: None,
    };
    store.accounts.insert(
        id,
        Account {
            user: user.clone(),
            password,
            totp_secret: None,
            referred_by: None,
            verification_token: Some(verification_token.clone()),
        },
    );
    info!("Registered user {} ({})", id, user.email);

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Please verify your email.",
            "user": user,
            "verification_token": verification_token,
        })),
    ))
}

pub async fn login(
    State(state): State<SandboxState>,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    require_fields(&body, &["email", "password"])?;
    let email = str_field(&body, "email").unwrap_or_default();
    let password = body.get("password").and_then(Value::as_str).unwrap_or_default();

    let mut store = state.store().await;
    let account = store
        .account_by_email(&email)
        .filter(|a| a.password == password)
        .ok_or_else(|| SandboxError::unauthorized("Invalid email or password"))?;
    if !account.user.is_active {
        return Err(SandboxError::unauthorized("Account is deactivated"));
    }
    let user_id = account.user.id;

    if account.user.two_factor_enabled {
        info!("Login for user {} waiting on second factor", user_id);
        return Ok(Json(json!({
            "message": "2FA required",
            "requires_2fa": true,
            "user_id": user_id,
        })));
    }

    complete_login(&mut store, user_id).map(Json)
}

pub async fn login_2fa(
    State(state): State<SandboxState>,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    require_fields(&body, &["user_id", "token"])?;
    let user_id = body
        .get("user_id")
        .and_then(Value::as_i64)
        .ok_or_else(|| SandboxError::bad_request("user_id must be a number"))?;
    let token = str_field(&body, "token").unwrap_or_default();

    let mut store = state.store().await;
    let account = store.account(user_id)?;
    let secret = match (&account.totp_secret, account.user.two_factor_enabled) {
        (Some(secret), true) => secret.clone(),
        _ => return Err(SandboxError::unauthorized("2FA is not enabled for this user")),
    };
    if !totp::verify(&secret, state.issuer(), &account.user.email, &token)? {
        return Err(SandboxError::unauthorized("Invalid 2FA token"));
    }

    complete_login(&mut store, user_id).map(Json)
}

fn complete_login(store: &mut crate::store::Store, user_id: i64) -> SandboxResult<Value> {
    store.account_mut(user_id)?.user.last_login_at = Some(Utc::now());
    let (access_token, refresh_token) = store.issue_tokens(user_id);
    let user = store.account(user_id)?.user.clone();
    info!("User {} logged in", user_id);
    Ok(json!({
        "message": "Login successful",
        "user": user,
        "access_token": access_token,
        "refresh_token": refresh_token,
    }))
}

pub async fn logout(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    let user = store.authenticate(&headers)?;
    if let Some(token) = bearer_token(&headers) {
        store.access_tokens.remove(token);
    }
    info!("User {} logged out", user.id);
    Ok(Json(json!({ "message": "Logout successful" })))
}

pub async fn refresh(
    State(state): State<SandboxState>,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    state.record_refresh_call();
    let refresh_token = str_field(&body, "refresh_token")
        .ok_or_else(|| SandboxError::bad_request("Refresh token is required"))?;

    let mut store = state.store().await;
    let user_id = *store
        .refresh_tokens
        .get(&refresh_token)
        .ok_or_else(|| SandboxError::unauthorized("Invalid refresh token"))?;
    if !store.account(user_id).map(|a| a.user.is_active).unwrap_or(false) {
        return Err(SandboxError::unauthorized("User not found or inactive"));
    }

    let access_token = Uuid::new_v4().to_string();
    store.access_tokens.insert(access_token.clone(), user_id);
    info!("Refreshed access token for user {}", user_id);
    Ok(Json(json!({ "access_token": access_token })))
}

pub async fn me(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> SandboxResult<Json<Value>> {
    let user = state.store().await.authenticate(&headers)?;
    Ok(Json(json!({ "user": user })))
}

pub async fn verify_email(
    State(state): State<SandboxState>,
    Path(token): Path<String>,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    let account = store
        .accounts
        .values_mut()
        .find(|a| a.verification_token.as_deref() == Some(token.as_str()))
        .ok_or_else(|| SandboxError::bad_request("Invalid or expired token"))?;
    account.verification_token = None;
    account.user.is_verified = true;
    Ok(Json(json!({
        "message": "Email verified successfully",
        "user": account.user,
    })))
}

pub async fn request_password_reset(
    State(state): State<SandboxState>,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let email =
        str_field(&body, "email").ok_or_else(|| SandboxError::bad_request("Email is required"))?;

    let mut store = state.store().await;
    let user_id = store.account_by_email(&email).map(|a| a.user.id);
    let reset_token = user_id.map(|id| {
        let token = Uuid::new_v4().to_string();
        store.reset_tokens.insert(token.clone(), id);
        token
    });

    // Same answer whether or not the email exists.
    Ok(Json(json!({
        "message": "If the email exists, a password reset link has been sent",
        "reset_token": reset_token,
    })))
}

pub async fn reset_password(
    State(state): State<SandboxState>,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    require_fields(&body, &["token", "new_password"])?;
    let token = str_field(&body, "token").unwrap_or_default();
    let new_password = str_field(&body, "new_password").unwrap_or_default();
    check_password(&new_password)?;

    let mut store = state.store().await;
    let user_id = store
        .reset_tokens
        .remove(&token)
        .ok_or_else(|| SandboxError::bad_request("Invalid or expired token"))?;
    let account = store.account_mut(user_id)?;
    account.password = new_password;
    Ok(Json(json!({
        "message": "Password reset successfully",
        "user": account.user,
    })))
}

pub async fn enable_2fa(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    let user = store.authenticate(&headers)?;
    if user.two_factor_enabled {
        return Err(SandboxError::bad_request("2FA is already enabled"));
    }

    let secret = totp::generate_secret();
    let uri = totp::provisioning_uri(&secret, state.issuer(), &user.email)?;
    store.account_mut(user.id)?.totp_secret = Some(secret.clone());
    Ok(Json(json!({
        "message": "2FA secret generated",
        "uri": uri,
        "secret": secret,
    })))
}

pub async fn confirm_2fa(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let token =
        str_field(&body, "token").ok_or_else(|| SandboxError::bad_request("Token is required"))?;

    let mut store = state.store().await;
    let user = store.authenticate(&headers)?;
    let account = store.account_mut(user.id)?;
    if account.user.two_factor_enabled {
        return Err(SandboxError::bad_request("2FA is already enabled"));
    }
    let secret = account
        .totp_secret
        .clone()
        .ok_or_else(|| SandboxError::bad_request("2FA secret not generated"))?;
    if !totp::verify(&secret, state.issuer(), &account.user.email, &token)? {
        return Err(SandboxError::bad_request("Invalid 2FA token"));
    }
    account.user.two_factor_enabled = true;
    info!("2FA enabled for user {}", user.id);
    Ok(Json(json!({
        "message": "2FA enabled successfully",
        "user": account.user,
    })))
}

pub async fn disable_2fa(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let password = body
        .get("password")
        .and_then(Value::as_str)
        .ok_or_else(|| SandboxError::bad_request("Password is required"))?;

    let mut store = state.store().await;
    let user = store.authenticate(&headers)?;
    let account = store.account_mut(user.id)?;
    if account.password != password {
        return Err(SandboxError::bad_request("Invalid password"));
    }
    account.user.two_factor_enabled = false;
    account.totp_secret = None;
    Ok(Json(json!({
        "message": "2FA disabled successfully",
        "user": account.user,
    })))
}
