use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use shared::{
    AdminDashboardStats, ChallengeCounts, ChallengeStatus, KycStatus, Payment, PaymentStatus,
    RecentPayment, RecentUser, RevenueSummary, Role, User, UserCounts,
};
use tracing::{info, warn};

use super::{check_password, paginate, require_fields, str_field};
use crate::error::{SandboxError, SandboxResult};
use crate::store::{Account, SandboxState};

const RECENT_LIMIT: usize = 5;

#[derive(Debug, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub role: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentListQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
}

fn matches_user(user: &User, query: &UserListQuery) -> bool {
    if let Some(role) = query.role.as_deref().filter(|r| !r.is_empty()) {
        if user.role != Role::parse(role) {
            return false;
        }
    }
    match query.status.as_deref() {
        Some("active") if !user.is_active => return false,
        Some("inactive") if user.is_active => return false,
        _ => {}
    }
    match query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(search) => {
            let needle = search.to_lowercase();
            [&user.email, &user.first_name, &user.last_name]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        }
        None => true,
    }
}

pub async fn list_users(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Query(query): Query<UserListQuery>,
) -> SandboxResult<Json<Value>> {
    let store = state.store().await;
    store.authenticate_admin(&headers)?;
    let mut users: Vec<User> = store
        .accounts
        .values()
        .map(|a| a.user.clone())
        .filter(|u| matches_user(u, &query))
        .collect();
    users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let (users, pagination) = paginate(&users, query.page, query.per_page);
    Ok(Json(json!({ "users": users, "pagination": pagination })))
}

pub async fn get_user(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> SandboxResult<Json<User>> {
    let store = state.store().await;
    store.authenticate_admin(&headers)?;
    Ok(Json(store.account(user_id)?.user.clone()))
}

fn apply_user_fields(user: &mut User, body: &Value) {
    if let Some(first_name) = str_field(body, "first_name") {
        user.first_name = first_name;
    }
    if let Some(last_name) = str_field(body, "last_name") {
        user.last_name = last_name;
    }
    if body.get("phone").is_some() {
        user.phone = str_field(body, "phone");
    }
    if body.get("country_code").is_some() {
        user.country_code = str_field(body, "country_code");
    }
    if let Some(role) = str_field(body, "role") {
        user.role = Role::parse(&role);
    }
    if let Some(active) = body.get("is_active").and_then(Value::as_bool) {
        user.is_active = active;
    }
    if let Some(verified) = body.get("is_verified").and_then(Value::as_bool) {
        user.is_verified = verified;
    }
}

pub async fn create_user(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> SandboxResult<(StatusCode, Json<Value>)> {
    require_fields(&body, &["email", "password", "first_name", "last_name", "role"])?;
    let email = str_field(&body, "email").unwrap_or_default().to_lowercase();
    if !email.contains('@') {
        return Err(SandboxError::bad_request(format!("Invalid email: {}", email)));
    }
    let password = str_field(&body, "password").unwrap_or_default();
    check_password(&password)?;

    let mut store = state.store().await;
    let admin = store.authenticate_admin(&headers)?;
    if store.account_by_email(&email).is_some() {
        return Err(SandboxError::bad_request("User already exists"));
    }

    let id = store.next_id();
    let mut user = User {
        id,
        email,
        first_name: String::new(),
        last_name: String::new(),
        phone: None,
        country_code: None,
        date_of_birth: None,
        role: Role::Trader,
        kyc_status: KycStatus::NotSubmitted,
        is_active: true,
        is_verified: false,
        two_factor_enabled: false,
        created_at: Some(Utc::now()),
        last_login_at: None,
    };
    apply_user_fields(&mut user, &body);
    store.accounts.insert(
        id,
        Account {
            user: user.clone(),
            password,
            totp_secret: None,
            referred_by: None,
            verification_token: None,
        },
    );
    info!("Admin {} created user {} ({})", admin.id, id, user.role.as_str());

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully", "user": user })),
    ))
}

pub async fn update_user(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    store.authenticate_admin(&headers)?;
    let account = store.account_mut(user_id)?;
    apply_user_fields(&mut account.user, &body);
    if let Some(raw) = str_field(&body, "kyc_status") {
        account.user.kyc_status = match raw.as_str() {
            "not_submitted" => KycStatus::NotSubmitted,
            "pending" => KycStatus::Pending,
            "approved" => KycStatus::Approved,
            "rejected" => KycStatus::Rejected,
            other => {
                return Err(SandboxError::bad_request(format!("Invalid kyc_status: {}", other)))
            }
        };
    }
    Ok(Json(json!({ "message": "User updated successfully", "user": account.user })))
}

/// Soft delete: the account is deactivated and its sessions dropped.
pub async fn delete_user(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    let admin = store.authenticate_admin(&headers)?;
    if admin.id == user_id {
        return Err(SandboxError::bad_request("Cannot delete yourself"));
    }
    store.account_mut(user_id)?.user.is_active = false;
    store.access_tokens.retain(|_, owner| *owner != user_id);
    store.refresh_tokens.retain(|_, owner| *owner != user_id);
    warn!("Admin {} deactivated user {}", admin.id, user_id);
    Ok(Json(json!({ "message": "User deleted successfully" })))
}

pub async fn toggle_status(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    let admin = store.authenticate_admin(&headers)?;
    if admin.id == user_id {
        return Err(SandboxError::bad_request("Cannot change your own status"));
    }
    let account = store.account_mut(user_id)?;
    account.user.is_active = !account.user.is_active;
    let user = account.user.clone();
    info!("User {} is now {}", user_id, if user.is_active { "active" } else { "inactive" });
    Ok(Json(json!({ "message": "User status updated", "user": user })))
}

fn completed_total<'a>(payments: impl Iterator<Item = &'a Payment>) -> f64 {
    payments
        .filter(|p| p.status == PaymentStatus::Completed)
        .map(|p| p.amount)
        .sum()
}

pub async fn dashboard_stats(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> SandboxResult<Json<AdminDashboardStats>> {
    let store = state.store().await;
    store.authenticate_admin(&headers)?;

    let users: Vec<&User> = store.accounts.values().map(|a| &a.user).collect();
    let total_users = users.len() as u64;
    let active = users.iter().filter(|u| u.is_active).count() as u64;
    let user_counts = UserCounts {
        total: total_users,
        active,
        pending_kyc: users.iter().filter(|u| u.kyc_status == KycStatus::Pending).count() as u64,
        suspended: total_users - active,
    };

    let month_ago = Utc::now() - Duration::days(30);
    let total = completed_total(store.payments.iter());
    let monthly = completed_total(
        store
            .payments
            .iter()
            .filter(|p| p.created_at.is_some_and(|at| at >= month_ago)),
    );
    let revenue = RevenueSummary {
        total,
        monthly,
        average_per_user: if total_users > 0 { total / total_users as f64 } else { 0.0 },
    };

    let count_challenges = |status: ChallengeStatus| {
        store.challenges.values().filter(|c| c.status == status).count() as u64
    };
    let challenges = ChallengeCounts {
        total: store.challenges.len() as u64,
        active: count_challenges(ChallengeStatus::Active),
        completed: count_challenges(ChallengeStatus::Completed),
        failed: count_challenges(ChallengeStatus::Failed),
        funded: count_challenges(ChallengeStatus::Funded),
    };

    let mut recent_users: Vec<&User> = users.clone();
    recent_users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let recent_users = recent_users
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|u| RecentUser {
            id: u.id,
            name: u.full_name(),
            email: u.email.clone(),
            role: u.role,
            status: if u.is_active { "active" } else { "inactive" }.to_string(),
            created_at: u.created_at,
        })
        .collect();

    let mut recent_payments: Vec<&Payment> = store.payments.iter().collect();
    recent_payments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let recent_payments = recent_payments
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|p| RecentPayment {
            id: p.id,
            user_id: p.user_id,
            amount: p.amount,
            kind: Some("challenge_purchase".to_string()),
            status: p.status,
            created_at: p.created_at,
        })
        .collect();

    Ok(Json(AdminDashboardStats {
        users: user_counts,
        revenue,
        challenges,
        recent_users,
        recent_payments,
    }))
}

pub async fn get_settings(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> SandboxResult<Json<Value>> {
    let store = state.store().await;
    store.authenticate_admin(&headers)?;
    Ok(Json(store.settings.clone()))
}

/// Shallow merge of the posted keys into the settings document.
pub async fn update_settings(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let Value::Object(patch) = body else {
        return Err(SandboxError::bad_request("Settings must be a JSON object"));
    };
    let mut store = state.store().await;
    let admin = store.authenticate_admin(&headers)?;
    if !store.settings.is_object() {
        store.settings = json!({});
    }
    if let Value::Object(settings) = &mut store.settings {
        for (key, value) in patch {
            settings.insert(key, value);
        }
    }
    info!("Admin {} updated platform settings", admin.id);
    Ok(Json(store.settings.clone()))
}

pub async fn list_payments(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Query(query): Query<PaymentListQuery>,
) -> SandboxResult<Json<Value>> {
    let store = state.store().await;
    store.authenticate_admin(&headers)?;
    let status = query.status.as_deref().filter(|s| !s.is_empty());
    let mut payments: Vec<Payment> = store
        .payments
        .iter()
        .filter(|p| status.map_or(true, |s| p.status.as_str() == s))
        .cloned()
        .collect();
    payments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    let (payments, pagination) = paginate(&payments, query.page, query.per_page);
    Ok(Json(json!({ "payments": payments, "pagination": pagination })))
}

pub async fn pending_kyc(
    State(state): State<SandboxState>,
    headers: HeaderMap,
) -> SandboxResult<Json<Value>> {
    let store = state.store().await;
    store.authenticate_admin(&headers)?;
    let pending: Vec<_> = store
        .kyc
        .values()
        .filter(|k| k.status == KycStatus::Pending)
        .collect();
    Ok(Json(json!({ "pending_kyc": pending })))
}

fn ensure_pending(state: KycStatus) -> SandboxResult<()> {
    if state != KycStatus::Pending {
        return Err(SandboxError::bad_request("KYC is not pending"));
    }
    Ok(())
}

pub async fn approve_kyc(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    let admin = store.authenticate_admin(&headers)?;
    let account = store.account_mut(user_id)?;
    ensure_pending(account.user.kyc_status)?;
    account.user.kyc_status = KycStatus::Approved;
    if let Some(submission) = store.kyc.get_mut(&user_id) {
        submission.status = KycStatus::Approved;
        submission.rejection_reason = None;
    }
    info!("Admin {} approved KYC of user {}", admin.id, user_id);
    Ok(Json(json!({ "message": "KYC approved successfully" })))
}

pub async fn reject_kyc(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
    Json(body): Json<Value>,
) -> SandboxResult<Json<Value>> {
    let mut store = state.store().await;
    let admin = store.authenticate_admin(&headers)?;
    let account = store.account_mut(user_id)?;
    ensure_pending(account.user.kyc_status)?;
    let reason = str_field(&body, "reason")
        .ok_or_else(|| SandboxError::bad_request("Rejection reason is required"))?;
    account.user.kyc_status = KycStatus::Rejected;
    if let Some(submission) = store.kyc.get_mut(&user_id) {
        submission.status = KycStatus::Rejected;
        submission.rejection_reason = Some(reason.clone());
    }
    info!("Admin {} rejected KYC of user {}: {}", admin.id, user_id, reason);
    Ok(Json(json!({ "message": "KYC rejected successfully" })))
}
