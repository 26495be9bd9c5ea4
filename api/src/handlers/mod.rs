use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use shared::client::IDEMPOTENCY_HEADER;
use shared::Pagination;

use crate::error::{SandboxError, SandboxResult};

pub mod admin;
pub mod agent;
pub mod auth;
pub mod payments;
pub mod profile;
pub mod programs;
pub mod uploads;

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Reject a body that lacks any of `fields`, naming every missing one.
pub(crate) fn require_fields(body: &Value, fields: &[&str]) -> SandboxResult<()> {
    let missing: Vec<&str> = fields
        .iter()
        .copied()
        .filter(|f| match body.get(*f) {
            None | Some(Value::Null) => true,
            Some(Value::String(s)) => s.trim().is_empty(),
            Some(_) => false,
        })
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SandboxError::bad_request(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

pub(crate) fn str_field(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub(crate) fn f64_field(body: &Value, key: &str) -> Option<f64> {
    body.get(key).and_then(Value::as_f64)
}

pub(crate) fn check_password(password: &str) -> SandboxResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(SandboxError::bad_request(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        )));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(SandboxError::bad_request("Password must contain at least one number"));
    }
    Ok(())
}

pub(crate) fn idempotency_key(headers: &HeaderMap) -> Option<String> {
    headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Slice out one page; pages are 1-based.
pub(crate) fn paginate<T: Clone>(
    items: &[T],
    page: Option<u32>,
    per_page: Option<u32>,
) -> (Vec<T>, Pagination) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(20).clamp(1, 100);
    let total = items.len() as u64;
    let pages = total.div_ceil(per_page as u64) as u32;
    let start = ((page - 1) * per_page) as usize;
    let rows = items
        .iter()
        .skip(start)
        .take(per_page as usize)
        .cloned()
        .collect();
    (
        rows,
        Pagination {
            page,
            per_page,
            total,
            pages,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_are_listed() {
        let body = json!({"email": "a@b.io", "password": "  "});
        let err = require_fields(&body, &["email", "password", "first_name"]).unwrap_err();
        assert_eq!(err.to_string(), "Missing required fields: password, first_name");
        assert!(require_fields(&body, &["email"]).is_ok());
    }

    #[test]
    fn password_rules() {
        assert!(check_password("short1").is_err());
        assert!(check_password("longenough").is_err());
        assert!(check_password("longenough1").is_ok());
    }

    #[test]
    fn pagination_is_one_based() {
        let items: Vec<u32> = (1..=45).collect();
        let (rows, meta) = paginate(&items, Some(3), Some(20));
        assert_eq!(rows, vec![41, 42, 43, 44, 45]);
        assert_eq!(meta.pages, 3);
        assert_eq!(meta.total, 45);

        let (rows, meta) = paginate(&items, Some(0), None);
        assert_eq!(rows.len(), 20);
        assert_eq!(meta.page, 1);

        let (rows, meta) = paginate::<u32>(&[], None, None);
        assert!(rows.is_empty());
        assert_eq!(meta.pages, 0);
    }
}
