use axum::extract::{Multipart, State};
use axum::http::HeaderMap;
use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};
use shared::{KycStatus, KycSubmission};
use tracing::info;
use uuid::Uuid;

use crate::error::{SandboxError, SandboxResult};
use crate::store::SandboxState;

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "pdf"];
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Parts of a multipart upload the sandbox cares about.
#[derive(Debug, Default)]
struct UploadForm {
    file_name: Option<String>,
    size: usize,
    fields: Vec<(String, String)>,
}

impl UploadForm {
    fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// Lowercased extension of the uploaded file, checked against the allow list.
    fn extension(&self) -> SandboxResult<String> {
        let name = self
            .file_name
            .as_deref()
            .ok_or_else(|| SandboxError::bad_request("No file provided"))?;
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();
        if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Err(SandboxError::bad_request(format!(
                "File type not allowed. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }
        Ok(ext)
    }
}

async fn read_form(mut multipart: Multipart) -> SandboxResult<UploadForm> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| SandboxError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "file" {
            form.file_name = field.file_name().map(str::to_string);
            let bytes = field
                .bytes()
                .await
                .map_err(|e| SandboxError::bad_request(format!("Failed to read file: {}", e)))?;
            if bytes.len() > MAX_UPLOAD_BYTES {
                return Err(SandboxError::bad_request("File is too large"));
            }
            form.size = bytes.len();
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| SandboxError::bad_request(format!("Invalid field {}: {}", name, e)))?;
            form.fields.push((name, value));
        }
    }
    Ok(form)
}

fn stored_url(folder: &str, owner: i64, ext: &str) -> String {
    format!("/uploads/{}/{}/{}.{}", folder, owner, Uuid::new_v4().simple(), ext)
}

pub async fn kyc(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> SandboxResult<Json<Value>> {
    let form = read_form(multipart).await?;
    let ext = form.extension()?;
    let document_type = form
        .text("document_type")
        .ok_or_else(|| SandboxError::bad_request("document_type is required"))?
        .to_lowercase();

    let mut store = state.store().await;
    let user = store.authenticate(&headers)?;
    let url = stored_url("kyc", user.id, &ext);

    let submission = store.kyc.entry(user.id).or_insert_with(|| KycSubmission {
        id: user.id,
        email: user.email.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        document_type: None,
        document_number: None,
        address: None,
        submitted_at: None,
        status: KycStatus::Pending,
        rejection_reason: None,
        kyc_id_url: None,
        kyc_address_url: None,
        kyc_selfie_url: None,
        kyc_bank_url: None,
    });
    let slot = match document_type.as_str() {
        "id" | "passport" | "id_card" | "drivers_license" => &mut submission.kyc_id_url,
        "address" | "proof_of_address" => &mut submission.kyc_address_url,
        "selfie" => &mut submission.kyc_selfie_url,
        "bank" | "bank_statement" => &mut submission.kyc_bank_url,
        other => return Err(SandboxError::bad_request(format!("Unknown document type: {}", other))),
    };
    *slot = Some(url.clone());
    if document_type != "selfie" && document_type != "bank" && document_type != "bank_statement" {
        submission.document_type = Some(document_type.clone());
    }
    submission.status = KycStatus::Pending;
    submission.rejection_reason = None;
    submission.submitted_at = Some(Utc::now());

    store.account_mut(user.id)?.user.kyc_status = KycStatus::Pending;
    info!("User {} uploaded {} KYC document ({} bytes)", user.id, document_type, form.size);

    Ok(Json(json!({ "message": "File uploaded successfully", "url": url })))
}

pub async fn profile_image(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> SandboxResult<Json<Value>> {
    let form = read_form(multipart).await?;
    let ext = form.extension()?;
    if ext == "pdf" {
        return Err(SandboxError::bad_request("Profile image must be an image"));
    }

    let user = state.store().await.authenticate(&headers)?;
    let url = stored_url("profiles", user.id, &ext);
    info!("User {} uploaded a profile image ({} bytes)", user.id, form.size);
    Ok(Json(json!({ "message": "File uploaded successfully", "url": url })))
}

pub async fn tenant_logo(
    State(state): State<SandboxState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> SandboxResult<Json<Value>> {
    let form = read_form(multipart).await?;
    let ext = form.extension()?;
    let tenant_id: i64 = form
        .text("tenant_id")
        .ok_or_else(|| SandboxError::bad_request("tenant_id is required"))?
        .trim()
        .parse()
        .map_err(|_| SandboxError::bad_request("tenant_id must be a number"))?;

    let admin = state.store().await.authenticate_admin(&headers)?;
    let url = stored_url("tenants", tenant_id, &ext);
    info!("Admin {} uploaded a logo for tenant {}", admin.id, tenant_id);
    Ok(Json(json!({ "message": "File uploaded successfully", "url": url })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(file_name: Option<&str>) -> UploadForm {
        UploadForm {
            file_name: file_name.map(str::to_string),
            size: 10,
            fields: vec![("document_type".to_string(), "passport".to_string())],
        }
    }

    #[test]
    fn extensions_are_checked_case_insensitively() {
        assert_eq!(form(Some("scan.PDF")).extension().unwrap(), "pdf");
        assert_eq!(form(Some("me.jpeg")).extension().unwrap(), "jpeg");
        assert!(form(Some("notes.txt")).extension().is_err());
        assert!(form(Some("noext")).extension().is_err());
        assert!(form(None).extension().is_err());
    }

    #[test]
    fn text_fields_skip_blanks() {
        let mut f = form(Some("a.png"));
        f.fields.push(("tenant_id".to_string(), "  ".to_string()));
        assert_eq!(f.text("document_type"), Some("passport"));
        assert_eq!(f.text("tenant_id"), None);
        assert_eq!(f.text("missing"), None);
    }
}
