use serde::Deserialize;

use super::{ApiClient, ApiRequest, FormField};
use crate::error::ApiError;

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: None,
            bytes,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    fn into_field(self, name: &str) -> FormField {
        FormField::File {
            name: name.to_string(),
            file_name: self.file_name,
            mime: self.mime,
            bytes: self.bytes,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "file_url")]
    pub url: Option<String>,
}

pub struct UploadsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UploadsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub async fn kyc(&self, file: Upload, document_type: &str) -> Result<UploadReceipt, ApiError> {
        let req = ApiRequest::post("/uploads/kyc").multipart(vec![
            file.into_field("file"),
            FormField::Text {
                name: "document_type".into(),
                value: document_type.to_string(),
            },
        ]);
        self.client.send_json(req).await
    }

    pub async fn profile_image(&self, file: Upload) -> Result<UploadReceipt, ApiError> {
        let req =
            ApiRequest::post("/uploads/profile-image").multipart(vec![file.into_field("file")]);
        self.client.send_json(req).await
    }

    pub async fn tenant_logo(
        &self,
        file: Upload,
        tenant_id: i64,
    ) -> Result<UploadReceipt, ApiError> {
        let req = ApiRequest::post("/uploads/tenant-logo").multipart(vec![
            file.into_field("file"),
            FormField::Text {
                name: "tenant_id".into(),
                value: tenant_id.to_string(),
            },
        ]);
        self.client.send_json(req).await
    }
}
