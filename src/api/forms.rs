//! Request Bodies
//!
//! Application create/update go out as multipart forms (text fields plus
//! image files); everything else is JSON. Multipart bodies are assembled as
//! a plain list of [`FormPart`]s first so their contents can be inspected
//! before being handed to reqwest.

use chrono::{DateTime, NaiveDate, Utc};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::path::Path;

use super::error::{ApiError, ApiResult, ValidationErrors};
use super::models::{AppStatus, Application, ImageSet, Priority, TaskStatus};

/// An image file selected for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name).to_string();
        Self {
            file_name,
            content_type,
            bytes,
        }
    }

    /// Read an image from disk
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

fn guess_content_type(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        _ => "application/octet-stream",
    }
}

/// One field of a multipart body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, upload: ImageUpload },
}

impl FormPart {
    fn text(name: &str, value: impl Into<String>) -> Self {
        FormPart::Text {
            name: name.to_string(),
            value: value.into(),
        }
    }

    fn file(name: &str, upload: &ImageUpload) -> Self {
        FormPart::File {
            name: name.to_string(),
            upload: upload.clone(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Convert assembled parts into a reqwest multipart form
pub fn into_multipart(parts: Vec<FormPart>) -> ApiResult<Form> {
    let mut form = Form::new();
    for part in parts {
        form = match part {
            FormPart::Text { name, value } => form.text(name, value),
            FormPart::File { name, upload } => {
                let file = Part::bytes(upload.bytes)
                    .file_name(upload.file_name)
                    .mime_str(&upload.content_type)
                    .map_err(|e| ApiError::Decode(format!("invalid content type: {}", e)))?;
                form.part(name, file)
            }
        };
    }
    Ok(form)
}

/// The add/edit application form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplicationForm {
    pub name: String,
    pub description: String,
    pub bg: String,
    pub link: String,
    pub stacks: Vec<String>,
    pub on_going: bool,
    pub status: AppStatus,
    pub backend_url: String,
    pub frontend_url: String,
    pub github_url: String,
    pub small_images: Vec<ImageUpload>,
    pub large_images: Vec<ImageUpload>,
    /// Images already stored on the backend that an update keeps
    pub existing_images: ImageSet,
}

impl ApplicationForm {
    /// Prefill an edit form from a stored application
    pub fn from_application(app: &Application) -> Self {
        Self {
            name: app.name.clone(),
            description: app.description.clone(),
            bg: app.bg.clone(),
            link: app.link.clone(),
            stacks: app.stacks.clone(),
            on_going: app.on_going,
            status: app.status,
            backend_url: app.backend_url.clone(),
            frontend_url: app.frontend_url.clone(),
            github_url: app.github_url.clone(),
            small_images: Vec::new(),
            large_images: Vec::new(),
            existing_images: app.images.clone(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.name.trim().is_empty() {
            errors.add("name", "Application name is required");
        }
        errors.into_result(())
    }

    /// Multipart body for `POST /application`
    pub fn create_parts(&self, now: DateTime<Utc>) -> Vec<FormPart> {
        let mut parts = vec![
            FormPart::text("name", &self.name),
            FormPart::text("description", &self.description),
            FormPart::text("bg", &self.bg),
            FormPart::text("link", &self.link),
            FormPart::text("stacks", self.stacks.join(",")),
            FormPart::text("onGoing", self.on_going.to_string()),
            FormPart::text("status", self.status.as_str()),
            FormPart::text("backendUrl", &self.backend_url),
            FormPart::text("frontendUrl", &self.frontend_url),
            FormPart::text("githubUrl", &self.github_url),
            FormPart::text("lastChecked", now.to_rfc3339()),
            FormPart::text("uptime", "0"),
            FormPart::text("downtime", "0"),
            FormPart::text("images", ""),
        ];
        parts.extend(self.small_images.iter().map(|f| FormPart::file("smallImages", f)));
        parts.extend(self.large_images.iter().map(|f| FormPart::file("largeImages", f)));
        parts
    }

    /// Multipart body for `PUT /application/:id`
    pub fn update_parts(&self) -> ApiResult<Vec<FormPart>> {
        #[derive(Serialize)]
        struct Existing<'a> {
            small: &'a [String],
            large: &'a [String],
        }

        let existing = serde_json::to_string(&Existing {
            small: &self.existing_images.small,
            large: &self.existing_images.large,
        })?;

        let mut parts = vec![
            FormPart::text("name", &self.name),
            FormPart::text("description", &self.description),
            FormPart::text("backendUrl", &self.backend_url),
            FormPart::text("frontendUrl", &self.frontend_url),
            FormPart::text("githubUrl", &self.github_url),
            FormPart::text("stacks", self.stacks.join(", ")),
            FormPart::text("status", self.status.as_str()),
            FormPart::text("onGoing", self.on_going.to_string()),
        ];
        parts.extend(self.small_images.iter().map(|f| FormPart::file("newSmallImages", f)));
        parts.extend(self.large_images.iter().map(|f| FormPart::file("newLargeImages", f)));
        parts.push(FormPart::text("existingImages", existing));
        Ok(parts)
    }
}

/// Partial JSON update for `PUT /application/:id`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_going: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<AppStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontend_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<String>,
}

/// Body for `POST /task`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTask {
    pub app_id: String,
    pub description: String,
    pub status: TaskStatus,
    pub date_to_finish: NaiveDate,
    pub priority: Priority,
}

/// Body for `PATCH /application/:id/status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusUpdate {
    pub status: AppStatus,
}

/// Body for `DELETE /log/bulk`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkDelete<'a> {
    pub ids: &'a [String],
}
