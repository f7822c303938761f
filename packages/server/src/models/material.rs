use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::material;
use crate::error::AppError;
use crate::pipeline::MaterialFields;

/// Response DTO for a single material.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MaterialResponse {
    /// Material ID.
    #[schema(example = 42)]
    pub id: i32,
    /// Display name.
    #[schema(example = "Week 3 lecture notes")]
    pub name: String,
    /// Owning department.
    #[schema(example = "CNTT")]
    pub department: String,
    /// Course code.
    #[schema(example = "CS101")]
    pub course_code: String,
    /// SHA-256 fingerprint of the payload.
    #[schema(example = "2cf24dba5fb0a30e26e83b2ac5b9e29e...")]
    pub content_fingerprint: String,
    /// Original upload filename.
    #[schema(example = "week3.pdf")]
    pub original_filename: String,
    /// MIME content type.
    #[schema(example = "application/pdf")]
    pub content_type: Option<String>,
    /// Payload size in kilobytes, fractional part preserved.
    #[schema(example = 142.5)]
    pub size_kb: f64,
    /// Username of the uploader.
    #[schema(example = "gv01")]
    pub uploader: String,
    pub created_at: DateTime<Utc>,
}

impl From<material::Model> for MaterialResponse {
    fn from(model: material::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            department: model.department,
            course_code: model.course_code,
            content_fingerprint: model.content_fingerprint,
            original_filename: model.original_filename,
            content_type: model.content_type,
            size_kb: model.size_kb,
            uploader: model.uploader,
            created_at: model.created_at,
        }
    }
}

/// Response DTO for listing materials.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MaterialListResponse {
    /// Materials, newest first.
    pub data: Vec<MaterialResponse>,
    /// Role of the caller, so clients can hide mutating controls.
    #[schema(example = "lecturer")]
    pub role: String,
}

/// Successful upload response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadMaterialResponse {
    #[schema(example = "Upload successful")]
    pub msg: String,
    /// SHA-256 fingerprint of the stored payload.
    pub fingerprint: String,
    /// ID of the new material.
    #[schema(example = 42)]
    pub id: i32,
}

/// Generic confirmation response.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ConfirmationResponse {
    #[schema(example = "Material updated")]
    pub msg: String,
}

/// Validate the three required descriptive fields of a material form.
pub fn validate_material_fields(fields: &MaterialFields) -> Result<(), AppError> {
    for (value, label) in [
        (&fields.name, "name"),
        (&fields.department, "department"),
        (&fields.course_code, "course_code"),
    ] {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(AppError::Validation(format!("Missing '{label}' field")));
        }
        if trimmed.chars().count() > 256 {
            return Err(AppError::Validation(format!(
                "Field '{label}' must be at most 256 characters"
            )));
        }
    }
    Ok(())
}
