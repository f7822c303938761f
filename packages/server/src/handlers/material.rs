use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::{Json, body::Body};
use common::storage::BlobHandle;
use sea_orm::{EntityTrait, QueryOrder};
use tokio_util::io::ReaderStream;
use tracing::instrument;

use crate::audit::{self, AccessAction};
use crate::entity::material;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::material::{
    ConfirmationResponse, MaterialListResponse, MaterialResponse, UploadMaterialResponse,
    validate_material_fields,
};
use crate::pipeline::{MaterialFields, MaterialPipeline, UploadedFile};
use crate::state::AppState;
use crate::utils::filename::{Disposition, validate_upload_filename};

pub fn material_upload_body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(128 * 1024 * 1024) // 128 MB
}

#[utoipa::path(
    post,
    path = "/",
    tag = "Materials",
    operation_id = "uploadMaterial",
    summary = "Upload a new course material",
    description = "Uploads a document. Multipart fields `name`, `department`, `course_code`, and \
        `file` are all required. A payload whose bytes are already stored (same SHA-256 \
        fingerprint) is rejected before anything is written.",
    request_body(content_type = "multipart/form-data", description = "Material metadata and file"),
    responses(
        (status = 201, description = "Material created", body = UploadMaterialResponse),
        (status = 400, description = "Validation error or duplicate content (VALIDATION_ERROR, DUPLICATE_CONTENT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn upload_material(
    auth_user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("material:upload")?;

    let form = read_material_form(multipart).await?;
    let fields = form.fields()?;
    validate_material_fields(&fields)?;
    let file = form
        .file
        .ok_or_else(|| AppError::Validation("Missing 'file' field".into()))?;

    let pipeline = MaterialPipeline::new(&state.db, &*state.blob_store);
    let model = pipeline.ingest(fields, file, &auth_user.username).await?;

    audit::record_activity(
        &state.db,
        &auth_user.username,
        "UPLOAD",
        &model.original_filename,
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(UploadMaterialResponse {
            msg: "Upload successful".into(),
            fingerprint: model.content_fingerprint,
            id: model.id,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/",
    tag = "Materials",
    operation_id = "listMaterials",
    summary = "List all materials, newest first",
    description = "Returns every material plus the caller's role. Any authenticated user may list.",
    responses(
        (status = 200, description = "Material list", body = MaterialListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_materials(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MaterialListResponse>, AppError> {
    let rows = material::Entity::find()
        .order_by_desc(material::Column::Id)
        .all(&state.db)
        .await?;

    Ok(Json(MaterialListResponse {
        data: rows.into_iter().map(MaterialResponse::from).collect(),
        role: auth_user.role,
    }))
}

#[utoipa::path(
    get,
    path = "/{id}/download",
    tag = "Materials",
    operation_id = "downloadMaterial",
    summary = "Download a material's file",
    description = "Streams the payload with `Content-Disposition: attachment`. No authentication \
        required. The access is recorded fire-and-forget.",
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn download_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let model = find_material(&state, id).await?;
    let response = build_blob_response(&state, &model, Disposition::Attachment).await?;
    audit::record_access(&state.db, AccessAction::Download, model.id);
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/{id}/view",
    tag = "Materials",
    operation_id = "viewMaterial",
    summary = "View a material's file inline",
    description = "Streams the payload with `Content-Disposition: inline` and an RFC 5987 \
        percent-encoded filename, so PDFs/images/video render in the browser. No authentication \
        required. The access is recorded fire-and-forget.",
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 200, description = "File content"),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state), fields(id))]
pub async fn view_material(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Response, AppError> {
    let model = find_material(&state, id).await?;
    let response = build_blob_response(&state, &model, Disposition::Inline).await?;
    audit::record_access(&state.db, AccessAction::View, model.id);
    Ok(response)
}

#[utoipa::path(
    put,
    path = "/{id}",
    tag = "Materials",
    operation_id = "updateMaterial",
    summary = "Update a material",
    description = "Replaces the descriptive fields (`name`, `department`, `course_code` — all \
        required) and, when a `file` part is present, the backing blob. The new blob is stored \
        before the old one is retired.",
    params(("id" = i32, Path, description = "Material ID")),
    request_body(content_type = "multipart/form-data", description = "New metadata and optional file"),
    responses(
        (status = 200, description = "Material updated", body = ConfirmationResponse),
        (status = 400, description = "Validation error or duplicate content (VALIDATION_ERROR, DUPLICATE_CONTENT)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart), fields(id))]
pub async fn update_material(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> Result<Json<ConfirmationResponse>, AppError> {
    auth_user.require_permission("material:edit")?;

    let form = read_material_form(multipart).await?;
    let fields = form.fields()?;
    validate_material_fields(&fields)?;

    let pipeline = MaterialPipeline::new(&state.db, &*state.blob_store);
    let model = pipeline.replace(id, fields, form.file).await?;

    audit::record_activity(
        &state.db,
        &auth_user.username,
        "EDIT",
        &model.original_filename,
    )
    .await;

    Ok(Json(ConfirmationResponse {
        msg: "Material updated".into(),
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}",
    tag = "Materials",
    operation_id = "deleteMaterial",
    summary = "Delete a material",
    description = "Deletes the blob, then the catalog record. A blob-store failure aborts the \
        operation and leaves the record intact.",
    params(("id" = i32, Path, description = "Material ID")),
    responses(
        (status = 204, description = "Material deleted"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Material not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(id))]
pub async fn delete_material(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission("material:delete")?;

    let pipeline = MaterialPipeline::new(&state.db, &*state.blob_store);
    let removed = pipeline.delete(id).await?;

    audit::record_activity(
        &state.db,
        &auth_user.username,
        "DELETE",
        &removed.original_filename,
    )
    .await;

    Ok(StatusCode::NO_CONTENT)
}

/// Fields collected from a material multipart form.
struct MaterialForm {
    name: Option<String>,
    department: Option<String>,
    course_code: Option<String>,
    file: Option<UploadedFile>,
}

impl MaterialForm {
    /// Require the three descriptive fields.
    fn fields(&self) -> Result<MaterialFields, AppError> {
        let require = |value: &Option<String>, label: &str| {
            value
                .clone()
                .ok_or_else(|| AppError::Validation(format!("Missing '{label}' field")))
        };
        Ok(MaterialFields {
            name: require(&self.name, "name")?,
            department: require(&self.department, "department")?,
            course_code: require(&self.course_code, "course_code")?,
        })
    }
}

/// Drain a material multipart form.
///
/// The file part is buffered in memory: the fingerprint is computed
/// over the whole payload before anything is written to the store.
async fn read_material_form(mut multipart: Multipart) -> Result<MaterialForm, AppError> {
    let mut form = MaterialForm {
        name: None,
        department: None,
        course_code: None,
        file: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        match field.name() {
            Some("name") => form.name = Some(read_text(field, "name").await?),
            Some("department") => form.department = Some(read_text(field, "department").await?),
            Some("course_code") => form.course_code = Some(read_text(field, "course_code").await?),
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|s| s.to_string())
                    .ok_or_else(|| AppError::Validation("File field must have a filename".into()))?;
                let filename = validate_upload_filename(&filename)
                    .map_err(|e| AppError::Validation(e.message().into()))?
                    .to_string();

                let content_type = field.content_type().map(|m| m.to_string()).or_else(|| {
                    mime_guess::from_path(&filename).first().map(|m| m.to_string())
                });

                let payload = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Upload read error: {e}")))?
                    .to_vec();

                form.file = Some(UploadedFile {
                    filename,
                    content_type,
                    payload,
                });
            }
            _ => {} // Ignore unknown fields.
        }
    }

    Ok(form)
}

async fn read_text(
    field: axum::extract::multipart::Field<'_>,
    label: &str,
) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read '{label}': {e}")))
}

async fn find_material(state: &AppState, id: i32) -> Result<material::Model, AppError> {
    material::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Material not found".into()))
}

/// Build a streaming response for a material's blob.
async fn build_blob_response(
    state: &AppState,
    model: &material::Model,
    disposition: Disposition,
) -> Result<Response, AppError> {
    let handle = BlobHandle::from_hex(&model.blob_handle)?;
    let reader = state.blob_store.get_stream(&handle).await?;
    let stream = ReaderStream::new(reader);
    let body = Body::from_stream(stream);

    let content_type = model
        .content_type
        .as_deref()
        .unwrap_or("application/octet-stream");

    // size_kb is an integer byte count divided by 1024, so this is exact.
    let content_length = (model.size_kb * 1024.0).round() as u64;

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, content_length.to_string())
        .header(
            header::CONTENT_DISPOSITION,
            disposition.header_value(&model.original_filename),
        )
        .body(body)
        .map_err(|e| AppError::Internal(format!("Failed to build response: {e}")))?;

    Ok(response)
}
