use common::storage::{BlobHandle, BlobStore, Fingerprint};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, SqlErr,
};

use crate::entity::material;
use crate::error::AppError;

/// Descriptive fields shared by ingestion and replacement.
#[derive(Debug, Clone)]
pub struct MaterialFields {
    pub name: String,
    pub department: String,
    pub course_code: String,
}

/// An uploaded payload together with its upload metadata.
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub payload: Vec<u8>,
}

/// The ingestion/replacement/deletion pipelines over one catalog
/// connection and one blob store.
///
/// Both collaborators are injected; the pipeline holds no global state
/// and performs no cross-store transactions. Write ordering is the
/// only consistency mechanism:
///
/// * ingest: fingerprint, duplicate check, blob write, catalog insert;
/// * replace: new blob first, catalog swap, old blob delete last;
/// * delete: blob first, catalog row second.
pub struct MaterialPipeline<'a, C: ConnectionTrait> {
    db: &'a C,
    store: &'a dyn BlobStore,
}

impl<'a, C: ConnectionTrait> MaterialPipeline<'a, C> {
    pub fn new(db: &'a C, store: &'a dyn BlobStore) -> Self {
        Self { db, store }
    }

    /// Ingest a new material.
    ///
    /// Duplicate payloads are rejected before any store mutation. The
    /// check races with concurrent ingestions of the same payload; the
    /// unique constraint on the fingerprint column settles the race,
    /// and the loser retires its freshly written blob.
    pub async fn ingest(
        &self,
        fields: MaterialFields,
        file: UploadedFile,
        uploader: &str,
    ) -> Result<material::Model, AppError> {
        let fingerprint = Fingerprint::compute(&file.payload);

        if self.find_by_fingerprint(&fingerprint).await?.is_some() {
            return Err(AppError::Duplicate(fingerprint.to_hex()));
        }

        let handle = self.store.put(&file.payload).await?;
        let size_kb = file.payload.len() as f64 / 1024.0;

        let row = material::ActiveModel {
            name: Set(fields.name),
            department: Set(fields.department),
            course_code: Set(fields.course_code),
            blob_handle: Set(handle.to_hex()),
            content_fingerprint: Set(fingerprint.to_hex()),
            original_filename: Set(file.filename),
            content_type: Set(file.content_type),
            size_kb: Set(size_kb),
            uploader: Set(uploader.to_string()),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        };

        match row.insert(self.db).await {
            Ok(model) => Ok(model),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                tracing::debug!("Concurrent ingest of identical payload lost the insert race");
                self.retire_blob(&handle).await;
                Err(AppError::Duplicate(fingerprint.to_hex()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Replace a material's descriptive fields and, optionally, its
    /// backing blob.
    ///
    /// The new blob is stored before the catalog row is touched and the
    /// old blob is deleted only after the swap commits, so a failure at
    /// any step leaves the material pointing at an intact blob.
    pub async fn replace(
        &self,
        id: i32,
        fields: MaterialFields,
        new_file: Option<UploadedFile>,
    ) -> Result<material::Model, AppError> {
        let existing = self.find_by_id(id).await?;
        let old_handle_hex = existing.blob_handle.clone();

        let mut active: material::ActiveModel = existing.into();
        active.name = Set(fields.name);
        active.course_code = Set(fields.course_code);
        active.department = Set(fields.department);

        let mut staged: Option<(BlobHandle, Fingerprint)> = None;
        if let Some(file) = new_file {
            let fingerprint = Fingerprint::compute(&file.payload);
            if let Some(other) = self.find_by_fingerprint(&fingerprint).await?
                && other.id != id
            {
                return Err(AppError::Duplicate(fingerprint.to_hex()));
            }

            let handle = self.store.put(&file.payload).await?;
            active.blob_handle = Set(handle.to_hex());
            active.content_fingerprint = Set(fingerprint.to_hex());
            active.original_filename = Set(file.filename);
            active.content_type = Set(file.content_type);
            active.size_kb = Set(file.payload.len() as f64 / 1024.0);
            staged = Some((handle, fingerprint));
        }

        let model = match active.update(self.db).await {
            Ok(model) => model,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // Another material claimed this fingerprint between the
                // check and the update. Retire the staged blob.
                if let Some((handle, fingerprint)) = staged {
                    self.retire_blob(&handle).await;
                    return Err(AppError::Duplicate(fingerprint.to_hex()));
                }
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };

        // The swap has committed; problems retiring the old blob leave
        // an orphan, never a dangling reference.
        if staged.is_some() {
            match BlobHandle::from_hex(&old_handle_hex) {
                Ok(old_handle) => {
                    if let Err(e) = self.store.delete(&old_handle).await {
                        tracing::warn!("Failed to delete replaced blob {old_handle}: {e}");
                    }
                }
                Err(e) => tracing::warn!("Replaced blob handle is malformed: {e}"),
            }
        }

        Ok(model)
    }

    /// Delete a material and its blob.
    ///
    /// The catalog row is removed only after the blob is gone (or
    /// confirmed already absent); a store failure aborts the whole
    /// operation and leaves the record in place.
    pub async fn delete(&self, id: i32) -> Result<material::Model, AppError> {
        let existing = self.find_by_id(id).await?;

        let handle = BlobHandle::from_hex(&existing.blob_handle)?;
        self.store.delete(&handle).await?;

        material::Entity::delete_by_id(id).exec(self.db).await?;
        Ok(existing)
    }

    async fn find_by_id(&self, id: i32) -> Result<material::Model, AppError> {
        material::Entity::find_by_id(id)
            .one(self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Material not found".into()))
    }

    async fn find_by_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> Result<Option<material::Model>, AppError> {
        Ok(material::Entity::find()
            .filter(material::Column::ContentFingerprint.eq(fingerprint.to_hex()))
            .one(self.db)
            .await?)
    }

    /// Best-effort removal of a blob that lost its catalog row.
    async fn retire_blob(&self, handle: &BlobHandle) {
        if let Err(e) = self.store.delete(handle).await {
            tracing::warn!("Failed to clean up orphaned blob {handle}: {e}");
        }
    }
}
