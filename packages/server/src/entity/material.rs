use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "material")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub name: String,

    pub department: String,

    pub course_code: String,

    /// Hex-encoded blob handle; exclusively owned by this material.
    pub blob_handle: String,

    /// SHA-256 of the payload bytes. The unique constraint backs
    /// duplicate rejection under concurrent uploads.
    #[sea_orm(unique)]
    pub content_fingerprint: String,

    /// Original upload filename.
    pub original_filename: String,

    /// MIME content type.
    pub content_type: Option<String>,

    /// Payload size in kilobytes, fractional part preserved.
    pub size_kb: f64,

    pub uploader: String,

    pub created_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
