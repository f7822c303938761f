use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One mutating action performed through the API (upload, edit, delete).
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub username: String,

    /// "UPLOAD", "EDIT", or "DELETE".
    pub action: String,

    /// Human-readable target description (usually a filename).
    pub target: String,

    pub timestamp: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
