use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One read access to a material (view or download).
///
/// Written fire-and-forget; rows are never updated.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "access_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// "view" or "download".
    pub action: String,

    pub material_id: i32,

    pub timestamp: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}
