use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, DatabaseConnection, Set};

use crate::entity::{access_log, activity_log};

/// Kind of read access being logged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessAction {
    View,
    Download,
}

impl AccessAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Download => "download",
        }
    }
}

/// Record a view/download in the access log.
///
/// Fire-and-forget: the write happens on a spawned task and a failure
/// is logged, never surfaced to the fetch that triggered it.
pub fn record_access(db: &DatabaseConnection, action: AccessAction, material_id: i32) {
    let db = db.clone();
    tokio::spawn(async move {
        let row = access_log::ActiveModel {
            action: Set(action.as_str().to_string()),
            material_id: Set(material_id),
            timestamp: Set(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = row.insert(&db).await {
            tracing::warn!("Failed to write access log entry: {e}");
        }
    });
}

/// Record a mutating action (upload/edit/delete) in the activity log.
///
/// Failures are logged, not propagated: the mutation has already
/// committed by the time this runs.
pub async fn record_activity<C: ConnectionTrait>(
    db: &C,
    username: &str,
    action: &str,
    target: &str,
) {
    let row = activity_log::ActiveModel {
        username: Set(username.to_string()),
        action: Set(action.to_string()),
        target: Set(target.to_string()),
        timestamp: Set(Utc::now()),
        ..Default::default()
    };
    if let Err(e) = row.insert(db).await {
        tracing::warn!("Failed to write activity log entry: {e}");
    }
}
