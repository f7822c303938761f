use std::collections::BTreeMap;

use axum::{Json, extract::State};
use chrono::{Datelike, Days, NaiveDate, NaiveTime, Timelike, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::instrument;

use crate::entity::{access_log, activity_log};
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::stats::{AccessStatsResponse, ActivityBucket, ActivityStatsResponse};
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/activity",
    tag = "Statistics",
    operation_id = "activityStats",
    summary = "Activity over the trailing 24 hours",
    description = "Mutating actions (upload/edit/delete) from the last 24 hours, bucketed by \
        (day-of-month, hour). Requires `stats:view` permission.",
    responses(
        (status = 200, description = "Hourly activity buckets", body = ActivityStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn activity_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ActivityStatsResponse>, AppError> {
    auth_user.require_permission("stats:view")?;

    let cutoff = Utc::now() - chrono::Duration::days(1);
    let rows = activity_log::Entity::find()
        .filter(activity_log::Column::Timestamp.gte(cutoff))
        .order_by_asc(activity_log::Column::Timestamp)
        .all(&state.db)
        .await?;

    let mut buckets: BTreeMap<(u32, u32), ActivityBucket> = BTreeMap::new();
    for row in rows {
        let day = row.timestamp.day();
        let hour = row.timestamp.hour();
        let bucket = buckets.entry((day, hour)).or_insert_with(|| ActivityBucket {
            day,
            hour,
            count: 0,
            actions: Vec::new(),
        });
        bucket.count += 1;
        bucket.actions.push(row.action);
    }

    Ok(Json(ActivityStatsResponse {
        buckets: buckets.into_values().collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/access",
    tag = "Statistics",
    operation_id = "accessStats",
    summary = "Accesses per day over the trailing 7 days",
    description = "View/download counts for each of the last 7 calendar days (UTC), including \
        today. Days with no accesses appear with a zero. Requires `stats:view` permission.",
    responses(
        (status = 200, description = "Daily access counts", body = AccessStatsResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn access_stats(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<AccessStatsResponse>, AppError> {
    auth_user.require_permission("stats:view")?;

    let today = Utc::now().date_naive();
    let start = today
        .checked_sub_days(Days::new(6))
        .ok_or_else(|| AppError::Internal("Date underflow computing stats window".into()))?;
    let cutoff = start.and_time(NaiveTime::MIN).and_utc();

    let rows = access_log::Entity::find()
        .filter(access_log::Column::Timestamp.gte(cutoff))
        .all(&state.db)
        .await?;

    let mut counts: BTreeMap<NaiveDate, u64> = (0..7)
        .filter_map(|i| start.checked_add_days(Days::new(i)))
        .map(|d| (d, 0))
        .collect();

    for row in rows {
        if let Some(count) = counts.get_mut(&row.timestamp.date_naive()) {
            *count += 1;
        }
    }

    let labels = counts
        .keys()
        .map(|d| d.format("%Y-%m-%d").to_string())
        .collect();
    let values = counts.values().copied().collect();

    Ok(Json(AccessStatsResponse { labels, values }))
}
