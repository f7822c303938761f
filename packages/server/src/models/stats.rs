use serde::Serialize;

/// One (day, hour) bucket of activity from the trailing 24 hours.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityBucket {
    /// Day of month.
    #[schema(example = 14)]
    pub day: u32,
    /// Hour of day (0-23, UTC).
    #[schema(example = 9)]
    pub hour: u32,
    /// Number of activities in the bucket.
    #[schema(example = 3)]
    pub count: u64,
    /// Actions that make up the bucket, in timestamp order.
    #[schema(example = json!(["UPLOAD", "EDIT"]))]
    pub actions: Vec<String>,
}

/// Activity stats response: buckets ordered by (day, hour).
#[derive(Serialize, utoipa::ToSchema)]
pub struct ActivityStatsResponse {
    pub buckets: Vec<ActivityBucket>,
}

/// Access counts for the trailing 7 days, oldest day first.
///
/// `labels[i]` is a `YYYY-MM-DD` date and `values[i]` the number of
/// view/download accesses logged that day.
#[derive(Serialize, utoipa::ToSchema)]
pub struct AccessStatsResponse {
    #[schema(example = json!(["2026-07-31", "2026-08-01"]))]
    pub labels: Vec<String>,
    #[schema(example = json!([4, 11]))]
    pub values: Vec<u64>,
}
