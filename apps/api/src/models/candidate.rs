use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CandidateRow {
    pub id: i64,
    pub full_name: String,
    pub email: Option<String>,
    pub position: String,
    pub resume_path: Option<String>,
    pub exam_date: Option<NaiveDate>,
    pub exam_time: Option<NaiveTime>,
    /// Why no notification was attempted, when that is the case.
    pub notification_note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values for a create-or-update of a candidate row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCandidate {
    pub full_name: String,
    pub email: Option<String>,
    pub position: String,
    pub resume_path: Option<String>,
    pub notification_note: Option<String>,
}
