use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::approval::{ApprovalRecord, ApprovalTrail, RequestKind};

/// Daily work summary sent to the team lead for review.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct WorkSubmission {
    pub id: i64,
    pub employee_id: i64,
    #[schema(example = "2026-02-10", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = "Finished the leave report endpoint")]
    pub summary: String,
    #[schema(example = 7.5)]
    pub hours: f64,
    pub status: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub trail: ApprovalTrail,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl ApprovalRecord for WorkSubmission {
    const KIND: RequestKind = RequestKind::WorkSubmission;
}
