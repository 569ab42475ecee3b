use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumString};
use utoipa::ToSchema;

use crate::approval::{ApprovalRecord, ApprovalTrail, RequestKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, AsRefStr, ToSchema)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Casual,
    Sick,
    Annual,
    Unpaid,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct LeaveRequest {
    #[schema(example = 1)]
    pub id: i64,
    #[schema(example = 1000)]
    pub employee_id: i64,
    #[schema(example = "sick")]
    pub leave_type: String,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    /// Calendar days, both ends included
    #[schema(example = 3)]
    pub days: i32,
    pub reason: String,
    #[schema(example = "Pending Team Lead")]
    pub status: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub trail: ApprovalTrail,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl ApprovalRecord for LeaveRequest {
    const KIND: RequestKind = RequestKind::Leave;
}

/// Inclusive day count; `None` when the range is reversed.
pub fn leave_days(start: NaiveDate, end: NaiveDate) -> Option<i32> {
    if end < start {
        return None;
    }
    i32::try_from((end - start).num_days() + 1).ok()
}
