use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::approval::{ApprovalRecord, ApprovalTrail, RequestKind};

/// Short absence within a single working day.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct PermissionRequest {
    pub id: i64,
    pub employee_id: i64,
    #[schema(example = "2026-02-10", format = "date", value_type = String)]
    pub permission_date: NaiveDate,
    #[schema(example = "14:00:00", value_type = String)]
    pub from_time: NaiveTime,
    #[schema(example = "15:30:00", value_type = String)]
    pub to_time: NaiveTime,
    #[schema(example = 90)]
    pub minutes: i32,
    pub reason: String,
    pub status: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub trail: ApprovalTrail,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl ApprovalRecord for PermissionRequest {
    const KIND: RequestKind = RequestKind::Permission;
}

/// Length of the absence in minutes; `None` unless `to` is after `from`.
pub fn permission_minutes(from: NaiveTime, to: NaiveTime) -> Option<i32> {
    if to <= from {
        return None;
    }
    i32::try_from((to - from).num_minutes()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn minutes_between_times() {
        assert_eq!(permission_minutes(hm(14, 0), hm(15, 30)), Some(90));
    }

    #[test]
    fn empty_or_reversed_window_is_none() {
        assert_eq!(permission_minutes(hm(14, 0), hm(14, 0)), None);
        assert_eq!(permission_minutes(hm(15, 0), hm(14, 0)), None);
    }
}
