use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::approval::{ApprovalRecord, ApprovalTrail, RequestKind};

/// One overtime session. Live sessions stay `In Progress` until ended.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct OvertimeRequest {
    pub id: i64,
    pub employee_id: i64,
    #[schema(example = "2026-02-10", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(format = "date-time", value_type = Option<String>)]
    pub end_time: Option<DateTime<Utc>>,
    #[schema(example = 150)]
    pub minutes: Option<i32>,
    pub reason: Option<String>,
    #[schema(example = "Pending Manager Approval")]
    pub status: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub trail: ApprovalTrail,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl ApprovalRecord for OvertimeRequest {
    const KIND: RequestKind = RequestKind::Overtime;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    EndsBeforeStart,
    TooLong { minutes: i64, max: i32 },
}

/// Validated session length in minutes.
pub fn session_minutes(start: DateTime<Utc>, end: DateTime<Utc>, max: i32) -> Result<i32, SessionError> {
    let minutes = (end - start).num_minutes();
    if minutes <= 0 {
        return Err(SessionError::EndsBeforeStart);
    }
    if minutes > i64::from(max) {
        return Err(SessionError::TooLong { minutes, max });
    }
    i32::try_from(minutes).map_err(|_| SessionError::TooLong { minutes, max })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, h, m, 0).unwrap()
    }

    #[test]
    fn session_length() {
        assert_eq!(session_minutes(at(18, 0), at(20, 30), 720), Ok(150));
    }

    #[test]
    fn zero_or_negative_session_rejected() {
        assert_eq!(session_minutes(at(18, 0), at(18, 0), 720), Err(SessionError::EndsBeforeStart));
        assert_eq!(session_minutes(at(19, 0), at(18, 0), 720), Err(SessionError::EndsBeforeStart));
    }

    #[test]
    fn cap_is_inclusive() {
        assert_eq!(session_minutes(at(8, 0), at(20, 0), 720), Ok(720));
        assert_eq!(
            session_minutes(at(8, 0), at(20, 1), 720),
            Err(SessionError::TooLong { minutes: 721, max: 720 })
        );
    }
}
