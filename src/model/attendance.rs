use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: i64,
    pub employee_id: i64,
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    #[schema(value_type = String, format = "date-time")]
    pub check_in: DateTime<Utc>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    pub worked_minutes: Option<i32>,
    pub work_summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DailyState {
    NotCheckedIn,
    CheckedIn,
    CheckedOut,
}

/// Authoritative view of one employee's day; clients reconcile their local copy against it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TodayStatus {
    pub state: DailyState,
    #[schema(value_type = String, format = "date")]
    pub work_date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    pub worked_minutes: Option<i32>,
    pub late: bool,
}

impl TodayStatus {
    pub fn from_row(work_date: NaiveDate, row: Option<&Attendance>, office_start: NaiveTime) -> Self {
        match row {
            None => TodayStatus {
                state: DailyState::NotCheckedIn,
                work_date,
                check_in: None,
                check_out: None,
                worked_minutes: None,
                late: false,
            },
            Some(row) => TodayStatus {
                state: if row.check_out.is_some() {
                    DailyState::CheckedOut
                } else {
                    DailyState::CheckedIn
                },
                work_date,
                check_in: Some(row.check_in),
                check_out: row.check_out,
                worked_minutes: row.worked_minutes,
                late: is_late(row.check_in.with_timezone(&Local).time(), office_start),
            },
        }
    }
}

/// Whole minutes between check-in and check-out, clamped at zero.
pub fn worked_minutes(check_in: DateTime<Utc>, check_out: DateTime<Utc>) -> i32 {
    let minutes = (check_out - check_in).num_minutes().max(0);
    i32::try_from(minutes).unwrap_or(i32::MAX)
}

pub fn is_late(local_check_in: NaiveTime, office_start: NaiveTime) -> bool {
    local_check_in > office_start
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
    }

    fn hm(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn worked_minutes_counts_whole_minutes() {
        assert_eq!(worked_minutes(at(9, 0), at(17, 30)), 510);
    }

    #[test]
    fn worked_minutes_never_negative() {
        assert_eq!(worked_minutes(at(17, 0), at(9, 0)), 0);
    }

    #[test]
    fn late_only_strictly_after_office_start() {
        assert!(!is_late(hm(9, 30), hm(9, 30)));
        assert!(is_late(hm(9, 31), hm(9, 30)));
        assert!(!is_late(hm(8, 55), hm(9, 30)));
    }

    #[test]
    fn status_without_row_is_not_checked_in() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let status = TodayStatus::from_row(date, None, hm(9, 30));
        assert_eq!(status.state, DailyState::NotCheckedIn);
        assert!(status.check_in.is_none());
        assert!(!status.late);
    }

    #[test]
    fn status_follows_check_out_column() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let mut row = Attendance {
            id: 1,
            employee_id: 7,
            work_date: date,
            check_in: at(9, 0),
            check_out: None,
            worked_minutes: None,
            work_summary: None,
        };
        let open = TodayStatus::from_row(date, Some(&row), hm(23, 59));
        assert_eq!(open.state, DailyState::CheckedIn);

        row.check_out = Some(at(17, 0));
        row.worked_minutes = Some(480);
        let closed = TodayStatus::from_row(date, Some(&row), hm(23, 59));
        assert_eq!(closed.state, DailyState::CheckedOut);
        assert_eq!(closed.worked_minutes, Some(480));
    }
}
