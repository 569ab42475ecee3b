//! Per-employee summaries for admins and managers. JSON only.

use crate::{
    approval::RequestStatus,
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, ApiResult},
    model::{
        attendance::{Attendance, is_late},
        employee::Employee,
        leave_request::leave_days,
    },
    utils::db_utils::{FilterValue, Filters},
};
use actix_web::{HttpResponse, web};
use chrono::{Datelike, Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Deserialize, IntoParams)]
pub struct ReportQuery {
    /// Defaults to the first day of the current month
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    /// Defaults to today
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    pub employee_id: Option<i64>,
}

impl ReportQuery {
    fn window(&self, today: NaiveDate) -> ApiResult<(NaiveDate, NaiveDate)> {
        let from = self.from.unwrap_or_else(|| today.with_day(1).unwrap_or(today));
        let to = self.to.unwrap_or(today);
        if to < from {
            return Err(ApiError::bad_request("'to' cannot be before 'from'"));
        }
        Ok((from, to))
    }
}

/* =========================
Attendance
========================= */

/// One attendance row reduced to what the summary counts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DayRecord {
    pub employee_id: i64,
    pub worked_minutes: Option<i32>,
    pub late: bool,
}

impl DayRecord {
    pub fn from_attendance(row: &Attendance, office_start: NaiveTime) -> Self {
        DayRecord {
            employee_id: row.employee_id,
            worked_minutes: row.check_out.and(row.worked_minutes),
            late: is_late(row.check_in.with_timezone(&Local).time(), office_start),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct AttendanceSummary {
    pub employee_id: i64,
    pub employee_name: String,
    pub days_present: i64,
    pub late_days: i64,
    pub total_worked_minutes: i64,
    /// Over days with a check-out
    pub average_worked_minutes: i64,
    pub missing_check_out: i64,
    /// Checked-out days shorter than a standard working day
    pub short_days: i64,
}

pub fn summarize_attendance(days: &[DayRecord], standard_work_minutes: i32) -> Vec<AttendanceSummary> {
    let mut by_employee: BTreeMap<i64, AttendanceSummary> = BTreeMap::new();

    for day in days {
        let s = by_employee.entry(day.employee_id).or_insert_with(|| AttendanceSummary {
            employee_id: day.employee_id,
            ..Default::default()
        });
        s.days_present += 1;
        if day.late {
            s.late_days += 1;
        }
        match day.worked_minutes {
            Some(minutes) => {
                s.total_worked_minutes += i64::from(minutes);
                if minutes < standard_work_minutes {
                    s.short_days += 1;
                }
            }
            None => s.missing_check_out += 1,
        }
    }

    by_employee
        .into_values()
        .map(|mut s| {
            let closed = s.days_present - s.missing_check_out;
            if closed > 0 {
                s.average_worked_minutes = s.total_worked_minutes / closed;
            }
            s
        })
        .collect()
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceReport {
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    pub rows: Vec<AttendanceSummary>,
}

/* =========================
Leave
========================= */

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct LeaveReportRow {
    pub employee_id: i64,
    pub leave_type: String,
    pub status: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct LeaveSummary {
    pub employee_id: i64,
    pub employee_name: String,
    /// Approved days inside the window, keyed by leave type
    #[schema(value_type = Object)]
    pub approved_days: BTreeMap<String, i64>,
    pub total_approved_days: i64,
    pub pending: i64,
}

fn is_awaiting_decision(status: &str) -> bool {
    matches!(
        status.parse::<RequestStatus>(),
        Ok(RequestStatus::PendingTeamLead | RequestStatus::PendingManager)
    )
}

/// Leave overlapping the window counts only the days inside it.
pub fn summarize_leave(rows: &[LeaveReportRow], from: NaiveDate, to: NaiveDate) -> Vec<LeaveSummary> {
    let mut by_employee: BTreeMap<i64, LeaveSummary> = BTreeMap::new();

    for row in rows {
        let s = by_employee.entry(row.employee_id).or_insert_with(|| LeaveSummary {
            employee_id: row.employee_id,
            ..Default::default()
        });

        if is_awaiting_decision(&row.status) {
            s.pending += 1;
        } else if row.status == RequestStatus::Approved.as_ref() {
            let days = leave_days(row.start_date.max(from), row.end_date.min(to)).unwrap_or(0);
            *s.approved_days.entry(row.leave_type.clone()).or_default() += i64::from(days);
            s.total_approved_days += i64::from(days);
        }
    }

    by_employee.into_values().collect()
}

#[derive(Serialize, ToSchema)]
pub struct LeaveReport {
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    pub rows: Vec<LeaveSummary>,
}

/* =========================
Overtime
========================= */

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OvertimeReportRow {
    pub employee_id: i64,
    pub status: String,
    pub minutes: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct OvertimeSummary {
    pub employee_id: i64,
    pub employee_name: String,
    pub approved_minutes: i64,
    pub approved_sessions: i64,
    pub pending: i64,
}

pub fn summarize_overtime(rows: &[OvertimeReportRow]) -> Vec<OvertimeSummary> {
    let mut by_employee: BTreeMap<i64, OvertimeSummary> = BTreeMap::new();

    for row in rows {
        let s = by_employee.entry(row.employee_id).or_insert_with(|| OvertimeSummary {
            employee_id: row.employee_id,
            ..Default::default()
        });

        if is_awaiting_decision(&row.status) {
            s.pending += 1;
        } else if row.status == RequestStatus::Approved.as_ref() {
            s.approved_sessions += 1;
            s.approved_minutes += i64::from(row.minutes.unwrap_or(0));
        }
    }

    by_employee.into_values().collect()
}

#[derive(Serialize, ToSchema)]
pub struct OvertimeReport {
    #[schema(value_type = String, format = "date")]
    pub from: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub to: NaiveDate,
    pub rows: Vec<OvertimeSummary>,
}

/* =========================
Shared
========================= */

async fn employee_names(pool: &PgPool, ids: Vec<i64>) -> ApiResult<HashMap<i64, String>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let employees = sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await?;
    Ok(employees.iter().map(|e| (e.id, e.full_name())).collect())
}

fn date_filters(column: &str, from: NaiveDate, to: NaiveDate, employee_id: Option<i64>) -> Filters {
    let mut filters = Filters::new();
    filters
        .cmp(column, ">=", FilterValue::Date(from))
        .cmp(column, "<=", FilterValue::Date(to));
    if let Some(id) = employee_id {
        filters.eq("employee_id", FilterValue::I64(id));
    }
    filters
}

/// Attendance summary per employee
#[utoipa::path(
    get,
    path = "/api/reports/attendance",
    params(ReportQuery),
    responses(
        (status = 200, body = AttendanceReport),
        (status = 400, description = "'to' before 'from'"),
        (status = 403, description = "Manager/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn attendance_report(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    query: web::Query<ReportQuery>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;
    let (from, to) = query.window(Local::now().date_naive())?;

    let filters = date_filters("work_date", from, to, query.employee_id);
    let sql = format!("SELECT * FROM attendance{}", filters.where_sql());
    debug!(sql = %sql, "Attendance report");
    let rows = filters
        .bind_query_as(sqlx::query_as::<_, Attendance>(&sql))
        .fetch_all(pool.get_ref())
        .await?;

    let days: Vec<DayRecord> = rows
        .iter()
        .map(|row| DayRecord::from_attendance(row, config.office_start))
        .collect();
    let mut summary = summarize_attendance(&days, config.standard_work_minutes);

    let names = employee_names(pool.get_ref(), summary.iter().map(|s| s.employee_id).collect()).await?;
    for s in &mut summary {
        s.employee_name = names.get(&s.employee_id).cloned().unwrap_or_default();
    }

    Ok(HttpResponse::Ok().json(AttendanceReport { from, to, rows: summary }))
}

/// Leave summary per employee
#[utoipa::path(
    get,
    path = "/api/reports/leave",
    params(ReportQuery),
    responses((status = 200, body = LeaveReport), (status = 400), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn leave_report(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<ReportQuery>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;
    let (from, to) = query.window(Local::now().date_naive())?;

    // overlap with the window rather than containment
    let mut filters = Filters::new();
    filters
        .cmp("end_date", ">=", FilterValue::Date(from))
        .cmp("start_date", "<=", FilterValue::Date(to));
    if let Some(id) = query.employee_id {
        filters.eq("employee_id", FilterValue::I64(id));
    }
    let sql = format!(
        "SELECT employee_id, leave_type, status, start_date, end_date FROM leave_requests{}",
        filters.where_sql()
    );
    let rows = filters
        .bind_query_as(sqlx::query_as::<_, LeaveReportRow>(&sql))
        .fetch_all(pool.get_ref())
        .await?;

    let mut summary = summarize_leave(&rows, from, to);
    let names = employee_names(pool.get_ref(), summary.iter().map(|s| s.employee_id).collect()).await?;
    for s in &mut summary {
        s.employee_name = names.get(&s.employee_id).cloned().unwrap_or_default();
    }

    Ok(HttpResponse::Ok().json(LeaveReport { from, to, rows: summary }))
}

/// Overtime summary per employee
#[utoipa::path(
    get,
    path = "/api/reports/overtime",
    params(ReportQuery),
    responses((status = 200, body = OvertimeReport), (status = 400), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Reports"
)]
pub async fn overtime_report(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<ReportQuery>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;
    let (from, to) = query.window(Local::now().date_naive())?;

    let filters = date_filters("work_date", from, to, query.employee_id);
    let sql = format!(
        "SELECT employee_id, status, minutes FROM overtime_requests{}",
        filters.where_sql()
    );
    let rows = filters
        .bind_query_as(sqlx::query_as::<_, OvertimeReportRow>(&sql))
        .fetch_all(pool.get_ref())
        .await?;

    let mut summary = summarize_overtime(&rows);
    let names = employee_names(pool.get_ref(), summary.iter().map(|s| s.employee_id).collect()).await?;
    for s in &mut summary {
        s.employee_name = names.get(&s.employee_id).cloned().unwrap_or_default();
    }

    Ok(HttpResponse::Ok().json(OvertimeReport { from, to, rows: summary }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, month, day).unwrap()
    }

    fn day(employee_id: i64, worked: Option<i32>, late: bool) -> DayRecord {
        DayRecord { employee_id, worked_minutes: worked, late }
    }

    #[test]
    fn window_defaults_to_month_to_date() {
        let q = ReportQuery { from: None, to: None, employee_id: None };
        assert_eq!(q.window(d(3, 17)).unwrap(), (d(3, 1), d(3, 17)));

        let reversed = ReportQuery { from: Some(d(3, 10)), to: Some(d(3, 1)), employee_id: None };
        assert!(reversed.window(d(3, 17)).is_err());
    }

    #[test]
    fn attendance_summary_per_employee() {
        let days = [
            day(1, Some(480), false),
            day(1, Some(420), true),
            day(1, None, true),
            day(2, Some(500), false),
        ];
        let summary = summarize_attendance(&days, 480);
        assert_eq!(summary.len(), 2);

        let first = &summary[0];
        assert_eq!(first.employee_id, 1);
        assert_eq!(first.days_present, 3);
        assert_eq!(first.late_days, 2);
        assert_eq!(first.total_worked_minutes, 900);
        assert_eq!(first.average_worked_minutes, 450);
        assert_eq!(first.missing_check_out, 1);
        assert_eq!(first.short_days, 1);

        assert_eq!(summary[1].average_worked_minutes, 500);
        assert_eq!(summary[1].short_days, 0);
    }

    #[test]
    fn only_open_days_average_to_zero() {
        let summary = summarize_attendance(&[day(4, None, false)], 480);
        assert_eq!(summary[0].average_worked_minutes, 0);
        assert_eq!(summary[0].missing_check_out, 1);
    }

    fn leave(employee_id: i64, kind: &str, status: RequestStatus, start: NaiveDate, end: NaiveDate) -> LeaveReportRow {
        LeaveReportRow {
            employee_id,
            leave_type: kind.into(),
            status: status.to_string(),
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn leave_summary_clips_to_window() {
        let rows = [
            leave(1, "sick", RequestStatus::Approved, d(2, 27), d(3, 2)),
            leave(1, "annual", RequestStatus::Approved, d(3, 10), d(3, 12)),
            leave(1, "sick", RequestStatus::PendingTeamLead, d(3, 20), d(3, 20)),
            leave(1, "casual", RequestStatus::Rejected, d(3, 5), d(3, 5)),
        ];
        let summary = summarize_leave(&rows, d(3, 1), d(3, 31));
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].approved_days.get("sick"), Some(&2));
        assert_eq!(summary[0].approved_days.get("annual"), Some(&3));
        assert_eq!(summary[0].approved_days.get("casual"), None);
        assert_eq!(summary[0].total_approved_days, 5);
        assert_eq!(summary[0].pending, 1);
    }

    #[test]
    fn overtime_summary_ignores_open_and_rejected_sessions() {
        let row = |status: RequestStatus, minutes: Option<i32>| OvertimeReportRow {
            employee_id: 9,
            status: status.to_string(),
            minutes,
        };
        let rows = [
            row(RequestStatus::Approved, Some(120)),
            row(RequestStatus::Approved, Some(45)),
            row(RequestStatus::PendingManager, Some(60)),
            row(RequestStatus::InProgress, None),
            row(RequestStatus::Rejected, Some(300)),
        ];
        let summary = summarize_overtime(&rows);
        assert_eq!(
            summary,
            vec![OvertimeSummary {
                employee_id: 9,
                employee_name: String::new(),
                approved_minutes: 165,
                approved_sessions: 2,
                pending: 1,
            }]
        );
    }
}
