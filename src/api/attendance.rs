use crate::{
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, ApiResult, is_unique_violation},
    model::attendance::{Attendance, TodayStatus, worked_minutes},
    utils::{
        attendance_cache::AttendanceCache,
        db_utils::{FilterValue, Filters, paginate},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CheckOutReq {
    /// What was worked on today
    #[schema(example = "Fixed leave overlap validation; reviewed two PRs")]
    pub work_summary: Option<String>,
}

#[derive(Deserialize, IntoParams)]
pub struct AttendanceQuery {
    /// Only for the manager view
    pub employee_id: Option<i64>,
    #[param(value_type = Option<String>, format = Date)]
    pub from: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Serialize, ToSchema)]
pub struct AttendanceListResponse {
    pub data: Vec<Attendance>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn fetch_day(pool: &PgPool, employee_id: i64, date: NaiveDate) -> Result<Option<Attendance>, sqlx::Error> {
    sqlx::query_as::<_, Attendance>(
        "SELECT * FROM attendance WHERE employee_id = $1 AND work_date = $2",
    )
    .bind(employee_id)
    .bind(date)
    .fetch_optional(pool)
    .await
}

/// Check-in endpoint
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    responses(
        (status = 200, description = "Checked in", body = TodayStatus),
        (status = 400, description = "Already checked in today", body = Object, example = json!({
            "error": "Bad Request",
            "details": "Already checked in today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Login has no employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    cache: web::Data<AttendanceCache>,
) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let work_date = today();

    let result = sqlx::query_as::<_, Attendance>(
        r#"
        INSERT INTO attendance (employee_id, work_date, check_in)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(employee_id)
    .bind(work_date)
    .bind(Utc::now())
    .fetch_one(pool.get_ref())
    .await;

    let row = match result {
        Ok(row) => row,
        Err(e) if is_unique_violation(&e) => {
            // our copy may be stale; next read goes to the database
            cache.invalidate(employee_id, work_date).await;
            return Err(ApiError::bad_request("Already checked in today"));
        }
        Err(e) => {
            error!(error = %e, employee_id, "Check-in failed");
            return Err(e.into());
        }
    };

    let status = TodayStatus::from_row(work_date, Some(&row), config.office_start);
    cache.put(employee_id, status.clone()).await;

    info!(employee_id, late = status.late, "Checked in");
    Ok(HttpResponse::Ok().json(status))
}

/// Check-out endpoint
#[utoipa::path(
    put,
    path = "/api/attendance/check-out",
    request_body(content = CheckOutReq, description = "Optional work summary"),
    responses(
        (status = 200, description = "Checked out", body = TodayStatus),
        (status = 400, description = "No open check-in found for today", body = Object, example = json!({
            "error": "Bad Request",
            "details": "No open check-in found for today"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Login has no employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    cache: web::Data<AttendanceCache>,
    body: Option<web::Json<CheckOutReq>>,
) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let work_date = today();

    let open = fetch_day(pool.get_ref(), employee_id, work_date)
        .await?
        .filter(|row| row.check_out.is_none())
        .ok_or_else(|| ApiError::bad_request("No open check-in found for today"))?;

    let now = Utc::now();
    let minutes = worked_minutes(open.check_in, now);
    let summary = body
        .and_then(|b| b.into_inner().work_summary)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let closed = sqlx::query_as::<_, Attendance>(
        r#"
        UPDATE attendance
        SET check_out = $1,
            worked_minutes = $2,
            work_summary = COALESCE($3, work_summary)
        WHERE id = $4
        AND check_out IS NULL
        RETURNING *
        "#,
    )
    .bind(now)
    .bind(minutes)
    .bind(summary)
    .bind(open.id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Check-out failed");
        ApiError::from(e)
    })?
    .ok_or_else(|| ApiError::bad_request("No open check-in found for today"))?;

    let status = TodayStatus::from_row(work_date, Some(&closed), config.office_start);
    cache.put(employee_id, status.clone()).await;

    info!(employee_id, worked_minutes = minutes, "Checked out");
    Ok(HttpResponse::Ok().json(status))
}

/// Today's check-in state, the value clients reconcile their local copy against
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Current daily state", body = TodayStatus),
        (status = 403, description = "Login has no employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today_status(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    cache: web::Data<AttendanceCache>,
) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let work_date = today();

    if let Some(status) = cache.get(employee_id, work_date).await {
        return Ok(HttpResponse::Ok().json(status));
    }

    let row = fetch_day(pool.get_ref(), employee_id, work_date).await?;
    let status = TodayStatus::from_row(work_date, row.as_ref(), config.office_start);
    cache.put(employee_id, status.clone()).await;

    Ok(HttpResponse::Ok().json(status))
}

async fn list_rows(pool: &PgPool, employee_id: Option<i64>, query: &AttendanceQuery) -> ApiResult<AttendanceListResponse> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if to < from {
            return Err(ApiError::bad_request("'to' cannot be before 'from'"));
        }
    }

    let (page, per_page, offset) = paginate(query.page, query.per_page, 31);

    let mut filters = Filters::new();
    if let Some(id) = employee_id {
        filters.eq("employee_id", FilterValue::I64(id));
    }
    if let Some(from) = query.from {
        filters.cmp("work_date", ">=", FilterValue::Date(from));
    }
    if let Some(to) = query.to {
        filters.cmp("work_date", "<=", FilterValue::Date(to));
    }
    let where_sql = filters.where_sql();

    let total = filters
        .bind_scalar(sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM attendance{where_sql}"
        )))
        .fetch_one(pool)
        .await?;

    let n = filters.next_placeholder();
    let data_sql = format!(
        "SELECT * FROM attendance{where_sql} ORDER BY work_date DESC, employee_id LIMIT ${} OFFSET ${}",
        n,
        n + 1
    );
    let data = filters
        .bind_query_as(sqlx::query_as::<_, Attendance>(&data_sql))
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(pool)
        .await?;

    Ok(AttendanceListResponse {
        data,
        page,
        per_page,
        total,
    })
}

/// The caller's own attendance history
#[utoipa::path(
    get,
    path = "/api/attendance/history",
    params(AttendanceQuery),
    responses((status = 200, body = AttendanceListResponse), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn my_history(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<AttendanceQuery>,
) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let list = list_rows(pool.get_ref(), Some(employee_id), &query).await?;
    Ok(HttpResponse::Ok().json(list))
}

/// Attendance of everyone, or one employee (Manager/Admin)
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses((status = 200, body = AttendanceListResponse), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn list_attendance(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<AttendanceQuery>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;
    let list = list_rows(pool.get_ref(), query.employee_id, &query).await?;
    Ok(HttpResponse::Ok().json(list))
}
