use crate::{
    api::requests,
    approval::{RequestStatus, submission_status},
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, ApiResult, is_unique_violation},
    model::overtime_request::{OvertimeRequest, SessionError, session_minutes},
};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct EndOvertime {
    #[schema(example = "Release hotfix")]
    pub reason: String,
}

/// Overtime worked without a live session, entered afterwards
#[derive(Deserialize, ToSchema)]
pub struct ManualOvertime {
    #[schema(example = "2026-02-10", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = "2026-02-10T18:00:00Z", format = "date-time", value_type = String)]
    pub start_time: DateTime<Utc>,
    #[schema(example = "2026-02-10T20:30:00Z", format = "date-time", value_type = String)]
    pub end_time: DateTime<Utc>,
    pub reason: String,
}

fn session_error(err: SessionError) -> ApiError {
    match err {
        SessionError::EndsBeforeStart => ApiError::bad_request("end_time must be after start_time"),
        SessionError::TooLong { minutes, max } => ApiError::bad_request(format!(
            "Overtime session of {minutes} minutes exceeds the {max} minute limit"
        )),
    }
}

fn require_reason(reason: &str) -> ApiResult<&str> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ApiError::bad_request("reason is required"));
    }
    Ok(reason)
}

/// Start an overtime session
#[utoipa::path(
    post,
    path = "/api/overtime/start",
    responses(
        (status = 201, description = "Session opened", body = OvertimeRequest),
        (status = 403, description = "Login has no employee profile"),
        (status = 409, description = "A session is already open")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
pub async fn start_overtime(auth: AuthUser, pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;

    let result = sqlx::query_as::<_, OvertimeRequest>(
        r#"
        INSERT INTO overtime_requests (employee_id, work_date, start_time, status)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(employee_id)
    .bind(Local::now().date_naive())
    .bind(Utc::now())
    .bind(RequestStatus::InProgress.as_ref())
    .fetch_one(pool.get_ref())
    .await;

    let session = match result {
        Ok(row) => row,
        Err(e) if is_unique_violation(&e) => {
            return Err(ApiError::conflict("An overtime session is already in progress"));
        }
        Err(e) => {
            error!(error = %e, employee_id, "Could not open overtime session");
            return Err(e.into());
        }
    };

    info!(overtime_id = session.id, employee_id, "Overtime started");
    Ok(HttpResponse::Created().json(session))
}

/// How an open session is closed.
#[derive(Debug, PartialEq)]
enum Closing {
    Submit(i32),
    /// Past the limit: closed as `Rejected`
    Reject { minutes: i32, max: i32 },
}

fn plan_close(start: DateTime<Utc>, end: DateTime<Utc>, max: i32) -> ApiResult<Closing> {
    match session_minutes(start, end, max) {
        Ok(minutes) => Ok(Closing::Submit(minutes)),
        Err(SessionError::TooLong { minutes, max }) => Ok(Closing::Reject {
            minutes: i32::try_from(minutes).unwrap_or(i32::MAX),
            max,
        }),
        Err(SessionError::EndsBeforeStart) => Err(ApiError::bad_request(
            "Overtime session is shorter than a minute",
        )),
    }
}

/// End the open overtime session and send it for approval
#[utoipa::path(
    post,
    path = "/api/overtime/end",
    request_body = EndOvertime,
    responses(
        (status = 200, description = "Session closed and submitted", body = OvertimeRequest),
        (status = 400, description = "No open session, missing reason, under a minute, or too long (closed as Rejected)"),
        (status = 409, description = "Session was closed concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
pub async fn end_overtime(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<EndOvertime>,
) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let reason = require_reason(&payload.reason)?;

    let open = sqlx::query_as::<_, OvertimeRequest>(
        "SELECT * FROM overtime_requests WHERE employee_id = $1 AND status = $2",
    )
    .bind(employee_id)
    .bind(RequestStatus::InProgress.as_ref())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::bad_request("No overtime session in progress"))?;

    let now = Utc::now();
    let closing = plan_close(open.start_time, now, config.max_overtime_minutes)?;
    let (minutes, status) = match closing {
        Closing::Submit(minutes) => (
            minutes,
            submission_status(pool.get_ref(), auth.role, employee_id).await?,
        ),
        Closing::Reject { minutes, .. } => (minutes, RequestStatus::Rejected),
    };

    let closed = sqlx::query_as::<_, OvertimeRequest>(
        r#"
        UPDATE overtime_requests
        SET end_time = $1, minutes = $2, reason = $3, status = $4
        WHERE id = $5
        AND status = $6
        RETURNING *
        "#,
    )
    .bind(now)
    .bind(minutes)
    .bind(reason)
    .bind(status.as_ref())
    .bind(open.id)
    .bind(RequestStatus::InProgress.as_ref())
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or_else(|| ApiError::conflict("Overtime session was already closed"))?;

    if let Closing::Reject { minutes, max } = closing {
        warn!(
            overtime_id = closed.id,
            employee_id,
            minutes,
            max,
            "Overtime session over the limit closed as Rejected"
        );
        return Err(ApiError::bad_request(format!(
            "Overtime session of {minutes} minutes exceeds the {max} minute limit and was closed as Rejected"
        )));
    }

    info!(overtime_id = closed.id, employee_id, minutes, status = %status, "Overtime ended");
    Ok(HttpResponse::Ok().json(closed))
}

/// Record a past overtime session
#[utoipa::path(
    post,
    path = "/api/overtime",
    request_body = ManualOvertime,
    responses(
        (status = 201, description = "Overtime submitted", body = OvertimeRequest),
        (status = 400, description = "Invalid times or too long")
    ),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
pub async fn create_overtime(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<ManualOvertime>,
) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let reason = require_reason(&payload.reason)?;
    let minutes = session_minutes(payload.start_time, payload.end_time, config.max_overtime_minutes)
        .map_err(session_error)?;
    let status = submission_status(pool.get_ref(), auth.role, employee_id).await?;

    let created = sqlx::query_as::<_, OvertimeRequest>(
        r#"
        INSERT INTO overtime_requests
            (employee_id, work_date, start_time, end_time, minutes, reason, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(employee_id)
    .bind(payload.work_date)
    .bind(payload.start_time)
    .bind(payload.end_time)
    .bind(minutes)
    .bind(reason)
    .bind(status.as_ref())
    .fetch_one(pool.get_ref())
    .await?;

    info!(overtime_id = created.id, employee_id, minutes, "Manual overtime submitted");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/overtime/mine",
    responses((status = 200, body = [OvertimeRequest]), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
pub async fn my_overtime(auth: AuthUser, pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let rows = requests::list_own::<OvertimeRequest>(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/overtime/{overtime_id}",
    params(("overtime_id" = i64, Path, description = "Overtime request ID")),
    responses((status = 200, body = OvertimeRequest), (status = 403), (status = 404)),
    security(("bearer_auth" = [])),
    tag = "Overtime"
)]
pub async fn get_overtime(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let row = requests::fetch_visible::<OvertimeRequest>(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(row))
}
