use crate::{
    api::requests,
    approval::submission_status,
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::leave_request::{LeaveRequest, LeaveType, leave_days},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use utoipa::ToSchema;

/// Longest single leave request, in calendar days.
const MAX_LEAVE_DAYS: i32 = 90;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    #[schema(example = "sick")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[schema(example = "Fever")]
    pub reason: String,
}

impl CreateLeave {
    /// Returns the number of days requested.
    fn validate(&self) -> ApiResult<i32> {
        let days = leave_days(self.start_date, self.end_date)
            .ok_or_else(|| ApiError::bad_request("end_date cannot be before start_date"))?;

        if days > MAX_LEAVE_DAYS {
            return Err(ApiError::bad_request(format!(
                "A single leave request cannot exceed {MAX_LEAVE_DAYS} days"
            )));
        }
        if self.reason.trim().is_empty() {
            return Err(ApiError::bad_request("reason is required"));
        }
        Ok(days)
    }
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(content = CreateLeave, description = "Leave request payload", content_type = "application/json"),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Invalid dates or missing reason", body = Object, example = json!({
            "error": "Bad Request",
            "details": "end_date cannot be before start_date"
        })),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Login has no employee profile"),
        (status = 409, description = "Overlaps an existing leave request")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateLeave>,
) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let days = payload.validate()?;

    let overlaps = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM leave_requests
            WHERE employee_id = $1
            AND status <> 'Rejected'
            AND start_date <= $3
            AND end_date >= $2
        )
        "#,
    )
    .bind(employee_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .fetch_one(pool.get_ref())
    .await?;

    if overlaps {
        return Err(ApiError::conflict("Leave overlaps an existing request"));
    }

    let status = submission_status(pool.get_ref(), auth.role, employee_id).await?;

    let leave = sqlx::query_as::<_, LeaveRequest>(
        r#"
        INSERT INTO leave_requests
            (employee_id, leave_type, start_date, end_date, days, reason, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(employee_id)
    .bind(payload.leave_type.as_ref())
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(days)
    .bind(payload.reason.trim())
    .bind(status.as_ref())
    .fetch_one(pool.get_ref())
    .await?;

    info!(leave_id = leave.id, employee_id, days, status = %status, "Leave requested");
    Ok(HttpResponse::Created().json(leave))
}

/// The caller's leave requests
#[utoipa::path(
    get,
    path = "/api/leave/mine",
    responses((status = 200, body = [LeaveRequest]), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn my_leaves(auth: AuthUser, pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let rows = requests::list_own::<LeaveRequest>(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// One leave request
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the leave request")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 403, description = "Not the owner, their team lead, or a manager"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let leave = requests::fetch_visible::<LeaveRequest>(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

/// Withdraw a pending leave request
#[utoipa::path(
    delete,
    path = "/api/leave/{leave_id}",
    params(("leave_id" = i64, Path, description = "ID of the leave request")),
    responses(
        (status = 200, description = "Withdrawn"),
        (status = 409, description = "Not yours or already decided")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn withdraw_leave(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    requests::withdraw::<LeaveRequest>(pool.get_ref(), &auth, path.into_inner()).await
}
