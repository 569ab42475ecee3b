use crate::{
    api::requests,
    approval::submission_status,
    auth::auth::AuthUser,
    config::Config,
    error::{ApiError, ApiResult},
    model::permission_request::{PermissionRequest, permission_minutes},
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreatePermission {
    #[schema(example = "2026-02-10", format = "date", value_type = String)]
    pub permission_date: NaiveDate,
    #[schema(example = "14:00:00", value_type = String)]
    pub from_time: NaiveTime,
    #[schema(example = "15:30:00", value_type = String)]
    pub to_time: NaiveTime,
    #[schema(example = "Bank visit")]
    pub reason: String,
}

impl CreatePermission {
    fn validate(&self, max_minutes: i32) -> ApiResult<i32> {
        let minutes = permission_minutes(self.from_time, self.to_time)
            .ok_or_else(|| ApiError::bad_request("to_time must be after from_time"))?;

        if minutes > max_minutes {
            return Err(ApiError::bad_request(format!(
                "Permission cannot exceed {max_minutes} minutes"
            )));
        }
        if self.reason.trim().is_empty() {
            return Err(ApiError::bad_request("reason is required"));
        }
        Ok(minutes)
    }
}

/// Request a short absence
#[utoipa::path(
    post,
    path = "/api/permission",
    request_body = CreatePermission,
    responses(
        (status = 201, description = "Permission requested", body = PermissionRequest),
        (status = 400, description = "Invalid time window or too long"),
        (status = 403, description = "Login has no employee profile")
    ),
    security(("bearer_auth" = [])),
    tag = "Permission"
)]
pub async fn create_permission(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
    payload: web::Json<CreatePermission>,
) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let minutes = payload.validate(config.max_permission_minutes)?;
    let status = submission_status(pool.get_ref(), auth.role, employee_id).await?;

    let created = sqlx::query_as::<_, PermissionRequest>(
        r#"
        INSERT INTO permission_requests
            (employee_id, permission_date, from_time, to_time, minutes, reason, status)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(employee_id)
    .bind(payload.permission_date)
    .bind(payload.from_time)
    .bind(payload.to_time)
    .bind(minutes)
    .bind(payload.reason.trim())
    .bind(status.as_ref())
    .fetch_one(pool.get_ref())
    .await?;

    info!(permission_id = created.id, employee_id, minutes, "Permission requested");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/permission/mine",
    responses((status = 200, body = [PermissionRequest]), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Permission"
)]
pub async fn my_permissions(auth: AuthUser, pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let rows = requests::list_own::<PermissionRequest>(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/permission/{permission_id}",
    params(("permission_id" = i64, Path, description = "Permission request ID")),
    responses(
        (status = 200, body = PermissionRequest),
        (status = 403),
        (status = 404)
    ),
    security(("bearer_auth" = [])),
    tag = "Permission"
)]
pub async fn get_permission(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let row = requests::fetch_visible::<PermissionRequest>(pool.get_ref(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(row))
}

/// Withdraw a pending permission request
#[utoipa::path(
    delete,
    path = "/api/permission/{permission_id}",
    params(("permission_id" = i64, Path, description = "Permission request ID")),
    responses((status = 200), (status = 409)),
    security(("bearer_auth" = [])),
    tag = "Permission"
)]
pub async fn withdraw_permission(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    requests::withdraw::<PermissionRequest>(pool.get_ref(), &auth, path.into_inner()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(from: (u32, u32), to: (u32, u32)) -> CreatePermission {
        CreatePermission {
            permission_date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
            from_time: NaiveTime::from_hms_opt(from.0, from.1, 0).unwrap(),
            to_time: NaiveTime::from_hms_opt(to.0, to.1, 0).unwrap(),
            reason: "Bank visit".into(),
        }
    }

    #[test]
    fn window_within_limit() {
        assert_eq!(req((14, 0), (15, 30)).validate(180).unwrap(), 90);
        assert_eq!(req((9, 0), (12, 0)).validate(180).unwrap(), 180);
    }

    #[test]
    fn reversed_window_is_bad_request() {
        let err = req((15, 0), (14, 0)).validate(180).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(m) if m.contains("after")));
    }

    #[test]
    fn too_long_is_bad_request() {
        assert!(matches!(
            req((9, 0), (12, 1)).validate(180),
            Err(ApiError::BadRequest(_))
        ));
    }
}
