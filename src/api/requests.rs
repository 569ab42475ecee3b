//! Read and withdraw operations common to every approval-tracked request.

use actix_web::HttpResponse;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use crate::approval::{self, ApprovalRecord};
use crate::auth::auth::AuthUser;
use crate::error::{ApiError, ApiResult};

/// Fetches one request if the caller is its owner, the owner's team lead, or a manager.
pub async fn fetch_visible<T: ApprovalRecord>(pool: &PgPool, auth: &AuthUser, id: i64) -> ApiResult<T> {
    let kind = T::KIND;
    let snapshot = approval::load_snapshot(pool, kind, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{kind} request not found")))?;

    if !auth.can_view(snapshot.employee_id, snapshot.team_lead_id) {
        return Err(ApiError::forbidden("Not allowed to view this request"));
    }

    let sql = format!("SELECT * FROM {} WHERE id = $1", kind.table());
    let row = sqlx::query_as::<_, T>(&sql).bind(id).fetch_one(pool).await?;
    Ok(row)
}

/// The caller's own requests, newest first.
pub async fn list_own<T: ApprovalRecord>(pool: &PgPool, employee_id: i64) -> ApiResult<Vec<T>> {
    let sql = format!(
        "SELECT * FROM {} WHERE employee_id = $1 ORDER BY created_at DESC",
        T::KIND.table()
    );
    let rows = sqlx::query_as::<_, T>(&sql)
        .bind(employee_id)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}

pub async fn withdraw<T: ApprovalRecord>(pool: &PgPool, auth: &AuthUser, id: i64) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let kind = T::KIND;

    if !approval::withdraw(pool, kind, id, employee_id).await? {
        return Err(ApiError::conflict(format!(
            "{kind} request {id} is not yours or is already decided"
        )));
    }

    info!(request_kind = %kind, request_id = id, employee_id, "Request withdrawn");
    Ok(HttpResponse::Ok().json(json!({ "message": "Request withdrawn" })))
}
