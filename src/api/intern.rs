use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::intern::{self, Intern},
    utils::db_utils::{FilterValue, Filters, build_update_sql, execute_update, paginate},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::PgPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
pub struct CreateIntern {
    #[schema(example = "Priya Sharma")]
    pub full_name: String,
    #[schema(example = "priya@college.edu", format = "email")]
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "City Engineering College")]
    pub college: Option<String>,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    #[schema(example = 4)]
    pub mentor_id: Option<i64>,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(example = "2026-06-30", format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    #[schema(example = 15000.0)]
    pub stipend: Option<f64>,
}

impl CreateIntern {
    fn validate(&self) -> ApiResult<()> {
        if self.full_name.trim().is_empty() {
            return Err(ApiError::bad_request("full_name is required"));
        }
        if !self.email.contains('@') {
            return Err(ApiError::bad_request("email is not valid"));
        }
        if self.end_date.is_some_and(|end| end < self.start_date) {
            return Err(ApiError::bad_request("end_date cannot be before start_date"));
        }
        if self.stipend.is_some_and(|s| s < 0.0) {
            return Err(ApiError::bad_request("stipend cannot be negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct InternQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// active / completed / terminated
    pub status: Option<String>,
    pub mentor_id: Option<i64>,
    /// Matches name, email or college
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct InternListResponse {
    pub data: Vec<Intern>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

async fn fetch_intern(pool: &PgPool, id: i64) -> ApiResult<Intern> {
    sqlx::query_as::<_, Intern>("SELECT * FROM interns WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Intern not found"))
}

/// Register an intern
#[utoipa::path(
    post,
    path = "/api/interns",
    request_body = CreateIntern,
    responses(
        (status = 201, body = Intern),
        (status = 400, description = "Missing fields or end before start"),
        (status = 403, description = "Manager/Admin only"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Interns",
    security(("bearer_auth" = []))
)]
pub async fn create_intern(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateIntern>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;
    payload.validate()?;

    let created = sqlx::query_as::<_, Intern>(
        r#"
        INSERT INTO interns
            (full_name, email, phone, college, department, mentor_id, start_date, end_date, stipend)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(payload.full_name.trim())
    .bind(payload.email.trim().to_lowercase())
    .bind(&payload.phone)
    .bind(&payload.college)
    .bind(&payload.department)
    .bind(payload.mentor_id)
    .bind(payload.start_date)
    .bind(payload.end_date)
    .bind(payload.stipend)
    .fetch_one(pool.get_ref())
    .await?;

    info!(intern_id = created.id, by = auth.user_id, "Intern created");
    Ok(HttpResponse::Created().json(created))
}

/// List interns
#[utoipa::path(
    get,
    path = "/api/interns",
    params(InternQuery),
    responses((status = 200, body = InternListResponse), (status = 403)),
    tag = "Interns",
    security(("bearer_auth" = []))
)]
pub async fn list_interns(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<InternQuery>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page, 20);

    let mut filters = Filters::new();
    if let Some(status) = &query.status {
        filters.eq("status", FilterValue::Str(status.clone()));
    }
    if let Some(mentor_id) = query.mentor_id {
        filters.eq("mentor_id", FilterValue::I64(mentor_id));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        filters.search(&["full_name", "email", "college"], search);
    }
    let where_sql = filters.where_sql();

    let total = filters
        .bind_scalar(sqlx::query_scalar::<_, i64>(&format!(
            "SELECT COUNT(*) FROM interns{where_sql}"
        )))
        .fetch_one(pool.get_ref())
        .await?;

    let n = filters.next_placeholder();
    let data_sql = format!(
        "SELECT * FROM interns{where_sql} ORDER BY start_date DESC, id DESC LIMIT ${} OFFSET ${}",
        n,
        n + 1
    );
    debug!(sql = %data_sql, page, per_page, "Fetching interns");
    let data = filters
        .bind_query_as(sqlx::query_as::<_, Intern>(&data_sql))
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(InternListResponse {
        data,
        page,
        per_page,
        total,
    }))
}

/// Get one intern; mentors may read their own interns
#[utoipa::path(
    get,
    path = "/api/interns/{intern_id}",
    params(("intern_id" = i64, Path, description = "Intern ID")),
    responses((status = 200, body = Intern), (status = 403), (status = 404)),
    tag = "Interns",
    security(("bearer_auth" = []))
)]
pub async fn get_intern(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let intern = fetch_intern(pool.get_ref(), path.into_inner()).await?;

    let is_mentor = intern.mentor_id.is_some() && intern.mentor_id == auth.employee_id;
    if !auth.role.is_manager_level() && !is_mentor {
        return Err(ApiError::forbidden("Not allowed to view this intern"));
    }

    Ok(HttpResponse::Ok().json(intern))
}

/// Checks an update against the stored row, so a date range stays valid when only one end changes.
fn validate_update(body: &Value, current: &Intern) -> ApiResult<()> {
    if let Some(status) = body.get("status") {
        let ok = status.as_str().is_some_and(|s| intern::STATUSES.contains(&s));
        if !ok {
            return Err(ApiError::bad_request(format!(
                "status must be one of: {}",
                intern::STATUSES.join(", ")
            )));
        }
    }

    let date = |key: &str| -> ApiResult<Option<Option<NaiveDate>>> {
        match body.get(key) {
            None => Ok(None),
            Some(Value::Null) => Ok(Some(None)),
            Some(v) => v
                .as_str()
                .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
                .map(|d| Some(Some(d)))
                .ok_or_else(|| ApiError::bad_request(format!("{key} must be YYYY-MM-DD"))),
        }
    };

    let start = match date("start_date")? {
        Some(Some(d)) => d,
        Some(None) => return Err(ApiError::bad_request("start_date cannot be null")),
        None => current.start_date,
    };
    let end = date("end_date")?.unwrap_or(current.end_date);

    if end.is_some_and(|end| end < start) {
        return Err(ApiError::bad_request("end_date cannot be before start_date"));
    }
    Ok(())
}

/// Update an intern (partial)
#[utoipa::path(
    put,
    path = "/api/interns/{intern_id}",
    params(("intern_id" = i64, Path, description = "Intern ID")),
    request_body(content = Object, description = "Any subset of the intern's editable fields"),
    responses((status = 200, body = Intern), (status = 400), (status = 404)),
    tag = "Interns",
    security(("bearer_auth" = []))
)]
pub async fn update_intern(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;
    let intern_id = path.into_inner();

    let current = fetch_intern(pool.get_ref(), intern_id).await?;
    validate_update(&body, &current)?;
    let update = build_update_sql(
        "interns",
        &body,
        intern::UPDATABLE_COLUMNS,
        intern::DATE_COLUMNS,
        "id",
        intern_id,
    )?;

    if execute_update(pool.get_ref(), update).await? == 0 {
        return Err(ApiError::not_found("Intern not found"));
    }

    let intern = fetch_intern(pool.get_ref(), intern_id).await?;

    info!(intern_id, by = auth.user_id, "Intern updated");
    Ok(HttpResponse::Ok().json(intern))
}

#[utoipa::path(
    delete,
    path = "/api/interns/{intern_id}",
    params(("intern_id" = i64, Path, description = "Intern ID")),
    responses((status = 200), (status = 404)),
    tag = "Interns",
    security(("bearer_auth" = []))
)]
pub async fn delete_intern(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let intern_id = path.into_inner();

    let res = sqlx::query("DELETE FROM interns WHERE id = $1")
        .bind(intern_id)
        .execute(pool.get_ref())
        .await?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Intern not found"));
    }

    info!(intern_id, by = auth.user_id, "Intern deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
