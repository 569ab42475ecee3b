use crate::{
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::employee::{self, Employee},
    utils::db_utils::{FilterValue, Filters, build_update_sql, execute_update, paginate},
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sqlx::PgPool;
use tracing::{debug, info};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, Serialize, ToSchema)]
pub struct CreateEmployee {
    #[schema(example = "EMP-3000")]
    pub employee_code: String,
    #[schema(example = "Jane")]
    pub first_name: String,
    #[schema(example = "Doe")]
    pub last_name: String,
    #[schema(example = "jane@company.com", format = "email")]
    pub email: String,
    pub phone: Option<String>,
    #[schema(example = "Engineering")]
    pub department: Option<String>,
    #[schema(example = "Software Engineer")]
    pub designation: Option<String>,
    #[schema(example = 4)]
    pub team_lead_id: Option<i64>,
    #[schema(example = "2026-01-01", format = "date", value_type = String)]
    pub hire_date: NaiveDate,
}

impl CreateEmployee {
    fn validate(&self) -> ApiResult<()> {
        for (field, value) in [
            ("employee_code", &self.employee_code),
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("email", &self.email),
        ] {
            if value.trim().is_empty() {
                return Err(ApiError::bad_request(format!("{field} is required")));
            }
        }
        if !self.email.contains('@') {
            return Err(ApiError::bad_request("email is not valid"));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
pub struct EmployeeQuery {
    /// Page number (1-based)
    pub page: Option<u32>,
    /// Items per page (max 100)
    pub per_page: Option<u32>,
    pub department: Option<String>,
    pub team_lead_id: Option<i64>,
    /// active / inactive
    pub status: Option<String>,
    /// Matches first name, last name, email or employee code
    pub search: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct EmployeeListResponse {
    pub data: Vec<Employee>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 42)]
    pub total: i64,
}

/// Create Employee
#[utoipa::path(
    post,
    path = "/api/employee",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Missing or invalid fields"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "Employee code or email already exists")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateEmployee>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    payload.validate()?;

    let created = sqlx::query_as::<_, Employee>(
        r#"
        INSERT INTO employees
            (employee_code, first_name, last_name, email, phone, department, designation, team_lead_id, hire_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(payload.employee_code.trim())
    .bind(payload.first_name.trim())
    .bind(payload.last_name.trim())
    .bind(payload.email.trim().to_lowercase())
    .bind(&payload.phone)
    .bind(&payload.department)
    .bind(&payload.designation)
    .bind(payload.team_lead_id)
    .bind(payload.hire_date)
    .fetch_one(pool.get_ref())
    .await?;

    info!(employee_id = created.id, by = auth.user_id, "Employee created");
    Ok(HttpResponse::Created().json(created))
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employee",
    params(EmployeeQuery),
    responses(
        (status = 200, description = "Paginated employee list", body = EmployeeListResponse),
        (status = 403, description = "Manager/Admin only")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    query: web::Query<EmployeeQuery>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;

    let (page, per_page, offset) = paginate(query.page, query.per_page, 20);

    let mut filters = Filters::new();
    if let Some(department) = &query.department {
        filters.eq("department", FilterValue::Str(department.clone()));
    }
    if let Some(team_lead_id) = query.team_lead_id {
        filters.eq("team_lead_id", FilterValue::I64(team_lead_id));
    }
    if let Some(status) = &query.status {
        filters.eq("status", FilterValue::Str(status.clone()));
    }
    if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
        filters.search(&["first_name", "last_name", "email", "employee_code"], search);
    }

    let where_sql = filters.where_sql();

    let count_sql = format!("SELECT COUNT(*) FROM employees{where_sql}");
    debug!(sql = %count_sql, "Counting employees");
    let total = filters
        .bind_scalar(sqlx::query_scalar::<_, i64>(&count_sql))
        .fetch_one(pool.get_ref())
        .await?;

    let n = filters.next_placeholder();
    let data_sql = format!(
        "SELECT * FROM employees{where_sql} ORDER BY id DESC LIMIT ${} OFFSET ${}",
        n,
        n + 1
    );
    debug!(sql = %data_sql, page, per_page, offset, "Fetching employees");
    let employees = filters
        .bind_query_as(sqlx::query_as::<_, Employee>(&data_sql))
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(pool.get_ref())
        .await?;

    Ok(HttpResponse::Ok().json(EmployeeListResponse {
        data: employees,
        page,
        per_page,
        total,
    }))
}

pub async fn fetch_employee(pool: &PgPool, id: i64) -> ApiResult<Employee> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::not_found("Employee not found"))
}

/// Get Employee by ID
#[utoipa::path(
    get,
    path = "/api/employee/{employee_id}",
    params(("employee_id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let employee = fetch_employee(pool.get_ref(), path.into_inner()).await?;

    if !auth.can_view(employee.id, employee.team_lead_id) {
        return Err(ApiError::forbidden("Not allowed to view this employee"));
    }

    Ok(HttpResponse::Ok().json(employee))
}

/// The caller's own employee record
#[utoipa::path(
    get,
    path = "/api/employee/me",
    responses(
        (status = 200, body = Employee),
        (status = 403, description = "Login has no employee profile")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn my_profile(auth: AuthUser, pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Direct reports of the calling team lead
#[utoipa::path(
    get,
    path = "/api/employee/team",
    responses((status = 200, body = [Employee]), (status = 403)),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn my_team(auth: AuthUser, pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    auth.require_team_lead()?;
    let lead_id = auth.require_employee_profile()?;

    let team = sqlx::query_as::<_, Employee>(
        "SELECT * FROM employees WHERE team_lead_id = $1 ORDER BY first_name, last_name",
    )
    .bind(lead_id)
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(team))
}

fn validate_update(employee_id: i64, body: &Value) -> ApiResult<()> {
    if let Some(status) = body.get("status") {
        let ok = status
            .as_str()
            .is_some_and(|s| employee::STATUSES.contains(&s));
        if !ok {
            return Err(ApiError::bad_request("status must be one of: active, inactive"));
        }
    }
    if body.get("team_lead_id").and_then(Value::as_i64) == Some(employee_id) {
        return Err(ApiError::bad_request("An employee cannot be their own team lead"));
    }
    if body.get("hire_date").is_some_and(Value::is_null) {
        return Err(ApiError::bad_request("hire_date cannot be null"));
    }
    Ok(())
}

/// Rejects a new team lead who already reports, directly or not, to this employee.
async fn check_lead_chain(pool: &PgPool, employee_id: i64, lead_id: i64) -> ApiResult<()> {
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM employees WHERE id = $1)")
        .bind(lead_id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(ApiError::bad_request("team_lead_id does not match an employee"));
    }

    let cycle = sqlx::query_scalar::<_, bool>(
        r#"
        WITH RECURSIVE chain (id) AS (
            SELECT team_lead_id FROM employees WHERE id = $1
            UNION
            SELECT e.team_lead_id FROM employees e JOIN chain c ON e.id = c.id
        )
        SELECT EXISTS(SELECT 1 FROM chain WHERE id = $2)
        "#,
    )
    .bind(lead_id)
    .bind(employee_id)
    .fetch_one(pool)
    .await?;
    if cycle {
        return Err(ApiError::bad_request(
            "team_lead_id would make the employee lead their own team lead",
        ));
    }
    Ok(())
}

/// Update Employee (partial)
#[utoipa::path(
    put,
    path = "/api/employee/{employee_id}",
    params(("employee_id" = i64, Path, description = "Employee ID")),
    request_body(content = Object, description = "Any subset of the employee's editable fields"),
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Unknown field or invalid value"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    body: web::Json<Value>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    validate_update(employee_id, &body)?;
    if let Some(lead_id) = body.get("team_lead_id").and_then(Value::as_i64) {
        check_lead_chain(pool.get_ref(), employee_id, lead_id).await?;
    }
    let update = build_update_sql(
        "employees",
        &body,
        employee::UPDATABLE_COLUMNS,
        employee::DATE_COLUMNS,
        "id",
        employee_id,
    )?;

    if execute_update(pool.get_ref(), update).await? == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    info!(employee_id, by = auth.user_id, "Employee updated");
    let employee = fetch_employee(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(employee))
}

/// Delete Employee
#[utoipa::path(
    delete,
    path = "/api/employee/{employee_id}",
    params(("employee_id" = i64, Path, description = "Employee ID")),
    responses(
        (status = 200, description = "Successfully deleted"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let employee_id = path.into_inner();

    let res = sqlx::query("DELETE FROM employees WHERE id = $1")
        .bind(employee_id)
        .execute(pool.get_ref())
        .await?;

    if res.rows_affected() == 0 {
        return Err(ApiError::not_found("Employee not found"));
    }

    info!(employee_id, by = auth.user_id, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> CreateEmployee {
        CreateEmployee {
            employee_code: "EMP-1".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            email: "jane@company.com".into(),
            phone: None,
            department: None,
            designation: None,
            team_lead_id: None,
            hire_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        }
    }

    #[test]
    fn create_requires_names_and_email() {
        assert!(payload().validate().is_ok());

        let mut blank = payload();
        blank.first_name = "  ".into();
        assert!(matches!(blank.validate(), Err(ApiError::BadRequest(m)) if m.contains("first_name")));

        let mut bad_email = payload();
        bad_email.email = "jane".into();
        assert!(bad_email.validate().is_err());
    }

    #[test]
    fn update_rejects_unknown_status_and_self_lead() {
        assert!(validate_update(5, &json!({"status": "active"})).is_ok());
        assert!(validate_update(5, &json!({"status": "fired"})).is_err());
        assert!(validate_update(5, &json!({"team_lead_id": 5})).is_err());
        assert!(validate_update(5, &json!({"team_lead_id": 6})).is_ok());
    }

    #[test]
    fn hire_date_cannot_be_cleared() {
        assert!(validate_update(5, &json!({"hire_date": null})).is_err());
        assert!(validate_update(5, &json!({"hire_date": "2026-01-02"})).is_ok());
    }

    // Run with DATABASE_URL pointing at a scratch database:
    // cargo test -- --ignored
    #[actix_web::test]
    #[ignore = "requires database"]
    async fn lead_chain_refuses_cycles() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let suffix = uuid::Uuid::new_v4().to_string();
        let mut ids = Vec::new();
        for (i, lead) in [None, Some(0), Some(1)].into_iter().enumerate() {
            let id = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO employees (employee_code, first_name, last_name, email, team_lead_id, hire_date)
                VALUES ($1, 'Chain', 'User', $1 || '@example.com', $2, CURRENT_DATE)
                RETURNING id
                "#,
            )
            .bind(format!("chain-{i}-{suffix}"))
            .bind(lead.map(|j: usize| ids[j]))
            .fetch_one(&pool)
            .await
            .unwrap();
            ids.push(id);
        }
        // ids[0] leads ids[1], which leads ids[2]
        assert!(check_lead_chain(&pool, ids[0], ids[1]).await.is_err());
        assert!(check_lead_chain(&pool, ids[0], ids[2]).await.is_err());
        assert!(check_lead_chain(&pool, ids[2], ids[0]).await.is_ok());
        assert!(check_lead_chain(&pool, ids[0], -1).await.is_err());
    }
}
