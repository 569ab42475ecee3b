use crate::{
    api::requests,
    approval::submission_status,
    auth::auth::AuthUser,
    error::{ApiError, ApiResult, is_unique_violation},
    model::work_submission::WorkSubmission,
};
use actix_web::{HttpResponse, web};
use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct CreateWorkSubmission {
    #[schema(example = "2026-02-10", format = "date", value_type = String)]
    pub work_date: NaiveDate,
    #[schema(example = "Wrote the overtime report query")]
    pub summary: String,
    #[schema(example = 7.5)]
    pub hours: f64,
}

impl CreateWorkSubmission {
    fn validate(&self) -> ApiResult<()> {
        if !(self.hours > 0.0 && self.hours <= 24.0) {
            return Err(ApiError::bad_request("hours must be greater than 0 and at most 24"));
        }
        if self.summary.trim().is_empty() {
            return Err(ApiError::bad_request("summary is required"));
        }
        Ok(())
    }
}

/// Submit the day's work for review
#[utoipa::path(
    post,
    path = "/api/work-submissions",
    request_body = CreateWorkSubmission,
    responses(
        (status = 201, body = WorkSubmission),
        (status = 400, description = "Invalid hours or empty summary"),
        (status = 409, description = "Already submitted for that day")
    ),
    security(("bearer_auth" = [])),
    tag = "Work submissions"
)]
pub async fn create_work_submission(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    payload: web::Json<CreateWorkSubmission>,
) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    payload.validate()?;
    let status = submission_status(pool.get_ref(), auth.role, employee_id).await?;

    let created = sqlx::query_as::<_, WorkSubmission>(
        r#"
        INSERT INTO work_submissions (employee_id, work_date, summary, hours, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(employee_id)
    .bind(payload.work_date)
    .bind(payload.summary.trim())
    .bind(payload.hours)
    .bind(status.as_ref())
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict(format!("Work for {} was already submitted", payload.work_date))
        } else {
            ApiError::from(e)
        }
    })?;

    info!(submission_id = created.id, employee_id, "Work submitted");
    Ok(HttpResponse::Created().json(created))
}

#[utoipa::path(
    get,
    path = "/api/work-submissions/mine",
    responses((status = 200, body = [WorkSubmission]), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Work submissions"
)]
pub async fn my_work_submissions(auth: AuthUser, pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let employee_id = auth.require_employee_profile()?;
    let rows = requests::list_own::<WorkSubmission>(pool.get_ref(), employee_id).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/// Withdraw a pending work submission
#[utoipa::path(
    delete,
    path = "/api/work-submissions/{submission_id}",
    params(("submission_id" = i64, Path, description = "Work submission ID")),
    responses((status = 200), (status = 409)),
    security(("bearer_auth" = [])),
    tag = "Work submissions"
)]
pub async fn withdraw_work_submission(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    requests::withdraw::<WorkSubmission>(pool.get_ref(), &auth, path.into_inner()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{Subject, generate_access_token};
    use crate::config::test_config;
    use crate::model::role::Role;
    use actix_web::{
        App,
        http::StatusCode,
        test::{TestRequest, call_service, init_service},
    };
    use serde_json::json;

    fn submission(hours: f64, summary: &str) -> CreateWorkSubmission {
        CreateWorkSubmission {
            work_date: NaiveDate::from_ymd_opt(2026, 2, 10).unwrap(),
            summary: summary.into(),
            hours,
        }
    }

    #[test]
    fn hours_range_is_half_open() {
        assert!(submission(0.0, "x").validate().is_err());
        assert!(submission(0.25, "x").validate().is_ok());
        assert!(submission(24.0, "x").validate().is_ok());
        assert!(submission(24.5, "x").validate().is_err());
        assert!(submission(f64::NAN, "x").validate().is_err());
    }

    #[test]
    fn summary_required() {
        assert!(submission(8.0, " ").validate().is_err());
    }

    // Run with DATABASE_URL pointing at a scratch database:
    // cargo test -- --ignored
    #[actix_web::test]
    #[ignore = "requires database"]
    async fn rejected_day_can_be_resubmitted() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let code = format!("ws-{}", uuid::Uuid::new_v4());
        let employee_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO employees (employee_code, first_name, last_name, email, hire_date)
            VALUES ($1, 'Work', 'User', $1 || '@example.com', CURRENT_DATE)
            RETURNING id
            "#,
        )
        .bind(code)
        .fetch_one(&pool)
        .await
        .unwrap();

        let app = init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(pool.clone()))
                .route("/work-submissions", web::post().to(create_work_submission)),
        )
        .await;
        let subject = Subject {
            user_id: 1,
            email: "ws@company.com".into(),
            role: Role::Employee.id(),
            employee_id: Some(employee_id),
        };
        let token = generate_access_token(&subject, &test_config().jwt_secret, 60).unwrap();
        let submit = || {
            TestRequest::post()
                .uri("/work-submissions")
                .insert_header(("Authorization", format!("Bearer {token}")))
                .set_json(json!({"work_date": "2026-02-10", "summary": "reports", "hours": 8}))
                .to_request()
        };

        assert_eq!(call_service(&app, submit()).await.status(), StatusCode::CREATED);
        assert_eq!(call_service(&app, submit()).await.status(), StatusCode::CONFLICT);

        sqlx::query("UPDATE work_submissions SET status = 'Rejected' WHERE employee_id = $1")
            .bind(employee_id)
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(call_service(&app, submit()).await.status(), StatusCode::CREATED);
    }
}
