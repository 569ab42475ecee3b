//! Team-lead and manager queues over every request kind.

use crate::{
    approval::{self, ApprovalRecord, Approver, Decision, RequestKind, RequestStatus, Stage},
    auth::auth::AuthUser,
    error::{ApiError, ApiResult},
    model::{
        leave_request::LeaveRequest, overtime_request::OvertimeRequest,
        permission_request::PermissionRequest, role::Role, work_submission::WorkSubmission,
    },
};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::collections::BTreeSet;
use tracing::{info, warn};
use utoipa::ToSchema;

/// Upper bound on ids in one bulk decision.
const MAX_BULK_IDS: usize = 200;

#[derive(Debug, Deserialize, ToSchema)]
pub struct DecisionReq {
    #[schema(example = "approve")]
    pub decision: Decision,
    #[schema(example = "Enjoy the break")]
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct FinalDecisionReq {
    #[schema(example = 12)]
    pub id: i64,
    pub decision: Decision,
    pub remarks: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkDecisionReq {
    #[schema(example = json!([12, 13, 15]))]
    pub ids: Vec<i64>,
    pub decision: Decision,
    pub remarks: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionResponse {
    pub id: i64,
    pub kind: RequestKind,
    pub stage: Stage,
    pub status: RequestStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SkippedItem {
    pub id: i64,
    pub reason: String,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct BulkOutcome {
    pub updated: Vec<i64>,
    pub skipped: Vec<SkippedItem>,
}

fn parse_kind(raw: &str) -> ApiResult<RequestKind> {
    raw.parse()
        .map_err(|_| ApiError::not_found(format!("Unknown request type '{raw}'")))
}

fn clean_remarks(remarks: &Option<String>) -> Option<&str> {
    remarks.as_deref().map(str::trim).filter(|r| !r.is_empty())
}

/// Sorted, de-duplicated ids of a bulk request.
fn bulk_ids(ids: &[i64]) -> ApiResult<Vec<i64>> {
    let unique: BTreeSet<i64> = ids.iter().copied().collect();
    if unique.is_empty() {
        return Err(ApiError::bad_request("ids must not be empty"));
    }
    if unique.len() > MAX_BULK_IDS {
        return Err(ApiError::bad_request(format!(
            "At most {MAX_BULK_IDS} requests can be decided at once"
        )));
    }
    Ok(unique.into_iter().collect())
}

/// Requests waiting in `status`, optionally limited to one team lead's reports.
async fn pending<T: ApprovalRecord>(
    pool: &PgPool,
    status: RequestStatus,
    team_lead_id: Option<i64>,
) -> Result<Vec<T>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT r.*
        FROM {} r
        JOIN employees e ON e.id = r.employee_id
        WHERE r.status = $1
        AND ($2::BIGINT IS NULL OR e.team_lead_id = $2)
        ORDER BY r.created_at
        "#,
        T::KIND.table()
    );

    sqlx::query_as::<_, T>(&sql)
        .bind(status.as_ref())
        .bind(team_lead_id)
        .fetch_all(pool)
        .await
}

async fn queue_response<T: ApprovalRecord>(
    pool: &PgPool,
    status: RequestStatus,
    team_lead_id: Option<i64>,
) -> ApiResult<HttpResponse> {
    let rows = pending::<T>(pool, status, team_lead_id).await?;
    Ok(HttpResponse::Ok().json(rows))
}

async fn queue(
    pool: &PgPool,
    kind: RequestKind,
    status: RequestStatus,
    team_lead_id: Option<i64>,
) -> ApiResult<HttpResponse> {
    match kind {
        RequestKind::Leave => queue_response::<LeaveRequest>(pool, status, team_lead_id).await,
        RequestKind::Permission => {
            queue_response::<PermissionRequest>(pool, status, team_lead_id).await
        }
        RequestKind::Overtime => queue_response::<OvertimeRequest>(pool, status, team_lead_id).await,
        RequestKind::WorkSubmission => {
            queue_response::<WorkSubmission>(pool, status, team_lead_id).await
        }
    }
}

async fn decide_one(
    pool: &PgPool,
    kind: RequestKind,
    id: i64,
    at: Stage,
    approver: &Approver,
    decision: Decision,
    remarks: Option<&str>,
) -> ApiResult<DecisionResponse> {
    let transition = approval::apply_decision(pool, kind, id, at, approver, decision, remarks).await?;
    Ok(DecisionResponse {
        id,
        kind,
        stage: transition.stage,
        status: transition.to,
    })
}

/* =========================
Team lead stage
========================= */

/// Requests from the caller's direct reports waiting for the team lead
#[utoipa::path(
    get,
    path = "/api/team-lead/approvals/{kind}",
    params(("kind" = String, Path, description = "leave, permission, overtime or work-submission")),
    responses(
        (status = 200, description = "Pending team lead queue"),
        (status = 403, description = "Team lead only"),
        (status = 404, description = "Unknown request type")
    ),
    security(("bearer_auth" = [])),
    tag = "Approvals"
)]
pub async fn team_lead_queue(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    auth.require_team_lead()?;
    let kind = parse_kind(&path)?;

    // Admins see every team's queue
    let team_lead_id = match auth.role {
        Role::Admin => None,
        _ => Some(auth.require_employee_profile()?),
    };

    queue(pool.get_ref(), kind, RequestStatus::PendingTeamLead, team_lead_id).await
}

/// Approve or reject at the team lead stage
#[utoipa::path(
    put,
    path = "/api/team-lead/approvals/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "leave, permission, overtime or work-submission"),
        ("id" = i64, Path, description = "Request id")
    ),
    request_body = DecisionReq,
    responses(
        (status = 200, body = DecisionResponse),
        (status = 403, description = "Not this requester's team lead"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Not pending team lead, or decided concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Approvals"
)]
pub async fn team_lead_decide(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<(String, i64)>,
    payload: web::Json<DecisionReq>,
) -> ApiResult<HttpResponse> {
    auth.require_team_lead()?;
    let (raw_kind, id) = path.into_inner();
    let kind = parse_kind(&raw_kind)?;

    let outcome = decide_one(
        pool.get_ref(),
        kind,
        id,
        Stage::TeamLead,
        &auth.approver(),
        payload.decision,
        clean_remarks(&payload.remarks),
    )
    .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/* =========================
Manager final approval
========================= */

/// Requests waiting for final approval
#[utoipa::path(
    get,
    path = "/api/manager/final-approvals/{kind}",
    params(("kind" = String, Path, description = "leave, permission, overtime or work-submission")),
    responses(
        (status = 200, description = "Pending manager queue"),
        (status = 403, description = "Manager/Admin only"),
        (status = 404, description = "Unknown request type")
    ),
    security(("bearer_auth" = [])),
    tag = "Approvals"
)]
pub async fn manager_queue(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;
    let kind = parse_kind(&path)?;
    queue(pool.get_ref(), kind, RequestStatus::PendingManager, None).await
}

/// Give the final decision on one request
#[utoipa::path(
    put,
    path = "/api/manager/final-approvals/{kind}",
    params(("kind" = String, Path, description = "leave, permission, overtime or work-submission")),
    request_body = FinalDecisionReq,
    responses(
        (status = 200, body = DecisionResponse),
        (status = 403, description = "Manager/Admin only, or own request"),
        (status = 404, description = "Request not found"),
        (status = 409, description = "Not pending manager approval, or decided concurrently")
    ),
    security(("bearer_auth" = [])),
    tag = "Approvals"
)]
pub async fn manager_decide(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    payload: web::Json<FinalDecisionReq>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;
    let kind = parse_kind(&path)?;

    let outcome = decide_one(
        pool.get_ref(),
        kind,
        payload.id,
        Stage::Manager,
        &auth.approver(),
        payload.decision,
        clean_remarks(&payload.remarks),
    )
    .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Give the same final decision on many requests
#[utoipa::path(
    patch,
    path = "/api/manager/final-approvals/{kind}",
    params(("kind" = String, Path, description = "leave, permission, overtime or work-submission")),
    request_body = BulkDecisionReq,
    responses(
        (status = 200, description = "Per-request outcome", body = BulkOutcome),
        (status = 400, description = "Empty or oversized id list"),
        (status = 403, description = "Manager/Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Approvals"
)]
pub async fn manager_decide_bulk(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    payload: web::Json<BulkDecisionReq>,
) -> ApiResult<HttpResponse> {
    auth.require_manager_or_admin()?;
    let kind = parse_kind(&path)?;
    let ids = bulk_ids(&payload.ids)?;
    let approver = auth.approver();
    let remarks = clean_remarks(&payload.remarks);

    let mut outcome = BulkOutcome::default();
    for id in ids {
        match decide_one(pool.get_ref(), kind, id, Stage::Manager, &approver, payload.decision, remarks).await {
            Ok(_) => outcome.updated.push(id),
            Err(err) => {
                warn!(request_kind = %kind, request_id = id, error = %err, "Skipped in bulk decision");
                outcome.skipped.push(SkippedItem {
                    id,
                    reason: err.public_details(),
                });
            }
        }
    }

    info!(
        request_kind = %kind,
        updated = outcome.updated.len(),
        skipped = outcome.skipped.len(),
        "Bulk final decision"
    );
    Ok(HttpResponse::Ok().json(outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{Subject, generate_access_token};
    use crate::config::test_config;
    use actix_web::{
        App,
        http::StatusCode,
        test::{TestRequest, call_service, init_service},
    };
    use sqlx::postgres::PgPoolOptions;

    #[test]
    fn kind_segment_is_case_insensitive() {
        assert_eq!(parse_kind("Overtime").unwrap(), RequestKind::Overtime);
        assert_eq!(parse_kind("LEAVE").unwrap(), RequestKind::Leave);
        assert!(matches!(parse_kind("expenses"), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn bulk_ids_are_deduplicated() {
        assert_eq!(bulk_ids(&[5, 3, 5, 1]).unwrap(), vec![1, 3, 5]);
        assert!(bulk_ids(&[]).is_err());
        let too_many: Vec<i64> = (0..=MAX_BULK_IDS as i64).collect();
        assert!(bulk_ids(&too_many).is_err());
    }

    #[test]
    fn blank_remarks_are_dropped() {
        assert_eq!(clean_remarks(&Some("  ok ".into())), Some("ok"));
        assert_eq!(clean_remarks(&Some("   ".into())), None);
        assert_eq!(clean_remarks(&None), None);
    }

    #[test]
    fn bulk_request_accepts_decision_words() {
        let req: BulkDecisionReq =
            serde_json::from_str(r#"{"ids":[1,2],"decision":"rejected","remarks":null}"#).unwrap();
        assert_eq!(req.decision, Decision::Reject);
    }

    fn bearer(role: Role) -> String {
        let subject = Subject {
            user_id: 1,
            email: "someone@company.com".into(),
            role: role.id(),
            employee_id: Some(7),
        };
        let token = generate_access_token(&subject, &test_config().jwt_secret, 60).unwrap();
        format!("Bearer {token}")
    }

    // Role guards run before any query, so a lazy pool that never connects is enough.
    #[actix_web::test]
    async fn employees_cannot_open_the_manager_queue() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@localhost/none")
            .unwrap();
        let app = init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(pool))
                .route("/manager/final-approvals/{kind}", web::get().to(manager_queue)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/manager/final-approvals/Overtime")
            .insert_header(("Authorization", bearer(Role::Employee)))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn unknown_kind_is_404() {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://nobody@localhost/none")
            .unwrap();
        let app = init_service(
            App::new()
                .app_data(web::Data::new(test_config()))
                .app_data(web::Data::new(pool))
                .route("/team-lead/approvals/{kind}", web::get().to(team_lead_queue)),
        )
        .await;

        let req = TestRequest::get()
            .uri("/team-lead/approvals/expenses")
            .insert_header(("Authorization", bearer(Role::TeamLead)))
            .to_request();
        let resp = call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
