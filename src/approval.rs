//! Two-stage approval flow shared by leave, permission, overtime and
//! work-submission requests.
//!
//! ```text
//! In Progress ──submit──▶ Pending Team Lead ──approve──▶ Pending Manager Approval ──approve──▶ Approved
//!                              │                               │
//!                              └────reject────▶ Rejected ◀─────┘
//! ```
//!
//! Requests from employees without a team lead (and from team leads and
//! managers themselves) start directly at `Pending Manager Approval`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::ApiError;
use crate::model::role::Role;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, Deserialize, ToSchema,
)]
pub enum RequestStatus {
    #[strum(serialize = "In Progress")]
    #[serde(rename = "In Progress")]
    InProgress,
    #[strum(serialize = "Pending Team Lead")]
    #[serde(rename = "Pending Team Lead")]
    PendingTeamLead,
    #[strum(serialize = "Pending Manager Approval")]
    #[serde(rename = "Pending Manager Approval")]
    PendingManager,
    Approved,
    Rejected,
}

impl RequestStatus {
    /// The approval stage that may act on a request in this status.
    pub fn stage(self) -> Option<Stage> {
        match self {
            RequestStatus::PendingTeamLead => Some(Stage::TeamLead),
            RequestStatus::PendingManager => Some(Stage::Manager),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    TeamLead,
    Manager,
}

impl Stage {
    fn column_prefix(self) -> &'static str {
        match self {
            Stage::TeamLead => "team_lead",
            Stage::Manager => "manager",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    #[serde(alias = "approved")]
    Approve,
    #[serde(alias = "rejected")]
    Reject,
}

/// Request families that go through the approval flow; each lives in its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr, Serialize, ToSchema)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    #[strum(serialize = "leave")]
    Leave,
    #[strum(serialize = "permission")]
    Permission,
    #[strum(to_string = "overtime", serialize = "ot")]
    Overtime,
    #[strum(to_string = "work-submission", serialize = "work_submission")]
    WorkSubmission,
}

impl RequestKind {
    pub fn table(self) -> &'static str {
        match self {
            RequestKind::Leave => "leave_requests",
            RequestKind::Permission => "permission_requests",
            RequestKind::Overtime => "overtime_requests",
            RequestKind::WorkSubmission => "work_submissions",
        }
    }
}

/// Status a freshly submitted request starts in.
pub fn initial_status(submitter: Role, team_lead_id: Option<i64>) -> RequestStatus {
    match (submitter, team_lead_id) {
        (Role::Employee, Some(_)) => RequestStatus::PendingTeamLead,
        _ => RequestStatus::PendingManager,
    }
}

/// Looks up the submitter's team lead and picks the starting status.
pub async fn submission_status(
    pool: &PgPool,
    submitter: Role,
    employee_id: i64,
) -> Result<RequestStatus, ApiError> {
    let team_lead_id = sqlx::query_scalar::<_, Option<i64>>(
        "SELECT team_lead_id FROM employees WHERE id = $1",
    )
    .bind(employee_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| ApiError::not_found("Employee profile not found"))?;

    Ok(initial_status(submitter, team_lead_id))
}

/// Who decided what at each stage; present on every request row.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct ApprovalTrail {
    /// Team lead who acted at the first stage
    pub team_lead_id: Option<i64>,
    pub team_lead_remarks: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub team_lead_action_at: Option<DateTime<Utc>>,
    /// Manager who gave the final decision
    pub manager_id: Option<i64>,
    pub manager_remarks: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub manager_action_at: Option<DateTime<Utc>>,
}

/// A stored request that can be listed in an approval queue.
pub trait ApprovalRecord:
    for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Serialize + Send + Unpin + 'static
{
    const KIND: RequestKind;
}

/// Who is acting on a request.
#[derive(Debug, Clone, Copy)]
pub struct Approver {
    pub role: Role,
    pub employee_id: Option<i64>,
}

/// The parts of a stored request the state machine needs.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestSnapshot {
    pub employee_id: i64,
    pub status: String,
    /// Team lead of the requester at decision time
    pub team_lead_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub stage: Stage,
    pub from: RequestStatus,
    pub to: RequestStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    UnknownStatus(String),
    NotActionable(RequestStatus),
    SelfApproval,
    WrongApprover(Stage),
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::UnknownStatus(s) => {
                ApiError::Internal(format!("stored request has unknown status {s:?}"))
            }
            TransitionError::NotActionable(status) => {
                ApiError::conflict(format!("Request is {status} and cannot be decided"))
            }
            TransitionError::SelfApproval => {
                ApiError::forbidden("You cannot decide your own request")
            }
            TransitionError::WrongApprover(Stage::TeamLead) => {
                ApiError::forbidden("Only the requester's team lead can act at this stage")
            }
            TransitionError::WrongApprover(Stage::Manager) => {
                ApiError::forbidden("Only a manager can give final approval")
            }
        }
    }
}

/// Works out the next status for `decision`, or why `approver` may not make it.
pub fn decide(
    request: &RequestSnapshot,
    approver: &Approver,
    decision: Decision,
) -> Result<Transition, TransitionError> {
    let from: RequestStatus = request
        .status
        .parse()
        .map_err(|_| TransitionError::UnknownStatus(request.status.clone()))?;

    let stage = from.stage().ok_or(TransitionError::NotActionable(from))?;

    if approver.employee_id == Some(request.employee_id) {
        return Err(TransitionError::SelfApproval);
    }

    let allowed = match stage {
        Stage::TeamLead => {
            approver.role == Role::Admin
                || (request.team_lead_id.is_some() && approver.employee_id == request.team_lead_id)
        }
        Stage::Manager => approver.role.is_manager_level(),
    };
    if !allowed {
        return Err(TransitionError::WrongApprover(stage));
    }

    let to = match (stage, decision) {
        (_, Decision::Reject) => RequestStatus::Rejected,
        (Stage::TeamLead, Decision::Approve) => RequestStatus::PendingManager,
        (Stage::Manager, Decision::Approve) => RequestStatus::Approved,
    };

    Ok(Transition { stage, from, to })
}

/// Like [`decide`], but only for requests waiting at stage `at`.
pub fn decide_at(
    request: &RequestSnapshot,
    approver: &Approver,
    decision: Decision,
    at: Stage,
) -> Result<Transition, TransitionError> {
    let transition = decide(request, approver, decision)?;
    if transition.stage != at {
        return Err(TransitionError::NotActionable(transition.from));
    }
    Ok(transition)
}

pub async fn load_snapshot(
    pool: &PgPool,
    kind: RequestKind,
    id: i64,
) -> Result<Option<RequestSnapshot>, sqlx::Error> {
    let sql = format!(
        r#"
        SELECT r.employee_id, r.status, e.team_lead_id
        FROM {} r
        JOIN employees e ON e.id = r.employee_id
        WHERE r.id = $1
        "#,
        kind.table()
    );

    sqlx::query_as::<_, RequestSnapshot>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Writes a transition only if the row is still in `transition.from`.
///
/// Returns false when another approver changed the row first.
pub async fn persist(
    pool: &PgPool,
    kind: RequestKind,
    id: i64,
    transition: &Transition,
    approver: &Approver,
    remarks: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let prefix = transition.stage.column_prefix();
    let sql = format!(
        r#"
        UPDATE {table}
        SET status = $1,
            {prefix}_id = $2,
            {prefix}_remarks = $3,
            {prefix}_action_at = NOW()
        WHERE id = $4
        AND status = $5
        "#,
        table = kind.table(),
    );

    let result = sqlx::query(&sql)
        .bind(transition.to.as_ref())
        .bind(approver.employee_id)
        .bind(remarks)
        .bind(id)
        .bind(transition.from.as_ref())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

/// Loads, checks and applies one decision at stage `at`.
pub async fn apply_decision(
    pool: &PgPool,
    kind: RequestKind,
    id: i64,
    at: Stage,
    approver: &Approver,
    decision: Decision,
    remarks: Option<&str>,
) -> Result<Transition, ApiError> {
    let snapshot = load_snapshot(pool, kind, id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("{kind} request {id} not found")))?;

    let transition = decide_at(&snapshot, approver, decision, at)?;

    if !persist(pool, kind, id, &transition, approver, remarks).await? {
        return Err(ApiError::conflict(
            "Request was updated by someone else, reload and try again",
        ));
    }

    tracing::info!(
        request_kind = %kind,
        request_id = id,
        from = %transition.from,
        to = %transition.to,
        approver = ?approver.employee_id,
        "Request decided"
    );

    Ok(transition)
}

/// Owner withdraws a request that nobody has finalized yet.
pub async fn withdraw(
    pool: &PgPool,
    kind: RequestKind,
    id: i64,
    employee_id: i64,
) -> Result<bool, sqlx::Error> {
    let sql = format!(
        "DELETE FROM {} WHERE id = $1 AND employee_id = $2 AND status IN ($3, $4)",
        kind.table()
    );

    let result = sqlx::query(&sql)
        .bind(id)
        .bind(employee_id)
        .bind(RequestStatus::PendingTeamLead.as_ref())
        .bind(RequestStatus::PendingManager.as_ref())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const REQUESTER: i64 = 10;
    const LEAD: i64 = 20;
    const MANAGER: i64 = 30;

    fn request(status: RequestStatus) -> RequestSnapshot {
        RequestSnapshot {
            employee_id: REQUESTER,
            status: status.to_string(),
            team_lead_id: Some(LEAD),
        }
    }

    fn lead() -> Approver {
        Approver { role: Role::TeamLead, employee_id: Some(LEAD) }
    }

    fn manager() -> Approver {
        Approver { role: Role::Manager, employee_id: Some(MANAGER) }
    }

    #[test]
    fn status_strings_match_stored_values() {
        assert_eq!(RequestStatus::PendingTeamLead.as_ref(), "Pending Team Lead");
        assert_eq!(RequestStatus::PendingManager.to_string(), "Pending Manager Approval");
        assert_eq!(
            RequestStatus::from_str("Approved").unwrap(),
            RequestStatus::Approved
        );
        assert_eq!(
            serde_json::to_value(RequestStatus::InProgress).unwrap(),
            "In Progress"
        );
    }

    #[test]
    fn kind_parses_url_segments() {
        assert_eq!(RequestKind::from_str("Overtime").unwrap(), RequestKind::Overtime);
        assert_eq!(RequestKind::from_str("overtime").unwrap(), RequestKind::Overtime);
        assert_eq!(
            RequestKind::from_str("work-submission").unwrap(),
            RequestKind::WorkSubmission
        );
        assert!(RequestKind::from_str("expenses").is_err());
        assert_eq!(RequestKind::Permission.table(), "permission_requests");
    }

    #[test]
    fn initial_status_depends_on_team_lead() {
        assert_eq!(
            initial_status(Role::Employee, Some(LEAD)),
            RequestStatus::PendingTeamLead
        );
        assert_eq!(initial_status(Role::Employee, None), RequestStatus::PendingManager);
        assert_eq!(
            initial_status(Role::TeamLead, Some(LEAD)),
            RequestStatus::PendingManager
        );
        assert_eq!(initial_status(Role::Manager, None), RequestStatus::PendingManager);
    }

    #[test]
    fn full_approval_path() {
        let first = decide(&request(RequestStatus::PendingTeamLead), &lead(), Decision::Approve)
            .unwrap();
        assert_eq!(first.stage, Stage::TeamLead);
        assert_eq!(first.to, RequestStatus::PendingManager);

        let second = decide(&request(first.to), &manager(), Decision::Approve).unwrap();
        assert_eq!(second.stage, Stage::Manager);
        assert_eq!(second.from, RequestStatus::PendingManager);
        assert_eq!(second.to, RequestStatus::Approved);
    }

    #[test]
    fn rejection_at_either_stage_is_final() {
        let by_lead =
            decide(&request(RequestStatus::PendingTeamLead), &lead(), Decision::Reject).unwrap();
        assert_eq!(by_lead.to, RequestStatus::Rejected);

        let by_manager =
            decide(&request(RequestStatus::PendingManager), &manager(), Decision::Reject).unwrap();
        assert_eq!(by_manager.to, RequestStatus::Rejected);
    }

    #[test]
    fn finalized_and_open_sessions_cannot_be_decided() {
        for status in [
            RequestStatus::Approved,
            RequestStatus::Rejected,
            RequestStatus::InProgress,
        ] {
            assert_eq!(
                decide(&request(status), &manager(), Decision::Approve),
                Err(TransitionError::NotActionable(status))
            );
        }
    }

    #[test]
    fn another_team_lead_is_refused() {
        let stranger = Approver { role: Role::TeamLead, employee_id: Some(99) };
        assert_eq!(
            decide(&request(RequestStatus::PendingTeamLead), &stranger, Decision::Approve),
            Err(TransitionError::WrongApprover(Stage::TeamLead))
        );
    }

    #[test]
    fn team_lead_cannot_give_final_approval() {
        assert_eq!(
            decide(&request(RequestStatus::PendingManager), &lead(), Decision::Approve),
            Err(TransitionError::WrongApprover(Stage::Manager))
        );
    }

    #[test]
    fn manager_does_not_skip_team_lead_stage() {
        assert_eq!(
            decide(&request(RequestStatus::PendingTeamLead), &manager(), Decision::Approve),
            Err(TransitionError::WrongApprover(Stage::TeamLead))
        );
    }

    #[test]
    fn admin_may_act_at_both_stages() {
        let admin = Approver { role: Role::Admin, employee_id: None };
        let t = decide(&request(RequestStatus::PendingTeamLead), &admin, Decision::Approve).unwrap();
        assert_eq!(t.to, RequestStatus::PendingManager);
        let t = decide(&request(t.to), &admin, Decision::Approve).unwrap();
        assert_eq!(t.to, RequestStatus::Approved);
    }

    #[test]
    fn nobody_decides_their_own_request() {
        let own_manager = Approver { role: Role::Manager, employee_id: Some(REQUESTER) };
        assert_eq!(
            decide(&request(RequestStatus::PendingManager), &own_manager, Decision::Approve),
            Err(TransitionError::SelfApproval)
        );
    }

    #[test]
    fn garbage_status_is_reported() {
        let mut snapshot = request(RequestStatus::Approved);
        snapshot.status = "pending".into();
        assert!(matches!(
            decide(&snapshot, &manager(), Decision::Approve),
            Err(TransitionError::UnknownStatus(_))
        ));
    }

    #[test]
    fn queue_routes_only_act_at_their_stage() {
        let admin = Approver { role: Role::Admin, employee_id: None };
        assert_eq!(
            decide_at(&request(RequestStatus::PendingManager), &admin, Decision::Approve, Stage::TeamLead),
            Err(TransitionError::NotActionable(RequestStatus::PendingManager))
        );
        let t = decide_at(&request(RequestStatus::PendingManager), &admin, Decision::Reject, Stage::Manager)
            .unwrap();
        assert_eq!(t.to, RequestStatus::Rejected);
    }

    #[test]
    fn decision_accepts_past_tense() {
        let d: Decision = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(d, Decision::Approve);
        let d: Decision = serde_json::from_str("\"reject\"").unwrap();
        assert_eq!(d, Decision::Reject);
    }

    // Run with DATABASE_URL pointing at a scratch database:
    // cargo test -- --ignored
    #[actix_web::test]
    #[ignore = "requires database"]
    async fn stale_decision_loses_compare_and_set() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
        let pool = PgPool::connect(&url).await.unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let suffix = uuid::Uuid::new_v4().to_string();
        let insert_employee = |code: String, lead: Option<i64>| {
            let pool = pool.clone();
            async move {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO employees (employee_code, first_name, last_name, email, team_lead_id, hire_date)
                    VALUES ($1, 'Test', 'User', $1 || '@example.com', $2, CURRENT_DATE)
                    RETURNING id
                    "#,
                )
                .bind(code)
                .bind(lead)
                .fetch_one(&pool)
                .await
                .unwrap()
            }
        };
        let lead_id = insert_employee(format!("lead-{suffix}"), None).await;
        let employee_id = insert_employee(format!("emp-{suffix}"), Some(lead_id)).await;

        let request_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO leave_requests (employee_id, leave_type, start_date, end_date, days, reason, status)
            VALUES ($1, 'casual', CURRENT_DATE, CURRENT_DATE, 1, 'test', $2)
            RETURNING id
            "#,
        )
        .bind(employee_id)
        .bind(RequestStatus::PendingTeamLead.as_ref())
        .fetch_one(&pool)
        .await
        .unwrap();

        let lead = Approver { role: Role::TeamLead, employee_id: Some(lead_id) };
        let snapshot = load_snapshot(&pool, RequestKind::Leave, request_id).await.unwrap().unwrap();
        let stale = decide(&snapshot, &lead, Decision::Reject).unwrap();

        let applied = apply_decision(
            &pool,
            RequestKind::Leave,
            request_id,
            Stage::TeamLead,
            &lead,
            Decision::Approve,
            Some("ok"),
        )
        .await
        .unwrap();
        assert_eq!(applied.to, RequestStatus::PendingManager);

        let written = persist(&pool, RequestKind::Leave, request_id, &stale, &lead, None)
            .await
            .unwrap();
        assert!(!written);

        let status = sqlx::query_scalar::<_, String>("SELECT status FROM leave_requests WHERE id = $1")
            .bind(request_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(status, "Pending Manager Approval");
    }
}
