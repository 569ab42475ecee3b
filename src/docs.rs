use crate::api::approvals::{
    BulkDecisionReq, BulkOutcome, DecisionReq, DecisionResponse, FinalDecisionReq, SkippedItem,
};
use crate::api::attendance::{AttendanceListResponse, CheckOutReq};
use crate::api::employee::{CreateEmployee, EmployeeListResponse};
use crate::api::intern::{CreateIntern, InternListResponse};
use crate::api::leave_request::CreateLeave;
use crate::api::overtime::{EndOvertime, ManualOvertime};
use crate::api::permission_request::CreatePermission;
use crate::api::report::{
    AttendanceReport, AttendanceSummary, LeaveReport, LeaveSummary, OvertimeReport,
    OvertimeSummary,
};
use crate::api::work_submission::CreateWorkSubmission;
use crate::approval::{ApprovalTrail, Decision, RequestKind, RequestStatus, Stage};
use crate::auth::handlers::{MeResponse, SetRole};
use crate::model::attendance::{Attendance, DailyState, TodayStatus};
use crate::model::employee::Employee;
use crate::model::intern::Intern;
use crate::model::leave_request::{LeaveRequest, LeaveType};
use crate::model::overtime_request::OvertimeRequest;
use crate::model::permission_request::PermissionRequest;
use crate::model::role::Role;
use crate::model::work_submission::WorkSubmission;
use crate::models::{LoginReqDto, RegisterReq, TokenPair};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Employee Management API",
        version = "1.0.0",
        description = r#"
## Employee & Intern Management

Back end for day-to-day people operations:

- **Attendance**: daily check-in / check-out with a server-authoritative "today" state
- **Requests**: leave, short permissions, overtime sessions and daily work submissions
- **Approvals**: team lead first, manager final approval (`/api/manager/final-approvals/{kind}`)
- **Interns** and **reports** for admins and managers

### Status flow
`Pending Team Lead` → `Pending Manager Approval` → `Approved` / `Rejected`.
Overtime sessions are `In Progress` until ended.

### Errors
Every error body is `{"error": "...", "details": "..."}`.

### Security
Endpoints under `/api` need `Authorization: Bearer <access_token>` from `/auth/login`.
"#,
    ),
    paths(
        crate::auth::handlers::register,
        crate::auth::handlers::login,
        crate::auth::handlers::refresh_token,
        crate::auth::handlers::logout,
        crate::auth::handlers::me,
        crate::auth::handlers::set_role,
        crate::auth::handlers::list_users,

        crate::api::employee::create_employee,
        crate::api::employee::list_employees,
        crate::api::employee::my_profile,
        crate::api::employee::my_team,
        crate::api::employee::get_employee,
        crate::api::employee::update_employee,
        crate::api::employee::delete_employee,

        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today_status,
        crate::api::attendance::my_history,
        crate::api::attendance::list_attendance,

        crate::api::leave_request::create_leave,
        crate::api::leave_request::my_leaves,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::withdraw_leave,

        crate::api::permission_request::create_permission,
        crate::api::permission_request::my_permissions,
        crate::api::permission_request::get_permission,
        crate::api::permission_request::withdraw_permission,

        crate::api::overtime::start_overtime,
        crate::api::overtime::end_overtime,
        crate::api::overtime::create_overtime,
        crate::api::overtime::my_overtime,
        crate::api::overtime::get_overtime,

        crate::api::work_submission::create_work_submission,
        crate::api::work_submission::my_work_submissions,
        crate::api::work_submission::withdraw_work_submission,

        crate::api::approvals::team_lead_queue,
        crate::api::approvals::team_lead_decide,
        crate::api::approvals::manager_queue,
        crate::api::approvals::manager_decide,
        crate::api::approvals::manager_decide_bulk,

        crate::api::intern::create_intern,
        crate::api::intern::list_interns,
        crate::api::intern::get_intern,
        crate::api::intern::update_intern,
        crate::api::intern::delete_intern,

        crate::api::report::attendance_report,
        crate::api::report::leave_report,
        crate::api::report::overtime_report
    ),
    components(
        schemas(
            RegisterReq,
            LoginReqDto,
            TokenPair,
            MeResponse,
            SetRole,
            Role,
            Employee,
            CreateEmployee,
            EmployeeListResponse,
            Attendance,
            DailyState,
            TodayStatus,
            CheckOutReq,
            AttendanceListResponse,
            RequestStatus,
            RequestKind,
            Stage,
            Decision,
            ApprovalTrail,
            LeaveType,
            LeaveRequest,
            CreateLeave,
            PermissionRequest,
            CreatePermission,
            OvertimeRequest,
            EndOvertime,
            ManualOvertime,
            WorkSubmission,
            CreateWorkSubmission,
            DecisionReq,
            FinalDecisionReq,
            BulkDecisionReq,
            DecisionResponse,
            SkippedItem,
            BulkOutcome,
            Intern,
            CreateIntern,
            InternListResponse,
            AttendanceSummary,
            AttendanceReport,
            LeaveSummary,
            LeaveReport,
            OvertimeSummary,
            OvertimeReport
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Login, tokens and roles"),
        (name = "Employee", description = "Employee records"),
        (name = "Attendance", description = "Daily check-in / check-out"),
        (name = "Leave", description = "Leave requests"),
        (name = "Permission", description = "Short absences within a day"),
        (name = "Overtime", description = "Overtime sessions"),
        (name = "Work submissions", description = "Daily work summaries"),
        (name = "Approvals", description = "Team lead and manager queues"),
        (name = "Interns", description = "Intern records"),
        (name = "Reports", description = "Admin/manager summaries"),
    )
)]
pub struct ApiDoc;

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
