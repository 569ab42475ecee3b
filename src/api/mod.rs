pub mod approvals;
pub mod attendance;
pub mod employee;
pub mod intern;
pub mod leave_request;
pub mod overtime;
pub mod permission_request;
pub mod report;
pub mod requests;
pub mod work_submission;
