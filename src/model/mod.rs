pub mod attendance;
pub mod employee;
pub mod intern;
pub mod leave_request;
pub mod overtime_request;
pub mod permission_request;
pub mod role;
pub mod user;
pub mod work_submission;
