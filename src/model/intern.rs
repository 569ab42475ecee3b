use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 3,
        "full_name": "Priya Sharma",
        "email": "priya@college.edu",
        "phone": null,
        "college": "City Engineering College",
        "department": "Engineering",
        "mentor_id": 4,
        "start_date": "2026-01-05",
        "end_date": "2026-06-30",
        "stipend": 15000.0,
        "status": "active",
        "created_at": "2026-01-02T10:00:00Z"
    })
)]
pub struct Intern {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub college: Option<String>,
    pub department: Option<String>,
    /// Supervising employee
    pub mentor_id: Option<i64>,
    #[schema(format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[schema(format = "date", value_type = Option<String>)]
    pub end_date: Option<NaiveDate>,
    pub stipend: Option<f64>,
    pub status: String,
    #[schema(format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

pub const STATUSES: &[&str] = &["active", "completed", "terminated"];

pub const DATE_COLUMNS: &[&str] = &["start_date", "end_date"];

pub const UPDATABLE_COLUMNS: &[&str] = &[
    "full_name",
    "email",
    "phone",
    "college",
    "department",
    "mentor_id",
    "start_date",
    "end_date",
    "stipend",
    "status",
];
