use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "id": 1,
        "employee_code": "EMP-001",
        "first_name": "John",
        "last_name": "Doe",
        "email": "john.doe@company.com",
        "phone": "+8801712345678",
        "department": "Engineering",
        "designation": "Software Engineer",
        "team_lead_id": 4,
        "hire_date": "2024-01-01",
        "status": "active",
        "created_at": "2024-01-01T09:00:00Z"
    })
)]
pub struct Employee {
    #[schema(example = 1)]
    pub id: i64,

    #[schema(example = "EMP-001")]
    pub employee_code: String,

    #[schema(example = "John")]
    pub first_name: String,

    #[schema(example = "Doe")]
    pub last_name: String,

    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "+8801712345678", nullable = true)]
    pub phone: Option<String>,

    #[schema(example = "Engineering", nullable = true)]
    pub department: Option<String>,

    #[schema(example = "Software Engineer", nullable = true)]
    pub designation: Option<String>,

    /// Direct team lead; first-line approver for this employee's requests
    #[schema(example = 4, nullable = true)]
    pub team_lead_id: Option<i64>,

    #[schema(example = "2024-01-01", value_type = String, format = "date")]
    pub hire_date: NaiveDate,

    #[schema(example = "active")]
    pub status: String,

    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

impl Employee {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Columns an admin may change through the partial update endpoint.
pub const UPDATABLE_COLUMNS: &[&str] = &[
    "employee_code",
    "first_name",
    "last_name",
    "email",
    "phone",
    "department",
    "designation",
    "team_lead_id",
    "hire_date",
    "status",
];

pub const DATE_COLUMNS: &[&str] = &["hire_date"];

pub const STATUSES: &[&str] = &["active", "inactive"];
