use chrono::{DateTime, Utc};
use serde::Serialize;

/// Login row as exposed to admins (never the password hash).
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role_id: i16,
    pub employee_id: Option<i64>,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
}
