use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReq {
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "john.doe@company.com")]
    pub email: String,
    #[schema(example = "s3cret-pass")]
    pub password: String,
}

#[derive(FromRow)]
pub struct UserSql {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub role_id: i16,
    pub employee_id: Option<i64>,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub sub: String,
    pub role: i16, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
    /// Present only if this login is linked to an employee record
    pub employee_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}
