use crate::{
    auth::{
        auth::AuthUser,
        jwt::{Subject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, ApiResult, is_unique_violation},
    model::{role::Role, user::User},
    models::{Claims, LoginReqDto, RegisterReq, TokenPair, TokenType, UserSql},
    utils::login_registry,
};
use actix_web::{HttpRequest, HttpResponse, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

fn token_error(e: jsonwebtoken::errors::Error) -> ApiError {
    ApiError::Internal(format!("token encoding failed: {e}"))
}

/// Inserts a login, linking it to the employee with the same email if one exists.
async fn insert_user(email: &str, password: &str, pool: &PgPool) -> ApiResult<Option<i64>> {
    let hashed = hash_password(password)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;

    let result = sqlx::query_scalar::<_, Option<i64>>(
        r#"
        INSERT INTO users (email, password, role_id, employee_id)
        VALUES ($1, $2, $3, (SELECT id FROM employees WHERE LOWER(email) = $1))
        RETURNING employee_id
        "#,
    )
    .bind(email)
    .bind(hashed)
    .bind(Role::Employee.id())
    .fetch_one(pool)
    .await;

    match result {
        Ok(employee_id) => {
            login_registry::mark_taken(email).await;
            Ok(employee_id)
        }
        Err(e) if is_unique_violation(&e) => Err(ApiError::conflict("Email already registered")),
        Err(e) => Err(e.into()),
    }
}

/// Register a login
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "Login created", body = Object, example = json!({
            "message": "User registered successfully",
            "employee_id": 12
        })),
        (status = 400, description = "Email or password missing"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(user: web::Json<RegisterReq>, pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    let email = login_registry::normalize(&user.email);

    if email.is_empty() || user.password.is_empty() {
        return Err(ApiError::bad_request("Email and password must not be empty"));
    }
    if !email.contains('@') {
        return Err(ApiError::bad_request("Email is not valid"));
    }

    if !login_registry::is_available(&email, pool.get_ref()).await {
        return Err(ApiError::conflict("Email already registered"));
    }

    let employee_id = insert_user(&email, &user.password, pool.get_ref()).await?;
    info!(email = %email, ?employee_id, "Login registered");

    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "employee_id": employee_id
    })))
}

async fn store_refresh_token(pool: &PgPool, claims: &Claims) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES ($1, $2, TO_TIMESTAMP($3))
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as f64)
    .execute(pool)
    .await
    .map(|_| ())
}

fn issue_pair(subject: &Subject, config: &Config) -> ApiResult<(String, String, Claims)> {
    let access = generate_access_token(subject, &config.jwt_secret, config.access_token_ttl)
        .map_err(token_error)?;
    let (refresh, claims) =
        generate_refresh_token(subject, &config.jwt_secret, config.refresh_token_ttl)
            .map_err(token_error)?;
    Ok((access, refresh, claims))
}

/// Log in
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(pool, config, user), fields(email = %user.email))]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    info!("Login request received");

    if user.email.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty email or password");
        return Err(ApiError::bad_request("Email and password required"));
    }

    debug!("Fetching user from database");
    let email = login_registry::normalize(&user.email);

    let db_user = sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, email, password, role_id, employee_id, is_active
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(&email)
    .fetch_optional(pool.get_ref())
    .await?;

    let db_user = match db_user {
        Some(u) if u.is_active => u,
        Some(_) => {
            info!("Invalid credentials: login disabled");
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
    };

    if let Err(e) = verify_password(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }
    debug!(user_id = db_user.id, "Password verified");

    let subject = Subject {
        user_id: db_user.id,
        email: db_user.email.clone(),
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };
    let (access_token, refresh_token, refresh_claims) = issue_pair(&subject, &config)?;

    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");
    store_refresh_token(pool.get_ref(), &refresh_claims).await?;

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login itself
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = db_user.id, "Login successful");

    Ok(HttpResponse::Ok().json(TokenPair {
        access_token,
        refresh_token,
    }))
}

fn refresh_claims_from(req: &HttpRequest, config: &Config) -> Option<Claims> {
    let token = req
        .headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;

    verify_token(token, &config.jwt_secret)
        .ok()
        .filter(|c| c.token_type == TokenType::Refresh)
}

/// Rotate a refresh token
#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token missing, invalid or revoked")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> ApiResult<HttpResponse> {
    let claims = refresh_claims_from(&req, &config)
        .ok_or_else(|| ApiError::Unauthorized("Refresh token required".into()))?;

    // Revoke-and-check in one statement so a token can only be rotated once.
    let revoked = sqlx::query(
        r#"
        UPDATE refresh_tokens
        SET revoked = TRUE
        WHERE jti = $1
        AND revoked = FALSE
        AND expires_at > NOW()
        "#,
    )
    .bind(&claims.jti)
    .execute(pool.get_ref())
    .await?;

    if revoked.rows_affected() == 0 {
        return Err(ApiError::Unauthorized("Refresh token revoked".into()));
    }

    // Pick up role changes made since the token was issued.
    let current = sqlx::query_as::<_, (i16, Option<i64>, bool)>(
        "SELECT role_id, employee_id, is_active FROM users WHERE id = $1",
    )
    .bind(claims.user_id)
    .fetch_optional(pool.get_ref())
    .await?;

    let (role, employee_id) = match current {
        Some((role, employee_id, true)) => (role, employee_id),
        _ => return Err(ApiError::Unauthorized("Login disabled".into())),
    };

    let subject = Subject {
        role,
        employee_id,
        ..Subject::from(&claims)
    };
    let (access_token, refresh_token, new_claims) = issue_pair(&subject, &config)?;
    store_refresh_token(pool.get_ref(), &new_claims).await?;

    Ok(HttpResponse::Ok().json(TokenPair {
        access_token,
        refresh_token,
    }))
}

/// Revoke a refresh token
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Logged out (also when the token was unknown)")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    config: web::Data<Config>,
) -> HttpResponse {
    let Some(claims) = refresh_claims_from(&req, &config) else {
        return HttpResponse::NoContent().finish();
    };

    // idempotent
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = $1")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}

#[derive(Serialize, ToSchema)]
pub struct MeResponse {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub employee_id: Option<i64>,
}

/// The caller's identity
#[utoipa::path(
    get,
    path = "/api/me",
    responses((status = 200, body = MeResponse), (status = 401)),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> HttpResponse {
    HttpResponse::Ok().json(MeResponse {
        user_id: auth.user_id,
        email: auth.email,
        role: auth.role,
        employee_id: auth.employee_id,
    })
}

#[derive(Deserialize, ToSchema)]
pub struct SetRole {
    pub role: Role,
    /// Link the login to an employee record at the same time
    pub employee_id: Option<i64>,
}

/// Change a login's role (Admin)
#[utoipa::path(
    put,
    path = "/api/users/{user_id}/role",
    params(("user_id" = i64, Path, description = "Login id")),
    request_body = SetRole,
    responses(
        (status = 200, description = "Role updated"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Login not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn set_role(
    auth: AuthUser,
    pool: web::Data<PgPool>,
    path: web::Path<i64>,
    body: web::Json<SetRole>,
) -> ApiResult<HttpResponse> {
    auth.require_admin()?;
    let user_id = path.into_inner();

    if user_id == auth.user_id && body.role != Role::Admin {
        return Err(ApiError::bad_request("Admins cannot demote themselves"));
    }

    let result = sqlx::query(
        r#"
        UPDATE users
        SET role_id = $1,
            employee_id = COALESCE($2, employee_id)
        WHERE id = $3
        "#,
    )
    .bind(body.role.id())
    .bind(body.employee_id)
    .bind(user_id)
    .execute(pool.get_ref())
    .await?;

    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("Login not found"));
    }

    info!(user_id, role = %body.role, by = auth.user_id, "Role changed");

    Ok(HttpResponse::Ok().json(json!({
        "message": "Role updated",
        "role": body.role
    })))
}

/// All logins (Admin)
#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "Logins without password hashes"), (status = 403)),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn list_users(auth: AuthUser, pool: web::Data<PgPool>) -> ApiResult<HttpResponse> {
    auth.require_admin()?;

    let users = sqlx::query_as::<_, User>(
        "SELECT id, email, role_id, employee_id, is_active, last_login_at FROM users ORDER BY id",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(users))
}
