use crate::approval::Approver;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
    pub email: String,
    pub role: Role,

    /// Present only if this login is linked to an employee record
    pub employee_id: Option<i64>,
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already decoded by auth_middleware on protected routes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, ApiError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::Unauthorized("Missing token".into()))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| ApiError::Internal("Config missing".into()))?;

    AuthUser::from_token(token, &config.jwt_secret)
}

impl AuthUser {
    /// Decodes an access token into the caller's identity.
    pub fn from_token(token: &str, secret: &str) -> Result<AuthUser, ApiError> {
        let claims = verify_token(token, secret)
            .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

        if claims.token_type != TokenType::Access {
            return Err(ApiError::Unauthorized("Access token required".into()));
        }

        let role = Role::from_id(claims.role)
            .ok_or_else(|| ApiError::Unauthorized("Invalid role".into()))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            email: claims.sub,
            role,
            employee_id: claims.employee_id,
        })
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    pub fn require_manager_or_admin(&self) -> Result<(), ApiError> {
        if self.role.is_manager_level() {
            Ok(())
        } else {
            Err(ApiError::forbidden("Manager/Admin only"))
        }
    }

    /// Team leads act on their own reports; admins may stand in.
    pub fn require_team_lead(&self) -> Result<(), ApiError> {
        if matches!(self.role, Role::TeamLead | Role::Admin) {
            Ok(())
        } else {
            Err(ApiError::forbidden("Team lead only"))
        }
    }

    pub fn require_employee_profile(&self) -> Result<i64, ApiError> {
        self.employee_id
            .ok_or_else(|| ApiError::forbidden("No employee profile"))
    }

    /// Whether this caller may read a record owned by `owner_employee_id`.
    pub fn can_view(&self, owner_employee_id: i64, owner_team_lead_id: Option<i64>) -> bool {
        self.role.is_manager_level()
            || self.employee_id == Some(owner_employee_id)
            || (owner_team_lead_id.is_some() && self.employee_id == owner_team_lead_id)
    }

    pub fn approver(&self) -> Approver {
        Approver {
            role: self.role,
            employee_id: self.employee_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{Subject, generate_access_token, generate_refresh_token};

    fn user(role: Role, employee_id: Option<i64>) -> AuthUser {
        AuthUser {
            user_id: 1,
            email: "a@b.c".into(),
            role,
            employee_id,
        }
    }

    fn subject(role: Role) -> Subject {
        Subject {
            user_id: 5,
            email: "e@company.com".into(),
            role: role.id(),
            employee_id: Some(11),
        }
    }

    #[test]
    fn guards_follow_roles() {
        assert!(user(Role::Admin, None).require_admin().is_ok());
        assert!(user(Role::Manager, None).require_admin().is_err());
        assert!(user(Role::Manager, None).require_manager_or_admin().is_ok());
        assert!(user(Role::TeamLead, None).require_manager_or_admin().is_err());
        assert!(user(Role::TeamLead, None).require_team_lead().is_ok());
        assert!(user(Role::Employee, None).require_team_lead().is_err());
        assert!(user(Role::Employee, None).require_employee_profile().is_err());
        assert_eq!(user(Role::Employee, Some(3)).require_employee_profile().unwrap(), 3);
    }

    #[test]
    fn visibility_rules() {
        let me = user(Role::Employee, Some(3));
        assert!(me.can_view(3, None));
        assert!(!me.can_view(4, Some(9)));

        let lead = user(Role::TeamLead, Some(9));
        assert!(lead.can_view(4, Some(9)));
        assert!(!lead.can_view(4, None));

        assert!(user(Role::Manager, Some(1)).can_view(4, None));
    }

    #[test]
    fn access_token_decodes_to_user() {
        let token = generate_access_token(&subject(Role::TeamLead), "k", 60).unwrap();
        let user = AuthUser::from_token(&token, "k").unwrap();
        assert_eq!(user.role, Role::TeamLead);
        assert_eq!(user.employee_id, Some(11));
    }

    #[test]
    fn refresh_token_is_not_accepted_for_api_calls() {
        let (token, _) = generate_refresh_token(&subject(Role::Employee), "k", 60).unwrap();
        assert!(matches!(
            AuthUser::from_token(&token, "k"),
            Err(ApiError::Unauthorized(_))
        ));
    }
}
