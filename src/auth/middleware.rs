use crate::auth::auth::AuthUser;
use crate::config::Config;
use crate::error::ApiError;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| ApiError::Internal("App config missing".into()))?;

    let auth_user = match bearer_token(&req)
        .and_then(|token| AuthUser::from_token(token, &config.jwt_secret))
    {
        Ok(user) => user,
        Err(err) => {
            tracing::debug!(path = %req.path(), error = %err, "Rejected unauthenticated request");
            let resp = err.error_response();
            return Ok(req.into_response(resp));
        }
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}

fn bearer_token(req: &ServiceRequest) -> Result<&str, ApiError> {
    let header_value = req
        .headers()
        .get("Authorization")
        .ok_or_else(|| ApiError::Unauthorized("Missing Authorization header".into()))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized("Invalid Authorization header encoding".into()))?;

    header_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::Unauthorized("Authorization header must start with Bearer".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{Subject, generate_access_token};
    use crate::config::test_config;
    use crate::model::role::Role;
    use actix_web::{App, HttpResponse, http::StatusCode, middleware::from_fn, test, web};

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(format!("{}:{}", user.user_id, user.role))
    }

    fn token(secret: &str) -> String {
        let subject = Subject {
            user_id: 9,
            email: "m@company.com".into(),
            role: Role::Manager.id(),
            employee_id: Some(2),
        };
        generate_access_token(&subject, secret, 60).unwrap()
    }

    #[actix_web::test]
    async fn missing_header_is_401_with_json_body() {
        let app = test::init_service(
            App::new()
                .app_data(Data::new(test_config()))
                .service(web::scope("/api").wrap(from_fn(auth_middleware)).route("/me", web::get().to(whoami))),
        )
        .await;

        let resp = test::call_service(&app, test::TestRequest::get().uri("/api/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["error"], "Unauthorized");
        assert_eq!(body["details"], "Missing Authorization header");
    }

    #[actix_web::test]
    async fn valid_token_reaches_handler() {
        let config = test_config();
        let bearer = format!("Bearer {}", token(&config.jwt_secret));
        let app = test::init_service(
            App::new()
                .app_data(Data::new(config))
                .service(web::scope("/api").wrap(from_fn(auth_middleware)).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", bearer))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, "9:manager");
    }

    #[actix_web::test]
    async fn token_signed_elsewhere_is_rejected() {
        let bearer = format!("Bearer {}", token("someone-else"));
        let app = test::init_service(
            App::new()
                .app_data(Data::new(test_config()))
                .service(web::scope("/api").wrap(from_fn(auth_middleware)).route("/me", web::get().to(whoami))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", bearer))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
