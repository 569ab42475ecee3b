use crate::{
    api::{
        approvals, attendance, employee, intern, leave_request, overtime, permission_request,
        report, work_submission,
    },
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};

/// Per-IP limiter allowing `requests_per_min` with a burst of the same size.
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);

    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .unwrap_or_default();
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(build_limiter(config.rate_register_per_min))
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(build_limiter(config.rate_refresh_per_min))
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(build_limiter(config.rate_login_per_min))
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(build_limiter(config.rate_protected_per_min))
            .route("/me", web::get().to(handlers::me))
            .route("/users", web::get().to(handlers::list_users))
            .route("/users/{id}/role", web::put().to(handlers::set_role))
            .service(
                web::scope("/employee")
                    .service(
                        web::resource("")
                            .route(web::post().to(employee::create_employee))
                            .route(web::get().to(employee::list_employees)),
                    )
                    // before /{id}
                    .route("/me", web::get().to(employee::my_profile))
                    .route("/team", web::get().to(employee::my_team))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .route("", web::get().to(attendance::list_attendance))
                    .route("/check-in", web::post().to(attendance::check_in))
                    .route("/check-out", web::put().to(attendance::check_out))
                    .route("/today", web::get().to(attendance::today_status))
                    .route("/history", web::get().to(attendance::my_history)),
            )
            .service(
                web::scope("/leave")
                    .route("", web::post().to(leave_request::create_leave))
                    .route("/mine", web::get().to(leave_request::my_leaves))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(leave_request::get_leave))
                            .route(web::delete().to(leave_request::withdraw_leave)),
                    ),
            )
            .service(
                web::scope("/permission")
                    .route("", web::post().to(permission_request::create_permission))
                    .route("/mine", web::get().to(permission_request::my_permissions))
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(permission_request::get_permission))
                            .route(web::delete().to(permission_request::withdraw_permission)),
                    ),
            )
            .service(
                web::scope("/overtime")
                    .route("", web::post().to(overtime::create_overtime))
                    .route("/start", web::post().to(overtime::start_overtime))
                    .route("/end", web::post().to(overtime::end_overtime))
                    .route("/mine", web::get().to(overtime::my_overtime))
                    .route("/{id}", web::get().to(overtime::get_overtime)),
            )
            .service(
                web::scope("/work-submissions")
                    .route("", web::post().to(work_submission::create_work_submission))
                    .route("/mine", web::get().to(work_submission::my_work_submissions))
                    .route("/{id}", web::delete().to(work_submission::withdraw_work_submission)),
            )
            .service(
                web::scope("/team-lead/approvals")
                    .route("/{kind}", web::get().to(approvals::team_lead_queue))
                    .route("/{kind}/{id}", web::put().to(approvals::team_lead_decide)),
            )
            .service(
                web::resource("/manager/final-approvals/{kind}")
                    .route(web::get().to(approvals::manager_queue))
                    .route(web::put().to(approvals::manager_decide))
                    .route(web::patch().to(approvals::manager_decide_bulk)),
            )
            .service(
                web::scope("/interns")
                    .service(
                        web::resource("")
                            .route(web::post().to(intern::create_intern))
                            .route(web::get().to(intern::list_interns)),
                    )
                    .service(
                        web::resource("/{id}")
                            .route(web::get().to(intern::get_intern))
                            .route(web::put().to(intern::update_intern))
                            .route(web::delete().to(intern::delete_intern)),
                    ),
            )
            .service(
                web::scope("/reports")
                    .route("/attendance", web::get().to(report::attendance_report))
                    .route("/leave", web::get().to(report::leave_report))
                    .route("/overtime", web::get().to(report::overtime_report)),
            ),
    );
}

// LOGIN
//  ├─ access_token (ACCESS_TOKEN_TTL)
//  └─ refresh_token (REFRESH_TOKEN_TTL, jti stored)
//
// API REQUEST
//  └─ Authorization: Bearer access_token
//
// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ old jti revoked, new pair returned
