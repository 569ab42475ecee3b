use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

mod api;
mod approval;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod routes;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::utils::attendance_cache::AttendanceCache;
use crate::utils::login_registry;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Employee Management API"
}

fn io_error(err: anyhow::Error) -> std::io::Error {
    std::io::Error::other(format!("{err:#}"))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = Config::from_env().map_err(io_error)?;

    // Rolling daily log plus stdout, both filtered by RUST_LOG
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
        .with(fmt::layer().with_target(false))
        .init();

    info!(addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config).await.map_err(io_error)?;

    let pool_for_warmup = pool.clone();
    actix_web::rt::spawn(async move {
        // Logins seen in the last 30 days go into the positive cache
        if let Err(e) = login_registry::warmup(&pool_for_warmup, 30, 250).await {
            error!(error = %e, "Failed to warm up login registry");
        }
    });

    let server_addr = config.server_addr.clone();
    let attendance_cache = AttendanceCache::default();

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                // wildcard so the UI's JS/CSS assets resolve
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(attendance_cache.clone()))
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config))
    })
    .bind(server_addr)?
    .run()
    .await
}
