mod api;
mod config;
mod database;
mod middleware;
mod models;
mod services;
mod state;
mod utils;
mod validation;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::AppConfig;
use crate::state::AppState;

fn cors_for(origins: &[String]) -> Cors {
    let cors = if origins.is_empty() {
        Cors::default().allow_any_origin()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![
            actix_web::http::header::AUTHORIZATION,
            actix_web::http::header::CONTENT_TYPE,
            actix_web::http::header::ACCEPT,
        ])
        .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
        .max_age(3600)
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;

    log::info!("🚀 Starting Contacts Service...");

    let db = database::MongoDB::new(&config.database_url)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("Failed to connect to MongoDB: {}", e)))?;

    log::info!("✅ MongoDB connected successfully");

    let host = config.host.clone();
    let port = config.port;
    let cors_origins = config.cors_origins.clone();

    let state = AppState::with_mongodb(config, &db);
    state.avatars.ensure_dirs()?;
    let avatars_dir = state.avatars.avatars_dir().to_path_buf();

    if state.config.sendgrid_api_key.is_none() {
        log::warn!("⚠️  SENDGRID_API_KEY not set, verification links will only be logged");
    }

    let state = web::Data::new(state);

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("🖼️  Avatars served from {}", avatars_dir.display());

    let openapi = api::swagger::ApiDoc::openapi();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_for(&cors_origins))
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone())
            )
            .service(actix_files::Files::new("/avatars", avatars_dir.clone()))
            .configure(api::configure)
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
