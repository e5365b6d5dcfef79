use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use schoolhub_api::{config::Config, db, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let state = AppState {
        db: pool,
        config: config.clone(),
    };

    // Allow the configured base URL; localhost is always fine for development.
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") || o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-admin-key"),
        ]))
        .allow_origin(cors_origin);

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        // Schools
        .route(
            "/schools",
            get(routes::schools::list_schools).post(routes::schools::create_school),
        )
        .route("/schools/generate-code", post(routes::schools::generate_code))
        .route("/schools/profile", get(routes::schools::get_profile))
        .route("/schools/{id}", patch(routes::schools::update_school))
        // Settings
        .route(
            "/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        .route(
            "/settings/module-access",
            put(routes::settings::update_module_access),
        )
        // Timetable
        .route(
            "/timetable/config",
            get(routes::timetable::get_config).put(routes::timetable::upsert_config),
        )
        .route(
            "/timetable/versions",
            get(routes::timetable::list_versions).post(routes::timetable::create_version),
        )
        .route(
            "/timetable/versions/{id}/activate",
            post(routes::timetable::activate_version),
        )
        .route(
            "/timetable/versions/{id}/publish",
            post(routes::timetable::publish_version),
        )
        .route(
            "/timetable/versions/{id}/slots",
            get(routes::timetable::list_slots).post(routes::timetable::assign_slot),
        )
        .route("/timetable/slots/{id}", patch(routes::timetable::edit_slot))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("schoolhub API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
