use axum::{
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use storefront_backend::{
    config::Config, database::pool::create_pool, middleware::auth::require_session, routes,
    AppState,
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    let pool = create_pool(&config).await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool, &config)?;

    let public_api = Router::new()
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .route(
            "/api/auth/forgot-password",
            post(routes::auth::forgot_password),
        )
        .route(
            "/api/auth/reset-password",
            post(routes::auth::reset_password),
        )
        .route("/api/auth/verify-email", post(routes::auth::verify_email))
        .route(
            "/api/auth/resend-verification",
            post(routes::auth::resend_verification),
        );

    let session_api = Router::new()
        .route("/api/auth/logout", post(routes::auth::logout))
        .route(
            "/api/users/profile",
            get(routes::profile::get_profile).put(routes::profile::update_profile),
        )
        .route(
            "/api/users/change-password",
            put(routes::profile::change_password),
        )
        .layer(axum::middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    let app = Router::new()
        .route("/health", get(routes::health::health))
        .merge(public_api)
        .merge(session_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
