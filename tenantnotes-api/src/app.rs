/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use tenantnotes_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = tenantnotes_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::config::Config;
use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tenantnotes_shared::auth::middleware::{session_auth_middleware, SessionAuth};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned into every handler through `State`.
#[derive(Clone)]
pub struct AppState {
    /// Coordinator connection pool
    pub db: PgPool,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
        }
    }

    /// Secret used to sign and verify session tokens
    pub fn session_secret(&self) -> &str {
        &self.config.session.secret
    }

    fn session_auth(&self) -> SessionAuth {
        SessionAuth::new(self.db.clone(), self.session_secret())
    }
}

/// Builds the complete router
///
/// ```text
/// /
/// ├── GET  /health
/// └── /v1/
///     ├── /auth/
///     │   ├── POST /register
///     │   └── POST /login
///     ├── GET  /me               (session)
///     └── /notes                 (session)
///         ├── GET  /
///         ├── POST /
///         ├── GET  /:id
///         └── PUT  /:id
/// ```
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let session_routes = Router::new()
        .route("/me", get(routes::me::me))
        .route(
            "/notes",
            get(routes::notes::list_notes).post(routes::notes::create_note),
        )
        .route(
            "/notes/:id",
            get(routes::notes::get_note).put(routes::notes::update_note),
        )
        .route_layer(middleware::from_fn_with_state(
            state.session_auth(),
            session_auth_middleware,
        ));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .merge(session_routes);

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .max_age(std::time::Duration::from_secs(3600))
}
