/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use colabora_api::{app::AppState, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let state = AppState::new(pool, config);
/// let app = colabora_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::ApiError,
    middleware::{format::negotiate_format, role::require_roles},
    realtime::RealtimeHub,
    routes,
    storage::{FileStorage, LocalDiskStorage},
};
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use colabora_shared::{
    auth::middleware::{authenticate, token_from_headers},
    models::user::UserRole,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Every field is reference counted, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Real-time room registry
    pub hub: RealtimeHub,

    /// Where attached files are written
    pub storage: Arc<dyn FileStorage>,
}

impl AppState {
    /// Creates application state storing uploads on local disk
    pub fn new(db: PgPool, config: Config) -> Self {
        let storage = LocalDiskStorage::new(config.uploads.dir.clone());
        Self::with_storage(db, config, Arc::new(storage))
    }

    /// Creates application state with a custom storage backend
    pub fn with_storage(db: PgPool, config: Config, storage: Arc<dyn FileStorage>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            hub: RealtimeHub::new(),
            storage,
        }
    }

    /// Gets JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health                    # Health check (public)
/// ├── GET  /ws?token=…                # WebSocket notifications
/// ├── GET  /uploads/*                 # Attached files
/// └── /api/
///     ├── /auth/                      # Public
///     │   ├── POST /registro
///     │   └── POST /login
///     ├── /proyectos/                 # JWT
///     │   ├── POST   /                # admin, member
///     │   ├── GET    /
///     │   ├── GET    /:id
///     │   ├── PUT    /:id             # admin, member
///     │   ├── DELETE /:id             # admin, member
///     │   └── POST   /:id/invitar     # admin, member
///     └── /tareas/                    # JWT
///         ├── POST   /                # admin, member (multipart or JSON)
///         ├── GET    /
///         ├── GET    /:id
///         └── PATCH  /:id/estado      # admin, member
/// ```
///
/// # Middleware Stack
///
/// Outermost first:
/// 1. CORS (tower-http CorsLayer)
/// 2. Logging (tower-http TraceLayer)
/// 3. Response format negotiation (JSON or XML)
/// 4. JWT authentication (per route group)
/// 5. Role guard (per route)
pub fn build_router(state: AppState) -> Router {
    let writers = from_fn_with_state(UserRole::WRITERS, require_roles);
    let jwt = from_fn_with_state(state.clone(), jwt_auth_layer);

    let auth_routes = Router::new()
        .route("/registro", post(routes::auth::register))
        .route("/login", post(routes::auth::login));

    let project_routes = Router::new()
        .route(
            "/",
            post(routes::projects::create_project)
                .route_layer(writers.clone())
                .get(routes::projects::list_projects),
        )
        .route(
            "/:id",
            axum::routing::put(routes::projects::update_project)
                .delete(routes::projects::delete_project)
                .route_layer(writers.clone())
                .get(routes::projects::get_project),
        )
        .route(
            "/:id/invitar",
            post(routes::projects::invite_collaborator).route_layer(writers.clone()),
        )
        .route_layer(jwt.clone());

    let task_routes = Router::new()
        .route(
            "/",
            post(routes::tasks::create_task)
                .route_layer(DefaultBodyLimit::max(state.config.uploads.max_request_bytes))
                .route_layer(writers.clone())
                .get(routes::tasks::list_tasks),
        )
        .route("/:id", get(routes::tasks::get_task))
        .route(
            "/:id/estado",
            axum::routing::patch(routes::tasks::update_task_state).route_layer(writers),
        )
        .route_layer(jwt);

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/proyectos", project_routes)
        .nest("/tareas", task_routes);

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    let uploads = ServeDir::new(&state.config.uploads.dir);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/ws", get(routes::ws::ws_handler))
        .nest("/api", api_routes)
        .nest_service("/uploads", uploads)
        .fallback(routes::not_found)
        .layer(from_fn(negotiate_format))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Extracts and validates the bearer token, loads the user it belongs to,
/// then injects an `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = token_from_headers(req.headers())?;
    let auth = authenticate(&state.db, state.jwt_secret(), token).await?;

    req.extensions_mut().insert(auth);

    Ok(next.run(req).await)
}
