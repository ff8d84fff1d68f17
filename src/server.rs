//! Web server implementation with Axum

use crate::config::Config;
use crate::error::{AppError, RequestId};
use crate::handlers::{article, auth, issue, journal, user, volume};
use crate::middleware::{auth_rate_limit_middleware, RateLimiter};
use crate::models::auth::{AuthContext, JwtService, TokenIssuer, TokenKind};
use crate::storage::{BlobStore, LocalBlobStore};
use crate::store::Store;
use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header::HeaderValue, HeaderName, Method, Uri},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub tokens: Arc<dyn TokenIssuer>,
    pub blobs: Arc<dyn BlobStore>,
    pub rate_limiter: Arc<RateLimiter>,
}

// Ensure AppState satisfies the bounds required by Axum's State extractor
const _: fn() = || {
    fn assert_bounds<T: Clone + Send + Sync + 'static>() {}
    assert_bounds::<AppState>();
};

impl AppState {
    /// Build state around a store, with JWT tokens and local file storage
    pub fn new(config: Config, store: Arc<dyn Store>) -> Result<Self, AppError> {
        let tokens = JwtService::new(
            &config.jwt.secret,
            config.jwt.issuer.clone(),
            config.jwt.expiration as i64,
            config.jwt.refresh_expiration as i64,
        )?;
        let blobs = LocalBlobStore::new(&config.storage.local_path);

        Ok(AppState {
            config: Arc::new(config),
            store,
            tokens: Arc::new(tokens),
            blobs: Arc::new(blobs),
            rate_limiter: Arc::new(RateLimiter::new()),
        })
    }

    /// Whether role policies are checked on mutating endpoints
    pub fn enforce_policies(&self) -> bool {
        self.config.features.enforce_policies
    }
}

/// Application router with every layer applied
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.storage.max_upload_bytes;

    let mut router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes());

    if state.config.features.serve_media {
        let media_url = format!("/{}", state.config.storage.media_url.trim_matches('/'));
        router = router.nest_service(&media_url, ServeDir::new(&state.config.storage.local_path));
    }

    if state.config.features.rate_limiting {
        router = router.layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            auth_rate_limit_middleware,
        ));
    }

    router
        .fallback(not_found_handler)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .server
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any)
}

/// API routes, mounted under `/api`
fn api_routes() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/signup/", post(auth::signup))
        .route("/login/", post(auth::login))
        .route("/token/refresh/", post(auth::refresh))
        .route("/users/", get(user::list_users).post(user::create_user))
        .route("/users/:id/", get(user::get_user).put(user::update_user))
        // Journals and read models
        .route("/journals/", get(journal::list_journals).post(journal::create_journal))
        .route("/journals/detailed/", get(journal::journals_detailed))
        .route(
            "/journals/:slug/",
            get(journal::get_journal)
                .put(journal::update_journal)
                .delete(journal::delete_journal),
        )
        .route(
            "/journals/:slug/volumes/:volume_id/:issue_id/",
            get(journal::issue_in_journal),
        )
        .route("/journals_data/:slug", get(journal::journal_data))
        .route("/journals_data/:slug/", get(journal::journal_data))
        // Volumes
        .route("/volumes/", get(volume::list_volumes).post(volume::create_volume))
        .route(
            "/volumes/:id/",
            get(volume::get_volume)
                .put(volume::update_volume)
                .delete(volume::delete_volume),
        )
        // Issues
        .route("/issues/", get(issue::list_issues).post(issue::create_issue))
        .route(
            "/issues/:id/",
            get(issue::get_issue)
                .put(issue::update_issue)
                .delete(issue::delete_issue),
        )
        // Articles
        .route("/articles/", get(article::list_articles).post(article::create_article))
        .route("/articles/issue/:issue_id/", get(article::articles_by_issue))
        .route(
            "/articles/:slug/",
            get(article::get_article)
                .put(article::update_article)
                .delete(article::delete_article),
        )
        .route("/articles/:slug/upload/", post(article::upload_files))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now(),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Not found handler
async fn not_found_handler(uri: Uri) -> AppError {
    AppError::not_found("Endpoint", uri.path())
}

/// Request ID middleware; reuses a well-formed incoming `x-request-id`
async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| uuid::Uuid::parse_str(value).ok())
        .map(RequestId)
        .unwrap_or_else(RequestId::generate);

    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Attaches an `AuthContext` when a valid bearer token is presented.
///
/// Requests without a token pass through anonymously; a bad token is a 401.
async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);

    let Some(token) = token else {
        return next.run(request).await;
    };

    let context = state
        .tokens
        .verify(&token, TokenKind::Access)
        .and_then(AuthContext::try_from);

    match context {
        Ok(context) if context.is_expired() => {
            AppError::Authentication("Token has expired".to_string()).into_response()
        }
        Ok(context) => {
            request.extensions_mut().insert(context);
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}

/// Logging middleware
async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let start_time = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start_time.elapsed();
    let status = response.status();

    match status.as_u16() {
        400..=499 => {
            warn!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status = %status,
                duration_ms = %duration.as_millis(),
                "Client error"
            );
        }
        500..=599 => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status = %status,
                duration_ms = %duration.as_millis(),
                "Server error"
            );
        }
        _ => {
            info!(
                request_id = %request_id,
                method = %method,
                uri = %uri,
                status = %status,
                duration_ms = %duration.as_millis(),
                "Request completed"
            );
        }
    }

    response
}

/// Start the web server
pub async fn start_server(state: AppState) -> Result<(), AppError> {
    let bind_address = state.config.server.bind_address();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {}: {}", bind_address, e)))?;

    info!("Server listening on {}", bind_address);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|e| AppError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}
