use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod aggregate;
pub mod auth;
pub mod authz;
pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod reviews;

pub mod routes;
use auth::AuthUser;
use routes::{authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every route, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_restaurants, handlers::get_restaurant, handlers::create_review,
        handlers::get_review, handlers::delete_review, handlers::register_user,
        handlers::create_session, handlers::delete_session, handlers::get_me
    ),
    components(
        schemas(
            models::Restaurant, models::Review, models::RestaurantWithReviews,
            models::CreateReviewRequest, models::RegisterUserRequest, models::SessionRequest,
            models::SessionResponse, models::UserProfile, error::ErrorBody,
        )
    ),
    tags(
        (name = "restaurant-reviews", description = "Restaurants and their reviews")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, cheaply clonable state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in deployment, in-memory for tests and local runs.
    pub repo: RepositoryState,
    pub config: AppConfig,
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Enforces a session on every route of `authenticated_routes`.
///
/// *Mechanism*: taking `AuthUser` as an argument runs the extractor before the handler.
/// Without a valid session (or the opted-in header bypass) the extractor rejects with
/// `AppError::Unauthenticated` and the handler never executes, so a delete request with
/// no session is a 401 whether or not the review exists. On success the actor is stored
/// in the request extensions; the handler's own `AuthUser` argument picks it up from
/// there instead of verifying the token and reading the store a second time.
async fn auth_middleware(user: AuthUser, mut request: Request, next: Next) -> Response {
    request.extensions_mut().insert(user);
    next.run(request).await
}

/// create_router
///
/// Assembles the application's entire routing structure, applies global and scoped
/// middleware, and registers the application state.
///
/// Layout:
/// - `/swagger-ui` and `/api-docs/openapi.json`: generated API documentation.
/// - `/health`: liveness check, no state required.
/// - `/api/v1/...`: the public and authenticated routers, merged.
///
/// Every response, including errors and 401s from the session layer, passes through
/// the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for request correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Router Assembly
    // Public and authenticated routers share paths (GET vs DELETE /reviews/{id}). The
    // session layer is attached with `route_layer` before merging, so it wraps only the
    // authenticated methods and unmatched paths still produce 404 rather than 401.
    let api = Router::new().merge(public::public_routes()).merge(
        authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        )),
    );

    // 3. Base Router Assembly
    let base_router = Router::new()
        // Documentation: serve the generated Swagger UI and OpenAPI document.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Liveness check.
        .route("/health", get(|| async { "ok" }))
        // Versioned API.
        .nest("/api/v1", api)
        // Apply the shared state to all routes.
        .with_state(state);

    // 4. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 4a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 4b. Request Tracing: one span per request, carrying the request ID.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 4c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 5. CORS Layer (outermost)
        .layer(cors)
}

/// trace_span_logger
///
/// Span for each request, carrying method, uri and the `x-request-id` set above so
/// every log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
