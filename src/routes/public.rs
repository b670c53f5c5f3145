use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. Mounted under `/api/v1`.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /restaurants
        // Restaurant listing. Reviews are not attached here.
        .route("/restaurants", get(handlers::get_restaurants))
        // GET /restaurants/{id}
        // Restaurant detail with its reviews attached.
        .route("/restaurants/{id}", get(handlers::get_restaurant))
        // GET /reviews/{id}
        .route("/reviews/{id}", get(handlers::get_review))
        // POST /users
        // Account creation; signs the new account in.
        .route("/users", post(handlers::register_user))
        // POST /users/sessions
        // Credential check; sets the session cookie.
        .route("/users/sessions", post(handlers::create_session))
}
