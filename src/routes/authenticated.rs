use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{delete, get, post},
};

/// Authenticated Router Module
///
/// Endpoints that need an actor. The session middleware is layered onto this router
/// in `create_router`, so every handler here can rely on `AuthUser` resolving.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // POST /restaurants/{id}/reviews
        // The review's author is bound from the session, never the body.
        .route("/restaurants/{id}/reviews", post(handlers::create_review))
        // DELETE /reviews/{id}
        // Author or administrator only; see `authz::authorize_delete`.
        .route("/reviews/{id}", delete(handlers::delete_review))
        // GET /users/me
        .route("/users/me", get(handlers::get_me))
        // DELETE /users/sessions
        // Sign out.
        .route("/users/sessions", delete(handlers::delete_session))
}
