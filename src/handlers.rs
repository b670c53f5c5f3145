use crate::{
    AppState, aggregate,
    auth::{self, AuthUser},
    authz,
    error::{AppError, AppResult, ErrorBody},
    extract::AppJson,
    models::{
        CreateReviewRequest, NewUser, RegisterUserRequest, Restaurant, RestaurantWithReviews,
        Review, SessionRequest, SessionResponse, UserProfile,
    },
    reviews,
};
use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};

// --- Restaurants ---

/// get_restaurants
///
/// [Public Route] Lists every restaurant without reviews attached.
#[utoipa::path(
    get,
    path = "/api/v1/restaurants",
    responses((status = 200, description = "All restaurants", body = [Restaurant]))
)]
pub async fn get_restaurants(State(state): State<AppState>) -> AppResult<Json<Vec<Restaurant>>> {
    let restaurants = aggregate::get_all(state.repo.as_ref()).await?;
    Ok(Json(restaurants))
}

/// get_restaurant
///
/// [Public Route] One restaurant with its reviews attached under `reviews`.
#[utoipa::path(
    get,
    path = "/api/v1/restaurants/{id}",
    params(("id" = String, Path, description = "Restaurant ID")),
    responses(
        (status = 200, description = "Restaurant with reviews", body = RestaurantWithReviews),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_restaurant(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<RestaurantWithReviews>> {
    let restaurant = aggregate::get_by_id(state.repo.as_ref(), &id).await?;
    let mut detail = RestaurantWithReviews::from(restaurant);
    detail.add_reviews(state.repo.as_ref()).await?;
    Ok(Json(detail))
}

// --- Reviews ---

/// create_review
///
/// [Authenticated Route] Posts a review on a restaurant. The author is always the
/// session's user; `stars` may arrive as a number or a numeric string.
#[utoipa::path(
    post,
    path = "/api/v1/restaurants/{id}/reviews",
    params(("id" = String, Path, description = "Restaurant ID")),
    request_body = CreateReviewRequest,
    responses(
        (status = 200, description = "Created", body = Review),
        (status = 400, description = "Malformed body or stars is not an integer", body = ErrorBody),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 404, description = "Restaurant not found", body = ErrorBody)
    )
)]
pub async fn create_review(
    user: AuthUser,
    State(state): State<AppState>,
    Path(restaurant_id): Path<String>,
    AppJson(payload): AppJson<CreateReviewRequest>,
) -> AppResult<Json<Review>> {
    let stars = payload.coerce_stars()?;
    let review = reviews::create(
        state.repo.as_ref(),
        &restaurant_id,
        &user,
        stars,
        payload.detail,
    )
    .await?;
    Ok(Json(review))
}

/// get_review
///
/// [Public Route] A single review by ID.
#[utoipa::path(
    get,
    path = "/api/v1/reviews/{id}",
    params(("id" = String, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Found", body = Review),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Review>> {
    reviews::get_by_id(state.repo.as_ref(), &id)
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Review"))
}

/// delete_review
///
/// [Authenticated Route] Deletes a review. Precedence: 401 (no session), then 404
/// (no such review), then 403 (neither author nor administrator).
#[utoipa::path(
    delete,
    path = "/api/v1/reviews/{id}",
    params(("id" = String, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Deleted; body is the removed review", body = Review),
        (status = 401, description = "No session", body = ErrorBody),
        (status = 403, description = "Not the author or administrator", body = ErrorBody),
        (status = 404, description = "Not Found", body = ErrorBody)
    )
)]
pub async fn delete_review(
    user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<Review>> {
    let repo = state.repo.as_ref();
    authz::authorize_delete(repo, &user, &id, &state.config.admin_email).await?;
    // A concurrent delete may win between the check and here; that surfaces as 404.
    let removed = reviews::delete_by_id(repo, &id).await?;
    Ok(Json(removed))
}

// --- Users & Sessions ---

/// register_user
///
/// [Public Route] Creates an account and signs it in.
#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = RegisterUserRequest,
    responses(
        (status = 200, description = "Registered", body = UserProfile),
        (status = 400, description = "Malformed body or missing email or password", body = ErrorBody),
        (status = 409, description = "Email already registered", body = ErrorBody)
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterUserRequest>,
) -> AppResult<impl IntoResponse> {
    let email = payload.email.trim().to_string();
    if email.is_empty() || payload.password.is_empty() {
        return Err(AppError::Validation(
            "email and password are required".to_string(),
        ));
    }

    let password_hash = auth::hash_password(&payload.password, state.config.bcrypt_cost).await?;
    let user = state
        .repo
        .create_user(NewUser {
            first_name: payload.first_name,
            last_name: payload.last_name,
            email,
            password_hash,
        })
        .await?;
    tracing::info!(user_id = %user.id, "user registered");

    let token = auth::issue_session_token(
        &user.id,
        &state.config.session_secret,
        state.config.session_ttl_secs,
    )?;
    let cookie = auth::session_cookie_for(token, &state.config);

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(UserProfile::from(user)),
    ))
}

/// create_session
///
/// [Public Route] Exchanges credentials for a session cookie. Unknown email and wrong
/// password are indistinguishable to the caller.
#[utoipa::path(
    post,
    path = "/api/v1/users/sessions",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 400, description = "Malformed body", body = ErrorBody),
        (status = 401, description = "Invalid credentials", body = ErrorBody)
    )
)]
pub async fn create_session(
    State(state): State<AppState>,
    AppJson(payload): AppJson<SessionRequest>,
) -> AppResult<impl IntoResponse> {
    let user = state
        .repo
        .get_user_by_email(payload.email.trim())
        .await?
        .ok_or(AppError::Unauthenticated)?;

    if !auth::verify_password(&payload.password, &user.password_hash).await? {
        return Err(AppError::Unauthenticated);
    }

    let token = auth::issue_session_token(
        &user.id,
        &state.config.session_secret,
        state.config.session_ttl_secs,
    )?;
    let cookie = auth::session_cookie_for(token, &state.config);
    tracing::info!(user_id = %user.id, "session started");

    Ok((
        [(header::SET_COOKIE, cookie.to_string())],
        Json(SessionResponse {
            message: "Signed in successfully!".to_string(),
        }),
    ))
}

/// delete_session
///
/// [Authenticated Route] Signs out by expiring the session cookie.
#[utoipa::path(
    delete,
    path = "/api/v1/users/sessions",
    responses(
        (status = 200, description = "Signed out", body = SessionResponse),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn delete_session(user: AuthUser) -> impl IntoResponse {
    tracing::info!(user_id = %user.id, "session ended");
    (
        [(header::SET_COOKIE, auth::clear_session_cookie().to_string())],
        Json(SessionResponse {
            message: "Signed out successfully!".to_string(),
        }),
    )
}

/// get_me
///
/// [Authenticated Route] The signed-in user's profile.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "No session", body = ErrorBody)
    )
)]
pub async fn get_me(user: AuthUser, State(state): State<AppState>) -> AppResult<Json<UserProfile>> {
    state
        .repo
        .get_user(&user.id)
        .await?
        .map(|u| Json(UserProfile::from(u)))
        .ok_or(AppError::Unauthenticated)
}
