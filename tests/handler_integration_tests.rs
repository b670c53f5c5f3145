use async_trait::async_trait;
use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use restaurant_reviews::{
    AppError, AppResult, AppState, InMemoryRepository,
    auth::AuthUser,
    config::AppConfig,
    extract::AppJson,
    handlers,
    models::{
        CreateReviewRequest, NewReview, NewUser, RegisterUserRequest, Restaurant, Review,
        SessionRequest, User, UserProfile,
    },
    repository::Repository,
};
use serde_json::json;
use std::sync::Arc;
use tokio::test;

// --- FAILING REPOSITORY ---

// Every call fails the way a dropped database connection would.
struct BrokenRepo;

fn pool_closed<T>() -> AppResult<T> {
    Err(AppError::Database(sqlx::Error::PoolClosed))
}

#[async_trait]
impl Repository for BrokenRepo {
    async fn get_restaurants(&self) -> AppResult<Vec<Restaurant>> {
        pool_closed()
    }
    async fn get_restaurant(&self, _id: &str) -> AppResult<Option<Restaurant>> {
        pool_closed()
    }
    async fn get_reviews_for_restaurant(&self, _restaurant_id: &str) -> AppResult<Vec<Review>> {
        pool_closed()
    }
    async fn get_review(&self, _id: &str) -> AppResult<Option<Review>> {
        pool_closed()
    }
    async fn create_review(&self, _review: NewReview) -> AppResult<Review> {
        pool_closed()
    }
    async fn delete_review(&self, _id: &str) -> AppResult<Review> {
        pool_closed()
    }
    async fn get_user(&self, _id: &str) -> AppResult<Option<User>> {
        pool_closed()
    }
    async fn get_user_by_email(&self, _email: &str) -> AppResult<Option<User>> {
        pool_closed()
    }
    async fn create_user(&self, _user: NewUser) -> AppResult<User> {
        pool_closed()
    }
}

// --- TEST UTILITIES ---

fn seeded_state() -> AppState {
    AppState {
        repo: Arc::new(InMemoryRepository::seeded()),
        config: AppConfig::default(),
    }
}

fn broken_state() -> AppState {
    AppState {
        repo: Arc::new(BrokenRepo),
        config: AppConfig::default(),
    }
}

fn actor(id: &str, email: &str) -> AuthUser {
    AuthUser {
        id: id.to_string(),
        email: email.to_string(),
    }
}

fn owner_of_review_one() -> AuthUser {
    actor("1", "ada@example.com")
}

fn stranger() -> AuthUser {
    actor("2", "ben@example.com")
}

fn admin() -> AuthUser {
    actor("4", "admin")
}

fn review_request(stars: serde_json::Value, detail: &str) -> AppJson<CreateReviewRequest> {
    AppJson(CreateReviewRequest {
        stars,
        detail: detail.to_string(),
    })
}

fn status_of(err: AppError) -> StatusCode {
    err.into_response().status()
}

// --- RESTAURANT HANDLERS ---

#[test]
async fn test_get_restaurants_lists_seed() {
    let Json(restaurants) = handlers::get_restaurants(State(seeded_state())).await.unwrap();

    assert_eq!(restaurants.len(), 4);
    assert_eq!(restaurants[0].name, "Pip's Original");
    assert_eq!(restaurants[3].name, "Salt & Straw");
}

#[test]
async fn test_get_restaurant_attaches_reviews() {
    let Json(detail) = handlers::get_restaurant(State(seeded_state()), Path("1".to_string()))
        .await
        .unwrap();

    assert_eq!(detail.restaurant.id, "1");
    assert_eq!(detail.restaurant.cuisine, "American");
    let details: Vec<&str> = detail.reviews.iter().map(|r| r.detail.as_str()).collect();
    assert_eq!(
        details,
        vec!["Best restaurant ever!", "Terrible service :(", "It was fine."]
    );
}

#[test]
async fn test_get_restaurant_without_reviews_has_empty_list() {
    let Json(detail) = handlers::get_restaurant(State(seeded_state()), Path("4".to_string()))
        .await
        .unwrap();

    assert!(detail.reviews.is_empty());
}

#[test]
async fn test_get_restaurant_not_found() {
    let err = handlers::get_restaurant(State(seeded_state()), Path("42".to_string()))
        .await
        .unwrap_err();

    assert_eq!(status_of(err), StatusCode::NOT_FOUND);
}

#[test]
async fn test_store_failure_surfaces_as_internal_error() {
    let err = handlers::get_restaurants(State(broken_state()))
        .await
        .unwrap_err();

    let response = err.into_response();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    // Driver details are not leaked to clients.
    assert_eq!(body["message"], "Internal server error");
    assert_eq!(body["status"], 500);
}

// --- REVIEW HANDLERS ---

#[test]
async fn test_create_review_binds_session_user() {
    let Json(review) = handlers::create_review(
        actor("3", "cora@example.com"),
        State(seeded_state()),
        Path("2".to_string()),
        review_request(json!(4), "Here is the comment you ordered"),
    )
    .await
    .unwrap();

    assert_eq!(review.id, "4");
    assert_eq!(review.user_id, "3");
    assert_eq!(review.restaurant_id, "2");
    assert_eq!(review.stars, 4);
}

#[test]
async fn test_create_review_coerces_string_stars() {
    let Json(review) = handlers::create_review(
        stranger(),
        State(seeded_state()),
        Path("1".to_string()),
        review_request(json!("5"), "New review"),
    )
    .await
    .unwrap();

    assert_eq!(review.stars, 5);
}

#[test]
async fn test_create_review_rejects_non_integer_stars() {
    for stars in [json!("five"), json!(4.5), json!(null), json!([5])] {
        let err = handlers::create_review(
            stranger(),
            State(seeded_state()),
            Path("1".to_string()),
            review_request(stars, "x"),
        )
        .await
        .unwrap_err();

        assert_eq!(status_of(err), StatusCode::BAD_REQUEST);
    }
}

#[test]
async fn test_create_review_for_missing_restaurant() {
    let err = handlers::create_review(
        stranger(),
        State(seeded_state()),
        Path("9".to_string()),
        review_request(json!(3), "ghost"),
    )
    .await
    .unwrap_err();

    assert_eq!(status_of(err), StatusCode::NOT_FOUND);
}

#[test]
async fn test_get_review_found_and_missing() {
    let state = seeded_state();
    let Json(review) = handlers::get_review(State(state.clone()), Path("2".to_string()))
        .await
        .unwrap();
    assert_eq!(review.user_id, "2");

    let err = handlers::get_review(State(state), Path("20".to_string()))
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::NOT_FOUND);
}

#[test]
async fn test_delete_review_by_owner() {
    let state = seeded_state();
    let Json(removed) =
        handlers::delete_review(owner_of_review_one(), State(state.clone()), Path("1".to_string()))
            .await
            .unwrap();

    assert_eq!(removed.id, "1");
    assert!(state.repo.get_review("1").await.unwrap().is_none());
}

#[test]
async fn test_delete_review_forbidden_for_stranger() {
    let state = seeded_state();
    let err = handlers::delete_review(stranger(), State(state.clone()), Path("1".to_string()))
        .await
        .unwrap_err();

    assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    // The review survives a denied delete.
    assert!(state.repo.get_review("1").await.unwrap().is_some());
}

#[test]
async fn test_delete_review_admin_override() {
    let state = seeded_state();
    let Json(removed) = handlers::delete_review(admin(), State(state), Path("1".to_string()))
        .await
        .unwrap();

    assert_eq!(removed.user_id, "1");
}

#[test]
async fn test_delete_missing_review_is_not_found_even_for_strangers() {
    let err = handlers::delete_review(stranger(), State(seeded_state()), Path("404".to_string()))
        .await
        .unwrap_err();

    assert_eq!(status_of(err), StatusCode::NOT_FOUND);
}

#[test]
async fn test_delete_twice_yields_not_found() {
    let state = seeded_state();
    let Json(first) =
        handlers::delete_review(owner_of_review_one(), State(state.clone()), Path("1".to_string()))
            .await
            .unwrap();
    assert_eq!(first.id, "1");
    let err =
        handlers::delete_review(owner_of_review_one(), State(state), Path("1".to_string()))
            .await
            .unwrap_err();

    assert_eq!(status_of(err), StatusCode::NOT_FOUND);
}

#[test]
async fn test_admin_identity_follows_config() {
    let state = AppState {
        config: AppConfig {
            admin_email: "root@example.com".to_string(),
            ..AppConfig::default()
        },
        ..seeded_state()
    };

    // The default identity no longer carries any override.
    let err = handlers::delete_review(admin(), State(state.clone()), Path("1".to_string()))
        .await
        .unwrap_err();
    assert_eq!(status_of(err), StatusCode::FORBIDDEN);

    let Json(removed) = handlers::delete_review(
        actor("5", "root@example.com"),
        State(state),
        Path("1".to_string()),
    )
    .await
    .unwrap();
    assert_eq!(removed.id, "1");
}

// --- USER HANDLERS ---

fn registration(email: &str) -> RegisterUserRequest {
    RegisterUserRequest {
        first_name: "Madison".to_string(),
        last_name: "Czarapata".to_string(),
        email: email.to_string(),
        password: "654321".to_string(),
    }
}

#[test]
async fn test_register_user_sets_session_cookie() {
    let response = handlers::register_user(
        State(seeded_state()),
        AppJson(registration("madison@test.com")),
    )
    .await
    .unwrap()
    .into_response();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let profile: UserProfile = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(profile.id, "4");
    assert_eq!(profile.email, "madison@test.com");
}

#[test]
async fn test_register_duplicate_email_conflicts() {
    let state = seeded_state();
    handlers::register_user(State(state.clone()), AppJson(registration("dup@test.com")))
        .await
        .unwrap();
    let err = handlers::register_user(State(state), AppJson(registration("dup@test.com")))
        .await
        .err()
        .unwrap();

    assert_eq!(status_of(err), StatusCode::CONFLICT);
}

#[test]
async fn test_create_session_with_valid_and_invalid_password() {
    let state = seeded_state();
    handlers::register_user(State(state.clone()), AppJson(registration("login@test.com")))
        .await
        .unwrap();

    let ok = handlers::create_session(
        State(state.clone()),
        AppJson(SessionRequest {
            email: "login@test.com".to_string(),
            password: "654321".to_string(),
        }),
    )
    .await
    .unwrap()
    .into_response();
    assert_eq!(ok.status(), StatusCode::OK);
    assert!(ok.headers().contains_key(header::SET_COOKIE));

    let err = handlers::create_session(
        State(state),
        AppJson(SessionRequest {
            email: "login@test.com".to_string(),
            password: "wrong".to_string(),
        }),
    )
    .await
    .err()
    .unwrap();
    assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
}

#[test]
async fn test_seeded_accounts_cannot_sign_in() {
    let err = handlers::create_session(
        State(seeded_state()),
        AppJson(SessionRequest {
            email: "ada@example.com".to_string(),
            password: "".to_string(),
        }),
    )
    .await
    .err()
    .unwrap();

    assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
}

#[test]
async fn test_get_me_returns_profile() {
    let Json(profile) = handlers::get_me(owner_of_review_one(), State(seeded_state()))
        .await
        .unwrap();

    assert_eq!(profile.first_name, "Ada");
}
