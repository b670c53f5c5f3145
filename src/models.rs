use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

// --- Core Entities (Mapped to Database) ---

/// Restaurant
///
/// A row from the `restaurants` table. Restaurants are seeded by migration and are
/// read-only for the API. Identifiers are integer keys in the store but travel as
/// opaque strings on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Restaurant {
    pub id: String,
    pub name: String,
    pub cuisine: String,
    /// Price tier, 1 (cheap) to 3 (expensive).
    pub cost: i32,
    pub image: String,
    pub website: String,
}

/// Review
///
/// A row from the `reviews` table. `user_id` is the account that wrote the review and
/// never changes after insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Review {
    pub id: String,
    pub restaurant_id: String,
    pub user_id: String,
    pub stars: i32,
    pub detail: String,
}

/// RestaurantWithReviews
///
/// Read-time projection used by the detail endpoint: the restaurant's own fields with
/// its reviews attached under `reviews`. Nothing here is ever written back to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RestaurantWithReviews {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub reviews: Vec<Review>,
}

/// User
///
/// Account record from the `users` table. Holds the password hash, so it is never
/// serialized; handlers respond with `UserProfile` instead.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// NewUser
///
/// Insert payload for the `users` table, built after the password has been hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

/// NewReview
///
/// Insert payload for the `reviews` table. `user_id` always comes from the resolved
/// session, never from the request body.
#[derive(Debug, Clone)]
pub struct NewReview {
    pub restaurant_id: String,
    pub user_id: String,
    pub stars: i32,
    pub detail: String,
}

// --- Request Payloads ---

/// CreateReviewRequest
///
/// Body of `POST /restaurants/{id}/reviews`. Clients send `stars` either as a number or
/// as a numeric string, so it is kept raw here and coerced by `coerce_stars`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateReviewRequest {
    #[schema(value_type = i32, example = 4)]
    #[ts(type = "number | string")]
    pub stars: Value,
    pub detail: String,
}

impl CreateReviewRequest {
    /// coerce_stars
    ///
    /// Accepts JSON integers and strings holding an integer ("5", " 3 ").
    /// Anything else is a validation failure.
    pub fn coerce_stars(&self) -> AppResult<i32> {
        let parsed = match &self.stars {
            Value::Number(n) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        };
        parsed.ok_or_else(|| AppError::Validation("stars must be an integer".to_string()))
    }
}

/// RegisterUserRequest
///
/// Body of `POST /users`. The password is hashed before it reaches the repository and
/// is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct RegisterUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

/// SessionRequest
///
/// Body of `POST /users/sessions`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionRequest {
    pub email: String,
    pub password: String,
}

// --- Response Payloads ---

/// UserProfile
///
/// Public view of an account, safe to return to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UserProfile {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
        }
    }
}

/// SessionResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionResponse {
    pub message: String,
}
