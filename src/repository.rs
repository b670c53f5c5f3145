use crate::{
    error::{AppError, AppResult},
    models::{NewReview, NewUser, Restaurant, Review, User},
};
use async_trait::async_trait;
use sqlx::PgPool;
use std::{collections::BTreeMap, sync::Arc};
use tokio::sync::RwLock;

/// Repository Trait
///
/// The persistence contract the handlers are written against. Lookups return
/// `Option` so callers decide whether absence is a 404; failures of the store itself
/// come back as `AppError` and surface as a 500.
///
/// Identifiers are opaque strings at this boundary. An id that is not a valid store
/// key behaves exactly like an id with no row behind it.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Restaurants ---
    /// All restaurants in ascending id order, without reviews.
    async fn get_restaurants(&self) -> AppResult<Vec<Restaurant>>;
    async fn get_restaurant(&self, id: &str) -> AppResult<Option<Restaurant>>;

    // --- Reviews ---
    /// Reviews whose `restaurant_id` matches, ascending by id.
    async fn get_reviews_for_restaurant(&self, restaurant_id: &str) -> AppResult<Vec<Review>>;
    async fn get_review(&self, id: &str) -> AppResult<Option<Review>>;
    async fn create_review(&self, review: NewReview) -> AppResult<Review>;
    /// Atomic check-and-remove. A second delete of the same id yields `NotFound`.
    async fn delete_review(&self, id: &str) -> AppResult<Review>;

    // --- Users ---
    async fn get_user(&self, id: &str) -> AppResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// Fails with `Conflict` when the email is already registered.
    async fn create_user(&self, user: NewUser) -> AppResult<User>;
}

/// RepositoryState
///
/// The shared handle stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// parse_key
///
/// Store keys are integers, but ids are compared as opaque text: the key is only
/// accepted when it prints back as exactly `id`. `"01"`, `"+1"` and `" 1"` therefore
/// match no row, the same as `"abc"`.
fn parse_key(id: &str) -> Option<i64> {
    id.parse::<i64>()
        .ok()
        .filter(|key| key.to_string() == id)
}

// --- Postgres ---

/// PostgresRepository
///
/// `Repository` backed by PostgreSQL. Queries are checked at runtime so the crate
/// builds without a live database.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations (schema plus seed restaurants and reviews).
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

const RESTAURANT_COLUMNS: &str =
    "CAST(id AS TEXT) AS id, name, cuisine, cost, image, website";
const REVIEW_COLUMNS: &str = "CAST(id AS TEXT) AS id, CAST(restaurant_id AS TEXT) AS restaurant_id, \
     CAST(user_id AS TEXT) AS user_id, stars, detail";
const USER_COLUMNS: &str =
    "CAST(id AS TEXT) AS id, first_name, last_name, email, password_hash";

// Constraint names declared in the initial migration.
const RESTAURANT_FK: &str = "reviews_restaurant_id_fkey";
const USER_FK: &str = "reviews_user_id_fkey";

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_restaurants(&self) -> AppResult<Vec<Restaurant>> {
        let query = format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants ORDER BY id ASC");
        let restaurants = sqlx::query_as::<_, Restaurant>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(restaurants)
    }

    async fn get_restaurant(&self, id: &str) -> AppResult<Option<Restaurant>> {
        let Some(key) = parse_key(id) else {
            return Ok(None);
        };
        let query = format!("SELECT {RESTAURANT_COLUMNS} FROM restaurants WHERE id = $1");
        let restaurant = sqlx::query_as::<_, Restaurant>(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(restaurant)
    }

    async fn get_reviews_for_restaurant(&self, restaurant_id: &str) -> AppResult<Vec<Review>> {
        let Some(key) = parse_key(restaurant_id) else {
            return Ok(vec![]);
        };
        let query = format!(
            "SELECT {REVIEW_COLUMNS} FROM reviews WHERE restaurant_id = $1 ORDER BY id ASC"
        );
        let reviews = sqlx::query_as::<_, Review>(&query)
            .bind(key)
            .fetch_all(&self.pool)
            .await?;
        Ok(reviews)
    }

    async fn get_review(&self, id: &str) -> AppResult<Option<Review>> {
        let Some(key) = parse_key(id) else {
            return Ok(None);
        };
        let query = format!("SELECT {REVIEW_COLUMNS} FROM reviews WHERE id = $1");
        let review = sqlx::query_as::<_, Review>(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(review)
    }

    async fn create_review(&self, review: NewReview) -> AppResult<Review> {
        let restaurant_id = parse_key(&review.restaurant_id).ok_or(AppError::NotFound("Restaurant"))?;
        let user_id = parse_key(&review.user_id).ok_or(AppError::Unauthenticated)?;
        let query = format!(
            "INSERT INTO reviews (restaurant_id, user_id, stars, detail) \
             VALUES ($1, $2, $3, $4) RETURNING {REVIEW_COLUMNS}"
        );
        let created = sqlx::query_as::<_, Review>(&query)
            .bind(restaurant_id)
            .bind(user_id)
            .bind(review.stars)
            .bind(review.detail)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_foreign_key_violation() => match db.constraint() {
                    // The author's account was removed after the session resolved.
                    Some(USER_FK) => AppError::Unauthenticated,
                    // The restaurant vanished between the existence check and the insert.
                    Some(RESTAURANT_FK) => AppError::NotFound("Restaurant"),
                    _ => AppError::Database(e),
                },
                _ => AppError::Database(e),
            })?;
        Ok(created)
    }

    async fn delete_review(&self, id: &str) -> AppResult<Review> {
        let key = parse_key(id).ok_or(AppError::NotFound("Review"))?;
        let query = format!("DELETE FROM reviews WHERE id = $1 RETURNING {REVIEW_COLUMNS}");
        sqlx::query_as::<_, Review>(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound("Review"))
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        let Some(key) = parse_key(id) else {
            return Ok(None);
        };
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let query = format!(
            "INSERT INTO users (first_name, last_name, email, password_hash) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let email = user.email.clone();
        sqlx::query_as::<_, User>(&query)
            .bind(user.first_name)
            .bind(user.last_name)
            .bind(user.email)
            .bind(user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e.as_database_error() {
                Some(db) if db.is_unique_violation() => {
                    AppError::Conflict(format!("An account for {email} already exists"))
                }
                _ => AppError::Database(e),
            })
    }
}

// --- In-Memory ---

#[derive(Default)]
struct Tables {
    restaurants: BTreeMap<i64, Restaurant>,
    reviews: BTreeMap<i64, Review>,
    users: BTreeMap<i64, User>,
    next_restaurant_id: i64,
    next_review_id: i64,
    next_user_id: i64,
}

impl Tables {
    fn allocate(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// InMemoryRepository
///
/// `Repository` kept entirely in process memory behind a single `RwLock`. Used by the
/// test suite and by local runs without `DATABASE_URL`. Ids are allocated from
/// per-table counters, so ordering by key is insertion order.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

/// Fixture restaurants as (name, cuisine, cost, image, website).
const SEED_RESTAURANTS: [(&str, &str, i32, &str, &str); 4] = [
    (
        "Pip's Original",
        "American",
        1,
        "https://media-cdn.tripadvisor.com/media/photo-o/05/dd/53/67/an-assortment-of-donuts.jpg",
        "http://www.PipsOriginal.com",
    ),
    (
        "Mucca Osteria",
        "Italian",
        3,
        "https://media-cdn.tripadvisor.com/media/photo-m/1280/13/af/df/89/duck.jpg",
        "http://www.muccaosteria.com",
    ),
    (
        "Mediterranean Exploration Company",
        "Mediterranean",
        2,
        "https://media-cdn.tripadvisor.com/media/photo-m/1280/1c/f2/e5/0c/dinner.jpg",
        "http://www.mediterraneanexplorationcompany.com/",
    ),
    (
        "Salt & Straw",
        "American",
        2,
        "https://media-cdn.tripadvisor.com/media/photo-o/0d/d6/a1/06/chocolate-gooey-brownie.jpg",
        "https://saltandstraw.com/pages/nw-23",
    ),
];

/// Fixture users as (first, last, email). Their password hash is the locked
/// marker `!`, so they own reviews but cannot sign in.
const SEED_USERS: [(&str, &str, &str); 3] = [
    ("Ada", "Fields", "ada@example.com"),
    ("Ben", "Ortiz", "ben@example.com"),
    ("Cora", "Lund", "cora@example.com"),
];

/// Fixture reviews as (restaurant_id, user_id, stars, detail).
const SEED_REVIEWS: [(i64, i64, i32, &str); 3] = [
    (1, 1, 5, "Best restaurant ever!"),
    (1, 2, 1, "Terrible service :("),
    (1, 3, 4, "It was fine."),
];

impl InMemoryRepository {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the same fixture rows the SQL migrations insert.
    pub fn seeded() -> Self {
        let mut tables = Tables::default();
        for (name, cuisine, cost, image, website) in SEED_RESTAURANTS {
            let id = Tables::allocate(&mut tables.next_restaurant_id);
            tables.restaurants.insert(
                id,
                Restaurant {
                    id: id.to_string(),
                    name: name.to_string(),
                    cuisine: cuisine.to_string(),
                    cost,
                    image: image.to_string(),
                    website: website.to_string(),
                },
            );
        }
        for (first_name, last_name, email) in SEED_USERS {
            let id = Tables::allocate(&mut tables.next_user_id);
            tables.users.insert(
                id,
                User {
                    id: id.to_string(),
                    first_name: first_name.to_string(),
                    last_name: last_name.to_string(),
                    email: email.to_string(),
                    password_hash: "!".to_string(),
                },
            );
        }
        for (restaurant_id, user_id, stars, detail) in SEED_REVIEWS {
            let id = Tables::allocate(&mut tables.next_review_id);
            tables.reviews.insert(
                id,
                Review {
                    id: id.to_string(),
                    restaurant_id: restaurant_id.to_string(),
                    user_id: user_id.to_string(),
                    stars,
                    detail: detail.to_string(),
                },
            );
        }
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Inserts a restaurant directly. Restaurants have no API write path; tests and
    /// local tooling use this to build their own fixtures.
    pub async fn insert_restaurant(&self, mut restaurant: Restaurant) -> Restaurant {
        let mut tables = self.tables.write().await;
        let id = Tables::allocate(&mut tables.next_restaurant_id);
        restaurant.id = id.to_string();
        tables.restaurants.insert(id, restaurant.clone());
        restaurant
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_restaurants(&self) -> AppResult<Vec<Restaurant>> {
        let tables = self.tables.read().await;
        Ok(tables.restaurants.values().cloned().collect())
    }

    async fn get_restaurant(&self, id: &str) -> AppResult<Option<Restaurant>> {
        let tables = self.tables.read().await;
        Ok(parse_key(id).and_then(|key| tables.restaurants.get(&key).cloned()))
    }

    async fn get_reviews_for_restaurant(&self, restaurant_id: &str) -> AppResult<Vec<Review>> {
        let Some(key) = parse_key(restaurant_id) else {
            return Ok(vec![]);
        };
        let key = key.to_string();
        let tables = self.tables.read().await;
        Ok(tables
            .reviews
            .values()
            .filter(|review| review.restaurant_id == key)
            .cloned()
            .collect())
    }

    async fn get_review(&self, id: &str) -> AppResult<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(parse_key(id).and_then(|key| tables.reviews.get(&key).cloned()))
    }

    async fn create_review(&self, review: NewReview) -> AppResult<Review> {
        let mut tables = self.tables.write().await;
        let restaurant_key = parse_key(&review.restaurant_id)
            .filter(|key| tables.restaurants.contains_key(key))
            .ok_or(AppError::NotFound("Restaurant"))?;
        if !parse_key(&review.user_id).is_some_and(|key| tables.users.contains_key(&key)) {
            return Err(AppError::Unauthenticated);
        }
        let id = Tables::allocate(&mut tables.next_review_id);
        let created = Review {
            id: id.to_string(),
            restaurant_id: restaurant_key.to_string(),
            user_id: review.user_id,
            stars: review.stars,
            detail: review.detail,
        };
        tables.reviews.insert(id, created.clone());
        Ok(created)
    }

    async fn delete_review(&self, id: &str) -> AppResult<Review> {
        let mut tables = self.tables.write().await;
        parse_key(id)
            .and_then(|key| tables.reviews.remove(&key))
            .ok_or(AppError::NotFound("Review"))
    }

    async fn get_user(&self, id: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(parse_key(id).and_then(|key| tables.users.get(&key).cloned()))
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(AppError::Conflict(format!(
                "An account for {} already exists",
                user.email
            )));
        }
        let id = Tables::allocate(&mut tables.next_user_id);
        let created = User {
            id: id.to_string(),
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            password_hash: user.password_hash,
        };
        tables.users.insert(id, created.clone());
        Ok(created)
    }
}
