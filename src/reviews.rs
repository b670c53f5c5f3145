//! Single-review operations.

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::{NewReview, Review},
    repository::Repository,
};

/// The review, or `None` when no review has that id.
pub async fn get_by_id(repo: &dyn Repository, id: &str) -> AppResult<Option<Review>> {
    repo.get_review(id).await
}

/// create
///
/// Writes a review for `restaurant_id` owned by `author`. The restaurant must exist;
/// ownership comes from the session, never from client input.
pub async fn create(
    repo: &dyn Repository,
    restaurant_id: &str,
    author: &AuthUser,
    stars: i32,
    detail: String,
) -> AppResult<Review> {
    if repo.get_restaurant(restaurant_id).await?.is_none() {
        return Err(AppError::NotFound("Restaurant"));
    }
    let review = repo
        .create_review(NewReview {
            restaurant_id: restaurant_id.to_string(),
            user_id: author.id.clone(),
            stars,
            detail,
        })
        .await?;
    tracing::info!(review_id = %review.id, restaurant_id = %review.restaurant_id, "review created");
    Ok(review)
}

/// Removes the review and returns it; `NotFound` if it is already gone.
pub async fn delete_by_id(repo: &dyn Repository, id: &str) -> AppResult<Review> {
    let review = repo.delete_review(id).await?;
    tracing::info!(review_id = %review.id, "review deleted");
    Ok(review)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRepository;

    fn author() -> AuthUser {
        AuthUser {
            id: "3".to_string(),
            email: "cora@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn create_binds_author_and_restaurant() {
        let repo = InMemoryRepository::seeded();
        let review = create(&repo, "1", &author(), 4, "Latest Review".to_string())
            .await
            .unwrap();
        assert_eq!(review.id, "4");
        assert_eq!(review.user_id, "3");
        assert_eq!(review.restaurant_id, "1");
        assert_eq!(review.detail, "Latest Review");
    }

    #[tokio::test]
    async fn create_for_missing_restaurant_is_not_found() {
        let repo = InMemoryRepository::seeded();
        let result = create(&repo, "77", &author(), 4, "?".to_string()).await;
        assert!(matches!(result, Err(AppError::NotFound("Restaurant"))));
    }

    #[tokio::test]
    async fn second_delete_is_not_found() {
        let repo = InMemoryRepository::seeded();
        let removed = delete_by_id(&repo, "2").await.unwrap();
        assert_eq!(removed.detail, "Terrible service :(");
        assert!(get_by_id(&repo, "2").await.unwrap().is_none());
        assert!(matches!(
            delete_by_id(&repo, "2").await,
            Err(AppError::NotFound("Review"))
        ));
    }
}
