//! Restaurant reads and the restaurant-with-reviews projection.

use crate::{
    error::{AppError, AppResult},
    models::{Restaurant, RestaurantWithReviews},
    repository::Repository,
};

/// Every restaurant, ascending by id. Reviews are not loaded, so the listing stays
/// one query regardless of review volume.
pub async fn get_all(repo: &dyn Repository) -> AppResult<Vec<Restaurant>> {
    repo.get_restaurants().await
}

/// A single restaurant, or `NotFound`.
pub async fn get_by_id(repo: &dyn Repository, id: &str) -> AppResult<Restaurant> {
    repo.get_restaurant(id)
        .await?
        .ok_or(AppError::NotFound("Restaurant"))
}

impl From<Restaurant> for RestaurantWithReviews {
    fn from(restaurant: Restaurant) -> Self {
        Self {
            restaurant,
            reviews: Vec::new(),
        }
    }
}

impl RestaurantWithReviews {
    /// add_reviews
    ///
    /// Replaces `reviews` with the restaurant's current reviews in ascending id order.
    /// Repeated calls recompute rather than append.
    pub async fn add_reviews(&mut self, repo: &dyn Repository) -> AppResult<()> {
        self.reviews = repo
            .get_reviews_for_restaurant(&self.restaurant.id)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::NewReview, repository::InMemoryRepository};

    #[tokio::test]
    async fn unknown_restaurant_is_not_found() {
        let repo = InMemoryRepository::seeded();
        for id in ["0", "5", "999", "abc", ""] {
            assert!(matches!(
                get_by_id(&repo, id).await,
                Err(AppError::NotFound("Restaurant"))
            ));
        }
    }

    #[tokio::test]
    async fn add_reviews_attaches_seeded_reviews_in_order() {
        let repo = InMemoryRepository::seeded();
        let restaurant = get_by_id(&repo, "1").await.unwrap();
        let mut detail = RestaurantWithReviews::from(restaurant.clone());
        detail.add_reviews(&repo).await.unwrap();

        assert_eq!(detail.restaurant, restaurant);
        let ids: Vec<&str> = detail.reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);
        assert!(detail.reviews.iter().all(|r| r.restaurant_id == "1"));
    }

    #[tokio::test]
    async fn add_reviews_is_idempotent() {
        let repo = InMemoryRepository::seeded();
        let mut detail = RestaurantWithReviews::from(get_by_id(&repo, "1").await.unwrap());
        detail.add_reviews(&repo).await.unwrap();
        detail.add_reviews(&repo).await.unwrap();
        assert_eq!(detail.reviews.len(), 3);
    }

    #[tokio::test]
    async fn add_reviews_only_takes_matching_restaurant() {
        let repo = InMemoryRepository::seeded();
        for stars in 1..=4 {
            repo.create_review(NewReview {
                restaurant_id: "2".to_string(),
                user_id: "1".to_string(),
                stars,
                detail: format!("visit {stars}"),
            })
            .await
            .unwrap();
        }
        let mut detail = RestaurantWithReviews::from(get_by_id(&repo, "2").await.unwrap());
        detail.add_reviews(&repo).await.unwrap();

        assert_eq!(detail.reviews.len(), 4);
        assert!(detail.reviews.iter().all(|r| r.restaurant_id == "2"));
        let ids: Vec<i64> = detail
            .reviews
            .iter()
            .map(|r| r.id.parse().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn listing_has_no_reviews_field() {
        let repo = InMemoryRepository::seeded();
        let all = get_all(&repo).await.unwrap();
        let json = serde_json::to_value(&all).unwrap();
        assert_eq!(all.len(), 4);
        assert!(json[0].get("reviews").is_none());
    }
}
