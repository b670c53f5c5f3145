//! Review delete authorization.
//!
//! The administrator is recognised by login email (`AppConfig::admin_email`), not by a
//! role column. Any account registered under that email carries the override.

use crate::{
    auth::AuthUser,
    error::{AppError, AppResult},
    models::Review,
    repository::Repository,
};

/// True when `actor` is the reserved administrator identity.
pub fn is_admin(actor: &AuthUser, admin_email: &str) -> bool {
    actor.email == admin_email
}

/// can_delete_review
///
/// Pure decision: the review's author or the administrator may delete it, nobody else.
/// Ownership is never delegated.
pub fn can_delete_review(actor: &AuthUser, review: &Review, admin_email: &str) -> bool {
    actor.id == review.user_id || is_admin(actor, admin_email)
}

/// authorize_delete
///
/// Loads the review and applies `can_delete_review`. A missing review is `NotFound`
/// before ownership is ever looked at, so a 404 can never turn into a 403.
pub async fn authorize_delete(
    repo: &dyn Repository,
    actor: &AuthUser,
    review_id: &str,
    admin_email: &str,
) -> AppResult<Review> {
    let review = repo
        .get_review(review_id)
        .await?
        .ok_or(AppError::NotFound("Review"))?;

    if can_delete_review(actor, &review, admin_email) {
        Ok(review)
    } else {
        tracing::info!(
            actor_id = %actor.id,
            review_id = %review.id,
            owner_id = %review.user_id,
            "review delete denied"
        );
        Err(AppError::Forbidden)
    }
}
