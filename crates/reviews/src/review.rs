use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{ReviewId, UserId};

use crate::rating::{InvalidRating, Rating, RatingSummary};

/// A submitted review. Created once, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub user_id: UserId,
    pub author_name: String,
    pub rating: Rating,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Validated review input, before the eligibility gate has been consulted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewDraft {
    rating: Rating,
    comment: Option<String>,
}

impl ReviewDraft {
    /// Blank comments are treated as absent.
    pub fn new(rating: i64, comment: Option<String>) -> Result<Self, InvalidRating> {
        let rating = Rating::new(rating)?;
        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        Ok(Self { rating, comment })
    }

    pub fn rating(&self) -> Rating {
        self.rating
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn into_review(self, user_id: UserId, author_name: impl Into<String>, now: DateTime<Utc>) -> Review {
        Review {
            id: ReviewId::new(),
            user_id,
            author_name: author_name.into(),
            rating: self.rating,
            comment: self.comment,
            created_at: now,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("user {0} has already reviewed this product")]
pub struct DuplicateReview(pub UserId);

/// Append-only reviews of one product, at most one per user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewCollection {
    reviews: Vec<Review>,
    summary: RatingSummary,
}

impl ReviewCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted reviews, recomputing the summary.
    pub fn from_reviews(reviews: Vec<Review>) -> Self {
        let summary = RatingSummary::from_ratings(reviews.iter().map(|r| r.rating));
        Self { reviews, summary }
    }

    pub fn contains_user(&self, user_id: UserId) -> bool {
        self.reviews.iter().any(|r| r.user_id == user_id)
    }

    /// Append `review` unless its author already has one; the summary is
    /// recomputed over the full collection including the new review.
    pub fn append(&mut self, review: Review) -> Result<RatingSummary, DuplicateReview> {
        if self.contains_user(review.user_id) {
            return Err(DuplicateReview(review.user_id));
        }
        self.reviews.push(review);
        self.summary = RatingSummary::from_ratings(self.reviews.iter().map(|r| r.rating));
        Ok(self.summary)
    }

    pub fn summary(&self) -> RatingSummary {
        self.summary
    }

    pub fn reviews(&self) -> &[Review] {
        &self.reviews
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reviews.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(user_id: UserId, stars: i64) -> Review {
        ReviewDraft::new(stars, Some("solid".to_string()))
            .unwrap()
            .into_review(user_id, "reviewer", Utc::now())
    }

    #[test]
    fn draft_rejects_out_of_range_ratings() {
        assert_eq!(ReviewDraft::new(0, None), Err(InvalidRating(0)));
        assert_eq!(ReviewDraft::new(9, None), Err(InvalidRating(9)));
    }

    #[test]
    fn draft_drops_blank_comments() {
        let draft = ReviewDraft::new(4, Some("   ".to_string())).unwrap();
        assert_eq!(draft.comment(), None);

        let draft = ReviewDraft::new(4, Some(" great ".to_string())).unwrap();
        assert_eq!(draft.comment(), Some("great"));
    }

    #[test]
    fn append_recomputes_mean_and_count() {
        let mut reviews = ReviewCollection::new();
        reviews.append(review(UserId::new(), 5)).unwrap();
        let summary = reviews.append(review(UserId::new(), 2)).unwrap();

        assert_eq!(summary.count, 2);
        assert!((summary.average - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn second_review_by_same_user_is_rejected_and_not_counted() {
        let user = UserId::new();
        let mut reviews = ReviewCollection::new();
        reviews.append(review(user, 5)).unwrap();

        assert_eq!(reviews.append(review(user, 1)), Err(DuplicateReview(user)));
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews.summary().count, 1);
        assert!((reviews.summary().average - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn from_reviews_restores_summary() {
        let restored = ReviewCollection::from_reviews(vec![
            review(UserId::new(), 4),
            review(UserId::new(), 3),
        ]);
        assert_eq!(restored.summary().count, 2);
        assert!((restored.summary().average - 3.5).abs() < f64::EPSILON);
    }
}
