//! Review eligibility gate.
//!
//! Eligibility is recomputed from the ledger and the review collection on
//! every call. `submit_review` re-runs the check itself and then relies on
//! the catalog's conditional append, so an earlier `can_review` answer never
//! authorizes a write.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{info, instrument};

use storefront_catalog::CatalogEvent;
use storefront_catalog::events::AGGREGATE_TYPE as PRODUCT_AGGREGATE;
use storefront_core::{ProductId, UserId};
use storefront_reviews::{Eligibility, Review, ReviewDraft, ReviewRejection, ReviewState};

use crate::catalog_store::{CatalogStore, ReviewAppend};
use crate::error::StoreError;
use crate::order_ledger::OrderLedger;
use crate::publisher::EventPublisher;

#[derive(Debug, Error)]
pub enum ReviewGateError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error(transparent)]
    Rejected(#[from] ReviewRejection),

    #[error("review storage failed: {0}")]
    Internal(#[from] StoreError),
}

pub struct ReviewGate {
    catalog: Arc<dyn CatalogStore>,
    ledger: Arc<dyn OrderLedger>,
    publisher: EventPublisher,
}

impl ReviewGate {
    pub fn new(catalog: Arc<dyn CatalogStore>, ledger: Arc<dyn OrderLedger>, publisher: EventPublisher) -> Self {
        Self {
            catalog,
            ledger,
            publisher,
        }
    }

    async fn state(&self, user_id: UserId, product_id: ProductId) -> Result<ReviewState, ReviewGateError> {
        if self.catalog.get(product_id).await?.is_none() {
            return Err(ReviewGateError::ProductNotFound(product_id));
        }
        let reviewed = self.catalog.has_review(product_id, user_id).await?;
        let delivered = self.ledger.has_delivered(user_id, product_id).await?;
        Ok(ReviewState::evaluate(delivered, reviewed))
    }

    /// Side-effect free.
    #[instrument(skip(self), fields(user_id = %user_id, product_id = %product_id), err)]
    pub async fn can_review(&self, user_id: UserId, product_id: ProductId) -> Result<Eligibility, ReviewGateError> {
        Ok(self.state(user_id, product_id).await?.eligibility())
    }

    #[instrument(skip(self, author_name, comment), fields(user_id = %user_id, product_id = %product_id), err)]
    pub async fn submit_review(
        &self,
        user_id: UserId,
        author_name: &str,
        product_id: ProductId,
        rating: i64,
        comment: Option<String>,
    ) -> Result<Review, ReviewGateError> {
        // Input is validated before any state is consulted.
        let draft = ReviewDraft::new(rating, comment).map_err(ReviewRejection::from)?;

        self.state(user_id, product_id).await?.ensure_can_submit()?;

        let review = draft.into_review(user_id, author_name, Utc::now());
        let summary = match self.catalog.append_review(product_id, review.clone()).await? {
            ReviewAppend::Appended(summary) => summary,
            ReviewAppend::Duplicate => return Err(ReviewRejection::AlreadyReviewed.into()),
            ReviewAppend::Missing => return Err(ReviewGateError::ProductNotFound(product_id)),
        };

        info!(
            review_id = %review.id,
            rating = review.rating.get(),
            average = summary.average,
            count = summary.count,
            "review recorded"
        );

        self.publisher.publish(
            PRODUCT_AGGREGATE,
            product_id,
            CatalogEvent::ReviewAdded {
                product_id,
                review_id: review.id,
                user_id,
                rating: review.rating.get(),
                average_rating: summary.average,
                num_reviews: summary.count,
                occurred_at: review.created_at,
            },
        );

        Ok(review)
    }
}
