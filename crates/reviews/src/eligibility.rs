//! Review eligibility per (user, product) pair.
//!
//! ```text
//! NotEligible --(an order containing the product reaches Delivered)--> Eligible
//! Eligible    --(review appended)--------------------------------------> Reviewed
//! ```
//!
//! `Reviewed` is terminal. The state is always derived from current facts
//! (delivered orders + existing reviews); it is never stored or cached.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rating::InvalidRating;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewState {
    NotEligible,
    Eligible,
    Reviewed,
}

/// Answer to "may this user review this product?".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eligibility {
    pub eligible: bool,
    pub already_reviewed: bool,
}

/// Why a review submission was turned down.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReviewRejection {
    #[error(transparent)]
    InvalidRating(#[from] InvalidRating),

    #[error("you can only review products from delivered orders")]
    NotDelivered,

    #[error("you have already reviewed this product")]
    AlreadyReviewed,
}

impl ReviewState {
    /// Derive the state. An existing review wins: it can only exist because
    /// the pair was eligible when it was written.
    pub fn evaluate(has_delivered_order: bool, already_reviewed: bool) -> Self {
        match (has_delivered_order, already_reviewed) {
            (_, true) => ReviewState::Reviewed,
            (true, false) => ReviewState::Eligible,
            (false, false) => ReviewState::NotEligible,
        }
    }

    pub fn eligibility(self) -> Eligibility {
        match self {
            ReviewState::NotEligible => Eligibility { eligible: false, already_reviewed: false },
            ReviewState::Eligible => Eligibility { eligible: true, already_reviewed: false },
            ReviewState::Reviewed => Eligibility { eligible: false, already_reviewed: true },
        }
    }

    /// Gate a write: only `Eligible` may submit.
    pub fn ensure_can_submit(self) -> Result<(), ReviewRejection> {
        match self {
            ReviewState::Eligible => Ok(()),
            ReviewState::NotEligible => Err(ReviewRejection::NotDelivered),
            ReviewState::Reviewed => Err(ReviewRejection::AlreadyReviewed),
        }
    }
}

impl From<ReviewState> for Eligibility {
    fn from(state: ReviewState) -> Self {
        state.eligibility()
    }
}
