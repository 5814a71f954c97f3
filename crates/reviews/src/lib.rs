//! Product reviews: ratings, the per-product review collection, and the
//! delivery-based eligibility state machine.

pub mod eligibility;
pub mod rating;
pub mod review;

pub use eligibility::{Eligibility, ReviewRejection, ReviewState};
pub use rating::{InvalidRating, Rating, RatingSummary};
pub use review::{DuplicateReview, Review, ReviewCollection, ReviewDraft};
