use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Star rating, an integer in `1..=5`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("rating must be an integer between 1 and 5, got {0}")]
pub struct InvalidRating(pub i64);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: i64) -> Result<Self, InvalidRating> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(InvalidRating(value))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = InvalidRating;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(value: Rating) -> Self {
        value.0
    }
}

/// Derived per-product fields: mean rating and review count.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatingSummary {
    pub average: f64,
    pub count: u32,
}

impl RatingSummary {
    /// Arithmetic mean over every rating; `0.0` with no ratings.
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = Rating>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u32), |(sum, count), r| (sum + u64::from(r.get()), count + 1));

        if count == 0 {
            return Self::default();
        }

        Self {
            average: sum as f64 / f64::from(count),
            count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn bounds_are_inclusive() {
        assert!(Rating::new(0).is_err());
        assert_eq!(Rating::new(1).unwrap().get(), 1);
        assert_eq!(Rating::new(5).unwrap().get(), 5);
        assert_eq!(Rating::new(6), Err(InvalidRating(6)));
    }

    #[test]
    fn non_integer_ratings_fail_to_deserialize() {
        assert!(serde_json::from_str::<Rating>("4").is_ok());
        assert!(serde_json::from_str::<Rating>("4.5").is_err());
        assert!(serde_json::from_str::<Rating>("\"4\"").is_err());
    }

    #[test]
    fn empty_summary_is_zero() {
        let summary = RatingSummary::from_ratings(std::iter::empty());
        assert_eq!(summary, RatingSummary { average: 0.0, count: 0 });
    }

    proptest! {
        #[test]
        fn summary_is_the_arithmetic_mean(values in proptest::collection::vec(1i64..=5, 1..200)) {
            let ratings: Vec<Rating> = values.iter().map(|v| Rating::new(*v).unwrap()).collect();
            let summary = RatingSummary::from_ratings(ratings.iter().copied());

            let expected = values.iter().sum::<i64>() as f64 / values.len() as f64;
            prop_assert_eq!(summary.count as usize, values.len());
            prop_assert!((summary.average - expected).abs() < 1e-9);
            prop_assert!(summary.average >= 1.0 && summary.average <= 5.0);
        }
    }
}
