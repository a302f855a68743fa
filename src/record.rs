use crate::normalize::Address;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Yelp,
    Google,
    TripAdvisor,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Yelp, Platform::Google, Platform::TripAdvisor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Yelp => "yelp",
            Platform::Google => "google",
            Platform::TripAdvisor => "tripadvisor",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown platform {}", s))
    }
}

/// Attribute by which a record is matched against stored rows.
pub trait Keyed {
    fn unique_key(&self) -> &str;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restaurant {
    pub name: String,
    pub address: Address,
    pub phone: String,
    pub website: String,
    pub cuisine_type: String,
    pub price_range: String,
    pub average_rating: Option<f64>,
    pub source_url: String,
    pub source_id: String,
    pub source_platform: Platform,
    pub last_updated: DateTime<FixedOffset>,
}

impl Keyed for Restaurant {
    fn unique_key(&self) -> &str {
        &self.source_url
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub restaurant_id: i64,
    pub rating: f64,
    pub text: String,
    pub review_date: DateTime<FixedOffset>,
    pub reviewer_name: String,
    pub reviewer_id: String,
    pub helpful_count: u32,
    pub source_url: String,
    pub source_id: String,
    pub source_platform: Platform,
    pub crawl_date: DateTime<FixedOffset>,
}

impl Keyed for Review {
    fn unique_key(&self) -> &str {
        &self.source_id
    }
}

/// Reviewer id used when the platform does not expose one.
pub fn synthesized_reviewer_id(index: usize) -> String {
    format!("reviewer_{}", index)
}

/// Stable identity of a review, rebuilt identically on every crawl of the
/// same underlying review.
pub fn review_source_id(
    platform: Platform,
    restaurant_id: i64,
    reviewer_id: &str,
    review_date: DateTime<FixedOffset>,
) -> String {
    format!(
        "{}_{}_{}_{}",
        platform,
        restaurant_id,
        reviewer_id,
        review_date.timestamp()
    )
}

/// Inputs of a restaurant build besides the document itself.
#[derive(Debug, Clone)]
pub struct RestaurantContext {
    pub source_url: String,
    pub crawled_at: DateTime<FixedOffset>,
}

/// Inputs of a review build besides the fragment itself.
#[derive(Debug, Clone)]
pub struct ReviewContext {
    pub restaurant_id: i64,
    pub source_url: String,
    pub crawled_at: DateTime<FixedOffset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_names_round_trip() {
        for p in Platform::ALL {
            assert_eq!(p.as_str().parse::<Platform>(), Ok(p));
        }
        assert_eq!("TripAdvisor".parse::<Platform>(), Ok(Platform::TripAdvisor));
        assert!("opentable".parse::<Platform>().is_err());
    }

    #[test]
    fn review_identity_is_deterministic() {
        let date = DateTime::parse_from_rfc3339("2023-10-15T00:00:00+00:00").unwrap();
        let a = review_source_id(Platform::Yelp, 7, "u42", date);
        let b = review_source_id(Platform::Yelp, 7, "u42", date);

        assert_eq!(a, "yelp_7_u42_1697328000");
        assert_eq!(a, b);
        assert_ne!(a, review_source_id(Platform::Google, 7, "u42", date));
    }
}
