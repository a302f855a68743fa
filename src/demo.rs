//! Fixed synthetic records for offline runs.

use crate::{
    normalize::Address,
    record::{
        review_source_id, synthesized_reviewer_id, Platform, Restaurant, RestaurantContext,
        Review, ReviewContext,
    },
    utils,
};
use chrono::Duration;

const REVIEWS: [(f64, &str); 7] = [
    (5.0, "Hoppers came out crisp at the edges and soft in the middle. Friendly staff, quick refills."),
    (4.0, "Solid lunch spot. The vegetable kottu was generous, a little heavy on the salt."),
    (4.5, "Came for the lamprais and was not disappointed. Book ahead on Fridays."),
    (3.5, "Food was good but we waited almost forty minutes on a quiet Tuesday."),
    (5.0, "Best deviled cashews in town. The coconut roti is a must."),
    (3.0, "Decent curries, though the mild option was anything but mild."),
    (4.5, "Cozy room, fair prices and a very patient server with our kids."),
];

const DAYS_BETWEEN_REVIEWS: i64 = 10;

pub fn restaurant(platform: Platform, source_id: String, ctx: &RestaurantContext) -> Restaurant {
    Restaurant {
        name: "Harbor Lane Kitchen (Demo)".to_string(),
        address: Address {
            street: "88 Wellington St".to_string(),
            city: "Ottawa".to_string(),
            state: "ON".to_string(),
            postal_code: "K1P 5A9".to_string(),
        },
        phone: "+1 613-555-0188".to_string(),
        website: "https://harborlane.example.com".to_string(),
        cuisine_type: "Sri Lankan, Vegetarian Friendly".to_string(),
        price_range: "$$".to_string(),
        average_rating: Some(4.4),
        source_url: ctx.source_url.clone(),
        source_id,
        source_platform: platform,
        last_updated: ctx.crawled_at,
    }
}

/// Seven reviews, one every ten days back from the crawl day.
pub fn reviews(platform: Platform, ctx: &ReviewContext) -> Vec<Review> {
    let day = utils::start_of_day(ctx.crawled_at);

    REVIEWS
        .iter()
        .enumerate()
        .map(|(i, (rating, text))| {
            let reviewer_id = synthesized_reviewer_id(i);
            let review_date = day - Duration::days(DAYS_BETWEEN_REVIEWS * i as i64);
            Review {
                restaurant_id: ctx.restaurant_id,
                rating: *rating,
                text: text.to_string(),
                review_date,
                reviewer_name: format!("Demo Reviewer {}", i + 1),
                source_id: review_source_id(platform, ctx.restaurant_id, &reviewer_id, review_date),
                reviewer_id,
                helpful_count: i as u32,
                source_url: ctx.source_url.clone(),
                source_platform: platform,
                crawl_date: ctx.crawled_at,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::at;
    use itertools::Itertools;

    #[test]
    fn reviews_are_spaced_and_unique() {
        let ctx = ReviewContext {
            restaurant_id: 1,
            source_url: "demo".to_string(),
            crawled_at: at("2024-05-20T18:30:00.000+00:00"),
        };
        let reviews = reviews(Platform::TripAdvisor, &ctx);

        assert_eq!(reviews.len(), 7);
        assert_eq!(reviews[0].review_date, at("2024-05-20T00:00:00+00:00"));
        assert_eq!(reviews[6].review_date, at("2024-03-21T00:00:00+00:00"));
        assert!(reviews.iter().map(|r| &r.source_id).all_unique());
        assert_eq!(reviews, super::reviews(Platform::TripAdvisor, &ctx));
    }
}
