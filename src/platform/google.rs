use super::{last_path_segment, Crawler};
use crate::{
    builder::{RestaurantProfile, ReviewProfile, StructuredAddress},
    normalize::UNKNOWN_RATING,
    record::Platform,
    strategy::{Decode, Strategy},
    CrawlerError,
};
use lazy_static::lazy_static;

lazy_static! {
    static ref RESTAURANT: RestaurantProfile = RestaurantProfile {
        name: vec![
            Strategy::css("place-heading", "h1.DUwDvf"),
            Strategy::css("heading", "h1"),
        ],
        structured_address: StructuredAddress::default(),
        address: vec![
            Strategy::css("address-button", r#"button[data-item-id="address"]"#),
        ],
        phone: vec![Strategy::css("phone-button", r#"button[data-item-id^="phone:tel"]"#)],
        website: vec![Strategy::attr("authority", r#"a[data-item-id="authority"]"#, "href")],
        cuisine_type: vec![
            Strategy::css("category-button", r#"button[jsaction*="category"]"#),
            Strategy::css("category-span", ".fontBodyMedium > span > span > span"),
        ],
        price_range: vec![Strategy::css("price-label", r#"span[aria-label^="Price"]"#)],
        rating: vec![Strategy::css("display-rating", "div.fontDisplayLarge")],
    };
    static ref REVIEWS: ReviewProfile = ReviewProfile {
        fragments: vec![
            Strategy::css("review-card", "div.jftiEf"),
            Strategy::css("review-id", "div[data-review-id]"),
        ],
        reviewer_name: vec![Strategy::css("author", ".d4r55")],
        // Contributor ids are not exposed in the review card.
        reviewer_id: vec![],
        rating: vec![
            Strategy::attr("stars-label", "span.kvMYJc[aria-label]", "aria-label"),
            Strategy::css("filled-stars", ".kvMYJc .wzN8Ac").decode(Decode::Cardinality),
        ],
        default_rating: UNKNOWN_RATING,
        date: vec![Strategy::css("published", ".rsqaWe")],
        text: vec![Strategy::css("body", ".wiI7pd")],
        helpful_count: vec![Strategy::css("likes", ".pkWtMe")],
    };
}

#[derive(Debug)]
pub struct GoogleCrawler;

impl Crawler for GoogleCrawler {
    fn platform(&self) -> Platform {
        Platform::Google
    }

    fn restaurant_profile(&self) -> &RestaurantProfile {
        &RESTAURANT
    }

    fn review_profile(&self) -> &ReviewProfile {
        &REVIEWS
    }

    fn source_id(&self, url: &str) -> Result<String, CrawlerError> {
        last_path_segment(Platform::Google, url)
    }
}
