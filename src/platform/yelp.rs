use super::{last_path_segment, Crawler};
use crate::{
    builder::{RestaurantProfile, ReviewProfile, StructuredAddress},
    normalize::UNKNOWN_RATING,
    record::Platform,
    strategy::Strategy,
    CrawlerError,
};
use lazy_static::lazy_static;
use reqwest::Url;

lazy_static! {
    static ref RESTAURANT: RestaurantProfile = RestaurantProfile {
        name: vec![
            Strategy::css("heading", "h1"),
            Strategy::json_ld("ld-name", &["name"]),
        ],
        structured_address: StructuredAddress {
            street: vec![Strategy::json_ld("ld-street", &["address", "streetAddress"])],
            city: vec![Strategy::json_ld("ld-city", &["address", "addressLocality"])],
            state: vec![Strategy::json_ld("ld-region", &["address", "addressRegion"])],
            postal_code: vec![Strategy::json_ld("ld-postal", &["address", "postalCode"])],
        },
        address: vec![
            Strategy::css("details-address", r#"[data-testid="bizDetailsAddress"] > p"#),
            Strategy::css("address-tag", "address"),
        ],
        phone: vec![
            Strategy::css("details-phone", r#"[data-testid="bizPhone"]"#),
            Strategy::json_ld("ld-phone", &["telephone"]),
        ],
        website: vec![Strategy::attr("details-website", r#"[data-testid="bizWebsite"] a"#, "href")],
        cuisine_type: vec![
            Strategy::css(
                "category-link",
                r#"[data-testid="price-category"] > span:not(:first-child) a"#,
            ),
            Strategy::json_ld("ld-cuisine", &["servesCuisine"]),
        ],
        price_range: vec![
            Strategy::css("category-price", r#"[data-testid="price-category"] > span:first-child"#),
            Strategy::json_ld("ld-price", &["priceRange"]),
        ],
        rating: vec![
            Strategy::attr("rating-stars", r#"[data-testid="rating-stars"]"#, "aria-label"),
            Strategy::json_ld("ld-rating", &["aggregateRating", "ratingValue"]),
        ],
    };
    static ref REVIEWS: ReviewProfile = ReviewProfile {
        fragments: vec![
            Strategy::css("reviews-container", r#"[data-testid="reviews-container"] .review"#),
            Strategy::css("review-list", "#reviews li.review"),
        ],
        reviewer_name: vec![Strategy::css("passport", ".user-passport-info a")],
        reviewer_id: vec![Strategy::attr("passport-link", ".user-passport-info a", "href")],
        rating: vec![
            Strategy::attr("i-stars", ".i-stars", "aria-label"),
            Strategy::attr("star-label", r#"[role="img"][aria-label*="star rating"]"#, "aria-label"),
        ],
        default_rating: UNKNOWN_RATING,
        date: vec![Strategy::css("review-date", ".review-date")],
        text: vec![
            Strategy::css("content", ".review-content p"),
            Strategy::css("comment", "p.comment"),
        ],
        helpful_count: vec![Strategy::css("useful", ".useful-count")],
    };
}

#[derive(Debug)]
pub struct YelpCrawler;

impl Crawler for YelpCrawler {
    fn platform(&self) -> Platform {
        Platform::Yelp
    }

    fn restaurant_profile(&self) -> &RestaurantProfile {
        &RESTAURANT
    }

    fn review_profile(&self) -> &ReviewProfile {
        &REVIEWS
    }

    fn source_id(&self, url: &str) -> Result<String, CrawlerError> {
        last_path_segment(Platform::Yelp, url)
    }

    /// Newest reviews first.
    fn reviews_url(&self, url: &str) -> String {
        match Url::parse(url) {
            Ok(mut parsed) => {
                let kept: Vec<(String, String)> = parsed
                    .query_pairs()
                    .filter(|(k, _)| k != "sort_by")
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                parsed
                    .query_pairs_mut()
                    .clear()
                    .extend_pairs(kept)
                    .append_pair("sort_by", "date_desc");
                parsed.to_string()
            }
            Err(_) => format!("{}?sort_by=date_desc", url),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        normalize::Address,
        record::{Restaurant, RestaurantContext, ReviewContext},
    };
    use chrono::DateTime;
    use pretty_assertions::assert_eq;
    use scraper::Html;
    use std::fs;

    const URL: &str = "https://www.yelp.com/biz/casa-azul-austin";

    fn crawled_at() -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-20T09:00:00.000-05:00").unwrap()
    }

    #[test]
    fn test_reviews_url_sorts_by_date() {
        assert_eq!(
            YelpCrawler.reviews_url(URL),
            "https://www.yelp.com/biz/casa-azul-austin?sort_by=date_desc"
        );
        assert_eq!(
            YelpCrawler.reviews_url(&format!("{}?osq=tacos&sort_by=rating", URL)),
            "https://www.yelp.com/biz/casa-azul-austin?osq=tacos&sort_by=date_desc"
        );
    }

    #[test]
    fn test_parsing_restaurant() {
        let html = fs::read_to_string("tests/htmls/yelp_restaurant.html").expect("Invalid file url");
        let html = Html::parse_document(&html);
        let ctx = RestaurantContext {
            source_url: URL.to_string(),
            crawled_at: crawled_at(),
        };

        let restaurant = YelpCrawler.build_restaurant(&html, &ctx).unwrap();
        assert_eq!(
            restaurant,
            Restaurant {
                name: "Casa Azul".to_string(),
                address: Address {
                    street: "1200 E 6th St".to_string(),
                    city: "Austin".to_string(),
                    state: "TX".to_string(),
                    postal_code: "78702".to_string(),
                },
                phone: "(512) 555-0147".to_string(),
                website: "https://casaazul.example.com".to_string(),
                cuisine_type: "Mexican".to_string(),
                price_range: "$$".to_string(),
                average_rating: Some(4.5),
                source_url: URL.to_string(),
                source_id: "casa-azul-austin".to_string(),
                source_platform: Platform::Yelp,
                last_updated: crawled_at(),
            }
        );
    }

    #[test]
    fn test_parsing_reviews() {
        let html = fs::read_to_string("tests/htmls/yelp_reviews.html").expect("Invalid file url");
        let html = Html::parse_document(&html);
        let ctx = ReviewContext {
            restaurant_id: 1,
            source_url: YelpCrawler.reviews_url(URL),
            crawled_at: crawled_at(),
        };

        let fragments = YelpCrawler.review_fragments(&html);
        assert_eq!(fragments.len(), 3);

        let reviews: Vec<_> = fragments
            .into_iter()
            .enumerate()
            .map(|(i, f)| YelpCrawler.build_review(f, i, &ctx).unwrap())
            .collect();

        assert_eq!(reviews[0].reviewer_name, "Maria G.");
        assert_eq!(reviews[0].reviewer_id, "mG7x2");
        assert_eq!(reviews[0].rating, 5.0);
        assert_eq!(
            reviews[0].review_date,
            DateTime::parse_from_rfc3339("2023-10-15T00:00:00+00:00").unwrap()
        );
        assert_eq!(reviews[0].helpful_count, 12);
        assert_eq!(
            reviews[0].text,
            "Best breakfast tacos on the east side. The salsa verde is worth the wait."
        );
        assert_eq!(reviews[0].source_id, "yelp_1_mG7x2_1697328000");

        assert_eq!(reviews[1].rating, 3.0);
        assert_eq!(reviews[1].helpful_count, 0);

        assert_eq!(reviews[2].reviewer_name, "Anonymous");
        assert_eq!(reviews[2].reviewer_id, "reviewer_2");
        assert_eq!(reviews[2].rating, UNKNOWN_RATING);
    }

    #[test]
    fn test_review_identity_ignores_crawl_offset() {
        let html = fs::read_to_string("tests/htmls/yelp_reviews.html").expect("Invalid file url");
        let html = Html::parse_document(&html);
        let fragments = YelpCrawler.review_fragments(&html);

        let source_ids = |crawled_at: &str| -> Vec<String> {
            let ctx = ReviewContext {
                restaurant_id: 1,
                source_url: YelpCrawler.reviews_url(URL),
                crawled_at: DateTime::parse_from_rfc3339(crawled_at).unwrap(),
            };
            fragments
                .iter()
                .enumerate()
                .map(|(i, f)| YelpCrawler.build_review(*f, i, &ctx).unwrap().source_id)
                .collect()
        };

        let winter = source_ids("2024-01-10T12:00:00-05:00");
        let summer = source_ids("2024-07-10T12:00:00-04:00");
        assert_eq!(winter[0], "yelp_1_mG7x2_1697328000");
        assert_eq!(winter[..2], summer[..2]);

        // Undated reviews depend on the crawl day only.
        let same_day = source_ids("2024-01-10T23:30:00-04:00");
        assert_eq!(winter[2], same_day[2]);
    }
}
