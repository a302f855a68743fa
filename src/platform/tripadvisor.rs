use super::{parse_url, Crawler};
use crate::{
    builder::{RestaurantProfile, ReviewProfile, StructuredAddress},
    normalize::GUESSED_RATING,
    record::Platform,
    strategy::{Decode, Strategy},
    CrawlerError,
};
use lazy_regex::regex;
use lazy_static::lazy_static;

lazy_static! {
    static ref RESTAURANT: RestaurantProfile = RestaurantProfile {
        name: vec![
            Strategy::css("top-info-header", r#"h1[data-test-target="top-info-header"]"#),
            Strategy::css("legacy-heading", "h1.HjBfq"),
            Strategy::css("heading", "h1"),
            Strategy::css("title", "title").decode(Decode::Before(',')),
        ],
        structured_address: StructuredAddress {
            street: vec![Strategy::json_ld("ld-street", &["address", "streetAddress"])],
            city: vec![Strategy::json_ld("ld-city", &["address", "addressLocality"])],
            state: vec![Strategy::json_ld("ld-region", &["address", "addressRegion"])],
            postal_code: vec![Strategy::json_ld("ld-postal", &["address", "postalCode"])],
        },
        address: vec![
            Strategy::css("map-link", "a.AYHFM"),
            Strategy::css("address-span", r#"span[data-automation="restaurantsAddress"]"#),
        ],
        phone: vec![
            Strategy::css("tel-link", r#"a[href^="tel:"]"#),
            Strategy::json_ld("ld-phone", &["telephone"]),
        ],
        website: vec![Strategy::attr("website-link", "a.YnKZo", "href")],
        cuisine_type: vec![
            Strategy::css("cuisine-link", r#"a.dlMOJ[data-param="cuisine"]"#),
            Strategy::json_ld("ld-cuisine", &["servesCuisine"]),
        ],
        price_range: vec![
            Strategy::css("price-link", r#"a.dlMOJ[data-param="trating"]"#),
            Strategy::json_ld("ld-price", &["priceRange"]),
        ],
        rating: vec![
            Strategy::css("rating-score", "span.ZDEqb"),
            Strategy::json_ld("ld-rating", &["aggregateRating", "ratingValue"]),
            Strategy::attr("meta-description", r#"meta[name="description"]"#, "content"),
        ],
    };
    static ref REVIEWS: ReviewProfile = ReviewProfile {
        fragments: vec![
            Strategy::css("review-card", r#"[data-automation="reviewCard"]"#),
            Strategy::css("review-container", ".review-container"),
            Strategy::css("test-target", r#"div[data-test-target*="review"]"#),
            Strategy::parent("review-header-parent", r#"div[class*="review-header"]"#),
        ],
        reviewer_name: vec![
            Strategy::css("reviewer-name", r#"[data-automation="reviewerName"]"#),
            Strategy::css("info-text", ".info_text div:first-child"),
        ],
        reviewer_id: vec![Strategy::attr("member-overlay", ".memberOverlayLink", "id")],
        rating: vec![
            Strategy::attr("bubble-image", r#"[data-automation="bubbleRatingImage"]"#, "aria-label"),
            Strategy::css("bubble-class", ".ui_bubble_rating").decode(Decode::Tenths),
        ],
        // Reviews always carry bubbles, unreadable ones report the midpoint.
        default_rating: GUESSED_RATING,
        date: vec![
            Strategy::css("review-date", r#"[data-automation="reviewDate"]"#),
            Strategy::attr("rating-date-title", ".ratingDate", "title"),
            Strategy::css("rating-date", ".ratingDate"),
        ],
        text: vec![
            Strategy::css("review-text", r#"[data-automation^="reviewText"]"#),
            Strategy::css("summary", ".prw_reviews_text_summary_hsx"),
            Strategy::css("partial-entry", "p.partial_entry"),
        ],
        helpful_count: vec![Strategy::css("num-help", ".numHelp")],
    };
}

#[derive(Debug)]
pub struct TripAdvisorCrawler;

impl Crawler for TripAdvisorCrawler {
    fn platform(&self) -> Platform {
        Platform::TripAdvisor
    }

    fn restaurant_profile(&self) -> &RestaurantProfile {
        &RESTAURANT
    }

    fn review_profile(&self) -> &ReviewProfile {
        &REVIEWS
    }

    /// The `d<digits>` location token, e.g. `d683500` for
    /// `Restaurant_Review-g155004-d683500-Reviews-Ceylonta-Ottawa_Ontario.html`.
    fn source_id(&self, url: &str) -> Result<String, CrawlerError> {
        let parsed = parse_url(Platform::TripAdvisor, url)?;
        let path = parsed.path();
        if let Some(caps) = regex!(r"-(d\d+)-").captures(path) {
            return Ok(caps[1].to_string());
        }
        path.rsplit('-')
            .next()
            .filter(|token| !token.is_empty() && *token != path)
            .map(ToString::to_string)
            .ok_or_else(|| CrawlerError::UnsupportedUrl {
                platform: Platform::TripAdvisor.as_str(),
                url: url.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        normalize::Address,
        record::{RestaurantContext, ReviewContext},
        utils,
    };
    use chrono::{DateTime, Duration};
    use pretty_assertions::assert_eq;
    use scraper::Html;
    use std::fs;

    const URL: &str = "https://www.tripadvisor.com/Restaurant_Review-g155004-d683500-Reviews-Ceylonta-Ottawa_Ontario.html";

    fn crawled_at() -> DateTime<chrono::FixedOffset> {
        DateTime::parse_from_rfc3339("2024-05-20T20:15:00.000-04:00").unwrap()
    }

    #[test]
    fn test_source_id() {
        assert_eq!(TripAdvisorCrawler.source_id(URL).unwrap(), "d683500");
        assert_eq!(
            TripAdvisorCrawler
                .source_id("https://www.tripadvisor.com/Restaurant-Ceylonta")
                .unwrap(),
            "Ceylonta"
        );
        assert!(TripAdvisorCrawler.source_id("https://www.tripadvisor.com/").is_err());
        assert_eq!(TripAdvisorCrawler.reviews_url(URL), URL);
    }

    #[test]
    fn test_parsing_restaurant() {
        let html = fs::read_to_string("tests/htmls/tripadvisor.html").expect("Invalid file url");
        let html = Html::parse_document(&html);
        let ctx = RestaurantContext {
            source_url: URL.to_string(),
            crawled_at: crawled_at(),
        };

        let restaurant = TripAdvisorCrawler.build_restaurant(&html, &ctx).unwrap();
        assert_eq!(restaurant.name, "Ceylonta");
        assert_eq!(
            restaurant.address,
            Address {
                street: "403 Somerset St W".to_string(),
                city: "Ottawa".to_string(),
                state: "Ontario".to_string(),
                postal_code: "K2P 0K1".to_string(),
            }
        );
        assert_eq!(restaurant.phone, "+1 613-237-7812");
        assert_eq!(restaurant.cuisine_type, "Sri Lankan");
        assert_eq!(restaurant.price_range, "$$ - $$$");
        assert_eq!(restaurant.website, "");
        assert_eq!(restaurant.average_rating, Some(4.4));
        assert_eq!(restaurant.source_id, "d683500");
        assert_eq!(restaurant.source_platform, Platform::TripAdvisor);
    }

    #[test]
    fn test_parsing_reviews() {
        let html = fs::read_to_string("tests/htmls/tripadvisor.html").expect("Invalid file url");
        let html = Html::parse_document(&html);
        let ctx = ReviewContext {
            restaurant_id: 4,
            source_url: URL.to_string(),
            crawled_at: crawled_at(),
        };

        let fragments = TripAdvisorCrawler.review_fragments(&html);
        assert_eq!(fragments.len(), 4);

        let reviews: Vec<_> = fragments
            .into_iter()
            .enumerate()
            .map(|(i, f)| TripAdvisorCrawler.build_review(f, i, &ctx).unwrap())
            .collect();

        let march = DateTime::parse_from_rfc3339("2022-03-01T00:00:00+00:00").unwrap();
        assert_eq!(reviews[0].reviewer_name, "Lena M");
        assert_eq!(reviews[0].rating, 5.0);
        assert_eq!(reviews[0].review_date, march);
        assert_eq!(reviews[0].reviewer_id, "reviewer_0");
        assert_eq!(
            reviews[0].source_id,
            format!("tripadvisor_4_reviewer_0_{}", march.timestamp())
        );

        assert_eq!(reviews[1].rating, 4.5);
        assert_eq!(reviews[1].helpful_count, 2);
        assert_eq!(
            reviews[1].text,
            "The masala dosa is huge. Good prices too."
        );

        let fallback = utils::start_of_day(crawled_at()) - Duration::days(2);
        assert_eq!(reviews[2].rating, GUESSED_RATING);
        assert_eq!(reviews[2].review_date, fallback);

        assert_eq!(reviews[3].reviewer_name, "Anonymous");
        assert_eq!(reviews[3].rating, 3.5);
    }

    #[test]
    fn test_legacy_review_containers() {
        let html = Html::parse_document(
            r#"<html><body>
                 <div class="review-container">
                   <div class="info_text"><div>Sam P</div><div>Toronto</div></div>
                   <a class="memberOverlayLink" id="UID_4F1C9A">Sam P</a>
                   <span class="ui_bubble_rating bubble_40"></span>
                   <span class="ratingDate" title="October 15, 2023">Reviewed 3 weeks ago</span>
                   <div class="prw_reviews_text_summary_hsx"><p>Solid hoppers.</p></div>
                   <span class="numHelp">1 Helpful vote</span>
                 </div>
               </body></html>"#,
        );
        let ctx = ReviewContext {
            restaurant_id: 4,
            source_url: URL.to_string(),
            crawled_at: crawled_at(),
        };

        let fragments = TripAdvisorCrawler.review_fragments(&html);
        assert_eq!(fragments.len(), 1);

        let review = TripAdvisorCrawler.build_review(fragments[0], 0, &ctx).unwrap();
        let date = DateTime::parse_from_rfc3339("2023-10-15T00:00:00+00:00").unwrap();
        assert_eq!(review.reviewer_name, "Sam P");
        assert_eq!(review.reviewer_id, "UID_4F1C9A");
        assert_eq!(review.rating, 4.0);
        assert_eq!(review.review_date, date);
        assert_eq!(review.helpful_count, 1);
        assert_eq!(
            review.source_id,
            format!("tripadvisor_4_UID_4F1C9A_{}", date.timestamp())
        );
    }
}
