mod google;
mod tripadvisor;
mod yelp;

pub use google::GoogleCrawler;
pub use tripadvisor::TripAdvisorCrawler;
pub use yelp::YelpCrawler;

use crate::{
    builder::{self, RestaurantProfile, ReviewProfile},
    record::{Platform, Restaurant, RestaurantContext, Review, ReviewContext},
    CrawlerError,
};
use reqwest::Url;
use scraper::{ElementRef, Html};

/// Extraction capabilities of one review platform.
///
/// Implementors only describe where things live on their pages. Building the
/// records is shared and goes through [`builder`].
pub trait Crawler: Send + Sync {
    fn platform(&self) -> Platform;

    fn restaurant_profile(&self) -> &RestaurantProfile;

    fn review_profile(&self) -> &ReviewProfile;

    /// Platform identifier of the restaurant behind `url`.
    fn source_id(&self, url: &str) -> Result<String, CrawlerError>;

    /// Page listing the reviews of the restaurant behind `url`.
    fn reviews_url(&self, url: &str) -> String {
        url.to_string()
    }

    fn build_restaurant(
        &self,
        doc: &Html,
        ctx: &RestaurantContext,
    ) -> Result<Restaurant, CrawlerError> {
        let source_id = self.source_id(&ctx.source_url)?;
        builder::build_restaurant(
            doc,
            self.restaurant_profile(),
            self.platform(),
            source_id,
            ctx,
        )
    }

    fn review_fragments<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        builder::review_fragments(doc, self.review_profile())
    }

    fn build_review(
        &self,
        fragment: ElementRef<'_>,
        index: usize,
        ctx: &ReviewContext,
    ) -> Result<Review, CrawlerError> {
        builder::build_review(fragment, index, self.review_profile(), self.platform(), ctx)
    }
}

impl Platform {
    pub fn crawler(&self) -> Box<dyn Crawler> {
        match self {
            Platform::Yelp => Box::new(YelpCrawler),
            Platform::Google => Box::new(GoogleCrawler),
            Platform::TripAdvisor => Box::new(TripAdvisorCrawler),
        }
    }
}

fn parse_url(platform: Platform, url: &str) -> Result<Url, CrawlerError> {
    Url::parse(url).map_err(|_| CrawlerError::UnsupportedUrl {
        platform: platform.as_str(),
        url: url.to_string(),
    })
}

/// Last non-empty path segment, without query or fragment.
fn last_path_segment(platform: Platform, url: &str) -> Result<String, CrawlerError> {
    parse_url(platform, url)?
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(ToString::to_string)
        .ok_or_else(|| CrawlerError::UnsupportedUrl {
            platform: platform.as_str(),
            url: url.to_string(),
        })
}
