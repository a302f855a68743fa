//! Assembly of canonical records from resolved and normalized fields.
//!
//! Builds are pure: the same document and context always produce the same
//! record. The crawl timestamp is part of the context, never read here.

use crate::{
    normalize::{
        decompose_address, normalize_count, normalize_date, normalize_identifier,
        normalize_rating, Address, RawRating, UNKNOWN_RATING,
    },
    record::{
        review_source_id, synthesized_reviewer_id, Platform, Restaurant, RestaurantContext,
        Review, ReviewContext,
    },
    strategy::{resolve, Decode, Resolved, Strategy},
    utils, CrawlerError,
};
use scraper::{ElementRef, Html};

/// Strategies for the parts of an address published as structured data.
#[derive(Debug, Default)]
pub struct StructuredAddress {
    pub street: Vec<Strategy>,
    pub city: Vec<Strategy>,
    pub state: Vec<Strategy>,
    pub postal_code: Vec<Strategy>,
}

#[derive(Debug, Default)]
pub struct RestaurantProfile {
    pub name: Vec<Strategy>,
    /// Tried first. Used only when its street resolves.
    pub structured_address: StructuredAddress,
    /// Comma joined address line, decomposed by position.
    pub address: Vec<Strategy>,
    pub phone: Vec<Strategy>,
    pub website: Vec<Strategy>,
    pub cuisine_type: Vec<Strategy>,
    pub price_range: Vec<Strategy>,
    pub rating: Vec<Strategy>,
}

#[derive(Debug, Default)]
pub struct ReviewProfile {
    pub fragments: Vec<Strategy>,
    pub reviewer_name: Vec<Strategy>,
    pub reviewer_id: Vec<Strategy>,
    pub rating: Vec<Strategy>,
    /// Rating reported when the rating element is missing or unreadable.
    pub default_rating: f64,
    pub date: Vec<Strategy>,
    pub text: Vec<Strategy>,
    pub helpful_count: Vec<Strategy>,
}

pub const UNKNOWN_NAME: &str = "Unknown";
pub const ANONYMOUS: &str = "Anonymous";

fn text_of(scope: ElementRef<'_>, strategies: &[Strategy]) -> Option<String> {
    resolve(scope, strategies).and_then(|r| r.first_text())
}

fn rating_of(resolved: &Resolved<'_, '_>, default: f64) -> f64 {
    let raw = match resolved.strategy.decode {
        Decode::Cardinality => return normalize_rating(RawRating::Count(resolved.hits.len()), default),
        Decode::Tenths => resolved.hits.first().map(|h| h.token()),
        Decode::Text | Decode::Before(_) => resolved.first_text(),
    };
    match (resolved.strategy.decode, raw.as_deref()) {
        (Decode::Tenths, Some(token)) => normalize_rating(RawRating::Tenths(token), default),
        (_, Some(text)) => normalize_rating(RawRating::Text(text), default),
        (_, None) => normalize_rating(RawRating::Missing, default),
    }
}

fn address_of(scope: ElementRef<'_>, profile: &RestaurantProfile) -> Option<Address> {
    let structured = &profile.structured_address;
    if let Some(street) = text_of(scope, &structured.street) {
        return Some(Address {
            street,
            city: text_of(scope, &structured.city).unwrap_or_default(),
            state: text_of(scope, &structured.state).unwrap_or_default(),
            postal_code: text_of(scope, &structured.postal_code).unwrap_or_default(),
        });
    }
    text_of(scope, &profile.address).map(|line| decompose_address(&line))
}

/// Builds the restaurant described by `doc`.
///
/// Missing fields take their defaults. The build only fails when not a single
/// restaurant field can be located.
pub fn build_restaurant(
    doc: &Html,
    profile: &RestaurantProfile,
    platform: Platform,
    source_id: String,
    ctx: &RestaurantContext,
) -> Result<Restaurant, CrawlerError> {
    let scope = doc.root_element();

    let name = text_of(scope, &profile.name);
    let address = address_of(scope, profile);
    let phone = text_of(scope, &profile.phone);
    let website = text_of(scope, &profile.website);
    let cuisine_type = text_of(scope, &profile.cuisine_type);
    let price_range = text_of(scope, &profile.price_range);
    // Absent when no rating element exists, 0.0 when one exists but is unreadable.
    let average_rating = resolve(scope, &profile.rating).map(|r| rating_of(&r, UNKNOWN_RATING));

    let found_any = name.is_some()
        || address.is_some()
        || phone.is_some()
        || website.is_some()
        || cuisine_type.is_some()
        || price_range.is_some()
        || average_rating.is_some();
    if !found_any {
        return Err(CrawlerError::EmptyRestaurant(ctx.source_url.clone()));
    }

    Ok(Restaurant {
        name: name.unwrap_or_else(|| UNKNOWN_NAME.to_string()),
        address: address.unwrap_or_default(),
        phone: phone.unwrap_or_default(),
        website: website.unwrap_or_default(),
        cuisine_type: cuisine_type.unwrap_or_default(),
        price_range: price_range.unwrap_or_default(),
        average_rating,
        source_url: ctx.source_url.clone(),
        source_id,
        source_platform: platform,
        last_updated: ctx.crawled_at,
    })
}

/// Review fragments of a document, in source order.
pub fn review_fragments<'a>(doc: &'a Html, profile: &ReviewProfile) -> Vec<ElementRef<'a>> {
    resolve(doc.root_element(), &profile.fragments)
        .map(|r| r.hits.iter().filter_map(|h| h.element()).collect())
        .unwrap_or_default()
}

/// Builds the review at position `index` of its batch.
pub fn build_review(
    fragment: ElementRef<'_>,
    index: usize,
    profile: &ReviewProfile,
    platform: Platform,
    ctx: &ReviewContext,
) -> Result<Review, CrawlerError> {
    let reviewer_name = text_of(fragment, &profile.reviewer_name);
    let text = text_of(fragment, &profile.text);
    let rating = resolve(fragment, &profile.rating).map(|r| rating_of(&r, profile.default_rating));

    if reviewer_name.is_none() && text.is_none() && rating.is_none() {
        return Err(CrawlerError::EmptyReview(index));
    }

    let reviewer_id = Some(normalize_identifier(
        text_of(fragment, &profile.reviewer_id).as_deref(),
    ))
    .filter(|id| !id.is_empty())
    .unwrap_or_else(|| synthesized_reviewer_id(index));

    // Undated reviews count back from the start of the crawl day so that
    // crawls on the same day rebuild the same identity.
    let review_date = normalize_date(
        text_of(fragment, &profile.date).as_deref(),
        utils::start_of_day(ctx.crawled_at),
        index,
    );

    Ok(Review {
        restaurant_id: ctx.restaurant_id,
        rating: rating.unwrap_or(profile.default_rating),
        text: text.unwrap_or_default(),
        review_date,
        reviewer_name: reviewer_name.unwrap_or_else(|| ANONYMOUS.to_string()),
        source_id: review_source_id(platform, ctx.restaurant_id, &reviewer_id, review_date),
        reviewer_id,
        helpful_count: normalize_count(text_of(fragment, &profile.helpful_count).as_deref()),
        source_url: ctx.source_url.clone(),
        source_platform: platform,
        crawl_date: ctx.crawled_at,
    })
}
