use crate::{
    data::Database,
    normalize::Address,
    record::{Platform, Restaurant, Review},
};
use chrono::{DateTime, FixedOffset};
use std::path::Path;
use tokio::fs;

pub fn at(rfc3339: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(rfc3339).unwrap()
}

pub async fn remove_db(name: &str) {
    let file = format!("{}.db", name);
    if Path::new(&file).is_file() {
        fs::remove_file(&file).await.unwrap();
    }
}

/// Empty database backed by `<name>.db`.
pub async fn temp_db(name: &str) -> Database {
    remove_db(name).await;
    Database::new(name).await.unwrap()
}

pub fn sample_restaurant(url: &str) -> Restaurant {
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
        source_url: url.to_string(),
        source_id: "casa-azul-austin".to_string(),
        source_platform: Platform::Yelp,
        last_updated: at("2024-05-20T09:00:00.250-05:00"),
    }
}

pub fn sample_review(restaurant_id: i64, source_id: &str) -> Review {
    Review {
        restaurant_id,
        rating: 4.5,
        text: "Great tacos.".to_string(),
        review_date: at("2023-10-15T00:00:00+00:00"),
        reviewer_name: "Maria G.".to_string(),
        reviewer_id: "mG7x2".to_string(),
        helpful_count: 12,
        source_url: "https://www.yelp.com/biz/casa-azul-austin?sort_by=date_desc".to_string(),
        source_id: source_id.to_string(),
        source_platform: Platform::Yelp,
        crawl_date: at("2024-05-20T09:00:01.500-05:00"),
    }
}
