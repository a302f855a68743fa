#[derive(Debug, thiserror::Error)]
pub enum CrawlerError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::error::Error),

    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("No restaurant fields could be extracted from {0}")]
    EmptyRestaurant(String),

    #[error("Review fragment {0} has no reviewer, text or rating")]
    EmptyReview(usize),

    #[error("Unsupported {platform} url: {url}")]
    UnsupportedUrl { platform: &'static str, url: String },
}
