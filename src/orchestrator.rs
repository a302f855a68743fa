//! Per-URL crawl sequence.
//!
//! `FetchRestaurant -> BuildRestaurant -> PersistRestaurant -> FetchReviews ->
//! BuildReview(n) -> PersistReview(n) -> Done`, with `Failed` reachable from
//! every step before the reviews. Review failures are recorded and skipped.

use crate::{
    config::CrawlConfig,
    demo,
    fetch::{FetchSession, Fetcher},
    platform::Crawler,
    record::{RestaurantContext, Review, ReviewContext},
    upsert::UpsertGateway,
    utils, CrawlerError,
};
use chrono::{DateTime, FixedOffset};
use scraper::Html;
use std::fmt;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    FetchRestaurant,
    BuildRestaurant,
    PersistRestaurant,
    FetchReviews,
    BuildReview(usize),
    PersistReview(usize),
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: CrawlerError,
}

/// Outcome of crawling one URL.
#[derive(Debug)]
pub struct CrawlReport {
    pub url: String,
    /// `Done` or `Failed`.
    pub stage: Stage,
    pub restaurant_id: Option<i64>,
    pub reviews_saved: usize,
    pub failures: Vec<StageFailure>,
}

impl CrawlReport {
    fn new(url: &str) -> Self {
        CrawlReport {
            url: url.to_string(),
            stage: Stage::FetchRestaurant,
            restaurant_id: None,
            reviews_saved: 0,
            failures: vec![],
        }
    }

    fn fail(mut self, stage: Stage, error: CrawlerError) -> Self {
        error!("[{}] {} failed: {}", self.url, stage, error);
        self.failures.push(StageFailure { stage, error });
        self.stage = Stage::Failed;
        self
    }

    fn done(mut self) -> Self {
        self.stage = Stage::Done;
        self
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }
}

pub struct Orchestrator<F: Fetcher> {
    crawler: Box<dyn Crawler>,
    fetcher: F,
    gateway: UpsertGateway,
    config: CrawlConfig,
}

impl<F: Fetcher> Orchestrator<F> {
    pub fn new(
        crawler: Box<dyn Crawler>,
        fetcher: F,
        gateway: UpsertGateway,
        config: CrawlConfig,
    ) -> Self {
        Orchestrator {
            crawler,
            fetcher,
            gateway,
            config,
        }
    }

    /// Crawls every URL in order. A failed URL never stops the run.
    pub async fn run(&self, urls: &[String]) -> Vec<CrawlReport> {
        let mut reports = Vec::with_capacity(urls.len());
        for url in urls {
            let report = self.crawl(url).await;
            if report.is_done() {
                info!(
                    "[{}] Done: restaurant {:?}, {} review(s) saved, {} skipped",
                    url,
                    report.restaurant_id,
                    report.reviews_saved,
                    report.failures.len()
                );
            } else {
                warn!("[{}] Failed after {} failure(s)", url, report.failures.len());
            }
            reports.push(report);
        }
        reports
    }

    pub async fn crawl(&self, url: &str) -> CrawlReport {
        info!("[{}] Crawl with {}", url, self.crawler.platform());
        let crawled_at = utils::get_now();

        if self.config.demo_mode {
            return self.crawl_demo(url, crawled_at).await;
        }

        let mut session = match self.fetcher.acquire().await {
            Ok(session) => session,
            Err(e) => return CrawlReport::new(url).fail(Stage::FetchRestaurant, e),
        };
        let report = self.crawl_with(&mut session, url, crawled_at).await;
        session.release().await;
        report
    }

    async fn crawl_with(
        &self,
        session: &mut F::Session,
        url: &str,
        crawled_at: DateTime<FixedOffset>,
    ) -> CrawlReport {
        let mut report = CrawlReport::new(url);

        debug!("[{}] {}", url, Stage::FetchRestaurant);
        let html = match session.get_document(url).await {
            Ok(html) => html,
            Err(e) => return report.fail(Stage::FetchRestaurant, e),
        };

        debug!("[{}] {}", url, Stage::BuildRestaurant);
        let ctx = RestaurantContext {
            source_url: url.to_string(),
            crawled_at,
        };
        let restaurant = {
            let doc = Html::parse_document(&html);
            self.crawler.build_restaurant(&doc, &ctx)
        };
        let restaurant = match restaurant {
            Ok(restaurant) => restaurant,
            Err(e) => return report.fail(Stage::BuildRestaurant, e),
        };

        debug!("[{}] {}", url, Stage::PersistRestaurant);
        let restaurant_id = match self.gateway.upsert_restaurant(restaurant).await {
            Ok(stored) => stored.id,
            Err(e) => return report.fail(Stage::PersistRestaurant, e),
        };
        report.restaurant_id = Some(restaurant_id);

        debug!("[{}] {}", url, Stage::FetchReviews);
        let reviews_url = self.crawler.reviews_url(url);
        let html = if reviews_url == url {
            html
        } else {
            match session.get_document(&reviews_url).await {
                Ok(html) => html,
                Err(e) => return report.fail(Stage::FetchReviews, e),
            }
        };

        let ctx = ReviewContext {
            restaurant_id,
            source_url: reviews_url,
            crawled_at,
        };
        let built: Vec<_> = {
            let doc = Html::parse_document(&html);
            let mut fragments = self.crawler.review_fragments(&doc);
            debug!("[{}] {} review fragment(s) found", url, fragments.len());
            fragments.truncate(self.config.max_reviews);
            fragments
                .into_iter()
                .enumerate()
                .map(|(i, fragment)| self.crawler.build_review(fragment, i, &ctx))
                .collect()
        };

        self.persist_reviews(&mut report, built).await;
        report.done()
    }

    async fn crawl_demo(&self, url: &str, crawled_at: DateTime<FixedOffset>) -> CrawlReport {
        info!("[{}] Demo mode, using synthetic records", url);
        let mut report = CrawlReport::new(url);
        let platform = self.crawler.platform();

        let ctx = RestaurantContext {
            source_url: url.to_string(),
            crawled_at,
        };
        let restaurant = match self.crawler.source_id(url) {
            Ok(source_id) => demo::restaurant(platform, source_id, &ctx),
            Err(e) => return report.fail(Stage::BuildRestaurant, e),
        };
        let restaurant_id = match self.gateway.upsert_restaurant(restaurant).await {
            Ok(stored) => stored.id,
            Err(e) => return report.fail(Stage::PersistRestaurant, e),
        };
        report.restaurant_id = Some(restaurant_id);

        let ctx = ReviewContext {
            restaurant_id,
            source_url: url.to_string(),
            crawled_at,
        };
        let mut reviews = demo::reviews(platform, &ctx);
        reviews.truncate(self.config.max_reviews);

        self.persist_reviews(&mut report, reviews.into_iter().map(Ok).collect())
            .await;
        report.done()
    }

    /// Persists built reviews one by one. A failing review is recorded and
    /// skipped.
    async fn persist_reviews(
        &self,
        report: &mut CrawlReport,
        built: Vec<Result<Review, CrawlerError>>,
    ) {
        for (i, review) in built.into_iter().enumerate() {
            let review = match review {
                Ok(review) => review,
                Err(e) => {
                    warn!("[{}] Skip review {} at {}: {}", report.url, i, Stage::BuildReview(i), e);
                    report.failures.push(StageFailure {
                        stage: Stage::BuildReview(i),
                        error: e,
                    });
                    continue;
                }
            };

            match self.gateway.upsert_review(review).await {
                Ok(_) => report.reviews_saved += 1,
                Err(e) => {
                    warn!("[{}] Skip review {} at {}: {}", report.url, i, Stage::PersistReview(i), e);
                    report.failures.push(StageFailure {
                        stage: Stage::PersistReview(i),
                        error: e,
                    });
                }
            }
        }
    }
}
