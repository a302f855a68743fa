use clap::{Parser, ValueEnum};
use restaurant_review_crawler::{
    config::DEFAULT_USER_AGENT, CrawlConfig, Database, HttpFetcher, Orchestrator, Platform,
    Table, UpsertGateway,
};
use std::time::Duration;
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SourceArg {
    Yelp,
    Google,
    Tripadvisor,
    All,
}

impl SourceArg {
    fn platforms(self) -> Vec<Platform> {
        match self {
            SourceArg::Yelp => vec![Platform::Yelp],
            SourceArg::Google => vec![Platform::Google],
            SourceArg::Tripadvisor => vec![Platform::TripAdvisor],
            SourceArg::All => Platform::ALL.to_vec(),
        }
    }
}

fn parse_delay(s: &str) -> Result<Duration, String> {
    match s.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(Duration::from_secs_f64(secs)),
        _ => Err(format!("invalid delay in seconds: {}", s)),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "restaurant-review-crawler",
    about = "Crawl restaurant details and reviews into a SQLite database"
)]
struct Cli {
    #[arg(value_enum, help = "Review platform of the given URLs")]
    source: SourceArg,
    #[arg(required = true, help = "Restaurant page URLs")]
    urls: Vec<String>,
    #[arg(
        long,
        env = "MAX_REVIEWS",
        default_value_t = 100,
        help = "Maximum number of reviews saved per restaurant"
    )]
    max_reviews: usize,
    #[arg(
        long,
        env = "REQUEST_DELAY",
        value_parser = parse_delay,
        default_value = "2",
        help = "Seconds between two requests"
    )]
    request_delay: Duration,
    #[arg(long, env = "DEMO_MODE", help = "Save synthetic records instead of fetching pages")]
    demo_mode: bool,
    #[arg(long, env = "USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,
    #[arg(
        long,
        env = "DB_NAME",
        default_value = "restaurant_reviews",
        help = "Database name, stored as <name>.db"
    )]
    database: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "info,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let cli = Cli::parse();
    let config = CrawlConfig::default()
        .with_max_reviews(cli.max_reviews)
        .with_request_delay(cli.request_delay)
        .with_demo_mode(cli.demo_mode)
        .with_user_agent(cli.user_agent);

    let gateway = UpsertGateway::new(Database::new(&cli.database).await?);
    let fetcher = HttpFetcher::new(&config)?;

    let (mut done, mut failed) = (0, 0);
    for platform in cli.source.platforms() {
        let orchestrator = Orchestrator::new(
            platform.crawler(),
            fetcher.clone(),
            gateway.clone(),
            config.clone(),
        );

        for report in orchestrator.run(&cli.urls).await {
            if !report.is_done() {
                failed += 1;
                continue;
            }
            done += 1;

            let Some(id) = report.restaurant_id else {
                continue;
            };
            let db = gateway.database();
            match db.restaurants.get(id).await? {
                Some(restaurant) => info!("{}", serde_json::to_string(&restaurant)?),
                None => warn!("Restaurant {} disappeared", id),
            }
            info!(
                "[{}] {} review(s) stored",
                report.url,
                db.reviews.for_restaurant(id).await?.len()
            );
        }
    }

    info!("Finished: {} done, {} failed", done, failed);
    Ok(())
}
