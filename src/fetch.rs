use crate::{config::CrawlConfig, CrawlerError};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE},
    Client,
};
use std::sync::Arc;
use tokio::{
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Source of page sessions.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    type Session: FetchSession;

    async fn acquire(&self) -> Result<Self::Session, CrawlerError>;
}

/// One browsing session. Serves a single navigation at a time and must be
/// released by its owner once done.
#[async_trait::async_trait]
pub trait FetchSession: Send {
    /// HTML of the page at `url`.
    async fn get_document(&mut self, url: &str) -> Result<String, CrawlerError>;

    async fn release(&mut self);
}

/// Plain HTTP fetcher. Requests of all its sessions share one pacing clock.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    request_delay: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl HttpFetcher {
    pub fn new(config: &CrawlConfig) -> Result<Self, CrawlerError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(HttpFetcher {
            client,
            request_delay: config.request_delay,
            last_request: Arc::new(Mutex::new(None)),
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    type Session = HttpSession;

    async fn acquire(&self) -> Result<HttpSession, CrawlerError> {
        Ok(HttpSession {
            client: self.client.clone(),
            request_delay: self.request_delay,
            last_request: Arc::clone(&self.last_request),
            requests: 0,
        })
    }
}

#[derive(Debug)]
pub struct HttpSession {
    client: Client,
    request_delay: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
    requests: u32,
}

#[async_trait::async_trait]
impl FetchSession for HttpSession {
    async fn get_document(&mut self, url: &str) -> Result<String, CrawlerError> {
        let mut last_request = self.last_request.lock().await;
        let now = Instant::now();
        if let Some(last) = last_request.take() {
            let elapsed = now.duration_since(last);
            if elapsed < self.request_delay {
                tokio::time::sleep(self.request_delay - elapsed).await;
            }
        }
        last_request.replace(Instant::now());
        drop(last_request);

        debug!("Visit {}", url);
        self.requests += 1;
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if html.trim().is_empty() {
            return Err(CrawlerError::FetchFailed {
                url: url.to_string(),
                reason: "empty document".to_string(),
            });
        }
        Ok(html)
    }

    async fn release(&mut self) {
        debug!("Release session after {} request(s)", self.requests);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    /// Serves `status` with a fixed body to every connection, answering after
    /// `pause`.
    async fn serve(status: &'static str, pause: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let (mut socket, _) = listener.accept().await.unwrap();
                tokio::spawn(async move {
                    let mut buf = [0u8; 2048];
                    let _ = socket.read(&mut buf).await;
                    tokio::time::sleep(pause).await;
                    let body = "<html><body><h1>ok</h1></body></html>";
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        format!("http://{}/biz/casa-azul", addr)
    }

    #[tokio::test]
    async fn requests_are_paced_across_sessions() {
        let url = serve("200 OK", Duration::ZERO).await;
        let delay = Duration::from_millis(300);
        let fetcher =
            HttpFetcher::new(&CrawlConfig::default().with_request_delay(delay)).unwrap();

        let started = Instant::now();
        let mut first = fetcher.acquire().await.unwrap();
        let html = first.get_document(&url).await.unwrap();
        first.release().await;

        let mut second = fetcher.acquire().await.unwrap();
        second.get_document(&url).await.unwrap();
        second.release().await;

        assert!(html.contains("<h1>ok</h1>"));
        assert!(started.elapsed() >= delay);
    }

    #[tokio::test]
    async fn sessions_download_concurrently() {
        let pause = Duration::from_millis(400);
        let url = serve("200 OK", pause).await;
        let fetcher =
            HttpFetcher::new(&CrawlConfig::default().with_request_delay(Duration::ZERO)).unwrap();

        let mut first = fetcher.acquire().await.unwrap();
        let mut second = fetcher.acquire().await.unwrap();
        let started = Instant::now();
        let (a, b) = tokio::join!(first.get_document(&url), second.get_document(&url));

        assert!(a.is_ok() && b.is_ok());
        assert!(started.elapsed() >= pause);
        assert!(started.elapsed() < pause * 2);
    }

    #[tokio::test]
    async fn error_status_is_a_request_error() {
        let url = serve("503 Service Unavailable", Duration::ZERO).await;
        let fetcher =
            HttpFetcher::new(&CrawlConfig::default().with_request_delay(Duration::ZERO)).unwrap();

        let mut session = fetcher.acquire().await.unwrap();
        let result = session.get_document(&url).await;
        session.release().await;

        assert!(matches!(result, Err(CrawlerError::RequestError(_))));
    }
}
