use reqwest::header;

use crate::error::ScrapeError;

pub const BASE_URL: &str = "https://www.imdb.com";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/143.0.0.0 Safari/537.36";

/// Capability for fetching the pages of one title.
///
/// Extractors and the orchestrator are written against this trait so
/// tests can substitute canned fixture pages for the live site.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `/title/{title}/{section}` and return the body.
    async fn title_page(&self, title: &str, section: &str) -> Result<String, ScrapeError>;

    /// GET the reviews AJAX continuation endpoint for `pagination_key`.
    async fn reviews_ajax(&self, title: &str, pagination_key: &str)
    -> Result<String, ScrapeError>;
}

/// Live HTTP client for imdb.com.
pub struct ImdbClient {
    client: reqwest::Client,
    base_url: String,
}

impl ImdbClient {
    pub fn new() -> Result<Self, ScrapeError> {
        Self::with_base_url(BASE_URL.to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self, ScrapeError> {
        // Cookie store so the site's Set-Cookie headers stick across
        // the page sequence, same as a browser session would.
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, base_url })
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String, ScrapeError> {
        let resp = self
            .client
            .get(url)
            .header(header::USER_AGENT, USER_AGENT)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.text().await?)
    }
}

#[async_trait::async_trait]
impl PageFetcher for ImdbClient {
    async fn title_page(&self, title: &str, section: &str) -> Result<String, ScrapeError> {
        let url = format!("{}/title/{}/{}", self.base_url, title, section);
        self.get(&url, &[]).await
    }

    async fn reviews_ajax(
        &self,
        title: &str,
        pagination_key: &str,
    ) -> Result<String, ScrapeError> {
        let url = format!("{}/title/{}/reviews/_ajax", self.base_url, title);
        self.get(&url, &[("paginationKey", pagination_key)]).await
    }
}
