use scraper::Html;

use crate::client::PageFetcher;
use crate::error::{ScrapeError, selector};

pub async fn fetch_keywords(
    fetcher: &dyn PageFetcher,
    title: &str,
) -> Result<Vec<String>, ScrapeError> {
    let body = fetcher.title_page(title, "keywords").await?;
    parse_keywords(&body)
}

/// Trimmed text of every keyword cell, in document order.
pub fn parse_keywords(html: &str) -> Result<Vec<String>, ScrapeError> {
    let document = Html::parse_document(html);
    let keyword_sel = selector("div.sodatext")?;
    Ok(document
        .select(&keyword_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .collect())
}
