use chrono::{NaiveDate, NaiveTime};
use scraper::Html;
use serde::Serialize;
use tracing::info;

use crate::client::PageFetcher;
use crate::error::{ScrapeError, selector};

const PAGE: &str = "reviews";

/// Hard cap on pagination rounds. The site is expected to eventually
/// omit the load-more marker; a server that keeps issuing keys would
/// otherwise loop forever.
const MAX_REVIEW_PAGES: usize = 500;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    pub author: ReviewAuthor,
    pub date: String,
    pub epoch_date: i64,
    pub content: String,
    pub helpful_vote: HelpfulVote,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReviewAuthor {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HelpfulVote {
    pub helpful_count: u64,
    pub total_count: u64,
}

/// Fetch the first reviews page, then follow the server-issued
/// pagination key through the AJAX endpoint until the marker
/// disappears. A repeated key or more than `MAX_REVIEW_PAGES` rounds
/// is treated as a malformed response rather than looping.
pub async fn fetch_all_reviews(
    fetcher: &dyn PageFetcher,
    title: &str,
) -> Result<Vec<Review>, ScrapeError> {
    let mut body = fetcher.title_page(title, PAGE).await?;
    let mut reviews = Vec::new();
    let mut last_key: Option<String> = None;

    for _ in 0..MAX_REVIEW_PAGES {
        let (mut page, key) = parse_reviews_page(&body, title)?;
        reviews.append(&mut page);
        let Some(key) = key else {
            info!("total reviews ingested: {}", reviews.len());
            return Ok(reviews);
        };
        if last_key.as_deref() == Some(key.as_str()) {
            return Err(ScrapeError::malformed(
                PAGE,
                title,
                format!("pagination key {key} repeated"),
            ));
        }
        info!(
            "getting more reviews using pagination key {key}; total reviews ingested: {}",
            reviews.len()
        );
        body = fetcher.reviews_ajax(title, &key).await?;
        last_key = Some(key);
    }
    Err(ScrapeError::malformed(
        PAGE,
        title,
        format!("pagination did not terminate within {MAX_REVIEW_PAGES} pages"),
    ))
}

/// Parse one reviews page (initial or AJAX continuation), returning
/// the reviews plus the pagination key of the next page, if any.
pub fn parse_reviews_page(
    html: &str,
    title: &str,
) -> Result<(Vec<Review>, Option<String>), ScrapeError> {
    let document = Html::parse_document(html);
    let list_sel = selector("div.lister-list")?;
    let item_sel = selector("div.lister-item")?;
    let rating_sel = selector("div.ipl-ratings-bar")?;
    let author_sel = selector("span.display-name-link")?;
    let author_link_sel = selector("a")?;
    let date_sel = selector("span.review-date")?;
    let content_sel = selector("div.text")?;
    let actions_sel = selector("div.actions")?;
    let load_more_sel = selector("div.load-more-data")?;

    let list = document
        .select(&list_sel)
        .next()
        .ok_or_else(|| ScrapeError::malformed(PAGE, title, "no review list container"))?;

    let mut reviews = Vec::new();
    for item in list.select(&item_sel) {
        let rating = match item.select(&rating_sel).next() {
            Some(bar) => {
                let text = bar.text().collect::<String>();
                let text = text.trim();
                let digits = text.split('/').next().unwrap_or_default().trim();
                Some(digits.parse::<u8>().map_err(|_| {
                    ScrapeError::malformed(PAGE, title, format!("unparseable rating {text:?}"))
                })?)
            }
            None => None,
        };

        let author_span = item
            .select(&author_sel)
            .next()
            .ok_or_else(|| ScrapeError::malformed(PAGE, title, "review without author"))?;
        let author = ReviewAuthor {
            name: author_span.text().collect::<String>().trim().to_string(),
            id: author_span
                .select(&author_link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
                .ok_or_else(|| ScrapeError::malformed(PAGE, title, "author without profile link"))?
                .trim()
                .to_string(),
        };

        let date = item
            .select(&date_sel)
            .next()
            .ok_or_else(|| ScrapeError::malformed(PAGE, title, "review without date"))?
            .text()
            .collect::<String>()
            .trim()
            .to_string();
        let epoch_date = parse_display_date(&date).ok_or_else(|| {
            ScrapeError::malformed(PAGE, title, format!("unparseable review date {date:?}"))
        })?;

        let content = item
            .select(&content_sel)
            .next()
            .ok_or_else(|| ScrapeError::malformed(PAGE, title, "review without body"))?
            .text()
            .collect::<String>()
            .trim()
            .to_string();

        let actions = item
            .select(&actions_sel)
            .next()
            .ok_or_else(|| ScrapeError::malformed(PAGE, title, "review without actions bar"))?
            .text()
            .collect::<String>();
        let nums = numeric_tokens(&actions);
        let [helpful_count, total_count, ..] = nums.as_slice() else {
            return Err(ScrapeError::malformed(
                PAGE,
                title,
                format!("expected two vote counts in actions bar, got {nums:?}"),
            ));
        };

        reviews.push(Review {
            rating,
            author,
            date,
            epoch_date,
            content,
            helpful_vote: HelpfulVote {
                helpful_count: *helpful_count,
                total_count: *total_count,
            },
        });
    }

    let pagination_key = document
        .select(&load_more_sel)
        .next()
        .and_then(|el| el.value().attr("data-key"))
        .map(|k| k.trim().to_string());

    Ok((reviews, pagination_key))
}

/// Display dates look like "12 March 2019". Epoch seconds are taken at
/// UTC midnight of that day.
fn parse_display_date(date: &str) -> Option<i64> {
    let date = NaiveDate::parse_from_str(date, "%d %B %Y").ok()?;
    Some(date.and_time(NaiveTime::MIN).and_utc().timestamp())
}

/// Runs of digits and thousands separators, commas stripped, parsed in
/// order of appearance. Mirrors pulling "123" and "1,456" out of
/// "123 out of 1,456 found this helpful".
fn numeric_tokens(text: &str) -> Vec<u64> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() {
            current.push(c);
        } else if c != ',' && !current.is_empty() {
            if let Ok(n) = current.parse::<u64>() {
                tokens.push(n);
            }
            current.clear();
        }
    }
    tokens
}
