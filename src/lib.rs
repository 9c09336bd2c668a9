use serde::Serialize;
use tracing::info;

pub mod client;
pub mod credits;
pub mod error;
pub mod keywords;
pub mod plot_summary;
pub mod ratings;
pub mod reviews;
pub mod sections;

pub use client::{ImdbClient, PageFetcher};
pub use error::ScrapeError;

use credits::CreditEntry;
use plot_summary::PlotSummary;
use ratings::RatingSummary;
use reviews::Review;
use sections::{SectionItem, TriviaSection};

/// Everything scraped for one title, merged into the single JSON
/// document the tool prints.
#[derive(Debug, Serialize)]
pub struct TitleReport {
    pub goofs: Vec<SectionItem>,
    pub quotes: Vec<SectionItem>,
    pub trivia: Vec<SectionItem>,
    pub crazycredits: Vec<SectionItem>,
    pub keywords: Vec<String>,
    pub summaries: Vec<PlotSummary>,
    pub credits: Vec<CreditEntry>,
    pub rating: RatingSummary,
    pub reviews: Vec<Review>,
}

/// Run every extractor for `title` in fixed order and merge the
/// results. Extractors are independent of each other; any failure
/// aborts the run with no partial output.
pub async fn scrape_title(
    fetcher: &dyn PageFetcher,
    title: &str,
) -> Result<TitleReport, ScrapeError> {
    info!("fetching goofs for {title}");
    let goofs = sections::fetch_section(fetcher, title, TriviaSection::Goofs).await?;
    info!("fetching quotes for {title}");
    let quotes = sections::fetch_section(fetcher, title, TriviaSection::Quotes).await?;
    info!("fetching trivia for {title}");
    let trivia = sections::fetch_section(fetcher, title, TriviaSection::Trivia).await?;
    info!("fetching crazycredits for {title}");
    let crazycredits = sections::fetch_section(fetcher, title, TriviaSection::CrazyCredits).await?;

    info!("fetching keywords for {title}");
    let keywords = keywords::fetch_keywords(fetcher, title).await?;
    info!("fetching plot summaries for {title}");
    let summaries = plot_summary::fetch_plot_summaries(fetcher, title).await?;
    info!("fetching full credits for {title}");
    let credits = credits::fetch_credits(fetcher, title).await?;
    info!("fetching extended ratings for {title}");
    let rating = ratings::fetch_ratings(fetcher, title).await?;
    info!("fetching all reviews for {title}");
    let reviews = reviews::fetch_all_reviews(fetcher, title).await?;

    Ok(TitleReport {
        goofs,
        quotes,
        trivia,
        crazycredits,
        keywords,
        summaries,
        credits,
        rating,
        reviews,
    })
}
