use clap::Parser;
use tracing_subscriber::EnvFilter;

use imdb_scrape::{ImdbClient, scrape_title};

/// Scrape plot summaries, keywords, reviews, ratings, credits and
/// trivia-class sections for one IMDB title and print them as a
/// single JSON document.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Title identifier, e.g. tt0187393
    title: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr; stdout carries only the JSON document.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let client = ImdbClient::new()?;
    let report = scrape_title(&client, &args.title).await?;

    // serde_json leaves forward slashes and non-ASCII characters
    // unescaped, which downstream consumers rely on.
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
