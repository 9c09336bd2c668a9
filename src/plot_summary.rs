use scraper::{ElementRef, Html};
use serde::Serialize;

use crate::client::PageFetcher;
use crate::error::{ScrapeError, selector};

/// One entry from the plot-summaries page.
#[derive(Debug, Clone, Serialize)]
pub struct PlotSummary {
    pub author: Option<String>,
    pub summary: String,
}

pub async fn fetch_plot_summaries(
    fetcher: &dyn PageFetcher,
    title: &str,
) -> Result<Vec<PlotSummary>, ScrapeError> {
    let body = fetcher.title_page(title, "plotsummary").await?;
    parse_plot_summaries(&body)
}

/// Parse the zebra-list of summaries. The author byline, when present,
/// sits inside the list item, so its subtree is excluded from the item
/// text before trimming.
pub fn parse_plot_summaries(html: &str) -> Result<Vec<PlotSummary>, ScrapeError> {
    let document = Html::parse_document(html);
    let item_sel = selector("li.ipl-zebra-list__item")?;
    let author_sel = selector("div.author-container")?;

    let mut summaries = Vec::new();
    for item in document.select(&item_sel) {
        let author = item
            .select(&author_sel)
            .next()
            .map(|a| a.text().collect::<String>().trim().to_string());
        let summary = text_excluding_class(item, "author-container")
            .trim()
            .to_string();
        summaries.push(PlotSummary { author, summary });
    }
    Ok(summaries)
}

/// Concatenated text of `root`, skipping any descendant element subtree
/// carrying `skip_class`.
fn text_excluding_class(root: ElementRef, skip_class: &str) -> String {
    let mut out = String::new();
    let mut stack: Vec<_> = root.children().rev().collect();
    while let Some(node) = stack.pop() {
        if let Some(el) = ElementRef::wrap(node) {
            if el.value().classes().any(|c| c == skip_class) {
                continue;
            }
        } else if let Some(text) = node.value().as_text() {
            out.push_str(text);
        }
        stack.extend(node.children().rev());
    }
    out
}
