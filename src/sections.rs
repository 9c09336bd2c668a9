use std::collections::HashSet;

use scraper::Html;
use serde::Serialize;

use crate::client::PageFetcher;
use crate::error::{ScrapeError, selector};

/// The four trivia-class section pages of a title. They share one
/// markup shape, so one parser covers all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaSection {
    Goofs,
    Quotes,
    Trivia,
    CrazyCredits,
}

impl TriviaSection {
    pub const ALL: [TriviaSection; 4] = [
        TriviaSection::Goofs,
        TriviaSection::Quotes,
        TriviaSection::Trivia,
        TriviaSection::CrazyCredits,
    ];

    /// URL path segment of the section page.
    pub fn path(self) -> &'static str {
        match self {
            TriviaSection::Goofs => "goofs",
            TriviaSection::Quotes => "quotes",
            TriviaSection::Trivia => "trivia",
            TriviaSection::CrazyCredits => "crazycredits",
        }
    }
}

/// Category label for ungrouped items.
const DEFAULT_CATEGORY: &str = "Basic";

#[derive(Debug, Clone, Serialize)]
pub struct SectionItem {
    pub category: String,
    pub id: String,
    pub text: String,
    pub associations: Vec<Association>,
}

/// Cross-reference link embedded in an item's text.
#[derive(Debug, Clone, Serialize)]
pub struct Association {
    pub id: String,
    pub text: String,
}

pub async fn fetch_section(
    fetcher: &dyn PageFetcher,
    title: &str,
    section: TriviaSection,
) -> Result<Vec<SectionItem>, ScrapeError> {
    let body = fetcher.title_page(title, section.path()).await?;
    parse_section(&body, title, section)
}

/// Groups in document order, items within each group in document
/// order. Associations are de-duplicated by href, first occurrence
/// wins.
pub fn parse_section(
    html: &str,
    title: &str,
    section: TriviaSection,
) -> Result<Vec<SectionItem>, ScrapeError> {
    let document = Html::parse_document(html);
    let group_sel = selector("div.list")?;
    let heading_sel = selector("h4.li_group")?;
    let item_sel = selector(".sodavote")?;
    let text_sel = selector(".sodatext")?;
    let link_sel = selector("a")?;

    let mut items = Vec::new();
    for group in document.select(&group_sel) {
        let category = group
            .select(&heading_sel)
            .next()
            .map(|h| h.text().collect::<String>().trim().to_string())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        for item in group.select(&item_sel) {
            let id = item.value().attr("id").unwrap_or_default().to_string();
            let text_el = item.select(&text_sel).next().ok_or_else(|| {
                ScrapeError::malformed(section.path(), title, format!("item {id:?} has no text"))
            })?;

            let mut associations = Vec::new();
            let mut seen = HashSet::new();
            for link in text_el.select(&link_sel) {
                let href = link.value().attr("href").ok_or_else(|| {
                    ScrapeError::malformed(
                        section.path(),
                        title,
                        format!("link without href in item {id:?}"),
                    )
                })?;
                if !seen.insert(href) {
                    continue;
                }
                associations.push(Association {
                    id: href.to_string(),
                    text: link.text().collect::<String>(),
                });
            }

            items.push(SectionItem {
                category: category.clone(),
                id,
                text: text_el.text().collect::<String>().trim().to_string(),
                associations,
            });
        }
    }
    Ok(items)
}
