use scraper::{ElementRef, Html};
use serde::Serialize;

use crate::client::PageFetcher;
use crate::error::{ScrapeError, selector};

const PAGE: &str = "fullcredits";

/// One credited person, crew or cast. Crew rows carry only id, name,
/// category and an optional free-text description; cast rows add the
/// character and thumbnail fields.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditEntry {
    pub category: String,
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_name: Option<String>,
}

/// Whether the title is a movie or an episodic series, read from the
/// cast heading ("Cast" vs "Series Cast"). Series cast tables carry
/// stray rows (episode notes) that get skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowType {
    Movie,
    Series,
}

pub async fn fetch_credits(
    fetcher: &dyn PageFetcher,
    title: &str,
) -> Result<Vec<CreditEntry>, ScrapeError> {
    let body = fetcher.title_page(title, PAGE).await?;
    parse_credits(&body, title)
}

/// All crew entries in table order, then all cast entries in restored
/// document order.
pub fn parse_credits(html: &str, title: &str) -> Result<Vec<CreditEntry>, ScrapeError> {
    let document = Html::parse_document(html);
    let mut entries = parse_crew(&document, title)?;
    entries.extend(parse_cast(&document, title)?);
    Ok(entries)
}

fn parse_crew(document: &Html, title: &str) -> Result<Vec<CreditEntry>, ScrapeError> {
    let table_sel = selector("h4.dataHeaderWithBorder + table.simpleCreditsTable")?;
    let header_sel = selector("h4.dataHeaderWithBorder:not([id])")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a")?;

    let headers: Vec<String> = document
        .select(&header_sel)
        .map(|h| h.text().collect::<String>().trim().to_string())
        .collect();

    let mut entries = Vec::new();
    for (idx, table) in document.select(&table_sel).enumerate() {
        let category = headers.get(idx).ok_or_else(|| {
            ScrapeError::malformed(PAGE, title, format!("crew table {idx} has no heading"))
        })?;
        for row in table.select(&row_sel) {
            let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
            // Separator rows have no link in the first cell.
            let Some(link) = cells.first().and_then(|td| td.select(&link_sel).next()) else {
                continue;
            };
            let href = link.value().attr("href").unwrap_or_default();
            entries.push(CreditEntry {
                category: category.clone(),
                id: href.split('?').next().unwrap_or_default().to_string(),
                name: link.text().collect::<String>().trim().to_string(),
                description: cells
                    .get(2)
                    .map(|td| td.text().collect::<String>().trim().to_string()),
                image_link: None,
                character_id: None,
                character_name: None,
            });
        }
    }
    Ok(entries)
}

fn parse_cast(document: &Html, title: &str) -> Result<Vec<CreditEntry>, ScrapeError> {
    let cast_heading_sel = selector("h4#cast")?;
    let cast_table_sel = selector("table.cast_list")?;
    let odd_sel = selector("tr.odd")?;
    let even_sel = selector("tr.even")?;
    let cell_sel = selector("td")?;
    let link_sel = selector("a")?;
    let img_sel = selector("img")?;

    // The heading is required: it decides movie vs series handling.
    let heading = document
        .select(&cast_heading_sel)
        .next()
        .ok_or_else(|| ScrapeError::malformed(PAGE, title, "no cast heading"))?
        .text()
        .collect::<String>();
    let show_type = if heading.trim().to_lowercase().starts_with("series") {
        ShowType::Series
    } else {
        ShowType::Movie
    };

    let cast_table = document
        .select(&cast_table_sel)
        .next()
        .ok_or_else(|| ScrapeError::malformed(PAGE, title, "no cast table"))?;

    // The markup styles the rows as two alternating classes; selecting
    // by class yields two parallel lists that have to be interleaved
    // pairwise to restore document order.
    let odd: Vec<ElementRef> = cast_table.select(&odd_sel).collect();
    let even: Vec<ElementRef> = cast_table.select(&even_sel).collect();
    if odd.len() != even.len() {
        return Err(ScrapeError::malformed(
            PAGE,
            title,
            format!(
                "cast row lists out of balance: {} odd vs {} even",
                odd.len(),
                even.len()
            ),
        ));
    }

    let mut entries = Vec::new();
    for row in odd.into_iter().zip(even).flat_map(|(a, b)| [a, b]) {
        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if show_type == ShowType::Series && cells.len() != 4 {
            continue;
        }
        if cells.len() < 4 {
            return Err(ScrapeError::malformed(
                PAGE,
                title,
                format!("cast row has {} cells, need 4", cells.len()),
            ));
        }

        let image_link = cells[0]
            .select(&link_sel)
            .next()
            .and_then(|a| a.select(&img_sel).next())
            .and_then(|img| img.value().attr("loadlate"))
            .map(str::to_string);

        let actor_link = cells[1]
            .select(&link_sel)
            .next()
            .ok_or_else(|| ScrapeError::malformed(PAGE, title, "cast row without actor link"))?;
        let actor_href = actor_link.value().attr("href").unwrap_or_default().trim();
        let id = match actor_href.rfind('/') {
            Some(pos) => &actor_href[..pos],
            None => actor_href,
        };

        let character_link = cells[3]
            .select(&link_sel)
            .next()
            .filter(|a| a.value().attr("href").is_some_and(|h| h != "#"));
        let (character_id, character_name) = match character_link {
            Some(a) => {
                let href = a.value().attr("href").unwrap_or_default().trim();
                let id = match href.rfind('?') {
                    Some(pos) => &href[..pos],
                    None => href,
                };
                (
                    Some(id.to_string()),
                    Some(a.text().collect::<String>().trim().to_string()),
                )
            }
            // Uncredited roles link to "#"; keep the cell text with
            // newlines dropped and space runs collapsed.
            None => (
                None,
                Some(collapse_cell_text(
                    &cells[3].text().collect::<String>(),
                )),
            ),
        };

        entries.push(CreditEntry {
            category: "Cast".to_string(),
            id: id.to_string(),
            name: actor_link.text().collect::<String>().trim().to_string(),
            description: None,
            image_link,
            character_id,
            character_name,
        });
    }
    Ok(entries)
}

fn collapse_cell_text(text: &str) -> String {
    text.trim()
        .replace('\n', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
