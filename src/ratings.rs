use scraper::{ElementRef, Html};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::client::PageFetcher;
use crate::error::{ScrapeError, selector};

const PAGE: &str = "ratings";

// The ratings page renders its three breakdown tables with a fixed
// column layout (vintage desktop schema, stable for years). Parsing
// flattens each table into non-empty trimmed lines and indexes into
// that token list at the offsets below; token-count preconditions are
// checked before any indexing.

// Star histogram: two header tokens, then three tokens per star level
// (star value, vote share, vote count).
const HISTOGRAM_HEADER_TOKENS: usize = 2;
const HISTOGRAM_GROUP: usize = 3;
const STAR_LEVELS: usize = 10;

// Demographics: tokens [0..5] are the five age-bracket column labels;
// each data row is its own label ("All", "Males", "Females") followed
// by five rating/votes pairs. Base = index of the row's first rating
// token, stride 2 per bracket.
const AGE_BRACKETS: usize = 5;
const ALL_BASE: usize = 6;
const MALES_BASE: usize = 17;
const FEMALES_BASE: usize = 28;
const DEMOGRAPHICS_MIN_TOKENS: usize = FEMALES_BASE + 2 * AGE_BRACKETS;

// Geography: three column labels, then rating/votes pairs for the
// top-1000 voters, US users and non-US users columns.
const TOP1000_BASE: usize = 3;
const US_BASE: usize = 5;
const NON_US_BASE: usize = 7;
const GEOGRAPHY_MIN_TOKENS: usize = NON_US_BASE + 2;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub global_rating: GlobalRating,
    pub detailed_ratings: Vec<StarRating>,
    pub demographic_ratings: DemographicRatings,
    pub geographic_ratings: GeographicRatings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalRating {
    /// Kept as a digits-only string to preserve the page's own count.
    pub num_votes: String,
    pub avg_rating: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StarRating {
    pub rating: u8,
    pub num_votes: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingCell {
    pub rating: f64,
    pub num_votes: u64,
}

/// Age-bracket label to rating cell, in the table's column order.
pub type BracketRatings = Vec<(String, RatingCell)>;

#[derive(Debug, Serialize)]
pub struct DemographicRatings {
    #[serde(serialize_with = "bracket_map")]
    pub all: BracketRatings,
    #[serde(serialize_with = "bracket_map")]
    pub males: BracketRatings,
    #[serde(serialize_with = "bracket_map")]
    pub females: BracketRatings,
}

#[derive(Debug, Serialize)]
pub struct GeographicRatings {
    #[serde(rename = "US")]
    pub us: RatingCell,
    #[serde(rename = "non-US")]
    pub non_us: RatingCell,
    #[serde(rename = "top1000Users")]
    pub top_1000_users: RatingCell,
}

fn bracket_map<S: Serializer>(entries: &BracketRatings, s: S) -> Result<S::Ok, S::Error> {
    let mut map = s.serialize_map(Some(entries.len()))?;
    for (label, cell) in entries {
        map.serialize_entry(label, cell)?;
    }
    map.end()
}

pub async fn fetch_ratings(
    fetcher: &dyn PageFetcher,
    title: &str,
) -> Result<RatingSummary, ScrapeError> {
    let body = fetcher.title_page(title, PAGE).await?;
    parse_ratings(&body, title)
}

pub fn parse_ratings(html: &str, title: &str) -> Result<RatingSummary, ScrapeError> {
    let document = Html::parse_document(html);
    let summary_sel = selector("div.allText")?;
    let table_sel = selector("table")?;

    let summary = document
        .select(&summary_sel)
        .next()
        .ok_or_else(|| ScrapeError::malformed(PAGE, title, "no global summary block"))?;
    let global_rating = parse_global(summary, title)?;

    let tables: Vec<ElementRef> = document.select(&table_sel).collect();
    if tables.len() < 3 {
        return Err(ScrapeError::malformed(
            PAGE,
            title,
            format!("expected 3 breakdown tables, found {}", tables.len()),
        ));
    }

    Ok(RatingSummary {
        global_rating,
        detailed_ratings: parse_histogram(&table_tokens(tables[0]), title)?,
        demographic_ratings: parse_demographics(&table_tokens(tables[1]), title)?,
        geographic_ratings: parse_geography(&table_tokens(tables[2]), title)?,
    })
}

/// The summary block's first line is the total vote count, the second
/// is "X.Y based on N votes".
fn parse_global(block: ElementRef, title: &str) -> Result<GlobalRating, ScrapeError> {
    let text = block.text().collect::<String>();
    let mut lines = text.trim().split('\n');
    let votes_line = lines
        .next()
        .unwrap_or_default()
        .trim()
        .replace(',', "");
    let num_votes: String = votes_line.chars().take_while(char::is_ascii_digit).collect();
    if num_votes.is_empty() {
        return Err(ScrapeError::malformed(PAGE, title, "no global vote count"));
    }
    let avg_line = lines
        .next()
        .ok_or_else(|| ScrapeError::malformed(PAGE, title, "no average rating line"))?;
    let avg_rating = first_number(avg_line)
        .and_then(|n| n.parse::<f64>().ok())
        .ok_or_else(|| {
            ScrapeError::malformed(PAGE, title, format!("no average rating in {avg_line:?}"))
        })?;
    Ok(GlobalRating {
        num_votes,
        avg_rating,
    })
}

fn parse_histogram(tokens: &[String], title: &str) -> Result<Vec<StarRating>, ScrapeError> {
    let need = HISTOGRAM_HEADER_TOKENS + STAR_LEVELS * HISTOGRAM_GROUP;
    if tokens.len() < need {
        return Err(ScrapeError::malformed(
            PAGE,
            title,
            format!("histogram table has {} tokens, need {need}", tokens.len()),
        ));
    }
    let rows = &tokens[HISTOGRAM_HEADER_TOKENS..];
    let mut detailed = Vec::with_capacity(STAR_LEVELS);
    for level in 0..STAR_LEVELS {
        let group = &rows[level * HISTOGRAM_GROUP..];
        detailed.push(StarRating {
            rating: parse_count(&group[0], title)? as u8,
            num_votes: parse_count(&group[2], title)?,
        });
    }
    Ok(detailed)
}

fn parse_demographics(tokens: &[String], title: &str) -> Result<DemographicRatings, ScrapeError> {
    if tokens.len() < DEMOGRAPHICS_MIN_TOKENS {
        return Err(ScrapeError::malformed(
            PAGE,
            title,
            format!(
                "demographics table has {} tokens, need {DEMOGRAPHICS_MIN_TOKENS}",
                tokens.len()
            ),
        ));
    }
    let labels = &tokens[..AGE_BRACKETS];
    let row = |base: usize| -> Result<BracketRatings, ScrapeError> {
        labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                Ok((
                    label.clone(),
                    RatingCell {
                        rating: parse_float(&tokens[base + 2 * i], title)?,
                        num_votes: parse_count(&tokens[base + 2 * i + 1], title)?,
                    },
                ))
            })
            .collect()
    };
    Ok(DemographicRatings {
        all: row(ALL_BASE)?,
        males: row(MALES_BASE)?,
        females: row(FEMALES_BASE)?,
    })
}

fn parse_geography(tokens: &[String], title: &str) -> Result<GeographicRatings, ScrapeError> {
    if tokens.len() < GEOGRAPHY_MIN_TOKENS {
        return Err(ScrapeError::malformed(
            PAGE,
            title,
            format!(
                "geography table has {} tokens, need {GEOGRAPHY_MIN_TOKENS}",
                tokens.len()
            ),
        ));
    }
    let cell = |base: usize| -> Result<RatingCell, ScrapeError> {
        Ok(RatingCell {
            rating: parse_float(&tokens[base], title)?,
            num_votes: parse_count(&tokens[base + 1], title)?,
        })
    };
    Ok(GeographicRatings {
        top_1000_users: cell(TOP1000_BASE)?,
        us: cell(US_BASE)?,
        non_us: cell(NON_US_BASE)?,
    })
}

/// Flatten a table into its non-empty trimmed lines.
fn table_tokens(table: ElementRef) -> Vec<String> {
    table
        .text()
        .collect::<String>()
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// First substring looking like a number, commas stripped.
fn first_number(text: &str) -> Option<String> {
    let mut run = String::new();
    for c in text.chars().chain(std::iter::once(' ')) {
        if c.is_ascii_digit() || c == '.' || c == ',' {
            run.push(c);
        } else if run.chars().any(|c| c.is_ascii_digit()) {
            return Some(run.replace(',', ""));
        } else {
            run.clear();
        }
    }
    None
}

fn parse_count(token: &str, title: &str) -> Result<u64, ScrapeError> {
    token
        .replace(',', "")
        .parse::<u64>()
        .map_err(|_| ScrapeError::malformed(PAGE, title, format!("unparseable count {token:?}")))
}

fn parse_float(token: &str, title: &str) -> Result<f64, ScrapeError> {
    token
        .parse::<f64>()
        .map_err(|_| ScrapeError::malformed(PAGE, title, format!("unparseable rating {token:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Canonical fixture matching the fixed table offsets: histogram
    /// rows 3 tokens each, demographics rows label + 5 pairs, geography
    /// labels then 3 pairs. Cells sit on their own lines, as on the
    /// real page.
    fn fixture() -> String {
        let mut histogram = String::from("<table>\n<tr>\n<th>Rating</th>\n<th>Votes</th>\n</tr>\n");
        for star in 1..=10 {
            histogram.push_str(&format!(
                "<tr>\n<td>{star}</td>\n<td>{star}.0%</td>\n<td>{}</td>\n</tr>\n",
                star * 100
            ));
        }
        histogram.push_str("</table>");

        let labels = ["All Ages", "&lt;18", "18-29", "30-44", "45+"];
        let mut demographics = String::from("<table>\n<tr>\n");
        for label in labels {
            demographics.push_str(&format!("<th>{label}</th>\n"));
        }
        demographics.push_str("</tr>\n");
        for (row, base) in [("All", 70u32), ("Males", 60), ("Females", 80)] {
            demographics.push_str(&format!("<tr>\n<td>{row}</td>\n"));
            for i in 0..5u32 {
                demographics.push_str(&format!(
                    "<td>\n{}.{}\n{}\n</td>\n",
                    base / 10,
                    i,
                    (base + i) * 10
                ));
            }
            demographics.push_str("</tr>\n");
        }
        demographics.push_str("</table>");

        let geography = "<table>\n<tr>\n<th>Top 1000 voters</th>\n<th>US users</th>\n\
             <th>Non-US users</th>\n</tr>\n<tr>\n<td>\n6.9\n950\n</td>\n\
             <td>\n7.1\n400\n</td>\n<td>\n7.6\n834\n</td>\n</tr>\n</table>";

        format!(
            "<html><body>\n<div class=\"allText\">1,234\n7.5 based on 1,234 votes\nmore text\n</div>\n\
             {histogram}\n{demographics}\n{geography}\n</body></html>"
        )
    }

    #[test]
    fn parses_global_block() {
        let summary = parse_ratings(&fixture(), "tt0000001").unwrap();
        assert_eq!(summary.global_rating.num_votes, "1234");
        assert_eq!(summary.global_rating.avg_rating, 7.5);
    }

    #[test]
    fn histogram_has_ten_levels_in_order() {
        let summary = parse_ratings(&fixture(), "tt0000001").unwrap();
        assert_eq!(summary.detailed_ratings.len(), 10);
        for (i, star) in summary.detailed_ratings.iter().enumerate() {
            assert_eq!(star.rating as usize, i + 1);
            assert_eq!(star.num_votes, (i as u64 + 1) * 100);
        }
    }

    #[test]
    fn demographics_read_at_fixed_offsets() {
        let summary = parse_ratings(&fixture(), "tt0000001").unwrap();
        let demo = &summary.demographic_ratings;
        assert_eq!(demo.all.len(), 5);
        assert_eq!(demo.all[0].0, "All Ages");
        assert_eq!(demo.all[0].1.rating, 7.0);
        assert_eq!(demo.all[0].1.num_votes, 700);
        assert_eq!(demo.males[2].1.rating, 6.2);
        assert_eq!(demo.males[2].1.num_votes, 620);
        assert_eq!(demo.females[4].1.rating, 8.4);
        assert_eq!(demo.females[4].1.num_votes, 840);
    }

    #[test]
    fn geography_columns() {
        let summary = parse_ratings(&fixture(), "tt0000001").unwrap();
        let geo = &summary.geographic_ratings;
        assert_eq!(geo.top_1000_users.rating, 6.9);
        assert_eq!(geo.top_1000_users.num_votes, 950);
        assert_eq!(geo.us.rating, 7.1);
        assert_eq!(geo.us.num_votes, 400);
        assert_eq!(geo.non_us.rating, 7.6);
        assert_eq!(geo.non_us.num_votes, 834);
    }

    #[test]
    fn short_demographics_table_is_malformed() {
        let html = fixture().replacen("<td>\n6.0\n600\n</td>\n", "", 5);
        let err = parse_ratings(&html, "tt0000001").unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedPage { .. }));
    }

    #[test]
    fn fewer_than_three_tables_is_malformed() {
        let html = "<html><body><div class=\"allText\">5\n6.0 based on 5 votes</div>\
             <table><tr><td>only</td></tr></table></body></html>";
        let err = parse_ratings(html, "tt0000001").unwrap_err();
        assert!(matches!(err, ScrapeError::MalformedPage { .. }));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let summary = parse_ratings(&fixture(), "tt0000001").unwrap();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["globalRating"]["numVotes"], "1234");
        assert_eq!(json["detailedRatings"][0]["numVotes"], 100);
        assert!(json["demographicRatings"]["all"]["All Ages"]["rating"].is_f64());
        assert!(json["geographicRatings"]["non-US"]["numVotes"].is_u64());
        assert!(json["geographicRatings"]["top1000Users"].is_object());
    }
}
