use imdb_scrape::{PageFetcher, ScrapeError, scrape_title};

const PLOT_PAGE: &str = r#"
    <li class="ipl-zebra-list__item">
      Un café du port, une valise, et personne pour la réclamer.
      <div class="author-container">rdoe-99</div>
    </li>"#;

const KEYWORDS_PAGE: &str = r#"
    <div class="sodatext">café</div>
    <div class="sodatext">harbor</div>"#;

const SECTION_PAGE: &str = r#"
    <div class="list">
      <div class="sodavote" id="it001">
        <div class="sodatext">Links to <a href="/name/nm1/">Someone</a>.</div>
      </div>
    </div>"#;

const CREDITS_PAGE: &str = r#"
    <h4 class="dataHeaderWithBorder">Directed by</h4>
    <table class="simpleCreditsTable">
      <tr><td><a href="/name/nm0000001/">Alice Director</a></td></tr>
    </table>
    <h4 id="cast" class="dataHeaderWithBorder">Cast</h4>
    <table class="cast_list">
      <tr class="odd">
        <td></td>
        <td><a href="/name/nm0000011/">Fred Lead</a></td>
        <td>...</td>
        <td><a href="/title/tt1/characters/nm0000011?x">Le Héros</a></td>
      </tr>
      <tr class="even">
        <td></td>
        <td><a href="/name/nm0000012/">Gina Second</a></td>
        <td>...</td>
        <td>Townsperson</td>
      </tr>
    </table>"#;

const REVIEWS_PAGE: &str = r#"
    <div class="lister-list">
      <div class="lister-item">
        <div class="ipl-ratings-bar">9/10</div>
        <span class="display-name-link"><a href="/user/ur1/">reviewer</a></span>
        <span class="review-date">5 May 2020</span>
        <div class="text">Great film.</div>
        <div class="actions">12 out of 34 found this helpful.</div>
      </div>
    </div>"#;

fn ratings_page() -> String {
    let mut histogram = String::from("<table>\n<tr>\n<th>Rating</th>\n<th>Votes</th>\n</tr>\n");
    for star in 1..=10 {
        histogram.push_str(&format!(
            "<tr>\n<td>{star}</td>\n<td>1.0%</td>\n<td>{}</td>\n</tr>\n",
            star * 10
        ));
    }
    histogram.push_str("</table>");

    let mut demographics = String::from(
        "<table>\n<tr>\n<th>All Ages</th>\n<th>&lt;18</th>\n<th>18-29</th>\n\
         <th>30-44</th>\n<th>45+</th>\n</tr>\n",
    );
    for row in ["All", "Males", "Females"] {
        demographics.push_str(&format!("<tr>\n<td>{row}</td>\n"));
        for _ in 0..5 {
            demographics.push_str("<td>\n7.0\n100\n</td>\n");
        }
        demographics.push_str("</tr>\n");
    }
    demographics.push_str("</table>");

    let geography = "<table>\n<tr>\n<th>Top 1000 voters</th>\n<th>US users</th>\n\
         <th>Non-US users</th>\n</tr>\n<tr>\n<td>\n6.9\n950\n</td>\n\
         <td>\n7.1\n400\n</td>\n<td>\n7.6\n834\n</td>\n</tr>\n</table>";

    format!(
        "<html><body>\n<div class=\"allText\">1,234\n7.5 based on 1,234 votes\n</div>\n\
         {histogram}\n{demographics}\n{geography}\n</body></html>"
    )
}

/// Serves a canned page per section, standing in for imdb.com.
struct FixtureSite;

#[async_trait::async_trait]
impl PageFetcher for FixtureSite {
    async fn title_page(&self, _title: &str, section: &str) -> Result<String, ScrapeError> {
        Ok(match section {
            "plotsummary" => PLOT_PAGE.to_string(),
            "keywords" => KEYWORDS_PAGE.to_string(),
            "goofs" | "quotes" | "trivia" | "crazycredits" => SECTION_PAGE.to_string(),
            "fullcredits" => CREDITS_PAGE.to_string(),
            "ratings" => ratings_page(),
            "reviews" => REVIEWS_PAGE.to_string(),
            other => panic!("unexpected section {other}"),
        })
    }

    async fn reviews_ajax(
        &self,
        _title: &str,
        pagination_key: &str,
    ) -> Result<String, ScrapeError> {
        panic!("no pagination key should be followed, got {pagination_key}")
    }
}

#[tokio::test]
async fn report_has_exactly_the_nine_keys() {
    let report = scrape_title(&FixtureSite, "tt0000001").await.unwrap();
    let json = serde_json::to_value(&report).unwrap();
    let mut keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(
        keys,
        vec![
            "crazycredits",
            "credits",
            "goofs",
            "keywords",
            "quotes",
            "rating",
            "reviews",
            "summaries",
            "trivia"
        ]
    );
}

#[tokio::test]
async fn merged_outputs_come_from_each_extractor() {
    let report = scrape_title(&FixtureSite, "tt0000001").await.unwrap();
    assert_eq!(report.keywords, vec!["café", "harbor"]);
    assert_eq!(report.summaries.len(), 1);
    assert_eq!(report.summaries[0].author.as_deref(), Some("rdoe-99"));
    assert_eq!(report.credits.len(), 3);
    assert_eq!(report.rating.global_rating.num_votes, "1234");
    assert_eq!(report.reviews.len(), 1);
    assert_eq!(report.goofs.len(), 1);
    assert_eq!(report.quotes.len(), 1);
    assert_eq!(report.trivia.len(), 1);
    assert_eq!(report.crazycredits.len(), 1);
}

#[tokio::test]
async fn json_keeps_slashes_and_non_ascii_unescaped() {
    let report = scrape_title(&FixtureSite, "tt0000001").await.unwrap();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("café"));
    assert!(json.contains("Le Héros"));
    assert!(json.contains("/name/nm0000011"));
    assert!(!json.contains("\\u"));
    assert!(!json.contains("\\/"));
}
