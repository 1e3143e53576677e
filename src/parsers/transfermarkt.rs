use log::{debug, info, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::query;
use super::SourceParser;
use crate::config::{CURRENT_SEASON, TRANSFERMARKT_BASE_URL};
use crate::models::{Club, RawPlayerRecord, SourceTag};

/// Words that mark a roster cell as the free-text position label.
const POSITION_KEYWORDS: [&str; 10] = [
    "goalkeeper", "keeper", "back", "defender", "midfield",
    "winger", "wing", "forward", "striker", "attack",
];

struct Selectors {
    items_table: Selector,
    rows: Selector,
    name_link: Selector,
    cells: Selector,
    photo: Selector,
    flag: Selector,
    headline: Selector,
    header_label: Selector,
    header_content: Selector,
    info_content: Selector,
    club_link: Selector,
    nationality: Selector,
    profile_photo: Selector,
}

impl Selectors {
    fn new() -> Self {
        Selectors {
            items_table: query::compile("table.items"),
            rows: query::compile("tr.odd, tr.even"),
            name_link: query::compile("td.hauptlink a"),
            cells: query::compile("td"),
            photo: query::compile("img.bilderrahmen-fixed"),
            flag: query::compile("img.flaggenrahmen"),
            headline: query::compile("h1.data-header__headline-wrapper"),
            header_label: query::compile("li.data-header__label"),
            header_content: query::compile("span.data-header__content"),
            info_content: query::compile(".info-table span.info-table__content"),
            club_link: query::compile("span.data-header__club a"),
            nationality: query::compile(r#"span.data-header__content[itemprop="nationality"]"#),
            profile_photo: query::compile("div.data-header__profile-container img"),
        }
    }
}

/// Primary source: Transfermarkt competition, squad and profile pages.
pub struct TransfermarktParser {
    base: Url,
    season: u16,
    sel: Selectors,
    jersey_number: Regex,
}

impl Default for TransfermarktParser {
    fn default() -> Self {
        Self::new(CURRENT_SEASON)
    }
}

impl TransfermarktParser {
    pub fn new(season: u16) -> Self {
        TransfermarktParser {
            base: Url::parse(TRANSFERMARKT_BASE_URL).expect("valid Transfermarkt base URL"),
            season,
            sel: Selectors::new(),
            jersey_number: Regex::new(r"#\d+").expect("valid jersey number regex"),
        }
    }

    /// Club overview URL → season squad URL (`/startseite/` → `/kader/`).
    pub fn roster_url(&self, club_url: &str) -> String {
        if !club_url.contains("/startseite/") {
            return club_url.to_string();
        }
        let squad = club_url.replacen("/startseite/", "/kader/", 1);
        let squad = match squad.find("/saison_id/") {
            Some(idx) => &squad[..idx],
            None => squad.as_str(),
        };
        format!("{}/plus/1/saison_id/{}", squad.trim_end_matches('/'), self.season)
    }

    fn link_url(&self, link: ElementRef<'_>) -> Option<String> {
        query::attr(link, "href").and_then(|href| query::resolve_link(&self.base, &href))
    }

    fn parse_player_row(&self, row: ElementRef<'_>, club: &Club) -> Option<RawPlayerRecord> {
        let link = query::first(row, &self.sel.name_link)?;
        let name = query::non_empty_text(link)?;

        let position = row
            .select(&self.sel.cells)
            .filter(|cell| !query::has_class(*cell, "hauptlink"))
            .filter(|cell| !query::has_descendant_tag(*cell, "td"))
            .filter_map(query::non_empty_text)
            .find(|text| is_position_label(text));

        let photo_url = query::first(row, &self.sel.photo)
            .and_then(|img| query::attr(img, "data-src").or_else(|| query::attr(img, "src")))
            .and_then(|src| query::resolve_link(&self.base, &src));

        Some(RawPlayerRecord {
            positions: position.into_iter().collect(),
            club: club.name.clone(),
            league: club.league.clone(),
            nationality: query::first_attr(row, &self.sel.flag, "title").unwrap_or_default(),
            photo_url,
            profile_url: self.link_url(link),
            ..RawPlayerRecord::new(name, SourceTag::Primary)
        })
    }

    fn profile_positions(&self, root: ElementRef<'_>) -> Vec<String> {
        let mut positions = Vec::new();

        for label in root.select(&self.sel.header_label) {
            if query::text(label).to_lowercase().contains("position") {
                if let Some(value) = query::first_text(label, &self.sel.header_content) {
                    positions.push(value);
                }
            }
        }

        // info table alternates label / value spans
        let mut value_is_position = false;
        for span in root.select(&self.sel.info_content) {
            if query::has_class(span, "info-table__content--label") {
                value_is_position = query::text(span).to_lowercase().contains("position");
            } else if value_is_position {
                if let Some(value) = query::non_empty_text(span) {
                    positions.push(value);
                }
                value_is_position = false;
            }
        }

        positions
    }
}

fn is_position_label(text: &str) -> bool {
    let lower = text.to_lowercase();
    POSITION_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

impl SourceParser for TransfermarktParser {
    fn source(&self) -> SourceTag {
        SourceTag::Primary
    }

    fn parse_clubs(&self, html: &str, league: &str) -> Vec<Club> {
        let document = Html::parse_document(html);
        let Some(table) = document.select(&self.sel.items_table).next() else {
            warn!("Could not find clubs table for {}", league);
            return Vec::new();
        };

        let mut clubs = Vec::new();
        for row in table.select(&self.sel.rows) {
            let Some(link) = query::first(row, &self.sel.name_link) else {
                debug!("Skipping club row without a linked name cell");
                continue;
            };
            let (Some(name), Some(url)) = (query::non_empty_text(link), self.link_url(link)) else {
                debug!("Skipping club row with an empty name or link");
                continue;
            };
            clubs.push(Club {
                roster_url: self.roster_url(&url),
                name,
                canonical_url: url,
                league: league.to_string(),
            });
        }

        info!("Found {} clubs in {}", clubs.len(), league);
        clubs
    }

    fn parse_roster(&self, html: &str, club: &Club) -> Vec<RawPlayerRecord> {
        let document = Html::parse_document(html);
        let Some(table) = document.select(&self.sel.items_table).next() else {
            warn!("Could not find players table for {}", club.name);
            return Vec::new();
        };

        let mut players = Vec::new();
        for row in table.select(&self.sel.rows) {
            match self.parse_player_row(row, club) {
                Some(player) => players.push(player),
                None => debug!("Skipping player row without a linked name in {}", club.name),
            }
        }

        info!("Found {} players for {}", players.len(), club.name);
        players
    }

    fn parse_profile(&self, html: &str, profile_url: &str) -> Option<RawPlayerRecord> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let Some(headline) = query::first_text(root, &self.sel.headline) else {
            warn!("No player headline on {}", profile_url);
            return None;
        };
        let name = query::normalize_ws(&self.jersey_number.replace_all(&headline, ""));
        if name.is_empty() {
            return None;
        }

        let photo_url = query::first(root, &self.sel.profile_photo)
            .and_then(|img| query::attr(img, "src"))
            .and_then(|src| query::resolve_link(&self.base, &src));

        Some(RawPlayerRecord {
            positions: self.profile_positions(root),
            club: query::first_text(root, &self.sel.club_link).unwrap_or_default(),
            nationality: query::first_text(root, &self.sel.nationality).unwrap_or_default(),
            photo_url,
            profile_url: Some(profile_url.to_string()),
            ..RawPlayerRecord::new(name, SourceTag::Primary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLUBS_PAGE: &str = r#"
        <html><body>
        <table class="items"><tbody>
          <tr class="odd">
            <td class="zentriert no-border-rechts"><img src="/crest.png"></td>
            <td class="hauptlink no-border-links"><a href="/fc-arsenal/startseite/verein/11/saison_id/2025" title="Arsenal FC">Arsenal FC</a></td>
          </tr>
          <tr class="even">
            <td class="hauptlink"><a href="/manchester-city/startseite/verein/281">Manchester City</a></td>
          </tr>
          <tr class="odd"><td>no link here</td></tr>
        </tbody></table>
        </body></html>"#;

    const SQUAD_PAGE: &str = r#"
        <html><body>
        <table class="items"><tbody>
          <tr class="odd">
            <td class="zentriert rueckennummer">1</td>
            <td class="posrela">
              <table class="inline-table">
                <tr>
                  <td rowspan="2"><img class="bilderrahmen-fixed" data-src="https://img.a.transfermarkt.technology/raya.jpg" src="data:image/gif;base64,xx"></td>
                  <td class="hauptlink"><a href="/david-raya/profil/spieler/262749">David Raya</a></td>
                </tr>
                <tr><td>Goalkeeper</td></tr>
              </table>
            </td>
            <td class="zentriert"><img class="flaggenrahmen" title="Spain" src="/es.png"></td>
          </tr>
          <tr class="even">
            <td class="posrela">
              <table class="inline-table">
                <tr><td class="hauptlink"><a href="/william-saliba/profil/spieler/495666">William Saliba</a></td></tr>
                <tr><td>Centre-Back</td></tr>
              </table>
            </td>
            <td class="zentriert"><img class="flaggenrahmen" title="France"></td>
          </tr>
          <tr class="odd">
            <td class="posrela"><table class="inline-table"><tr><td>Left Winger</td></tr></table></td>
          </tr>
          <tr class="even">
            <td class="posrela">
              <table class="inline-table">
                <tr><td class="hauptlink"><a href="/x/profil/spieler/1">Nobody Positioned</a></td></tr>
              </table>
            </td>
          </tr>
        </tbody></table>
        </body></html>"#;

    const PROFILE_PAGE: &str = r#"
        <html><body>
        <header class="data-header">
          <h1 class="data-header__headline-wrapper"><span class="data-header__shirt-number">#9</span> Erling Haaland</h1>
          <span class="data-header__club"><a href="/manchester-city/startseite/verein/281">Manchester City</a></span>
          <div class="data-header__profile-container"><img src="https://img.tm/haaland.jpg"></div>
          <ul>
            <li class="data-header__label">Citizenship: <span class="data-header__content" itemprop="nationality">Norway</span></li>
            <li class="data-header__label">Position: <span class="data-header__content">Centre-Forward</span></li>
          </ul>
        </header>
        <div class="info-table">
          <span class="info-table__content info-table__content--label">Height:</span>
          <span class="info-table__content info-table__content--regular">1,95 m</span>
          <span class="info-table__content info-table__content--label">Position:</span>
          <span class="info-table__content info-table__content--regular">Attack - Centre-Forward</span>
        </div>
        </body></html>"#;

    fn club() -> Club {
        Club {
            name: "Arsenal FC".to_string(),
            canonical_url: "https://www.transfermarkt.com/fc-arsenal/startseite/verein/11".to_string(),
            league: "Premier League".to_string(),
            roster_url: "https://www.transfermarkt.com/fc-arsenal/kader/verein/11/plus/1/saison_id/2025".to_string(),
        }
    }

    #[test]
    fn test_parse_clubs() {
        let parser = TransfermarktParser::new(2025);
        let clubs = parser.parse_clubs(CLUBS_PAGE, "Premier League");

        assert_eq!(clubs.len(), 2);
        assert_eq!(clubs[0].name, "Arsenal FC");
        assert_eq!(
            clubs[0].canonical_url,
            "https://www.transfermarkt.com/fc-arsenal/startseite/verein/11/saison_id/2025"
        );
        assert_eq!(
            clubs[0].roster_url,
            "https://www.transfermarkt.com/fc-arsenal/kader/verein/11/plus/1/saison_id/2025"
        );
        assert_eq!(
            clubs[1].roster_url,
            "https://www.transfermarkt.com/manchester-city/kader/verein/281/plus/1/saison_id/2025"
        );
        assert_eq!(clubs[1].league, "Premier League");
    }

    #[test]
    fn test_roster_url_without_overview_segment_is_unchanged() {
        let parser = TransfermarktParser::new(2024);
        assert_eq!(parser.roster_url("https://x.com/club/kader/1"), "https://x.com/club/kader/1");
    }

    #[test]
    fn test_parse_roster() {
        let parser = TransfermarktParser::new(2025);
        let players = parser.parse_roster(SQUAD_PAGE, &club());

        // the row without a linked name is skipped
        assert_eq!(players.len(), 3);

        let raya = &players[0];
        assert_eq!(raya.name, "David Raya");
        assert_eq!(raya.positions, vec!["Goalkeeper".to_string()]);
        assert_eq!(raya.nationality, "Spain");
        assert_eq!(raya.photo_url.as_deref(), Some("https://img.a.transfermarkt.technology/raya.jpg"));
        assert_eq!(
            raya.profile_url.as_deref(),
            Some("https://www.transfermarkt.com/david-raya/profil/spieler/262749")
        );
        assert_eq!(raya.club, "Arsenal FC");
        assert_eq!(raya.league, "Premier League");
        assert_eq!(raya.source, SourceTag::Primary);

        assert_eq!(players[1].positions, vec!["Centre-Back".to_string()]);
        assert_eq!(players[1].photo_url, None);

        assert!(players[2].positions.is_empty());
        assert!(players[2].nationality.is_empty());
    }

    #[test]
    fn test_missing_table_yields_empty_list() {
        let parser = TransfermarktParser::default();
        assert!(parser.parse_clubs("<html><body><p>maintenance</p></body></html>", "X").is_empty());
        assert!(parser.parse_roster("", &club()).is_empty());
    }

    #[test]
    fn test_parse_profile() {
        let parser = TransfermarktParser::default();
        let url = "https://www.transfermarkt.com/erling-haaland/profil/spieler/418560";
        let player = parser.parse_profile(PROFILE_PAGE, url).unwrap();

        assert_eq!(player.name, "Erling Haaland");
        assert_eq!(player.club, "Manchester City");
        assert_eq!(player.nationality, "Norway");
        assert_eq!(player.photo_url.as_deref(), Some("https://img.tm/haaland.jpg"));
        assert_eq!(
            player.positions,
            vec!["Centre-Forward".to_string(), "Attack - Centre-Forward".to_string()]
        );
        assert_eq!(player.profile_url.as_deref(), Some(url));
        assert!(player.league.is_empty());
    }

    #[test]
    fn test_profile_without_headline() {
        let parser = TransfermarktParser::default();
        assert!(parser.parse_profile("<html><body></body></html>", "u").is_none());
    }

    #[test]
    fn test_relative_photo_urls_are_resolved() {
        let parser = TransfermarktParser::default();
        let squad = r#"
            <table class="items"><tbody><tr class="odd">
              <td><img class="bilderrahmen-fixed" src="/images/portrait/odegaard.jpg"></td>
              <td class="hauptlink"><a href="/martin-odegaard/profil/spieler/316264">Martin Ødegaard</a></td>
              <td>Attacking Midfield</td>
            </tr></tbody></table>"#;
        let players = parser.parse_roster(squad, &club());
        assert_eq!(
            players[0].photo_url.as_deref(),
            Some("https://www.transfermarkt.com/images/portrait/odegaard.jpg")
        );

        let profile = PROFILE_PAGE.replace("https://img.tm/haaland.jpg", "//img.tm/haaland.jpg");
        let player = parser.parse_profile(&profile, "https://www.transfermarkt.com/erling-haaland").unwrap();
        assert_eq!(player.photo_url.as_deref(), Some("https://img.tm/haaland.jpg"));
    }
}
