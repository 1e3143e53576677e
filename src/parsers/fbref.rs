use std::collections::HashSet;

use log::{debug, info, warn};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::query;
use super::SourceParser;
use crate::config::{FBREF_BASE_URL, FBREF_POSITIONS};
use crate::models::{Club, RawPlayerRecord, SourceTag};

struct Selectors {
    standard_table: Selector,
    any_stats_table: Selector,
    rows: Selector,
    column_header: Selector,
    player_cell: Selector,
    link: Selector,
    position_cell: Selector,
    team_cell: Selector,
    nationality_cell: Selector,
    flag: Selector,
    team_link: Selector,
    heading: Selector,
    heading_span: Selector,
    meta_paragraphs: Selector,
    squad_link: Selector,
}

impl Selectors {
    fn new() -> Self {
        Selectors {
            standard_table: query::compile(r#"table[id*="stats_standard"]"#),
            any_stats_table: query::compile("table.stats_table"),
            rows: query::compile("tbody tr"),
            column_header: query::compile(r#"th[scope="col"]"#),
            player_cell: query::compile(r#"th[data-stat="player"], td[data-stat="player"]"#),
            link: query::compile("a"),
            position_cell: query::compile(r#"td[data-stat="position"]"#),
            team_cell: query::compile(r#"td[data-stat="team"]"#),
            nationality_cell: query::compile(r#"td[data-stat="nationality"]"#),
            flag: query::compile(r#"span[class*="f-"]"#),
            team_link: query::compile(r#"td[data-stat="team"] a[href*="/squads/"]"#),
            heading: query::compile("h1"),
            heading_span: query::compile("span"),
            meta_paragraphs: query::compile("div#meta p"),
            squad_link: query::compile(r#"a[href*="/squads/"]"#),
        }
    }
}

/// Secondary source: FBref league and squad stats tables.
pub struct FbrefParser {
    base: Url,
    sel: Selectors,
    position_code: Regex,
}

impl Default for FbrefParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FbrefParser {
    pub fn new() -> Self {
        FbrefParser {
            base: Url::parse(FBREF_BASE_URL).expect("valid FBref base URL"),
            sel: Selectors::new(),
            position_code: Regex::new(r"\b([A-Z]{2,3})\b").expect("valid position code regex"),
        }
    }

    /// Every player in a league-wide standard stats table.
    pub fn parse_league_players(&self, html: &str, league: &str) -> Vec<RawPlayerRecord> {
        let players = self.parse_stats_table(html, league, "");
        info!("Found {} players from FBref for {}", players.len(), league);
        players
    }

    fn parse_stats_table(&self, html: &str, league: &str, fallback_club: &str) -> Vec<RawPlayerRecord> {
        let mut document = Html::parse_document(html);
        if self.find_stats_table(&document).is_none() && html.contains("<!--") {
            // FBref ships most secondary tables inside HTML comments
            debug!("Stats table not found for {}, retrying with comments unwrapped", league);
            document = Html::parse_document(&html.replace("<!--", "").replace("-->", ""));
        }

        let Some(table) = self.find_stats_table(&document) else {
            warn!("Could not find stats table for {}", league);
            return Vec::new();
        };

        table
            .select(&self.sel.rows)
            .filter(|row| query::first(*row, &self.sel.column_header).is_none())
            .filter_map(|row| {
                let player = self.parse_player_row(row, league, fallback_club);
                if player.is_none() {
                    debug!("Skipping FBref row without a player cell");
                }
                player
            })
            .collect()
    }

    fn find_stats_table<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        document
            .select(&self.sel.standard_table)
            .next()
            .or_else(|| document.select(&self.sel.any_stats_table).next())
    }

    fn parse_player_row(&self, row: ElementRef<'_>, league: &str, fallback_club: &str) -> Option<RawPlayerRecord> {
        let cell = query::first(row, &self.sel.player_cell)?;
        let link = query::first(cell, &self.sel.link);
        let name = link.and_then(query::non_empty_text).or_else(|| query::non_empty_text(cell))?;
        let profile_url = link
            .and_then(|a| query::attr(a, "href"))
            .and_then(|href| query::resolve_link(&self.base, &href));

        let positions = query::first_text(row, &self.sel.position_cell)
            .map(|text| split_codes(&text))
            .unwrap_or_default();

        let club = query::first(row, &self.sel.team_cell)
            .and_then(|team| {
                query::first(team, &self.sel.link)
                    .and_then(query::non_empty_text)
                    .or_else(|| query::non_empty_text(team))
            })
            .unwrap_or_else(|| fallback_club.to_string());

        let nationality = query::first(row, &self.sel.nationality_cell)
            .and_then(|nation| {
                match query::first(nation, &self.sel.flag) {
                    Some(flag) => query::attr(flag, "title"),
                    None => query::non_empty_text(nation),
                }
            })
            .unwrap_or_default();

        Some(RawPlayerRecord {
            positions,
            club,
            league: league.to_string(),
            nationality,
            profile_url,
            ..RawPlayerRecord::new(name, SourceTag::Secondary)
        })
    }
}

/// "DF,MF" → ["DF,MF"] when the hybrid is a known code, "GK,DF" → ["GK", "DF"] otherwise.
fn split_codes(text: &str) -> Vec<String> {
    let compact: String = text.split(',').map(str::trim).collect::<Vec<_>>().join(",");
    if compact.contains(',') && FBREF_POSITIONS.iter().any(|(key, _)| key.eq_ignore_ascii_case(&compact)) {
        return vec![compact];
    }
    text.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(str::to_string)
        .collect()
}

impl SourceParser for FbrefParser {
    fn source(&self) -> SourceTag {
        SourceTag::Secondary
    }

    fn parse_clubs(&self, html: &str, league: &str) -> Vec<Club> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut clubs = Vec::new();

        for link in document.select(&self.sel.team_link) {
            let Some(name) = query::non_empty_text(link) else {
                continue;
            };
            let Some(url) = query::attr(link, "href").and_then(|href| query::resolve_link(&self.base, &href)) else {
                continue;
            };
            if !seen.insert(name.clone()) {
                continue;
            }
            clubs.push(Club {
                name,
                roster_url: url.clone(),
                canonical_url: url,
                league: league.to_string(),
            });
        }

        if clubs.is_empty() {
            warn!("Could not find any squad links for {}", league);
        } else {
            info!("Found {} clubs in {} on FBref", clubs.len(), league);
        }
        clubs
    }

    fn parse_roster(&self, html: &str, club: &Club) -> Vec<RawPlayerRecord> {
        let players = self.parse_stats_table(html, &club.league, &club.name);
        info!("Found {} FBref players for {}", players.len(), club.name);
        players
    }

    fn parse_profile(&self, html: &str, profile_url: &str) -> Option<RawPlayerRecord> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let Some(heading) = query::first(root, &self.sel.heading) else {
            warn!("No player heading on {}", profile_url);
            return None;
        };
        let name = query::first_text(heading, &self.sel.heading_span).or_else(|| query::non_empty_text(heading))?;

        let mut positions = Vec::new();
        for p in root.select(&self.sel.meta_paragraphs) {
            let text = query::text(p);
            let Some(idx) = text.find("Position:") else {
                continue;
            };
            // "Position: FW-ST, MF-AM ▪ Footed: Left"
            let value = &text[idx + "Position:".len()..];
            for part in value.split(|c| c == ',' || c == '▸') {
                for cap in self.position_code.captures_iter(part) {
                    positions.push(cap[1].to_string());
                }
            }
        }

        Some(RawPlayerRecord {
            positions,
            club: query::first_text(root, &self.sel.squad_link).unwrap_or_default(),
            profile_url: Some(profile_url.to_string()),
            ..RawPlayerRecord::new(name, SourceTag::Secondary)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STATS_TABLE: &str = r#"
        <table class="stats_table" id="stats_standard_9">
          <thead><tr><th scope="col" data-stat="player">Player</th></tr></thead>
          <tbody>
            <tr>
              <th data-stat="ranker">1</th>
              <td data-stat="player"><a href="/en/players/e46012d4/Kevin-De-Bruyne">Kevin De Bruyne</a></td>
              <td data-stat="nationality"><a href="/en/country/BEL"><span class="f-i f-be" title="Belgium">be</span> BEL</a></td>
              <td data-stat="position">MF,FW</td>
              <td data-stat="team"><a href="/en/squads/b8fd03ef/Manchester-City-Stats">Manchester City</a></td>
            </tr>
            <tr class="thead"><th scope="col" data-stat="player">Player</th></tr>
            <tr>
              <td data-stat="player">José García</td>
              <td data-stat="nationality">ESP</td>
              <td data-stat="position">DF</td>
              <td data-stat="team"><a href="/en/squads/aa/Girona-Stats">Girona</a></td>
            </tr>
            <tr><td data-stat="position">GK</td></tr>
          </tbody>
        </table>"#;

    #[test]
    fn test_parse_league_players() {
        let parser = FbrefParser::new();
        let html = format!("<html><body>{}</body></html>", STATS_TABLE);
        let players = parser.parse_league_players(&html, "Premier League");

        assert_eq!(players.len(), 2);
        let kdb = &players[0];
        assert_eq!(kdb.name, "Kevin De Bruyne");
        assert_eq!(kdb.positions, vec!["MF,FW".to_string()]);
        assert_eq!(kdb.club, "Manchester City");
        assert_eq!(kdb.nationality, "Belgium");
        assert_eq!(kdb.league, "Premier League");
        assert_eq!(
            kdb.profile_url.as_deref(),
            Some("https://fbref.com/en/players/e46012d4/Kevin-De-Bruyne")
        );
        assert_eq!(kdb.source, SourceTag::Secondary);

        let garcia = &players[1];
        assert_eq!(garcia.name, "José García");
        assert_eq!(garcia.nationality, "ESP");
        assert_eq!(garcia.profile_url, None);
        assert_eq!(garcia.positions, vec!["DF".to_string()]);
    }

    #[test]
    fn test_commented_out_table_is_found() {
        let parser = FbrefParser::new();
        let html = format!(
            r#"<html><body><div id="all_stats_standard"><!--{}--></div></body></html>"#,
            STATS_TABLE
        );
        assert_eq!(parser.parse_league_players(&html, "Premier League").len(), 2);
    }

    #[test]
    fn test_missing_table_yields_empty_list() {
        let parser = FbrefParser::new();
        assert!(parser
            .parse_league_players("<html><body><table id='other'></table></body></html>", "X")
            .is_empty());
    }

    #[test]
    fn test_parse_roster_uses_page_club_when_team_column_missing() {
        let parser = FbrefParser::new();
        let html = r#"<table id="stats_standard_9"><tbody><tr>
            <th data-stat="player"><a href="/en/players/1/Rodri">Rodri</a></th>
            <td data-stat="position">MF</td></tr></tbody></table>"#;
        let club = Club {
            name: "Manchester City".to_string(),
            canonical_url: "https://fbref.com/en/squads/b8fd03ef".to_string(),
            league: "Premier League".to_string(),
            roster_url: "https://fbref.com/en/squads/b8fd03ef".to_string(),
        };
        let players = parser.parse_roster(html, &club);
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].club, "Manchester City");
        assert_eq!(players[0].league, "Premier League");
    }

    #[test]
    fn test_parse_clubs_dedups_squad_links() {
        let parser = FbrefParser::new();
        let html = format!("<html><body>{}{}</body></html>", STATS_TABLE, STATS_TABLE);
        let clubs = parser.parse_clubs(&html, "Premier League");
        let names: Vec<_> = clubs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Manchester City", "Girona"]);
        assert_eq!(clubs[0].roster_url, "https://fbref.com/en/squads/b8fd03ef/Manchester-City-Stats");
    }

    #[test]
    fn test_parse_profile() {
        let parser = FbrefParser::new();
        let html = r#"<html><body>
            <div id="meta">
              <h1><span>Bukayo Saka</span></h1>
              <p><strong>Position:</strong> FW-RW, MF ▪ <strong>Footed:</strong> Left</p>
              <p><strong>Club:</strong> <a href="/en/squads/18bb7c10/Arsenal-Stats">Arsenal</a></p>
            </div></body></html>"#;
        let player = parser.parse_profile(html, "https://fbref.com/en/players/bc7dc64d").unwrap();

        assert_eq!(player.name, "Bukayo Saka");
        assert_eq!(player.club, "Arsenal");
        assert_eq!(player.positions, vec!["FW".to_string(), "RW".to_string(), "MF".to_string()]);
    }

    #[test]
    fn test_split_codes_keeps_known_hybrids_whole() {
        assert_eq!(split_codes("DF,MF"), vec!["DF,MF".to_string()]);
        assert_eq!(split_codes(" fw , mf "), vec!["fw,mf".to_string()]);
        assert_eq!(split_codes("GK,DF"), vec!["GK".to_string(), "DF".to_string()]);
        assert_eq!(split_codes("FW"), vec!["FW".to_string()]);
        assert!(split_codes(" , ").is_empty());
    }
}
