use std::collections::BTreeMap;

use log::{error, info, warn};

use crate::config::{self, FetchConfig, League, CURRENT_SEASON};
use crate::fetcher::{FetchOutcome, Fetcher, HttpTransport, Transport, TransportError};
use crate::models::{CanonicalPlayer, Club, RawPlayerRecord, SourceTag};
use crate::normalizer;
use crate::parsers::{FbrefParser, SourceParser, TransfermarktParser};

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeOptions {
    pub include_secondary: bool,
    pub max_clubs: Option<usize>,
    /// Fetch the profile page of roster entries that carry no position label.
    pub resolve_missing_positions: bool,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        ScrapeOptions {
            include_secondary: true,
            max_clubs: None,
            resolve_missing_positions: false,
        }
    }
}

/// Drives club discovery, roster scraping, FBref augmentation and the merge for one
/// league at a time. Nothing in here returns an error: a failed page shrinks the
/// output and is logged.
pub struct FootballScraper<T: Transport = HttpTransport> {
    fetcher: Fetcher<T>,
    primary: TransfermarktParser,
    secondary: FbrefParser,
    leagues: Vec<League>,
}

impl FootballScraper<HttpTransport> {
    pub fn new(config: FetchConfig) -> Result<Self, TransportError> {
        Ok(FootballScraper::with_fetcher(Fetcher::http(config)?, CURRENT_SEASON))
    }

    pub fn for_season(config: FetchConfig, season: u16) -> Result<Self, TransportError> {
        Ok(FootballScraper::with_fetcher(Fetcher::http(config)?, season))
    }
}

impl<T: Transport> FootballScraper<T> {
    pub fn with_fetcher(fetcher: Fetcher<T>, season: u16) -> Self {
        FootballScraper::with_leagues(fetcher, season, config::leagues(season))
    }

    pub fn with_leagues(fetcher: Fetcher<T>, season: u16, leagues: Vec<League>) -> Self {
        FootballScraper {
            fetcher,
            primary: TransfermarktParser::new(season),
            secondary: FbrefParser::new(),
            leagues,
        }
    }

    pub fn leagues(&self) -> &[League] {
        &self.leagues
    }

    pub fn league(&self, slug: &str) -> Option<&League> {
        self.leagues.iter().find(|l| l.slug == slug)
    }

    pub fn scrape_league(&mut self, slug: &str, include_secondary: bool, max_clubs: Option<usize>) -> Vec<CanonicalPlayer> {
        let options = ScrapeOptions {
            include_secondary,
            max_clubs,
            ..ScrapeOptions::default()
        };
        self.scrape_league_with(slug, &options)
    }

    pub fn scrape_league_with(&mut self, slug: &str, options: &ScrapeOptions) -> Vec<CanonicalPlayer> {
        let Some(league) = self.league(slug).cloned() else {
            error!("Unknown league: {}", slug);
            return Vec::new();
        };
        info!("Starting scrape for {}", league.name);

        let mut clubs = self.league_clubs(&league);
        if clubs.is_empty() {
            warn!("No clubs discovered for {}; league yields no players", league.name);
        }
        if let Some(max) = options.max_clubs {
            if clubs.len() > max {
                clubs.truncate(max);
                info!("Limited to {} clubs", max);
            }
        }

        let mut primary_records = Vec::new();
        for club in &clubs {
            primary_records.extend(self.club_players(club));
        }
        info!("Scraped {} players from Transfermarkt", primary_records.len());

        if options.resolve_missing_positions {
            self.fill_missing_positions(&mut primary_records);
        }

        let secondary_records = if options.include_secondary {
            let records = self.secondary_players(&league);
            info!("Got {} players from FBref", records.len());
            records
        } else {
            Vec::new()
        };

        let mut players = normalizer::merge_players(&primary_records, &secondary_records);
        for player in &mut players {
            player.league = league.name.clone();
        }

        info!("Normalized {} players for {}", players.len(), league.name);
        players
    }

    /// Runs each league in turn; every requested slug gets an entry, possibly empty.
    pub fn scrape_all(&mut self, slugs: Option<&[String]>, options: &ScrapeOptions) -> BTreeMap<String, Vec<CanonicalPlayer>> {
        let targets: Vec<String> = match slugs {
            Some(slugs) => slugs.to_vec(),
            None => self.leagues.iter().map(|l| l.slug.clone()).collect(),
        };

        let mut all_players = BTreeMap::new();
        for slug in targets {
            let players = self.scrape_league_with(&slug, options);
            if players.is_empty() {
                warn!("No players collected for {}", slug);
            }
            all_players.insert(slug, players);
        }
        all_players
    }

    pub fn league_clubs(&mut self, league: &League) -> Vec<Club> {
        let url = league.squad_url.as_deref().unwrap_or(&league.url);
        match self.fetcher.fetch(url) {
            FetchOutcome::Content(html) => self.primary.parse_clubs(&html, &league.name),
            outcome => {
                error!("Failed to fetch league page {} ({:?})", url, outcome);
                Vec::new()
            }
        }
    }

    pub fn club_players(&mut self, club: &Club) -> Vec<RawPlayerRecord> {
        if club.roster_url.is_empty() {
            warn!("No squad URL for {}", club.name);
            return Vec::new();
        }

        let players = match self.fetcher.fetch(&club.roster_url) {
            FetchOutcome::Content(html) => self.primary.parse_roster(&html, club),
            outcome => {
                warn!("Failed to fetch squad page for {} ({:?})", club.name, outcome);
                return Vec::new();
            }
        };
        if players.is_empty() {
            warn!("Squad page for {} yielded no players", club.name);
        }
        players
    }

    pub fn secondary_players(&mut self, league: &League) -> Vec<RawPlayerRecord> {
        let Some(url) = league.secondary_url.as_deref() else {
            warn!("No FBref URL configured for {}", league.slug);
            return Vec::new();
        };

        match self.fetcher.fetch(url) {
            FetchOutcome::Content(html) => self.secondary.parse_league_players(&html, &league.name),
            outcome => {
                warn!("Failed to fetch FBref page {} ({:?}); continuing without augmentation", url, outcome);
                Vec::new()
            }
        }
    }

    pub fn player_profile(&mut self, profile_url: &str, source: SourceTag) -> Option<RawPlayerRecord> {
        let html = self.fetcher.fetch(profile_url).content()?;
        match source {
            SourceTag::Primary => self.primary.parse_profile(&html, profile_url),
            SourceTag::Secondary => self.secondary.parse_profile(&html, profile_url),
        }
    }

    fn fill_missing_positions(&mut self, records: &mut [RawPlayerRecord]) {
        for record in records.iter_mut().filter(|r| r.positions.is_empty()) {
            let Some(url) = record.profile_url.clone() else {
                continue;
            };
            match self.player_profile(&url, record.source) {
                Some(profile) if !profile.positions.is_empty() => {
                    info!("Recovered positions for {} from profile", record.name);
                    record.positions = profile.positions;
                }
                _ => warn!("Profile of {} has no position either", record.name),
            }
        }
    }

    pub fn close(self) {
        self.fetcher.close();
    }
}
