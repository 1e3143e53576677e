use std::time::Duration;

use crate::models::PositionCode;

pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// Polite delay between two requests of the same fetcher.
pub const REQUEST_DELAY_SECS: f64 = 2.0;
pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY_SECS: f64 = 5.0;
/// A 429 waits this many retry delays before the next attempt.
pub const RATE_LIMIT_BACKOFF_FACTOR: u32 = 3;

pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
pub const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

pub const TRANSFERMARKT_BASE_URL: &str = "https://www.transfermarkt.com";
pub const FBREF_BASE_URL: &str = "https://fbref.com";

// 2025 = 2025-26 season. Bump after the summer window closes.
pub const CURRENT_SEASON: u16 = 2025;

pub const DEFAULT_OUTPUT_DIR: &str = "output";

#[derive(Debug, Clone, PartialEq)]
pub struct FetchConfig {
    pub request_delay: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub rate_limit_backoff_factor: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            request_delay: Duration::from_secs_f64(REQUEST_DELAY_SECS),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            max_retries: MAX_RETRIES,
            retry_delay: Duration::from_secs_f64(RETRY_DELAY_SECS),
            rate_limit_backoff_factor: RATE_LIMIT_BACKOFF_FACTOR,
        }
    }
}

impl FetchConfig {
    pub fn rate_limit_backoff(&self) -> Duration {
        self.retry_delay * self.rate_limit_backoff_factor
    }
}

/// League descriptor handed to the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct League {
    pub slug: String,
    pub name: String,
    pub country: String,
    /// Transfermarkt competition overview page.
    pub url: String,
    /// Same page pinned to a season; preferred for club discovery.
    pub squad_url: Option<String>,
    /// FBref league stats page.
    pub secondary_url: Option<String>,
}

struct LeagueSeed {
    slug: &'static str,
    name: &'static str,
    country: &'static str,
    tm_path: &'static str,
    tm_code: &'static str,
    fbref_path: &'static str,
}

const LEAGUE_SEEDS: [LeagueSeed; 5] = [
    LeagueSeed {
        slug: "premier-league",
        name: "Premier League",
        country: "England",
        tm_path: "premier-league",
        tm_code: "GB1",
        fbref_path: "/en/comps/9/Premier-League-Stats",
    },
    LeagueSeed {
        slug: "la-liga",
        name: "La Liga",
        country: "Spain",
        tm_path: "laliga",
        tm_code: "ES1",
        fbref_path: "/en/comps/12/La-Liga-Stats",
    },
    LeagueSeed {
        slug: "bundesliga",
        name: "Bundesliga",
        country: "Germany",
        tm_path: "bundesliga",
        tm_code: "L1",
        fbref_path: "/en/comps/20/Bundesliga-Stats",
    },
    LeagueSeed {
        slug: "serie-a",
        name: "Serie A",
        country: "Italy",
        tm_path: "serie-a",
        tm_code: "IT1",
        fbref_path: "/en/comps/11/Serie-A-Stats",
    },
    LeagueSeed {
        slug: "ligue-1",
        name: "Ligue 1",
        country: "France",
        tm_path: "ligue-1",
        tm_code: "FR1",
        fbref_path: "/en/comps/13/Ligue-1-Stats",
    },
];

/// The configured leagues, with squad URLs pinned to `season`.
pub fn leagues(season: u16) -> Vec<League> {
    LEAGUE_SEEDS
        .iter()
        .map(|seed| {
            let url = format!(
                "{}/{}/startseite/wettbewerb/{}",
                TRANSFERMARKT_BASE_URL, seed.tm_path, seed.tm_code
            );
            League {
                slug: seed.slug.to_string(),
                name: seed.name.to_string(),
                country: seed.country.to_string(),
                squad_url: Some(format!("{}/plus/?saison_id={}", url, season)),
                url,
                secondary_url: Some(format!("{}{}", FBREF_BASE_URL, seed.fbref_path)),
            }
        })
        .collect()
}

pub fn league_slugs() -> Vec<&'static str> {
    LEAGUE_SEEDS.iter().map(|seed| seed.slug).collect()
}

pub fn find_league(slug: &str, season: u16) -> Option<League> {
    leagues(season).into_iter().find(|l| l.slug == slug)
}

/// Transfermarkt free-text labels. Order matters: the partial matcher takes the first hit.
pub const TRANSFERMARKT_POSITIONS: &[(&str, PositionCode)] = &[
    ("goalkeeper", PositionCode::Goalkeeper),
    ("keeper", PositionCode::Goalkeeper),
    ("centre-back", PositionCode::CentreBack),
    ("central defender", PositionCode::CentreBack),
    ("centre back", PositionCode::CentreBack),
    ("defender", PositionCode::CentreBack),
    ("right-back", PositionCode::RightBack),
    ("right back", PositionCode::RightBack),
    ("right fullback", PositionCode::RightBack),
    ("left-back", PositionCode::LeftBack),
    ("left back", PositionCode::LeftBack),
    ("left fullback", PositionCode::LeftBack),
    ("right wing-back", PositionCode::RightWingBack),
    ("right wingback", PositionCode::RightWingBack),
    ("left wing-back", PositionCode::LeftWingBack),
    ("left wingback", PositionCode::LeftWingBack),
    ("defensive midfield", PositionCode::DefensiveMidfield),
    ("defensive midfielder", PositionCode::DefensiveMidfield),
    ("holding midfielder", PositionCode::DefensiveMidfield),
    ("central midfield", PositionCode::CentralMidfield),
    ("central midfielder", PositionCode::CentralMidfield),
    ("midfielder", PositionCode::CentralMidfield),
    ("attacking midfield", PositionCode::AttackingMidfield),
    ("attacking midfielder", PositionCode::AttackingMidfield),
    ("playmaker", PositionCode::AttackingMidfield),
    ("right midfield", PositionCode::RightWing),
    ("right midfielder", PositionCode::RightWing),
    ("left midfield", PositionCode::LeftWing),
    ("left midfielder", PositionCode::LeftWing),
    ("right winger", PositionCode::RightWing),
    ("right wing", PositionCode::RightWing),
    ("left winger", PositionCode::LeftWing),
    ("left wing", PositionCode::LeftWing),
    ("centre-forward", PositionCode::Striker),
    ("centre forward", PositionCode::Striker),
    ("center forward", PositionCode::Striker),
    ("striker", PositionCode::Striker),
    ("forward", PositionCode::Striker),
    ("second striker", PositionCode::Striker),
];

/// FBref short-code dialect, including the joined hybrid codes.
pub const FBREF_POSITIONS: &[(&str, PositionCode)] = &[
    ("GK", PositionCode::Goalkeeper),
    ("DF", PositionCode::CentreBack),
    ("DF,MF", PositionCode::DefensiveMidfield),
    ("MF,DF", PositionCode::DefensiveMidfield),
    ("MF", PositionCode::CentralMidfield),
    ("MF,FW", PositionCode::AttackingMidfield),
    ("FW,MF", PositionCode::AttackingMidfield),
    ("FW", PositionCode::Striker),
    ("RB", PositionCode::RightBack),
    ("LB", PositionCode::LeftBack),
    ("CB", PositionCode::CentreBack),
    ("DM", PositionCode::DefensiveMidfield),
    ("CM", PositionCode::CentralMidfield),
    ("AM", PositionCode::AttackingMidfield),
    ("RW", PositionCode::RightWing),
    ("LW", PositionCode::LeftWing),
    ("ST", PositionCode::Striker),
    ("CF", PositionCode::Striker),
];
