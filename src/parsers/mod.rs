//! Per-source HTML extraction.
//!
//! Both source families produce the same [`Club`] / [`RawPlayerRecord`] shapes so the
//! normalizer never needs to know which parser a record came from.

pub mod fbref;
pub mod query;
pub mod transfermarkt;

pub use fbref::FbrefParser;
pub use transfermarkt::TransfermarktParser;

use crate::models::{Club, RawPlayerRecord, SourceTag};

pub trait SourceParser {
    fn source(&self) -> SourceTag;

    /// Clubs listed on a league page. Empty when the expected table is missing.
    fn parse_clubs(&self, html: &str, league: &str) -> Vec<Club>;

    /// Players listed on a club page. Rows missing required cells are skipped.
    fn parse_roster(&self, html: &str, club: &Club) -> Vec<RawPlayerRecord>;

    /// A single player's profile page. League is left empty for the caller to set.
    fn parse_profile(&self, html: &str, profile_url: &str) -> Option<RawPlayerRecord>;
}
