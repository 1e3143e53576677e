use std::fmt;

use serde::{Deserialize, Serialize};

/// Which source family produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// Transfermarkt squad pages.
    Primary,
    /// FBref stats tables.
    Secondary,
}

impl SourceTag {
    pub fn label(&self) -> &'static str {
        match self {
            SourceTag::Primary => "transfermarkt",
            SourceTag::Secondary => "fbref",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The canonical position taxonomy. Every position label reduces to one of these or to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PositionCode {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "RB")]
    RightBack,
    #[serde(rename = "RWB")]
    RightWingBack,
    #[serde(rename = "CB")]
    CentreBack,
    #[serde(rename = "LB")]
    LeftBack,
    #[serde(rename = "LWB")]
    LeftWingBack,
    #[serde(rename = "DM")]
    DefensiveMidfield,
    #[serde(rename = "CM")]
    CentralMidfield,
    #[serde(rename = "AM")]
    AttackingMidfield,
    #[serde(rename = "RW")]
    RightWing,
    #[serde(rename = "LW")]
    LeftWing,
    #[serde(rename = "ST")]
    Striker,
}

impl PositionCode {
    pub const ALL: [PositionCode; 12] = [
        PositionCode::Goalkeeper,
        PositionCode::RightBack,
        PositionCode::RightWingBack,
        PositionCode::CentreBack,
        PositionCode::LeftBack,
        PositionCode::LeftWingBack,
        PositionCode::DefensiveMidfield,
        PositionCode::CentralMidfield,
        PositionCode::AttackingMidfield,
        PositionCode::RightWing,
        PositionCode::LeftWing,
        PositionCode::Striker,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            PositionCode::Goalkeeper => "GK",
            PositionCode::RightBack => "RB",
            PositionCode::RightWingBack => "RWB",
            PositionCode::CentreBack => "CB",
            PositionCode::LeftBack => "LB",
            PositionCode::LeftWingBack => "LWB",
            PositionCode::DefensiveMidfield => "DM",
            PositionCode::CentralMidfield => "CM",
            PositionCode::AttackingMidfield => "AM",
            PositionCode::RightWing => "RW",
            PositionCode::LeftWing => "LW",
            PositionCode::Striker => "ST",
        }
    }

    /// Case-insensitive match against the two/three letter code.
    pub fn from_code(code: &str) -> Option<PositionCode> {
        let code = code.trim();
        PositionCode::ALL
            .into_iter()
            .find(|p| p.code().eq_ignore_ascii_case(code))
    }
}

impl fmt::Display for PositionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Club {
    pub name: String,
    pub canonical_url: String,
    pub league: String,
    pub roster_url: String,
}

/// One observation of a player on one source, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPlayerRecord {
    pub name: String,
    pub positions: Vec<String>,
    pub club: String,
    pub league: String,
    pub nationality: String,
    pub photo_url: Option<String>,
    pub profile_url: Option<String>,
    pub source: SourceTag,
}

impl RawPlayerRecord {
    pub fn new(name: impl Into<String>, source: SourceTag) -> Self {
        RawPlayerRecord {
            name: name.into(),
            positions: Vec::new(),
            club: String::new(),
            league: String::new(),
            nationality: String::new(),
            photo_url: None,
            profile_url: None,
            source,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUrls {
    pub transfermarkt_url: Option<String>,
    pub fbref_url: Option<String>,
}

/// Output record. Field names and casing are consumed by exporters and the API; keep them stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalPlayer {
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub primary_position: PositionCode,
    pub secondary_positions: Vec<PositionCode>,
    pub club: String,
    pub league: String,
    pub nationality: String,
    pub photo_url: Option<String>,
    pub source: SourceUrls,
}
