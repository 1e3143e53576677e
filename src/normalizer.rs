//! Position taxonomy resolution, short names, identity matching and ids.

use std::collections::HashMap;

use log::{debug, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::{FBREF_POSITIONS, TRANSFERMARKT_POSITIONS};
use crate::models::{CanonicalPlayer, PositionCode, RawPlayerRecord, SourceTag, SourceUrls};

const NAME_SUFFIXES: [&str; 7] = ["jr", "jr.", "ii", "iii", "iv", "sr", "sr."];

/// Lower-case particles that belong to the family name ("De Bruyne", "van Dijk").
const NAME_PARTICLES: [&str; 16] = [
    "de", "van", "von", "da", "di", "do", "dos", "das",
    "del", "della", "der", "den", "ten", "ter", "le", "la",
];

const ID_LEN: usize = 12;

fn synonyms(source: SourceTag) -> &'static [(&'static str, PositionCode)] {
    match source {
        SourceTag::Primary => TRANSFERMARKT_POSITIONS,
        SourceTag::Secondary => FBREF_POSITIONS,
    }
}

/// Resolves one raw position label to a canonical code.
pub fn resolve_position(raw: &str, source: SourceTag) -> Option<PositionCode> {
    let cleaned = raw.trim().to_lowercase();
    if cleaned.is_empty() {
        return None;
    }

    if let Some(code) = PositionCode::from_code(&cleaned) {
        return Some(code);
    }

    let table = synonyms(source);
    if let Some((_, code)) = table.iter().find(|(key, _)| key.eq_ignore_ascii_case(&cleaned)) {
        return Some(*code);
    }

    if source == SourceTag::Primary {
        let partial = table.iter().find(|(key, _)| cleaned.contains(key) || key.contains(cleaned.as_str()));
        if let Some((key, code)) = partial {
            debug!("Partial match: '{}' -> '{}' via '{}'", raw, code, key);
            return Some(*code);
        }
    }

    warn!("Could not normalize position: '{}' from {}", raw, source);
    None
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPositions {
    pub primary: PositionCode,
    pub secondary: Vec<PositionCode>,
}

/// Resolves a token list in order, dropping unresolved tokens and duplicates.
/// `None` when nothing resolves.
pub fn resolve_positions<S: AsRef<str>>(raw: &[S], source: SourceTag) -> Option<ResolvedPositions> {
    let mut codes: Vec<PositionCode> = Vec::new();
    for token in raw {
        if let Some(code) = resolve_position(token.as_ref(), source) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }

    if codes.is_empty() {
        return None;
    }
    let primary = codes.remove(0);
    Some(ResolvedPositions { primary, secondary: codes })
}

/// "Lionel Messi" → "L. Messi", "John Smith Jr." → "J. Smith Jr."
pub fn derive_short_name(full_name: &str) -> String {
    let parts: Vec<&str> = full_name.split_whitespace().collect();
    let Some(first) = parts.first() else {
        return String::new();
    };
    if parts.len() == 1 {
        return first.to_string();
    }

    let last = parts.len() - 1;
    let mut family_start = if parts.len() > 2 && NAME_SUFFIXES.contains(&parts[last].to_lowercase().as_str()) {
        last - 1
    } else {
        last
    };
    while family_start > 1 && NAME_PARTICLES.contains(&parts[family_start - 1].to_lowercase().as_str()) {
        family_start -= 1;
    }

    let initial = first.chars().next().map(String::from).unwrap_or_default();
    format!("{}. {}", initial, parts[family_start..].join(" "))
}

/// Accent-stripped, case-folded, alphanumeric-only form of a name used to join sources.
pub fn identity_key(name: &str) -> String {
    let folded: String = name
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect();
    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Stable 12-hex-char id of the lower-cased `name_club_league` triple.
pub fn player_id(name: &str, club: &str, league: &str) -> String {
    let key = format!("{}_{}_{}", name.to_lowercase(), club.to_lowercase(), league.to_lowercase());
    let digest = format!("{:x}", md5::compute(key.as_bytes()));
    digest[..ID_LEN].to_string()
}

/// Builds the canonical record for a primary observation, optionally augmented by its
/// secondary-source match. `None` when the primary record has no resolvable position.
pub fn normalize_player(raw: &RawPlayerRecord, secondary: Option<&RawPlayerRecord>) -> Option<CanonicalPlayer> {
    let Some(ResolvedPositions { primary, secondary: mut others }) = resolve_positions(&raw.positions, raw.source) else {
        warn!("No valid position for player: {}", raw.name);
        return None;
    };

    if let Some(extra) = secondary.and_then(|s| resolve_positions(&s.positions, SourceTag::Secondary)) {
        for code in std::iter::once(extra.primary).chain(extra.secondary) {
            if code != primary && !others.contains(&code) {
                others.push(code);
            }
        }
    }

    let source = SourceUrls {
        transfermarkt_url: match raw.source {
            SourceTag::Primary => raw.profile_url.clone(),
            SourceTag::Secondary => None,
        },
        fbref_url: secondary.and_then(|s| s.profile_url.clone()),
    };

    let nationality = if raw.nationality.trim().is_empty() {
        "Unknown".to_string()
    } else {
        raw.nationality.clone()
    };

    Some(CanonicalPlayer {
        id: player_id(&raw.name, &raw.club, &raw.league),
        name: raw.name.clone(),
        short_name: derive_short_name(&raw.name),
        primary_position: primary,
        secondary_positions: others,
        club: raw.club.clone(),
        league: raw.league.clone(),
        nationality,
        photo_url: raw.photo_url.clone(),
        source,
    })
}

/// Joins primary records with the secondary records of the same league batch by
/// [`identity_key`] and normalizes them. Matching is by name only, so two players with
/// the same normalized name in one batch share a secondary match.
pub fn merge_players(primary: &[RawPlayerRecord], secondary: &[RawPlayerRecord]) -> Vec<CanonicalPlayer> {
    let mut lookup: HashMap<String, &RawPlayerRecord> = HashMap::with_capacity(secondary.len());
    for record in secondary {
        let key = identity_key(&record.name);
        if let Some(previous) = lookup.insert(key.clone(), record) {
            warn!(
                "Identity collision on '{}': {} ({}) replaced by {} ({})",
                key,
                previous.name,
                previous.club,
                record.name,
                record.club
            );
        }
    }

    primary
        .iter()
        .filter_map(|record| {
            let matched = lookup.get(&identity_key(&record.name)).copied();
            if let Some(m) = matched {
                debug!("Matched {} with FBref record {}", record.name, m.name);
            }
            normalize_player(record, matched)
        })
        .collect()
}
