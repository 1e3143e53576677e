use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::config;
use crate::models::CanonicalPlayer;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LeagueExport<'a> {
    league: &'a str,
    slug: &'a str,
    exported_at: String,
    player_count: usize,
    players: &'a [CanonicalPlayer],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CombinedExport<'a> {
    exported_at: String,
    total_players: usize,
    leagues: Vec<&'a str>,
    players: Vec<&'a CanonicalPlayer>,
}

/// Flat CSV row; positions are comma-joined.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    id: &'a str,
    name: &'a str,
    short_name: &'a str,
    primary_position: &'static str,
    secondary_positions: String,
    club: &'a str,
    league: &'a str,
    nationality: &'a str,
    photo_url: &'a str,
    transfermarkt_url: &'a str,
    fbref_url: &'a str,
}

impl<'a> From<&'a CanonicalPlayer> for CsvRow<'a> {
    fn from(p: &'a CanonicalPlayer) -> Self {
        CsvRow {
            id: &p.id,
            name: &p.name,
            short_name: &p.short_name,
            primary_position: p.primary_position.code(),
            secondary_positions: p
                .secondary_positions
                .iter()
                .map(|c| c.code())
                .collect::<Vec<_>>()
                .join(","),
            club: &p.club,
            league: &p.league,
            nationality: &p.nationality,
            photo_url: p.photo_url.as_deref().unwrap_or(""),
            transfermarkt_url: p.source.transfermarkt_url.as_deref().unwrap_or(""),
            fbref_url: p.source.fbref_url.as_deref().unwrap_or(""),
        }
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn ensure_dir(dir: &Path) -> Result<(), ExportError> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
        info!("Created output directory: {}", dir.display());
    }
    Ok(())
}

pub fn export_league_json(players: &[CanonicalPlayer], slug: &str, league_name: &str, dir: &Path) -> Result<PathBuf, ExportError> {
    ensure_dir(dir)?;
    let path = dir.join(format!("{}.json", slug));

    let output = LeagueExport {
        league: league_name,
        slug,
        exported_at: timestamp(),
        player_count: players.len(),
        players,
    };
    serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &output)?;

    info!("Exported {} players to {}", players.len(), path.display());
    Ok(path)
}

pub fn export_league_csv(players: &[CanonicalPlayer], slug: &str, dir: &Path) -> Result<PathBuf, ExportError> {
    ensure_dir(dir)?;
    let path = dir.join(format!("{}.csv", slug));

    let mut writer = csv::WriterBuilder::new().has_headers(true).from_path(&path)?;
    for player in players {
        writer.serialize(CsvRow::from(player))?;
    }
    writer.flush()?;

    info!("Exported {} players to {}", players.len(), path.display());
    Ok(path)
}

/// One file per league. Display names come from the league table, falling back to the slug.
pub fn export_all_leagues(all_players: &BTreeMap<String, Vec<CanonicalPlayer>>, format: ExportFormat, dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::with_capacity(all_players.len());
    for (slug, players) in all_players {
        let path = match format {
            ExportFormat::Json => {
                let name = config::find_league(slug, config::CURRENT_SEASON)
                    .map(|l| l.name)
                    .unwrap_or_else(|| slug.clone());
                export_league_json(players, slug, &name, dir)?
            }
            ExportFormat::Csv => export_league_csv(players, slug, dir)?,
        };
        written.push(path);
    }
    Ok(written)
}

pub fn export_combined(all_players: &BTreeMap<String, Vec<CanonicalPlayer>>, dir: &Path) -> Result<PathBuf, ExportError> {
    ensure_dir(dir)?;
    let path = dir.join("all-players.json");

    let players: Vec<&CanonicalPlayer> = all_players.values().flatten().collect();
    let output = CombinedExport {
        exported_at: timestamp(),
        total_players: players.len(),
        leagues: all_players.keys().map(String::as_str).collect(),
        players,
    };
    serde_json::to_writer_pretty(BufWriter::new(File::create(&path)?), &output)?;

    info!("Exported {} total players to {}", output.total_players, path.display());
    Ok(path)
}
