use football_scraper_lib::{config, exporter, logger};
use football_scraper_lib::{FetchConfig, FootballScraper, ScrapeOptions};
use football_scraper_lib::exporter::ExportFormat;

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use clap::{Parser, ValueEnum};
use log::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
    Both,
}

#[derive(Parser)]
#[command(name = "football_scraper")]
#[command(about = "Scrape football player data from Transfermarkt and FBref")]
struct Cli {
    /// Single league to scrape (e.g. premier-league)
    #[arg(long)]
    league: Option<String>,

    /// Comma-separated list of leagues to scrape
    #[arg(long, value_delimiter = ',')]
    leagues: Option<Vec<String>>,

    /// Skip FBref position augmentation
    #[arg(long)]
    no_fbref: bool,

    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Also export one combined file with all players
    #[arg(long)]
    combined: bool,

    /// Scrape only 2 clubs per league
    #[arg(long)]
    test: bool,

    /// Fetch profile pages for players listed without a position
    #[arg(long)]
    profile_fallback: bool,

    /// Season start year used for squad pages
    #[arg(long, default_value_t = config::CURRENT_SEASON)]
    season: u16,

    /// Seconds between two requests
    #[arg(long, default_value_t = config::REQUEST_DELAY_SECS)]
    delay: f64,

    #[arg(short, long, default_value = config::DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    #[arg(short, long)]
    verbose: bool,

    /// List available leagues and exit
    #[arg(long)]
    list_leagues: bool,
}

impl Cli {
    fn target_leagues(&self) -> Option<Vec<String>> {
        if let Some(league) = &self.league {
            return Some(vec![league.clone()]);
        }
        self.leagues.as_ref().map(|l| {
            l.iter().map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect()
        })
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.list_leagues {
        println!("\nAvailable leagues:");
        println!("{}", "-".repeat(40));
        for league in config::leagues(cli.season) {
            println!("  {:<20} {}", league.slug, league.name);
        }
        println!();
        return ExitCode::SUCCESS;
    }

    logger::init(cli.verbose);

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("Scrape failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode, Box<dyn Error>> {
    info!("Football Player Scraper");

    let targets = cli.target_leagues();
    if let Some(targets) = &targets {
        let known = config::league_slugs();
        if let Some(unknown) = targets.iter().find(|t| !known.contains(&t.as_str())) {
            error!("Unknown league: {}", unknown);
            info!("Available leagues: {}", known.join(", "));
            return Ok(ExitCode::from(1));
        }
        info!("Target leagues: {}", targets.join(", "));
    } else {
        info!("Target leagues: ALL");
    }

    let options = ScrapeOptions {
        include_secondary: !cli.no_fbref,
        max_clubs: cli.test.then_some(2),
        resolve_missing_positions: cli.profile_fallback,
    };
    if cli.test {
        info!("Running in TEST mode (2 clubs per league)");
    }

    let fetch_config = FetchConfig {
        request_delay: Duration::from_secs_f64(cli.delay.max(0.0)),
        ..FetchConfig::default()
    };

    let mut scraper = FootballScraper::for_season(fetch_config, cli.season)?;
    let all_players = scraper.scrape_all(targets.as_deref(), &options);
    scraper.close();

    info!("Exporting results...");
    let mut exported = Vec::new();
    if matches!(cli.format, OutputFormat::Json | OutputFormat::Both) {
        exported.extend(exporter::export_all_leagues(&all_players, ExportFormat::Json, &cli.output_dir)?);
    }
    if matches!(cli.format, OutputFormat::Csv | OutputFormat::Both) {
        exported.extend(exporter::export_all_leagues(&all_players, ExportFormat::Csv, &cli.output_dir)?);
    }
    if cli.combined {
        exported.push(exporter::export_combined(&all_players, &cli.output_dir)?);
    }

    let total: usize = all_players.values().map(Vec::len).sum();
    info!("SCRAPING COMPLETE");
    info!("Total leagues scraped: {}", all_players.len());
    info!("Total players collected: {}", total);
    info!("Output directory: {}", cli.output_dir.display());
    for path in &exported {
        info!("  - {}", path.display());
    }

    Ok(ExitCode::SUCCESS)
}
