use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder};
use actix_cors::Cors;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use football_scraper_lib::{config, logger, normalizer};
use football_scraper_lib::{Cache, CanonicalPlayer, Club, FetchConfig, FootballScraper, League, MemoryCache};

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TeamSummary {
    id: String,
    name: String,
    squad_url: String,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TeamsResponse {
    league: String,
    league_id: String,
    teams: Vec<TeamSummary>,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SquadResponse {
    team: String,
    league: String,
    player_count: usize,
    players: Vec<CanonicalPlayer>,
}

#[derive(Deserialize)]
struct ScrapeTeamRequest {
    team_id: Option<String>,
    team_name: Option<String>,
    league_id: Option<String>,
}

struct AppState {
    fetch_config: FetchConfig,
    teams_cache: Arc<dyn Cache<String, TeamsResponse>>,
    squad_cache: Arc<dyn Cache<String, SquadResponse>>,
}

/// "Brighton & Hove Albion" → "brighton-&-hove-albion", "1.FC Köln" → "1fc-köln"
fn team_slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace('.', "")
}

fn error_json(message: &str) -> serde_json::Value {
    serde_json::json!({ "success": false, "error": message })
}

fn discover_teams(fetch_config: FetchConfig, league: League) -> Result<TeamsResponse, String> {
    let mut scraper = FootballScraper::new(fetch_config).map_err(|e| e.to_string())?;
    let clubs = scraper.league_clubs(&league);
    scraper.close();

    Ok(TeamsResponse {
        league: league.name,
        league_id: league.slug,
        teams: clubs
            .into_iter()
            .map(|club| TeamSummary {
                id: team_slug(&club.name),
                name: club.name,
                squad_url: club.roster_url,
            })
            .collect(),
    })
}

fn scrape_squad(fetch_config: FetchConfig, club: Club) -> Result<SquadResponse, String> {
    let mut scraper = FootballScraper::new(fetch_config).map_err(|e| e.to_string())?;
    let raw_players = scraper.club_players(&club);
    scraper.close();

    let players: Vec<CanonicalPlayer> = raw_players
        .iter()
        .filter_map(|raw| normalizer::normalize_player(raw, None))
        .collect();

    Ok(SquadResponse {
        team: club.name,
        league: club.league,
        player_count: players.len(),
        players,
    })
}

/// Cached team list for a league, discovering it on a miss.
async fn teams_for(data: &web::Data<AppState>, league: League) -> Result<TeamsResponse, String> {
    if let Some(cached) = data.teams_cache.get(&league.slug) {
        return Ok(cached);
    }

    let slug = league.slug.clone();
    let fetch_config = data.fetch_config.clone();
    let teams = web::block(move || discover_teams(fetch_config, league))
        .await
        .map_err(|e| e.to_string())??;

    data.teams_cache.insert(slug, teams.clone());
    Ok(teams)
}

#[get("/health")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/api/leagues")]
async fn get_leagues() -> impl Responder {
    let leagues: Vec<_> = config::leagues(config::CURRENT_SEASON)
        .into_iter()
        .map(|l| serde_json::json!({ "id": l.slug, "name": l.name, "country": l.country }))
        .collect();
    HttpResponse::Ok().json(serde_json::json!({ "leagues": leagues }))
}

#[get("/api/leagues/{league_id}/teams")]
async fn get_teams(path: web::Path<String>, data: web::Data<AppState>) -> impl Responder {
    let league_id = path.into_inner();
    let Some(league) = config::find_league(&league_id, config::CURRENT_SEASON) else {
        return HttpResponse::NotFound().json(serde_json::json!({ "error": "League not found" }));
    };

    match teams_for(&data, league).await {
        Ok(teams) => HttpResponse::Ok().json(teams),
        Err(e) => {
            log::error!("Error fetching teams for {}: {}", league_id, e);
            HttpResponse::InternalServerError().json(serde_json::json!({ "error": e }))
        }
    }
}

#[post("/api/teams/scrape")]
async fn scrape_team(body: web::Json<ScrapeTeamRequest>, data: web::Data<AppState>) -> impl Responder {
    let request = body.into_inner();
    let (Some(team_id), Some(league_id)) = (request.team_id, request.league_id) else {
        return HttpResponse::BadRequest().json(error_json("team_id and league_id are required"));
    };
    let Some(league) = config::find_league(&league_id, config::CURRENT_SEASON) else {
        return HttpResponse::NotFound().json(error_json("League not found"));
    };

    let cache_key = format!("{}:{}", league_id, team_id);
    if let Some(cached) = data.squad_cache.get(&cache_key) {
        log::info!("Returning cached data for {}", cached.team);
        return HttpResponse::Ok().json(with_success(&cached));
    }

    let league_name = league.name.clone();
    let teams = match teams_for(&data, league).await {
        Ok(teams) => teams,
        Err(e) => return HttpResponse::NotFound().json(error_json(&format!("Could not find team: {}", e))),
    };
    let Some(team) = teams.teams.into_iter().find(|t| t.id == team_id) else {
        return HttpResponse::NotFound().json(error_json("Team not found"));
    };

    if let Some(label) = request.team_name.as_deref().filter(|n| *n != team.name) {
        log::debug!("Requested label '{}' resolved to {}", label, team.name);
    }
    let club = club_for(team, league_name);
    log::info!("Scraping players for {}...", club.name);

    let fetch_config = data.fetch_config.clone();
    let result = web::block(move || scrape_squad(fetch_config, club))
        .await
        .map_err(|e| e.to_string())
        .and_then(|r| r);

    match result {
        Ok(squad) => {
            log::info!("Scraped {} players for {}", squad.player_count, squad.team);
            data.squad_cache.insert(cache_key, squad.clone());
            HttpResponse::Ok().json(with_success(&squad))
        }
        Err(e) => {
            log::error!("Error scraping team: {}", e);
            HttpResponse::InternalServerError().json(error_json(&e))
        }
    }
}

/// Always the discovered club name: player ids hash it.
fn club_for(team: TeamSummary, league_name: String) -> Club {
    Club {
        name: team.name,
        canonical_url: team.squad_url.clone(),
        league: league_name,
        roster_url: team.squad_url,
    }
}

fn with_success(squad: &SquadResponse) -> serde_json::Value {
    let mut value = serde_json::to_value(squad).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.insert("success".to_string(), serde_json::Value::Bool(true));
    }
    value
}

#[post("/api/cache/clear")]
async fn clear_cache(data: web::Data<AppState>) -> impl Responder {
    data.teams_cache.clear();
    data.squad_cache.clear();
    HttpResponse::Ok().json(serde_json::json!({ "message": "Cache cleared" }))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    logger::init(false);

    let state = web::Data::new(AppState {
        fetch_config: FetchConfig::default(),
        teams_cache: Arc::new(MemoryCache::new()),
        squad_cache: Arc::new(MemoryCache::new()),
    });

    log::info!("Starting Football Scraper API at http://0.0.0.0:5000");

    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .service(health_check)
            .service(get_leagues)
            .service(get_teams)
            .service(scrape_team)
            .service(clear_cache)
    })
    .bind(("0.0.0.0", 5000))?
    .run()
    .await
}
