//! Single binary web server: JSON API over the session scheduler, polled by clients.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default. See `config.rs` for the environment variables.

use actix_web::{
    get, post,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use badminton_club_web::config::Config;
use badminton_club_web::logic::{generate_password, player_summaries};
use badminton_club_web::roster::{import_roster, read_roster};
use badminton_club_web::{
    CourtId, Gender, Lineup, MemoryStore, PlayerDefaults, PlayerId, SessionError, SessionService,
    SessionState, Skill, SystemClock,
};
use serde::Deserialize;
use std::sync::Arc;

type Service = SessionService<Arc<MemoryStore>, SystemClock>;
type AppState = Data<Service>;

#[derive(serde::Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

#[derive(Deserialize)]
struct CheckInBody {
    name: String,
    password: String,
    #[serde(default)]
    skill: Option<Skill>,
    #[serde(default)]
    gender: Option<Gender>,
    #[serde(default)]
    guest: bool,
}

#[derive(Deserialize)]
struct ChooseBody {
    chooser: PlayerId,
    team1: Vec<PlayerId>,
    team2: Vec<PlayerId>,
}

#[derive(Deserialize)]
struct FinishBody {
    team1_score: u32,
    team2_score: u32,
    #[serde(default)]
    operator: Option<PlayerId>,
}

/// Path segment: court number (e.g. /api/courts/{court}/finish)
#[derive(Deserialize)]
struct CourtPath {
    court: CourtId,
}

/// Path segment: player id (e.g. /api/players/{player_id}/check-out)
#[derive(Deserialize)]
struct PlayerPath {
    player_id: PlayerId,
}

fn error_response(e: SessionError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string() });
    match e {
        SessionError::StaleSelection
        | SessionError::CourtBusy(_)
        | SessionError::ChooserPending { .. } => HttpResponse::Conflict().json(body),
        SessionError::PersistenceFailure(_) | SessionError::Unavailable(_) => {
            HttpResponse::ServiceUnavailable().json(body)
        }
        SessionError::UnknownCourt(_) | SessionError::PlayerNotFound(_) => {
            HttpResponse::NotFound().json(body)
        }
        SessionError::NotChooser { .. } => HttpResponse::Forbidden().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "badminton-club-web",
    })
}

/// Poll endpoint: counts, ordered queue, court statuses.
#[get("/api/session")]
async fn api_session(state: AppState) -> HttpResponse {
    match state.view() {
        Ok(view) => HttpResponse::Ok().json(view),
        Err(e) => error_response(e),
    }
}

/// Roster with counters and presence.
#[get("/api/players")]
async fn api_players(state: AppState) -> HttpResponse {
    match state.state() {
        Ok(s) => HttpResponse::Ok().json(player_summaries(&s)),
        Err(e) => error_response(e),
    }
}

/// Check in by name with the shared session password. Unknown names create a profile.
#[post("/api/check-in")]
async fn api_check_in(state: AppState, body: Json<CheckInBody>) -> HttpResponse {
    let session = match state.state() {
        Ok(s) => s,
        Err(e) => return error_response(e),
    };
    if body.password != session.session_password {
        return HttpResponse::Unauthorized()
            .json(serde_json::json!({ "error": "Incorrect session password" }));
    }
    let defaults = PlayerDefaults {
        skill: body.skill.unwrap_or_default(),
        gender: body.gender.unwrap_or_default(),
        is_guest: body.guest,
    };
    match state.check_in(&body.name, defaults) {
        Ok((player, created)) => {
            HttpResponse::Ok().json(serde_json::json!({ "player": player, "created": created }))
        }
        Err(e) => error_response(e),
    }
}

#[post("/api/players/{player_id}/check-out")]
async fn api_check_out(state: AppState, path: Path<PlayerPath>) -> HttpResponse {
    match state.check_out(path.player_id) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(e) => error_response(e),
    }
}

/// Start a game on a free court with the next players per the rotation strategy.
#[post("/api/courts/{court}/auto-assign")]
async fn api_auto_assign(state: AppState, path: Path<CourtPath>) -> HttpResponse {
    match state.auto_assign(path.court) {
        Ok(game) => HttpResponse::Ok().json(game),
        Err(e) => error_response(e),
    }
}

/// Manual override: {players: [4 ids]} (balanced) or {team1: [..], team2: [..]}.
#[post("/api/courts/{court}/assign")]
async fn api_assign_manual(state: AppState, path: Path<CourtPath>, body: Json<Lineup>) -> HttpResponse {
    match state.assign_manual(path.court, &body) {
        Ok(game) => HttpResponse::Ok().json(game),
        Err(e) => error_response(e),
    }
}

/// The court's chooser submits their lineup.
#[post("/api/courts/{court}/choose")]
async fn api_choose(state: AppState, path: Path<CourtPath>, body: Json<ChooseBody>) -> HttpResponse {
    match state.choose_lineup(path.court, body.chooser, &body.team1, &body.team2) {
        Ok(game) => HttpResponse::Ok().json(game),
        Err(e) => error_response(e),
    }
}

/// Log the score and free the court.
#[post("/api/courts/{court}/finish")]
async fn api_finish(state: AppState, path: Path<CourtPath>, body: Json<FinishBody>) -> HttpResponse {
    match state.finish_game(path.court, body.team1_score, body.team2_score, body.operator) {
        Ok((entry, chooser)) => {
            HttpResponse::Ok().json(serde_json::json!({ "entry": entry, "chooser": chooser }))
        }
        Err(e) => error_response(e),
    }
}

/// Completed games, newest first.
#[get("/api/log")]
async fn api_log(state: AppState) -> HttpResponse {
    match state.log() {
        Ok(mut log) => {
            log.reverse();
            HttpResponse::Ok().json(log)
        }
        Err(e) => error_response(e),
    }
}

#[get("/api/stats/partnerships")]
async fn api_partnerships(state: AppState) -> HttpResponse {
    match state.partnerships() {
        Ok(stats) => HttpResponse::Ok().json(stats),
        Err(e) => error_response(e),
    }
}

/// Admin reset: clears presence, queue and courts; keeps roster and log.
#[post("/api/admin/reset")]
async fn api_reset(state: AppState) -> HttpResponse {
    match state.reset() {
        Ok(password) => {
            HttpResponse::Ok().json(serde_json::json!({ "session_password": password }))
        }
        Err(e) => error_response(e),
    }
}

fn open_store(config: &Config) -> std::io::Result<MemoryStore> {
    let initial = SessionState::new(config.courts, generate_password());
    let store = match &config.snapshot_path {
        Some(path) => MemoryStore::open(path, initial)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?,
        None => MemoryStore::new(initial),
    };
    if let Some(path) = &config.roster_path {
        let file = std::fs::File::open(path)?;
        let roster = read_roster(file)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        let listed = roster.len();
        let added = import_roster(&store, roster)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        log::info!(
            "Roster {}: {} new players added ({} listed)",
            path.display(),
            added,
            listed
        );
    }
    Ok(store)
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = Config::from_env();
    let store = Arc::new(open_store(&config)?);
    let service = SessionService::connect(store.clone(), SystemClock, config.service_settings())
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let state = Data::new(service);

    if config.snapshot_path.is_some() {
        let store_flush = store.clone();
        let every = config.snapshot_interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                if let Err(e) = store_flush.flush() {
                    log::warn!("Snapshot flush failed: {}", e);
                }
            }
        });
    }

    let bind = (config.host.clone(), config.port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let result = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_session)
            .service(api_players)
            .service(api_check_in)
            .service(api_check_out)
            .service(api_auto_assign)
            .service(api_assign_manual)
            .service(api_choose)
            .service(api_finish)
            .service(api_log)
            .service(api_partnerships)
            .service(api_reset)
    })
    .bind(bind)?
    .run()
    .await;

    if let Err(e) = store.flush() {
        log::warn!("Final snapshot flush failed: {}", e);
    }
    result
}
