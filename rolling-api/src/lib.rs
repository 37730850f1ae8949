//! Rolling Tic-Tac-Toe Web API
//!
//! Hosts a single local game session for a browser front end that talks
//! HTTP instead of loading the WASM build of `rolling-core`. The session
//! adds the app-level screen (landing or playing) and the settings the
//! engine reads; every rule decision is made by `rolling_core::Game`.

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info};

use rolling_core::{Game, Outcome, Phase, Player, Pos};

// =============================================================================
// Session State
// =============================================================================

/// Which screen the front end should show.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    Landing,
    Playing,
}

/// The one game session this server hosts.
pub struct GameSession {
    game: Game,
    screen: Screen,
}

impl GameSession {
    pub fn new(rigged_mode: bool) -> Self {
        Self {
            game: Game::with_rigged_mode(rigged_mode),
            screen: Screen::Landing,
        }
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Fresh game, then show the board.
    fn start(&mut self) {
        self.game.reset_game();
        self.screen = Screen::Playing;
    }

    /// Fresh game, then back to the landing screen.
    fn exit(&mut self) {
        self.game.reset_game();
        self.screen = Screen::Landing;
    }
}

/// Shared application state
pub struct AppStateInner {
    session: Mutex<GameSession>,
}

pub type AppState = Arc<AppStateInner>;

/// Create the shared state for a new server.
pub fn app_state(rigged_mode: bool) -> AppState {
    Arc::new(AppStateInner {
        session: Mutex::new(GameSession::new(rigged_mode)),
    })
}

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Serialize, Deserialize, Debug)]
pub struct CellModel {
    pub owner: Option<Player>,
    pub move_order: Option<u64>,
    /// This piece goes next time its owner places a mark.
    pub evicting: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct EvictionModel {
    #[serde(rename = "X")]
    pub x: Option<Pos>,
    #[serde(rename = "O")]
    pub o: Option<Pos>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct GameStateModel {
    pub screen: Screen,
    pub phase: Phase,
    /// 9 cells, row-major
    pub board: Vec<CellModel>,
    pub current_player: Player,
    pub move_counter: u64,
    pub winner: Option<Player>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub winning_line: Option<[Pos; 3]>,
    pub next_eviction: EvictionModel,
    pub last_evicted: Option<Pos>,
    pub rigged_mode: bool,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct MoveRequest {
    pub index: u8,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct MoveResponseModel {
    pub accepted: bool,
    /// Why the click was ignored, if it was
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub rejection: Option<String>,
    pub evicted: Option<Pos>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub outcome: Option<Outcome>,
    pub state: GameStateModel,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsModel {
    pub rigged_mode: bool,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthModel {
    pub status: String,
}

// =============================================================================
// Conversion Functions
// =============================================================================

/// Convert the session to a JSON-serializable GameStateModel
fn session_to_model(session: &GameSession) -> GameStateModel {
    let state = session.game().state();
    let hints = state.next_eviction;

    let board = Pos::all()
        .map(|pos| {
            let cell = state.board.cell(pos);
            let evicting = match cell.owner() {
                Some(owner) => hints.get(owner) == Some(pos),
                None => false,
            };
            CellModel {
                owner: cell.owner(),
                move_order: cell.order(),
                evicting,
            }
        })
        .collect();

    GameStateModel {
        screen: session.screen(),
        phase: state.phase(),
        board,
        current_player: state.current_player,
        move_counter: state.move_counter,
        winner: state.winner,
        winning_line: state.winning_line,
        next_eviction: EvictionModel {
            x: hints.first,
            o: hints.second,
        },
        last_evicted: state.last_evicted,
        rigged_mode: state.rigged_mode,
    }
}

// =============================================================================
// API Endpoints
// =============================================================================

async fn get_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let session = state.session.lock().await;
    Json(session_to_model(&session))
}

async fn start_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let mut session = state.session.lock().await;
    session.start();
    info!("game started");
    Json(session_to_model(&session))
}

async fn exit_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let mut session = state.session.lock().await;
    session.exit();
    info!("returned to landing screen");
    Json(session_to_model(&session))
}

/// Illegal clicks are not HTTP errors: the state comes back unchanged with
/// `accepted: false`.
async fn make_move(
    State(state): State<AppState>,
    Json(req): Json<MoveRequest>,
) -> Json<MoveResponseModel> {
    let mut session = state.session.lock().await;

    let result = if session.screen() == Screen::Playing {
        session.game.try_place(req.index).map_err(|e| e.to_string())
    } else {
        Err("no game in progress".to_string())
    };

    let response = match result {
        Ok(placement) => {
            match placement.outcome {
                Outcome::Won { winner, .. } => info!(%winner, "game won"),
                Outcome::WinSuppressed { .. } => debug!("rigged mode discarded a win"),
                Outcome::Continue => {}
            }
            MoveResponseModel {
                accepted: true,
                rejection: None,
                evicted: placement.evicted,
                outcome: Some(placement.outcome),
                state: session_to_model(&session),
            }
        }
        Err(rejection) => {
            debug!(index = req.index, %rejection, "move ignored");
            MoveResponseModel {
                accepted: false,
                rejection: Some(rejection),
                evicted: None,
                outcome: None,
                state: session_to_model(&session),
            }
        }
    };

    Json(response)
}

async fn reset_game(State(state): State<AppState>) -> Json<GameStateModel> {
    let mut session = state.session.lock().await;
    session.game.reset_game();
    Json(session_to_model(&session))
}

async fn get_settings(State(state): State<AppState>) -> Json<SettingsModel> {
    let session = state.session.lock().await;
    Json(SettingsModel {
        rigged_mode: session.game().rigged_mode(),
    })
}

async fn update_settings(
    State(state): State<AppState>,
    Json(req): Json<SettingsModel>,
) -> Json<SettingsModel> {
    let mut session = state.session.lock().await;
    session.game.set_rigged_mode(req.rigged_mode);
    info!(rigged_mode = req.rigged_mode, "settings updated");
    Json(SettingsModel {
        rigged_mode: session.game().rigged_mode(),
    })
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

// =============================================================================
// Router
// =============================================================================

/// Build the API router around the given state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/game", get(get_game))
        .route("/start", post(start_game))
        .route("/exit", post(exit_game))
        .route("/move", post(make_move))
        .route("/reset", post(reset_game))
        .route("/settings", get(get_settings).put(update_settings))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}
