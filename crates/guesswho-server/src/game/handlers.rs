//! Game API routes.

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use guesswho_core::events::Event;
use tower_http::cors::CorsLayer;
use tracing::info;

use super::errors::GameError;
use super::models::{GameState, MessageResponse, TeamData};
use super::store::{SEED_TEAM_ID, SolveOutcome};
use crate::server::AppState;

/// Character solved by the simulated game-engine update.
const SIMULATED_SOLVE: &str = "char-002";
const SOLVE_POINTS: u32 = 100;

/// Response body of `/api/teams/update-data`.
pub const UPDATE_ACK: &str = "Data updated and event broadcasted";

/// `/api` routes with permissive CORS.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/game/state", get(game_state))
        .route("/api/team/progress", get(team_progress))
        .route("/api/team/reset", post(reset_team))
        .route("/api/teams/update-data", get(update_data).post(update_data))
        .layer(CorsLayer::permissive())
}

/// GET /api/game/state
async fn game_state(State(state): State<AppState>) -> Json<GameState> {
    Json(state.games.state())
}

/// GET /api/team/progress
async fn team_progress(State(state): State<AppState>) -> Result<Json<TeamData>, GameError> {
    state.games.team(SEED_TEAM_ID).map(Json)
}

/// POST /api/team/reset
async fn reset_team(State(state): State<AppState>) -> Result<Json<MessageResponse>, GameError> {
    state.games.reset_progress(SEED_TEAM_ID)?;
    state.broker.publish(Event::update());
    Ok(Json(MessageResponse {
        message: "Progress reset successfully".into(),
    }))
}

/// GET or POST /api/teams/update-data
///
/// Stands in for the game engine: records a fixed solve and broadcasts.
async fn update_data(State(state): State<AppState>) -> Result<&'static str, GameError> {
    let outcome = state
        .games
        .record_solve(SEED_TEAM_ID, SIMULATED_SOLVE, SOLVE_POINTS)?;
    if outcome == SolveOutcome::AlreadySolved {
        info!(character_id = SIMULATED_SOLVE, "character already solved");
    }
    state.broker.publish(Event::update());
    Ok(UPDATE_ACK)
}
