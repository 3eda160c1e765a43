//! Game errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors from game state lookups and mutations.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// No team with this ID.
    #[error("Team not found: {0}")]
    TeamNotFound(String),

    /// No character with this ID.
    #[error("Character not found: {0}")]
    CharacterNotFound(String),
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        (StatusCode::NOT_FOUND, self.to_string()).into_response()
    }
}
