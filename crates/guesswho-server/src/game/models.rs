//! Wire models for the game API.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A team's private progress record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamData {
    /// Team ID.
    pub id: String,
    /// Display name.
    pub team_name: String,
    /// Hex color used on the board.
    pub team_color: String,
    /// When the team started.
    pub challenge_start_time: DateTime<Utc>,
    /// Solves recorded.
    pub total_solves: u32,
    /// IDs of solved characters, in solve order.
    pub solved_characters: Vec<String>,
    /// Fastest solve duration in milliseconds.
    pub fastest_solve: u64,
    /// Accumulated score.
    pub total_score: u32,
}

/// Marks a character as solved by one team.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SolveMark {
    /// Solving team.
    pub team_id: String,
    /// That team's color.
    pub color: String,
}

/// A character on the game board.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCharacter {
    /// Character ID (`char-NNN`).
    pub id: String,
    /// Image path.
    pub image_url: String,
    /// Teams that solved it.
    pub solved_by_teams: Vec<SolveMark>,
}

/// One leaderboard row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: u32,
    /// Team display name.
    pub team_name: String,
    /// Total score.
    pub score: u32,
    /// Total solves.
    pub solves: u32,
    /// Quickest solve in milliseconds.
    pub quickest_solve: u64,
    /// Team color.
    pub team_color: String,
}

/// Public board state returned by `GET /api/game/state`.
#[derive(Clone, Debug, Serialize)]
pub struct GameState {
    /// Characters sorted by ID.
    pub characters: Vec<ApiCharacter>,
    /// Teams ranked by score, highest first.
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Plain `{"message": ...}` acknowledgement.
#[derive(Clone, Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}
