//! In-memory game state and its HTTP surface.
//!
//! Every committed mutation publishes the canonical `update` event so
//! connected streams refetch.

pub mod errors;
pub mod handlers;
pub mod models;
pub mod store;

pub use errors::GameError;
pub use handlers::routes;
pub use models::{ApiCharacter, GameState, LeaderboardEntry, SolveMark, TeamData};
pub use store::{GameStore, SEED_TEAM_ID, SolveOutcome};
