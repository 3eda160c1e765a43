//! In-memory game store.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use tracing::debug;

use super::errors::GameError;
use super::models::{ApiCharacter, GameState, LeaderboardEntry, SolveMark, TeamData};

/// The single team present at startup.
pub const SEED_TEAM_ID: &str = "team-alpha-123";

const CHARACTER_COUNT: u32 = 40;

/// Result of recording a solve.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SolveOutcome {
    /// Counters and marks were updated.
    Recorded,
    /// The team had already solved this character; nothing changed.
    AlreadySolved,
}

#[derive(Default)]
struct Board {
    teams: HashMap<String, TeamData>,
    characters: BTreeMap<String, ApiCharacter>,
}

/// Teams and characters behind one reader-writer lock.
#[derive(Default)]
pub struct GameStore {
    board: RwLock<Board>,
}

impl GameStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one team and 40 unsolved characters.
    pub fn seeded() -> Self {
        let mut board = Board::default();
        let seed = TeamData {
            id: SEED_TEAM_ID.into(),
            team_name: "Team Alpha".into(),
            team_color: "#FF5733".into(),
            challenge_start_time: challenge_start(),
            total_solves: 5,
            solved_characters: ["char-001", "char-007", "char-012", "char-023", "char-034"]
                .map(String::from)
                .to_vec(),
            fastest_solve: 12_500,
            total_score: 1250,
        };
        let _ = board.teams.insert(seed.id.clone(), seed);

        for n in 1..=CHARACTER_COUNT {
            let id = format!("char-{n:03}");
            let character = ApiCharacter {
                image_url: format!("/characters/{id}.png"),
                id: id.clone(),
                solved_by_teams: Vec::new(),
            };
            let _ = board.characters.insert(id, character);
        }

        Self {
            board: RwLock::new(board),
        }
    }

    /// Snapshot of the board with a ranked leaderboard.
    pub fn state(&self) -> GameState {
        let board = self.board.read();
        let characters = board.characters.values().cloned().collect();

        let mut teams: Vec<&TeamData> = board.teams.values().collect();
        teams.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.team_name.cmp(&b.team_name))
        });
        let leaderboard = teams
            .into_iter()
            .zip(1..)
            .map(|(team, rank)| LeaderboardEntry {
                rank,
                team_name: team.team_name.clone(),
                score: team.total_score,
                solves: team.total_solves,
                quickest_solve: team.fastest_solve,
                team_color: team.team_color.clone(),
            })
            .collect();

        GameState {
            characters,
            leaderboard,
        }
    }

    /// A team's progress record.
    pub fn team(&self, team_id: &str) -> Result<TeamData, GameError> {
        self.board
            .read()
            .teams
            .get(team_id)
            .cloned()
            .ok_or_else(|| GameError::TeamNotFound(team_id.into()))
    }

    /// Clear a team's solved characters and its marks on the board.
    /// Totals are kept.
    pub fn reset_progress(&self, team_id: &str) -> Result<(), GameError> {
        let mut board = self.board.write();
        let team = board
            .teams
            .get_mut(team_id)
            .ok_or_else(|| GameError::TeamNotFound(team_id.into()))?;
        team.solved_characters.clear();
        for character in board.characters.values_mut() {
            character.solved_by_teams.retain(|m| m.team_id != team_id);
        }
        debug!(team_id, "team progress reset");
        Ok(())
    }

    /// Record that `team_id` solved `character_id`, awarding `points`.
    pub fn record_solve(
        &self,
        team_id: &str,
        character_id: &str,
        points: u32,
    ) -> Result<SolveOutcome, GameError> {
        let mut board = self.board.write();
        let Board { teams, characters } = &mut *board;
        let team = teams
            .get_mut(team_id)
            .ok_or_else(|| GameError::TeamNotFound(team_id.into()))?;
        let character = characters
            .get_mut(character_id)
            .ok_or_else(|| GameError::CharacterNotFound(character_id.into()))?;

        if team.solved_characters.iter().any(|c| c == character_id) {
            return Ok(SolveOutcome::AlreadySolved);
        }
        team.solved_characters.push(character_id.into());
        team.total_solves += 1;
        team.total_score += points;
        character.solved_by_teams.push(SolveMark {
            team_id: team.id.clone(),
            color: team.team_color.clone(),
        });
        debug!(team_id, character_id, points, "solve recorded");
        Ok(SolveOutcome::Recorded)
    }
}

fn challenge_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0)
        .single()
        .unwrap_or_default()
}
