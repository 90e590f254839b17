//! Active games on court and the immutable game log.

use crate::models::player::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a game (distinguishes successive games on one court).
pub type GameId = Uuid;

/// Court number, `1..=court_count`.
pub type CourtId = u8;

/// Outcome of a finished game.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub enum Winner {
    #[serde(rename = "Team 1")]
    Team1,
    #[serde(rename = "Team 2")]
    Team2,
    Draw,
}

impl std::fmt::Display for Winner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Winner::Team1 => write!(f, "Team 1"),
            Winner::Team2 => write!(f, "Team 2"),
            Winner::Draw => write!(f, "Draw"),
        }
    }
}

/// Two teams of two, e.g. the output of the team balancer or a manual split.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Teams {
    pub team1: [PlayerId; 2],
    pub team2: [PlayerId; 2],
}

impl Teams {
    pub fn all(&self) -> [PlayerId; 4] {
        [self.team1[0], self.team1[1], self.team2[0], self.team2[1]]
    }
}

/// A game in progress on a court.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ActiveGame {
    pub id: GameId,
    pub court: CourtId,
    pub team1: [PlayerId; 2],
    pub team2: [PlayerId; 2],
    pub start_time: DateTime<Utc>,
}

impl ActiveGame {
    pub fn new(court: CourtId, teams: Teams, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            court,
            team1: teams.team1,
            team2: teams.team2,
            start_time,
        }
    }

    pub fn player_ids(&self) -> [PlayerId; 4] {
        [self.team1[0], self.team1[1], self.team2[0], self.team2[1]]
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.team1.contains(&id) || self.team2.contains(&id)
    }
}

/// A finished game. Written once, never mutated.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub game_id: GameId,
    pub finish_time: DateTime<Utc>,
    /// Rendered as "{m}m {s}s".
    pub duration: String,
    pub duration_secs: i64,
    pub court: CourtId,
    pub team1_ids: [PlayerId; 2],
    pub team2_ids: [PlayerId; 2],
    /// Joined with " & ".
    pub team1_names: String,
    pub team2_names: String,
    pub team1_score: u32,
    pub team2_score: u32,
    /// Rendered as "{t1} - {t2}".
    pub score: String,
    pub winner: Winner,
}

pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{}m {}s", secs / 60, secs % 60)
}
