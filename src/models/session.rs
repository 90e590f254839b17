//! SessionState (the shared session document), rotation strategy and errors.

use crate::models::game::{ActiveGame, CourtId};
use crate::models::player::{Player, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Number of courts when not configured otherwise.
pub const DEFAULT_COURTS: u8 = 4;

/// Errors that can occur during session operations. All are recoverable by retrying
/// except `Unavailable` at startup.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionError {
    /// Fewer than 4 players waiting when an assignment was requested.
    InsufficientPlayers { waiting: usize },
    /// Selection is not exactly 2 + 2 distinct players.
    InvalidTeamSplit(String),
    /// A chosen player is no longer waiting (claimed by a concurrent assignment).
    StaleSelection,
    /// A storage write did not confirm.
    PersistenceFailure(String),
    /// Storage could not be read at all.
    Unavailable(String),
    UnknownCourt(CourtId),
    /// Court already has an active game.
    CourtBusy(CourtId),
    /// Court has no active game to finish.
    CourtIdle(CourtId),
    PlayerNotFound(PlayerId),
    /// Player is not checked in.
    NotPresent(PlayerId),
    /// Player cannot check out while on court.
    PlayerOnCourt(PlayerId),
    /// Court is reserved for a chooser; auto-assignment is not allowed.
    ChooserPending { court: CourtId, chooser: PlayerId },
    /// Lineup submitted by someone other than the court's chooser.
    NotChooser { court: CourtId },
    EmptyName,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InsufficientPlayers { waiting } => {
                write!(f, "Need at least 4 waiting players (waiting: {})", waiting)
            }
            SessionError::InvalidTeamSplit(reason) => write!(f, "Invalid team split: {}", reason),
            SessionError::StaleSelection => {
                write!(f, "A selected player was already assigned; refresh and try again")
            }
            SessionError::PersistenceFailure(e) => write!(f, "Storage write failed: {}", e),
            SessionError::Unavailable(e) => write!(f, "Storage unavailable: {}", e),
            SessionError::UnknownCourt(c) => write!(f, "Court {} does not exist", c),
            SessionError::CourtBusy(c) => write!(f, "Court {} already has a game", c),
            SessionError::CourtIdle(c) => write!(f, "Court {} has no game in progress", c),
            SessionError::PlayerNotFound(_) => write!(f, "Player not found"),
            SessionError::NotPresent(_) => write!(f, "Player is not checked in"),
            SessionError::PlayerOnCourt(_) => write!(f, "Player is on court"),
            SessionError::ChooserPending { court, .. } => {
                write!(f, "Court {} is waiting for its chooser to pick a lineup", court)
            }
            SessionError::NotChooser { court } => {
                write!(f, "Only the current chooser can pick the lineup for court {}", court)
            }
            SessionError::EmptyName => write!(f, "Player name must not be empty"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Who gets the chooser right when both winners have the same chooser_count.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChooserTieBreak {
    /// The winner who is submitting the score, if known; else the first winner.
    #[default]
    ActingOperator,
    /// Always the first-listed winner.
    FirstWinner,
}

/// Fairness algorithm, selected once per deployment.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RotationStrategy {
    /// Longest since last game plays next; auto-assign takes the front four.
    #[default]
    Recency,
    /// Winners return first and one of them picks the next lineup for their court.
    WinnerChooses { tie_break: ChooserTieBreak },
    /// Auto-assign picks the four with the most new team-mate/opponent pairings.
    OpponentVariety,
}

impl RotationStrategy {
    pub fn queue_policy(&self) -> QueuePolicy {
        match self {
            RotationStrategy::WinnerChooses { .. } => QueuePolicy::FinishersFirst,
            RotationStrategy::Recency | RotationStrategy::OpponentVariety => QueuePolicy::Recency,
        }
    }
}

/// How `ordered_waiting` orders the queue.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueuePolicy {
    /// Ascending `last_played`, never-played first; ties keep arrival order.
    Recency,
    /// `finishers ++ main_queue`.
    FinishersFirst,
}

/// What a court is doing right now.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum CourtStatus {
    Free,
    /// A chooser holds the court and has not submitted a lineup yet.
    Assigning { chooser: PlayerId },
    Active { game: ActiveGame },
}

/// The shared session document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub players: HashMap<PlayerId, Player>,
    /// Players checked in for this session.
    pub attendees: BTreeSet<PlayerId>,
    /// Waiting players in arrival order.
    pub main_queue: Vec<PlayerId>,
    /// Players freed by recent games, ahead of `main_queue` under finishers-first.
    pub finishers: Vec<PlayerId>,
    pub courts: BTreeMap<CourtId, ActiveGame>,
    pub choosers: BTreeMap<CourtId, PlayerId>,
    pub court_count: u8,
    pub session_password: String,
}

impl SessionState {
    /// Empty session with the given number of courts.
    pub fn new(court_count: u8, session_password: impl Into<String>) -> Self {
        Self {
            players: HashMap::new(),
            attendees: BTreeSet::new(),
            main_queue: Vec::new(),
            finishers: Vec::new(),
            courts: BTreeMap::new(),
            choosers: BTreeMap::new(),
            court_count,
            session_password: session_password.into(),
        }
    }

    pub fn court_ids(&self) -> impl Iterator<Item = CourtId> {
        1..=self.court_count
    }

    pub fn has_court(&self, court: CourtId) -> bool {
        court >= 1 && court <= self.court_count
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    pub fn is_present(&self, id: PlayerId) -> bool {
        self.attendees.contains(&id)
    }

    /// True if the player sits in either queue bucket.
    pub fn is_waiting(&self, id: PlayerId) -> bool {
        self.main_queue.contains(&id) || self.finishers.contains(&id)
    }

    pub fn waiting_count(&self) -> usize {
        self.main_queue.len() + self.finishers.len()
    }

    /// The court the player is currently playing on, if any.
    pub fn court_of(&self, id: PlayerId) -> Option<CourtId> {
        self.courts
            .values()
            .find(|g| g.contains(id))
            .map(|g| g.court)
    }

    pub fn on_court_count(&self) -> usize {
        self.courts.len() * 4
    }

    pub fn court_status(&self, court: CourtId) -> CourtStatus {
        if let Some(game) = self.courts.get(&court) {
            CourtStatus::Active { game: game.clone() }
        } else if let Some(&chooser) = self.choosers.get(&court) {
            CourtStatus::Assigning { chooser }
        } else {
            CourtStatus::Free
        }
    }

    /// Check the queue/court invariants; returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for &id in self.finishers.iter().chain(self.main_queue.iter()) {
            if !seen.insert(id) {
                return Err(format!("player {} queued twice", id));
            }
            if !self.attendees.contains(&id) {
                return Err(format!("player {} queued but not present", id));
            }
        }
        for game in self.courts.values() {
            for id in game.player_ids() {
                if !seen.insert(id) {
                    return Err(format!("player {} is in two places", id));
                }
                if !self.attendees.contains(&id) {
                    return Err(format!("player {} on court {} but not present", id, game.court));
                }
            }
        }
        if seen.len() != self.attendees.len() {
            return Err(format!(
                "{} waiting + on court, but {} present",
                seen.len(),
                self.attendees.len()
            ));
        }
        for (court, chooser) in &self.choosers {
            if !self.is_waiting(*chooser) {
                return Err(format!("chooser for court {} is not waiting", court));
            }
        }
        Ok(())
    }
}
