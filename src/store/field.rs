//! Field-level updates to the session document and the preconditions that guard them.

use crate::models::{ActiveGame, CourtId, GameId, LogEntry, Player, PlayerId, SessionState};
use crate::store::StoreError;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// A single player field addressable by an update.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayerField {
    /// The whole profile (create or replace).
    Profile,
    GamesPlayed,
    Wins,
    ChooserCount,
    LastPlayed,
    CheckInTime,
    PlayedWith,
    PlayedAgainst,
}

/// Address of a field in the session document.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldPath {
    Attendees,
    MainQueue,
    Finishers,
    Court(CourtId),
    Chooser(CourtId),
    Player(PlayerId, PlayerField),
    SessionPassword,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldValue {
    /// Clears an optional field.
    Empty,
    Ids(Vec<PlayerId>),
    Game(Box<ActiveGame>),
    Profile(Box<Player>),
    Player(PlayerId),
    Timestamp(DateTime<Utc>),
    Text(String),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldOp {
    Set(FieldValue),
    /// Append ids not already present, in order.
    AppendUnique(Vec<PlayerId>),
    /// Move ids to the front, in order, removing earlier occurrences.
    PrependUnique(Vec<PlayerId>),
    /// Remove ids; absent ids are ignored.
    Remove(Vec<PlayerId>),
    Increment(u32),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldUpdate {
    pub path: FieldPath,
    pub op: FieldOp,
}

impl FieldUpdate {
    pub fn new(path: FieldPath, op: FieldOp) -> Self {
        Self { path, op }
    }

    pub fn set(path: FieldPath, value: FieldValue) -> Self {
        Self::new(path, FieldOp::Set(value))
    }

    pub fn append_unique(path: FieldPath, ids: impl IntoIterator<Item = PlayerId>) -> Self {
        Self::new(path, FieldOp::AppendUnique(ids.into_iter().collect()))
    }

    pub fn prepend_unique(path: FieldPath, ids: impl IntoIterator<Item = PlayerId>) -> Self {
        Self::new(path, FieldOp::PrependUnique(ids.into_iter().collect()))
    }

    pub fn remove(path: FieldPath, ids: impl IntoIterator<Item = PlayerId>) -> Self {
        Self::new(path, FieldOp::Remove(ids.into_iter().collect()))
    }

    pub fn increment(path: FieldPath, by: u32) -> Self {
        Self::new(path, FieldOp::Increment(by))
    }

    /// Apply to the document. Fails if the op does not fit the field's type.
    pub fn apply(&self, state: &mut SessionState) -> Result<(), StoreError> {
        match (&self.path, &self.op) {
            (FieldPath::Attendees, op) => apply_to_set(&mut state.attendees, op, &self.path),
            (FieldPath::MainQueue, op) => apply_to_list(&mut state.main_queue, op, &self.path),
            (FieldPath::Finishers, op) => apply_to_list(&mut state.finishers, op, &self.path),
            (FieldPath::Court(court), FieldOp::Set(FieldValue::Game(game))) => {
                state.courts.insert(*court, (**game).clone());
                Ok(())
            }
            (FieldPath::Court(court), FieldOp::Set(FieldValue::Empty)) => {
                state.courts.remove(court);
                Ok(())
            }
            (FieldPath::Chooser(court), FieldOp::Set(FieldValue::Player(id))) => {
                state.choosers.insert(*court, *id);
                Ok(())
            }
            (FieldPath::Chooser(court), FieldOp::Set(FieldValue::Empty)) => {
                state.choosers.remove(court);
                Ok(())
            }
            (FieldPath::SessionPassword, FieldOp::Set(FieldValue::Text(pw))) => {
                state.session_password = pw.clone();
                Ok(())
            }
            (FieldPath::Player(id, PlayerField::Profile), FieldOp::Set(FieldValue::Profile(p))) => {
                state.players.insert(*id, (**p).clone());
                Ok(())
            }
            (FieldPath::Player(id, field), op) => {
                let player = state
                    .players
                    .get_mut(id)
                    .ok_or_else(|| StoreError::InvalidUpdate(format!("no player {}", id)))?;
                apply_to_player(player, *field, op, &self.path)
            }
            _ => Err(mismatch(&self.path)),
        }
    }
}

fn mismatch(path: &FieldPath) -> StoreError {
    StoreError::InvalidUpdate(format!("operation does not fit field {:?}", path))
}

fn apply_to_set(
    set: &mut BTreeSet<PlayerId>,
    op: &FieldOp,
    path: &FieldPath,
) -> Result<(), StoreError> {
    match op {
        FieldOp::AppendUnique(ids) | FieldOp::PrependUnique(ids) => set.extend(ids.iter().copied()),
        FieldOp::Remove(ids) => {
            for id in ids {
                set.remove(id);
            }
        }
        FieldOp::Set(FieldValue::Ids(ids)) => *set = ids.iter().copied().collect(),
        _ => return Err(mismatch(path)),
    }
    Ok(())
}

fn apply_to_list(list: &mut Vec<PlayerId>, op: &FieldOp, path: &FieldPath) -> Result<(), StoreError> {
    match op {
        FieldOp::AppendUnique(ids) => {
            for id in ids {
                if !list.contains(id) {
                    list.push(*id);
                }
            }
        }
        FieldOp::PrependUnique(ids) => {
            list.retain(|id| !ids.contains(id));
            let mut front: Vec<PlayerId> = Vec::with_capacity(ids.len() + list.len());
            for id in ids {
                if !front.contains(id) {
                    front.push(*id);
                }
            }
            front.append(list);
            *list = front;
        }
        FieldOp::Remove(ids) => list.retain(|id| !ids.contains(id)),
        FieldOp::Set(FieldValue::Ids(ids)) => *list = ids.clone(),
        _ => return Err(mismatch(path)),
    }
    Ok(())
}

fn apply_to_player(
    player: &mut Player,
    field: PlayerField,
    op: &FieldOp,
    path: &FieldPath,
) -> Result<(), StoreError> {
    match (field, op) {
        (PlayerField::GamesPlayed, FieldOp::Increment(n)) => player.games_played += n,
        (PlayerField::Wins, FieldOp::Increment(n)) => player.wins += n,
        (PlayerField::ChooserCount, FieldOp::Increment(n)) => player.chooser_count += n,
        (PlayerField::LastPlayed, FieldOp::Set(FieldValue::Timestamp(t))) => {
            player.last_played = Some(*t)
        }
        (PlayerField::LastPlayed, FieldOp::Set(FieldValue::Empty)) => player.last_played = None,
        (PlayerField::CheckInTime, FieldOp::Set(FieldValue::Timestamp(t))) => {
            player.check_in_time = Some(*t)
        }
        (PlayerField::CheckInTime, FieldOp::Set(FieldValue::Empty)) => player.check_in_time = None,
        (PlayerField::PlayedWith, FieldOp::AppendUnique(ids)) => {
            player.played_with.extend(ids.iter().copied())
        }
        (PlayerField::PlayedAgainst, FieldOp::AppendUnique(ids)) => {
            player.played_against.extend(ids.iter().copied())
        }
        _ => return Err(mismatch(path)),
    }
    Ok(())
}

/// Condition re-checked against the live document right before a changeset commits.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Precondition {
    /// Every id is still in the queue (either bucket).
    Waiting(Vec<PlayerId>),
    CourtFree(CourtId),
    /// The court is still running this exact game.
    CourtRunning { court: CourtId, game: GameId },
    ChooserIs { court: CourtId, player: PlayerId },
    Present(PlayerId),
    /// The player has not been checked in by someone else meanwhile.
    Absent(PlayerId),
    /// No player profile has this name yet.
    NameAvailable(String),
}

impl Precondition {
    pub fn holds(&self, state: &SessionState) -> bool {
        match self {
            Precondition::Waiting(ids) => ids.iter().all(|id| state.is_waiting(*id)),
            Precondition::CourtFree(court) => !state.courts.contains_key(court),
            Precondition::CourtRunning { court, game } => {
                state.courts.get(court).map(|g| g.id) == Some(*game)
            }
            Precondition::ChooserIs { court, player } => state.choosers.get(court) == Some(player),
            Precondition::Present(id) => state.is_present(*id),
            Precondition::Absent(id) => !state.is_present(*id),
            Precondition::NameAvailable(name) => {
                !state.players.values().any(|p| p.name_matches(name))
            }
        }
    }
}

/// A batch of updates committed all-or-nothing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Changeset {
    pub preconditions: Vec<Precondition>,
    pub updates: Vec<FieldUpdate>,
    /// Appended to the game log in the same commit.
    pub log_entry: Option<LogEntry>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    pub fn push(&mut self, update: FieldUpdate) {
        self.updates.push(update);
    }

    pub fn extend(&mut self, updates: impl IntoIterator<Item = FieldUpdate>) {
        self.updates.extend(updates);
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.log_entry.is_none()
    }

    /// Check preconditions, then apply every update to a copy of `state`.
    /// `state` is untouched unless everything succeeds.
    pub fn apply_to(&self, state: &mut SessionState) -> Result<(), StoreError> {
        if let Some(failed) = self.preconditions.iter().find(|p| !p.holds(state)) {
            return Err(StoreError::Conflict(format!("{:?}", failed)));
        }
        let mut scratch = state.clone();
        for update in &self.updates {
            update.apply(&mut scratch)?;
        }
        *state = scratch;
        Ok(())
    }
}
