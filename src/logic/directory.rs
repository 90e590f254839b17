//! Player directory and check-in/check-out.
//!
//! Check-out keeps the profile (the roster persists across sessions); only presence,
//! queue membership and any chooser right are dropped.

use crate::logic::queue::{dequeue_many, enqueue};
use crate::models::{Player, PlayerDefaults, PlayerId, SessionError, SessionState};
use crate::store::{Changeset, FieldPath, FieldUpdate, FieldValue, PlayerField, Precondition};
use chrono::{DateTime, Utc};

/// Case-insensitive exact match after trimming.
pub fn find_by_name<'a>(state: &'a SessionState, name: &str) -> Option<&'a Player> {
    state.players.values().find(|p| p.name_matches(name))
}

/// New profile with a fresh id and the trimmed name.
pub fn create_player(name: &str, defaults: PlayerDefaults) -> Result<Player, SessionError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(SessionError::EmptyName);
    }
    Ok(Player::new(name, defaults))
}

/// Counter updates for one player after a finished game.
pub fn record_outcome(player_id: PlayerId, won: bool, now: DateTime<Utc>) -> Vec<FieldUpdate> {
    let mut updates = vec![
        FieldUpdate::increment(FieldPath::Player(player_id, PlayerField::GamesPlayed), 1),
        FieldUpdate::set(
            FieldPath::Player(player_id, PlayerField::LastPlayed),
            FieldValue::Timestamp(now),
        ),
    ];
    if won {
        updates.push(FieldUpdate::increment(
            FieldPath::Player(player_id, PlayerField::Wins),
            1,
        ));
    }
    updates
}

pub fn increment_chooser_count(player_id: PlayerId) -> FieldUpdate {
    FieldUpdate::increment(FieldPath::Player(player_id, PlayerField::ChooserCount), 1)
}

/// Result of planning a check-in.
#[derive(Clone, Debug)]
pub struct CheckInPlan {
    /// The profile as it will look after the commit.
    pub player: Player,
    pub created: bool,
    /// Empty when the player is already present.
    pub changes: Changeset,
}

/// Resolve `name` to a profile (creating one if unknown), mark present and enqueue.
///
/// Returning guests get `defaults` applied to skill and gender, since their profile was
/// only a placeholder from the last visit.
pub fn plan_check_in(
    state: &SessionState,
    name: &str,
    defaults: PlayerDefaults,
    now: DateTime<Utc>,
) -> Result<CheckInPlan, SessionError> {
    let (mut player, created) = match find_by_name(state, name) {
        Some(existing) => (existing.clone(), false),
        None => (create_player(name, defaults.clone())?, true),
    };

    if state.is_present(player.id) {
        return Ok(CheckInPlan {
            player,
            created: false,
            changes: Changeset::new(),
        });
    }

    let mut changes = Changeset::new().require(Precondition::Absent(player.id));
    if created {
        changes = changes.require(Precondition::NameAvailable(player.name.clone()));
    }
    if created || player.is_guest {
        if !created {
            player.skill = defaults.skill;
            player.gender = defaults.gender;
        }
        changes.push(FieldUpdate::set(
            FieldPath::Player(player.id, PlayerField::Profile),
            FieldValue::Profile(Box::new(player.clone())),
        ));
    }
    player.check_in_time = Some(now);
    changes.push(FieldUpdate::set(
        FieldPath::Player(player.id, PlayerField::CheckInTime),
        FieldValue::Timestamp(now),
    ));
    changes.push(FieldUpdate::append_unique(FieldPath::Attendees, [player.id]));
    changes.extend(enqueue(state, player.id));

    Ok(CheckInPlan {
        player,
        created,
        changes,
    })
}

/// Remove presence and queue membership. Rejected while the player is on court.
pub fn plan_check_out(state: &SessionState, player_id: PlayerId) -> Result<Changeset, SessionError> {
    if state.player(player_id).is_none() {
        return Err(SessionError::PlayerNotFound(player_id));
    }
    if !state.is_present(player_id) {
        return Err(SessionError::NotPresent(player_id));
    }
    if state.court_of(player_id).is_some() {
        return Err(SessionError::PlayerOnCourt(player_id));
    }

    let mut changes = Changeset::new().require(Precondition::Waiting(vec![player_id]));
    changes.push(FieldUpdate::remove(FieldPath::Attendees, [player_id]));
    changes.extend(dequeue_many(&[player_id]));
    changes.push(FieldUpdate::set(
        FieldPath::Player(player_id, PlayerField::CheckInTime),
        FieldValue::Empty,
    ));
    for (court, _) in state.choosers.iter().filter(|(_, c)| **c == player_id) {
        changes.push(FieldUpdate::set(FieldPath::Chooser(*court), FieldValue::Empty));
    }
    Ok(changes)
}
