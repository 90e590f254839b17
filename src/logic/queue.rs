//! Waiting queue: enqueue/dequeue as field updates, rotation ordering, re-entry after a game.

use crate::models::{ActiveGame, PlayerId, QueuePolicy, SessionState, Winner};
use crate::store::{FieldPath, FieldUpdate};

/// Append to the tail of the main queue. `None` if the player is already queued or on court.
pub fn enqueue(state: &SessionState, player_id: PlayerId) -> Option<FieldUpdate> {
    if state.is_waiting(player_id) || state.court_of(player_id).is_some() {
        return None;
    }
    Some(FieldUpdate::append_unique(FieldPath::MainQueue, [player_id]))
}

/// Remove ids from both queue buckets. Ids that are not queued are ignored.
pub fn dequeue_many(player_ids: &[PlayerId]) -> Vec<FieldUpdate> {
    vec![
        FieldUpdate::remove(FieldPath::Finishers, player_ids.iter().copied()),
        FieldUpdate::remove(FieldPath::MainQueue, player_ids.iter().copied()),
    ]
}

/// Waiting players in rotation order.
///
/// - `Recency`: ascending `last_played`; never-played players come first regardless of
///   timestamps. Equal keys keep queue order (finishers, then main queue).
/// - `FinishersFirst`: `finishers ++ main_queue`, no re-sorting.
pub fn ordered_waiting(state: &SessionState, policy: QueuePolicy) -> Vec<PlayerId> {
    let mut waiting: Vec<PlayerId> = state
        .finishers
        .iter()
        .chain(state.main_queue.iter())
        .copied()
        .collect();
    if policy == QueuePolicy::Recency {
        // Option orders None before Some; sort_by_key is stable.
        waiting.sort_by_key(|id| state.player(*id).and_then(|p| p.last_played));
    }
    waiting
}

/// Put a finished game's players back in the queue.
///
/// Under `FinishersFirst` with a decisive result, `winners` (already in chooser priority
/// order) are moved to the front of the finishers bucket and the losers go to the tail of
/// the main queue. Otherwise all four are appended to the main queue.
pub fn requeue_after_game(
    game: &ActiveGame,
    winner: Winner,
    winners: &[PlayerId],
    policy: QueuePolicy,
) -> Vec<FieldUpdate> {
    let losers: Vec<PlayerId> = match winner {
        Winner::Team1 => game.team2.to_vec(),
        Winner::Team2 => game.team1.to_vec(),
        Winner::Draw => Vec::new(),
    };
    if policy == QueuePolicy::FinishersFirst && winner != Winner::Draw {
        vec![
            FieldUpdate::prepend_unique(FieldPath::Finishers, winners.iter().copied()),
            FieldUpdate::append_unique(FieldPath::MainQueue, losers),
        ]
    } else {
        vec![FieldUpdate::append_unique(
            FieldPath::MainQueue,
            game.player_ids(),
        )]
    }
}
