//! Finishing a game: outcome, re-queueing, counters, chooser hand-off and the log entry,
//! all planned as one changeset.

use crate::logic::directory::{increment_chooser_count, record_outcome};
use crate::logic::queue::requeue_after_game;
use crate::models::{
    format_duration, ActiveGame, ChooserTieBreak, CourtId, LogEntry, PlayerId, RotationStrategy,
    SessionError, SessionState, Winner,
};
use crate::store::{Changeset, FieldPath, FieldUpdate, FieldValue, Precondition};
use chrono::{DateTime, Utc};

/// Strictly higher score wins; equal scores are a draw.
pub fn outcome(team1_score: u32, team2_score: u32) -> Winner {
    if team1_score > team2_score {
        Winner::Team1
    } else if team2_score > team1_score {
        Winner::Team2
    } else {
        Winner::Draw
    }
}

/// Order the winning pair by chooser priority: fewest chooser turns first. On a tie the
/// acting operator goes first if they are one of the winners (and the tie-break says so),
/// otherwise team order is kept.
pub fn chooser_priority(
    state: &SessionState,
    winners: [PlayerId; 2],
    tie_break: ChooserTieBreak,
    operator: Option<PlayerId>,
) -> [PlayerId; 2] {
    let count = |id: PlayerId| state.player(id).map_or(0, |p| p.chooser_count);
    let [a, b] = winners;
    if count(b) < count(a) {
        return [b, a];
    }
    if count(a) == count(b) && tie_break == ChooserTieBreak::ActingOperator && operator == Some(b) {
        return [b, a];
    }
    [a, b]
}

/// The winner who gets to pick the next lineup.
pub fn next_chooser(
    state: &SessionState,
    winners: [PlayerId; 2],
    tie_break: ChooserTieBreak,
    operator: Option<PlayerId>,
) -> PlayerId {
    chooser_priority(state, winners, tie_break, operator)[0]
}

/// A planned finish.
#[derive(Clone, Debug)]
pub struct FinishPlan {
    pub entry: LogEntry,
    /// Set under winner-chooses rotation when there is a winner.
    pub chooser: Option<PlayerId>,
    pub changes: Changeset,
}

fn team_names(state: &SessionState, team: [PlayerId; 2]) -> String {
    team.iter()
        .map(|id| {
            state
                .player(*id)
                .map_or_else(|| "Unknown".to_string(), |p| p.name.clone())
        })
        .collect::<Vec<_>>()
        .join(" & ")
}

/// Plan the transition Active -> Free for `court`.
///
/// The changeset frees the court, re-queues all four players, updates their counters,
/// hands out the chooser right (winner-chooses only) and carries the log entry, so either
/// all of it lands or none of it does. It is guarded by the game id, so a second operator
/// submitting the same court's score sees a conflict rather than a double log.
pub fn plan_finish_game(
    state: &SessionState,
    court: CourtId,
    team1_score: u32,
    team2_score: u32,
    strategy: RotationStrategy,
    operator: Option<PlayerId>,
    now: DateTime<Utc>,
) -> Result<FinishPlan, SessionError> {
    if !state.has_court(court) {
        return Err(SessionError::UnknownCourt(court));
    }
    let game: &ActiveGame = state.courts.get(&court).ok_or(SessionError::CourtIdle(court))?;
    let winner = outcome(team1_score, team2_score);

    let winning_team = match winner {
        Winner::Team1 => Some(game.team1),
        Winner::Team2 => Some(game.team2),
        Winner::Draw => None,
    };
    let (winners_in_order, chooser) = match (winning_team, strategy) {
        (Some(team), RotationStrategy::WinnerChooses { tie_break }) => {
            let ordered = chooser_priority(state, team, tie_break, operator);
            (ordered.to_vec(), Some(ordered[0]))
        }
        (Some(team), _) => (team.to_vec(), None),
        (None, _) => (Vec::new(), None),
    };

    let mut changes = Changeset::new().require(Precondition::CourtRunning {
        court,
        game: game.id,
    });
    changes.push(FieldUpdate::set(FieldPath::Court(court), FieldValue::Empty));
    changes.extend(requeue_after_game(
        game,
        winner,
        &winners_in_order,
        strategy.queue_policy(),
    ));
    for id in game.player_ids() {
        let won = winning_team.map_or(false, |team| team.contains(&id));
        changes.extend(record_outcome(id, won, now));
    }
    if let Some(chooser) = chooser {
        changes.push(FieldUpdate::set(
            FieldPath::Chooser(court),
            FieldValue::Player(chooser),
        ));
        changes.push(increment_chooser_count(chooser));
    }

    let duration_secs = (now - game.start_time).num_seconds().max(0);
    let entry = LogEntry {
        game_id: game.id,
        finish_time: now,
        duration: format_duration(duration_secs),
        duration_secs,
        court,
        team1_ids: game.team1,
        team2_ids: game.team2,
        team1_names: team_names(state, game.team1),
        team2_names: team_names(state, game.team2),
        team1_score,
        team2_score,
        score: format!("{} - {}", team1_score, team2_score),
        winner,
    };
    changes.log_entry = Some(entry.clone());

    Ok(FinishPlan {
        entry,
        chooser,
        changes,
    })
}
