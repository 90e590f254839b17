//! Court allocation: auto-assignment per rotation strategy, manual override, the chooser
//! protocol and the opponent-variety search.

use crate::logic::balance::{balance, validate_split};
use crate::logic::queue::{dequeue_many, ordered_waiting};
use crate::models::{
    ActiveGame, CourtId, Player, PlayerId, RotationStrategy, SessionError, SessionState, Teams,
};
use crate::store::{Changeset, FieldPath, FieldUpdate, FieldValue, PlayerField, Precondition};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Largest waiting pool the variety search examines when not configured otherwise.
/// The search is C(n, 4), so this bounds it at 4845 combinations.
pub const DEFAULT_VARIETY_POOL_CAP: usize = 20;

/// An operator's hand-picked lineup.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lineup {
    /// Exact teams as given.
    Teams {
        team1: Vec<PlayerId>,
        team2: Vec<PlayerId>,
    },
    /// Four players; teams are formed by the balancer.
    Balanced { players: Vec<PlayerId> },
}

/// A planned game start.
#[derive(Clone, Debug)]
pub struct Assignment {
    pub game: ActiveGame,
    pub changes: Changeset,
}

/// Knobs the planners need from the deployment configuration.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AllocationSettings {
    pub strategy: RotationStrategy,
    pub variety_pool_cap: usize,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::default(),
            variety_pool_cap: DEFAULT_VARIETY_POOL_CAP,
        }
    }
}

fn check_court_free(state: &SessionState, court: CourtId) -> Result<(), SessionError> {
    if !state.has_court(court) {
        return Err(SessionError::UnknownCourt(court));
    }
    if state.courts.contains_key(&court) {
        return Err(SessionError::CourtBusy(court));
    }
    Ok(())
}

fn lookup<'a>(state: &'a SessionState, id: PlayerId) -> Result<&'a Player, SessionError> {
    state.player(id).ok_or(SessionError::PlayerNotFound(id))
}

fn lookup_four<'a>(
    state: &'a SessionState,
    ids: &[PlayerId],
) -> Result<[&'a Player; 4], SessionError> {
    Ok([
        lookup(state, ids[0])?,
        lookup(state, ids[1])?,
        lookup(state, ids[2])?,
        lookup(state, ids[3])?,
    ])
}

/// Validate that the four players can start on `court` and build the commit.
///
/// The changeset re-checks, at commit time, that the court is still free and all four
/// are still waiting; a concurrent assignment that claimed any of them makes the commit
/// fail with a conflict instead of double-booking.
pub fn plan_start_game(
    state: &SessionState,
    court: CourtId,
    teams: Teams,
    settings: &AllocationSettings,
    now: DateTime<Utc>,
) -> Result<Assignment, SessionError> {
    check_court_free(state, court)?;
    let ids = teams.all();
    for id in ids {
        lookup(state, id)?;
        if !state.is_present(id) {
            return Err(SessionError::NotPresent(id));
        }
        if !state.is_waiting(id) {
            return Err(SessionError::StaleSelection);
        }
    }

    let game = ActiveGame::new(court, teams, now);
    let mut changes = Changeset::new()
        .require(Precondition::CourtFree(court))
        .require(Precondition::Waiting(ids.to_vec()));
    changes.extend(dequeue_many(&ids));
    changes.push(FieldUpdate::set(
        FieldPath::Court(court),
        FieldValue::Game(Box::new(game.clone())),
    ));

    // Starting a game on this court ends its chooser phase; a chooser for another court
    // who is pulled onto this one gives up that right too.
    let mut cleared: HashSet<CourtId> = HashSet::new();
    if state.choosers.contains_key(&court) {
        cleared.insert(court);
    }
    for (c, chooser) in &state.choosers {
        if ids.contains(chooser) {
            cleared.insert(*c);
        }
    }
    let mut cleared: Vec<CourtId> = cleared.into_iter().collect();
    cleared.sort_unstable();
    for c in cleared {
        changes.push(FieldUpdate::set(FieldPath::Chooser(c), FieldValue::Empty));
    }

    if settings.strategy == RotationStrategy::OpponentVariety {
        changes.extend(history_updates(&teams));
    }

    log::debug!("Planned game on court {}: {:?} vs {:?}", court, teams.team1, teams.team2);
    Ok(Assignment { game, changes })
}

/// Record team-mates and opponents for the variety search.
fn history_updates(teams: &Teams) -> Vec<FieldUpdate> {
    let mut updates = Vec::with_capacity(8);
    for (side, other) in [(teams.team1, teams.team2), (teams.team2, teams.team1)] {
        for (i, &id) in side.iter().enumerate() {
            let mate = side[1 - i];
            updates.push(FieldUpdate::append_unique(
                FieldPath::Player(id, PlayerField::PlayedWith),
                [mate],
            ));
            updates.push(FieldUpdate::append_unique(
                FieldPath::Player(id, PlayerField::PlayedAgainst),
                other,
            ));
        }
    }
    updates
}

/// Pick four players for `court` according to the rotation strategy and balance them.
pub fn plan_auto_assign(
    state: &SessionState,
    court: CourtId,
    settings: &AllocationSettings,
    now: DateTime<Utc>,
) -> Result<Assignment, SessionError> {
    check_court_free(state, court)?;
    if let Some(&chooser) = state.choosers.get(&court) {
        return Err(SessionError::ChooserPending { court, chooser });
    }

    // Players holding a chooser right for another court keep it; they are not auto-picked.
    let reserved: HashSet<PlayerId> = state.choosers.values().copied().collect();
    let candidates: Vec<&Player> = ordered_waiting(state, settings.strategy.queue_policy())
        .into_iter()
        .filter(|id| !reserved.contains(id))
        .filter_map(|id| state.player(id))
        .collect();
    if candidates.len() < 4 {
        return Err(SessionError::InsufficientPlayers {
            waiting: candidates.len(),
        });
    }

    let four: [&Player; 4] = match settings.strategy {
        RotationStrategy::OpponentVariety => {
            let pool = &candidates[..candidates.len().min(settings.variety_pool_cap.max(4))];
            let picked = select_variety_four(pool).ok_or(SessionError::InsufficientPlayers {
                waiting: pool.len(),
            })?;
            [pool[picked[0]], pool[picked[1]], pool[picked[2]], pool[picked[3]]]
        }
        RotationStrategy::Recency | RotationStrategy::WinnerChooses { .. } => {
            [candidates[0], candidates[1], candidates[2], candidates[3]]
        }
    };

    plan_start_game(state, court, balance(four), settings, now)
}

/// Operator override: any four waiting players, any split. Bypasses the rotation order
/// and any chooser holding the court.
pub fn plan_manual_assign(
    state: &SessionState,
    court: CourtId,
    lineup: &Lineup,
    settings: &AllocationSettings,
    now: DateTime<Utc>,
) -> Result<Assignment, SessionError> {
    let teams = match lineup {
        Lineup::Teams { team1, team2 } => validate_split(team1, team2)?,
        Lineup::Balanced { players } => {
            let distinct: HashSet<_> = players.iter().collect();
            if players.len() != 4 || distinct.len() != 4 {
                return Err(SessionError::InvalidTeamSplit(format!(
                    "select exactly 4 different players (got {})",
                    players.len()
                )));
            }
            balance(lookup_four(state, players)?)
        }
    };
    plan_start_game(state, court, teams, settings, now)
}

/// The chooser for `court` submits themself plus three waiting players, split 2 + 2.
pub fn plan_chooser_lineup(
    state: &SessionState,
    court: CourtId,
    chooser: PlayerId,
    team1: &[PlayerId],
    team2: &[PlayerId],
    settings: &AllocationSettings,
    now: DateTime<Utc>,
) -> Result<Assignment, SessionError> {
    check_court_free(state, court)?;
    if state.choosers.get(&court) != Some(&chooser) {
        return Err(SessionError::NotChooser { court });
    }
    let teams = validate_split(team1, team2)?;
    if !teams.all().contains(&chooser) {
        return Err(SessionError::InvalidTeamSplit(
            "the chooser must be in the lineup".to_string(),
        ));
    }
    let mut assignment = plan_start_game(state, court, teams, settings, now)?;
    assignment.changes = assignment
        .changes
        .require(Precondition::ChooserIs {
            court,
            player: chooser,
        });
    Ok(assignment)
}

/// Count relationships among the four that have not happened yet: for each ordered pair
/// (a, b), +1 if b was never a's team-mate and +1 if b was never a's opponent.
pub fn novelty_score(four: [&Player; 4]) -> u32 {
    let mut score = 0;
    for a in four {
        for b in four {
            if a.id == b.id {
                continue;
            }
            if !a.played_with.contains(&b.id) {
                score += 1;
            }
            if !a.played_against.contains(&b.id) {
                score += 1;
            }
        }
    }
    score
}

/// Exhaustive search over every 4-combination of `pool` (indices `i < j < k < l` in
/// lexicographic order) for the highest novelty score. The first combination reaching the
/// best score wins. `None` if the pool has fewer than four players.
pub fn select_variety_four(pool: &[&Player]) -> Option<[usize; 4]> {
    let n = pool.len();
    let mut best: Option<([usize; 4], u32)> = None;
    for i in 0..n {
        for j in i + 1..n {
            for k in j + 1..n {
                for l in k + 1..n {
                    let score = novelty_score([pool[i], pool[j], pool[k], pool[l]]);
                    if best.map_or(true, |(_, s)| score > s) {
                        best = Some(([i, j, k, l], score));
                    }
                }
            }
        }
    }
    best.map(|(combo, _)| combo)
}
