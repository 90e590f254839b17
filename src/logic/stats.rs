//! Aggregate statistics derived from the game log and the roster.

use crate::models::{LogEntry, PlayerId, SessionState, Skill, Winner};
use serde::Serialize;
use std::collections::HashMap;

/// How a pair of team-mates has done together.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PartnershipStat {
    pub players: [PlayerId; 2],
    pub names: String,
    pub games: u32,
    pub wins: u32,
    pub draws: u32,
    /// wins / games.
    pub win_rate: f64,
}

/// Per-partnership record over the whole log, best win rate first (then most games,
/// then name).
pub fn partnership_stats(log: &[LogEntry]) -> Vec<PartnershipStat> {
    let mut by_pair: HashMap<[PlayerId; 2], PartnershipStat> = HashMap::new();
    for entry in log {
        let sides = [
            (entry.team1_ids, &entry.team1_names, Winner::Team1),
            (entry.team2_ids, &entry.team2_names, Winner::Team2),
        ];
        for (ids, names, side) in sides {
            let mut key = ids;
            key.sort();
            let stat = by_pair.entry(key).or_insert_with(|| PartnershipStat {
                players: key,
                names: names.clone(),
                games: 0,
                wins: 0,
                draws: 0,
                win_rate: 0.0,
            });
            stat.games += 1;
            if entry.winner == side {
                stat.wins += 1;
            } else if entry.winner == Winner::Draw {
                stat.draws += 1;
            }
        }
    }
    let mut stats: Vec<PartnershipStat> = by_pair
        .into_values()
        .map(|mut s| {
            s.win_rate = f64::from(s.wins) / f64::from(s.games);
            s
        })
        .collect();
    stats.sort_by(|a, b| {
        b.win_rate
            .total_cmp(&a.win_rate)
            .then(b.games.cmp(&a.games))
            .then_with(|| a.names.cmp(&b.names))
    });
    stats
}

/// Roster row for display.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub skill: Skill,
    pub is_guest: bool,
    pub present: bool,
    pub games_played: u32,
    pub wins: u32,
    pub chooser_count: u32,
}

/// Every known player, sorted by name.
pub fn player_summaries(state: &SessionState) -> Vec<PlayerSummary> {
    let mut rows: Vec<PlayerSummary> = state
        .players
        .values()
        .map(|p| PlayerSummary {
            id: p.id,
            name: p.name.clone(),
            skill: p.skill,
            is_guest: p.is_guest,
            present: state.is_present(p.id),
            games_played: p.games_played,
            wins: p.wins,
            chooser_count: p.chooser_count,
        })
        .collect();
    rows.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
    rows
}
