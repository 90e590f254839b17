//! Team balancing: split four players into two pairs of similar total skill.

use crate::models::{Player, PlayerId, SessionError, Teams};
use std::collections::HashSet;

/// Seed-snake split: sort by skill descending (stable, so equal skills keep input order),
/// then pair strongest with weakest and the two middle players together.
///
/// Takes exactly four players by type; there is no runtime failure mode.
pub fn balance(four: [&Player; 4]) -> Teams {
    let mut sorted = four;
    sorted.sort_by(|a, b| b.skill.cmp(&a.skill));
    Teams {
        team1: [sorted[0].id, sorted[3].id],
        team2: [sorted[1].id, sorted[2].id],
    }
}

/// Check a hand-made split: exactly two per side, four distinct players.
pub fn validate_split(team1: &[PlayerId], team2: &[PlayerId]) -> Result<Teams, SessionError> {
    if team1.len() != 2 || team2.len() != 2 {
        return Err(SessionError::InvalidTeamSplit(format!(
            "teams must have 2 players each (got {} and {})",
            team1.len(),
            team2.len()
        )));
    }
    let distinct: HashSet<_> = team1.iter().chain(team2.iter()).collect();
    if distinct.len() != 4 {
        return Err(SessionError::InvalidTeamSplit(
            "a player appears more than once".to_string(),
        ));
    }
    Ok(Teams {
        team1: [team1[0], team1[1]],
        team2: [team2[0], team2[1]],
    })
}
