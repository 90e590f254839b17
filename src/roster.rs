//! Seed the player directory from a CSV roster (`name,skill,gender,is_guest`).

use crate::logic::{create_player, find_by_name};
use crate::models::{Gender, Player, PlayerDefaults, SessionState, Skill};
use crate::store::{
    Changeset, FieldPath, FieldUpdate, FieldValue, Persistence, PlayerField, Precondition,
    StoreError,
};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize)]
struct RosterRow {
    name: String,
    #[serde(default)]
    skill: Option<u8>,
    #[serde(default)]
    gender: Option<Gender>,
    #[serde(default)]
    is_guest: Option<bool>,
}

/// Errors while reading a roster file.
#[derive(Debug)]
pub enum RosterError {
    Csv(csv::Error),
    /// 1-based data row number and reason.
    InvalidRow(usize, String),
}

impl std::fmt::Display for RosterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RosterError::Csv(e) => write!(f, "roster CSV error: {}", e),
            RosterError::InvalidRow(row, reason) => write!(f, "roster row {}: {}", row, reason),
        }
    }
}

impl std::error::Error for RosterError {}

impl From<csv::Error> for RosterError {
    fn from(e: csv::Error) -> Self {
        RosterError::Csv(e)
    }
}

/// Parse roster rows into fresh profiles. Missing skill defaults to intermediate.
pub fn read_roster<R: Read>(reader: R) -> Result<Vec<Player>, RosterError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut players = Vec::new();
    for (i, row) in csv_reader.deserialize::<RosterRow>().enumerate() {
        let row = row?;
        let skill = match row.skill {
            Some(level) => Skill::try_from(level).map_err(|e| RosterError::InvalidRow(i + 1, e))?,
            None => Skill::default(),
        };
        let defaults = PlayerDefaults {
            skill,
            gender: row.gender.unwrap_or_default(),
            is_guest: row.is_guest.unwrap_or(false),
        };
        let player = create_player(&row.name, defaults)
            .map_err(|e| RosterError::InvalidRow(i + 1, e.to_string()))?;
        players.push(player);
    }
    Ok(players)
}

/// Changeset adding roster players whose names are not yet known, plus how many it adds.
/// Each new profile is guarded by its name still being free at commit time.
pub fn plan_roster_merge(state: &SessionState, roster: Vec<Player>) -> (Changeset, usize) {
    let mut changes = Changeset::new();
    let mut seen: Vec<String> = Vec::new();
    for player in roster {
        let key = player.name.trim().to_lowercase();
        if find_by_name(state, &player.name).is_some() || seen.contains(&key) {
            continue;
        }
        seen.push(key);
        changes = changes.require(Precondition::NameAvailable(player.name.clone()));
        changes.push(FieldUpdate::set(
            FieldPath::Player(player.id, PlayerField::Profile),
            FieldValue::Profile(Box::new(player)),
        ));
    }
    (changes, seen.len())
}

/// Merge `roster` into whatever document `store` holds, including one restored from a
/// snapshot. Returns how many players were added.
pub fn import_roster<P: Persistence>(store: &P, roster: Vec<Player>) -> Result<usize, StoreError> {
    let state = store.read_state()?;
    let (changes, added) = plan_roster_merge(&state, roster);
    if added > 0 {
        store.commit(&changes)?;
    }
    Ok(added)
}
