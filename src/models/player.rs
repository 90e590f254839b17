//! Player profile, skill and gender.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Unique identifier for a player (stable across sessions).
pub type PlayerId = Uuid;

/// Playing level. Serialized as its numeric level (1..=3).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Skill {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Skill {
    pub fn level(self) -> u8 {
        match self {
            Skill::Beginner => 1,
            Skill::Intermediate => 2,
            Skill::Advanced => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Skill::Beginner => "Beginner",
            Skill::Intermediate => "Intermediate",
            Skill::Advanced => "Advanced",
        }
    }
}

impl TryFrom<u8> for Skill {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            1 => Ok(Skill::Beginner),
            2 => Ok(Skill::Intermediate),
            3 => Ok(Skill::Advanced),
            other => Err(format!("skill level must be 1, 2 or 3 (got {})", other)),
        }
    }
}

impl From<Skill> for u8 {
    fn from(skill: Skill) -> u8 {
        skill.level()
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    #[default]
    Unspecified,
}

/// Profile fields supplied at check-in for a player that does not exist yet.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct PlayerDefaults {
    #[serde(default)]
    pub skill: Skill,
    #[serde(default)]
    pub gender: Gender,
    #[serde(default)]
    pub is_guest: bool,
}

/// A club member or guest. The profile outlives a session; presence is tracked separately.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub skill: Skill,
    pub gender: Gender,
    pub is_guest: bool,
    /// Times this player was handed the right to pick a lineup.
    pub chooser_count: u32,
    pub games_played: u32,
    pub wins: u32,
    /// None until the first finished game; orders ahead of everyone who has played.
    pub last_played: Option<DateTime<Utc>>,
    pub check_in_time: Option<DateTime<Utc>>,
    /// Former team-mates (opponent-variety rotation).
    #[serde(default)]
    pub played_with: BTreeSet<PlayerId>,
    /// Former opponents (opponent-variety rotation).
    #[serde(default)]
    pub played_against: BTreeSet<PlayerId>,
}

impl Player {
    /// Create a new player with a fresh id. Counters start at zero.
    pub fn new(name: impl Into<String>, defaults: PlayerDefaults) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            skill: defaults.skill,
            gender: defaults.gender,
            is_guest: defaults.is_guest,
            chooser_count: 0,
            games_played: 0,
            wins: 0,
            last_played: None,
            check_in_time: None,
            played_with: BTreeSet::new(),
            played_against: BTreeSet::new(),
        }
    }

    /// Case-insensitive match after trimming the candidate.
    pub fn name_matches(&self, name: &str) -> bool {
        self.name.trim().to_lowercase() == name.trim().to_lowercase()
    }
}
