//! Badminton club session scheduler: library with models, rotation logic and storage.

pub mod config;
pub mod logic;
pub mod models;
pub mod roster;
pub mod service;
pub mod store;

pub use logic::{
    balance, find_by_name, ordered_waiting, outcome, partnership_stats, plan_auto_assign,
    plan_check_in, plan_check_out, plan_chooser_lineup, plan_finish_game, plan_manual_assign,
    select_variety_four, AllocationSettings, Lineup,
};
pub use models::{
    ActiveGame, ChooserTieBreak, CourtId, CourtStatus, Gender, LogEntry, Player, PlayerDefaults,
    PlayerId, QueuePolicy, RotationStrategy, SessionError, SessionState, Skill, Teams, Winner,
};
pub use service::{Command, CommandOutcome, ServiceSettings, SessionService, SessionView};
pub use store::{Clock, ManualClock, MemoryStore, Persistence, PresenceStore, SystemClock};
