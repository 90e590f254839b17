//! Data structures for a club session: players, courts, games, the shared session document.

mod game;
mod player;
mod session;

pub use game::{format_duration, ActiveGame, CourtId, GameId, LogEntry, Teams, Winner};
pub use player::{Gender, Player, PlayerDefaults, PlayerId, Skill};
pub use session::{
    ChooserTieBreak, CourtStatus, QueuePolicy, RotationStrategy, SessionError, SessionState,
    DEFAULT_COURTS,
};
