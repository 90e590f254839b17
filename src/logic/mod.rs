//! Session business logic. Every planner reads a `SessionState` snapshot and returns the
//! changeset to commit; nothing here performs I/O.

mod allocation;
mod balance;
mod directory;
mod lifecycle;
mod queue;
mod setup;
mod stats;

pub use allocation::{
    novelty_score, plan_auto_assign, plan_chooser_lineup, plan_manual_assign, plan_start_game,
    select_variety_four, AllocationSettings, Assignment, Lineup, DEFAULT_VARIETY_POOL_CAP,
};
pub use balance::{balance, validate_split};
pub use directory::{
    create_player, find_by_name, increment_chooser_count, plan_check_in, plan_check_out,
    record_outcome, CheckInPlan,
};
pub use lifecycle::{chooser_priority, next_chooser, outcome, plan_finish_game, FinishPlan};
pub use queue::{dequeue_many, enqueue, ordered_waiting, requeue_after_game};
pub use setup::{generate_password, plan_reset};
pub use stats::{partnership_stats, player_summaries, PartnershipStat, PlayerSummary};
