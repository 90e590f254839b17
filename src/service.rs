//! Command execution: read the session document, plan against the snapshot, commit the
//! changeset. This is what an outer poll/render loop or HTTP handler calls.

use crate::logic::{
    find_by_name, generate_password, ordered_waiting, partnership_stats, plan_auto_assign,
    plan_check_in, plan_check_out, plan_chooser_lineup, plan_finish_game, plan_manual_assign,
    plan_reset, AllocationSettings, Lineup, PartnershipStat, DEFAULT_VARIETY_POOL_CAP,
};
use crate::models::{
    ActiveGame, CourtId, CourtStatus, LogEntry, Player, PlayerDefaults, PlayerId,
    RotationStrategy, SessionError, SessionState,
};
use crate::store::{Changeset, Clock, Persistence, StoreError};
use serde::{Deserialize, Serialize};

/// Write attempts per command when not configured otherwise.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 3;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ServiceSettings {
    pub strategy: RotationStrategy,
    pub variety_pool_cap: usize,
    /// Attempts for a write that reports the backend unavailable. Conflicts are never retried.
    pub max_write_attempts: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            strategy: RotationStrategy::default(),
            variety_pool_cap: DEFAULT_VARIETY_POOL_CAP,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

impl ServiceSettings {
    fn allocation(&self) -> AllocationSettings {
        AllocationSettings {
            strategy: self.strategy,
            variety_pool_cap: self.variety_pool_cap,
        }
    }
}

/// A discrete operator action.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum Command {
    CheckIn {
        name: String,
        #[serde(default)]
        defaults: PlayerDefaults,
    },
    CheckOut {
        player_id: PlayerId,
    },
    AutoAssign {
        court: CourtId,
    },
    AssignManual {
        court: CourtId,
        lineup: Lineup,
    },
    ChooseLineup {
        court: CourtId,
        chooser: PlayerId,
        team1: Vec<PlayerId>,
        team2: Vec<PlayerId>,
    },
    FinishGame {
        court: CourtId,
        team1_score: u32,
        team2_score: u32,
        #[serde(default)]
        operator: Option<PlayerId>,
    },
    Reset,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum CommandOutcome {
    CheckedIn { player: Player, created: bool },
    CheckedOut { player_id: PlayerId },
    GameStarted { game: ActiveGame },
    GameFinished {
        entry: LogEntry,
        chooser: Option<PlayerId>,
    },
    SessionReset { session_password: String },
}

/// One court as seen by a polling client.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CourtView {
    pub court: CourtId,
    #[serde(flatten)]
    pub status: CourtStatus,
}

/// What a polling client renders.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SessionView {
    pub present: usize,
    pub waiting: usize,
    pub on_court: usize,
    /// Waiting players in rotation order.
    pub queue: Vec<Player>,
    pub courts: Vec<CourtView>,
    pub strategy: RotationStrategy,
}

/// Executes commands against a `Persistence` backend.
pub struct SessionService<P, C> {
    store: P,
    clock: C,
    settings: ServiceSettings,
}

impl<P: Persistence, C: Clock> SessionService<P, C> {
    /// Connect to the store. Fails (and the session must not start) if the document
    /// cannot be read.
    pub fn connect(store: P, clock: C, settings: ServiceSettings) -> Result<Self, SessionError> {
        let state = store
            .read_state()
            .map_err(|e| SessionError::Unavailable(e.to_string()))?;
        log::info!(
            "Session connected: {} courts, {} players on roster, {} present, rotation {:?}",
            state.court_count,
            state.players.len(),
            state.attendees.len(),
            settings.strategy
        );
        Ok(Self {
            store,
            clock,
            settings,
        })
    }

    pub fn store(&self) -> &P {
        &self.store
    }

    pub fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    pub fn state(&self) -> Result<SessionState, SessionError> {
        Ok(self.store.read_state()?)
    }

    pub fn execute(&self, command: Command) -> Result<CommandOutcome, SessionError> {
        match command {
            Command::CheckIn { name, defaults } => {
                let (player, created) = self.check_in(&name, defaults)?;
                Ok(CommandOutcome::CheckedIn { player, created })
            }
            Command::CheckOut { player_id } => {
                self.check_out(player_id)?;
                Ok(CommandOutcome::CheckedOut { player_id })
            }
            Command::AutoAssign { court } => Ok(CommandOutcome::GameStarted {
                game: self.auto_assign(court)?,
            }),
            Command::AssignManual { court, lineup } => Ok(CommandOutcome::GameStarted {
                game: self.assign_manual(court, &lineup)?,
            }),
            Command::ChooseLineup {
                court,
                chooser,
                team1,
                team2,
            } => Ok(CommandOutcome::GameStarted {
                game: self.choose_lineup(court, chooser, &team1, &team2)?,
            }),
            Command::FinishGame {
                court,
                team1_score,
                team2_score,
                operator,
            } => {
                let (entry, chooser) = self.finish_game(court, team1_score, team2_score, operator)?;
                Ok(CommandOutcome::GameFinished { entry, chooser })
            }
            Command::Reset => Ok(CommandOutcome::SessionReset {
                session_password: self.reset()?,
            }),
        }
    }

    /// Returns the player and whether the profile was created.
    pub fn check_in(
        &self,
        name: &str,
        defaults: PlayerDefaults,
    ) -> Result<(Player, bool), SessionError> {
        let state = self.state()?;
        let plan = plan_check_in(&state, name, defaults, self.clock.now())?;
        if plan.changes.is_empty() {
            log::debug!("{} is already checked in", plan.player.name);
            return Ok((plan.player, false));
        }
        match self.commit(&plan.changes) {
            Ok(()) => {}
            Err(SessionError::StaleSelection) => {
                // Lost a race with another check-in of the same name.
                let state = self.state()?;
                return match find_by_name(&state, name) {
                    Some(p) if state.is_present(p.id) => {
                        log::debug!("{} was checked in concurrently", p.name);
                        Ok((p.clone(), false))
                    }
                    _ => Err(SessionError::StaleSelection),
                };
            }
            Err(e) => return Err(e),
        }
        log::info!(
            "Checked in {}{}",
            plan.player.name,
            if plan.created { " (new player)" } else { "" }
        );
        Ok((plan.player, plan.created))
    }

    pub fn check_out(&self, player_id: PlayerId) -> Result<(), SessionError> {
        let state = self.state()?;
        let changes = plan_check_out(&state, player_id)?;
        self.commit(&changes)?;
        log::info!("Checked out {}", display_name(&state, player_id));
        Ok(())
    }

    pub fn auto_assign(&self, court: CourtId) -> Result<ActiveGame, SessionError> {
        let state = self.state()?;
        let assignment =
            plan_auto_assign(&state, court, &self.settings.allocation(), self.clock.now())?;
        self.commit(&assignment.changes)?;
        log_game_start(&state, &assignment.game, "auto");
        Ok(assignment.game)
    }

    pub fn assign_manual(&self, court: CourtId, lineup: &Lineup) -> Result<ActiveGame, SessionError> {
        let state = self.state()?;
        let assignment = plan_manual_assign(
            &state,
            court,
            lineup,
            &self.settings.allocation(),
            self.clock.now(),
        )?;
        self.commit(&assignment.changes)?;
        log_game_start(&state, &assignment.game, "manual");
        Ok(assignment.game)
    }

    pub fn choose_lineup(
        &self,
        court: CourtId,
        chooser: PlayerId,
        team1: &[PlayerId],
        team2: &[PlayerId],
    ) -> Result<ActiveGame, SessionError> {
        let state = self.state()?;
        let assignment = plan_chooser_lineup(
            &state,
            court,
            chooser,
            team1,
            team2,
            &self.settings.allocation(),
            self.clock.now(),
        )?;
        self.commit(&assignment.changes)?;
        log_game_start(&state, &assignment.game, "chooser");
        Ok(assignment.game)
    }

    /// Returns the log entry and, under winner-chooses rotation, the new chooser.
    pub fn finish_game(
        &self,
        court: CourtId,
        team1_score: u32,
        team2_score: u32,
        operator: Option<PlayerId>,
    ) -> Result<(LogEntry, Option<PlayerId>), SessionError> {
        let state = self.state()?;
        let plan = plan_finish_game(
            &state,
            court,
            team1_score,
            team2_score,
            self.settings.strategy,
            operator,
            self.clock.now(),
        )?;
        self.commit(&plan.changes)?;
        log::info!(
            "Court {} finished {} ({} vs {}), winner: {}",
            court,
            plan.entry.score,
            plan.entry.team1_names,
            plan.entry.team2_names,
            plan.entry.winner
        );
        if let Some(chooser) = plan.chooser {
            log::info!("{} chooses next on court {}", display_name(&state, chooser), court);
        }
        Ok((plan.entry, plan.chooser))
    }

    /// Whole-document reset. Returns the new session password.
    pub fn reset(&self) -> Result<String, SessionError> {
        let state = self.state()?;
        let password = generate_password();
        let next = plan_reset(&state, password.clone());
        self.with_retries(|| self.store.replace_state(next.clone()))?;
        log::info!("Session reset ({} players kept on roster)", next.players.len());
        Ok(password)
    }

    pub fn view(&self) -> Result<SessionView, SessionError> {
        let state = self.state()?;
        let queue = ordered_waiting(&state, self.settings.strategy.queue_policy())
            .into_iter()
            .filter_map(|id| state.player(id).cloned())
            .collect();
        let courts = state
            .court_ids()
            .map(|court| CourtView {
                court,
                status: state.court_status(court),
            })
            .collect();
        Ok(SessionView {
            present: state.attendees.len(),
            waiting: state.waiting_count(),
            on_court: state.on_court_count(),
            queue,
            courts,
            strategy: self.settings.strategy,
        })
    }

    pub fn log(&self) -> Result<Vec<LogEntry>, SessionError> {
        Ok(self.store.stream_log()?)
    }

    pub fn partnerships(&self) -> Result<Vec<PartnershipStat>, SessionError> {
        Ok(partnership_stats(&self.log()?))
    }

    fn commit(&self, changes: &Changeset) -> Result<(), SessionError> {
        self.with_retries(|| self.store.commit(changes))
    }

    fn with_retries(&self, mut write: impl FnMut() -> Result<(), StoreError>) -> Result<(), SessionError> {
        let attempts = self.settings.max_write_attempts.max(1);
        let mut attempt = 1;
        loop {
            match write() {
                Ok(()) => return Ok(()),
                Err(StoreError::Unavailable(e)) if attempt < attempts => {
                    log::warn!("Write attempt {}/{} failed: {}; retrying", attempt, attempts, e);
                    attempt += 1;
                }
                Err(e @ StoreError::Conflict(_)) => {
                    log::warn!("Write rejected: {}", e);
                    return Err(e.into());
                }
                Err(e) => {
                    log::warn!("Write failed: {}", e);
                    return Err(e.into());
                }
            }
        }
    }
}

fn display_name(state: &SessionState, id: PlayerId) -> String {
    state
        .player(id)
        .map_or_else(|| id.to_string(), |p| p.name.clone())
}

fn log_game_start(state: &SessionState, game: &ActiveGame, how: &str) {
    let names = |team: [PlayerId; 2]| {
        team.iter()
            .map(|id| display_name(state, *id))
            .collect::<Vec<_>>()
            .join(" & ")
    };
    log::info!(
        "Court {} started ({}): {} vs {}",
        game.court,
        how,
        names(game.team1),
        names(game.team2)
    );
}
