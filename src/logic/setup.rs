//! Session setup: password generation and the admin reset.

use crate::models::SessionState;
use rand::Rng;

/// Six random digits.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// Fresh session document: nobody present, queues and courts empty, new password.
/// The roster (with its counters) is kept; check-in times are cleared.
pub fn plan_reset(state: &SessionState, password: String) -> SessionState {
    let mut next = SessionState::new(state.court_count, password);
    next.players = state
        .players
        .iter()
        .map(|(id, p)| {
            let mut p = p.clone();
            p.check_in_time = None;
            (*id, p)
        })
        .collect();
    next
}
