//! Integration tests for the waiting queue: enqueue/dequeue and both rotation orders.

mod common;

use badminton_club_web::logic::{dequeue_many, enqueue};
use badminton_club_web::store::Changeset;
use badminton_club_web::{
    ordered_waiting, ChooserTieBreak, Lineup, Player, PlayerDefaults, QueuePolicy,
    RotationStrategy, SessionState,
};
use chrono::{Duration, TimeZone, Utc};
use common::{fixture, start_time};

fn state_with(players: &[Player]) -> SessionState {
    let mut state = SessionState::new(4, "000000");
    for p in players {
        state.players.insert(p.id, p.clone());
        state.attendees.insert(p.id);
        state.main_queue.push(p.id);
    }
    state
}

#[test]
fn never_played_orders_before_any_timestamp() {
    let mut ancient = Player::new("Ancient", PlayerDefaults::default());
    ancient.last_played = Some(Utc.with_ymd_and_hms(1970, 1, 1, 0, 0, 0).unwrap());
    let mut recent = Player::new("Recent", PlayerDefaults::default());
    recent.last_played = Some(start_time());
    let fresh = Player::new("Fresh", PlayerDefaults::default());

    let state = state_with(&[recent.clone(), ancient.clone(), fresh.clone()]);
    let order = ordered_waiting(&state, QueuePolicy::Recency);
    assert_eq!(order, vec![fresh.id, ancient.id, recent.id]);
}

#[test]
fn recency_ties_keep_arrival_order() {
    let players: Vec<Player> = (0..5)
        .map(|i| Player::new(format!("P{i}"), PlayerDefaults::default()))
        .collect();
    let state = state_with(&players);
    let order = ordered_waiting(&state, QueuePolicy::Recency);
    let expected: Vec<_> = players.iter().map(|p| p.id).collect();
    assert_eq!(order, expected);
}

#[test]
fn enqueue_is_idempotent_and_skips_players_on_court() {
    let f = fixture(RotationStrategy::Recency);
    let ids = f.check_in_all(&["A", "B", "C", "D", "E"]);
    let state = f.state();
    assert!(enqueue(&state, ids[0]).is_none(), "already queued");

    f.service.auto_assign(1).unwrap();
    let state = f.state();
    let on_court = state.courts[&1].player_ids()[0];
    assert!(enqueue(&state, on_court).is_none(), "on court");
    f.assert_invariants();
}

#[test]
fn dequeue_many_ignores_absent_ids() {
    let f = fixture(RotationStrategy::Recency);
    let ids = f.check_in_all(&["A", "B", "C"]);
    let stranger = uuid::Uuid::new_v4();

    let mut state = f.state();
    let mut changes = Changeset::new();
    changes.extend(dequeue_many(&[ids[1], stranger]));
    changes.apply_to(&mut state).unwrap();
    assert_eq!(state.main_queue, vec![ids[0], ids[2]]);
}

#[test]
fn played_players_go_behind_never_played_under_recency() {
    let f = fixture(RotationStrategy::Recency);
    let ids = f.check_in_all(&["A", "B", "C", "D", "E", "F"]);

    f.service.auto_assign(1).unwrap();
    f.clock.advance(Duration::minutes(12));
    f.service.finish_game(1, 21, 10, None).unwrap();
    f.assert_invariants();

    let order = ordered_waiting(&f.state(), QueuePolicy::Recency);
    assert_eq!(&order[..2], &[ids[4], ids[5]]);
    assert_eq!(order.len(), 6);
}

#[test]
fn finishers_first_puts_winners_ahead_and_losers_at_tail() {
    let f = fixture(RotationStrategy::WinnerChooses {
        tie_break: ChooserTieBreak::FirstWinner,
    });
    let ids = f.check_in_all(&["A", "B", "C", "D", "E", "F"]);
    let (a, b, c, d, e, g) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5]);

    f.service
        .assign_manual(
            1,
            &Lineup::Teams {
                team1: vec![a, b],
                team2: vec![c, d],
            },
        )
        .unwrap();
    assert_eq!(f.state().main_queue, vec![e, g]);

    f.clock.advance(Duration::minutes(15));
    f.service.finish_game(1, 21, 15, None).unwrap();
    f.assert_invariants();

    let order = ordered_waiting(&f.state(), QueuePolicy::FinishersFirst);
    assert_eq!(order, vec![a, b, e, g, c, d]);
}

#[test]
fn operator_tie_break_swaps_winner_order() {
    let f = fixture(RotationStrategy::WinnerChooses {
        tie_break: ChooserTieBreak::ActingOperator,
    });
    let ids = f.check_in_all(&["A", "B", "C", "D", "E", "F"]);
    let (a, b, c, d, e, g) = (ids[0], ids[1], ids[2], ids[3], ids[4], ids[5]);

    f.service
        .assign_manual(
            1,
            &Lineup::Teams {
                team1: vec![a, b],
                team2: vec![c, d],
            },
        )
        .unwrap();
    let (_, chooser) = f.service.finish_game(1, 21, 15, Some(b)).unwrap();
    assert_eq!(chooser, Some(b));

    let order = ordered_waiting(&f.state(), QueuePolicy::FinishersFirst);
    assert_eq!(order, vec![b, a, e, g, c, d]);
}

#[test]
fn draw_sends_everyone_to_main_queue_under_finishers_first() {
    let f = fixture(RotationStrategy::WinnerChooses {
        tie_break: ChooserTieBreak::FirstWinner,
    });
    let ids = f.check_in_all(&["A", "B", "C", "D", "E"]);
    f.service
        .assign_manual(
            1,
            &Lineup::Teams {
                team1: vec![ids[0], ids[1]],
                team2: vec![ids[2], ids[3]],
            },
        )
        .unwrap();
    let (_, chooser) = f.service.finish_game(1, 18, 18, None).unwrap();
    assert_eq!(chooser, None);

    let state = f.state();
    assert!(state.finishers.is_empty());
    assert_eq!(state.main_queue, vec![ids[4], ids[0], ids[1], ids[2], ids[3]]);
    assert!(state.choosers.is_empty());
}
