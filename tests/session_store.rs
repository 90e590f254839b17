//! Integration tests for check-in/check-out, the field-level store, snapshots and rosters.

mod common;

use badminton_club_web::logic::player_summaries;
use badminton_club_web::roster::{import_roster, plan_roster_merge, read_roster};
use badminton_club_web::store::{
    Changeset, FieldPath, FieldUpdate, FieldValue, Persistence, PlayerField, Precondition,
    PresenceStore, StoreError,
};
use badminton_club_web::{
    find_by_name, plan_check_in, ChooserTieBreak, Gender, Lineup, MemoryStore, PlayerDefaults,
    RotationStrategy, SessionError, SessionState, Skill,
};
use common::{fixture, start_time};

#[test]
fn check_in_reuses_profile_by_case_insensitive_name() {
    let f = fixture(RotationStrategy::Recency);
    let (first, created) = f
        .service
        .check_in("  Alice ", PlayerDefaults::default())
        .unwrap();
    assert!(created);
    assert_eq!(first.name, "Alice");
    assert_eq!(first.check_in_time, Some(start_time()));

    let (again, created) = f.service.check_in("ALICE", PlayerDefaults::default()).unwrap();
    assert!(!created);
    assert_eq!(again.id, first.id);

    let state = f.state();
    assert_eq!(state.players.len(), 1);
    assert_eq!(state.main_queue, vec![first.id]);
    assert_eq!(find_by_name(&state, "alice").map(|p| p.id), Some(first.id));
    f.assert_invariants();
}

#[test]
fn empty_name_is_rejected() {
    let f = fixture(RotationStrategy::Recency);
    assert_eq!(
        f.service.check_in("   ", PlayerDefaults::default()),
        Err(SessionError::EmptyName)
    );
}

#[test]
fn check_out_keeps_profile_and_frees_queue_slot() {
    let f = fixture(RotationStrategy::Recency);
    let ids = f.check_in_all(&["A", "B"]);
    f.service.check_out(ids[0]).unwrap();

    let state = f.state();
    assert!(!state.is_present(ids[0]));
    assert_eq!(state.main_queue, vec![ids[1]]);
    assert!(state.player(ids[0]).is_some());
    assert_eq!(state.player(ids[0]).unwrap().check_in_time, None);
    f.assert_invariants();

    assert_eq!(f.service.check_out(ids[0]), Err(SessionError::NotPresent(ids[0])));

    // Back again: same profile, tail of the queue.
    let again = f.check_in("a", Skill::Intermediate);
    assert_eq!(again, ids[0]);
    assert_eq!(f.state().main_queue, vec![ids[1], ids[0]]);
}

#[test]
fn check_out_is_refused_while_on_court() {
    let f = fixture(RotationStrategy::Recency);
    let ids = f.check_in_all(&["A", "B", "C", "D"]);
    f.service.auto_assign(1).unwrap();
    assert_eq!(f.service.check_out(ids[2]), Err(SessionError::PlayerOnCourt(ids[2])));
    f.assert_invariants();
}

#[test]
fn check_out_drops_chooser_right() {
    let f = fixture(RotationStrategy::WinnerChooses {
        tie_break: ChooserTieBreak::FirstWinner,
    });
    let ids = f.check_in_all(&["A", "B", "C", "D"]);
    f.service
        .assign_manual(
            1,
            &Lineup::Teams {
                team1: vec![ids[0], ids[1]],
                team2: vec![ids[2], ids[3]],
            },
        )
        .unwrap();
    f.service.finish_game(1, 21, 4, None).unwrap();
    assert_eq!(f.state().choosers.get(&1), Some(&ids[0]));

    f.service.check_out(ids[0]).unwrap();
    assert!(f.state().choosers.is_empty());
    f.assert_invariants();
}

#[test]
fn returning_guest_gets_new_skill_and_gender() {
    let f = fixture(RotationStrategy::Recency);
    let guest = PlayerDefaults {
        skill: Skill::Beginner,
        gender: Gender::Female,
        is_guest: true,
    };
    let (p, _) = f.service.check_in("Gia", guest).unwrap();
    f.service.check_out(p.id).unwrap();

    let returning = PlayerDefaults {
        skill: Skill::Advanced,
        gender: Gender::Female,
        is_guest: true,
    };
    let (p2, created) = f.service.check_in("gia", returning).unwrap();
    assert!(!created);
    assert_eq!(p2.id, p.id);
    assert_eq!(f.state().player(p.id).unwrap().skill, Skill::Advanced);
}

#[test]
fn field_updates_reject_type_mismatch_without_partial_writes() {
    let store = MemoryStore::new(SessionState::new(4, "111111"));
    let id = uuid::Uuid::new_v4();

    let mut changes = Changeset::new();
    changes.push(FieldUpdate::append_unique(FieldPath::Attendees, [id]));
    changes.push(FieldUpdate::increment(FieldPath::MainQueue, 1));
    assert!(matches!(
        store.commit(&changes),
        Err(StoreError::InvalidUpdate(_))
    ));
    assert!(store.read_state().unwrap().attendees.is_empty());

    assert!(matches!(
        store.apply_field_update(FieldUpdate::increment(
            FieldPath::Player(id, PlayerField::Wins),
            1
        )),
        Err(StoreError::InvalidUpdate(_))
    ));
}

#[test]
fn prepend_unique_moves_ids_to_front() {
    let store = MemoryStore::new(SessionState::new(4, "111111"));
    let ids: Vec<_> = (0..4).map(|_| uuid::Uuid::new_v4()).collect();
    store
        .apply_field_update(FieldUpdate::append_unique(
            FieldPath::Finishers,
            ids.iter().copied(),
        ))
        .unwrap();
    store
        .apply_field_update(FieldUpdate::prepend_unique(
            FieldPath::Finishers,
            [ids[3], ids[2]],
        ))
        .unwrap();
    assert_eq!(
        store.read_state().unwrap().finishers,
        vec![ids[3], ids[2], ids[0], ids[1]]
    );
}

#[test]
fn failed_precondition_writes_nothing() {
    let store = MemoryStore::new(SessionState::new(4, "111111"));
    let id = uuid::Uuid::new_v4();
    let mut changes = Changeset::new().require(Precondition::Present(id));
    changes.push(FieldUpdate::set(
        FieldPath::SessionPassword,
        FieldValue::Text("999999".to_string()),
    ));
    assert!(matches!(store.commit(&changes), Err(StoreError::Conflict(_))));
    assert_eq!(store.read_state().unwrap().session_password, "111111");
}

#[test]
fn presence_store_marks_attendance_only() {
    let store = MemoryStore::new(SessionState::new(4, "111111"));
    let id = uuid::Uuid::new_v4();
    store.mark_present(id).unwrap();
    store.mark_present(id).unwrap();
    assert_eq!(store.list_present().unwrap().len(), 1);
    assert!(store.read_state().unwrap().main_queue.is_empty());
    store.mark_absent(id).unwrap();
    assert!(store.list_present().unwrap().is_empty());
}

#[test]
fn reset_clears_session_but_keeps_roster_and_log() {
    let f = fixture(RotationStrategy::Recency);
    f.check_in_all(&["A", "B", "C", "D", "E"]);
    f.service.auto_assign(1).unwrap();
    f.service.finish_game(1, 21, 9, None).unwrap();
    f.service.auto_assign(2).unwrap();

    let password = f.service.reset().unwrap();
    assert_eq!(password.len(), 6);
    assert!(password.chars().all(|c| c.is_ascii_digit()));

    let state = f.state();
    assert_eq!(state.players.len(), 5);
    assert!(state.attendees.is_empty());
    assert!(state.courts.is_empty());
    assert_eq!(state.waiting_count(), 0);
    assert_eq!(state.session_password, password);
    assert!(state.players.values().all(|p| p.check_in_time.is_none()));
    assert_eq!(f.service.log().unwrap().len(), 1);
    f.assert_invariants();
}

#[test]
fn append_log_and_stream_in_finish_order() {
    let f = fixture(RotationStrategy::Recency);
    f.check_in_all(&["A", "B", "C", "D"]);
    f.service.auto_assign(1).unwrap();
    let (mut entry, _) = f.service.finish_game(1, 21, 9, None).unwrap();

    entry.game_id = uuid::Uuid::new_v4();
    entry.finish_time = entry.finish_time - chrono::Duration::hours(1);
    f.store.append_log(entry.clone()).unwrap();

    let log = f.store.stream_log().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0], entry);
}

#[test]
fn snapshot_file_survives_restart() {
    let dir = std::env::temp_dir().join(format!("badminton-snapshot-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("session.json");

    let store = MemoryStore::open(&path, SessionState::new(4, "222222")).unwrap();
    store.mark_present(uuid::Uuid::new_v4()).unwrap();
    store.flush().unwrap();

    let reopened = MemoryStore::open(&path, SessionState::new(4, "333333")).unwrap();
    let state = reopened.read_state().unwrap();
    assert_eq!(state.session_password, "222222");
    assert_eq!(state.attendees.len(), 1);

    std::fs::write(&path, "not json").unwrap();
    assert!(matches!(
        MemoryStore::open(&path, SessionState::new(4, "444444")),
        Err(StoreError::Unavailable(_))
    ));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn roster_csv_seeds_directory_once_per_name() {
    let csv = "name,skill,gender,is_guest\nAlice,3,female,false\nBob,,male,\n  carol ,1,,true\nALICE,1,,\n";
    let roster = read_roster(csv.as_bytes()).unwrap();
    assert_eq!(roster.len(), 4);
    assert_eq!(roster[0].skill, Skill::Advanced);
    assert_eq!(roster[1].skill, Skill::Intermediate);
    assert_eq!(roster[2].name, "carol");
    assert!(roster[2].is_guest);

    let (changes, added) = plan_roster_merge(&SessionState::new(4, "000000"), roster);
    assert_eq!(added, 3);
    assert_eq!(changes.updates.len(), 3);

    let bad = "name,skill\nDave,7\n";
    assert!(read_roster(bad.as_bytes()).is_err());
}

#[test]
fn roster_is_merged_into_a_restored_snapshot() {
    let dir = std::env::temp_dir().join(format!("badminton-roster-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("session.json");

    let first = read_roster("name\nAlice\nBob\n".as_bytes()).unwrap();
    let store = MemoryStore::open(&path, SessionState::new(4, "222222")).unwrap();
    assert_eq!(import_roster(&store, first).unwrap(), 2);
    store.flush().unwrap();

    // Restart with a longer roster: only the new name is added, existing ids survive.
    let reopened = MemoryStore::open(&path, SessionState::new(4, "333333")).unwrap();
    let alice = find_by_name(&reopened.read_state().unwrap(), "alice").unwrap().id;
    let second = read_roster("name\nAlice\nBob\nCarol\n".as_bytes()).unwrap();
    assert_eq!(import_roster(&reopened, second).unwrap(), 1);

    let state = reopened.read_state().unwrap();
    assert_eq!(state.players.len(), 3);
    assert_eq!(state.session_password, "222222");
    assert_eq!(find_by_name(&state, "Alice").unwrap().id, alice);
    assert!(find_by_name(&state, "carol").is_some());
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn stale_check_in_cannot_requeue_a_player_already_on_court() {
    let f = fixture(RotationStrategy::Recency);
    let ids = f.check_in_all(&["A", "B", "C", "D"]);
    f.service.check_out(ids[0]).unwrap();
    let stale = f.state();

    // Meanwhile another operator checks A back in and puts them on court.
    f.service.check_in("A", PlayerDefaults::default()).unwrap();
    f.service
        .assign_manual(1, &Lineup::Balanced { players: ids.clone() })
        .unwrap();

    let plan = plan_check_in(&stale, "A", PlayerDefaults::default(), start_time()).unwrap();
    assert!(matches!(
        f.store.commit(&plan.changes),
        Err(StoreError::Conflict(_))
    ));
    let state = f.state();
    assert!(!state.is_waiting(ids[0]));
    assert_eq!(state.court_of(ids[0]), Some(1));
    f.assert_invariants();
}

#[test]
fn losing_a_check_in_race_reports_already_checked_in() {
    let f = fixture(RotationStrategy::Recency);
    let a = f.check_in("A", Skill::Intermediate);
    f.service.check_out(a).unwrap();
    let stale = f.state();
    f.service.check_in("a", PlayerDefaults::default()).unwrap();

    // A check-in planned from the old read conflicts; a fresh one is a repeat.
    let plan = plan_check_in(&stale, "A", PlayerDefaults::default(), start_time()).unwrap();
    assert_eq!(
        SessionError::from(f.store.commit(&plan.changes).unwrap_err()),
        SessionError::StaleSelection
    );
    let (player, created) = f.service.check_in("A", PlayerDefaults::default()).unwrap();
    assert_eq!((player.id, created), (a, false));
    assert_eq!(f.state().main_queue, vec![a]);
    f.assert_invariants();
}

#[test]
fn player_summaries_list_roster_by_name() {
    let f = fixture(RotationStrategy::Recency);
    let ids = f.check_in_all(&["bob", "Alice", "Carl"]);
    f.service.check_out(ids[2]).unwrap();

    let rows = player_summaries(&f.state());
    let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Alice", "bob", "Carl"]);
    assert!(rows[0].present && rows[1].present);
    assert!(!rows[2].present);
}
