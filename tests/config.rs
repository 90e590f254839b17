//! Integration tests for environment configuration.

use badminton_club_web::config::{parse_strategy, Config};
use badminton_club_web::models::DEFAULT_COURTS;
use badminton_club_web::{ChooserTieBreak, RotationStrategy};
use std::time::Duration;

#[test]
fn rotation_names_parse() {
    assert_eq!(parse_strategy("recency", None), Some(RotationStrategy::Recency));
    assert_eq!(
        parse_strategy(" Winner-Chooses ", Some("first-winner")),
        Some(RotationStrategy::WinnerChooses {
            tie_break: ChooserTieBreak::FirstWinner
        })
    );
    assert_eq!(
        parse_strategy("winner-chooses", None),
        Some(RotationStrategy::WinnerChooses {
            tie_break: ChooserTieBreak::ActingOperator
        })
    );
    assert_eq!(parse_strategy("random", None), None);
    assert_eq!(parse_strategy("recency", Some("coin")), None);
}

// The only test in this binary that touches the process environment.
#[test]
fn zero_values_fall_back_to_defaults() {
    std::env::set_var("COURTS", "0");
    std::env::set_var("SNAPSHOT_INTERVAL_SECS", "0");
    let config = Config::from_env();
    assert_eq!(config.courts, DEFAULT_COURTS);
    assert_eq!(config.snapshot_interval, Config::default().snapshot_interval);
    assert!(config.snapshot_interval > Duration::ZERO);

    std::env::set_var("SNAPSHOT_INTERVAL_SECS", "5");
    assert_eq!(Config::from_env().snapshot_interval, Duration::from_secs(5));
    std::env::remove_var("COURTS");
    std::env::remove_var("SNAPSHOT_INTERVAL_SECS");
}
