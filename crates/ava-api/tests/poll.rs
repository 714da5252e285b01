use std::time::Duration;

use ava_api::PollPolicy;
use ava_api::poll::MIN_INTERVAL;

#[test]
fn default_policy_backs_off_to_cap() {
    let delays: Vec<u128> = PollPolicy::default()
        .delays()
        .take(7)
        .map(|d| d.as_millis())
        .collect();
    assert_eq!(delays, vec![1000, 1500, 2250, 3375, 5062, 7593, 8000]);
}

#[test]
fn fixed_policy_never_changes() {
    let policy = PollPolicy::fixed(Duration::from_millis(250), Duration::from_secs(5));
    assert!(policy.delays().take(20).all(|d| d == Duration::from_millis(250)));
}

#[test]
fn multiplier_below_one_does_not_shrink_delays() {
    let policy = PollPolicy {
        initial_interval: Duration::from_millis(100),
        max_interval: Duration::from_secs(1),
        multiplier: 0.5,
        max_wait: Duration::from_secs(10),
    };
    assert!(policy.delays().take(5).all(|d| d == Duration::from_millis(100)));
}

#[test]
fn zero_intervals_are_raised_to_the_floor() {
    let policy = PollPolicy::fixed(Duration::ZERO, Duration::from_secs(1));
    assert!(policy.delays().take(5).all(|d| d == MIN_INTERVAL));

    let policy = PollPolicy {
        initial_interval: Duration::ZERO,
        max_interval: Duration::from_millis(40),
        multiplier: 2.0,
        max_wait: Duration::from_secs(1),
    };
    let delays: Vec<u128> = policy.delays().take(4).map(|d| d.as_millis()).collect();
    assert_eq!(delays, vec![10, 20, 40, 40]);
}
