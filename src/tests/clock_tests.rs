// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::clock::LogicalClock;

#[test]
fn test_observe_exceeds_local_and_remote() {
    let cases = [(0u64, 0u64), (0, 7), (7, 0), (5, 5), (100, 3), (3, 100)];
    for (local, remote) in cases {
        let mut clock = LogicalClock::starting_at(local);
        let after = clock.observe(remote);
        assert!(after > local, "observe({remote}) from {local} gave {after}");
        assert!(after > remote, "observe({remote}) from {local} gave {after}");
        assert_eq!(after, local.max(remote) + 1);
    }
}

#[test]
fn test_clock_never_decreases() {
    let mut clock = LogicalClock::new();
    let mut last = clock.current();
    // interleave sends and receipts of stale and fresh remote stamps
    for remote in [4u64, 1, 1, 9, 2, 30, 0] {
        let sent = clock.tick();
        assert!(sent > last);
        last = sent;
        let received = clock.observe(remote);
        assert!(received > last);
        last = received;
    }
}
