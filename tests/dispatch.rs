// NETCAS DISPATCH SCHEDULER TESTS
// WINDOW CLOSURE, MISS TRANSPARENCY, PATTERN INTERLEAVING, RATIO CHANGES.
//
// DRIVES DispatchState DIRECTLY AND THROUGH THE Splitter FACADE.
// THE RATIO IS HELD FIXED PER WINDOW UNLESS A TEST SAYS OTHERWISE.

use netcas::dispatch::{DispatchState, WINDOW_SIZE};
use netcas::splitter::Splitter;
use netcas::tuning::Config;

// RUN ONE FULL WINDOW OF HITS AT A HELD RATIO; RETURNS (CACHE, BACKEND)
// AND THE DECISION TRACE (true = BACKEND)
fn run_window(ratio: u64) -> (u32, u32, Vec<bool>) {
    let mut d = DispatchState::new();
    let mut trace = Vec::new();
    for _ in 0..WINDOW_SIZE {
        trace.push(d.decide(false, || ratio));
    }
    let (total, cache, backend) = d.window_counts();
    assert_eq!(total, WINDOW_SIZE);
    (cache, backend, trace)
}

// === WINDOW CLOSURE ===

#[test]
fn even_split_is_exact() {
    let (cache, backend, trace) = run_window(5000);
    assert_eq!(cache, 50);
    assert_eq!(backend, 50);

    // INTERLEAVED, NOT BURSTED: NO THREE CONSECUTIVE SAME-SIDE DECISIONS
    for w in trace.windows(3) {
        assert!(!(w[0] == w[1] && w[1] == w[2]));
    }
}

#[test]
fn seventy_thirty_is_exact() {
    let (cache, backend, _) = run_window(7000);
    assert_eq!(cache, 70);
    assert_eq!(backend, 30);
}

#[test]
fn window_closes_within_one_at_every_ratio() {
    for pct in 0..=100u32 {
        let (cache, backend, _) = run_window(pct as u64 * 100);
        assert_eq!(cache + backend, WINDOW_SIZE);
        let diff = cache.abs_diff(pct);
        assert!(diff <= 1, "ratio {}%: cache {} backend {}", pct, cache, backend);
    }
}

#[test]
fn degenerate_ratios_send_everything_one_way() {
    let (cache, backend, _) = run_window(10000);
    assert_eq!((cache, backend), (100, 0));

    let (cache, backend, _) = run_window(0);
    assert_eq!((cache, backend), (0, 100));
}

#[test]
fn interleaving_holds_across_windows() {
    // THREE BACK-TO-BACK WINDOWS AT THE SAME RATIO BEHAVE IDENTICALLY
    let mut d = DispatchState::new();
    for _ in 0..3 {
        for _ in 0..WINDOW_SIZE {
            d.decide(false, || 5000);
        }
        let (total, cache, backend) = d.window_counts();
        assert_eq!((total, cache, backend), (100, 50, 50));
    }
}

// === MISS TRANSPARENCY ===

#[test]
fn miss_always_goes_to_backend() {
    // EVEN AT 100% CACHE, A MISS IS A BACKEND REQUEST
    let mut d = DispatchState::new();
    for _ in 0..10 {
        assert!(d.decide(true, || 10000));
    }
    // MISSES ADVANCE THE WINDOW TOTAL BUT CONSUME NO SIDE COUNTS
    assert_eq!(d.window_counts(), (10, 0, 0));
}

#[test]
fn misses_do_not_consume_hit_quota() {
    // 100 REQUESTS AT 70%, EVERY 5TH A MISS (20 MISSES TOTAL).
    // ALL MISSES GO BACKEND. THE 80 HITS STILL TRACK THE EXPECTED CACHE
    // COUNT OF THE FULL WINDOW (70): THE BACKEND SIDE ABSORBS THE
    // SHORTFALL LEFT BY THE MISSES.
    let mut d = DispatchState::new();
    let mut miss_backend = 0;
    for i in 0..WINDOW_SIZE {
        let miss = i % 5 == 4;
        let to_backend = d.decide(miss, || 7000);
        if miss {
            assert!(to_backend);
            miss_backend += 1;
        }
    }
    assert_eq!(miss_backend, 20);

    let (total, cache, backend) = d.window_counts();
    assert_eq!(total, 100);
    assert_eq!(cache + backend, 80);
    // CACHE TRACKS floor(TOTAL * 70%) OF THE WHOLE WINDOW WITHIN 1
    assert!(cache.abs_diff(70) <= 1, "cache {} backend {}", cache, backend);
}

#[test]
fn all_miss_window_never_panics() {
    let mut d = DispatchState::new();
    for _ in 0..(3 * WINDOW_SIZE) {
        assert!(d.decide(true, || 5000));
    }
}

// === RATIO CHANGES AT WINDOW BOUNDARIES ===

#[test]
fn ratio_snapshot_holds_for_a_full_window() {
    // THE RATIO SOURCE FLIPS MID-WINDOW; THE WINDOW IN FLIGHT KEEPS ITS
    // SNAPSHOT AND THE NEXT WINDOW PICKS UP THE NEW VALUE
    let mut d = DispatchState::new();
    let calls = std::cell::Cell::new(0u32);

    for _ in 0..WINDOW_SIZE {
        d.decide(false, || {
            calls.set(calls.get() + 1);
            10000
        });
    }
    assert_eq!(calls.get(), 1); // ONE SNAPSHOT PER WINDOW
    let (_, cache, _) = d.window_counts();
    assert_eq!(cache, 100);

    for _ in 0..WINDOW_SIZE {
        d.decide(false, || {
            calls.set(calls.get() + 1);
            0
        });
    }
    assert_eq!(calls.get(), 2);
    let (_, cache, backend) = d.window_counts();
    assert_eq!((cache, backend), (0, 100));
}

#[test]
fn reset_clears_window_accounting() {
    let mut d = DispatchState::new();
    for _ in 0..42 {
        d.decide(false, || 5000);
    }
    d.reset();
    assert_eq!(d.window_counts(), (0, 0, 0));
    assert_eq!(d.pattern(), (0, 0, 0));

    // NEXT DECISION OPENS A FRESH WINDOW
    d.decide(false, || 5000);
    assert_eq!(d.window_counts(), (1, 0, 1));
}

// === THROUGH THE FACADE ===

#[test]
fn facade_enforces_current_ratio() {
    let s = Splitter::new(Config::default());
    // BOOT RATIO IS 100% CACHE: A WINDOW OF HITS ALL STAYS LOCAL
    let mut backend = 0;
    for _ in 0..WINDOW_SIZE {
        if s.should_send_to_backend(false) {
            backend += 1;
        }
    }
    assert_eq!(backend, 0);

    // MISSES PASS STRAIGHT THROUGH REGARDLESS
    assert!(s.should_send_to_backend(true));
}
