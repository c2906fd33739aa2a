// NETCAS DISPATCH SCHEDULER
// PER-REQUEST CACHE-OR-BACKEND DECISION ENFORCING THE SPLIT RATIO.
//
// TWO ENFORCEMENT HORIZONS:
//   100-REQUEST WINDOW: QUOTAS AND EXPECTED-COUNT CORRECTION KEEP THE
//     WINDOW TOTAL WITHIN +-1 OF THE RATIO.
//   SHORT PATTERN (<=10): GCD-REDUCED RATIO INTERLEAVES THE TWO SIDES
//     INSTEAD OF BURSTING ONE SIDE THEN THE OTHER.
//
// THE RATIO IS SNAPSHOTTED ONCE PER WINDOW BOUNDARY; A RATIO CHANGE IS
// FULLY VISIBLE WITHIN AT MOST ONE WINDOW. EVERYTHING ELSE HERE IS
// PRIVATE HOT-PATH ACCOUNTING -- NO ALLOCATION, NO I/O, O(1) PER CALL.

pub const WINDOW_SIZE: u32 = 100;
pub const MAX_PATTERN_SIZE: u32 = 10;

fn gcd(a: u32, b: u32) -> u32 {
    if a == 0 || b == 0 {
        return 1;
    }
    let (mut a, mut b) = (a, b);
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

pub struct DispatchState {
    request_counter: u32,
    // SNAPSHOT OF THE RATIO FOR THE CURRENT WINDOW, IN PERCENT
    ratio_percent: u32,
    total_requests: u32,
    cache_requests: u32,
    backend_requests: u32,
    cache_quota: u32,
    backend_quota: u32,
    pattern_size: u32,
    pattern_cache: u32,
    pattern_backend: u32,
    pattern_position: u32,
    last_request_to_cache: bool,
}

impl DispatchState {
    pub fn new() -> Self {
        Self {
            request_counter: 0,
            ratio_percent: 0,
            total_requests: 0,
            cache_requests: 0,
            backend_requests: 0,
            cache_quota: 0,
            backend_quota: 0,
            pattern_size: 0,
            pattern_cache: 0,
            pattern_backend: 0,
            pattern_position: 0,
            last_request_to_cache: false,
        }
    }

    // REBUILD THE PATTERN AND RESET WINDOW ACCOUNTING FOR A NEW RATIO
    // SNAPSHOT. split_ratio IS ON THE 0..10000 SCALE.
    fn rebuild(&mut self, split_ratio: u64) {
        let a = (split_ratio / 100) as u32;
        let b = WINDOW_SIZE - a;

        if a == 0 || a == WINDOW_SIZE {
            // DEGENERATE SPLIT: SINGLE-SLOT PATTERN, ALL ONE SIDE
            self.pattern_size = 1;
            self.pattern_cache = a / WINDOW_SIZE;
        } else {
            let g = gcd(a, b);
            self.pattern_size = (WINDOW_SIZE / g).min(MAX_PATTERN_SIZE);
            self.pattern_cache = (a * self.pattern_size) / WINDOW_SIZE;
        }
        self.pattern_backend = self.pattern_size - self.pattern_cache;
        self.pattern_position = 0;

        self.ratio_percent = a;
        self.total_requests = 0;
        self.cache_requests = 0;
        self.backend_requests = 0;
        self.cache_quota = a;
        self.backend_quota = WINDOW_SIZE - a;
    }

    // ONE DISPATCH DECISION: true SENDS THE REQUEST TO THE BACKEND.
    // ratio_at_boundary IS ONLY INVOKED WHEN A NEW WINDOW OPENS -- THE
    // CALLER SUPPLIES THE READER-LOCKED RATIO SNAPSHOT THERE. MISSES GO
    // TO THE BACKEND UNCONDITIONALLY AND CONSUME NO QUOTA.
    pub fn decide(&mut self, miss: bool, ratio_at_boundary: impl FnOnce() -> u64) -> bool {
        if self.request_counter % WINDOW_SIZE == 0 || self.pattern_size == 0 {
            let snapshot = ratio_at_boundary();
            self.rebuild(snapshot);
        }

        self.request_counter = self.request_counter.wrapping_add(1);
        self.total_requests += 1;

        if miss {
            return true;
        }

        let expected_cache = (self.total_requests * self.ratio_percent) / WINDOW_SIZE;
        let expected_backend = self.total_requests - expected_cache;

        let send_to_backend = if self.cache_requests < expected_cache {
            false
        } else if self.backend_requests < expected_backend {
            true
        } else if self.pattern_position < self.pattern_size {
            let to_backend = self.pattern_position >= self.pattern_cache;
            self.pattern_position = (self.pattern_position + 1) % self.pattern_size;
            to_backend
        } else if self.cache_quota == 0 {
            true
        } else if self.backend_quota == 0 {
            false
        } else {
            // BOTH QUOTAS LEFT, PATTERN EXHAUSTED: ALTERNATE
            self.last_request_to_cache
        };

        if send_to_backend {
            self.backend_quota = self.backend_quota.saturating_sub(1);
            self.backend_requests += 1;
            self.last_request_to_cache = false;
        } else {
            self.cache_quota = self.cache_quota.saturating_sub(1);
            self.cache_requests += 1;
            self.last_request_to_cache = true;
        }

        send_to_backend
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    // WINDOW ACCOUNTING: (TOTAL, CACHE, BACKEND). CACHE + BACKEND CAN BE
    // SHORT OF TOTAL BY THE NUMBER OF MISSES SEEN THIS WINDOW.
    pub fn window_counts(&self) -> (u32, u32, u32) {
        (self.total_requests, self.cache_requests, self.backend_requests)
    }

    // CURRENT PATTERN: (SIZE, CACHE SLOTS, BACKEND SLOTS)
    pub fn pattern(&self) -> (u32, u32, u32) {
        (self.pattern_size, self.pattern_cache, self.pattern_backend)
    }
}

impl Default for DispatchState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gcd_reduction() {
        assert_eq!(gcd(50, 50), 50);
        assert_eq!(gcd(70, 30), 10);
        assert_eq!(gcd(99, 1), 1);
        assert_eq!(gcd(0, 100), 1); // DEGENERATE INPUT: TREATED AS COPRIME
    }

    #[test]
    fn pattern_for_even_split() {
        let mut d = DispatchState::new();
        d.decide(false, || 5000);
        assert_eq!(d.pattern(), (2, 1, 1));
    }

    #[test]
    fn pattern_for_seventy_thirty() {
        let mut d = DispatchState::new();
        d.decide(false, || 7000);
        // GCD(70,30)=10 -> SIZE 10, 7 CACHE SLOTS
        assert_eq!(d.pattern(), (10, 7, 3));
    }

    #[test]
    fn pattern_size_capped() {
        let mut d = DispatchState::new();
        d.decide(false, || 9900);
        // GCD(99,1)=1 -> 100 SLOTS, CAPPED AT 10
        let (size, cache, backend) = d.pattern();
        assert_eq!(size, MAX_PATTERN_SIZE);
        assert_eq!(cache, 9);
        assert_eq!(backend, 1);
    }

    #[test]
    fn pattern_for_full_cache() {
        let mut d = DispatchState::new();
        d.decide(false, || 10000);
        assert_eq!(d.pattern(), (1, 1, 0));

        let mut d = DispatchState::new();
        d.decide(false, || 0);
        assert_eq!(d.pattern(), (1, 0, 1));
    }
}
