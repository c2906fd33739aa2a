// NETCAS SPLIT RATIO ESTIMATOR AND FACADE
// THE CONTROL LOOP: SAMPLE METRICS, PUSH THE RDMA WINDOW, STEP THE MODE
// MACHINE, APPLY THE PER-MODE RATIO POLICY, PUBLISH THE RATIO UNDER THE
// WRITER LOCK.
//
// TWO ACTORS SHARE A Splitter:
//   HOT PATH (MANY THREADS): should_send_to_backend PER REQUEST.
//     READS THE RATIO UNDER A READER LOCK AT WINDOW BOUNDARIES ONLY.
//   CONTROL PATH (ONE THREAD): on_tick EVERY ~100MS. SOLE RATIO WRITER.
//
// THE RATIO IS THE ONLY CROSS-PATH VALUE. DISPATCH ACCOUNTING SITS
// BEHIND ITS OWN SHORT MUTEX; ESTIMATOR STATE BEHIND ANOTHER. DECISIONS
// OBSERVE THE OLD OR THE NEW RATIO, NEVER A TORN VALUE.

use std::sync::{Mutex, RwLock};

use log::debug;

use crate::dispatch::DispatchState;
use crate::monitor::{Metrics, Monitor};
use crate::tuning::{find_best_split_ratio, Config, Mode, SPLIT_RATIO_MAX};
use crate::window::RdmaWindow;

// --- TICK SNAPSHOT FOR OBSERVABILITY ---

#[derive(Clone, Copy, Default, Debug)]
pub struct TickStats {
    pub ratio: u64,
    pub iops: u64,
    pub rdma_latency: u64,
    pub rdma_throughput: u64,
    pub rdma_average: u64,
    pub rdma_max_average: u64,
    pub drop_permille: u64,
}

// --- ESTIMATOR (CONTROL-PATH STATE) ---

struct Estimator {
    config: Config,
    monitor: Monitor,
    window: RdmaWindow,
    mode: Mode,
    // TICK TIME WHEN WARMUP BEGAN; 0 = NOT IN A WARMUP EPISODE
    warmup_started_at: u64,
    // IDLE HAS WRITTEN ITS 100%-CACHE DEFAULT FOR THIS EPISODE
    initialized: bool,
    // STABLE HAS COMPUTED ITS ONE RATIO FOR THIS EPISODE
    stable_calculated: bool,
    last_tick_ns: u64,
    last_metrics: Metrics,
    last_drop: u64,
}

impl Estimator {
    fn new(config: Config, monitor: Monitor) -> Self {
        Self {
            config,
            monitor,
            window: RdmaWindow::new(),
            mode: Mode::Idle,
            warmup_started_at: 0,
            initialized: false,
            stable_calculated: false,
            last_tick_ns: 0,
            last_metrics: Metrics::default(),
            last_drop: 0,
        }
    }

    fn reset(&mut self) {
        self.monitor.reset();
        self.window.reset();
        self.mode = Mode::Idle;
        self.warmup_started_at = 0;
        self.initialized = false;
        self.stable_calculated = false;
        self.last_tick_ns = 0;
        self.last_metrics = Metrics::default();
        self.last_drop = 0;
    }

    // MODE TRANSITIONS. INPUTS ARE THIS TICK'S READINGS; THE IDLE GATE
    // OUTRANKS EVERY OTHER TRANSITION.
    fn step_mode(&mut self, now_ns: u64, rdma_throughput: u64, iops: u64, drop_permille: u64) {
        let prev = self.mode;

        if rdma_throughput <= self.config.rdma_threshold && iops <= self.config.iops_threshold {
            // NO RDMA TRAFFIC AND NO IOPS: NOTHING TO SPLIT
            self.mode = Mode::Idle;
            self.warmup_started_at = 0;
        } else {
            match self.mode {
                Mode::Idle => {
                    // ACTIVITY RESUMED: RAMP UP BEFORE TRUSTING THE METRICS
                    self.mode = Mode::Warmup;
                    self.warmup_started_at = now_ns;
                    self.initialized = false;
                }
                Mode::Warmup => {
                    if now_ns.saturating_sub(self.warmup_started_at) >= self.config.warmup_period_ns {
                        self.mode = Mode::Stable;
                        self.stable_calculated = false;
                    }
                }
                Mode::Stable => {
                    if drop_permille > self.config.congestion_threshold {
                        self.mode = Mode::Congestion;
                        self.stable_calculated = true;
                    }
                }
                Mode::Congestion => {
                    if drop_permille < self.config.congestion_threshold {
                        self.mode = Mode::Stable;
                        self.stable_calculated = false;
                    }
                }
                // RESERVED: NO TRANSITION ENTERS OR LEAVES FAILURE YET
                Mode::Failure => {}
            }
        }

        if self.mode != prev {
            debug!(
                "mode {} -> {} (rdma={} iops={} drop={})",
                prev.label(),
                self.mode.label(),
                rdma_throughput,
                iops,
                drop_permille
            );
        }
    }

    // ONE ESTIMATOR STEP. RETURNS THE RATIO TO PUBLISH, IF IT CHANGED.
    fn update(&mut self, now_ns: u64, metrics: Metrics, current_ratio: u64) -> Option<u64> {
        self.window.push(metrics.rdma_throughput);
        let drop_permille = self.window.drop_permille();

        self.step_mode(now_ns, metrics.rdma_throughput, metrics.iops(), drop_permille);

        self.last_metrics = metrics;
        self.last_drop = drop_permille;

        match self.mode {
            Mode::Idle => {
                if !self.initialized {
                    self.initialized = true;
                    return Some(SPLIT_RATIO_MAX);
                }
                None
            }
            Mode::Warmup => {
                // RAMP-UP TRAFFIC IS NOT CONGESTION: DROP FORCED TO 0
                let new = find_best_split_ratio(self.config.io_depth, self.config.num_jobs, 0)?;
                if new != current_ratio {
                    Some(new)
                } else {
                    None
                }
            }
            Mode::Stable => {
                if self.stable_calculated {
                    return None;
                }
                let new = find_best_split_ratio(
                    self.config.io_depth,
                    self.config.num_jobs,
                    drop_permille,
                )?;
                self.stable_calculated = true;
                Some(new)
            }
            Mode::Congestion => {
                let new = find_best_split_ratio(
                    self.config.io_depth,
                    self.config.num_jobs,
                    drop_permille,
                )?;
                if new != current_ratio {
                    Some(new)
                } else {
                    None
                }
            }
            Mode::Failure => None,
        }
    }

    fn stats(&self, ratio: u64) -> TickStats {
        TickStats {
            ratio,
            iops: self.last_metrics.iops(),
            rdma_latency: self.last_metrics.rdma_latency,
            rdma_throughput: self.last_metrics.rdma_throughput,
            rdma_average: self.window.average(),
            rdma_max_average: self.window.max_average(),
            drop_permille: self.last_drop,
        }
    }
}

// --- SPLITTER FACADE ---

pub struct Splitter {
    ratio: RwLock<u64>,
    estimator: Mutex<Estimator>,
    dispatch: Mutex<DispatchState>,
}

impl Splitter {
    pub fn new(config: Config) -> Self {
        Self::with_monitor(config, Monitor::with_defaults())
    }

    pub fn with_monitor(config: Config, monitor: Monitor) -> Self {
        Self {
            ratio: RwLock::new(SPLIT_RATIO_MAX),
            estimator: Mutex::new(Estimator::new(config, monitor)),
            dispatch: Mutex::new(DispatchState::new()),
        }
    }

    // RESTORE THE EXACT POST-CONSTRUCTION STATE
    pub fn reset(&self) {
        self.estimator.lock().unwrap().reset();
        self.dispatch.lock().unwrap().reset();
        *self.ratio.write().unwrap() = SPLIT_RATIO_MAX;
    }

    // CONTROL-PATH TICK: SAMPLE THE METRIC SOURCES FOR THE ELAPSED
    // INTERVAL AND RUN ONE ESTIMATOR STEP.
    // A NON-ADVANCING CLOCK YIELDS NO RATE INFORMATION -- THE WHOLE TICK
    // IS SKIPPED RATHER THAN DOUBLE-COUNTING THE SAME SAMPLE.
    pub fn on_tick(&self, now_ns: u64) {
        let mut est = self.estimator.lock().unwrap();

        let elapsed_ms = if est.last_tick_ns == 0 {
            0
        } else {
            let e = now_ns.saturating_sub(est.last_tick_ns) / 1_000_000;
            if e == 0 {
                return;
            }
            e
        };
        est.last_tick_ns = now_ns;

        let metrics = est.monitor.sample(elapsed_ms);
        let current = *self.ratio.read().unwrap();
        if let Some(new) = est.update(now_ns, metrics, current) {
            *self.ratio.write().unwrap() = new;
        }
    }

    // ESTIMATOR STEP WITH CALLER-SUPPLIED METRICS. EMBEDDERS THAT
    // ALREADY HOLD THE COUNTERS (AND TESTS) ENTER HERE; on_tick REDUCES
    // TO THIS AFTER SAMPLING.
    pub fn on_metrics(&self, now_ns: u64, metrics: Metrics) {
        let mut est = self.estimator.lock().unwrap();
        est.last_tick_ns = now_ns;
        let current = *self.ratio.read().unwrap();
        if let Some(new) = est.update(now_ns, metrics, current) {
            *self.ratio.write().unwrap() = new;
        }
    }

    // HOT-PATH DECISION: true ROUTES THE REQUEST TO THE BACKEND.
    // O(1), NO ALLOCATION, NO I/O. THE ONLY BLOCKING IS THE DISPATCH
    // MUTEX AND (AT WINDOW BOUNDARIES) THE RATIO READER LOCK.
    pub fn should_send_to_backend(&self, miss: bool) -> bool {
        let mut dispatch = self.dispatch.lock().unwrap();
        dispatch.decide(miss, || *self.ratio.read().unwrap())
    }

    pub fn current_ratio(&self) -> u32 {
        *self.ratio.read().unwrap() as u32
    }

    pub fn mode(&self) -> Mode {
        self.estimator.lock().unwrap().mode
    }

    pub fn stats(&self) -> TickStats {
        let ratio = *self.ratio.read().unwrap();
        self.estimator.lock().unwrap().stats(ratio)
    }

    // WINDOW ACCOUNTING PASSTHROUGH: (TOTAL, CACHE, BACKEND) THIS WINDOW
    pub fn window_counts(&self) -> (u32, u32, u32) {
        self.dispatch.lock().unwrap().window_counts()
    }
}
