// NETCAS TICK LOG
// RECORDS ONE SNAPSHOT PER ESTIMATOR TICK DURING A RUN.
// PRE-ALLOCATED RING BUFFER. NO HEAP ALLOCATION WHILE RECORDING.
// WRAPS AROUND AT CAPACITY -- OLDEST ENTRIES OVERWRITTEN.

use crate::tuning::Mode;

const MAX_SNAPSHOTS: usize = 8192;

#[derive(Clone, Copy)]
pub struct TickSnapshot {
    pub ts_ns: u64,
    pub mode: Mode,
    pub ratio: u64,
    pub iops: u64,
    pub rdma_throughput: u64,
    pub rdma_average: u64,
    pub drop_permille: u64,
}

pub struct TickLog {
    snapshots: Vec<TickSnapshot>,
    head: usize,
    len: usize,
}

impl TickLog {
    pub fn new() -> Self {
        Self {
            snapshots: vec![
                TickSnapshot {
                    ts_ns: 0,
                    mode: Mode::Idle,
                    ratio: 0,
                    iops: 0,
                    rdma_throughput: 0,
                    rdma_average: 0,
                    drop_permille: 0,
                };
                MAX_SNAPSHOTS
            ],
            head: 0,
            len: 0,
        }
    }

    // RECORD ONE TICK. OVERWRITES THE OLDEST ENTRY WHEN FULL.
    pub fn record(&mut self, snap: TickSnapshot) {
        self.snapshots[self.head] = snap;
        self.head = (self.head + 1) % MAX_SNAPSHOTS;
        if self.len < MAX_SNAPSHOTS {
            self.len += 1;
        }
    }

    fn iter_chronological(&self) -> impl Iterator<Item = &TickSnapshot> {
        let start = if self.len < MAX_SNAPSHOTS { 0 } else { self.head };
        (0..self.len).map(move |i| &self.snapshots[(start + i) % MAX_SNAPSHOTS])
    }

    // DUMP THE TIME SERIES AFTER A RUN
    pub fn dump(&self) {
        if self.len == 0 {
            return;
        }

        let mut iter = self.iter_chronological();
        let first = iter.next().unwrap();
        let base_ts = first.ts_ns;

        println!(
            "\n{:<10} {:<8} {:<7} {:<10} {:<10} {:<10} {:<6}",
            "TIME_S", "MODE", "RATIO", "IOPS", "RDMA", "RDMA_AVG", "DROP"
        );
        println!("{}", "-".repeat(66));

        println!(
            "{:<10.1} {:<8} {:<7} {:<10} {:<10} {:<10} {:<6}",
            0.0, first.mode.label(), first.ratio, first.iops,
            first.rdma_throughput, first.rdma_average, first.drop_permille,
        );

        for s in iter {
            let elapsed_s = (s.ts_ns - base_ts) as f64 / 1_000_000_000.0;
            println!(
                "{:<10.1} {:<8} {:<7} {:<10} {:<10} {:<10} {:<6}",
                elapsed_s, s.mode.label(), s.ratio, s.iops,
                s.rdma_throughput, s.rdma_average, s.drop_permille,
            );
        }

        if self.len == MAX_SNAPSHOTS {
            println!("\n(RING BUFFER WRAPPED -- SHOWING MOST RECENT {} TICKS)", MAX_SNAPSHOTS);
        }
        println!("TOTAL TICKS: {}", self.len);
    }

    // SUMMARY STATISTICS
    pub fn summary(&self) {
        if self.len == 0 {
            return;
        }

        let snapshots: Vec<&TickSnapshot> = self.iter_chronological().collect();

        let mut idle = 0u64;
        let mut warmup = 0u64;
        let mut stable = 0u64;
        let mut congestion = 0u64;
        let mut failure = 0u64;
        for s in &snapshots {
            match s.mode {
                Mode::Idle => idle += 1,
                Mode::Warmup => warmup += 1,
                Mode::Stable => stable += 1,
                Mode::Congestion => congestion += 1,
                Mode::Failure => failure += 1,
            }
        }

        let peak_iops = snapshots.iter().map(|s| s.iops).max().unwrap_or(0);
        let peak_drop = snapshots.iter().map(|s| s.drop_permille).max().unwrap_or(0);
        let last = snapshots.last().unwrap();
        let elapsed_ns = last.ts_ns - snapshots.first().unwrap().ts_ns;

        println!("\n{}", "=".repeat(50));
        println!("NETCAS SUMMARY");
        println!("{}", "=".repeat(50));
        println!("  FINAL MODE:        {}", last.mode.label());
        println!(
            "  FINAL RATIO:       {}.{:02}%",
            last.ratio / 100,
            last.ratio % 100
        );
        println!("  PEAK IOPS:         {}", peak_iops);
        println!("  PEAK DROP:         {}", peak_drop);
        println!(
            "  TICKS:             IDLE:{} WARMUP:{} STABLE:{} CONGEST:{} FAILURE:{}",
            idle, warmup, stable, congestion, failure
        );
        println!("  ELAPSED:           {:.1}s", elapsed_ns as f64 / 1_000_000_000.0);
        println!("  SAMPLES:           {}", self.len);
    }
}

impl Default for TickLog {
    fn default() -> Self {
        Self::new()
    }
}

pub fn now_ns() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    unsafe {
        libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts);
    }
    (ts.tv_sec as u64) * 1_000_000_000 + (ts.tv_nsec as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(ts_ns: u64, ratio: u64) -> TickSnapshot {
        TickSnapshot {
            ts_ns,
            mode: Mode::Stable,
            ratio,
            iops: 0,
            rdma_throughput: 0,
            rdma_average: 0,
            drop_permille: 0,
        }
    }

    #[test]
    fn record_counts() {
        let mut log = TickLog::new();
        log.record(snap(1, 10000));
        log.record(snap(2, 6909));
        assert_eq!(log.len, 2);
        assert_eq!(log.snapshots[1].ratio, 6909);
    }

    #[test]
    fn ring_buffer_wraps() {
        let mut log = TickLog::new();
        for i in 0..MAX_SNAPSHOTS {
            log.record(snap(i as u64, 0));
        }
        assert_eq!(log.len, MAX_SNAPSHOTS);
        assert_eq!(log.head, 0);

        log.record(snap(999_999, 0));
        assert_eq!(log.len, MAX_SNAPSHOTS);
        assert_eq!(log.head, 1);

        let ordered: Vec<u64> = log.iter_chronological().map(|s| s.ts_ns).collect();
        assert_eq!(ordered[0], 1); // OLDEST SURVIVING ENTRY
        assert_eq!(*ordered.last().unwrap(), 999_999);
    }

    #[test]
    fn dump_and_summary_no_panic() {
        let log = TickLog::new();
        log.dump();
        log.summary();

        let mut log = TickLog::new();
        log.record(snap(1_000_000, 10000));
        log.dump();
        log.summary();
    }

    #[test]
    fn clock_is_monotonic() {
        let a = now_ns();
        let b = now_ns();
        assert!(b >= a);
    }
}
