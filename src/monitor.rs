// NETCAS METRIC SOURCES
// CONTROL-PATH INGESTION OF EXTERNALLY PUBLISHED COUNTERS:
//   RDMA LATENCY/THROUGHPUT FROM THE METRICS PRODUCER'S FILES,
//   CACHE-ENGINE READ COUNTERS FROM THE EMBEDDING ENGINE,
//   BLOCK-DEVICE READ/WRITE COUNTERS FROM THE OS STAT LINE.
//
// EVERY FAILURE (MISSING FILE, PARSE ERROR, ABSENT PROVIDER) DEGRADES TO 0.
// 0 IS INDISTINGUISHABLE FROM "NO ACTIVITY": THE ESTIMATOR TREATS BOTH
// THE SAME AND THE HOT PATH NEVER SEES AN ERROR.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use regex::Regex;

pub const RDMA_LATENCY_PATH: &str = "/sys/kernel/rdma_metrics/latency";
pub const RDMA_THROUGHPUT_PATH: &str = "/sys/kernel/rdma_metrics/throughput";
pub const COMBINED_METRICS_PATH: &str = "/proc/rdma_metrics/metrics";
pub const BLOCK_STAT_PATH: &str = "/sys/block/cas1-1/stat";

// CACHE COUNTERS ARE IN BLOCKS; ONE APPLICATION REQUEST SPANS THIS MANY
const REQUEST_BLOCK_SIZE: u64 = 64;

// --- SAMPLED METRICS ---

#[derive(Clone, Copy, Default, Debug)]
pub struct Metrics {
    pub rdma_latency: u64,
    pub rdma_throughput: u64,
    pub cache_iops: u64,
    pub disk_iops: u64,
}

impl Metrics {
    // ACTIVITY SIGNAL FOR THE MODE MACHINE: EITHER SOURCE SEEING
    // TRAFFIC COUNTS AS TRAFFIC
    pub fn iops(&self) -> u64 {
        self.cache_iops.max(self.disk_iops)
    }
}

// --- CACHE-ENGINE COUNTERS (COLLABORATOR SEAM) ---

#[derive(Clone, Copy, Default, Debug)]
pub struct CacheStats {
    pub cache_reads: u64,
    pub core_reads: u64,
}

// IMPLEMENTED BY THE EMBEDDING CACHE ENGINE. None MEANS THE STATS
// FACILITY IS UNAVAILABLE THIS TICK.
pub trait CacheStatsProvider: Send {
    fn read_cache_stats(&self) -> Option<CacheStats>;
}

pub struct CacheIopsSource {
    provider: Option<Box<dyn CacheStatsProvider>>,
    prev: CacheStats,
    initialized: bool,
}

impl CacheIopsSource {
    pub fn new(provider: Option<Box<dyn CacheStatsProvider>>) -> Self {
        Self {
            provider,
            prev: CacheStats::default(),
            initialized: false,
        }
    }

    // DELTA IN BLOCKS OVER THE INTERVAL, CONVERTED TO REQUESTS, PER MS.
    // FIRST OBSERVATION ONLY PRIMES THE SNAPSHOT AND RETURNS 0.
    pub fn observe(&mut self, elapsed_ms: u64) -> u64 {
        let stats = match self.provider.as_ref().and_then(|p| p.read_cache_stats()) {
            Some(s) => s,
            None => return 0,
        };

        if !self.initialized {
            self.prev = stats;
            self.initialized = true;
            return 0;
        }

        let delta = stats.core_reads.wrapping_sub(self.prev.core_reads)
            + stats.cache_reads.wrapping_sub(self.prev.cache_reads);
        self.prev = stats;

        if elapsed_ms == 0 {
            return 0;
        }
        (delta / REQUEST_BLOCK_SIZE) / elapsed_ms
    }

    pub fn reset(&mut self) {
        self.prev = CacheStats::default();
        self.initialized = false;
    }
}

// --- BLOCK-DEVICE STAT LINE ---

// FIELDS 0 AND 4 OF THE STAT LINE: CUMULATIVE COMPLETED READS AND WRITES
pub fn parse_stat_line(line: &str) -> Option<(u64, u64)> {
    let mut fields = line.split_whitespace();
    let reads = fields.next()?.parse().ok()?;
    let writes = fields.nth(3)?.parse().ok()?;
    Some((reads, writes))
}

pub struct DiskIopsSource {
    path: PathBuf,
    prev_reads: u64,
    prev_writes: u64,
    initialized: bool,
}

impl DiskIopsSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            prev_reads: 0,
            prev_writes: 0,
            initialized: false,
        }
    }

    pub fn observe(&mut self, elapsed_ms: u64) -> u64 {
        let raw = match fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) => {
                debug!("block stat read failed ({}): {}", self.path.display(), e);
                return 0;
            }
        };
        let (reads, writes) = match parse_stat_line(&raw) {
            Some(v) => v,
            None => {
                debug!("block stat parse failed ({})", self.path.display());
                return 0;
            }
        };

        if !self.initialized {
            self.prev_reads = reads;
            self.prev_writes = writes;
            self.initialized = true;
            return 0;
        }

        let delta_reads = reads.wrapping_sub(self.prev_reads);
        let delta_writes = writes.wrapping_sub(self.prev_writes);
        self.prev_reads = reads;
        self.prev_writes = writes;

        if elapsed_ms == 0 {
            return 0;
        }
        ((delta_reads + delta_writes) * 1000) / elapsed_ms
    }

    pub fn reset(&mut self) {
        self.prev_reads = 0;
        self.prev_writes = 0;
        self.initialized = false;
    }
}

// --- RDMA METRICS FILES ---

// THE PRODUCER PUBLISHES EITHER TWO SINGLE-LINE INTEGER FILES OR ONE
// COMBINED FILE IN "latency: <n>\nthroughput: <n>" FORM

pub fn parse_combined_metrics(raw: &str) -> Option<(u64, u64)> {
    let latency_re = Regex::new(r"latency:\s*(\d+)").unwrap();
    let throughput_re = Regex::new(r"throughput:\s*(\d+)").unwrap();
    let latency = latency_re.captures(raw)?.get(1)?.as_str().parse().ok()?;
    let throughput = throughput_re.captures(raw)?.get(1)?.as_str().parse().ok()?;
    Some((latency, throughput))
}

fn read_counter_file(path: &Path) -> u64 {
    match fs::read_to_string(path) {
        Ok(s) => s.trim().parse().unwrap_or_else(|_| {
            debug!("counter parse failed ({})", path.display());
            0
        }),
        Err(e) => {
            debug!("counter read failed ({}): {}", path.display(), e);
            0
        }
    }
}

pub enum RdmaSource {
    // latency FILE + throughput FILE, ONE INTEGER PER LINE
    SplitFiles {
        latency: PathBuf,
        throughput: PathBuf,
    },
    // SINGLE PROCFS FILE WITH BOTH VALUES
    Combined { path: PathBuf },
}

impl RdmaSource {
    pub fn split_files() -> Self {
        Self::SplitFiles {
            latency: RDMA_LATENCY_PATH.into(),
            throughput: RDMA_THROUGHPUT_PATH.into(),
        }
    }

    pub fn read(&self) -> (u64, u64) {
        match self {
            Self::SplitFiles { latency, throughput } => {
                (read_counter_file(latency), read_counter_file(throughput))
            }
            Self::Combined { path } => match fs::read_to_string(path) {
                Ok(raw) => parse_combined_metrics(&raw).unwrap_or_else(|| {
                    debug!("combined metrics parse failed ({})", path.display());
                    (0, 0)
                }),
                Err(e) => {
                    debug!("combined metrics read failed ({}): {}", path.display(), e);
                    (0, 0)
                }
            },
        }
    }
}

// --- MONITOR ---
// ONE SAMPLE PER ESTIMATOR TICK. FILE HANDLES LIVE ONLY WITHIN THE CALL.

pub struct Monitor {
    rdma: RdmaSource,
    cache: CacheIopsSource,
    disk: DiskIopsSource,
}

impl Monitor {
    pub fn new(rdma: RdmaSource, cache: CacheIopsSource, disk: DiskIopsSource) -> Self {
        Self { rdma, cache, disk }
    }

    pub fn with_defaults() -> Self {
        Self::new(
            RdmaSource::split_files(),
            CacheIopsSource::new(None),
            DiskIopsSource::new(BLOCK_STAT_PATH),
        )
    }

    pub fn sample(&mut self, elapsed_ms: u64) -> Metrics {
        let (rdma_latency, rdma_throughput) = self.rdma.read();
        Metrics {
            rdma_latency,
            rdma_throughput,
            cache_iops: self.cache.observe(elapsed_ms),
            disk_iops: self.disk.observe(elapsed_ms),
        }
    }

    pub fn reset(&mut self) {
        self.cache.reset();
        self.disk.reset();
    }
}
