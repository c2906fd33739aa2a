// NETCAS -- ADAPTIVE REQUEST SPLITTER
// SPLIT DECISIONS HAPPEN IN THE EMBEDDING CACHE ENGINE'S HOT PATH.
// THIS BINARY HANDLES: STANDALONE MONITORING, SOURCE CHECKS, PROFILE PROBES.

mod cli;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use netcas::monitor::{
    CacheIopsSource, DiskIopsSource, Monitor, RdmaSource, BLOCK_STAT_PATH, COMBINED_METRICS_PATH,
    RDMA_LATENCY_PATH, RDMA_THROUGHPUT_PATH,
};
use netcas::splitter::Splitter;
use netcas::telemetry::{now_ns, TickLog, TickSnapshot};
use netcas::tuning::Config;

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

#[derive(Parser)]
#[command(name = "netcas")]
#[command(about = "NETCAS -- ADAPTIVE CACHE/BACKEND REQUEST SPLITTER")]
struct Cli {
    #[command(subcommand)]
    command: Option<SubCmd>,
}

#[derive(Subcommand)]
enum SubCmd {
    /// Run the estimator against live metric sources, one line per tick
    Run(RunArgs),

    /// Check that every metric source is present and parseable
    Check(SourceArgs),

    /// Sweep the bandwidth profile at a workload fingerprint
    Probe(ProbeArgs),
}

#[derive(Parser)]
struct RunArgs {
    /// Estimator tick interval
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Stop after this many seconds (0 = until ctrl-c)
    #[arg(long, default_value_t = 0)]
    duration_secs: u64,

    /// Dump the full tick log on exit
    #[arg(long)]
    dump_log: bool,

    #[arg(long, default_value_t = netcas::tuning::IO_DEPTH)]
    io_depth: u64,

    #[arg(long, default_value_t = netcas::tuning::NUM_JOBS)]
    num_jobs: u64,

    #[command(flatten)]
    sources: SourceArgs,
}

#[derive(Parser)]
struct SourceArgs {
    /// RDMA latency file (single-line integer, nanoseconds)
    #[arg(long, default_value = RDMA_LATENCY_PATH)]
    rdma_latency: String,

    /// RDMA throughput file (single-line integer)
    #[arg(long, default_value = RDMA_THROUGHPUT_PATH)]
    rdma_throughput: String,

    /// Combined metrics file; when set, used instead of the split files
    #[arg(long)]
    combined_metrics: Option<String>,

    /// Block device stat line
    #[arg(long, default_value = BLOCK_STAT_PATH)]
    block_stat: String,
}

impl SourceArgs {
    fn rdma_source(&self) -> RdmaSource {
        match &self.combined_metrics {
            Some(path) => RdmaSource::Combined { path: path.into() },
            None => RdmaSource::SplitFiles {
                latency: self.rdma_latency.as_str().into(),
                throughput: self.rdma_throughput.as_str().into(),
            },
        }
    }
}

#[derive(Parser)]
struct ProbeArgs {
    #[arg(long, default_value_t = netcas::tuning::IO_DEPTH)]
    io_depth: u64,

    #[arg(long, default_value_t = netcas::tuning::NUM_JOBS)]
    num_jobs: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        None => run_monitor(RunArgs::parse_from(["netcas"])),
        Some(SubCmd::Run(args)) => run_monitor(args),
        Some(SubCmd::Check(args)) => cli::check::run_check(
            &args.rdma_latency,
            &args.rdma_throughput,
            args.combined_metrics.as_deref().unwrap_or(COMBINED_METRICS_PATH),
            &args.block_stat,
        ),
        Some(SubCmd::Probe(args)) => {
            cli::probe::run_probe(args.io_depth, args.num_jobs);
            Ok(())
        }
    }
}

fn run_monitor(args: RunArgs) -> Result<()> {
    ctrlc::set_handler(move || {
        SHUTDOWN.store(true, Ordering::Relaxed);
    })?;

    let config = Config {
        io_depth: args.io_depth,
        num_jobs: args.num_jobs,
        ..Config::default()
    };

    // STANDALONE MODE HAS NO CACHE ENGINE ATTACHED: THE CACHE-SIDE IOPS
    // SOURCE READS 0 AND ACTIVITY DETECTION RIDES ON THE DISK STAT LINE
    let monitor = Monitor::new(
        args.sources.rdma_source(),
        CacheIopsSource::new(None),
        DiskIopsSource::new(args.sources.block_stat.as_str()),
    );
    let splitter = Splitter::with_monitor(config, monitor);
    let mut log = TickLog::new();

    println!("NETCAS v0.4");
    println!("FINGERPRINT:     io_depth={} num_jobs={}", args.io_depth, args.num_jobs);
    println!("TICK INTERVAL:   {} ms", args.interval_ms);
    println!();
    println!("NETCAS IS ACTIVE (CTRL+C TO EXIT)");

    let deadline = if args.duration_secs > 0 {
        Some(now_ns() + args.duration_secs * 1_000_000_000)
    } else {
        None
    };

    while !SHUTDOWN.load(Ordering::Relaxed) {
        std::thread::sleep(Duration::from_millis(args.interval_ms));
        let now = now_ns();
        if let Some(d) = deadline {
            if now >= d {
                break;
            }
        }

        splitter.on_tick(now);
        let stats = splitter.stats();
        let mode = splitter.mode();

        println!(
            "mode: {:<8} ratio: {:>5} ({:>3}.{:02}%) iops: {:<8} rdma: {:<8} avg: {:<8} max: {:<8} drop: {:<4} lat: {}",
            mode.label(),
            stats.ratio,
            stats.ratio / 100,
            stats.ratio % 100,
            stats.iops,
            stats.rdma_throughput,
            stats.rdma_average,
            stats.rdma_max_average,
            stats.drop_permille,
            stats.rdma_latency,
        );

        log.record(TickSnapshot {
            ts_ns: now,
            mode,
            ratio: stats.ratio,
            iops: stats.iops,
            rdma_throughput: stats.rdma_throughput,
            rdma_average: stats.rdma_average,
            drop_permille: stats.drop_permille,
        });
    }

    println!("NETCAS IS SHUTTING DOWN");
    if args.dump_log {
        log.dump();
    }
    log.summary();
    println!("NETCAS OUT.");

    Ok(())
}
