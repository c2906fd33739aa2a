// NETCAS PROFILE PROBE
// OFFLINE SWEEP OF THE BANDWIDTH TABLE AT ONE WORKLOAD FINGERPRINT:
// PER-SPLIT MEASURED BANDWIDTH, THE TABLE'S BEST SPLIT, AND THE RATIO
// THE ESTIMATOR WOULD PICK. STDOUT ONLY, NO SOURCES TOUCHED.

use netcas::profile::{combined_iops, lookup_bandwidth};
use netcas::tuning::find_best_split_ratio;

pub fn run_probe(io_depth: u64, num_jobs: u64) {
    println!("NETCAS PROFILE PROBE (io_depth={}, num_jobs={})", io_depth, num_jobs);
    println!();
    println!("{:<12} {:>12}", "SPLIT", "BANDWIDTH");
    println!("{}", "-".repeat(25));

    let mut best_split = 0u64;
    let mut best_bandwidth = 0u32;
    let mut split = 0u64;
    while split <= 100 {
        let bandwidth = lookup_bandwidth(io_depth, num_jobs, split);
        println!("{:>3}:{:<8} {:>12}", split, 100 - split, bandwidth);
        if bandwidth > best_bandwidth {
            best_bandwidth = bandwidth;
            best_split = split;
        }
        split += 5;
    }

    println!("{}", "-".repeat(25));
    println!(
        "BEST MEASURED SPLIT: {}:{} (BANDWIDTH {})",
        best_split,
        100 - best_split,
        best_bandwidth
    );

    let cache_only = lookup_bandwidth(io_depth, num_jobs, 100) as u64;
    let backend_only = lookup_bandwidth(io_depth, num_jobs, 0) as u64;
    match find_best_split_ratio(io_depth, num_jobs, 0) {
        Some(ratio) => {
            println!(
                "ESTIMATOR RATIO:     {}.{:02}% CACHE (A={}, B={})",
                ratio / 100,
                ratio % 100,
                cache_only,
                backend_only
            );
            // MODEL CHECK: AGGREGATE IOPS IF BOTH DEVICES RAN AT THE
            // ESTIMATOR'S SPLIT VS THE TABLE'S BEST SPLIT
            let at_ratio = combined_iops(cache_only, backend_only, ratio / 100);
            let at_best = combined_iops(cache_only, backend_only, best_split);
            println!("COMBINED MODEL:      {} AT ESTIMATOR SPLIT, {} AT BEST SPLIT", at_ratio, at_best);
        }
        None => println!("ESTIMATOR RATIO:     NO PROFILE DATA FOR THIS FINGERPRINT"),
    }
}
