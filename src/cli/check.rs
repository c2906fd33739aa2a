// NETCAS SOURCE CHECK
// VERIFIES EVERY METRIC SOURCE THE SPLITTER CONSUMES IS PRESENT AND
// PARSES. RUN BEFORE DEPLOYING ON A NEW HOST.

use std::fs;
use std::path::Path;

use anyhow::Result;

use netcas::monitor::{parse_combined_metrics, parse_stat_line};

fn check_counter_file(label: &str, path: &str) -> bool {
    match fs::read_to_string(path) {
        Ok(raw) => match raw.trim().parse::<u64>() {
            Ok(v) => {
                println!("  {:<28}OK ({})", label, v);
                true
            }
            Err(_) => {
                println!("  {:<28}UNPARSEABLE", label);
                false
            }
        },
        Err(_) => {
            println!("  {:<28}MISSING", label);
            false
        }
    }
}

pub fn run_check(
    rdma_latency: &str,
    rdma_throughput: &str,
    combined_metrics: &str,
    block_stat: &str,
) -> Result<()> {
    println!("NETCAS SOURCE CHECK");
    println!();

    println!("RDMA METRICS:");
    let split_ok = check_counter_file("latency", rdma_latency)
        & check_counter_file("throughput", rdma_throughput);

    let combined_ok = if Path::new(combined_metrics).exists() {
        match fs::read_to_string(combined_metrics) {
            Ok(raw) => match parse_combined_metrics(&raw) {
                Some((lat, tp)) => {
                    println!("  {:<28}OK (latency={}, throughput={})", "combined", lat, tp);
                    true
                }
                None => {
                    println!("  {:<28}UNPARSEABLE", "combined");
                    false
                }
            },
            Err(_) => {
                println!("  {:<28}UNREADABLE", "combined");
                false
            }
        }
    } else {
        println!("  {:<28}NOT FOUND (SPLIT FILES ONLY)", "combined");
        false
    };
    println!();

    println!("BLOCK DEVICE:");
    let stat_ok = match fs::read_to_string(block_stat) {
        Ok(raw) => match parse_stat_line(&raw) {
            Some((reads, writes)) => {
                println!("  {:<28}OK (reads={}, writes={})", "stat", reads, writes);
                true
            }
            None => {
                println!("  {:<28}UNPARSEABLE", "stat");
                false
            }
        },
        Err(_) => {
            println!("  {:<28}MISSING", "stat");
            false
        }
    };
    println!();

    // ONE WORKING RDMA SOURCE PLUS THE STAT LINE IS ENOUGH TO RUN
    if (split_ok || combined_ok) && stat_ok {
        println!("ALL SOURCES READY");
    } else {
        println!("SOME SOURCES UNAVAILABLE -- THE SPLITTER WILL READ THEM AS 0 (NO ACTIVITY)");
    }

    Ok(())
}
