// NETCAS -- ADAPTIVE REQUEST SPLITTER FOR A BLOCK-LEVEL CACHE LAYER
//
// WHEN A READ HITS THE CACHE, SERVING IT LOCALLY IS NOT ALWAYS OPTIMAL:
// IF NEITHER THE CACHE DEVICE NOR THE RDMA BACKEND SATURATES DEMAND ON
// ITS OWN, SPLITTING HITS ACROSS BOTH MAXIMIZES COMBINED THROUGHPUT.
//
// THE CORE MAINTAINS A 0..10000 SPLIT RATIO FROM AN OFFLINE BANDWIDTH
// PROFILE AND LIVE RDMA/IOPS OBSERVATIONS, AND ENFORCES IT PER REQUEST
// WITH A PATTERN+QUOTA SCHEDULER. THE EMBEDDING CACHE ENGINE CALLS
// on_tick ON A THROTTLED CADENCE AND should_send_to_backend PER REQUEST.

pub mod dispatch;
pub mod monitor;
pub mod profile;
pub mod splitter;
pub mod telemetry;
pub mod tuning;
pub mod window;

pub use splitter::Splitter;
pub use tuning::{Config, Mode};
