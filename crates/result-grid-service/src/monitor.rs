// crates/result-grid-service/src/monitor.rs
// ============================================================================
// Module: Heap Watchdog
// Description: Periodic resident-set sampling with a fatal ceiling.
// Purpose: Fail fast on memory exhaustion; the supervisor restarts us.
// Dependencies: tokio, tracing
// ============================================================================

//! ## Overview
//! Copy-on-write ingest transiently doubles the index footprint, so the
//! ceiling must be set with 2× headroom. The watchdog samples resident-set
//! size from `/proc/self/status` and terminates the process the moment the
//! ceiling is crossed; failing fast beats thrashing under an allocator
//! that can no longer keep up.

use std::fs;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;

// ============================================================================
// SECTION: Watchdog
// ============================================================================

/// Spawns the heap watchdog loop.
pub fn spawn_heap_watchdog(ceiling_bytes: u64, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match resident_bytes() {
                Some(resident) if resident > ceiling_bytes => {
                    error!(resident, ceiling = ceiling_bytes, "heap ceiling exceeded, exiting");
                    std::process::exit(1);
                }
                Some(resident) => {
                    debug!(resident, ceiling = ceiling_bytes, "heap watchdog sample ok");
                }
                None => {
                    debug!("heap watchdog sample unavailable on this platform");
                }
            }
            tokio::time::sleep(interval).await;
        }
    })
}

/// Reads the process resident-set size in bytes, when the platform exposes
/// it (`VmRSS` in `/proc/self/status`, reported in kB).
#[must_use]
pub fn resident_bytes() -> Option<u64> {
    let status = fs::read_to_string("/proc/self/status").ok()?;
    let line = status.lines().find(|line| line.starts_with("VmRSS:"))?;
    let kilobytes: u64 = line.split_whitespace().nth(1)?.parse().ok()?;
    kilobytes.checked_mul(1024)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
