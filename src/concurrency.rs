/*!
 * Host-derived concurrency limits.
 *
 * Slicing is bounded by the number of CPU cores minus a reserve so the machine
 * stays responsive; still rendering uses a small fixed worker count.
 */

use std::thread;

use crate::app_config::{CrossfadeConfig, SlicerConfig};

/// Parallel slices per usable core
const SLICE_MULTIPLIER: usize = 2;

/// Upper bound on concurrent slicing processes
const MAX_SLICE_WORKERS: usize = 16;

/// Worker limits for one synchronization run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyProfile {
    /// Maximum concurrent slice invocations
    pub slice_workers: usize,
    /// Maximum concurrent still renders
    pub render_workers: usize,
}

impl ConcurrencyProfile {
    /// Profile for the current host
    pub fn detect(slicer: &SlicerConfig, crossfade: &CrossfadeConfig) -> Self {
        let cores = thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self::for_cores(cores, slicer, crossfade)
    }

    /// Profile for a host with `cores` logical cores
    pub fn for_cores(cores: usize, slicer: &SlicerConfig, crossfade: &CrossfadeConfig) -> Self {
        let usable = cores.saturating_sub(slicer.reserved_cores).max(1);
        let derived = (usable * SLICE_MULTIPLIER).min(MAX_SLICE_WORKERS);

        Self {
            slice_workers: slicer.concurrent_slices.unwrap_or(derived).clamp(1, MAX_SLICE_WORKERS),
            render_workers: crossfade.render_workers.max(1),
        }
    }
}
