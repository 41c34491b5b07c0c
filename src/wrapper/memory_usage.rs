use log::{debug, warn};
use sysinfo::{ProcessesToUpdate, System};

use crate::{
    core::{
        job::JobContext,
        wrapper::{Next, Wrapper},
    },
    error::{WorkerError, WorkerResult},
};

/// Reports the memory used by the current process.
pub trait MemoryProbe {
    /// Resident memory in megabytes.
    fn current_mb(&self) -> WorkerResult<f64>;
}

/// [`MemoryProbe`] backed by `sysinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoProbe;

impl MemoryProbe for SysinfoProbe {
    fn current_mb(&self) -> WorkerResult<f64> {
        let pid = sysinfo::get_current_pid().map_err(|error| WorkerError::Run(error.to_string()))?;
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
        let process = sys
            .process(pid)
            .ok_or_else(|| WorkerError::Run(format!("Process {pid} not found")))?;

        Ok(process.memory() as f64 / 1024.0 / 1024.0)
    }
}

/// Stores the memory difference around the inner chain in
/// `meta["memory_usage"]` (MB, two decimals, may be negative), whether the
/// chain succeeds or fails.
pub struct MemoryUsageWrapper<P = SysinfoProbe> {
    probe: P,
}

impl Default for MemoryUsageWrapper {
    fn default() -> Self {
        Self::new(SysinfoProbe)
    }
}

impl<P: MemoryProbe> MemoryUsageWrapper<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl<'a, P: MemoryProbe> Wrapper<JobContext<'a>> for MemoryUsageWrapper<P> {
    fn name(&self) -> &str {
        "memory_usage"
    }

    fn around(&self, ctx: &mut JobContext<'a>, next: Next<'_, JobContext<'a>>) -> WorkerResult<()> {
        let start = self.probe.current_mb();
        let result = next.run(ctx);

        match (start, self.probe.current_mb()) {
            (Ok(start), Ok(end)) => {
                let used = round2(end - start);
                debug!(target: ctx.log_target(), "Memory usage: {} MB", used);
                ctx.set_meta("memory_usage", used);
            }
            (Err(error), _) | (_, Err(error)) => {
                warn!(target: ctx.log_target(), "Memory usage not available: {}", error);
            }
        }

        result
    }
}
