use std::time::Instant;

use log::info;

use crate::{
    core::{
        job::JobContext,
        wrapper::{Next, Wrapper},
    },
    error::WorkerResult,
};

/// Stores the wall-clock duration of the inner chain in `meta["duration"]`
/// (seconds), whether it succeeds or fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct BenchmarkWrapper;

impl<'a> Wrapper<JobContext<'a>> for BenchmarkWrapper {
    fn name(&self) -> &str {
        "benchmark"
    }

    fn around(&self, ctx: &mut JobContext<'a>, next: Next<'_, JobContext<'a>>) -> WorkerResult<()> {
        let start = Instant::now();
        let result = next.run(ctx);
        let duration = start.elapsed().as_secs_f64();

        ctx.set_meta("duration", duration);
        info!(
            target: ctx.log_target(),
            "Model {} ran in {:.3}s", ctx.model().id, duration
        );

        result
    }
}
