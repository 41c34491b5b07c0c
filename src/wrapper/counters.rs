use crate::{
    core::{
        job::JobContext,
        wrapper::{Next, Wrapper},
    },
    error::WorkerResult,
};

/// Resets the declared counters in `meta` to `0` before the inner chain runs.
///
/// Counters are read and updated from `run` through
/// [`JobContext::counter`] and [`JobContext::increment_counter`].
#[derive(Debug, Clone, Default)]
pub struct CountersWrapper {
    names: Vec<String>,
}

impl CountersWrapper {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl<'a> Wrapper<JobContext<'a>> for CountersWrapper {
    fn name(&self) -> &str {
        "counters"
    }

    fn around(&self, ctx: &mut JobContext<'a>, next: Next<'_, JobContext<'a>>) -> WorkerResult<()> {
        for name in &self.names {
            ctx.set_counter(name, 0);
        }
        next.run(ctx)
    }
}
