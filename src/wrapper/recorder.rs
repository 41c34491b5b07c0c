use log::{Level, warn};

use crate::{
    core::{
        job::JobContext,
        wrapper::{Next, Wrapper},
    },
    error::{WorkerError, WorkerResult},
};

/// Text of an error as recorded in logs and in the model's `information`.
pub fn error_to_text(error: &WorkerError) -> String {
    format!("Error: {} ({})", error, error.name())
}

/// Records failures of the inner chain on the model.
///
/// On error, `"ID <id> - Error"` and the error text go to the job log and to
/// `information`, the model is saved without validation and the error is
/// returned unchanged.
#[derive(Debug, Default, Clone, Copy)]
pub struct RecorderWrapper;

impl RecorderWrapper {
    fn record_fail(ctx: &mut JobContext<'_>, error: &WorkerError) {
        let id = ctx.model().id;
        ctx.record(Level::Info, &format!("ID {id} - Error"));
        ctx.record(Level::Error, &error_to_text(error));

        if let Err(save_error) = ctx.save() {
            warn!(
                target: ctx.log_target(),
                "Could not save model {} after failure: {}", id, save_error
            );
        }
    }
}

impl<'a> Wrapper<JobContext<'a>> for RecorderWrapper {
    fn name(&self) -> &str {
        "recorder"
    }

    fn around(&self, ctx: &mut JobContext<'a>, next: Next<'_, JobContext<'a>>) -> WorkerResult<()> {
        next.run(ctx).inspect_err(|error| Self::record_fail(ctx, error))
    }
}

/// Logs failures of the inner chain at `error` level and returns them.
#[cfg(feature = "logger")]
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggerWrapper;

#[cfg(feature = "logger")]
impl<'a> Wrapper<JobContext<'a>> for LoggerWrapper {
    fn name(&self) -> &str {
        "logger"
    }

    fn around(&self, ctx: &mut JobContext<'a>, next: Next<'_, JobContext<'a>>) -> WorkerResult<()> {
        next.run(ctx)
            .inspect_err(|error| ctx.add_log(Level::Error, &error_to_text(error)))
    }
}
