use std::time::{Duration, Instant};

use log::{Level, error, info, log, warn};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{ErrorKind, WorkerError, WorkerResult};

use super::{
    build_name,
    model::{Attachment, JobModel, JobState, Note, NoteLevel},
    repository::ModelRepository,
    wrapper::{Wrapper, WrapperRegistry},
};

/// Type alias for perform results.
type JobResult<T> = Result<T, WorkerError>;

/// A unit of work driven through the job lifecycle.
///
/// Only `model_kind` and `run` are required. The other methods are hooks with
/// defaults matching the common case.
///
/// # Example
///
/// ```
/// use worker_tools::core::job::{JobBuilder, JobContext, Worker};
/// use worker_tools::core::model::{JobState, NoteLevel};
/// use worker_tools::core::repository::{InMemoryModelRepository, ModelRepository};
/// use worker_tools::WorkerResult;
///
/// struct Importer;
///
/// impl Worker for Importer {
///     fn model_kind(&self) -> &str {
///         "sdom"
///     }
///
///     fn run(&mut self, ctx: &mut JobContext<'_>) -> WorkerResult<()> {
///         ctx.add_note(NoteLevel::Warning, "row 3 skipped");
///         Ok(())
///     }
/// }
///
/// let repository = InMemoryModelRepository::new();
/// let mut job = JobBuilder::new(Importer).repository(&repository).build()?;
///
/// let model = repository.create("sdom")?;
/// let execution = job.perform(model.id)?;
/// assert_eq!(execution.model.state, JobState::CompleteWithWarnings);
/// # Ok::<(), worker_tools::WorkerError>(())
/// ```
pub trait Worker {
    /// Kind stored on models created by this worker.
    fn model_kind(&self) -> &str;

    fn run(&mut self, ctx: &mut JobContext<'_>) -> WorkerResult<()>;

    /// Whether `run_in_mode` handles the given `run_mode` option.
    fn supports_run_mode(&self, _mode: &str) -> bool {
        false
    }

    /// Runs the job for a model carrying a `run_mode` option.
    fn run_in_mode(&mut self, mode: &str, _ctx: &mut JobContext<'_>) -> WorkerResult<()> {
        Err(WorkerError::MissingRunMode(mode.to_string()))
    }

    /// Called inside the wrapper chain, right before `run`.
    fn custom_reset(&mut self, _ctx: &mut JobContext<'_>) -> WorkerResult<()> {
        Ok(())
    }

    /// Errors recorded as `failed` but not returned to the caller.
    fn is_silent_error(&self, error: &WorkerError) -> bool {
        error.kind() == ErrorKind::Validation
    }

    /// Note levels turning `complete` into `complete_with_warnings`.
    fn complete_with_warnings_note_levels(&self) -> &[NoteLevel] {
        &[NoteLevel::Warning, NoteLevel::Error]
    }

    /// Allows `perform` to create a model when none is given.
    fn create_model_if_not_available(&self) -> bool {
        false
    }
}

/// Reference to the model a perform runs against.
#[derive(Debug, Clone, Default)]
pub enum ModelRef {
    /// Create a fresh model, if the worker allows it.
    #[default]
    None,
    Id(u64),
    Model(JobModel),
}

impl From<u64> for ModelRef {
    fn from(id: u64) -> Self {
        ModelRef::Id(id)
    }
}

impl From<JobModel> for ModelRef {
    fn from(model: JobModel) -> Self {
        ModelRef::Model(model)
    }
}

impl From<Option<u64>> for ModelRef {
    fn from(id: Option<u64>) -> Self {
        id.map_or(ModelRef::None, ModelRef::Id)
    }
}

/// State handed to wrappers and to `run` during one perform.
///
/// Owns the job model for the duration of the perform.
pub struct JobContext<'a> {
    pub model: JobModel,
    repository: &'a dyn ModelRepository,
    log_target: String,
}

impl<'a> JobContext<'a> {
    pub fn new(model: JobModel, repository: &'a dyn ModelRepository, job_name: &str) -> Self {
        Self {
            model,
            repository,
            log_target: format!("worker_tools::job::{job_name}"),
        }
    }

    pub fn model(&self) -> &JobModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut JobModel {
        &mut self.model
    }

    /// Persists the model without running validation.
    pub fn save(&self) -> WorkerResult<()> {
        self.repository.save(&self.model, true)
    }

    /// Persists the model with full validation.
    pub fn save_validated(&self) -> WorkerResult<()> {
        self.repository.save(&self.model, false)
    }

    pub fn save_state(&mut self, state: JobState) -> WorkerResult<()> {
        self.model.state = state;
        self.save()
    }

    pub fn add_note(&mut self, level: NoteLevel, message: impl Into<String>) {
        self.model.notes.push(Note::new(level, message));
    }

    pub fn meta(&self, key: &str) -> Option<&Value> {
        self.model.meta.get(key)
    }

    pub fn set_meta(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.model.meta.insert(key.into(), value.into());
    }

    /// Current value of a counter, `0` when unset.
    pub fn counter(&self, name: &str) -> i64 {
        self.meta(name).and_then(Value::as_i64).unwrap_or_default()
    }

    pub fn set_counter(&mut self, name: &str, value: i64) {
        self.set_meta(name, value);
    }

    pub fn increment_counter(&mut self, name: &str, by: i64) {
        let value = self.counter(name) + by;
        self.set_counter(name, value);
    }

    pub fn add_attachment(&mut self, attachment: Attachment) -> WorkerResult<()> {
        info!(
            target: self.log_target.as_str(),
            "Attaching {} ({}) to model {}",
            attachment.file_name, attachment.content_type, self.model.id
        );
        self.repository.add_attachment(&mut self.model, attachment)
    }

    /// Log target of the job, `worker_tools::job::<job name>`.
    pub fn log_target(&self) -> &str {
        &self.log_target
    }

    pub fn add_log(&self, level: Level, message: &str) {
        log!(target: self.log_target.as_str(), level, "{}", message);
    }

    /// Appends a line to the model's `information`.
    pub fn add_info(&mut self, message: &str) {
        self.model.information.push_str(message);
        self.model.information.push('\n');
    }

    /// Logs the message and keeps it in the model's `information`.
    pub fn record(&mut self, level: Level, message: &str) {
        self.add_log(level, message);
        self.add_info(message);
    }
}

/// Outcome of a perform that did not return an error.
#[derive(Debug)]
pub struct JobExecution {
    /// Identifier of this perform
    pub id: Uuid,
    /// The model as persisted at the end of the perform
    pub model: JobModel,
    pub start: Instant,
    pub end: Instant,
    pub duration: Duration,
}

enum RunMethod {
    Run,
    Mode(String),
}

/// A worker bound to its repository and wrappers.
///
/// Built with `JobBuilder`. Each call to `perform` drives one model through
/// `running` to a terminal state.
pub struct Job<'a, W> {
    name: String,
    worker: W,
    repository: &'a dyn ModelRepository,
    registry: WrapperRegistry<JobContext<'a>>,
    wrappers: Vec<String>,
    model: Option<JobModel>,
}

impl<'a, W: Worker> Job<'a, W> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub fn worker_mut(&mut self) -> &mut W {
        &mut self.worker
    }

    /// Names of the wrappers applied around `run`, outermost first.
    pub fn wrapper_names(&self) -> &[String] {
        &self.wrappers
    }

    /// Model of the last perform, in its final state.
    pub fn model(&self) -> Option<&JobModel> {
        self.model.as_ref()
    }

    /// Runs the worker against a model.
    ///
    /// Configuration errors found up front (wrappers, run mode, model) are
    /// returned before the model is touched. Afterwards the model is reset
    /// to `running`, the wrapper chain runs around `run` and the model ends
    /// as:
    /// - `complete` or `complete_with_warnings` on success,
    /// - `empty` on `EmptyFile` (swallowed),
    /// - `failed` on any other error; silent errors are swallowed, the
    ///   others (configuration errors raised by `run` included) are returned.
    pub fn perform(&mut self, model_ref: impl Into<ModelRef>) -> JobResult<JobExecution> {
        let start = Instant::now();
        let id = Uuid::new_v4();

        let chain = self.registry.chain(&self.wrappers)?;
        let model = Self::find_model(&self.worker, self.repository, model_ref.into())?;
        let run_method = Self::run_method(&self.worker, &model)?;

        let mut ctx = JobContext::new(model, self.repository, &self.name);
        info!(
            target: ctx.log_target(),
            "Start of job: {}, id: {}, model: {}", self.name, id, ctx.model.id
        );

        ctx.model.reset();
        ctx.save()?;

        let worker = &mut self.worker;
        let result = chain.run(&mut ctx, |ctx| {
            worker.custom_reset(ctx)?;
            match &run_method {
                RunMethod::Run => worker.run(ctx),
                RunMethod::Mode(mode) => worker.run_in_mode(mode, ctx),
            }
        });

        let outcome = result
            .and_then(|()| Self::finalize(&self.worker, &mut ctx))
            .or_else(|error| Self::handle_error(&self.worker, &mut ctx, error));

        info!(
            target: ctx.log_target(),
            "End of job: {}, id: {}, state: {}", self.name, id, ctx.model.state
        );

        self.model = Some(ctx.model);
        outcome?;

        Ok(JobExecution {
            id,
            model: self.model.clone().unwrap_or_default(),
            start,
            end: Instant::now(),
            duration: start.elapsed(),
        })
    }

    fn find_model(
        worker: &W,
        repository: &dyn ModelRepository,
        model_ref: ModelRef,
    ) -> WorkerResult<JobModel> {
        match model_ref {
            ModelRef::Model(model) => Ok(model),
            ModelRef::Id(id) => repository.find(id),
            ModelRef::None if worker.create_model_if_not_available() => {
                repository.create(worker.model_kind())
            }
            ModelRef::None => Err(WorkerError::ModelNotAvailable),
        }
    }

    fn run_method(worker: &W, model: &JobModel) -> WorkerResult<RunMethod> {
        match model.run_mode() {
            None => Ok(RunMethod::Run),
            Some(mode) if worker.supports_run_mode(mode) => Ok(RunMethod::Mode(mode.to_string())),
            Some("repeat") => Ok(RunMethod::Run),
            Some(mode) => Err(WorkerError::MissingRunMode(mode.to_string())),
        }
    }

    fn finalize(worker: &W, ctx: &mut JobContext<'_>) -> WorkerResult<()> {
        let with_warnings = ctx
            .model
            .has_notes_with(worker.complete_with_warnings_note_levels());

        ctx.save_state(if with_warnings {
            JobState::CompleteWithWarnings
        } else {
            JobState::Complete
        })
    }

    fn handle_error(worker: &W, ctx: &mut JobContext<'_>, error: WorkerError) -> WorkerResult<()> {
        match error.kind() {
            ErrorKind::Fatal => {
                error!(target: ctx.log_target(), "Configuration error: {}", error);
                ctx.save_state(JobState::Failed)?;
                Err(error)
            }
            ErrorKind::ResourceEmpty => {
                info!(target: ctx.log_target(), "Nothing to process: {}", error);
                ctx.add_note(NoteLevel::Info, error.to_string());
                ctx.save_state(JobState::Empty)
            }
            ErrorKind::Validation | ErrorKind::Unclassified => {
                if let Err(save_error) = ctx.save_state(JobState::Failed) {
                    error!(
                        target: ctx.log_target(),
                        "Unable to save failed state ({}) after: {}", save_error, error
                    );
                    return Err(save_error);
                }

                if worker.is_silent_error(&error) {
                    warn!(target: ctx.log_target(), "Job failed silently: {}", error);
                    Ok(())
                } else {
                    error!(target: ctx.log_target(), "Job failed: {}", error);
                    Err(error)
                }
            }
        }
    }
}

/// Builder for creating a job.
///
/// Wrapper definitions are registered with `register`; the names applied
/// around `run` are listed with `wrappers`. `wrapper` does both at once.
/// `build` checks that every listed name has a definition.
pub struct JobBuilder<'a, W> {
    name: Option<String>,
    worker: W,
    repository: Option<&'a dyn ModelRepository>,
    registry: WrapperRegistry<JobContext<'a>>,
    wrappers: Vec<String>,
}

impl<'a, W: Worker> JobBuilder<'a, W> {
    pub fn new(worker: W) -> Self {
        Self {
            name: None,
            worker,
            repository: None,
            registry: WrapperRegistry::new(),
            wrappers: Vec::new(),
        }
    }

    /// Sets the job name, used as log target suffix.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn repository(mut self, repository: &'a dyn ModelRepository) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Adds a wrapper definition without applying it.
    pub fn register(mut self, wrapper: impl Wrapper<JobContext<'a>> + 'static) -> Self {
        self.registry.register(wrapper);
        self
    }

    /// Appends wrapper names, skipping the ones already listed.
    pub fn wrappers<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for name in names {
            self.push_name(name.as_ref());
        }
        self
    }

    /// Registers a wrapper and appends its name.
    pub fn wrapper(mut self, wrapper: impl Wrapper<JobContext<'a>> + 'static) -> Self {
        let name = wrapper.name().to_string();
        self.registry.register(wrapper);
        self.push_name(&name);
        self
    }

    fn push_name(&mut self, name: &str) {
        if !self.wrappers.iter().any(|listed| listed == name) {
            self.wrappers.push(name.to_string());
        }
    }

    pub fn build(self) -> WorkerResult<Job<'a, W>> {
        let repository = self
            .repository
            .ok_or_else(|| WorkerError::MissingConfiguration("repository".to_string()))?;

        if let Some(missing) = self
            .wrappers
            .iter()
            .find(|name| !self.registry.contains(name))
        {
            return Err(WorkerError::MissingWrapper(missing.clone()));
        }

        Ok(Job {
            name: self.name.unwrap_or_else(build_name),
            worker: self.worker,
            repository,
            registry: self.registry,
            wrappers: self.wrappers,
            model: None,
        })
    }
}
