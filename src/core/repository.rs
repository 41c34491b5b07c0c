use std::{
    cell::{Cell, RefCell},
    collections::BTreeMap,
};

use log::debug;

use crate::error::{WorkerError, WorkerResult};

use super::model::{Attachment, JobModel, JobState};

/// Persistence collaborator for job models.
///
/// Lifecycle writes always pass `skip_validation = true`: they are status
/// updates on an operational record, not user entity writes.
pub trait ModelRepository {
    fn find(&self, id: u64) -> WorkerResult<JobModel>;

    /// Creates and stores a new model of the given kind.
    fn create(&self, kind: &str) -> WorkerResult<JobModel>;

    fn save(&self, model: &JobModel, skip_validation: bool) -> WorkerResult<()>;

    /// Registers an output file on the model.
    fn add_attachment(&self, model: &mut JobModel, attachment: Attachment) -> WorkerResult<()> {
        model.attachments.push(attachment);
        Ok(())
    }
}

/// A `ModelRepository` keeping models in memory.
///
/// Every save is logged so callers can check which states were persisted and
/// whether validation was skipped.
#[derive(Default)]
pub struct InMemoryModelRepository {
    models: RefCell<BTreeMap<u64, JobModel>>,
    last_id: Cell<u64>,
    saves: RefCell<Vec<(JobState, bool)>>,
}

impl InMemoryModelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a model as is, e.g. to seed a test.
    pub fn insert(&self, model: JobModel) {
        if model.id > self.last_id.get() {
            self.last_id.set(model.id);
        }
        self.models.borrow_mut().insert(model.id, model);
    }

    pub fn get(&self, id: u64) -> Option<JobModel> {
        self.models.borrow().get(&id).cloned()
    }

    /// States written so far, paired with the `skip_validation` flag.
    pub fn saves(&self) -> Vec<(JobState, bool)> {
        self.saves.borrow().clone()
    }

    fn validate(model: &JobModel) -> WorkerResult<()> {
        if model.kind.trim().is_empty() {
            return Err(WorkerError::Persistence(format!(
                "Validation failed for model {}: kind can't be blank",
                model.id
            )));
        }
        Ok(())
    }
}

impl ModelRepository for InMemoryModelRepository {
    fn find(&self, id: u64) -> WorkerResult<JobModel> {
        self.get(id)
            .ok_or_else(|| WorkerError::Persistence(format!("Couldn't find model with id={id}")))
    }

    fn create(&self, kind: &str) -> WorkerResult<JobModel> {
        let id = self.last_id.get() + 1;
        self.last_id.set(id);

        let model = JobModel::new(id, kind);
        self.models.borrow_mut().insert(id, model.clone());
        debug!("Created model {id} of kind {kind}");
        Ok(model)
    }

    fn save(&self, model: &JobModel, skip_validation: bool) -> WorkerResult<()> {
        if !skip_validation {
            Self::validate(model)?;
        }
        self.saves.borrow_mut().push((model.state, skip_validation));
        self.models.borrow_mut().insert(model.id, model.clone());
        Ok(())
    }

    fn add_attachment(&self, model: &mut JobModel, attachment: Attachment) -> WorkerResult<()> {
        model.attachments.push(attachment);
        if let Some(stored) = self.models.borrow_mut().get_mut(&model.id) {
            stored.attachments = model.attachments.clone();
        }
        Ok(())
    }
}
