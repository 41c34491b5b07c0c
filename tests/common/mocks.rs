//! Mocks of the collaborators a job talks to.
use mockall::mock;

use worker_tools::{
    WorkerResult,
    core::{
        model::{Attachment, JobModel},
        repository::ModelRepository,
    },
    item::xlsx::xlsx_writer::{SpreadsheetEncoder, Workbook},
    wrapper::notifier::{Notification, Notifier},
};

mock! {
    pub Repository {}
    impl ModelRepository for Repository {
        fn find(&self, id: u64) -> WorkerResult<JobModel>;
        fn create(&self, kind: &str) -> WorkerResult<JobModel>;
        fn save(&self, model: &JobModel, skip_validation: bool) -> WorkerResult<()>;
        fn add_attachment(&self, model: &mut JobModel, attachment: Attachment) -> WorkerResult<()>;
    }
}

mock! {
    pub Notifier {}
    impl Notifier for Notifier {
        fn notify(&self, notification: &Notification) -> WorkerResult<()>;
    }
}

mock! {
    pub Encoder {}
    impl SpreadsheetEncoder for Encoder {
        fn encode(&self, workbook: &Workbook) -> WorkerResult<Vec<u8>>;
    }
}
