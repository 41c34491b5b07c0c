use thiserror::Error;

/// Result alias used across the crate.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// How the job lifecycle treats an error once it escapes `run()`.
///
/// The kind is fixed by the variant chosen where the error is raised, so the
/// lifecycle never has to guess from the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A programming error in the job definition. Returned as is, never
    /// recorded on the model.
    Fatal,
    /// Expected input problems (column mismatches and the like). Recorded as
    /// `failed` and swallowed by default.
    Validation,
    /// Missing or empty input. Recorded as `empty` and swallowed.
    ResourceEmpty,
    /// Anything else. Recorded as `failed` and propagated.
    Unclassified,
}

#[derive(Error, Debug)]
/// Worker error
pub enum WorkerError {
    #[error("Missing wrapper {0}")]
    MissingWrapper(String),

    #[error("Missing method run_in_{0}_mode")]
    MissingRunMode(String),

    #[error("Model not available")]
    ModelNotAvailable,

    #[error("{0} has to be defined")]
    MissingConfiguration(String),

    #[error("The number of columns ({actual}) is not the expected ({expected})")]
    WrongNumberOfColumns { actual: usize, expected: usize },

    #[error("The file contains duplicated columns: {0:?}")]
    DuplicatedColumns(Vec<String>),

    #[error("Some columns are missing: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("{0}")]
    Invalid(String),

    #[error("{0}")]
    EmptyFile(String),

    #[error("Persistence from: {0}")]
    Persistence(String),

    #[error("ItemReader from: {0}")]
    ItemReader(String),

    #[error("ItemWriter from: {0}")]
    ItemWriter(String),

    #[error("{0}")]
    Run(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl WorkerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::MissingWrapper(_)
            | WorkerError::MissingRunMode(_)
            | WorkerError::ModelNotAvailable
            | WorkerError::MissingConfiguration(_) => ErrorKind::Fatal,
            WorkerError::WrongNumberOfColumns { .. }
            | WorkerError::DuplicatedColumns(_)
            | WorkerError::MissingColumns(_)
            | WorkerError::Invalid(_) => ErrorKind::Validation,
            WorkerError::EmptyFile(_) => ErrorKind::ResourceEmpty,
            WorkerError::Persistence(_)
            | WorkerError::ItemReader(_)
            | WorkerError::ItemWriter(_)
            | WorkerError::Run(_)
            | WorkerError::Other(_) => ErrorKind::Unclassified,
        }
    }

    /// Short name of the variant, used in recorded and notified error texts.
    pub fn name(&self) -> &'static str {
        match self {
            WorkerError::MissingWrapper(_) => "MissingWrapper",
            WorkerError::MissingRunMode(_) => "MissingRunMode",
            WorkerError::ModelNotAvailable => "ModelNotAvailable",
            WorkerError::MissingConfiguration(_) => "MissingConfiguration",
            WorkerError::WrongNumberOfColumns { .. } => "WrongNumberOfColumns",
            WorkerError::DuplicatedColumns(_) => "DuplicatedColumns",
            WorkerError::MissingColumns(_) => "MissingColumns",
            WorkerError::Invalid(_) => "Invalid",
            WorkerError::EmptyFile(_) => "EmptyFile",
            WorkerError::Persistence(_) => "Persistence",
            WorkerError::ItemReader(_) => "ItemReader",
            WorkerError::ItemWriter(_) => "ItemWriter",
            WorkerError::Run(_) => "Run",
            WorkerError::Other(_) => "Other",
        }
    }
}
