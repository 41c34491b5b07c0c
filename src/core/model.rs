use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// State of a job model.
///
/// A model starts `waiting`, is reset to `running` at the beginning of every
/// perform and ends in one of the terminal states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[default]
    Waiting,
    Running,
    Complete,
    CompleteWithWarnings,
    Failed,
    Empty,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Waiting => "waiting",
            JobState::Running => "running",
            JobState::Complete => "complete",
            JobState::CompleteWithWarnings => "complete_with_warnings",
            JobState::Failed => "failed",
            JobState::Empty => "empty",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobState::Waiting | JobState::Running)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteLevel {
    Info,
    Warning,
    Error,
}

/// A user facing audit entry stored on the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub level: NoteLevel,
    pub message: String,
}

impl Note {
    pub fn new(level: NoteLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoteLevel::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoteLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoteLevel::Error, message)
    }
}

/// A file produced by an output adapter and registered on the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// The persisted record tracking one execution of a worker.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobModel {
    pub id: u64,
    pub kind: String,
    pub state: JobState,
    pub notes: Vec<Note>,
    /// Counters, duration, memory usage and any other job metadata.
    pub meta: Map<String, Value>,
    /// Per-execution options, e.g. `run_mode`.
    pub options: Map<String, Value>,
    /// Text accumulated by the recorder.
    pub information: String,
    #[serde(skip)]
    pub attachments: Vec<Attachment>,
}

impl JobModel {
    pub fn new(id: u64, kind: impl Into<String>) -> Self {
        Self {
            id,
            kind: kind.into(),
            ..Default::default()
        }
    }

    /// Clears notes and meta and marks the model as running.
    pub fn reset(&mut self) {
        self.notes.clear();
        self.meta.clear();
        self.state = JobState::Running;
    }

    pub fn has_notes_with(&self, levels: &[NoteLevel]) -> bool {
        self.notes.iter().any(|note| levels.contains(&note.level))
    }

    pub fn run_mode(&self) -> Option<&str> {
        self.option_str("run_mode")
    }

    pub fn run_mode_option(&self) -> Option<&str> {
        self.option_str("run_mode_option")
    }

    fn option_str(&self, key: &str) -> Option<&str> {
        self.options
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{JobModel, JobState, Note, NoteLevel};

    #[test]
    fn reset_clears_notes_and_meta() {
        let mut model = JobModel::new(1, "foo");
        model.notes.push(Note::warning("careful"));
        model.meta.insert("inserts".to_string(), json!(3));
        model.state = JobState::Failed;

        model.reset();

        assert!(model.notes.is_empty());
        assert!(model.meta.is_empty());
        assert_eq!(model.state, JobState::Running);
    }

    #[test]
    fn states_serialize_as_snake_case() {
        let value = serde_json::to_value(JobState::CompleteWithWarnings).unwrap();
        assert_eq!(value, json!("complete_with_warnings"));
        assert_eq!(JobState::Empty.to_string(), "empty");
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Running.is_terminal());
    }

    #[test]
    fn notes_are_matched_by_level() {
        let mut model = JobModel::new(1, "foo");
        model.notes.push(Note::info("details"));
        assert!(!model.has_notes_with(&[NoteLevel::Warning, NoteLevel::Error]));

        model.notes.push(Note::error("broken row"));
        assert!(model.has_notes_with(&[NoteLevel::Warning, NoteLevel::Error]));
    }

    #[test]
    fn run_mode_is_read_from_options() {
        let mut model = JobModel::new(1, "foo");
        assert_eq!(model.run_mode(), None);

        model.options.insert("run_mode".to_string(), json!("repeat"));
        model.options.insert("run_mode_option".to_string(), json!(""));
        assert_eq!(model.run_mode(), Some("repeat"));
        assert_eq!(model.run_mode_option(), None);
    }
}
