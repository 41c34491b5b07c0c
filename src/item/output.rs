#[cfg(any(feature = "csv", feature = "xlsx"))]
use std::{fs, path::Path};

#[cfg(any(feature = "csv", feature = "xlsx"))]
use log::debug;

#[cfg(any(feature = "csv", feature = "xlsx"))]
use crate::{
    core::{job::JobContext, model::Attachment},
    error::{WorkerError, WorkerResult},
};

use super::{cell::CellValue, rows::Row};

/// A row handed to an output adapter.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputRow {
    /// Values in column order.
    Values(Vec<CellValue>),
    /// Values by key, reordered by the output's header keys.
    Keyed(Row),
}

impl OutputRow {
    /// Values of the row in output order.
    ///
    /// Keyed rows follow `keys` when given (missing keys become empty cells)
    /// and their own key order otherwise.
    pub fn ordered(self, keys: Option<&[String]>) -> Vec<CellValue> {
        match (self, keys) {
            (OutputRow::Values(values), _) => values,
            (OutputRow::Keyed(mut row), Some(keys)) => keys
                .iter()
                .map(|key| row.remove(key).unwrap_or_default())
                .collect(),
            (OutputRow::Keyed(row), None) => row.into_values().collect(),
        }
    }
}

impl From<Vec<CellValue>> for OutputRow {
    fn from(values: Vec<CellValue>) -> Self {
        OutputRow::Values(values)
    }
}

impl From<Row> for OutputRow {
    fn from(row: Row) -> Self {
        OutputRow::Keyed(row)
    }
}

/// Registers `content` as attachment of the job's model.
///
/// The file is named after `file_name` or, by default, the model kind.
#[cfg(any(feature = "csv", feature = "xlsx"))]
pub(crate) fn attach(
    ctx: &mut JobContext<'_>,
    file_name: Option<&str>,
    extension: &str,
    content_type: &str,
    content: Vec<u8>,
) -> WorkerResult<Attachment> {
    let stem = file_name.unwrap_or(&ctx.model.kind);
    let attachment = Attachment {
        file_name: format!("{stem}.{extension}"),
        content_type: content_type.to_string(),
        content,
    };
    ctx.add_attachment(attachment.clone())?;
    Ok(attachment)
}

/// Writes `content` to `target`, creating missing parent folders.
#[cfg(any(feature = "csv", feature = "xlsx"))]
pub(crate) fn write_target(target: &Path, content: &[u8]) -> WorkerResult<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|error| WorkerError::ItemWriter(error.to_string()))?;
    }
    debug!("Writing {} bytes to {}", content.len(), target.display());
    fs::write(target, content).map_err(|error| WorkerError::ItemWriter(error.to_string()))
}
