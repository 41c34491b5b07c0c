use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use encoding_rs::{Encoding, UTF_8};

use crate::{
    core::{job::JobContext, model::Attachment},
    error::{WorkerError, WorkerResult},
    item::output::{OutputRow, attach, write_target},
};

pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Writes rows as CSV and registers the result on the job's model.
pub struct CsvOutput {
    headers: Option<Vec<(String, String)>>,
    delimiter: u8,
    encoding: &'static Encoding,
    target: Option<PathBuf>,
    file_name: Option<String>,
}

impl CsvOutput {
    fn header_keys(&self) -> Option<Vec<String>> {
        self.headers
            .as_ref()
            .map(|headers| headers.iter().map(|(key, _)| key.clone()).collect())
    }

    /// Renders rows to encoded CSV bytes.
    pub fn render<I, R>(&self, rows: I) -> WorkerResult<Vec<u8>>
    where
        I: IntoIterator<Item = R>,
        R: Into<OutputRow>,
    {
        let mut wtr = WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_writer(vec![]);

        if let Some(headers) = &self.headers {
            wtr.write_record(headers.iter().map(|(_, label)| label))
                .map_err(|error| WorkerError::ItemWriter(error.to_string()))?;
        }

        let keys = self.header_keys();
        for row in rows {
            let values = row.into().ordered(keys.as_deref());
            wtr.write_record(values.iter().map(|value| value.to_string()))
                .map_err(|error| WorkerError::ItemWriter(error.to_string()))?;
        }

        let data = wtr
            .into_inner()
            .map_err(|error| WorkerError::ItemWriter(error.to_string()))?;
        let text =
            String::from_utf8(data).map_err(|error| WorkerError::ItemWriter(error.to_string()))?;

        let (bytes, _, had_errors) = self.encoding.encode(&text);
        if had_errors {
            return Err(WorkerError::ItemWriter(format!(
                "Some characters cannot be encoded as {}",
                self.encoding.name()
            )));
        }
        Ok(bytes.into_owned())
    }

    /// Renders rows, writes them to the target path when one is set and
    /// attaches them to the model as `<file name>.csv`.
    pub fn write<I, R>(&self, ctx: &mut JobContext<'_>, rows: I) -> WorkerResult<Attachment>
    where
        I: IntoIterator<Item = R>,
        R: Into<OutputRow>,
    {
        let content = self.render(rows)?;

        if let Some(target) = &self.target {
            write_target(target, &content)?;
        }

        attach(
            ctx,
            self.file_name.as_deref(),
            "csv",
            CSV_CONTENT_TYPE,
            content,
        )
    }
}

/// Builder of [`CsvOutput`].
///
/// # Examples
///
/// ```
/// use worker_tools::item::{cell::CellValue, csv::csv_writer::CsvOutputBuilder};
///
/// let output = CsvOutputBuilder::new()
///     .headers([("name", "Name"), ("age", "Age")])
///     .build();
///
/// let bytes = output.render([vec![CellValue::from("Alice"), CellValue::Int(30)]])?;
/// assert_eq!(String::from_utf8(bytes).unwrap(), "Name;Age\nAlice;30\n");
/// # Ok::<(), worker_tools::WorkerError>(())
/// ```
pub struct CsvOutputBuilder {
    headers: Option<Vec<(String, String)>>,
    delimiter: u8,
    encoding: &'static Encoding,
    target: Option<PathBuf>,
    file_name: Option<String>,
}

impl Default for CsvOutputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvOutputBuilder {
    pub fn new() -> Self {
        Self {
            headers: None,
            delimiter: b';',
            encoding: UTF_8,
            target: None,
            file_name: None,
        }
    }

    /// Header row as `(key, label)` pairs. Keys order keyed rows, labels are
    /// written.
    pub fn headers<I, K, L>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<String>,
    {
        self.headers = Some(
            headers
                .into_iter()
                .map(|(key, label)| (key.into(), label.into()))
                .collect(),
        );
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Output encoding by label, e.g. `"ISO-8859-1"`.
    pub fn encoding(mut self, label: &str) -> WorkerResult<Self> {
        self.encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            WorkerError::MissingConfiguration(format!("a supported encoding (got {label})"))
        })?;
        Ok(self)
    }

    /// Also writes the file to `path`, creating missing parent folders.
    pub fn target<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.target = Some(path.as_ref().to_path_buf());
        self
    }

    /// Attachment file name without extension. Defaults to the model kind.
    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn build(self) -> CsvOutput {
        CsvOutput {
            headers: self.headers,
            delimiter: self.delimiter,
            encoding: self.encoding,
            target: self.target,
            file_name: self.file_name,
        }
    }
}
