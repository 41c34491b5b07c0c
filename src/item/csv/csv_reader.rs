use std::{
    fs,
    io::{Cursor, Read},
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord};
use encoding_rs::{Encoding, UTF_8};

use crate::{
    error::{WorkerError, WorkerResult},
    item::{
        cell::CellValue,
        mapping::ColumnSpec,
        rows::{InputConfig, InputRows, RawRows, RowSource},
    },
};

fn to_cells(record: StringRecord) -> Vec<CellValue> {
    record.iter().map(CellValue::from).collect()
}

fn records<R: Read + 'static>(rdr: csv::Reader<R>) -> RawRows {
    Box::new(rdr.into_records().map(|result| {
        result
            .map(to_cells)
            .map_err(|error| WorkerError::ItemReader(error.to_string()))
    }))
}

/// Re-encodes `content` as UTF-8. A byte order mark overrides `encoding`.
fn decode(content: &[u8], encoding: &'static Encoding) -> Vec<u8> {
    let (text, _, _) = encoding.decode(content);
    text.into_owned().into_bytes()
}

fn reader_builder(delimiter: u8) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder
        .delimiter(delimiter)
        // The header row is handled by the row stream.
        .has_headers(false)
        .flexible(true);
    builder
}

struct CsvFileSource {
    path: PathBuf,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl RowSource for CsvFileSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn is_zero_length(&self) -> bool {
        fs::metadata(&self.path).map_or(true, |metadata| metadata.len() == 0)
    }

    fn rows(self: Box<Self>) -> WorkerResult<RawRows> {
        if self.encoding == UTF_8 {
            let rdr = reader_builder(self.delimiter)
                .from_path(&self.path)
                .map_err(|error| WorkerError::ItemReader(error.to_string()))?;
            return Ok(records(rdr));
        }

        let content =
            fs::read(&self.path).map_err(|error| WorkerError::ItemReader(error.to_string()))?;
        let rdr = reader_builder(self.delimiter)
            .from_reader(Cursor::new(decode(&content, self.encoding)));
        Ok(records(rdr))
    }
}

struct CsvBufferSource {
    content: Vec<u8>,
    delimiter: u8,
    encoding: &'static Encoding,
}

impl RowSource for CsvBufferSource {
    fn location(&self) -> String {
        format!("<{} bytes of CSV>", self.content.len())
    }

    fn exists(&self) -> bool {
        true
    }

    fn is_zero_length(&self) -> bool {
        self.content.is_empty()
    }

    fn rows(self: Box<Self>) -> WorkerResult<RawRows> {
        let content = if self.encoding == UTF_8 {
            self.content
        } else {
            decode(&self.content, self.encoding)
        };
        let rdr = reader_builder(self.delimiter).from_reader(Cursor::new(content));
        Ok(records(rdr))
    }
}

/// Builds row streams over CSV input.
///
/// # Examples
///
/// ```
/// use worker_tools::item::csv::csv_reader::CsvInputBuilder;
/// use worker_tools::item::mapping::ColumnSpec;
///
/// let data = "Name;Age\nAlice; 30 \nBob;41\n";
///
/// let rows = CsvInputBuilder::new()
///     .columns(ColumnSpec::keyed([("name", "Name"), ("age", "Age")]))
///     .from_reader(data.as_bytes())?;
///
/// let ages: Vec<String> = rows
///     .map(|row| row.map(|row| row["age"].to_string()))
///     .collect::<Result<_, _>>()?;
/// assert_eq!(ages, ["30", "41"]);
/// # Ok::<(), worker_tools::WorkerError>(())
/// ```
pub struct CsvInputBuilder {
    delimiter: u8,
    encoding: &'static Encoding,
    config: InputConfig,
}

impl Default for CsvInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CsvInputBuilder {
    /// Creates a builder reading `;` separated files with a header row.
    pub fn new() -> Self {
        Self {
            delimiter: b';',
            encoding: UTF_8,
            config: InputConfig::default(),
        }
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Input encoding by label, e.g. `"ISO-8859-1"`. Defaults to UTF-8.
    pub fn encoding(mut self, label: &str) -> WorkerResult<Self> {
        self.encoding = Encoding::for_label(label.as_bytes()).ok_or_else(|| {
            WorkerError::MissingConfiguration(format!("a supported encoding (got {label})"))
        })?;
        Ok(self)
    }

    pub fn columns(mut self, columns: ColumnSpec) -> Self {
        self.config = self.config.columns(columns);
        self
    }

    /// Replaces the whole input configuration.
    pub fn config(mut self, config: InputConfig) -> Self {
        self.config = config;
        self
    }

    pub fn headers_present(mut self, yes: bool) -> Self {
        self.config = self.config.headers_present(yes);
        self
    }

    /// Lowercases headers before matching. On by default.
    pub fn normalize_headers(mut self, yes: bool) -> Self {
        self.config = self.config.normalize_headers(yes);
        self
    }

    pub fn include_other_columns(mut self, yes: bool) -> Self {
        self.config = self.config.include_other_columns(yes);
        self
    }

    pub fn check_columns(mut self, yes: bool) -> Self {
        self.config = self.config.check_columns(yes);
        self
    }

    /// Applied to every value read. Defaults to trimming strings.
    pub fn cleanup(mut self, cleanup: impl Fn(CellValue) -> CellValue + 'static) -> Self {
        self.config = self.config.cleanup(cleanup);
        self
    }

    /// Opens the file at `path`.
    ///
    /// Fails with `EmptyFile` when the file does not exist or is empty.
    pub fn from_path<P: AsRef<Path>>(self, path: P) -> WorkerResult<InputRows> {
        self.config.open(Box::new(CsvFileSource {
            path: path.as_ref().to_path_buf(),
            delimiter: self.delimiter,
            encoding: self.encoding,
        }))
    }

    /// Reads the whole input into memory, then opens it.
    pub fn from_reader<R: Read>(self, mut rdr: R) -> WorkerResult<InputRows> {
        let mut content = Vec::new();
        rdr.read_to_end(&mut content)
            .map_err(|error| WorkerError::ItemReader(error.to_string()))?;

        self.config.open(Box::new(CsvBufferSource {
            content,
            delimiter: self.delimiter,
            encoding: self.encoding,
        }))
    }
}
