use std::{
    fs,
    io::Cursor,
    path::{Path, PathBuf},
};

use calamine::{Data, Range, Reader, Xlsx, open_workbook};

use crate::{
    error::{WorkerError, WorkerResult},
    item::{
        cell::CellValue,
        mapping::ColumnSpec,
        rows::{InputConfig, InputRows, RawRows, RowSource},
    },
};

pub(crate) fn to_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::Bool(value) => CellValue::Bool(*value),
        Data::Int(value) => CellValue::Int(*value),
        Data::Float(value) => CellValue::Float(*value),
        Data::String(value) => CellValue::String(value.clone()),
        Data::DateTime(value) => CellValue::Float(value.as_f64()),
        other => CellValue::String(other.to_string()),
    }
}

/// Rows of the range; every row spans the used range of the sheet.
fn range_rows(range: Range<Data>) -> RawRows {
    let rows: Vec<WorkerResult<Vec<CellValue>>> = range
        .rows()
        .map(|row| Ok(row.iter().map(to_cell).collect()))
        .collect();
    Box::new(rows.into_iter())
}

fn first_sheet<RS>(mut workbook: Xlsx<RS>) -> WorkerResult<RawRows>
where
    RS: std::io::Read + std::io::Seek,
{
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| WorkerError::EmptyFile("The workbook has no sheets".to_string()))?
        .map_err(|error| WorkerError::ItemReader(error.to_string()))?;
    Ok(range_rows(range))
}

struct XlsxFileSource {
    path: PathBuf,
}

impl RowSource for XlsxFileSource {
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
        let workbook: Xlsx<_> = open_workbook(&self.path)
            .map_err(|error: calamine::XlsxError| WorkerError::ItemReader(error.to_string()))?;
        first_sheet(workbook)
    }
}

struct XlsxBufferSource {
    content: Vec<u8>,
}

impl RowSource for XlsxBufferSource {
    fn location(&self) -> String {
        format!("<{} bytes of XLSX>", self.content.len())
    }

    fn exists(&self) -> bool {
        true
    }

    fn is_zero_length(&self) -> bool {
        self.content.is_empty()
    }

    fn rows(self: Box<Self>) -> WorkerResult<RawRows> {
        let workbook = Xlsx::new(Cursor::new(self.content))
            .map_err(|error| WorkerError::ItemReader(error.to_string()))?;
        first_sheet(workbook)
    }
}

/// Builds row streams over the first worksheet of an XLSX workbook.
pub struct XlsxInputBuilder {
    config: InputConfig,
}

impl Default for XlsxInputBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl XlsxInputBuilder {
    pub fn new() -> Self {
        Self {
            config: InputConfig::default(),
        }
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

    pub fn from_path<P: AsRef<Path>>(self, path: P) -> WorkerResult<InputRows> {
        self.config.open(Box::new(XlsxFileSource {
            path: path.as_ref().to_path_buf(),
        }))
    }

    pub fn from_bytes(self, content: Vec<u8>) -> WorkerResult<InputRows> {
        self.config.open(Box::new(XlsxBufferSource { content }))
    }
}
