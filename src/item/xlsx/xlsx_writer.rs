use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{
    core::{job::JobContext, model::Attachment},
    error::WorkerResult,
    item::output::{OutputRow, attach, write_target},
};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Width and wrapping of one column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ColumnStyle {
    pub width: Option<f64>,
    pub text_wrap: bool,
}

/// One worksheet, with every cell already stringified.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Sheet {
    pub label: String,
    /// Header labels, in column order.
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// Styles by column index. `None` leaves the column untouched.
    pub column_styles: Vec<Option<ColumnStyle>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

/// Turns a workbook into the bytes of a spreadsheet file.
pub trait SpreadsheetEncoder {
    fn encode(&self, workbook: &Workbook) -> WorkerResult<Vec<u8>>;
}

/// Content of one sheet before it is laid out.
pub struct SheetContent {
    label: String,
    headers: Option<Vec<(String, String)>>,
    rows: Vec<OutputRow>,
    column_styles: Vec<(String, ColumnStyle)>,
}

impl SheetContent {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            headers: None,
            rows: Vec::new(),
            column_styles: Vec::new(),
        }
    }

    /// Header row as `(key, label)` pairs.
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

    pub fn rows<I, R>(mut self, rows: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<OutputRow>,
    {
        self.rows.extend(rows.into_iter().map(Into::into));
        self
    }

    /// Style of the column with header key `key`. Ignored without headers.
    pub fn column_style(mut self, key: impl Into<String>, style: ColumnStyle) -> Self {
        self.column_styles.push((key.into(), style));
        self
    }

    fn layout(self) -> Sheet {
        let keys: Option<Vec<String>> = self
            .headers
            .as_ref()
            .map(|headers| headers.iter().map(|(key, _)| key.clone()).collect());

        let column_styles = match &keys {
            Some(keys) => keys
                .iter()
                .map(|key| {
                    self.column_styles
                        .iter()
                        .find(|(styled, _)| styled == key)
                        .map(|(_, style)| style.clone())
                })
                .collect(),
            None => Vec::new(),
        };

        let rows: Vec<Vec<String>> = self
            .rows
            .into_iter()
            .map(|row| {
                row.ordered(keys.as_deref())
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
            .collect();

        Sheet {
            label: self.label,
            headers: self
                .headers
                .map(|headers| headers.into_iter().map(|(_, label)| label).collect())
                .unwrap_or_default(),
            rows,
            column_styles,
        }
    }
}

/// Lays out sheets and hands them to a [`SpreadsheetEncoder`].
pub struct XlsxOutput<E> {
    encoder: E,
    sheets: Vec<SheetContent>,
    target: Option<PathBuf>,
    file_name: Option<String>,
}

impl<E: SpreadsheetEncoder> XlsxOutput<E> {
    /// Laid out workbook; consumes the sheet contents.
    fn workbook(&mut self) -> Workbook {
        Workbook {
            sheets: self.sheets.drain(..).map(SheetContent::layout).collect(),
        }
    }

    /// Encodes the workbook, writes it to the target path when one is set and
    /// attaches it to the model as `<file name>.xlsx`.
    pub fn write(mut self, ctx: &mut JobContext<'_>) -> WorkerResult<Attachment> {
        let workbook = self.workbook();
        let content = self.encoder.encode(&workbook)?;

        if let Some(target) = &self.target {
            write_target(target, &content)?;
        }

        attach(
            ctx,
            self.file_name.as_deref(),
            "xlsx",
            XLSX_CONTENT_TYPE,
            content,
        )
    }
}

/// Builder of [`XlsxOutput`].
pub struct XlsxOutputBuilder<E> {
    encoder: E,
    sheets: Vec<SheetContent>,
    target: Option<PathBuf>,
    file_name: Option<String>,
}

impl<E: SpreadsheetEncoder> XlsxOutputBuilder<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            sheets: Vec::new(),
            target: None,
            file_name: None,
        }
    }

    pub fn sheet(mut self, sheet: SheetContent) -> Self {
        self.sheets.push(sheet);
        self
    }

    pub fn target<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.target = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn build(self) -> XlsxOutput<E> {
        XlsxOutput {
            encoder: self.encoder,
            sheets: self.sheets,
            target: self.target,
            file_name: self.file_name,
        }
    }
}
