use std::{collections::BTreeMap, fmt, iter};

use log::debug;

use crate::error::{WorkerError, WorkerResult};

use super::{
    cell::{CellValue, trim_cleanup},
    mapping::{ColumnMapper, ColumnMapping, ColumnSpec, MapperOptions},
};

/// One input row: field name to cleaned value.
pub type Row = BTreeMap<String, CellValue>;

/// Raw rows as produced by a row source.
pub type RawRows = Box<dyn Iterator<Item = WorkerResult<Vec<CellValue>>>>;

/// Value cleanup applied to every mapped value.
pub type Cleanup = Box<dyn Fn(CellValue) -> CellValue>;

/// Row source collaborator of the input adapters.
pub trait RowSource {
    /// Human readable location, used in logs.
    fn location(&self) -> String;

    fn exists(&self) -> bool;

    /// Whether the underlying resource has zero bytes.
    fn is_zero_length(&self) -> bool;

    /// Raw rows, header row first when present.
    fn rows(self: Box<Self>) -> WorkerResult<RawRows>;
}

/// Lazy projection of raw rows onto mapped fields.
///
/// Single pass: it consumes the underlying row iterator. When headers are
/// present the first row is skipped.
pub struct TabularRowStream<I> {
    rows: I,
    mapping: ColumnMapping,
    cleanup: Cleanup,
    skip_next: bool,
}

impl<I> TabularRowStream<I>
where
    I: Iterator<Item = WorkerResult<Vec<CellValue>>>,
{
    pub fn new(rows: I, mapping: ColumnMapping, cleanup: Cleanup, headers_present: bool) -> Self {
        Self {
            rows,
            mapping,
            cleanup,
            skip_next: headers_present,
        }
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    fn to_row(&self, values: Vec<CellValue>) -> Row {
        self.mapping
            .iter()
            .map(|(field, index)| {
                let value = values.get(index).cloned().unwrap_or_default();
                (field.to_string(), (self.cleanup)(value))
            })
            .collect()
    }
}

impl<I> Iterator for TabularRowStream<I>
where
    I: Iterator<Item = WorkerResult<Vec<CellValue>>>,
{
    type Item = WorkerResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.skip_next {
            self.skip_next = false;
            if let Some(Err(error)) = self.rows.next() {
                return Some(Err(error));
            }
        }

        self.rows
            .next()
            .map(|result| result.map(|values| self.to_row(values)))
    }
}

impl<I> fmt::Debug for TabularRowStream<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabularRowStream")
            .field("mapping", &self.mapping)
            .field("skip_next", &self.skip_next)
            .finish()
    }
}

/// Stream returned by the file input adapters.
pub type InputRows = TabularRowStream<RawRows>;

/// Configuration shared by the CSV and XLSX input adapters.
pub struct InputConfig {
    pub columns: Option<ColumnSpec>,
    pub headers_present: bool,
    pub mapper_options: MapperOptions,
    pub cleanup: Cleanup,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            columns: None,
            headers_present: true,
            mapper_options: MapperOptions::default(),
            cleanup: Box::new(trim_cleanup),
        }
    }
}

impl InputConfig {
    pub fn new(columns: ColumnSpec) -> Self {
        Self {
            columns: Some(columns),
            ..Default::default()
        }
    }

    pub fn columns(mut self, columns: ColumnSpec) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Whether the first row is a header row. Defaults to `true`.
    pub fn headers_present(mut self, yes: bool) -> Self {
        self.headers_present = yes;
        self
    }

    pub fn normalize_headers(mut self, yes: bool) -> Self {
        self.mapper_options.normalize = yes;
        self
    }

    pub fn include_other_columns(mut self, yes: bool) -> Self {
        self.mapper_options.include_others = yes;
        self
    }

    pub fn check_columns(mut self, yes: bool) -> Self {
        self.mapper_options.check_columns = yes;
        self
    }

    pub fn cleanup(mut self, cleanup: impl Fn(CellValue) -> CellValue + 'static) -> Self {
        self.cleanup = Box::new(cleanup);
        self
    }

    /// Opens a row source and turns it into a row stream.
    ///
    /// 1. `EmptyFile` when the resource is missing or has zero bytes;
    /// 2. the first row is read as header row, `EmptyFile` if there is none;
    /// 3. the header row is checked and the mapping resolved;
    /// 4. a header-only source gives an empty stream.
    pub fn open(self, source: Box<dyn RowSource>) -> WorkerResult<InputRows> {
        let columns = self
            .columns
            .ok_or_else(|| WorkerError::MissingConfiguration("columns".to_string()))?;

        let location = source.location();
        if !source.exists() {
            return Err(WorkerError::EmptyFile("The file does not exist".to_string()));
        }
        if source.is_zero_length() {
            return Err(WorkerError::EmptyFile("The file is empty".to_string()));
        }

        let mut rows = source.rows()?;
        let header = match rows.next() {
            Some(row) => row?,
            None => return Err(WorkerError::EmptyFile("The file has no rows".to_string())),
        };

        let mapping = ColumnMapper::with_options(columns, self.mapper_options).resolve(&header)?;
        debug!("Reading {} with mapping {:?}", location, mapping);

        let rows: RawRows = Box::new(iter::once(Ok(header)).chain(rows));
        Ok(TabularRowStream::new(
            rows,
            mapping,
            self.cleanup,
            self.headers_present,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::{WorkerError, WorkerResult},
        item::{
            cell::{CellValue, trim_cleanup},
            mapping::{ColumnMapping, ColumnSpec},
        },
    };

    use super::{InputConfig, RawRows, Row, RowSource, TabularRowStream};

    fn raw(rows: &[&[&str]]) -> Vec<WorkerResult<Vec<CellValue>>> {
        rows.iter()
            .map(|row| Ok(row.iter().map(|value| CellValue::from(*value)).collect()))
            .collect()
    }

    fn row(values: &[(&str, &str)]) -> Row {
        values
            .iter()
            .map(|(field, value)| (field.to_string(), CellValue::from(*value)))
            .collect()
    }

    struct StaticSource {
        exists: bool,
        rows: Vec<Vec<&'static str>>,
    }

    impl RowSource for StaticSource {
        fn location(&self) -> String {
            "static".to_string()
        }

        fn exists(&self) -> bool {
            self.exists
        }

        fn is_zero_length(&self) -> bool {
            self.rows.is_empty()
        }

        fn rows(self: Box<Self>) -> WorkerResult<RawRows> {
            let rows: Vec<WorkerResult<Vec<CellValue>>> = self
                .rows
                .into_iter()
                .map(|row| Ok(row.into_iter().map(CellValue::from).collect()))
                .collect();
            Ok(Box::new(rows.into_iter()))
        }
    }

    #[test]
    fn header_row_is_skipped() {
        let mapping: ColumnMapping = [("f1", 0), ("f2", 1)].into_iter().collect();
        let rows = raw(&[&["h1", "h2"], &["v1", "v2"], &["v3", "v4"]]);

        let stream = TabularRowStream::new(rows.into_iter(), mapping, Box::new(trim_cleanup), true);
        let result: Vec<Row> = stream.collect::<WorkerResult<_>>().unwrap();

        assert_eq!(
            result,
            vec![
                row(&[("f1", "v1"), ("f2", "v2")]),
                row(&[("f1", "v3"), ("f2", "v4")])
            ]
        );
    }

    #[test]
    fn without_headers_every_row_is_data() {
        let mapping: ColumnMapping = [("f1", 0)].into_iter().collect();
        let rows = raw(&[&[" v1 "], &["v2"]]);

        let stream = TabularRowStream::new(rows.into_iter(), mapping, Box::new(trim_cleanup), false);
        let result: Vec<Row> = stream.collect::<WorkerResult<_>>().unwrap();

        assert_eq!(result, vec![row(&[("f1", "v1")]), row(&[("f1", "v2")])]);
    }

    #[test]
    fn short_rows_give_empty_values() {
        let mapping: ColumnMapping = [("f1", 0), ("f2", 3)].into_iter().collect();
        let rows = raw(&[&["v1"]]);

        let mut stream =
            TabularRowStream::new(rows.into_iter(), mapping, Box::new(trim_cleanup), false);

        let first = stream.next().unwrap().unwrap();
        assert_eq!(first.get("f2"), Some(&CellValue::Empty));
        assert!(stream.next().is_none());
    }

    #[test]
    fn custom_cleanup_is_applied() {
        let mapping: ColumnMapping = [("f1", 0)].into_iter().collect();
        let rows = raw(&[&["abc"]]);
        let cleanup = Box::new(|value: CellValue| CellValue::from(value.to_string().to_uppercase()));

        let result: Vec<Row> = TabularRowStream::new(rows.into_iter(), mapping, cleanup, false)
            .collect::<WorkerResult<_>>()
            .unwrap();

        assert_eq!(result, vec![row(&[("f1", "ABC")])]);
    }

    #[test]
    fn missing_and_zero_length_sources_are_empty_files() {
        let config = || InputConfig {
            columns: Some(ColumnSpec::positional(["a"])),
            ..Default::default()
        };

        let missing = config().open(Box::new(StaticSource {
            exists: false,
            rows: vec![],
        }));
        assert!(matches!(missing, Err(WorkerError::EmptyFile(msg)) if msg == "The file does not exist"));

        let empty = config().open(Box::new(StaticSource {
            exists: true,
            rows: vec![],
        }));
        assert!(matches!(empty, Err(WorkerError::EmptyFile(msg)) if msg == "The file is empty"));
    }

    #[test]
    fn header_only_source_is_an_empty_stream() {
        let config = InputConfig {
            columns: Some(ColumnSpec::keyed([("a", "A")])),
            ..Default::default()
        };

        let stream = config
            .open(Box::new(StaticSource {
                exists: true,
                rows: vec![vec!["A"]],
            }))
            .unwrap();

        assert_eq!(stream.count(), 0);
    }

    #[test]
    fn columns_are_required() {
        let result = InputConfig::default().open(Box::new(StaticSource {
            exists: true,
            rows: vec![vec!["A"]],
        }));
        assert!(matches!(result, Err(WorkerError::MissingConfiguration(_))));
    }
}
