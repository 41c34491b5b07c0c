//! Resolution of expected columns against the header row of a file.
//!
//! Columns are described by a [`ColumnSpec`]:
//!
//! - a positional list of field names: the i-th field takes the value of the
//!   i-th column, only the number of columns is checked;
//! - a keyed list of `field => matcher`: each field takes the value of the
//!   first header matched, whatever its position in the file.
//!
//! Header names are normalized before comparison (surrounding whitespace
//! removed, lowercased unless disabled), so `"Bereich"` matches `" bereich"`.
//!
//! ```
//! use worker_tools::item::cell::CellValue;
//! use worker_tools::item::mapping::{ColumnMapper, ColumnSpec, Matcher};
//!
//! let spec = ColumnSpec::keyed([
//!     ("tenant", Matcher::from("Mandant")),
//!     ("segment", Matcher::pattern("seg.*").unwrap()),
//!     ("area", Matcher::predicate(|name| name == "area")),
//! ]);
//! let header: Vec<CellValue> = vec!["Bereich".into(), "Segment".into(), " MANDANT ".into(), "Area".into()];
//!
//! let mapping = ColumnMapper::new(spec).resolve(&header).unwrap();
//! assert_eq!(mapping.get("tenant"), Some(2));
//! assert_eq!(mapping.get("segment"), Some(1));
//! assert_eq!(mapping.get("area"), Some(3));
//! ```

use std::{collections::HashMap, fmt, sync::Arc};

use log::debug;
use regex::Regex;

use crate::error::{WorkerError, WorkerResult};

use super::cell::CellValue;

/// Predicate matcher over a normalized header name.
pub type HeaderPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// How a keyed field finds its column.
#[derive(Clone)]
pub enum Matcher {
    /// Equal to the header once both are normalized.
    Exact(String),
    /// Case-insensitive regular expression matching the whole header.
    Pattern(Regex),
    /// Arbitrary test on the normalized header.
    Predicate(HeaderPredicate),
}

impl Matcher {
    pub fn exact(name: impl Into<String>) -> Self {
        Matcher::Exact(name.into())
    }

    /// Compiles a case-insensitive pattern anchored on both ends.
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(&format!("(?i)^(?:{pattern})$")).map(Matcher::Pattern)
    }

    pub fn predicate(predicate: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        Matcher::Predicate(Arc::new(predicate))
    }

    fn matches(&self, header: &str, normalizer: &HeaderNormalizer) -> bool {
        match self {
            Matcher::Exact(name) => normalizer.normalize_str(name) == header,
            Matcher::Pattern(regex) => regex.is_match(header),
            Matcher::Predicate(predicate) => predicate(header),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Matcher::Exact(name) => f.debug_tuple("Exact").field(name).finish(),
            Matcher::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            Matcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for Matcher {
    fn from(name: &str) -> Self {
        Matcher::exact(name)
    }
}

impl From<String> for Matcher {
    fn from(name: String) -> Self {
        Matcher::Exact(name)
    }
}

impl From<Regex> for Matcher {
    fn from(regex: Regex) -> Self {
        Matcher::Pattern(regex)
    }
}

/// Expected input columns.
#[derive(Debug, Clone)]
pub enum ColumnSpec {
    Positional(Vec<String>),
    Keyed(Vec<(String, Matcher)>),
}

impl ColumnSpec {
    pub fn positional<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ColumnSpec::Positional(names.into_iter().map(Into::into).collect())
    }

    pub fn keyed<I, K, M>(columns: I) -> Self
    where
        I: IntoIterator<Item = (K, M)>,
        K: Into<String>,
        M: Into<Matcher>,
    {
        ColumnSpec::Keyed(
            columns
                .into_iter()
                .map(|(field, matcher)| (field.into(), matcher.into()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnSpec::Positional(names) => names.len(),
            ColumnSpec::Keyed(columns) => columns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Field name to column index, in field order.
///
/// Immutable once resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMapping {
    entries: Vec<(String, usize)>,
}

impl ColumnMapping {
    pub fn get(&self, field: &str) -> Option<usize> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, index)| *index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(name, index)| (name.as_str(), *index))
    }

    pub fn fields(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn insert(&mut self, field: String, index: usize) {
        if self.get(&field).is_none() {
            self.entries.push((field, index));
        }
    }

    fn is_taken(&self, index: usize) -> bool {
        self.entries.iter().any(|(_, taken)| *taken == index)
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for ColumnMapping {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        let mut mapping = ColumnMapping::default();
        for (field, index) in iter {
            mapping.insert(field.into(), index);
        }
        mapping
    }
}

/// Options of a [`ColumnMapper`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapperOptions {
    /// Lowercase headers (and exact matchers) before comparing them.
    pub normalize: bool,
    /// Append unmatched columns under their normalized header name.
    pub include_others: bool,
    /// Validate the header row before resolving the mapping.
    pub check_columns: bool,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            include_others: false,
            check_columns: true,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct HeaderNormalizer {
    lowercase: bool,
}

impl HeaderNormalizer {
    fn normalize(&self, value: &CellValue) -> String {
        self.normalize_str(&value.to_string())
    }

    fn normalize_str(&self, name: &str) -> String {
        let name = name.trim();
        if self.lowercase {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }
}

/// Resolves a [`ColumnSpec`] against header rows.
#[derive(Debug, Clone)]
pub struct ColumnMapper {
    spec: ColumnSpec,
    options: MapperOptions,
}

impl ColumnMapper {
    pub fn new(spec: ColumnSpec) -> Self {
        Self::with_options(spec, MapperOptions::default())
    }

    pub fn with_options(spec: ColumnSpec, options: MapperOptions) -> Self {
        Self { spec, options }
    }

    pub fn spec(&self) -> &ColumnSpec {
        &self.spec
    }

    pub fn options(&self) -> MapperOptions {
        self.options
    }

    /// Normalized form of a header cell: trimmed, lowercased unless
    /// normalization is disabled. Empty cells give an empty string.
    pub fn normalize_header(&self, value: &CellValue) -> String {
        self.normalizer().normalize(value)
    }

    /// Checks the header row, then builds the mapping.
    pub fn resolve(&self, header: &[CellValue]) -> WorkerResult<ColumnMapping> {
        if self.options.check_columns {
            self.check(header)?;
        }
        Ok(self.mapping(header))
    }

    /// Validates the header row against the expected columns.
    ///
    /// - positional: `WrongNumberOfColumns` when the lengths differ;
    /// - keyed: `DuplicatedColumns` when a matched header name appears more
    ///   than once (any header when other columns are included), then
    ///   `MissingColumns` naming the fields nothing matched.
    pub fn check(&self, header: &[CellValue]) -> WorkerResult<()> {
        match &self.spec {
            ColumnSpec::Positional(names) => {
                if names.len() != header.len() {
                    return Err(WorkerError::WrongNumberOfColumns {
                        actual: header.len(),
                        expected: names.len(),
                    });
                }
                Ok(())
            }
            ColumnSpec::Keyed(columns) => {
                let headers = self.normalized(header);
                self.check_duplicates(columns, &headers)?;
                self.check_missing(columns, &headers)
            }
        }
    }

    /// Builds the mapping without validating the header row.
    ///
    /// With a keyed spec, the first matching header wins; fields matching
    /// nothing are left out.
    pub fn mapping(&self, header: &[CellValue]) -> ColumnMapping {
        let columns = match &self.spec {
            ColumnSpec::Positional(names) => {
                return names.iter().cloned().zip(0..).collect();
            }
            ColumnSpec::Keyed(columns) => columns,
        };

        let normalizer = self.normalizer();
        let headers = self.normalized(header);

        let mut mapping = ColumnMapping::default();
        for (field, matcher) in columns {
            match headers
                .iter()
                .position(|name| matcher.matches(name, &normalizer))
            {
                Some(index) => mapping.insert(field.clone(), index),
                None => debug!("No column found for field {field}"),
            }
        }

        if self.options.include_others {
            for (index, name) in headers.into_iter().enumerate() {
                if !mapping.is_taken(index) {
                    mapping.insert(name, index);
                }
            }
        }

        mapping
    }

    fn normalizer(&self) -> HeaderNormalizer {
        HeaderNormalizer {
            lowercase: self.options.normalize,
        }
    }

    fn normalized(&self, header: &[CellValue]) -> Vec<String> {
        let normalizer = self.normalizer();
        header.iter().map(|cell| normalizer.normalize(cell)).collect()
    }

    fn check_duplicates(&self, columns: &[(String, Matcher)], headers: &[String]) -> WorkerResult<()> {
        let normalizer = self.normalizer();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut duplicates: Vec<String> = Vec::new();

        let checked = headers.iter().filter(|name| {
            self.options.include_others
                || columns
                    .iter()
                    .any(|(_, matcher)| matcher.matches(name, &normalizer))
        });

        for name in checked {
            let count = counts.entry(name.as_str()).or_default();
            *count += 1;
            if *count == 2 {
                duplicates.push(name.clone());
            }
        }

        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(WorkerError::DuplicatedColumns(duplicates))
        }
    }

    fn check_missing(&self, columns: &[(String, Matcher)], headers: &[String]) -> WorkerResult<()> {
        let normalizer = self.normalizer();
        let missing: Vec<String> = columns
            .iter()
            .filter(|(_, matcher)| !headers.iter().any(|name| matcher.matches(name, &normalizer)))
            .map(|(field, _)| field.clone())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(WorkerError::MissingColumns(missing))
        }
    }
}
