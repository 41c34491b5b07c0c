/// CSV input and output.
///
/// - [`csv_reader::CsvInputBuilder`] opens a CSV file (or any reader) as a
///   [`TabularRowStream`](crate::item::rows::TabularRowStream): the header row
///   is checked and mapped, data rows are yielded lazily as field maps.
/// - [`csv_writer::CsvOutputBuilder`] renders rows, optionally re-encoded,
///   and registers them on the job's model as a `text/csv` attachment.
///
/// Both default to `;` as delimiter.
///
/// # Examples
///
/// ```
/// use worker_tools::item::csv::{csv_reader::CsvInputBuilder, csv_writer::CsvOutputBuilder};
/// use worker_tools::item::mapping::ColumnSpec;
///
/// let rows = CsvInputBuilder::new()
///     .columns(ColumnSpec::keyed([("city", "City"), ("pop", "Population")]))
///     .from_reader("Population;City\n42695;Concord\n".as_bytes())?
///     .collect::<Result<Vec<_>, _>>()?;
///
/// let bytes = CsvOutputBuilder::new()
///     .headers([("city", "City"), ("pop", "Population")])
///     .build()
///     .render(rows)?;
///
/// assert_eq!(String::from_utf8(bytes).unwrap(), "City;Population\nConcord;42695\n");
/// # Ok::<(), worker_tools::WorkerError>(())
/// ```
pub mod csv_reader;

pub mod csv_writer;
