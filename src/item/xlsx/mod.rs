/// XLSX input and output.
///
/// Reading is backed by `calamine` and always uses the first worksheet.
/// Writing lays rows out into a [`xlsx_writer::Workbook`]; turning it into
/// bytes is left to a [`xlsx_writer::SpreadsheetEncoder`].
pub mod xlsx_reader;

pub mod xlsx_writer;
