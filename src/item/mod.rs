/// Cell values shared by every tabular input and output.
pub mod cell;

/// Header checks and field-to-column mappings.
pub mod mapping;

/// Lazy row streams over tabular sources.
pub mod rows;

/// Rows handed to output adapters.
pub mod output;

#[cfg(feature = "csv")]
/// CSV input and output adapters.
pub mod csv;

#[cfg(feature = "xlsx")]
/// XLSX input and output adapters.
pub mod xlsx;
