#![allow(dead_code)]

pub mod mocks;
pub mod workbook;

pub use mocks::*;
pub use workbook::workbook;

use std::io::Write;

use tempfile::NamedTempFile;

/// Routes `log` output to the test harness; `RUST_LOG=debug` shows the
/// wrapper chain.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A temporary file holding `content`, deleted when dropped.
pub fn fixture(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("fixture written");
    file
}
