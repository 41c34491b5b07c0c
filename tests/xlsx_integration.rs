mod common;

use std::{error::Error, fs};

use common::{MockEncoder, init_logger, workbook};
use mockall::predicate::function;
use tempfile::NamedTempFile;

use worker_tools::{
    WorkerError, WorkerResult,
    core::{
        job::{JobBuilder, JobContext, Worker},
        model::{JobState, NoteLevel},
        repository::{InMemoryModelRepository, ModelRepository},
    },
    item::{
        cell::CellValue,
        mapping::ColumnSpec,
        rows::Row,
        xlsx::{
            xlsx_reader::XlsxInputBuilder,
            xlsx_writer::{
                ColumnStyle, SheetContent, Workbook, XLSX_CONTENT_TYPE, XlsxOutputBuilder,
            },
        },
    },
};

/// Exports a fixed report through the given encoder.
struct Report {
    encoder: Option<MockEncoder>,
}

impl Worker for Report {
    fn model_kind(&self) -> &str {
        "report"
    }

    fn run(&mut self, ctx: &mut JobContext<'_>) -> WorkerResult<()> {
        let rows: Vec<Row> = vec![
            [
                ("amount".to_string(), CellValue::Float(12.5)),
                ("name".to_string(), CellValue::from("Alice")),
            ]
            .into_iter()
            .collect(),
            [("name".to_string(), CellValue::from("Bob"))]
                .into_iter()
                .collect(),
        ];

        let sheet = SheetContent::new("Sheet 1")
            .headers([("name", "Name"), ("amount", "Amount")])
            .rows(rows)
            .column_style(
                "name",
                ColumnStyle {
                    width: Some(30.0),
                    text_wrap: false,
                },
            );

        if let Some(encoder) = self.encoder.take() {
            XlsxOutputBuilder::new(encoder)
                .sheet(sheet)
                .build()
                .write(ctx)?;
        }
        Ok(())
    }
}

#[test]
fn report_is_laid_out_and_attached() -> Result<(), Box<dyn Error>> {
    init_logger();
    let mut encoder = MockEncoder::new();
    encoder
        .expect_encode()
        .with(function(|workbook: &Workbook| {
            let sheet = &workbook.sheets[0];
            sheet.label == "Sheet 1"
                && sheet.headers == ["Name", "Amount"]
                && sheet.rows == vec![vec!["Alice", "12.5"], vec!["Bob", ""]]
                && sheet.column_styles.len() == 2
                && sheet.column_styles[1].is_none()
        }))
        .times(1)
        .returning(|_| Ok(vec![0x50, 0x4b]));

    let repository = InMemoryModelRepository::new();
    let model = repository.create("report")?;
    let mut job = JobBuilder::new(Report {
        encoder: Some(encoder),
    })
    .repository(&repository)
    .build()?;

    let execution = job.perform(model.id)?;

    assert_eq!(execution.model.state, JobState::Complete);
    let attachment = &execution.model.attachments[0];
    assert_eq!(attachment.file_name, "report.xlsx");
    assert_eq!(attachment.content_type, XLSX_CONTENT_TYPE);
    assert_eq!(attachment.content, [0x50, 0x4b]);
    Ok(())
}

/// Reads a workbook that is not there.
struct MissingWorkbook;

impl Worker for MissingWorkbook {
    fn model_kind(&self) -> &str {
        "xlsx_import"
    }

    fn run(&mut self, _ctx: &mut JobContext<'_>) -> WorkerResult<()> {
        let rows = XlsxInputBuilder::new()
            .columns(ColumnSpec::positional(["a", "b"]))
            .from_path("does/not/exist.xlsx")?;
        assert_eq!(rows.count(), 0);
        Ok(())
    }
}

#[test]
fn missing_workbook_marks_the_model_empty() -> Result<(), Box<dyn Error>> {
    let repository = InMemoryModelRepository::new();
    let model = repository.create("xlsx_import")?;
    let mut job = JobBuilder::new(MissingWorkbook)
        .repository(&repository)
        .build()?;

    let execution = job.perform(model.id)?;

    assert_eq!(execution.model.state, JobState::Empty);
    Ok(())
}

/// Reads people and their towns from a workbook on disk.
struct TownImport {
    path: std::path::PathBuf,
}

impl Worker for TownImport {
    fn model_kind(&self) -> &str {
        "town_import"
    }

    fn run(&mut self, ctx: &mut JobContext<'_>) -> WorkerResult<()> {
        let rows = XlsxInputBuilder::new()
            .columns(ColumnSpec::keyed([("name", "Name"), ("town", "town")]))
            .from_path(&self.path)?;

        for row in rows {
            let row = row?;
            if row["town"] == CellValue::Empty {
                ctx.add_note(NoteLevel::Warning, format!("{} has no town", row["name"]));
                continue;
            }
            ctx.add_info(&format!("{}@{}", row["name"], row["town"]));
            ctx.increment_counter("inserts", 1);
        }
        Ok(())
    }
}

#[test]
fn workbook_rows_are_imported() -> Result<(), Box<dyn Error>> {
    init_logger();
    let file = NamedTempFile::new()?;
    fs::write(
        file.path(),
        workbook(&[
            &["Name", "TOWN", "Extra"],
            &[" Alice ", "Boston", ""],
            &["Bob"],
            &["Carol", "Concord", "x"],
        ]),
    )?;

    let repository = InMemoryModelRepository::new();
    let model = repository.create("town_import")?;
    let mut job = JobBuilder::new(TownImport {
        path: file.path().to_path_buf(),
    })
    .repository(&repository)
    .build()?;

    let execution = job.perform(model.id)?;

    assert_eq!(execution.model.state, JobState::CompleteWithWarnings);
    assert_eq!(execution.model.information, "Alice@Boston\nCarol@Concord\n");
    assert_eq!(execution.model.notes[0].message, "Bob has no town");
    assert_eq!(execution.model.meta["inserts"], 2);
    Ok(())
}

#[test]
fn short_rows_are_padded_and_other_columns_included() -> Result<(), Box<dyn Error>> {
    let rows: Vec<Row> = XlsxInputBuilder::new()
        .columns(ColumnSpec::keyed([("name", "name")]))
        .include_other_columns(true)
        .from_bytes(workbook(&[
            &["Name", "Town", "Extra"],
            &["Alice", "Boston"],
            &["Bob", "", "x"],
        ]))?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], CellValue::from("Alice"));
    assert_eq!(rows[0]["town"], CellValue::from("Boston"));
    assert_eq!(rows[0]["extra"], CellValue::Empty);
    assert_eq!(rows[1]["town"], CellValue::Empty);
    assert_eq!(rows[1]["extra"], CellValue::from("x"));
    Ok(())
}

#[test]
fn positional_columns_follow_the_sheet_order() -> Result<(), Box<dyn Error>> {
    let content = workbook(&[&["First", "Second"], &["1", "2"], &["3", "4"]]);

    let rows: Vec<Row> = XlsxInputBuilder::new()
        .columns(ColumnSpec::positional(["a", "b"]))
        .from_bytes(content.clone())?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["a"], CellValue::from("1"));
    assert_eq!(rows[1]["b"], CellValue::from("4"));

    let result = XlsxInputBuilder::new()
        .columns(ColumnSpec::positional(["a", "b", "c"]))
        .from_bytes(content);
    assert!(matches!(
        result,
        Err(WorkerError::WrongNumberOfColumns {
            actual: 2,
            expected: 3
        })
    ));
    Ok(())
}

#[test]
fn header_only_sheet_gives_no_rows() -> Result<(), Box<dyn Error>> {
    let rows = XlsxInputBuilder::new()
        .columns(ColumnSpec::keyed([("name", "Name"), ("town", "Town")]))
        .from_bytes(workbook(&[&["Name", "Town"]]))?;

    assert_eq!(rows.count(), 0);
    Ok(())
}

#[test]
fn duplicated_sheet_columns_are_rejected() {
    let result = XlsxInputBuilder::new()
        .columns(ColumnSpec::keyed([("name", "Name")]))
        .from_bytes(workbook(&[&["Name", " name "], &["Alice", "Bob"]]));

    assert!(matches!(result, Err(WorkerError::DuplicatedColumns(_))));
}

#[test]
fn cleanup_and_raw_headers_keep_the_declared_columns() -> Result<(), Box<dyn Error>> {
    let rows: Vec<Row> = XlsxInputBuilder::new()
        .columns(ColumnSpec::keyed([("name", "Name")]))
        .normalize_headers(false)
        .cleanup(|value| match value {
            CellValue::String(text) => CellValue::String(text.replace(' ', "_")),
            other => other,
        })
        .from_bytes(workbook(&[&["Name", "name"], &["Ada Lovelace", "x"]]))?
        .collect::<Result<_, _>>()?;

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], CellValue::from("Ada_Lovelace"));
    assert!(!rows[0].contains_key("Name"));
    Ok(())
}
