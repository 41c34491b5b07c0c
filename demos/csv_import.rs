use std::{env::temp_dir, fs};

use log::info;

use worker_tools::{
    WorkerResult,
    core::{
        job::{JobBuilder, JobContext, Worker},
        model::NoteLevel,
        repository::{InMemoryModelRepository, ModelRepository},
    },
    item::{
        csv::{csv_reader::CsvInputBuilder, csv_writer::CsvOutputBuilder},
        mapping::{ColumnSpec, Matcher},
        rows::Row,
    },
    wrapper::{
        benchmark::BenchmarkWrapper,
        counters::CountersWrapper,
        recorder::{LoggerWrapper, RecorderWrapper},
    },
};

const CARS: &str = "\
Year;Make;Model;Description
1948;Porsche;356;Luxury sports car
1967;Ford;Mustang fastback 1967;American car
;Unknown;?;Missing year
";

struct CarImport;

impl Worker for CarImport {
    fn model_kind(&self) -> &str {
        "car_import"
    }

    fn run(&mut self, ctx: &mut JobContext<'_>) -> WorkerResult<()> {
        let path = temp_dir().join("cars.csv");
        fs::write(&path, CARS).map_err(anyhow::Error::from)?;

        let rows = CsvInputBuilder::new()
            .columns(ColumnSpec::keyed([
                ("year", Matcher::from("Year")),
                ("make", Matcher::from("Make")),
                ("model", Matcher::pattern("model|type").map_err(anyhow::Error::from)?),
            ]))
            .from_path(&path)?;

        let mut cars: Vec<Row> = Vec::new();
        for row in rows {
            let row = row?;
            if row["year"].to_string().is_empty() {
                ctx.add_note(NoteLevel::Warning, format!("{} skipped", row["model"]));
                ctx.increment_counter("skips", 1);
                continue;
            }
            info!(target: ctx.log_target(), "Imported {} {}", row["make"], row["model"]);
            ctx.increment_counter("inserts", 1);
            cars.push(row);
        }

        CsvOutputBuilder::new()
            .headers([("make", "Make"), ("model", "Model"), ("year", "Year")])
            .target(temp_dir().join("car_export.csv"))
            .build()
            .write(ctx, cars)?;
        Ok(())
    }
}

fn main() -> WorkerResult<()> {
    env_logger::init();

    let repository = InMemoryModelRepository::new();
    let mut job = JobBuilder::new(CarImport)
        .name("car_import")
        .repository(&repository)
        .wrapper(LoggerWrapper)
        .wrapper(RecorderWrapper)
        .wrapper(BenchmarkWrapper)
        .wrapper(CountersWrapper::new(["inserts", "skips"]))
        .build()?;

    let model = repository.create("car_import")?;
    let execution = job.perform(model.id)?;

    println!(
        "Model {} ended as {} in {:?} with meta {}",
        execution.model.id,
        execution.model.state,
        execution.duration,
        serde_json::Value::Object(execution.model.meta.clone())
    );
    Ok(())
}
