#![cfg_attr(docsrs, feature(doc_cfg))]

/*!
 # Worker Tools

 Building blocks for background jobs that import and export tabular files
 while keeping a persisted record (the *job model*) of every execution.

 ## Core Concepts

- **Worker:** your job definition. It names the model kind it works on and
  implements `run`; optional hooks cover run modes, custom resets and error
  policies.
- **Job:** a worker bound to a `ModelRepository` and a list of wrappers. Each
  `perform` drives one model from `running` to a terminal state
  (`complete`, `complete_with_warnings`, `failed` or `empty`).
- **Wrapper:** a named step running code around the rest of the chain
  (benchmark, counters, recorder, error notification...). The first listed
  wrapper is the outermost one.
- **ColumnMapper / TabularRowStream:** check the header row of a CSV or XLSX
  file, map fields to columns and stream the data rows as field maps.

 ## Features

| **Feature** | **Description**                                              |
|-------------|--------------------------------------------------------------|
| csv         | CSV input and output (`csv`, `encoding_rs`)                  |
| xlsx        | XLSX input (`calamine`) and workbook output                  |
| memory      | `memory_usage` wrapper (`sysinfo`)                           |
| notifier    | `error_notifier` wrapper with Slack and RocketChat payloads |
| logger      | `logger` wrapper                                             |
| full        | Enables all available features                               |

 ## Getting Started

```toml
[dependencies]
worker-tools = { version = "<version>", features = ["<full|csv|xlsx|...>"] }
```

```rust
# use worker_tools::{
#     core::{
#         job::{JobBuilder, JobContext, Worker},
#         model::JobState,
#         repository::{InMemoryModelRepository, ModelRepository},
#     },
#     item::{csv::csv_reader::CsvInputBuilder, mapping::ColumnSpec},
#     wrapper::{benchmark::BenchmarkWrapper, counters::CountersWrapper},
#     WorkerResult,
# };
struct CityImport {
    data: &'static str,
}

impl Worker for CityImport {
    fn model_kind(&self) -> &str {
        "city_import"
    }

    fn run(&mut self, ctx: &mut JobContext<'_>) -> WorkerResult<()> {
        let rows = CsvInputBuilder::new()
            .columns(ColumnSpec::keyed([("city", "City"), ("country", "Country")]))
            .from_reader(self.data.as_bytes())?;

        for row in rows {
            let row = row?;
            ctx.add_info(&format!("{} ({})", row["city"], row["country"]));
            ctx.increment_counter("inserts", 1);
        }
        Ok(())
    }
}

# fn main() -> WorkerResult<()> {
let repository = InMemoryModelRepository::new();
let mut job = JobBuilder::new(CityImport {
    data: "City;Country\nBoston;United States\nConcord;United States\n",
})
.repository(&repository)
.wrapper(BenchmarkWrapper)
.wrapper(CountersWrapper::new(["inserts"]))
.build()?;

let model = repository.create("city_import")?;
let execution = job.perform(model.id)?;

assert_eq!(execution.model.state, JobState::Complete);
assert_eq!(execution.model.meta["inserts"], 2);
# Ok(())
# }
```
*/

/// Core module for workers, jobs, models and wrapper chains
pub mod core;

/// Error types for worker operations
pub mod error;

#[doc(inline)]
pub use error::*;

/// Tabular input and output: column mapping, row streams, CSV and XLSX
pub mod item;

/// Wrappers shipped with the crate
pub mod wrapper;
