//! Wrappers shipped with the crate.
//!
//! | Name             | Wrapper                                  | Feature    |
//! |------------------|------------------------------------------|------------|
//! | `benchmark`      | [`benchmark::BenchmarkWrapper`]          |            |
//! | `counters`       | [`counters::CountersWrapper`]            |            |
//! | `recorder`       | [`recorder::RecorderWrapper`]            |            |
//! | `logger`         | `recorder::LoggerWrapper`                | `logger`   |
//! | `memory_usage`   | `memory_usage::MemoryUsageWrapper`       | `memory`   |
//! | `error_notifier` | `notifier::ErrorNotifierWrapper`         | `notifier` |
//!
//! Register them on a [`JobBuilder`](crate::core::job::JobBuilder) and list
//! their names, outermost first.

pub mod benchmark;

pub mod counters;

pub mod recorder;

#[cfg(feature = "memory")]
pub mod memory_usage;

#[cfg(feature = "notifier")]
pub mod notifier;
