use rand::distr::{Alphanumeric, SampleString};

pub mod job;

pub mod model;

pub mod repository;

pub mod wrapper;

/// Generates a random name consisting of alphanumeric characters.
///
/// # Returns
///
/// A `String` containing the generated random name.
fn build_name() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 8)
}
