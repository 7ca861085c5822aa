pub mod engine;
pub mod foreign_key;
pub mod pattern;
pub mod providers;
pub mod unique;
pub mod value;

pub use engine::{generate_data, GenerationOptions, Generator, RunSummary, TableSummary};
pub use value::{Record, Value};
