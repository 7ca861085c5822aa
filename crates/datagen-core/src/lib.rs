pub mod check;
pub mod config;
pub mod error;
pub mod generate;
pub mod graph;
pub mod manifest;
pub mod output;
pub mod rules;

// Re-export key types for convenience
pub use error::{DataGenError, Result};
pub use generate::{generate_data, GenerationOptions, Generator, Record, RunSummary, Value};
pub use manifest::{load_schema, load_schema_str, Schema};
pub use output::{CsvSink, MemorySink, RecordSink, SqlSink};
