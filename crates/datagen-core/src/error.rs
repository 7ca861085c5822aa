//! # Error Types
//!
//! Defines `DataGenError`, the unified error enum for the fatal failure modes
//! of a generation run: manifest loading, configuration, and output. Every
//! variant carries the context (manifest path, table name, SQL snippet) needed
//! to debug without digging through logs.
//!
//! Rule and expression failures are *not* represented here. They are
//! recoverable by definition and live in [`crate::rules::EvalError`].

use std::path::PathBuf;

use thiserror::Error;

/// All fatal errors that can occur in datagen operations.
#[derive(Error, Debug)]
pub enum DataGenError {
    #[error("Failed to read manifest {}: {source}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest {origin}: {source}")]
    ManifestParse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Output error: {message}: {source}")]
    Output {
        message: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error for table '{table}': {source}")]
    Csv {
        table: String,
        #[source]
        source: csv::Error,
    },

    #[error("Database connection failed: {message}\n  Connection string: {connection_hint}\n  Cause: {source}")]
    Connection {
        message: String,
        connection_hint: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Insert failed on {table}: {message}\n  SQL: {sql_preview}\n  DB error: {source}")]
    InsertFailed {
        table: String,
        message: String,
        sql_preview: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Unsupported database scheme '{scheme}'. Supported: postgres://, mysql://, sqlite://")]
    UnsupportedDatabase { scheme: String },

    #[error("Strict mode: sink rejected record {record_index} of table '{table}': {message}")]
    SinkAborted {
        table: String,
        record_index: usize,
        message: String,
    },

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, DataGenError>;
