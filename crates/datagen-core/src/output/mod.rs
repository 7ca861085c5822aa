//! # Record Sinks
//!
//! Where generated records go. The orchestrator hands each finished record
//! to a [`RecordSink`] one at a time, in generation order, and calls
//! [`RecordSink::finish`] once at the end of the run (also on a strict-mode
//! abort) so buffered sinks can flush.
//!
//! - [`csv::CsvSink`]: one `<table>.csv` file per table.
//! - [`direct::SqlSink`]: one `INSERT` per record into PostgreSQL, MySQL or
//!   SQLite.
//! - [`memory::MemorySink`]: keeps everything in memory (preview, tests).

pub mod csv;
pub mod direct;
pub mod memory;

use std::future::Future;

use crate::error::Result;
use crate::generate::value::Record;

pub use self::csv::CsvSink;
pub use self::direct::{DatabaseType, SqlSink};
pub use self::memory::MemorySink;

/// An output destination for generated records.
pub trait RecordSink {
    /// Write one record of `table`. Called sequentially; the next call is
    /// not made until the returned future completes.
    fn insert_record(
        &mut self,
        table: &str,
        record: &Record,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Flush and release anything the sink holds open.
    fn finish(&mut self) -> impl Future<Output = Result<()>> + Send;
}
