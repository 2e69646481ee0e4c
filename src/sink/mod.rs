//! Optional publishing sinks for extracted records.

mod elastic;
pub use elastic::BulkIndexSink;
