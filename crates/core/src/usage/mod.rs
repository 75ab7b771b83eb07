//! Usage module - per-call log entries and the recorder that writes them.

mod usage_model;
mod usage_recorder;
mod usage_traits;

pub use usage_model::{CallRecord, UsageLogEntry, UsageSummary};
pub use usage_recorder::UsageRecorder;
pub use usage_traits::{UsageLogReader, UsageLogSink};
