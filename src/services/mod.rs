pub mod failure_writer;
pub mod report_writer;
pub mod stage_executor;
pub mod url_guard;

pub use failure_writer::FailureWriter;
pub use report_writer::{ReportSink, ReportWriter};
pub use stage_executor::{HttpBackend, PipelineStageExecutor, StageBackend, StageExecutor};
