pub mod formats;
pub mod writer;

pub use formats::{JsonFormat, OutputFormat, ReportFormat, TextFormat};
pub use writer::WriterSink;
