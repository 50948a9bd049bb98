//! Sink implementations

pub mod file;
pub mod memory;
pub mod stream;
#[cfg(unix)]
pub mod syslog;

pub use file::FileSink;
pub use memory::MemorySink;
pub use stream::StreamSink;
#[cfg(unix)]
pub use syslog::{Facility, SyslogOptions, SyslogSink};

pub use crate::core::Sink;
