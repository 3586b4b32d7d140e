/// Byte sources the monitor can read BMS telemetry from
use std::io;

use tokio::io::AsyncRead;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Something that can be (re)opened to yield a readable byte stream
///
/// The monitor only ever reads; opening may fail with any I/O error and
/// is retried by the caller.
pub trait ByteSource {
    type Stream: AsyncRead + Unpin + Send;

    /// Human-readable name for log messages
    fn describe(&self) -> &str;

    fn open(&mut self) -> io::Result<Self::Stream>;
}

/// Serial port connection to the BMS, 8N1 at the configured baud rate
#[derive(Debug, Clone)]
pub struct SerialSource {
    path: String,
    baud_rate: u32,
}

impl SerialSource {
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
        }
    }
}

impl ByteSource for SerialSource {
    type Stream = SerialStream;

    fn describe(&self) -> &str {
        &self.path
    }

    fn open(&mut self) -> io::Result<SerialStream> {
        tokio_serial::new(self.path.as_str(), self.baud_rate)
            .open_native_async()
            .map_err(io::Error::from)
    }
}

/// Short label for the transient error classes an open can fail with
pub fn open_failure_kind(err: &io::Error) -> &'static str {
    match err.kind() {
        io::ErrorKind::PermissionDenied => "permission denied",
        io::ErrorKind::NotFound => "not found",
        _ => "I/O error",
    }
}
