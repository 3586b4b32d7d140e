pub mod decoder;
pub mod frame;
pub mod monitor;
pub mod source;
pub mod sync;

pub use monitor::BmsMonitor;
pub use source::SerialSource;
