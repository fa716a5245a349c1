mod entry;
mod event;
mod line;

pub use entry::{LogEntry, LogKind};
pub use event::{EventPayload, ExitReport, InstanceEvent};
pub use line::{StreamLine, StreamSource};
