pub mod debounce;
pub mod handler;
pub mod service;
pub mod source;
pub mod watcher;

pub use handler::RuleHandler;
pub use service::Supervisor;
pub use source::{EventCallback, EventSource, FsEvent, NotifySource, SourceError};
