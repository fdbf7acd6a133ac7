//! # ora_beam
//!
//! Watches directories and ships the newest matching file to an S3 bucket
//! every time something changes next to it.
//!
//! ## Features
//!
//! - **Rule-driven watching**: each rule names a path, a file name prefix, an
//!   event kind, a bucket and a destination prefix
//! - **Newest-file selection**: every event rescans the directory and picks
//!   the most recently modified match, so rotated logs upload the live file
//! - **Pluggable naming**: the uploaded file name goes through a replaceable
//!   naming function, swappable while the watcher runs
//! - **Non-blocking uploads**: uploads run on a bounded tokio task pool and
//!   never stall event intake; `drain` waits for them on shutdown
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ora_beam::config::Config;
//! use ora_beam::upload::{S3Store, UploadQueue};
//! use ora_beam::watcher::{NotifySource, Supervisor};
//! use std::path::Path;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn start() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load(Path::new("beam.json"))?;
//! let source = Arc::new(NotifySource::new(Duration::from_millis(config.watch.debounce_ms)));
//! let store = Arc::new(S3Store::new(config.storage.clone()));
//! let queue = UploadQueue::new(tokio::runtime::Handle::current(), config.watch.max_uploads);
//!
//! let supervisor = Arc::new(Supervisor::new(config.rules, source, store, queue));
//! supervisor.set_naming_function(|name, _rule| Ok(format!("{name}-host1")));
//!
//! let runner = Arc::clone(&supervisor);
//! let dispatch = tokio::task::spawn_blocking(move || runner.run());
//!
//! // ... later
//! supervisor.close()?;
//! dispatch.await??;
//! supervisor.drain().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **[`config`]**: the JSON rule document and its validation
//! - **[`naming`]**: the shared, replaceable naming function
//! - **[`upload`]**: file selection, the uploader, the upload queue and stores
//! - **[`watcher`]**: event sources, per-rule handlers and the [`watcher::Supervisor`]
//! - **[`logging`]**: the logger capability and tracing setup
//! - **[`error`]**: the unified [`BeamError`]
//!
//! ## Error Handling
//!
//! Failures inside a single event or upload are logged and contained; they
//! never stop the dispatch loop. Only configuration and lifecycle errors
//! reach the caller, as [`BeamError`].

pub mod config;
pub mod error;
pub mod logging;
pub mod naming;
pub mod upload;
pub mod watcher;

pub use error::{BeamError, BeamResult};
