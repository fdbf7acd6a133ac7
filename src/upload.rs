//! Everything between "a rule fired" and "an object landed in a bucket":
//! picking the file, naming it, and shipping it.

pub mod queue;
pub mod selector;
pub mod storage;
pub mod uploader;

pub use queue::UploadQueue;
pub use selector::{CandidateFile, SelectError, pick_latest, select_latest};
pub use storage::{MemoryStore, ObjectStore, S3Store, StorageError};
pub use uploader::{UploadError, Uploader, object_key};
