use thiserror::Error;

#[derive(Debug, Error)]
pub enum BeamError {
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    #[error(transparent)]
    Select(#[from] crate::upload::SelectError),

    #[error(transparent)]
    Naming(#[from] crate::naming::NamingError),

    #[error(transparent)]
    Upload(#[from] crate::upload::UploadError),

    #[error(transparent)]
    Storage(#[from] crate::upload::StorageError),

    #[error(transparent)]
    Source(#[from] crate::watcher::source::SourceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("supervisor is already running")]
    AlreadyRunning,
}

pub type BeamResult<T> = Result<T, BeamError>;
