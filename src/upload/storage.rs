use crate::config::StorageSettings;
use async_trait::async_trait;
use s3::Bucket;
use s3::creds::Credentials;
use s3::creds::error::CredentialsError;
use s3::region::Region;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

const DEFAULT_REGION: &str = "us-east-1";

/// How long a bucket handle keeps the credentials it was built with.
/// Instance-role and STS credentials typically live an hour or more.
pub const CREDENTIALS_REFRESH: Duration = Duration::from_secs(15 * 60);

type CredentialsLoader = dyn Fn() -> Result<Credentials, CredentialsError> + Send + Sync;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid region {region}: {reason}")]
    Region { region: String, reason: String },

    #[error("credentials unavailable: {0}")]
    Credentials(#[from] s3::creds::error::CredentialsError),

    #[error(transparent)]
    S3(#[from] s3::error::S3Error),

    #[error("bucket {0} rejected the object")]
    Rejected(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The object storage an upload is handed to.
///
/// Implementations must tolerate concurrent calls from several in-flight
/// uploads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<(), StorageError>;
}

struct CachedBucket {
    handle: Box<Bucket>,
    built: Instant,
}

/// S3 (or S3-compatible) storage backed by `rust-s3`.
///
/// Bucket handles are built lazily per bucket name and cached. A handle is
/// rebuilt with freshly loaded credentials once it is older than the refresh
/// interval, and dropped after a failed put so the next upload starts over.
pub struct S3Store {
    settings: StorageSettings,
    refresh_after: Duration,
    credentials: Box<CredentialsLoader>,
    buckets: Mutex<HashMap<String, CachedBucket>>,
}

impl S3Store {
    /// Access keys come from the environment, the shared credentials
    /// profile or the instance metadata service.
    pub fn new(settings: StorageSettings) -> Self {
        Self::with_credentials(settings, || Credentials::new(None, None, None, None, None))
    }

    pub fn with_credentials<F>(settings: StorageSettings, load: F) -> Self
    where
        F: Fn() -> Result<Credentials, CredentialsError> + Send + Sync + 'static,
    {
        Self {
            settings,
            refresh_after: CREDENTIALS_REFRESH,
            credentials: Box::new(load),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_refresh_interval(mut self, refresh_after: Duration) -> Self {
        self.refresh_after = refresh_after;
        self
    }

    fn region(&self) -> Result<Region, StorageError> {
        let name = self
            .settings
            .region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        if let Some(endpoint) = &self.settings.endpoint {
            return Ok(Region::Custom {
                region: name,
                endpoint: endpoint.clone(),
            });
        }

        name.parse::<Region>().map_err(|e| StorageError::Region {
            region: name.clone(),
            reason: e.to_string(),
        })
    }

    fn bucket(&self, name: &str) -> Result<Box<Bucket>, StorageError> {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = buckets.get(name) {
            if cached.built.elapsed() < self.refresh_after {
                return Ok(cached.handle.clone());
            }
            tracing::debug!(bucket = name, "rebuilding bucket handle with fresh credentials");
        }

        let credentials = (self.credentials)()?;
        let mut handle = Bucket::new(name, self.region()?, credentials)?;
        if self.settings.path_style {
            handle = handle.with_path_style();
        }

        buckets.insert(
            name.to_string(),
            CachedBucket {
                handle: handle.clone(),
                built: Instant::now(),
            },
        );
        Ok(handle)
    }

    fn forget(&self, name: &str) {
        self.buckets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        mut body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<(), StorageError> {
        let handle = self.bucket(bucket)?;
        if let Err(e) = handle.put_object_stream(&mut body, key).await {
            self.forget(bucket);
            return Err(e.into());
        }
        Ok(())
    }
}

/// Keeps uploaded objects in memory, keyed by `(bucket, key)`.
///
/// Buckets marked with [`MemoryStore::reject_bucket`] fail every put.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    rejected: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_bucket(&self, bucket: &str) {
        self.rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bucket.to_string());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// Every stored `(bucket, key)` pair, sorted.
    pub fn keys(&self) -> Vec<(String, String)> {
        let mut keys: Vec<_> = self
            .objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: &mut (dyn AsyncRead + Unpin + Send),
    ) -> Result<(), StorageError> {
        let rejected = self
            .rejected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(bucket);
        if rejected {
            return Err(StorageError::Rejected(bucket.to_string()));
        }

        let mut data = Vec::new();
        body.read_to_end(&mut data).await?;

        self.objects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((bucket.to_string(), key.to_string()), data);
        Ok(())
    }
}
