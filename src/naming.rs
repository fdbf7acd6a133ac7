use crate::config::Rule;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NamingError {
    #[error("hostname lookup failed: {0}")]
    Hostname(std::io::Error),

    #[error("naming failed: {0}")]
    Other(String),
}

/// Signature of a naming function: original file name and rule in,
/// destination file name out.
pub type NamingFn = dyn Fn(&str, &Rule) -> Result<String, NamingError> + Send + Sync;

/// The replaceable naming function shared by every rule.
///
/// Resolutions hold the read lock for the whole call, so they run in
/// parallel with each other and always finish with the function they
/// started with. [`NamingPolicy::replace`] takes the write lock and waits
/// for those calls to drain.
pub struct NamingPolicy {
    current: RwLock<Box<NamingFn>>,
}

impl NamingPolicy {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str, &Rule) -> Result<String, NamingError> + Send + Sync + 'static,
    {
        Self {
            current: RwLock::new(Box::new(f)),
        }
    }

    pub fn replace<F>(&self, f: F)
    where
        F: Fn(&str, &Rule) -> Result<String, NamingError> + Send + Sync + 'static,
    {
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Box::new(f);
    }

    pub fn resolve(&self, original: &str, rule: &Rule) -> Result<String, NamingError> {
        let f = self.current.read().unwrap_or_else(PoisonError::into_inner);
        (*f)(original, rule)
    }
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self::new(identity)
    }
}

impl std::fmt::Debug for NamingPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamingPolicy").finish_non_exhaustive()
    }
}

pub fn identity(original: &str, _rule: &Rule) -> Result<String, NamingError> {
    Ok(original.to_string())
}

/// Appends `-<hostname>` so several hosts can ship into one prefix.
pub fn host_suffix(original: &str, _rule: &Rule) -> Result<String, NamingError> {
    let host = system_hostname()?;
    Ok(format!("{original}-{host}"))
}

fn system_hostname() -> Result<String, NamingError> {
    let host = hostname::get()
        .map_err(NamingError::Hostname)?
        .into_string()
        .map_err(|raw| NamingError::Other(format!("hostname is not valid UTF-8: {raw:?}")))?;

    if host.is_empty() {
        return Err(NamingError::Other("hostname is empty".to_string()));
    }

    Ok(host)
}
