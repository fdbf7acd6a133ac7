use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown event name: {0}")]
    UnknownEvent(String),

    #[error("rule #{index} has an empty `{field}`")]
    EmptyField { index: usize, field: &'static str },

    #[error("config has no rules")]
    NoRules,
}

/// Filesystem event kinds a rule can react to.
///
/// The string tags are the ones accepted in the `event_name` config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "Create",
            EventKind::Write => "Write",
            EventKind::Remove => "Remove",
            EventKind::Rename => "Rename",
            EventKind::Chmod => "Chmod",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Create" => Ok(EventKind::Create),
            "Write" => Ok(EventKind::Write),
            "Remove" => Ok(EventKind::Remove),
            "Rename" => Ok(EventKind::Rename),
            "Chmod" => Ok(EventKind::Chmod),
            other => Err(ConfigError::UnknownEvent(other.to_string())),
        }
    }
}

/// One watch-and-upload binding.
///
/// `name` is the path handed to the event source, `matcher` the file name
/// prefix (a glob fragment) looked for in the directory of each event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub name: String,
    pub matcher: String,
    pub dest: String,
    pub bucket: String,
    pub event: EventKind,
}

/// A `conf_list` entry as written, before its `event_name` is checked.
#[derive(Deserialize)]
struct RuleEntry {
    name: String,
    matcher: String,
    dest: String,
    bucket: String,
    event_name: String,
}

impl TryFrom<RuleEntry> for Rule {
    type Error = ConfigError;

    fn try_from(entry: RuleEntry) -> Result<Self, Self::Error> {
        Ok(Rule {
            event: entry.event_name.parse()?,
            name: entry.name,
            matcher: entry.matcher,
            dest: entry.dest,
            bucket: entry.bucket,
        })
    }
}

/// Connection settings for the S3 store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Region name. Falls back to `AWS_REGION`, then `us-east-1`.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services.
    pub endpoint: Option<String>,
    pub path_style: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WatchSettings {
    /// Quiet period per path and event kind before an event is dispatched.
    /// Zero dispatches every event as it arrives.
    pub debounce_ms: u64,
    /// Upper bound on uploads running at the same time.
    pub max_uploads: usize,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: 0,
            max_uploads: 8,
        }
    }
}

/// The process configuration document.
#[derive(Debug, Clone)]
pub struct Config {
    pub rules: Vec<Rule>,
    pub storage: StorageSettings,
    pub watch: WatchSettings,
}

#[derive(Deserialize)]
struct ConfigFile {
    conf_list: Vec<RuleEntry>,
    #[serde(default)]
    storage: StorageSettings,
    #[serde(default)]
    watch: WatchSettings,
}

impl Config {
    /// Reads and validates the config file at `path`.
    ///
    /// - Returns [`ConfigError::Read`] if the file cannot be read.
    /// - Returns [`ConfigError::Parse`] for malformed JSON.
    /// - Returns [`ConfigError::UnknownEvent`] for an unrecognized `event_name`.
    /// - Returns [`ConfigError::EmptyField`] / [`ConfigError::NoRules`] on validation failure.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(raw)?;
        let config = Config {
            rules: file
                .conf_list
                .into_iter()
                .map(Rule::try_from)
                .collect::<Result<_, _>>()?,
            storage: file.storage,
            watch: file.watch,
        };
        config.validate()?;

        for name in config.duplicate_names() {
            tracing::warn!(name, "several rules share this name; each one is registered");
        }

        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.rules.is_empty() {
            return Err(ConfigError::NoRules);
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if rule.name.trim().is_empty() {
                return Err(ConfigError::EmptyField { index, field: "name" });
            }
            if rule.bucket.trim().is_empty() {
                return Err(ConfigError::EmptyField {
                    index,
                    field: "bucket",
                });
            }
        }

        Ok(())
    }

    /// Rule names that appear more than once, in first-seen order.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut duplicates = Vec::new();

        for rule in &self.rules {
            let name = rule.name.as_str();
            if !seen.insert(name) && reported.insert(name) {
                duplicates.push(name);
            }
        }

        duplicates
    }
}
