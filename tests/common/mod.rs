#![allow(dead_code)]

use ora_beam::BeamResult;
use ora_beam::config::{EventKind, Rule};
use ora_beam::logging::Logger;
use ora_beam::watcher::{EventCallback, EventSource, FsEvent, SourceError};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

pub fn rule(name: &str, matcher: &str, dest: &str, bucket: &str, event: EventKind) -> Rule {
    Rule {
        name: name.to_string(),
        matcher: matcher.to_string(),
        dest: dest.to_string(),
        bucket: bucket.to_string(),
        event,
    }
}

/// Writes `contents` to `path` and backdates its modification time.
pub fn write_aged(path: &Path, contents: &str, age: Duration) -> io::Result<()> {
    fs::write(path, contents)?;
    let file = OpenOptions::new().write(true).open(path)?;
    file.set_modified(SystemTime::now() - age)?;
    Ok(())
}

/// An event source driven by the test itself.
///
/// `run` returns right away; events are pushed with [`ManualSource::emit`].
#[derive(Default)]
pub struct ManualSource {
    registrations: Mutex<Vec<(String, EventKind, EventCallback)>>,
    closed: Mutex<bool>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invokes every callback registered for `kind` and returns their results.
    pub fn emit(&self, kind: EventKind, path: PathBuf) -> Vec<BeamResult<()>> {
        let event = FsEvent { kind, path };
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, callback)| callback(&event))
            .collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.registrations
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _, _)| name.clone())
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

impl EventSource for ManualSource {
    fn register(
        &self,
        name: &str,
        kind: EventKind,
        callback: EventCallback,
    ) -> Result<(), SourceError> {
        self.registrations
            .lock()
            .unwrap()
            .push((name.to_string(), kind, callback));
        Ok(())
    }

    fn run(&self) -> Result<(), SourceError> {
        Ok(())
    }

    fn close(&self) -> Result<(), SourceError> {
        *self.closed.lock().unwrap() = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingLogger {
    pub infos: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}
