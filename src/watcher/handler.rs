use crate::config::Rule;
use crate::logging::Logger;
use crate::upload::{SelectError, UploadQueue, Uploader, select_latest};
use crate::watcher::source::FsEvent;
use std::path::Path;
use std::sync::Arc;

/// Reacts to the events of a single rule.
///
/// Each event triggers a synchronous rescan of the event's directory. When
/// a file matches, the newest one is handed to the upload queue and the
/// handler returns without waiting for the upload.
#[derive(Clone)]
pub struct RuleHandler {
    rule: Arc<Rule>,
    uploader: Uploader,
    queue: UploadQueue,
    logger: Arc<dyn Logger>,
}

impl RuleHandler {
    pub fn new(
        rule: Arc<Rule>,
        uploader: Uploader,
        queue: UploadQueue,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            rule,
            uploader,
            queue,
            logger,
        }
    }

    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    /// Handles one event.
    ///
    /// - Returns `Ok(())` when no file matches; that is a normal outcome.
    /// - Returns [`SelectError`] if the directory scan fails; nothing is uploaded.
    /// - Upload failures are logged, never returned.
    pub fn handle(&self, event: &FsEvent) -> Result<(), SelectError> {
        let dir = match event.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let Some(candidate) = select_latest(dir, &self.rule.matcher)? else {
            return Ok(());
        };

        let target = candidate.path;
        self.logger
            .info(&format!("upload target file: {}", target.display()));

        let rule = Arc::clone(&self.rule);
        let uploader = self.uploader.clone();
        let logger = Arc::clone(&self.logger);

        self.queue.spawn(async move {
            match uploader.upload(&target, &rule).await {
                Ok(key) => logger.info(&format!(
                    "file uploaded. bucket: {}, key: {}",
                    rule.bucket, key
                )),
                Err(e) => logger.error(&format!(
                    "upload of {} for rule {} failed: {}",
                    target.display(),
                    rule.name,
                    e
                )),
            }
        });

        Ok(())
    }
}
