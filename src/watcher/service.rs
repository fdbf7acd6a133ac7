use std::{
    collections::HashSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    config::Rule,
    error::{BeamError, BeamResult},
    logging::{Logger, TracingLogger},
    naming::{NamingError, NamingPolicy},
    upload::{ObjectStore, UploadQueue, Uploader},
    watcher::{
        handler::RuleHandler,
        source::{EventSource, FsEvent},
    },
};

/// Owns the rule handlers and drives the event source.
///
/// `run` blocks, so it usually lives on its own thread (or in
/// `spawn_blocking`) while another task calls `close` and then `drain`.
pub struct Supervisor {
    rules: Vec<Arc<Rule>>,
    source: Arc<dyn EventSource>,
    naming: Arc<NamingPolicy>,
    uploader: Uploader,
    queue: UploadQueue,
    logger: Arc<dyn Logger>,
    started: AtomicBool,
}

impl Supervisor {
    pub fn new(
        rules: Vec<Rule>,
        source: Arc<dyn EventSource>,
        store: Arc<dyn ObjectStore>,
        queue: UploadQueue,
    ) -> Self {
        let naming = Arc::new(NamingPolicy::default());
        let uploader = Uploader::new(Arc::clone(&naming), store);

        Supervisor {
            rules: rules.into_iter().map(Arc::new).collect(),
            source,
            naming,
            uploader,
            queue,
            logger: Arc::new(TracingLogger),
            started: AtomicBool::new(false),
        }
    }

    /// Replaces the logger that upload outcomes are reported to.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Installs a new naming function. Safe to call while `run` is active;
    /// resolutions already in progress finish with the previous function.
    pub fn set_naming_function<F>(&self, f: F)
    where
        F: Fn(&str, &Rule) -> Result<String, NamingError> + Send + Sync + 'static,
    {
        self.naming.replace(f);
    }

    /// Registers one handler per rule and blocks in the event source's
    /// dispatch loop until it stops.
    pub fn run(&self) -> BeamResult<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(BeamError::AlreadyRunning);
        }

        let mut names = HashSet::new();
        for rule in &self.rules {
            if !names.insert(rule.name.as_str()) {
                tracing::warn!(rule = %rule.name, "rule name registered more than once");
            }

            let handler = RuleHandler::new(
                Arc::clone(rule),
                self.uploader.clone(),
                self.queue.clone(),
                Arc::clone(&self.logger),
            );
            self.source.register(
                &rule.name,
                rule.event,
                Box::new(move |event: &FsEvent| Ok(handler.handle(event)?)),
            )?;
        }

        self.logger.info("ora-beam start");
        self.source.run()?;
        Ok(())
    }

    /// Stops event intake. Uploads already queued keep running; see
    /// [`Supervisor::drain`].
    pub fn close(&self) -> BeamResult<()> {
        self.logger.info("ora-beam stopping..");
        self.source.close()?;
        Ok(())
    }

    /// Waits for every upload queued so far to finish.
    pub async fn drain(&self) {
        self.queue.drain().await;
    }

    pub fn in_flight(&self) -> usize {
        self.queue.in_flight()
    }

    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }
}
