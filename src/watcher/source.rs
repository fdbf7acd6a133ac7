use crate::config::EventKind;
use crate::error::BeamResult;
use crate::watcher::{debounce::Debouncer, watcher::setup_file_watcher};
use notify::RecommendedWatcher;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex, PoisonError,
        mpsc::{Sender, channel},
    },
    thread,
    time::Duration,
};
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("watch failed: {0}")]
    Notify(#[from] notify::Error),

    #[error("event source is already running")]
    AlreadyRunning,

    #[error("event source is closed")]
    Closed,
}

/// A filesystem change delivered to rule handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub kind: EventKind,
    pub path: PathBuf,
}

pub type EventCallback = Box<dyn Fn(&FsEvent) -> BeamResult<()> + Send + Sync>;

/// Delivers filesystem events to registered callbacks.
///
/// `run` blocks the calling thread until `close` is called from elsewhere.
/// Errors returned by callbacks are reported by the source and never stop
/// the dispatch loop.
pub trait EventSource: Send + Sync {
    fn register(&self, name: &str, kind: EventKind, callback: EventCallback)
    -> Result<(), SourceError>;

    fn run(&self) -> Result<(), SourceError>;

    fn close(&self) -> Result<(), SourceError>;
}

/// Message consumed by the [`NotifySource`] dispatch loop.
pub enum Dispatch {
    Event(FsEvent),
    Stop,
}

struct Registration {
    name: String,
    root: PathBuf,
    kind: EventKind,
    callback: EventCallback,
}

impl Registration {
    /// The watched path itself, or a direct child of it.
    fn covers(&self, path: &Path) -> bool {
        path == self.root || path.parent() == Some(self.root.as_path())
    }
}

#[derive(Default)]
struct State {
    running: bool,
    closed: bool,
    stop_tx: Option<Sender<Dispatch>>,
    watcher: Option<RecommendedWatcher>,
}

/// [`EventSource`] backed by `notify`, with optional per-path debouncing.
///
/// Each registration name is a path to watch. Events are routed to every
/// registration whose path is the event path or its parent directory and
/// whose kind matches.
pub struct NotifySource {
    debounce: Duration,
    registrations: Mutex<Vec<Arc<Registration>>>,
    state: Mutex<State>,
}

impl NotifySource {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            registrations: Mutex::new(Vec::new()),
            state: Mutex::new(State::default()),
        }
    }

    fn dispatch(registrations: &[Arc<Registration>], event: &FsEvent) {
        for registration in registrations {
            if registration.kind != event.kind || !registration.covers(&event.path) {
                continue;
            }

            debug!(rule = %registration.name, path = %event.path.display(), kind = %event.kind, "dispatching event");
            if let Err(e) = (registration.callback)(event) {
                error!(
                    rule = %registration.name,
                    path = %event.path.display(),
                    error = %e,
                    "event handler failed"
                );
            }
        }
    }
}

impl EventSource for NotifySource {
    fn register(
        &self,
        name: &str,
        kind: EventKind,
        callback: EventCallback,
    ) -> Result<(), SourceError> {
        if self.state.lock().unwrap_or_else(PoisonError::into_inner).closed {
            return Err(SourceError::Closed);
        }

        // Watch roots are compared against event paths, which notify reports
        // in canonical form on some platforms.
        let root = fs::canonicalize(name).unwrap_or_else(|_| PathBuf::from(name));

        self.registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(Registration {
                name: name.to_string(),
                root,
                kind,
                callback,
            }));
        Ok(())
    }

    fn run(&self) -> Result<(), SourceError> {
        {
            let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                return Ok(());
            }
            if state.running {
                return Err(SourceError::AlreadyRunning);
            }
        }

        let registrations = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut roots: Vec<PathBuf> = Vec::new();
        for registration in &registrations {
            if !roots.contains(&registration.root) {
                roots.push(registration.root.clone());
            }
        }

        let (raw_tx, raw_rx) = channel::<FsEvent>();
        let (dispatch_tx, dispatch_rx) = channel::<Dispatch>();

        let watcher = setup_file_watcher(&roots, raw_tx)?;

        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.closed {
                return Ok(());
            }
            state.running = true;
            state.stop_tx = Some(dispatch_tx.clone());
            state.watcher = Some(watcher);
        }

        let mut debouncer = Debouncer::new(dispatch_tx, self.debounce);

        // NOTE: exits on its own once the watcher is dropped and its sender with it
        thread::spawn(move || {
            debouncer.run(raw_rx);
        });

        info!(watches = roots.len(), rules = registrations.len(), "dispatch loop started");

        while let Ok(Dispatch::Event(event)) = dispatch_rx.recv() {
            Self::dispatch(&registrations, &event);
        }

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.running = false;
        state.stop_tx.take();
        state.watcher.take();

        info!("dispatch loop stopped");
        Ok(())
    }

    fn close(&self) -> Result<(), SourceError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;

        if let Some(stop_tx) = state.stop_tx.take() {
            let _ = stop_tx.send(Dispatch::Stop);
        }
        state.watcher.take();

        Ok(())
    }
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registrations = self
            .registrations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("NotifySource")
            .field("debounce", &self.debounce)
            .field("registrations", &registrations)
            .finish()
    }
}
