use crate::config::EventKind;
use crate::watcher::source::FsEvent;
use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, RecommendedWatcher, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Maps a `notify` event on `path` onto the kinds rules can subscribe to.
///
/// A rename is reported as `Rename` on the old path and `Create` on the new
/// one. The paired `Name(Both)` event repeats both paths and is dropped.
/// Backends that cannot tell the two sides apart (`Name(Any)`) are resolved
/// by whether `path` still exists.
pub fn classify(kind: &notify::EventKind, path: &Path) -> Option<EventKind> {
    match kind {
        notify::EventKind::Create(_) => Some(EventKind::Create),
        notify::EventKind::Remove(_) => Some(EventKind::Remove),
        notify::EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => Some(EventKind::Rename),
            RenameMode::To => Some(EventKind::Create),
            RenameMode::Both => None,
            RenameMode::Any | RenameMode::Other => {
                if path.exists() {
                    Some(EventKind::Create)
                } else {
                    Some(EventKind::Rename)
                }
            }
        },
        notify::EventKind::Modify(ModifyKind::Metadata(_)) => Some(EventKind::Chmod),
        notify::EventKind::Modify(_) => Some(EventKind::Write),
        _ => None,
    }
}

/// Starts a watcher over `roots` (non-recursively) that forwards every
/// classified event, one per path, to `raw_event_tx`.
pub fn setup_file_watcher(
    roots: &[PathBuf],
    raw_event_tx: Sender<FsEvent>,
) -> Result<RecommendedWatcher, notify::Error> {
    let event_handler = move |res: Result<Event, notify::Error>| match res {
        Ok(event) => {
            for path in event.paths {
                if let Some(kind) = classify(&event.kind, &path) {
                    let _ = raw_event_tx.send(FsEvent { kind, path });
                }
            }
        }
        Err(e) => tracing::warn!(error = %e, "watch error"),
    };

    let mut watcher = RecommendedWatcher::new(event_handler, Config::default())?;
    for root in roots {
        watcher.watch(root, notify::RecursiveMode::NonRecursive)?;
    }

    Ok(watcher)
}
