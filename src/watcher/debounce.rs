use crate::config::EventKind;
use crate::watcher::source::{Dispatch, FsEvent};
use std::{
    collections::HashMap,
    path::PathBuf,
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

const PRUNE_THRESHOLD: usize = 1024;

/// Holds each event back for `duration` and drops it if another event with
/// the same kind and path arrives in the meantime.
pub struct Debouncer {
    active_timers: HashMap<(EventKind, PathBuf), (mpsc::Sender<()>, Instant)>,
    output_tx: mpsc::Sender<Dispatch>,
    duration: Duration,
}

impl Debouncer {
    pub fn new(output_tx: mpsc::Sender<Dispatch>, duration: Duration) -> Self {
        Debouncer {
            active_timers: HashMap::new(),
            output_tx,
            duration,
        }
    }

    /// Runs until every sender of `input_rx` is gone.
    pub fn run(&mut self, input_rx: mpsc::Receiver<FsEvent>) {
        while let Ok(event) = input_rx.recv() {
            if self.duration.is_zero() {
                if self.output_tx.send(Dispatch::Event(event)).is_err() {
                    return;
                }
                continue;
            }

            let key = (event.kind, event.path.clone());

            // NOTE: the stored sender cancels the pending timer for this key
            if let Some((cancel, _)) = self.active_timers.remove(&key) {
                let _ = cancel.send(());
            }

            if self.active_timers.len() >= PRUNE_THRESHOLD {
                let now = Instant::now();
                self.active_timers.retain(|_, (_, deadline)| *deadline > now);
            }

            let (c_tx, c_rx) = mpsc::channel();
            let output_tx = self.output_tx.clone();
            let dur = self.duration;

            thread::spawn(move || {
                if let Err(mpsc::RecvTimeoutError::Timeout) = c_rx.recv_timeout(dur) {
                    let _ = output_tx.send(Dispatch::Event(event));
                }
            });

            self.active_timers.insert(key, (c_tx, Instant::now() + dur));
        }
    }
}
