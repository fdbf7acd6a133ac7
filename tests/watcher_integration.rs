mod common;

use common::{RecordingLogger, rule};
use ora_beam::BeamError;
use ora_beam::config::EventKind;
use ora_beam::upload::{MemoryStore, UploadQueue};
use ora_beam::watcher::{EventCallback, EventSource, FsEvent, NotifySource, Supervisor};
use std::fs;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn ignore() -> EventCallback {
    Box::new(|_: &FsEvent| Ok::<(), BeamError>(()))
}

fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if done() {
            return true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    done()
}

#[test]
fn created_file_is_uploaded_through_notify() -> Result<(), BeamError> {
    let runtime = tokio::runtime::Runtime::new()?;
    let tmpdir = TempDir::new()?;
    let dir = tmpdir.path().canonicalize()?;

    let store = Arc::new(MemoryStore::new());
    let logger = Arc::new(RecordingLogger::default());
    let supervisor = Arc::new(
        Supervisor::new(
            vec![rule(
                &dir.display().to_string(),
                "app",
                "logs",
                "bucket",
                EventKind::Create,
            )],
            Arc::new(NotifySource::new(Duration::from_millis(50))),
            store.clone(),
            UploadQueue::new(runtime.handle().clone(), 2),
        )
        .with_logger(logger.clone()),
    );

    let runner = Arc::clone(&supervisor);
    let dispatch = thread::spawn(move || runner.run());

    // Give the watcher time to register before touching the directory.
    thread::sleep(Duration::from_millis(500));
    fs::write(dir.join("app_1.log"), "hello")?;
    fs::write(dir.join("unrelated.txt"), "ignored")?;

    let uploaded = wait_for(Duration::from_secs(5), || {
        store.get("bucket", "logs/app_1.log").is_some()
    });

    supervisor.close()?;
    dispatch.join().expect("dispatch thread panicked")?;
    runtime.block_on(supervisor.drain());

    assert!(uploaded, "created file should be uploaded, logs: {:?}", logger.infos());
    assert_eq!(store.get("bucket", "logs/app_1.log"), Some(b"hello".to_vec()));
    assert!(
        store.keys().iter().all(|(_, key)| key == "logs/app_1.log"),
        "only the matching file is uploaded: {:?}",
        store.keys()
    );
    Ok(())
}

fn recorder(seen: &Arc<Mutex<Vec<FsEvent>>>) -> EventCallback {
    let seen = Arc::clone(seen);
    Box::new(move |event: &FsEvent| {
        seen.lock().unwrap().push(event.clone());
        Ok::<(), BeamError>(())
    })
}

#[cfg(target_os = "linux")]
#[test]
fn rename_fires_once_on_each_side() -> Result<(), BeamError> {
    let tmpdir = TempDir::new()?;
    let dir = tmpdir.path().canonicalize()?;
    let old = dir.join("hoge.log");
    let new = dir.join("hoge.log.1");
    fs::write(&old, "rotated")?;

    let renamed = Arc::new(Mutex::new(Vec::new()));
    let created = Arc::new(Mutex::new(Vec::new()));
    let name = dir.display().to_string();
    let source = Arc::new(NotifySource::new(Duration::ZERO));
    source.register(&name, EventKind::Rename, recorder(&renamed))?;
    source.register(&name, EventKind::Create, recorder(&created))?;

    let runner = Arc::clone(&source);
    let dispatch = thread::spawn(move || runner.run());

    thread::sleep(Duration::from_millis(500));
    fs::rename(&old, &new)?;

    let settled = wait_for(Duration::from_secs(5), || {
        !renamed.lock().unwrap().is_empty() && !created.lock().unwrap().is_empty()
    });
    // Leave room for any duplicate dispatch to arrive before counting.
    thread::sleep(Duration::from_millis(300));

    source.close()?;
    dispatch.join().expect("dispatch thread panicked")?;

    assert!(settled, "both sides of the rename should be dispatched");
    assert_eq!(
        *renamed.lock().unwrap(),
        vec![FsEvent {
            kind: EventKind::Rename,
            path: old,
        }]
    );
    assert_eq!(
        *created.lock().unwrap(),
        vec![FsEvent {
            kind: EventKind::Create,
            path: new,
        }]
    );
    Ok(())
}

#[test]
fn close_stops_an_idle_dispatch_loop() -> Result<(), BeamError> {
    let tmpdir = TempDir::new()?;
    let source = Arc::new(NotifySource::new(Duration::ZERO));
    source.register(
        &tmpdir.path().display().to_string(),
        EventKind::Write,
        ignore(),
    )?;

    let runner = Arc::clone(&source);
    let dispatch = thread::spawn(move || runner.run());

    thread::sleep(Duration::from_millis(200));
    source.close()?;

    let finished = wait_for(Duration::from_secs(5), || dispatch.is_finished());
    assert!(finished, "run should return after close");
    dispatch.join().expect("dispatch thread panicked")?;
    Ok(())
}

#[test]
fn run_after_close_returns_immediately() -> Result<(), BeamError> {
    let source = NotifySource::new(Duration::ZERO);
    source.close()?;
    source.run()?;

    assert!(source
        .register("/tmp", EventKind::Create, ignore())
        .is_err());
    Ok(())
}

#[test]
fn watching_a_missing_path_fails_run() {
    let tmpdir = TempDir::new().unwrap();
    let missing = tmpdir.path().join("does-not-exist");

    let source = NotifySource::new(Duration::ZERO);
    source
        .register(
            &missing.display().to_string(),
            EventKind::Create,
            ignore(),
        )
        .unwrap();

    assert!(source.run().is_err());
}
