//! File watching for the envelope store directory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc as async_mpsc;

/// Events emitted by the slot watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotEvent {
    /// A slot file was created or rewritten
    Changed(PathBuf),

    /// A slot file was deleted
    Removed(PathBuf),
}

/// Watches a store directory for slot files changing on disk.
pub struct SlotWatcher {
    _watcher: RecommendedWatcher,
}

impl SlotWatcher {
    /// Create a watcher for `dir`.
    ///
    /// Returns the watcher and a channel to receive events. Events stop when
    /// the watcher is dropped.
    pub fn new(dir: &Path) -> Result<(Self, async_mpsc::Receiver<SlotEvent>), std::io::Error> {
        let (sync_tx, sync_rx) = mpsc::channel();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(std::io::Error::other)?;

        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(std::io::Error::other)?;

        std::thread::spawn(move || debounce(sync_rx, async_tx, QUIET_PERIOD));

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

/// Time a slot file must stay untouched before its change is forwarded.
const QUIET_PERIOD: Duration = Duration::from_millis(100);

/// Coalesce bursts of raw events per path and forward the latest one once
/// `quiet` has passed without further events. Runs until either channel
/// closes.
fn debounce(
    raw: mpsc::Receiver<notify::Event>,
    out: async_mpsc::Sender<SlotEvent>,
    quiet: Duration,
) {
    let mut pending: HashMap<PathBuf, SlotEvent> = HashMap::new();

    loop {
        let received = if pending.is_empty() {
            raw.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            raw.recv_timeout(quiet)
        };

        match received {
            Ok(event) => {
                for path in event.paths {
                    if let Some(slot_event) = classify_event(&path, &event.kind) {
                        pending.insert(path, slot_event);
                    }
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                for (_, slot_event) in pending.drain() {
                    if out.blocking_send(slot_event).is_err() {
                        return;
                    }
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                for (_, slot_event) in pending.drain() {
                    let _ = out.blocking_send(slot_event);
                }
                return;
            }
        }
    }
}

/// Classify a notify event into a SlotEvent.
fn classify_event(path: &Path, kind: &notify::EventKind) -> Option<SlotEvent> {
    use notify::EventKind;

    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }

    match kind {
        EventKind::Create(_) | EventKind::Modify(_) => Some(SlotEvent::Changed(path.to_path_buf())),
        EventKind::Remove(_) => Some(SlotEvent::Removed(path.to_path_buf())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn classifies_only_json_files() {
        use notify::event::{CreateKind, RemoveKind};
        use notify::EventKind;

        let slot = Path::new("/store/counter.json");

        assert_eq!(
            classify_event(slot, &EventKind::Create(CreateKind::File)),
            Some(SlotEvent::Changed(slot.to_path_buf()))
        );
        assert_eq!(
            classify_event(slot, &EventKind::Remove(RemoveKind::File)),
            Some(SlotEvent::Removed(slot.to_path_buf()))
        );
        assert_eq!(
            classify_event(Path::new("/store/.counter.json.tmp"), &EventKind::Create(CreateKind::File)),
            None
        );
    }

    #[tokio::test]
    async fn watches_slot_files() {
        let temp = tempdir().unwrap();

        // Create the watcher first (so it catches file creation)
        let (watcher, mut rx) = SlotWatcher::new(temp.path()).unwrap();

        // Give inotify time to set up
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(temp.path().join("counter.json"), "{}").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        // Keep watcher alive until we're done
        drop(watcher);

        assert!(event.is_ok(), "timeout waiting for slot watch event");
        assert!(
            matches!(event.unwrap(), Some(SlotEvent::Changed(_))),
            "expected a change event"
        );
    }

    #[test]
    fn forwards_each_write_after_quiet_period() {
        use notify::event::{DataChange, ModifyKind};
        use notify::EventKind;

        let (raw_tx, raw_rx) = mpsc::channel();
        let (out_tx, mut out_rx) = async_mpsc::channel(10);
        let worker = std::thread::spawn(move || debounce(raw_rx, out_tx, Duration::from_millis(20)));

        let slot = PathBuf::from("/store/counter.json");
        let write = || {
            notify::Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Content)))
                .add_path(slot.clone())
        };

        // A burst of writes collapses into one event
        raw_tx.send(write()).unwrap();
        raw_tx.send(write()).unwrap();
        assert_eq!(out_rx.blocking_recv(), Some(SlotEvent::Changed(slot.clone())));

        // A write right after the first burst is still forwarded
        raw_tx.send(write()).unwrap();
        assert_eq!(out_rx.blocking_recv(), Some(SlotEvent::Changed(slot.clone())));

        drop(raw_tx);
        worker.join().unwrap();
        assert_eq!(out_rx.blocking_recv(), None);
    }

    #[tokio::test]
    async fn watches_consecutive_writes() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("counter.json");
        let (watcher, mut rx) = SlotWatcher::new(temp.path()).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        fs::write(&path, r#"{"v":1}"#).unwrap();
        let first = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;
        assert!(matches!(first, Ok(Some(SlotEvent::Changed(_)))));

        fs::write(&path, r#"{"v":2}"#).unwrap();
        let second = tokio::time::timeout(Duration::from_secs(3), rx.recv()).await;

        drop(watcher);
        assert!(
            matches!(second, Ok(Some(SlotEvent::Changed(_)))),
            "second write was not forwarded"
        );
        assert_eq!(fs::read_to_string(&path).unwrap(), r#"{"v":2}"#);
    }
}
