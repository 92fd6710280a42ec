//! Entry-point watcher: rescans the mount registry when the host source changes on disk.

use crate::AppState;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use tracing::{info, warn};

/// Watch the directory holding the entry point (editors often replace the file rather than
/// write it in place) and refresh the snapshot on any event touching the file.
pub(crate) fn spawn_entry_point_watcher(state: AppState) -> notify::Result<()> {
    let entry_point = state.config.entry_point_path();
    let dir = entry_point
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let file_name = entry_point.file_name().map(|n| n.to_os_string());

    let (tx, rx) = channel();
    let mut watcher: RecommendedWatcher = Watcher::new(tx, Config::default())?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    let runtime = tokio::runtime::Handle::current();

    info!(target: "minihub::watch", path = %entry_point.display(), "watching entry point");

    std::thread::spawn(move || {
        // Dropping the watcher stops the event stream.
        let _watcher = watcher;
        for res in rx {
            match res {
                Ok(Event {
                    kind: EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_),
                    paths,
                    ..
                }) => {
                    if !paths.iter().any(|p| p.file_name() == file_name.as_deref()) {
                        continue;
                    }
                    let state = state.clone();
                    runtime.spawn(async move {
                        state.refresh_mounts("entry point changed").await;
                    });
                }
                Err(e) => warn!(target: "minihub::watch", error = ?e, "watch error"),
                _ => {}
            }
        }
    });

    Ok(())
}
