// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use anyhow::Context;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use umbra_core::renderer::{DirtyFlag, InvalidationList, ShaderSourceWatcher};

/// Routes file change notifications to the pipelines using the changed file.
///
/// Pipeline states subscribe through [`ShaderSourceWatcher::watch`]. Whatever
/// watches the file system (a platform watcher thread, an asset server, an
/// editor) sends the changed paths through [`sender`](Self::sender); the
/// owner of the router calls [`pump`](Self::pump) once per frame to mark the
/// subscribed pipelines dirty.
#[derive(Debug)]
pub struct FileChangeRouter {
    subscriptions: Mutex<HashMap<PathBuf, InvalidationList>>,
    sender: flume::Sender<PathBuf>,
    receiver: flume::Receiver<PathBuf>,
}

impl FileChangeRouter {
    /// Creates a router with an unbounded notification channel.
    pub fn new() -> Self {
        let (sender, receiver) = flume::unbounded();
        Self {
            subscriptions: Mutex::new(HashMap::new()),
            sender,
            receiver,
        }
    }

    /// Returns a sender for changed paths, usable from any thread.
    pub fn sender(&self) -> flume::Sender<PathBuf> {
        self.sender.clone()
    }

    /// Forwards changes to files under `root` into the router.
    ///
    /// The returned watcher stops forwarding when dropped; changes are
    /// applied on the next [`pump`](Self::pump).
    pub fn watch_directory(&self, root: &Path) -> anyhow::Result<RecommendedWatcher> {
        let sender = self.sender();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    log::warn!("File watcher error: {err}");
                    return;
                }
            };
            if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                for path in event.paths {
                    let _ = sender.send(path);
                }
            }
        })
        .context("Failed to create a file watcher")?;
        watcher
            .watch(root, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root.display()))?;
        log::info!("Watching shader sources under {}", root.display());
        Ok(watcher)
    }

    /// Marks every pipeline using `path` dirty.
    ///
    /// Returns the number of flags marked.
    pub fn notify_changed(&self, path: &Path) -> usize {
        let key = normalize(path);
        let mut subscriptions = self.subscriptions.lock().unwrap();
        let Some(list) = subscriptions.get(&key) else {
            log::trace!("No pipeline watches {}", key.display());
            return 0;
        };
        let marked = list.notify();
        if list.is_empty() {
            subscriptions.remove(&key);
        }
        log::debug!("{} changed, {} pipeline(s) will rebuild", key.display(), marked);
        marked
    }

    /// Handles every pending notification.
    ///
    /// Returns the number of flags marked.
    pub fn pump(&self) -> usize {
        self.receiver
            .try_iter()
            .map(|path| self.notify_changed(&path))
            .sum()
    }

    /// Number of paths with at least one subscription.
    pub fn watched_path_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }
}

impl Default for FileChangeRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderSourceWatcher for FileChangeRouter {
    fn watch(&self, path: &Path, flag: &DirtyFlag) {
        let key = normalize(path);
        log::trace!("Watching {}", key.display());
        self.subscriptions
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .subscribe(flag);
    }

    fn unwatch(&self, path: &Path, flag: &DirtyFlag) {
        let key = normalize(path);
        let mut subscriptions = self.subscriptions.lock().unwrap();
        if let Some(list) = subscriptions.get(&key) {
            list.unsubscribe(flag);
            if list.is_empty() {
                subscriptions.remove(&key);
            }
        }
    }
}

/// Resolves `path` so the same file always maps to the same key.
fn normalize(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_notify_marks_subscribed_flags() {
        let router = FileChangeRouter::new();
        let flag = DirtyFlag::new(false);
        let other = DirtyFlag::new(false);
        router.watch(Path::new("shaders/lit.hlsl"), &flag);
        router.watch(Path::new("shaders/sky.hlsl"), &other);
        assert_eq!(router.watched_path_count(), 2);

        assert_eq!(router.notify_changed(Path::new("shaders/lit.hlsl")), 1);
        assert!(flag.is_dirty());
        assert!(!other.is_dirty());
        assert_eq!(router.notify_changed(Path::new("shaders/unknown.hlsl")), 0);
    }

    #[test]
    fn test_dropped_flags_are_pruned() {
        let router = FileChangeRouter::new();
        let flag = DirtyFlag::new(false);
        router.watch(Path::new("shaders/post.hlsl"), &flag);
        drop(flag);
        assert_eq!(router.notify_changed(Path::new("shaders/post.hlsl")), 0);
        assert_eq!(router.watched_path_count(), 0);
    }

    #[test]
    fn test_unwatched_flags_are_not_marked() {
        let router = FileChangeRouter::new();
        let flag = DirtyFlag::new(false);
        let path = Path::new("shaders/tonemap.hlsl");
        router.watch(path, &flag);
        router.unwatch(path, &flag);
        assert_eq!(router.watched_path_count(), 0);
        assert_eq!(router.notify_changed(path), 0);
        assert!(!flag.is_dirty());
    }

    #[test]
    fn test_pump_handles_changes_sent_from_other_threads() {
        let router = FileChangeRouter::new();
        let flag = DirtyFlag::new(false);
        router.watch(Path::new("shaders/blur.hlsl"), &flag);

        let sender = router.sender();
        thread::spawn(move || {
            sender
                .send(PathBuf::from("shaders/blur.hlsl"))
                .expect("router is alive");
        })
        .join()
        .expect("sender thread panicked");

        assert_eq!(router.pump(), 1);
        assert!(flag.take());
        assert_eq!(router.pump(), 0);
    }

    #[test]
    fn test_watching_a_missing_directory_fails() {
        let router = FileChangeRouter::new();
        assert!(router
            .watch_directory(Path::new("/nonexistent/umbra/shaders"))
            .is_err());
    }
}
