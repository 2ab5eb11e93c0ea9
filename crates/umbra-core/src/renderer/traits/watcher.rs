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

//! The resource loader / file watcher collaborator.

use crate::renderer::observer::DirtyFlag;
use std::fmt::Debug;
use std::path::Path;

/// Notifies subscribers when a shader source file changes.
///
/// Pipeline states subscribe for the source path of every shader they use;
/// a change marks the subscribed flag dirty from whichever thread the
/// watcher runs on.
pub trait ShaderSourceWatcher: Send + Sync + Debug {
    /// Subscribes `flag` to changes of the file at `path`.
    fn watch(&self, path: &Path, flag: &DirtyFlag);

    /// Removes the subscription of `flag` to the file at `path`.
    fn unwatch(&self, path: &Path, flag: &DirtyFlag);
}
