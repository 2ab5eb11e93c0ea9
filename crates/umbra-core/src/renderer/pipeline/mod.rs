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

//! Graphics and compute pipeline state objects.
//!
//! A pipeline state gathers shaders, a [`ShaderSignature`](crate::renderer::ShaderSignature)
//! and fixed-function state into one native pipeline object.
//!
//! # Architecture
//!
//! Each pipeline owns a [`DirtyFlag`](crate::renderer::DirtyFlag). Direct
//! setters mark it, and so do the pipeline's subscriptions: shader reloads,
//! shader source file changes reported by the watcher and render target
//! attachment changes. The flag is atomic, so these sources may fire from any
//! thread. `bind` checks the flag, rebuilds the native object when needed and
//! otherwise reuses the cached one. A failed rebuild leaves the pipeline dirty.

mod compute;
mod graphics;

pub use self::compute::ComputePipelineState;
pub use self::graphics::GraphicsPipelineState;

use crate::renderer::observer::DirtyFlag;
use crate::renderer::shader::Shader;
use crate::renderer::traits::ShaderSourceWatcher;
use std::sync::Arc;

/// Subscribes `dirty` to reloads of `shader` and to its source file.
fn attach_shader(
    shader: &Shader,
    dirty: &DirtyFlag,
    watcher: Option<&Arc<dyn ShaderSourceWatcher>>,
) {
    shader.subscribe(dirty);
    if let (Some(watcher), Some(path)) = (watcher, shader.source_path()) {
        watcher.watch(path, dirty);
    }
}

/// Undoes [`attach_shader`].
fn detach_shader(
    shader: &Shader,
    dirty: &DirtyFlag,
    watcher: Option<&Arc<dyn ShaderSourceWatcher>>,
) {
    shader.unsubscribe(dirty);
    if let (Some(watcher), Some(path)) = (watcher, shader.source_path()) {
        watcher.unwatch(path, dirty);
    }
}
