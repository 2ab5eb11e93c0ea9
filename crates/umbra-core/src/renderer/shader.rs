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

//! Compiled shader programs.

use crate::renderer::api::native::{InputElementDesc, ShaderBytecode};
use crate::renderer::api::ShaderType;
use crate::renderer::error::PipelineError;
use crate::renderer::observer::{DirtyFlag, InvalidationList};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A descriptor used to create a [`Shader`].
#[derive(Debug, Clone)]
pub struct ShaderDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<&'a str>,
    /// The stage the bytecode was compiled for. Must be a single stage.
    pub stage: ShaderType,
    /// Compiled bytecode supplied by the resource loader.
    pub bytecode: ShaderBytecode,
    /// Vertex input layout, only meaningful for vertex shaders.
    pub input_layout: Vec<InputElementDesc>,
    /// Source file watched for changes, if any.
    pub source_path: Option<PathBuf>,
}

impl<'a> ShaderDescriptor<'a> {
    /// A descriptor for `stage` with no input layout and no source path.
    pub fn new(stage: ShaderType, bytecode: impl Into<ShaderBytecode>) -> Self {
        Self {
            label: None,
            stage,
            bytecode: bytecode.into(),
            input_layout: Vec::new(),
            source_path: None,
        }
    }
}

struct ShaderCode {
    bytecode: ShaderBytecode,
    input_layout: Vec<InputElementDesc>,
}

/// Bytecode for one pipeline stage.
///
/// Pipelines that use a shader subscribe to it; [`Shader::reload`] marks
/// every subscriber dirty so the next bind rebuilds with the new code.
pub struct Shader {
    label: String,
    stage: ShaderType,
    source_path: Option<PathBuf>,
    code: Mutex<ShaderCode>,
    listeners: InvalidationList,
}

impl fmt::Debug for Shader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shader")
            .field("label", &self.label)
            .field("stage", &self.stage)
            .field("source_path", &self.source_path)
            .finish()
    }
}

impl Shader {
    /// Creates a shader from a descriptor.
    /// ## Errors
    /// * `PipelineError::InvalidShaderStage` - The stage is empty or names several stages.
    /// * `PipelineError::MissingShader` - The bytecode is empty.
    pub fn new(descriptor: ShaderDescriptor<'_>) -> Result<Self, PipelineError> {
        if !descriptor.stage.is_single_stage() {
            return Err(PipelineError::InvalidShaderStage(descriptor.stage));
        }
        if descriptor.bytecode.is_empty() {
            return Err(PipelineError::MissingShader(descriptor.stage));
        }
        Ok(Self {
            label: descriptor.label.unwrap_or("shader").to_string(),
            stage: descriptor.stage,
            source_path: descriptor.source_path,
            code: Mutex::new(ShaderCode {
                bytecode: descriptor.bytecode,
                input_layout: descriptor.input_layout,
            }),
            listeners: InvalidationList::new(),
        })
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The stage this shader runs in.
    pub fn stage(&self) -> ShaderType {
        self.stage
    }

    /// The watched source file, if any.
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// The current bytecode.
    pub fn bytecode(&self) -> ShaderBytecode {
        self.code.lock().unwrap().bytecode.clone()
    }

    /// The vertex input layout.
    pub fn input_layout(&self) -> Vec<InputElementDesc> {
        self.code.lock().unwrap().input_layout.clone()
    }

    /// Replaces the bytecode and invalidates every pipeline using the shader.
    ///
    /// Returns the number of pipelines that were invalidated.
    pub fn reload(&self, bytecode: impl Into<ShaderBytecode>) -> usize {
        self.code.lock().unwrap().bytecode = bytecode.into();
        let notified = self.listeners.notify();
        log::debug!(
            "Reloaded shader '{}', invalidated {} pipeline(s)",
            self.label,
            notified
        );
        notified
    }

    /// Replaces the input layout and invalidates every pipeline using the shader.
    pub fn set_input_layout(&self, input_layout: Vec<InputElementDesc>) {
        self.code.lock().unwrap().input_layout = input_layout;
        self.listeners.notify();
    }

    /// Subscribes `flag` to bytecode changes.
    pub fn subscribe(&self, flag: &DirtyFlag) {
        self.listeners.subscribe(flag);
    }

    /// Stops marking `flag` on bytecode changes.
    pub fn unsubscribe(&self, flag: &DirtyFlag) {
        self.listeners.unsubscribe(flag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::native::Format;

    #[test]
    fn test_shader_requires_single_stage_and_code() {
        let multi = ShaderDescriptor::new(
            ShaderType::VERTEX.union(ShaderType::PIXEL),
            vec![0u8; 4],
        );
        assert_eq!(
            Shader::new(multi).unwrap_err(),
            PipelineError::InvalidShaderStage(ShaderType::VERTEX.union(ShaderType::PIXEL))
        );
        let empty = ShaderDescriptor::new(ShaderType::PIXEL, Vec::<u8>::new());
        assert_eq!(
            Shader::new(empty).unwrap_err(),
            PipelineError::MissingShader(ShaderType::PIXEL)
        );
    }

    #[test]
    fn test_reload_marks_subscribers() {
        let mut descriptor = ShaderDescriptor::new(ShaderType::VERTEX, vec![1u8, 2, 3]);
        descriptor.input_layout = vec![InputElementDesc::per_vertex(
            "POSITION",
            0,
            Format::R32G32B32Float,
            0,
            0,
        )];
        let shader = Shader::new(descriptor).unwrap();
        let flag = DirtyFlag::new(false);
        shader.subscribe(&flag);
        shader.subscribe(&flag);

        assert_eq!(shader.reload(vec![4u8, 5]), 1);
        assert!(flag.is_dirty());
        assert_eq!(&*shader.bytecode(), &[4u8, 5]);
        assert_eq!(shader.input_layout().len(), 1);

        drop(flag);
        assert_eq!(shader.reload(vec![6u8]), 0);
    }
}
