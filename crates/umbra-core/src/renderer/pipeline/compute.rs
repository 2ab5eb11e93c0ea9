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

use crate::renderer::api::native::{ComputePipelineDesc, NativeHandle};
use crate::renderer::api::{Pipeline, ShaderType};
use crate::renderer::command::CommandBuffer;
use crate::renderer::error::{CommandError, PipelineError};
use crate::renderer::observer::DirtyFlag;
use crate::renderer::pipeline::{attach_shader, detach_shader};
use crate::renderer::resource::NativeObject;
use crate::renderer::shader::Shader;
use crate::renderer::signature::{ShaderSignature, SignatureLayout};
use crate::renderer::traits::{NativeDevice, ShaderSourceWatcher};
use std::fmt;
use std::sync::Arc;

/// A compute shader bound to a shader signature.
pub struct ComputePipelineState {
    device: Arc<dyn NativeDevice>,
    watcher: Option<Arc<dyn ShaderSourceWatcher>>,
    label: String,
    node_mask: u32,
    shader: Option<Arc<Shader>>,
    signature: Option<Arc<ShaderSignature>>,
    dirty: DirtyFlag,
    native: Option<Arc<NativeObject>>,
    built_root: NativeHandle,
    rebuilds: usize,
}

impl fmt::Debug for ComputePipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputePipelineState")
            .field("label", &self.label)
            .field("dirty", &self.dirty.is_dirty())
            .field("rebuilds", &self.rebuilds)
            .finish()
    }
}

impl ComputePipelineState {
    pub(crate) fn new(
        device: Arc<dyn NativeDevice>,
        watcher: Option<Arc<dyn ShaderSourceWatcher>>,
        label: impl Into<String>,
        node_mask: u32,
    ) -> Self {
        Self {
            device,
            watcher,
            label: label.into(),
            node_mask,
            shader: None,
            signature: None,
            dirty: DirtyFlag::new(true),
            native: None,
            built_root: NativeHandle::NULL,
            rebuilds: 0,
        }
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Assigns the compute shader.
    /// ## Errors
    /// * `PipelineError::InvalidShaderStage` - The shader is not a compute shader.
    pub fn set_shader(&mut self, shader: Arc<Shader>) -> Result<(), PipelineError> {
        if shader.stage() != ShaderType::COMPUTE {
            return Err(PipelineError::InvalidShaderStage(shader.stage()));
        }
        if let Some(previous) = self.shader.take() {
            detach_shader(&previous, &self.dirty, self.watcher.as_ref());
        }
        attach_shader(&shader, &self.dirty, self.watcher.as_ref());
        self.shader = Some(shader);
        self.dirty.mark();
        Ok(())
    }

    /// The compute shader.
    pub fn shader(&self) -> Option<&Arc<Shader>> {
        self.shader.as_ref()
    }

    /// Assigns the shader signature.
    pub fn set_shader_signature(&mut self, signature: Arc<ShaderSignature>) {
        self.signature = Some(signature);
        self.dirty.mark();
    }

    /// The shader signature.
    pub fn shader_signature(&self) -> Option<&Arc<ShaderSignature>> {
        self.signature.as_ref()
    }

    /// A handle to the pipeline's dirty flag.
    pub fn dirty_flag(&self) -> DirtyFlag {
        self.dirty.clone()
    }

    /// Returns `true` if the next bind rebuilds the native object.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty() || self.native.is_none()
    }

    /// Number of native objects built so far.
    pub fn rebuild_count(&self) -> usize {
        self.rebuilds
    }

    /// The native pipeline object, rebuilt first if anything changed.
    pub fn native_pipeline(&mut self) -> Result<NativeHandle, PipelineError> {
        Ok(self.prepare()?.0.handle())
    }

    pub(crate) fn prepare(
        &mut self,
    ) -> Result<(Arc<NativeObject>, Arc<SignatureLayout>), PipelineError> {
        let layout = self
            .signature
            .as_ref()
            .ok_or(PipelineError::MissingShaderSignature)?
            .compiled()?;

        let marked = self.dirty.take();
        if !marked && self.built_root == layout.root() {
            if let Some(native) = &self.native {
                return Ok((native.clone(), layout));
            }
        }

        let shader = match &self.shader {
            Some(shader) => shader,
            None => {
                self.dirty.mark();
                return Err(PipelineError::MissingShader(ShaderType::COMPUTE));
            }
        };
        let desc = ComputePipelineDesc {
            root_signature: layout.root(),
            cs: shader.bytecode(),
            node_mask: self.node_mask,
        };
        let handle = match self.device.create_compute_pipeline_state(&desc) {
            Ok(handle) => handle,
            Err(err) => {
                log::warn!("Failed to build compute pipeline '{}': {}", self.label, err);
                self.dirty.mark();
                return Err(err.into());
            }
        };
        self.device.set_name(handle, &self.label);
        log::debug!("Built compute pipeline '{}'", self.label);

        let native = Arc::new(NativeObject::owned(self.device.clone(), handle));
        self.native = Some(native.clone());
        self.built_root = layout.root();
        self.rebuilds += 1;
        Ok((native, layout))
    }

    /// Binds the pipeline and its signature on `cmd`.
    pub fn bind(&mut self, cmd: &mut CommandBuffer) -> Result<(), CommandError> {
        let (native, layout) = self.prepare()?;
        cmd.bind_pipeline_state(Pipeline::Compute, native)?;
        cmd.bind_signature_layout(Pipeline::Compute, layout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::device::{Device, DeviceDescriptor};
    use crate::renderer::shader::ShaderDescriptor;
    use crate::renderer::signature::ShaderParameter;
    use crate::renderer::traits::mock::{MockCommand, MockCommandList, MockDevice};
    use std::sync::atomic::Ordering;

    fn compute_pipeline(device: &Device) -> (ComputePipelineState, Arc<Shader>) {
        let shader = device
            .create_shader(ShaderDescriptor::new(ShaderType::COMPUTE, vec![7u8; 16]))
            .unwrap();
        let signature = device.create_shader_signature("particles");
        signature.set_parameters(vec![ShaderParameter::rw_buffer(0, ShaderType::COMPUTE)]);
        let mut pipeline = device.create_compute_pipeline("simulate");
        pipeline.set_shader(shader.clone()).unwrap();
        pipeline.set_shader_signature(signature);
        (pipeline, shader)
    }

    #[test]
    fn test_bind_builds_once() {
        let mock = MockDevice::new();
        let device = Device::new(mock.clone(), DeviceDescriptor::default()).unwrap();
        let (mut pipeline, shader) = compute_pipeline(&device);

        let mut cmd = device.queue(crate::renderer::api::QueueType::Compute).command_buffer().unwrap();
        pipeline.bind(&mut cmd).unwrap();
        pipeline.bind(&mut cmd).unwrap();
        assert_eq!(pipeline.rebuild_count(), 1);
        assert_eq!(mock.pipelines_created.load(Ordering::Relaxed), 1);

        let list: &MockCommandList = cmd.native_list().as_any().downcast_ref().unwrap();
        assert_eq!(list.count(|c| matches!(c, MockCommand::SetPipelineState(_))), 1);
        assert_eq!(
            list.count(|c| matches!(c, MockCommand::SetRootSignature(Pipeline::Compute, _))),
            1
        );

        shader.reload(vec![8u8; 16]);
        pipeline.bind(&mut cmd).unwrap();
        assert_eq!(pipeline.rebuild_count(), 2);
    }

    #[test]
    fn test_replaced_shader_no_longer_invalidates() {
        let device = Device::new(MockDevice::new(), DeviceDescriptor::default()).unwrap();
        let (mut pipeline, original) = compute_pipeline(&device);
        pipeline.native_pipeline().unwrap();

        let replacement = device
            .create_shader(ShaderDescriptor::new(ShaderType::COMPUTE, vec![9u8; 16]))
            .unwrap();
        pipeline.set_shader(replacement.clone()).unwrap();
        pipeline.native_pipeline().unwrap();
        assert_eq!(pipeline.rebuild_count(), 2);

        assert_eq!(original.reload(vec![1u8; 16]), 0);
        pipeline.native_pipeline().unwrap();
        assert_eq!(pipeline.rebuild_count(), 2);

        assert_eq!(replacement.reload(vec![2u8; 16]), 1);
        pipeline.native_pipeline().unwrap();
        assert_eq!(pipeline.rebuild_count(), 3);
    }

    #[test]
    fn test_rejects_graphics_stages() {
        let device = Device::new(MockDevice::new(), DeviceDescriptor::default()).unwrap();
        let mut pipeline = device.create_compute_pipeline("invalid");
        let vertex = device
            .create_shader(ShaderDescriptor::new(ShaderType::VERTEX, vec![1u8; 4]))
            .unwrap();
        assert_eq!(
            pipeline.set_shader(vertex),
            Err(PipelineError::InvalidShaderStage(ShaderType::VERTEX))
        );
        pipeline.set_shader_signature(device.create_shader_signature("empty"));
        assert_eq!(
            pipeline.native_pipeline(),
            Err(PipelineError::MissingShader(ShaderType::COMPUTE))
        );
        assert!(pipeline.is_dirty());
    }

    #[test]
    fn test_copy_queue_cannot_bind() {
        let device = Device::new(MockDevice::new(), DeviceDescriptor::default()).unwrap();
        let (mut pipeline, _) = compute_pipeline(&device);
        let mut cmd = device
            .queue(crate::renderer::api::QueueType::Copy)
            .command_buffer()
            .unwrap();
        assert!(matches!(
            pipeline.bind(&mut cmd),
            Err(CommandError::UnsupportedOnQueue { .. })
        ));
    }
}
