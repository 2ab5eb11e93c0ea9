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

use crate::renderer::api::native::{GraphicsPipelineDesc, NativeHandle};
use crate::renderer::api::{Pipeline, PrimitiveRestart, PrimitiveTopology, ShaderType};
use crate::renderer::command::CommandBuffer;
use crate::renderer::error::{CommandError, PipelineError};
use crate::renderer::observer::DirtyFlag;
use crate::renderer::pipeline::{attach_shader, detach_shader};
use crate::renderer::render_target::RenderTarget;
use crate::renderer::resource::NativeObject;
use crate::renderer::shader::Shader;
use crate::renderer::signature::{ShaderSignature, SignatureLayout};
use crate::renderer::state::{BlendState, DepthStencilState, RasterizerState};
use crate::renderer::traits::{NativeDevice, ShaderSourceWatcher};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

const MAX_PATCH_CONTROL_POINTS: u32 = 32;

/// Shaders, a signature, a render target and fixed-function state, built
/// into one native pipeline object on demand.
pub struct GraphicsPipelineState {
    device: Arc<dyn NativeDevice>,
    watcher: Option<Arc<dyn ShaderSourceWatcher>>,
    label: String,
    node_mask: u32,
    shaders: HashMap<ShaderType, Arc<Shader>>,
    signature: Option<Arc<ShaderSignature>>,
    render_target: Option<Arc<RenderTarget>>,
    rasterizer: RasterizerState,
    depth_stencil: DepthStencilState,
    blend: BlendState,
    topology: PrimitiveTopology,
    patch_control_points: u32,
    primitive_restart: PrimitiveRestart,
    dirty: DirtyFlag,
    native: Option<Arc<NativeObject>>,
    built_root: NativeHandle,
    rebuilds: usize,
}

impl fmt::Debug for GraphicsPipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsPipelineState")
            .field("label", &self.label)
            .field("stages", &self.shaders.keys().collect::<Vec<_>>())
            .field("topology", &self.topology)
            .field("dirty", &self.dirty.is_dirty())
            .field("rebuilds", &self.rebuilds)
            .finish()
    }
}

impl GraphicsPipelineState {
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
            shaders: HashMap::new(),
            signature: None,
            render_target: None,
            rasterizer: RasterizerState::new(),
            depth_stencil: DepthStencilState::new(),
            blend: BlendState::new(),
            topology: PrimitiveTopology::TriangleList,
            patch_control_points: 0,
            primitive_restart: PrimitiveRestart::Disabled,
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

    /// Assigns `shader` to its stage, replacing any previous shader there.
    ///
    /// The pipeline subscribes to reloads of the shader and, when a watcher
    /// is installed, to changes of its source file.
    /// ## Errors
    /// * `PipelineError::InvalidShaderStage` - The shader is not a graphics stage.
    pub fn set_shader(&mut self, shader: Arc<Shader>) -> Result<(), PipelineError> {
        let stage = shader.stage();
        if !ShaderType::ALL_GRAPHICS.contains(stage) || !stage.is_single_stage() {
            return Err(PipelineError::InvalidShaderStage(stage));
        }
        if let Some(previous) = self.shaders.remove(&stage) {
            detach_shader(&previous, &self.dirty, self.watcher.as_ref());
        }
        attach_shader(&shader, &self.dirty, self.watcher.as_ref());
        self.shaders.insert(stage, shader);
        self.dirty.mark();
        Ok(())
    }

    /// Removes the shader of `stage` and its subscriptions.
    pub fn remove_shader(&mut self, stage: ShaderType) -> Option<Arc<Shader>> {
        let removed = self.shaders.remove(&stage)?;
        detach_shader(&removed, &self.dirty, self.watcher.as_ref());
        self.dirty.mark();
        Some(removed)
    }

    /// The shader of `stage`.
    pub fn shader(&self, stage: ShaderType) -> Option<&Arc<Shader>> {
        self.shaders.get(&stage)
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

    /// Assigns the render target whose formats the pipeline is built for.
    pub fn set_render_target(&mut self, render_target: Arc<RenderTarget>) {
        if let Some(previous) = self.render_target.take() {
            previous.unsubscribe(&self.dirty);
        }
        render_target.subscribe(&self.dirty);
        self.render_target = Some(render_target);
        self.dirty.mark();
    }

    /// The render target.
    pub fn render_target(&self) -> Option<&Arc<RenderTarget>> {
        self.render_target.as_ref()
    }

    /// Replaces the rasterizer state.
    pub fn set_rasterizer_state(&mut self, state: RasterizerState) {
        self.rasterizer = state;
        self.dirty.mark();
    }

    /// The rasterizer state. Changes through this reference are picked up by the next bind.
    pub fn rasterizer_state_mut(&mut self) -> &mut RasterizerState {
        &mut self.rasterizer
    }

    /// Replaces the depth/stencil state.
    pub fn set_depth_stencil_state(&mut self, state: DepthStencilState) {
        self.depth_stencil = state;
        self.dirty.mark();
    }

    /// The depth/stencil state. Changes through this reference are picked up by the next bind.
    pub fn depth_stencil_state_mut(&mut self) -> &mut DepthStencilState {
        &mut self.depth_stencil
    }

    /// Replaces the blend state.
    pub fn set_blend_state(&mut self, state: BlendState) {
        self.blend = state;
        self.dirty.mark();
    }

    /// The blend state. Changes through this reference are picked up by the next bind.
    pub fn blend_state_mut(&mut self) -> &mut BlendState {
        &mut self.blend
    }

    /// Sets the input assembler topology.
    pub fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.topology = topology;
        self.dirty.mark();
    }

    /// The input assembler topology.
    pub fn primitive_topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Sets the control point count of [`PrimitiveTopology::PatchList`].
    pub fn set_patch_control_points(&mut self, points: u32) {
        self.patch_control_points = points;
        self.dirty.mark();
    }

    /// The patch control point count.
    pub fn patch_control_points(&self) -> u32 {
        self.patch_control_points
    }

    /// Sets the strip-cut value of strip topologies.
    pub fn set_primitive_restart(&mut self, restart: PrimitiveRestart) {
        self.primitive_restart = restart;
        self.dirty.mark();
    }

    /// The strip-cut value.
    pub fn primitive_restart(&self) -> PrimitiveRestart {
        self.primitive_restart
    }

    /// A handle to the pipeline's dirty flag, for external invalidation sources.
    pub fn dirty_flag(&self) -> DirtyFlag {
        self.dirty.clone()
    }

    /// Returns `true` if the next bind rebuilds the native object.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_dirty()
            || self.native.is_none()
            || self.rasterizer.is_dirty()
            || self.depth_stencil.is_dirty()
            || self.blend.is_dirty()
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
        let signature = self
            .signature
            .as_ref()
            .ok_or(PipelineError::MissingShaderSignature)?;
        let layout = match signature.compiled() {
            Ok(layout) => layout,
            Err(err) => {
                self.dirty.mark();
                return Err(err.into());
            }
        };

        let marked = self.dirty.take();
        let states_dirty =
            self.rasterizer.is_dirty() || self.depth_stencil.is_dirty() || self.blend.is_dirty();
        let root_changed = self.built_root != layout.root();

        if !marked && !states_dirty && !root_changed {
            if let Some(native) = &self.native {
                return Ok((native.clone(), layout));
            }
        }

        match self.build(&layout) {
            Ok(native) => {
                let native = Arc::new(native);
                self.native = Some(native.clone());
                self.built_root = layout.root();
                self.rebuilds += 1;
                Ok((native, layout))
            }
            Err(err) => {
                log::warn!("Failed to build graphics pipeline '{}': {}", self.label, err);
                self.dirty.mark();
                Err(err)
            }
        }
    }

    fn validate_stages(&self) -> Result<(), PipelineError> {
        if !self.shaders.contains_key(&ShaderType::VERTEX) {
            return Err(PipelineError::MissingShader(ShaderType::VERTEX));
        }
        let hull = self.shaders.contains_key(&ShaderType::TESSELLATION_CONTROL);
        let domain = self.shaders.contains_key(&ShaderType::TESSELLATION_EVALUATION);
        if hull != domain {
            return Err(PipelineError::IncompleteTessellation);
        }
        let patches = self.topology == PrimitiveTopology::PatchList;
        if hull != patches {
            return Err(PipelineError::TessellationTopologyMismatch);
        }
        if patches && !(1..=MAX_PATCH_CONTROL_POINTS).contains(&self.patch_control_points) {
            return Err(PipelineError::InvalidPatchControlPoints(
                self.patch_control_points,
            ));
        }
        Ok(())
    }

    fn build(&mut self, layout: &SignatureLayout) -> Result<NativeObject, PipelineError> {
        self.validate_stages()?;
        let formats = self
            .render_target
            .as_ref()
            .ok_or(PipelineError::MissingRenderTarget)?
            .target_formats()?;

        let bytecode = |stage| self.shaders.get(&stage).map(|s| s.bytecode());
        let input_layout = self
            .shaders
            .get(&ShaderType::VERTEX)
            .map(|s| s.input_layout())
            .unwrap_or_default();
        let desc = GraphicsPipelineDesc {
            root_signature: layout.root(),
            vs: bytecode(ShaderType::VERTEX),
            ps: bytecode(ShaderType::PIXEL),
            ds: bytecode(ShaderType::TESSELLATION_EVALUATION),
            hs: bytecode(ShaderType::TESSELLATION_CONTROL),
            gs: bytecode(ShaderType::GEOMETRY),
            blend_state: self.blend.blend_desc(),
            sample_mask: self.blend.sample_mask(),
            rasterizer_state: self.rasterizer.rasterizer_desc(),
            depth_stencil_state: self.depth_stencil.depth_stencil_desc(),
            input_layout,
            ib_strip_cut_value: self.primitive_restart.to_native(),
            primitive_topology_type: self.topology.to_native_type(),
            num_render_targets: formats.num_render_targets,
            rtv_formats: formats.rtv_formats,
            dsv_format: formats.dsv_format,
            sample_desc: formats.sample_desc,
            node_mask: self.node_mask,
        };

        let handle = self.device.create_graphics_pipeline_state(&desc)?;
        self.device.set_name(handle, &self.label);
        log::debug!(
            "Built graphics pipeline '{}' ({} render targets, dsv {:?})",
            self.label,
            desc.num_render_targets,
            desc.dsv_format
        );
        Ok(NativeObject::owned(self.device.clone(), handle))
    }

    /// Binds the pipeline, its signature, render target and dynamic state on `cmd`.
    ///
    /// Rebuilds the native object first if the pipeline is dirty.
    pub fn bind(&mut self, cmd: &mut CommandBuffer) -> Result<(), CommandError> {
        let (native, layout) = self.prepare()?;
        cmd.bind_pipeline_state(Pipeline::Graphics, native)?;
        cmd.bind_signature_layout(Pipeline::Graphics, layout)?;
        cmd.set_primitive_topology(self.topology, self.patch_control_points)?;
        if let Some(render_target) = &self.render_target {
            cmd.bind_render_target(render_target)?;
        }
        self.rasterizer.bind(cmd)?;
        self.depth_stencil.bind(cmd)?;
        self.blend.bind(cmd)?;
        Ok(())
    }
}
