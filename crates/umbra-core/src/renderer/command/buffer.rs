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

use super::dynamic_heap::DynamicDescriptorHeap;
use super::upload::UploadHeap;
use crate::renderer::api::native::{
    self, CpuDescriptorHandle, DescriptorHeapType, GpuDescriptorHandle, IndexBufferView,
    NativeHandle, PlacedSubresourceFootprint, ResourceBarrierDesc, RootParameterType,
    VertexBufferView, RESOURCE_BARRIER_ALL_SUBRESOURCES,
};
use crate::renderer::api::{
    AttachmentPoint, ClearFlags, IndexFormat, LinearRgba, Pipeline, PrimitiveTopology, QueryType,
    QueueType, Rect, ResourceState, Viewport,
};
use crate::renderer::descriptor::DescriptorAllocation;
use crate::renderer::device::DeviceContext;
use crate::renderer::error::{CommandError, ResourceError};
use crate::renderer::indirect::IndirectCommandSignature;
use crate::renderer::query::Query;
use crate::renderer::render_target::RenderTarget;
use crate::renderer::resource::{
    BufferId, BufferKind, NativeObject, ResourceEntry, ResourceId, SamplerId, TextureId,
};
use crate::renderer::signature::{RangeType, ShaderSignature, SignatureLayout, SlotLayout};
use crate::renderer::traits::NativeCommandList;
use crate::utils::align_up;
use bytemuck::Pod;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

const CBV_SRV_UAV: usize = 0;
const SAMPLER: usize = 1;
const VERTEX_DATA_ALIGNMENT: u64 = 16;

/// A resource bound to a shader signature slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderArgument {
    /// The whole resource through its default view.
    Resource(ResourceId),
    /// A single mip level of a texture.
    ///
    /// Mip arguments are never transitioned implicitly; the caller owns the
    /// state of individual subresources.
    TextureMip {
        /// The texture.
        texture: TextureId,
        /// The mip level.
        mip: u32,
    },
}

impl ShaderArgument {
    /// The resource the argument refers to.
    pub fn resource(&self) -> ResourceId {
        match self {
            ShaderArgument::Resource(id) => *id,
            ShaderArgument::TextureMip { texture, .. } => (*texture).into(),
        }
    }
}

impl From<ResourceId> for ShaderArgument {
    fn from(id: ResourceId) -> Self {
        ShaderArgument::Resource(id)
    }
}

impl From<BufferId> for ShaderArgument {
    fn from(id: BufferId) -> Self {
        ShaderArgument::Resource(id.into())
    }
}

impl From<TextureId> for ShaderArgument {
    fn from(id: TextureId) -> Self {
        ShaderArgument::Resource(id.into())
    }
}

impl From<SamplerId> for ShaderArgument {
    fn from(id: SamplerId) -> Self {
        ShaderArgument::Resource(id.into())
    }
}

/// Where a tracked binding lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum BindingPoint {
    Argument { slot: u32, offset: u32 },
    VertexBuffer(u32),
    IndexBuffer,
    Attachment(AttachmentPoint),
}

type Requirement = (Arc<ResourceEntry>, ResourceState);

#[derive(Default)]
struct PipelineBindings {
    layout: Option<Arc<SignatureLayout>>,
    requirements: BTreeMap<BindingPoint, Requirement>,
}

/// Records GPU work for one queue type.
///
/// A command buffer is obtained from [`CommandQueue::command_buffer`](super::CommandQueue::command_buffer)
/// already recording, filled, then handed back through
/// [`CommandQueue::execute_command_buffer`](super::CommandQueue::execute_command_buffer).
/// Everything it references stays alive until the GPU has finished with it.
///
/// Resource states are tracked optimistically: a transition updates the
/// tracked state immediately and queues the native barrier, which is
/// flushed before the next command that depends on it.
pub struct CommandBuffer {
    context: Arc<DeviceContext>,
    queue_type: QueueType,
    list: Box<dyn NativeCommandList>,
    recording: bool,
    pending_barriers: Vec<ResourceBarrierDesc>,
    referenced: HashMap<ResourceId, Arc<ResourceEntry>>,
    retained: Vec<Arc<dyn Any + Send + Sync>>,
    upload: UploadHeap,
    dynamic_heaps: [DynamicDescriptorHeap; 2],
    bound_heaps: [NativeHandle; 2],
    bindings: [PipelineBindings; 2],
    pipeline_state: Option<(Pipeline, NativeHandle)>,
    topology: Option<native::PrimitiveTopology>,
}

impl fmt::Debug for CommandBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuffer")
            .field("queue_type", &self.queue_type)
            .field("recording", &self.recording)
            .field("pending_barriers", &self.pending_barriers.len())
            .field("referenced", &self.referenced.len())
            .finish()
    }
}

impl CommandBuffer {
    pub(crate) fn new(
        context: Arc<DeviceContext>,
        queue_type: QueueType,
    ) -> Result<Self, CommandError> {
        let device = context.native.clone();
        let list = device.create_command_list(queue_type.to_native())?;
        let settings = &context.settings;
        let dynamic_heap = |heap_type| {
            DynamicDescriptorHeap::new(
                device.clone(),
                heap_type,
                settings.descriptors_per_dynamic_heap,
                settings.node_mask,
            )
        };
        let dynamic_heaps = [
            dynamic_heap(DescriptorHeapType::CbvSrvUav),
            dynamic_heap(DescriptorHeapType::Sampler),
        ];
        let upload = UploadHeap::new(device.clone(), settings.upload_page_size);

        Ok(Self {
            context,
            queue_type,
            list,
            recording: false,
            pending_barriers: Vec::new(),
            referenced: HashMap::new(),
            retained: Vec::new(),
            upload,
            dynamic_heaps,
            bound_heaps: [NativeHandle::NULL; 2],
            bindings: Default::default(),
            pipeline_state: None,
            topology: None,
        })
    }

    /// The queue type this buffer records for.
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Returns `true` between [`begin`](Self::begin) and [`end`](Self::end).
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Number of barriers queued but not yet recorded.
    pub fn pending_barrier_count(&self) -> usize {
        self.pending_barriers.len()
    }

    /// Number of distinct resources the recorded commands keep alive.
    pub fn referenced_resource_count(&self) -> usize {
        self.referenced.len()
    }

    pub(crate) fn context(&self) -> &Arc<DeviceContext> {
        &self.context
    }

    pub(crate) fn native_list(&self) -> &dyn NativeCommandList {
        self.list.as_ref()
    }

    pub(crate) fn native_list_mut(&mut self) -> &mut dyn NativeCommandList {
        self.list.as_mut()
    }

    /// Starts recording.
    ///
    /// Resets the native command list and drops every reference, upload
    /// page and binding of the previous recording. The queue only begins a
    /// buffer once the GPU has finished with it.
    pub fn begin(&mut self) -> Result<(), CommandError> {
        self.list.reset()?;
        self.release_references();
        self.recording = true;
        Ok(())
    }

    /// Flushes pending barriers and closes the native command list.
    pub fn end(&mut self) -> Result<(), CommandError> {
        self.flush_resource_barriers()?;
        self.list.close()?;
        self.recording = false;
        Ok(())
    }

    pub(crate) fn release_references(&mut self) {
        self.pending_barriers.clear();
        self.referenced.clear();
        self.retained.clear();
        self.upload.reset();
        for heap in &mut self.dynamic_heaps {
            heap.reset();
        }
        self.bound_heaps = [NativeHandle::NULL; 2];
        self.bindings = Default::default();
        self.pipeline_state = None;
        self.topology = None;
    }

    fn ensure_recording(&self) -> Result<(), CommandError> {
        if self.recording {
            Ok(())
        } else {
            Err(CommandError::NotRecording)
        }
    }

    fn require_graphics(&self, operation: &'static str) -> Result<(), CommandError> {
        self.ensure_recording()?;
        if self.queue_type.supports_graphics() {
            Ok(())
        } else {
            Err(CommandError::UnsupportedOnQueue {
                operation,
                queue: self.queue_type,
            })
        }
    }

    fn require_compute(&self, operation: &'static str) -> Result<(), CommandError> {
        self.ensure_recording()?;
        if self.queue_type.supports_compute() {
            Ok(())
        } else {
            Err(CommandError::UnsupportedOnQueue {
                operation,
                queue: self.queue_type,
            })
        }
    }

    fn require_pipeline(
        &self,
        pipeline: Pipeline,
        operation: &'static str,
    ) -> Result<(), CommandError> {
        match pipeline {
            Pipeline::Graphics => self.require_graphics(operation),
            Pipeline::Compute => self.require_compute(operation),
        }
    }

    fn reference(&mut self, entry: Arc<ResourceEntry>) {
        self.referenced.entry(entry.id).or_insert(entry);
    }

    pub(crate) fn retain(&mut self, object: Arc<dyn Any + Send + Sync>) {
        self.retained.push(object);
    }

    // --- Barriers ---

    /// Transitions a resource to `state`.
    ///
    /// A transition to the tracked state is a no-op. Otherwise the tracked
    /// state becomes `state` immediately and the barrier is queued; it is
    /// recorded now if `flush` is set, or before the next command that
    /// depends on it.
    pub fn transition_resource(
        &mut self,
        resource: impl Into<ResourceId>,
        state: ResourceState,
        flush: bool,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let entry = self.context.resources.get(resource)?;
        self.transition_entry(&entry, state)?;
        self.reference(entry);
        if flush {
            self.flush_resource_barriers()?;
        }
        Ok(())
    }

    fn transition_entry(
        &mut self,
        entry: &ResourceEntry,
        state: ResourceState,
    ) -> Result<(), CommandError> {
        if entry.native.is_none() {
            return Err(ResourceError::WrongKind {
                id: entry.id,
                expected: "buffer or texture",
            }
            .into());
        }
        let before = entry.state();
        if before == state {
            return Ok(());
        }
        entry.set_state(state);

        let (state_before, state_after) = (before.to_native(), state.to_native());
        if state_before == state_after {
            log::trace!(
                "Elided barrier for '{}': {:?} and {:?} are the same native state",
                entry.name,
                before,
                state
            );
            return Ok(());
        }
        self.pending_barriers.push(ResourceBarrierDesc::Transition {
            resource: entry.handle(),
            subresource: RESOURCE_BARRIER_ALL_SUBRESOURCES,
            state_before,
            state_after,
        });
        Ok(())
    }

    /// Transitions `entry` unless its tracked state already includes `state`.
    fn require_state(
        &mut self,
        entry: &Arc<ResourceEntry>,
        state: ResourceState,
    ) -> Result<(), CommandError> {
        if !entry.state().contains(state) {
            self.transition_entry(entry, state)?;
        }
        self.reference(entry.clone());
        Ok(())
    }

    pub(crate) fn push_barrier(&mut self, barrier: ResourceBarrierDesc) {
        self.pending_barriers.push(barrier);
    }

    /// Queues a UAV barrier on `resource`, or on every UAV access when `None`.
    pub fn add_uav_barrier(
        &mut self,
        resource: Option<ResourceId>,
        flush: bool,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let resource = self.barrier_handle(resource)?;
        self.pending_barriers
            .push(ResourceBarrierDesc::Uav { resource });
        if flush {
            self.flush_resource_barriers()?;
        }
        Ok(())
    }

    /// Queues an aliasing barrier between two resources sharing memory.
    pub fn add_aliasing_barrier(
        &mut self,
        before: Option<ResourceId>,
        after: Option<ResourceId>,
        flush: bool,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let before = self.barrier_handle(before)?;
        let after = self.barrier_handle(after)?;
        self.pending_barriers
            .push(ResourceBarrierDesc::Aliasing { before, after });
        if flush {
            self.flush_resource_barriers()?;
        }
        Ok(())
    }

    fn barrier_handle(
        &mut self,
        resource: Option<ResourceId>,
    ) -> Result<Option<NativeHandle>, CommandError> {
        let Some(id) = resource else {
            return Ok(None);
        };
        let entry = self.context.resources.get(id)?;
        let handle = entry.handle();
        self.reference(entry);
        Ok(Some(handle))
    }

    /// Records every queued barrier in one native call.
    pub fn flush_resource_barriers(&mut self) -> Result<(), CommandError> {
        self.ensure_recording()?;
        if !self.pending_barriers.is_empty() {
            self.list.resource_barrier(&self.pending_barriers);
            self.pending_barriers.clear();
        }
        Ok(())
    }

    // --- Pipeline and signature ---

    pub(crate) fn bind_pipeline_state(
        &mut self,
        pipeline: Pipeline,
        native: Arc<NativeObject>,
    ) -> Result<(), CommandError> {
        self.require_pipeline(pipeline, "bind pipeline state")?;
        let handle = native.handle();
        if self.pipeline_state != Some((pipeline, handle)) {
            self.list.set_pipeline_state(handle);
            self.pipeline_state = Some((pipeline, handle));
            self.retained.push(native);
        }
        Ok(())
    }

    /// Binds the root signature of `signature` for draws.
    ///
    /// Rebinding the signature that is already bound is elided. A new
    /// signature clears every argument bound through the previous one.
    pub fn bind_graphics_shader_signature(
        &mut self,
        signature: &ShaderSignature,
    ) -> Result<(), CommandError> {
        let layout = signature.compiled()?;
        self.bind_signature_layout(Pipeline::Graphics, layout)
    }

    /// Binds the root signature of `signature` for dispatches.
    pub fn bind_compute_shader_signature(
        &mut self,
        signature: &ShaderSignature,
    ) -> Result<(), CommandError> {
        let layout = signature.compiled()?;
        self.bind_signature_layout(Pipeline::Compute, layout)
    }

    pub(crate) fn bind_signature_layout(
        &mut self,
        pipeline: Pipeline,
        layout: Arc<SignatureLayout>,
    ) -> Result<(), CommandError> {
        self.require_pipeline(pipeline, "bind shader signature")?;
        let bindings = &mut self.bindings[pipeline.index()];
        if bindings
            .layout
            .as_ref()
            .is_some_and(|bound| bound.root() == layout.root())
        {
            return Ok(());
        }

        self.list.set_root_signature(pipeline, layout.root());
        for heap in &mut self.dynamic_heaps {
            heap.parse_layout(pipeline, &layout);
        }
        bindings
            .requirements
            .retain(|point, _| !matches!(point, BindingPoint::Argument { .. }));
        bindings.layout = Some(layout.clone());
        self.retained.push(layout);
        Ok(())
    }

    fn bound_layout(&self, pipeline: Pipeline) -> Result<Arc<SignatureLayout>, CommandError> {
        self.bindings[pipeline.index()]
            .layout
            .clone()
            .ok_or(CommandError::NoShaderSignatureBound(pipeline))
    }

    fn slot_layout(
        layout: &SignatureLayout,
        pipeline: Pipeline,
        slot: u32,
    ) -> Result<&SlotLayout, CommandError> {
        layout.slot(slot).ok_or(CommandError::SlotOutOfRange {
            pipeline,
            slot,
            count: layout.num_slots(),
        })
    }

    fn track_binding(
        &mut self,
        pipeline: Pipeline,
        point: BindingPoint,
        entry: &Arc<ResourceEntry>,
        state: Option<ResourceState>,
    ) -> Result<(), CommandError> {
        match state {
            Some(state) => {
                self.require_state(entry, state)?;
                self.bindings[pipeline.index()]
                    .requirements
                    .insert(point, (entry.clone(), state));
            }
            None => {
                self.bindings[pipeline.index()].requirements.remove(&point);
                self.reference(entry.clone());
            }
        }
        Ok(())
    }

    // --- Shader arguments ---

    /// Binds one argument to a graphics slot.
    pub fn bind_graphics_shader_argument(
        &mut self,
        slot: u32,
        argument: impl Into<ShaderArgument>,
    ) -> Result<(), CommandError> {
        self.bind_shader_arguments(Pipeline::Graphics, slot, 0, &[argument.into()])
    }

    /// Binds consecutive descriptors of a graphics table starting at `offset`.
    pub fn bind_graphics_shader_arguments(
        &mut self,
        slot: u32,
        offset: u32,
        arguments: &[ShaderArgument],
    ) -> Result<(), CommandError> {
        self.bind_shader_arguments(Pipeline::Graphics, slot, offset, arguments)
    }

    /// Binds one argument to a compute slot.
    pub fn bind_compute_shader_argument(
        &mut self,
        slot: u32,
        argument: impl Into<ShaderArgument>,
    ) -> Result<(), CommandError> {
        self.bind_shader_arguments(Pipeline::Compute, slot, 0, &[argument.into()])
    }

    /// Binds consecutive descriptors of a compute table starting at `offset`.
    pub fn bind_compute_shader_arguments(
        &mut self,
        slot: u32,
        offset: u32,
        arguments: &[ShaderArgument],
    ) -> Result<(), CommandError> {
        self.bind_shader_arguments(Pipeline::Compute, slot, offset, arguments)
    }

    /// Binds resources to a slot of the bound signature.
    ///
    /// Root descriptor slots take a single buffer and are set immediately.
    /// Table slots are staged and copied into the shader-visible heap on
    /// the next draw or dispatch. Whole-resource arguments are transitioned
    /// to the state their range needs.
    pub(crate) fn bind_shader_arguments(
        &mut self,
        pipeline: Pipeline,
        slot: u32,
        offset: u32,
        arguments: &[ShaderArgument],
    ) -> Result<(), CommandError> {
        self.require_pipeline(pipeline, "bind shader argument")?;
        let layout = self.bound_layout(pipeline)?;
        match Self::slot_layout(&layout, pipeline, slot)? {
            SlotLayout::Constants { .. } => Err(CommandError::IncompatibleParameter {
                slot,
                expected: "a resource slot",
            }),
            &SlotLayout::RootDescriptor { range_type } => {
                let argument = match arguments {
                    [argument] if offset == 0 => argument,
                    _ => {
                        return Err(CommandError::DescriptorOutOfRange {
                            slot,
                            offset: offset
                                .saturating_add(arguments.len().saturating_sub(1) as u32),
                            count: 1,
                        })
                    }
                };
                let parameter_type = match range_type {
                    RangeType::ConstantBuffer => RootParameterType::Cbv,
                    RangeType::ShaderResource => RootParameterType::Srv,
                    RangeType::UnorderedAccess => RootParameterType::Uav,
                    RangeType::Sampler => {
                        return Err(CommandError::IncompatibleParameter {
                            slot,
                            expected: "a buffer root descriptor",
                        })
                    }
                };
                let entry = self.context.resources.get(argument.resource())?;
                entry.buffer()?;
                self.track_binding(
                    pipeline,
                    BindingPoint::Argument { slot, offset: 0 },
                    &entry,
                    Some(required_state(range_type, pipeline)),
                )?;
                self.list
                    .set_root_descriptor(pipeline, slot, parameter_type, entry.gpu_address);
                Ok(())
            }
            &SlotLayout::Table {
                heap_type,
                num_descriptors,
                ..
            } => {
                let end = offset as usize + arguments.len();
                if end > num_descriptors as usize {
                    return Err(CommandError::DescriptorOutOfRange {
                        slot,
                        offset: u32::try_from(end - 1).unwrap_or(u32::MAX),
                        count: num_descriptors,
                    });
                }
                let mut handles = Vec::with_capacity(arguments.len());
                for (i, argument) in arguments.iter().enumerate() {
                    let at = offset + i as u32;
                    let range_type = layout.table_range_at(slot, at).ok_or(
                        CommandError::DescriptorOutOfRange {
                            slot,
                            offset: at,
                            count: num_descriptors,
                        },
                    )?;
                    let entry = self.context.resources.get(argument.resource())?;
                    handles.push(view_handle(&entry, range_type, argument)?);
                    let state = match argument {
                        ShaderArgument::Resource(_) if range_type != RangeType::Sampler => {
                            Some(required_state(range_type, pipeline))
                        }
                        _ => None,
                    };
                    self.track_binding(
                        pipeline,
                        BindingPoint::Argument { slot, offset: at },
                        &entry,
                        state,
                    )?;
                }
                let heap = match heap_type {
                    DescriptorHeapType::Sampler => SAMPLER,
                    _ => CBV_SRV_UAV,
                };
                self.dynamic_heaps[heap].stage(pipeline, slot, offset, &handles)
            }
        }
    }

    /// Sets inline 32-bit constants of a graphics slot.
    pub fn bind_graphics_32bit_constants(
        &mut self,
        slot: u32,
        values: &[u32],
        offset: u32,
    ) -> Result<(), CommandError> {
        self.bind_32bit_constants(Pipeline::Graphics, slot, values, offset)
    }

    /// Sets inline 32-bit constants of a compute slot.
    pub fn bind_compute_32bit_constants(
        &mut self,
        slot: u32,
        values: &[u32],
        offset: u32,
    ) -> Result<(), CommandError> {
        self.bind_32bit_constants(Pipeline::Compute, slot, values, offset)
    }

    /// Sets a plain-data value as the inline constants of a graphics slot.
    pub fn bind_graphics_constants<T: Pod>(
        &mut self,
        slot: u32,
        value: &T,
    ) -> Result<(), CommandError> {
        let words = pod_words(bytemuck::bytes_of(value))?;
        self.bind_32bit_constants(Pipeline::Graphics, slot, &words, 0)
    }

    /// Sets a plain-data value as the inline constants of a compute slot.
    pub fn bind_compute_constants<T: Pod>(
        &mut self,
        slot: u32,
        value: &T,
    ) -> Result<(), CommandError> {
        let words = pod_words(bytemuck::bytes_of(value))?;
        self.bind_32bit_constants(Pipeline::Compute, slot, &words, 0)
    }

    pub(crate) fn bind_32bit_constants(
        &mut self,
        pipeline: Pipeline,
        slot: u32,
        values: &[u32],
        offset: u32,
    ) -> Result<(), CommandError> {
        self.require_pipeline(pipeline, "bind 32-bit constants")?;
        let layout = self.bound_layout(pipeline)?;
        let &SlotLayout::Constants { num_constants } = Self::slot_layout(&layout, pipeline, slot)?
        else {
            return Err(CommandError::IncompatibleParameter {
                slot,
                expected: "a 32-bit constants slot",
            });
        };
        if offset as usize + values.len() > num_constants as usize {
            return Err(CommandError::DescriptorOutOfRange {
                slot,
                offset,
                count: num_constants,
            });
        }
        self.list
            .set_root_32bit_constants(pipeline, slot, values, offset);
        Ok(())
    }

    // --- Dynamic buffers ---

    /// Uploads `data` and binds it to a graphics constant buffer slot.
    ///
    /// The slot must be a constant buffer root descriptor. Each call gets
    /// its own region of the upload heap.
    pub fn bind_graphics_dynamic_constant_buffer(
        &mut self,
        slot: u32,
        data: &[u8],
    ) -> Result<(), CommandError> {
        self.bind_dynamic_buffer(Pipeline::Graphics, slot, data, RangeType::ConstantBuffer)
    }

    /// Uploads `data` and binds it to a compute constant buffer slot.
    pub fn bind_compute_dynamic_constant_buffer(
        &mut self,
        slot: u32,
        data: &[u8],
    ) -> Result<(), CommandError> {
        self.bind_dynamic_buffer(Pipeline::Compute, slot, data, RangeType::ConstantBuffer)
    }

    /// Uploads a plain-data value and binds it to a graphics constant buffer slot.
    pub fn bind_graphics_dynamic_constants<T: Pod>(
        &mut self,
        slot: u32,
        value: &T,
    ) -> Result<(), CommandError> {
        self.bind_graphics_dynamic_constant_buffer(slot, bytemuck::bytes_of(value))
    }

    /// Uploads a plain-data value and binds it to a compute constant buffer slot.
    pub fn bind_compute_dynamic_constants<T: Pod>(
        &mut self,
        slot: u32,
        value: &T,
    ) -> Result<(), CommandError> {
        self.bind_compute_dynamic_constant_buffer(slot, bytemuck::bytes_of(value))
    }

    /// Uploads `elements` and binds them to a graphics read-only buffer slot.
    ///
    /// The slot must be a buffer root descriptor.
    pub fn bind_graphics_dynamic_structured_buffer<T: Pod>(
        &mut self,
        slot: u32,
        elements: &[T],
    ) -> Result<(), CommandError> {
        self.bind_dynamic_buffer(
            Pipeline::Graphics,
            slot,
            bytemuck::cast_slice(elements),
            RangeType::ShaderResource,
        )
    }

    /// Uploads `elements` and binds them to a compute read-only buffer slot.
    pub fn bind_compute_dynamic_structured_buffer<T: Pod>(
        &mut self,
        slot: u32,
        elements: &[T],
    ) -> Result<(), CommandError> {
        self.bind_dynamic_buffer(
            Pipeline::Compute,
            slot,
            bytemuck::cast_slice(elements),
            RangeType::ShaderResource,
        )
    }

    fn bind_dynamic_buffer(
        &mut self,
        pipeline: Pipeline,
        slot: u32,
        data: &[u8],
        range_type: RangeType,
    ) -> Result<(), CommandError> {
        self.require_pipeline(pipeline, "bind dynamic buffer")?;
        let layout = self.bound_layout(pipeline)?;
        let (expected, parameter_type) = match range_type {
            RangeType::ConstantBuffer => ("a constant buffer root descriptor", RootParameterType::Cbv),
            _ => ("a buffer root descriptor", RootParameterType::Srv),
        };
        match Self::slot_layout(&layout, pipeline, slot)? {
            SlotLayout::RootDescriptor { range_type: bound } if *bound == range_type => {}
            _ => return Err(CommandError::IncompatibleParameter { slot, expected }),
        }
        if data.is_empty() {
            return Err(CommandError::InvalidArgument(format!(
                "dynamic buffer for slot {slot} is empty"
            )));
        }

        let allocation = self
            .upload
            .upload(data, native::CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT)?;
        self.bindings[pipeline.index()]
            .requirements
            .remove(&BindingPoint::Argument { slot, offset: 0 });
        self.list
            .set_root_descriptor(pipeline, slot, parameter_type, allocation.gpu_address);
        Ok(())
    }

    // --- Input assembly ---

    /// Binds a vertex buffer to an input slot.
    pub fn bind_vertex_buffer(&mut self, slot: u32, buffer: BufferId) -> Result<(), CommandError> {
        self.require_graphics("bind vertex buffer")?;
        let entry = self.context.resources.get(buffer)?;
        let info = entry.buffer()?;
        if info.kind != BufferKind::Vertex {
            return Err(ResourceError::WrongKind {
                id: entry.id,
                expected: "vertex buffer",
            }
            .into());
        }
        let view = info.vertex_buffer_view(entry.gpu_address);
        self.track_binding(
            Pipeline::Graphics,
            BindingPoint::VertexBuffer(slot),
            &entry,
            Some(ResourceState::VERTEX_BUFFER),
        )?;
        self.list.ia_set_vertex_buffers(slot, &[view]);
        Ok(())
    }

    /// Binds an index buffer, starting `offset` bytes into it.
    pub fn bind_index_buffer(&mut self, buffer: BufferId, offset: u64) -> Result<(), CommandError> {
        self.require_graphics("bind index buffer")?;
        let entry = self.context.resources.get(buffer)?;
        let info = entry.buffer()?;
        if offset >= info.size {
            return Err(ResourceError::OutOfBounds {
                requested: offset,
                available: info.size,
            }
            .into());
        }
        let view = info
            .index_buffer_view(entry.gpu_address, offset)
            .ok_or(ResourceError::WrongKind {
                id: entry.id,
                expected: "index buffer",
            })?;
        self.track_binding(
            Pipeline::Graphics,
            BindingPoint::IndexBuffer,
            &entry,
            Some(ResourceState::INDEX_BUFFER),
        )?;
        self.list.ia_set_index_buffer(Some(&view));
        Ok(())
    }

    /// Uploads `vertices` and binds them to an input slot.
    pub fn bind_dynamic_vertex_buffer<T: Pod>(
        &mut self,
        slot: u32,
        vertices: &[T],
    ) -> Result<(), CommandError> {
        self.require_graphics("bind dynamic vertex buffer")?;
        let data: &[u8] = bytemuck::cast_slice(vertices);
        if data.is_empty() {
            return Err(CommandError::InvalidArgument(
                "dynamic vertex buffer is empty".to_string(),
            ));
        }
        let allocation = self.upload.upload(data, VERTEX_DATA_ALIGNMENT)?;
        self.bindings[Pipeline::Graphics.index()]
            .requirements
            .remove(&BindingPoint::VertexBuffer(slot));
        self.list.ia_set_vertex_buffers(
            slot,
            &[VertexBufferView {
                buffer_location: allocation.gpu_address,
                size_in_bytes: data.len() as u32,
                stride_in_bytes: std::mem::size_of::<T>() as u32,
            }],
        );
        Ok(())
    }

    /// Uploads `indices` and binds them as the index buffer.
    ///
    /// `T` must be 2 or 4 bytes wide.
    pub fn bind_dynamic_index_buffer<T: Pod>(&mut self, indices: &[T]) -> Result<(), CommandError> {
        self.require_graphics("bind dynamic index buffer")?;
        let size = std::mem::size_of::<T>() as u32;
        let format = IndexFormat::from_size(size).ok_or_else(|| {
            CommandError::InvalidArgument(format!("{size}-byte indices are not supported"))
        })?;
        let data: &[u8] = bytemuck::cast_slice(indices);
        if data.is_empty() {
            return Err(CommandError::InvalidArgument(
                "dynamic index buffer is empty".to_string(),
            ));
        }
        let allocation = self.upload.upload(data, VERTEX_DATA_ALIGNMENT)?;
        self.bindings[Pipeline::Graphics.index()]
            .requirements
            .remove(&BindingPoint::IndexBuffer);
        self.list.ia_set_index_buffer(Some(&IndexBufferView {
            buffer_location: allocation.gpu_address,
            size_in_bytes: data.len() as u32,
            format: format.to_native(),
        }));
        Ok(())
    }

    // --- Render targets and clears ---

    /// Binds the attachments of `render_target` and transitions them to
    /// their write states.
    pub fn bind_render_target(&mut self, render_target: &RenderTarget) -> Result<(), CommandError> {
        self.require_graphics("bind render target")?;
        let attachments = render_target.resolve()?;
        self.bindings[Pipeline::Graphics.index()]
            .requirements
            .retain(|point, _| !matches!(point, BindingPoint::Attachment(_)));

        let mut colors = Vec::new();
        for (point, entry) in &attachments {
            let Some(index) = point.color_index() else {
                continue;
            };
            let rtv = single_view(entry, &entry.views.rtv, "render target")?;
            if colors.len() <= index {
                colors.resize(index + 1, CpuDescriptorHandle::NULL);
            }
            colors[index] = rtv;
            self.track_binding(
                Pipeline::Graphics,
                BindingPoint::Attachment(*point),
                entry,
                Some(ResourceState::RENDER_TARGET),
            )?;
        }

        let depth = attachments
            .iter()
            .find(|(point, _)| *point == AttachmentPoint::DepthStencil)
            .or_else(|| {
                attachments
                    .iter()
                    .find(|(point, _)| *point == AttachmentPoint::Depth)
            });
        let dsv = match depth {
            Some((point, entry)) => {
                let dsv = single_view(entry, &entry.views.dsv, "depth/stencil")?;
                self.track_binding(
                    Pipeline::Graphics,
                    BindingPoint::Attachment(*point),
                    entry,
                    Some(ResourceState::DEPTH_WRITE),
                )?;
                Some(dsv)
            }
            None => None,
        };

        self.list.om_set_render_targets(&colors, dsv);
        Ok(())
    }

    /// Clears a color texture.
    pub fn clear_texture(&mut self, texture: TextureId, color: LinearRgba) -> Result<(), CommandError> {
        self.require_graphics("clear texture")?;
        let entry = self.context.resources.get(texture)?;
        let rtv = single_view(&entry, &entry.views.rtv, "render target")?;
        self.require_state(&entry, ResourceState::RENDER_TARGET)?;
        self.flush_resource_barriers()?;
        self.list.clear_render_target_view(rtv, color.to_array());
        Ok(())
    }

    /// Clears the depth and/or stencil planes of a depth texture.
    pub fn clear_depth_stencil_texture(
        &mut self,
        texture: TextureId,
        flags: ClearFlags,
        depth: f32,
        stencil: u8,
    ) -> Result<(), CommandError> {
        self.require_graphics("clear depth/stencil texture")?;
        let native_flags = flags.to_native();
        if native_flags.is_empty() {
            return Ok(());
        }
        let entry = self.context.resources.get(texture)?;
        let dsv = single_view(&entry, &entry.views.dsv, "depth/stencil")?;
        self.require_state(&entry, ResourceState::DEPTH_WRITE)?;
        self.flush_resource_barriers()?;
        self.list
            .clear_depth_stencil_view(dsv, native_flags, depth, stencil);
        Ok(())
    }

    /// Clears every attachment of `render_target` selected by `flags`.
    ///
    /// Color attachments are cleared to their texture's clear color, depth
    /// to 1.0 and stencil to 0.
    pub fn clear_render_target(
        &mut self,
        render_target: &RenderTarget,
        flags: ClearFlags,
    ) -> Result<(), CommandError> {
        self.require_graphics("clear render target")?;
        for (point, entry) in render_target.resolve()? {
            let texture = TextureId(entry.id.0);
            let info = entry.texture()?;
            if point.color_index().is_some() {
                if flags.contains(ClearFlags::COLOR) {
                    self.clear_texture(texture, info.clear_color)?;
                }
            } else {
                let mut planes = flags.intersection(ClearFlags::DEPTH_STENCIL);
                if !info.format.has_stencil() {
                    planes.remove(ClearFlags::STENCIL);
                }
                self.clear_depth_stencil_texture(texture, planes, 1.0, 0)?;
            }
        }
        Ok(())
    }

    /// Clears a shader-writable resource to float values.
    pub fn clear_resource_float(
        &mut self,
        resource: impl Into<ResourceId>,
        values: [f32; 4],
    ) -> Result<(), CommandError> {
        let (handle, cpu, gpu) = self.prepare_uav_clear(resource.into())?;
        self.list
            .clear_unordered_access_view_float(gpu, cpu, handle, values);
        Ok(())
    }

    /// Clears a shader-writable resource to integer values.
    pub fn clear_resource_uint(
        &mut self,
        resource: impl Into<ResourceId>,
        values: [u32; 4],
    ) -> Result<(), CommandError> {
        let (handle, cpu, gpu) = self.prepare_uav_clear(resource.into())?;
        self.list
            .clear_unordered_access_view_uint(gpu, cpu, handle, values);
        Ok(())
    }

    fn prepare_uav_clear(
        &mut self,
        resource: ResourceId,
    ) -> Result<(NativeHandle, CpuDescriptorHandle, GpuDescriptorHandle), CommandError> {
        self.require_compute("clear unordered access view")?;
        let entry = self.context.resources.get(resource)?;
        let cpu = single_view(&entry, &entry.views.uav, "unordered access")?;
        self.require_state(&entry, ResourceState::UAV)?;
        self.flush_resource_barriers()?;
        let (_, gpu) = self.dynamic_heaps[CBV_SRV_UAV].copy_descriptor(cpu)?;
        self.bind_descriptor_heaps();
        Ok((entry.handle(), cpu, gpu))
    }

    // --- Copies ---

    /// Copies the whole contents of `src` into `dest`.
    pub fn copy_resource(
        &mut self,
        dest: impl Into<ResourceId>,
        src: impl Into<ResourceId>,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let dest = self.context.resources.get(dest)?;
        let src = self.context.resources.get(src)?;
        self.require_state(&dest, ResourceState::COPY_DEST)?;
        self.require_state(&src, ResourceState::COPY_SRC)?;
        self.flush_resource_barriers()?;
        self.list.copy_resource(dest.handle(), src.handle());
        Ok(())
    }

    /// Resolves a multisampled texture into a single-sampled one.
    pub fn resolve_multisample_texture(
        &mut self,
        dest: TextureId,
        src: TextureId,
    ) -> Result<(), CommandError> {
        self.require_graphics("resolve multisample texture")?;
        let dest = self.context.resources.get(dest)?;
        let src = self.context.resources.get(src)?;
        let (dest_info, src_info) = (dest.texture()?.clone(), src.texture()?.clone());
        if !src_info.sample_count.is_multisampled() || dest_info.sample_count.is_multisampled() {
            return Err(CommandError::InvalidArgument(format!(
                "cannot resolve '{}' ({:?}) into '{}' ({:?})",
                src.name, src_info.sample_count, dest.name, dest_info.sample_count
            )));
        }
        if src_info.format != dest_info.format
            || (src_info.width, src_info.height) != (dest_info.width, dest_info.height)
        {
            return Err(CommandError::InvalidArgument(format!(
                "'{}' and '{}' differ in format or size",
                src.name, dest.name
            )));
        }

        self.require_state(&dest, ResourceState::RESOLVE_DEST)?;
        self.require_state(&src, ResourceState::RESOLVE_SRC)?;
        self.flush_resource_barriers()?;
        let layers = src_info.array_layers.min(dest_info.array_layers);
        for slice in 0..layers {
            self.list.resolve_subresource(
                dest.handle(),
                dest_info.subresource(0, slice),
                src.handle(),
                src_info.subresource(0, slice),
                src_info.format.to_native(),
            );
        }
        Ok(())
    }

    /// Uploads `data` into a buffer at `offset` bytes.
    pub fn set_buffer_data(
        &mut self,
        buffer: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let entry = self.context.resources.get(buffer)?;
        let info = entry.buffer()?;
        let end = offset.saturating_add(data.len() as u64);
        if end > info.size {
            return Err(ResourceError::OutOfBounds {
                requested: end,
                available: info.size,
            }
            .into());
        }
        if info.kind == BufferKind::Readback {
            return Err(CommandError::InvalidArgument(format!(
                "readback buffer '{}' cannot be written by the CPU",
                entry.name
            )));
        }
        if data.is_empty() {
            return Ok(());
        }

        let allocation = self.upload.upload(data, VERTEX_DATA_ALIGNMENT)?;
        self.require_state(&entry, ResourceState::COPY_DEST)?;
        self.flush_resource_barriers()?;
        self.list.copy_buffer_region(
            entry.handle(),
            offset,
            allocation.resource,
            allocation.offset,
            data.len() as u64,
        );
        Ok(())
    }

    /// Uploads the texels of one subresource.
    ///
    /// `row_pitch` is the distance in bytes between rows of `data`.
    pub fn set_texture_subresource(
        &mut self,
        texture: TextureId,
        mip: u32,
        array_slice: u32,
        data: &[u8],
        row_pitch: u32,
    ) -> Result<(), CommandError> {
        self.ensure_recording()?;
        let entry = self.context.resources.get(texture)?;
        let info = entry.texture()?.clone();
        if mip >= info.mip_levels || array_slice >= info.array_layers {
            return Err(ResourceError::OutOfBounds {
                requested: u64::from(info.subresource(mip, array_slice)),
                available: u64::from(info.subresource_count()),
            }
            .into());
        }
        if info.sample_count.is_multisampled() {
            return Err(CommandError::InvalidArgument(format!(
                "multisampled texture '{}' cannot be uploaded",
                entry.name
            )));
        }

        let (width, height) = info.mip_size(mip);
        let row_bytes = (width * info.format.bytes_per_pixel()) as usize;
        let row_pitch = row_pitch as usize;
        if row_pitch < row_bytes {
            return Err(CommandError::InvalidArgument(format!(
                "row pitch {row_pitch} is smaller than a row of {row_bytes} bytes"
            )));
        }
        let required = row_pitch * (height as usize - 1) + row_bytes;
        if data.len() < required {
            return Err(ResourceError::OutOfBounds {
                requested: required as u64,
                available: data.len() as u64,
            }
            .into());
        }

        let aligned_pitch =
            align_up(row_bytes as u64, native::TEXTURE_DATA_PITCH_ALIGNMENT) as usize;
        let mut staging = vec![0u8; aligned_pitch * height as usize];
        for (row, dest) in staging.chunks_exact_mut(aligned_pitch).enumerate() {
            let src = &data[row * row_pitch..row * row_pitch + row_bytes];
            dest[..row_bytes].copy_from_slice(src);
        }
        let allocation = self
            .upload
            .upload(&staging, native::TEXTURE_DATA_PLACEMENT_ALIGNMENT)?;

        self.require_state(&entry, ResourceState::COPY_DEST)?;
        self.flush_resource_barriers()?;
        self.list.copy_texture_region(
            entry.handle(),
            info.subresource(mip, array_slice),
            allocation.resource,
            PlacedSubresourceFootprint {
                offset: allocation.offset,
                format: info.format.to_native(),
                width,
                height,
                depth: 1,
                row_pitch: aligned_pitch as u32,
            },
        );
        Ok(())
    }

    // --- Draws and dispatches ---

    fn validate_states(&self, pipeline: Pipeline) -> Result<(), CommandError> {
        for (entry, expected) in self.bindings[pipeline.index()].requirements.values() {
            let actual = entry.state();
            if !actual.contains(*expected) {
                log::error!(
                    "'{}' is bound as {:?} but tracked in {:?}",
                    entry.name,
                    expected,
                    actual
                );
                return Err(CommandError::StateMismatch {
                    resource: entry.id,
                    expected: *expected,
                    actual,
                });
            }
        }
        Ok(())
    }

    fn bind_descriptor_heaps(&mut self) {
        let current = [
            self.dynamic_heaps[CBV_SRV_UAV]
                .current_heap()
                .unwrap_or(NativeHandle::NULL),
            self.dynamic_heaps[SAMPLER]
                .current_heap()
                .unwrap_or(NativeHandle::NULL),
        ];
        if current != self.bound_heaps {
            let heaps: Vec<NativeHandle> =
                current.iter().copied().filter(|h| !h.is_null()).collect();
            self.list.set_descriptor_heaps(&heaps);
            self.bound_heaps = current;
        }
    }

    fn prepare_draw(&mut self, pipeline: Pipeline, operation: &'static str) -> Result<(), CommandError> {
        self.require_pipeline(pipeline, operation)?;
        if self.bindings[pipeline.index()].layout.is_none() {
            return Err(CommandError::NoShaderSignatureBound(pipeline));
        }
        if !matches!(self.pipeline_state, Some((bound, _)) if bound == pipeline) {
            return Err(CommandError::NoPipelineStateBound(pipeline));
        }
        if self.context.settings.validate_resource_states {
            self.validate_states(pipeline)?;
        }
        self.flush_resource_barriers()?;

        for heap in &mut self.dynamic_heaps {
            heap.reserve(pipeline)?;
        }
        self.bind_descriptor_heaps();
        for heap in &mut self.dynamic_heaps {
            heap.commit(pipeline, self.list.as_mut());
        }
        Ok(())
    }

    /// Records a non-indexed draw.
    pub fn draw(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    ) -> Result<(), CommandError> {
        self.prepare_draw(Pipeline::Graphics, "draw")?;
        self.list
            .draw_instanced(vertex_count, instance_count, start_vertex, start_instance);
        Ok(())
    }

    /// Records an indexed draw.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    ) -> Result<(), CommandError> {
        self.prepare_draw(Pipeline::Graphics, "draw indexed")?;
        self.list.draw_indexed_instanced(
            index_count,
            instance_count,
            start_index,
            base_vertex,
            start_instance,
        );
        Ok(())
    }

    /// Records a compute dispatch.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<(), CommandError> {
        self.prepare_draw(Pipeline::Compute, "dispatch")?;
        self.list.dispatch(x, y, z);
        Ok(())
    }

    /// Records up to `max_count` draws or dispatches whose arguments are read
    /// from `arguments` at `offset`.
    ///
    /// If `count` names a buffer and offset, the actual number of commands is
    /// read from it.
    pub fn execute_indirect(
        &mut self,
        signature: &IndirectCommandSignature,
        max_count: u32,
        arguments: BufferId,
        offset: u64,
        count: Option<(BufferId, u64)>,
    ) -> Result<(), CommandError> {
        let pipeline = signature.pipeline();
        self.require_pipeline(pipeline, "execute indirect")?;

        let argument_entry = self.context.resources.get(arguments)?;
        let required =
            offset.saturating_add(u64::from(signature.stride()) * u64::from(max_count));
        check_buffer_range(&argument_entry, required)?;
        self.require_state(&argument_entry, ResourceState::INDIRECT_ARGUMENT)?;

        let (count_handle, count_offset) = match count {
            Some((buffer, count_offset)) => {
                let entry = self.context.resources.get(buffer)?;
                check_buffer_range(&entry, count_offset.saturating_add(4))?;
                self.require_state(&entry, ResourceState::INDIRECT_ARGUMENT)?;
                (Some(entry.handle()), count_offset)
            }
            None => (None, 0),
        };

        self.prepare_draw(pipeline, "execute indirect")?;
        self.retained.push(signature.native_object().clone());
        self.list.execute_indirect(
            signature.handle(),
            max_count,
            argument_entry.handle(),
            offset,
            count_handle,
            count_offset,
        );
        Ok(())
    }

    // --- Queries ---

    /// Starts query `index`. Timer queries record their first timestamp.
    pub fn begin_query(&mut self, query: &Query, index: u32) -> Result<(), CommandError> {
        self.prepare_query(query, index, 1)?;
        match query.query_type() {
            QueryType::Timer => {
                self.list
                    .end_query(query.heap(), native::QueryType::Timestamp, 2 * index)
            }
            _ => self.list.begin_query(query.heap(), query.native_type(), index),
        }
        Ok(())
    }

    /// Ends query `index`. Timer queries record their second timestamp.
    pub fn end_query(&mut self, query: &Query, index: u32) -> Result<(), CommandError> {
        self.prepare_query(query, index, 1)?;
        match query.query_type() {
            QueryType::Timer => self.list.end_query(
                query.heap(),
                native::QueryType::Timestamp,
                2 * index + 1,
            ),
            _ => self.list.end_query(query.heap(), query.native_type(), index),
        }
        Ok(())
    }

    /// Copies the results of `count` queries starting at `start` into the
    /// query's readback buffer.
    pub fn resolve_query(&mut self, query: &Query, start: u32, count: u32) -> Result<(), CommandError> {
        self.prepare_query(query, start, count)?;
        let per_query = query.slots_per_query();
        let first = start * per_query;
        self.list.resolve_query_data(
            query.heap(),
            query.native_type(),
            first,
            count * per_query,
            query.readback(),
            u64::from(first) * 8,
        );
        Ok(())
    }

    fn prepare_query(&mut self, query: &Query, start: u32, count: u32) -> Result<(), CommandError> {
        match query.query_type() {
            QueryType::Timer => self.require_compute("timer query")?,
            _ => self.require_graphics("occlusion query")?,
        }
        if start.checked_add(count).map_or(true, |end| end > query.count()) {
            return Err(CommandError::InvalidArgument(format!(
                "queries {start}..{} exceed the {} queries of the heap",
                start.saturating_add(count),
                query.count()
            )));
        }
        self.retained.push(query.shared_objects());
        Ok(())
    }

    // --- Profiling ---

    /// Opens a named region visible in GPU debuggers.
    pub fn begin_profiling_event(&mut self, name: &str) -> Result<(), CommandError> {
        self.ensure_recording()?;
        self.list.begin_event(name);
        Ok(())
    }

    /// Closes the innermost named region.
    pub fn end_profiling_event(&mut self) -> Result<(), CommandError> {
        self.ensure_recording()?;
        self.list.end_event();
        Ok(())
    }

    // --- Dynamic state ---

    /// Sets the viewports. An empty slice leaves them unchanged.
    pub fn set_viewports(&mut self, viewports: &[Viewport]) -> Result<(), CommandError> {
        self.require_graphics("set viewports")?;
        if viewports.is_empty() {
            return Ok(());
        }
        let viewports: Vec<_> = viewports.iter().map(Viewport::to_native).collect();
        self.list.rs_set_viewports(&viewports);
        Ok(())
    }

    /// Sets the scissor rectangles. An empty slice leaves them unchanged.
    pub fn set_scissor_rects(&mut self, rects: &[Rect]) -> Result<(), CommandError> {
        self.require_graphics("set scissor rects")?;
        if rects.is_empty() {
            return Ok(());
        }
        let rects: Vec<_> = rects.iter().map(Rect::to_native).collect();
        self.list.rs_set_scissor_rects(&rects);
        Ok(())
    }

    /// Sets the stencil reference value.
    pub fn set_stencil_reference(&mut self, reference: u32) -> Result<(), CommandError> {
        self.require_graphics("set stencil reference")?;
        self.list.om_set_stencil_ref(reference);
        Ok(())
    }

    /// Sets the constant blend factor.
    pub fn set_blend_factor(&mut self, factor: LinearRgba) -> Result<(), CommandError> {
        self.require_graphics("set blend factor")?;
        self.list.om_set_blend_factor(factor.to_array());
        Ok(())
    }

    /// Sets the primitive topology. Setting the current topology is elided.
    pub fn set_primitive_topology(
        &mut self,
        topology: PrimitiveTopology,
        patch_control_points: u32,
    ) -> Result<(), CommandError> {
        self.require_graphics("set primitive topology")?;
        let native = topology.to_native(patch_control_points);
        if self.topology != Some(native) {
            self.list.ia_set_primitive_topology(native);
            self.topology = Some(native);
        }
        Ok(())
    }
}

fn required_state(range_type: RangeType, pipeline: Pipeline) -> ResourceState {
    match range_type {
        RangeType::ConstantBuffer => ResourceState::CONSTANT_BUFFER,
        RangeType::ShaderResource => match pipeline {
            Pipeline::Compute => ResourceState::NON_PIXEL_SHADER,
            Pipeline::Graphics => ResourceState::NON_PIXEL_SHADER.union(ResourceState::PIXEL_SHADER),
        },
        RangeType::UnorderedAccess => ResourceState::UAV,
        RangeType::Sampler => ResourceState::COMMON,
    }
}

fn single_view(
    entry: &ResourceEntry,
    view: &Option<DescriptorAllocation>,
    name: &'static str,
) -> Result<CpuDescriptorHandle, CommandError> {
    view.as_ref()
        .filter(|allocation| !allocation.is_null())
        .map(|allocation| allocation.handle(0))
        .ok_or(CommandError::MissingView {
            resource: entry.id,
            view: name,
        })
}

fn view_handle(
    entry: &ResourceEntry,
    range_type: RangeType,
    argument: &ShaderArgument,
) -> Result<CpuDescriptorHandle, CommandError> {
    let views = &entry.views;
    let (allocation, index, name) = match (range_type, argument) {
        (RangeType::ConstantBuffer, ShaderArgument::Resource(_)) => (&views.cbv, 0, "constant buffer"),
        (RangeType::ShaderResource, ShaderArgument::Resource(_)) => (&views.srv, 0, "shader resource"),
        (RangeType::ShaderResource, ShaderArgument::TextureMip { mip, .. }) => {
            (&views.srv_mips, *mip, "per-mip shader resource")
        }
        (RangeType::UnorderedAccess, ShaderArgument::Resource(_)) => (&views.uav, 0, "unordered access"),
        (RangeType::UnorderedAccess, ShaderArgument::TextureMip { mip, .. }) => {
            (&views.uav, *mip, "per-mip unordered access")
        }
        (RangeType::Sampler, ShaderArgument::Resource(_)) => (&views.sampler, 0, "sampler"),
        (_, ShaderArgument::TextureMip { .. }) => {
            return Err(CommandError::InvalidArgument(
                "mip arguments can only fill shader resource and unordered access ranges"
                    .to_string(),
            ))
        }
    };
    match allocation {
        Some(allocation) if index < allocation.count() => Ok(allocation.handle(index)),
        _ => Err(CommandError::MissingView {
            resource: entry.id,
            view: name,
        }),
    }
}

fn check_buffer_range(entry: &ResourceEntry, required: u64) -> Result<(), CommandError> {
    let info = entry.buffer()?;
    if required > info.size {
        return Err(ResourceError::OutOfBounds {
            requested: required,
            available: info.size,
        }
        .into());
    }
    Ok(())
}

fn pod_words(bytes: &[u8]) -> Result<Vec<u32>, CommandError> {
    if bytes.len() % 4 != 0 {
        return Err(CommandError::InvalidArgument(format!(
            "{} bytes of constants are not a whole number of 32-bit values",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{DeviceSettings, IndirectArgumentType, ShaderType};
    use crate::renderer::pipeline::ComputePipelineState;
    use crate::renderer::resource::{BufferDescriptor, TextureDescriptor, TextureUsage};
    use crate::renderer::shader::ShaderDescriptor;
    use crate::renderer::signature::{DescriptorRange, ShaderParameter};
    use crate::renderer::traits::mock::{MockCommand, MockCommandList, MockDevice};
    use crate::renderer::{Device, DeviceDescriptor};

    fn validating_device() -> Device {
        Device::new(
            MockDevice::new(),
            DeviceDescriptor {
                settings: DeviceSettings {
                    validate_resource_states: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn compute_pipeline(device: &Device, parameters: Vec<ShaderParameter>) -> ComputePipelineState {
        let shader = device
            .create_shader(ShaderDescriptor::new(ShaderType::COMPUTE, vec![3u8; 8]))
            .unwrap();
        let signature = device.create_shader_signature("compute");
        signature.set_parameters(parameters);
        let mut pipeline = device.create_compute_pipeline("compute");
        pipeline.set_shader(shader).unwrap();
        pipeline.set_shader_signature(signature);
        pipeline
    }

    fn mock_list(cmd: &CommandBuffer) -> &MockCommandList {
        cmd.native_list().as_any().downcast_ref().unwrap()
    }

    #[test]
    fn test_transition_to_current_state_is_noop() {
        let device = validating_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::structured("data", 4, 16))
            .unwrap();
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.transition_resource(buffer, ResourceState::COMMON, false)
            .unwrap();
        assert_eq!(cmd.pending_barrier_count(), 0);
        cmd.flush_resource_barriers().unwrap();
        assert!(mock_list(&cmd).barrier_batches().is_empty());
    }

    #[test]
    fn test_transitions_are_queued_in_order() {
        let device = validating_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::structured("data", 4, 16))
            .unwrap();
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.transition_resource(buffer, ResourceState::COPY_DEST, false)
            .unwrap();
        cmd.transition_resource(buffer, ResourceState::COPY_SRC, false)
            .unwrap();
        assert_eq!(device.resource_state(buffer).unwrap(), ResourceState::COPY_SRC);
        assert_eq!(cmd.pending_barrier_count(), 2);

        cmd.flush_resource_barriers().unwrap();
        assert_eq!(cmd.pending_barrier_count(), 0);
        let list = mock_list(&cmd);
        let batches = list.barrier_batches();
        assert_eq!(batches.len(), 1);
        let states: Vec<_> = batches[0]
            .iter()
            .map(|barrier| match barrier {
                ResourceBarrierDesc::Transition {
                    state_before,
                    state_after,
                    ..
                } => (*state_before, *state_after),
                other => panic!("unexpected barrier {other:?}"),
            })
            .collect();
        assert_eq!(
            states,
            vec![
                (ResourceState::COMMON.to_native(), ResourceState::COPY_DEST.to_native()),
                (ResourceState::COPY_DEST.to_native(), ResourceState::COPY_SRC.to_native()),
            ]
        );
    }

    #[test]
    fn test_repeated_transition_queues_one_barrier() {
        let device = validating_device();
        let texture = device
            .create_texture(&TextureDescriptor {
                usage: TextureUsage::RENDER_TARGET,
                ..Default::default()
            })
            .unwrap();
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.transition_resource(texture, ResourceState::RENDER_TARGET, false)
            .unwrap();
        cmd.transition_resource(texture, ResourceState::RENDER_TARGET, false)
            .unwrap();
        assert_eq!(cmd.pending_barrier_count(), 1);
        cmd.transition_resource(texture, ResourceState::PIXEL_SHADER, true)
            .unwrap();
        assert_eq!(cmd.pending_barrier_count(), 0);
        assert_eq!(mock_list(&cmd).barrier_batches()[0].len(), 2);
    }

    #[test]
    fn test_dynamic_constant_buffers_get_distinct_memory() {
        let device = validating_device();
        let signature = device.create_shader_signature("per draw");
        signature.set_parameters(vec![ShaderParameter::constant_buffer(0, ShaderType::VERTEX)]);
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.bind_graphics_shader_signature(&signature).unwrap();
        cmd.bind_graphics_dynamic_constant_buffer(0, &[1u8; 64])
            .unwrap();
        cmd.bind_graphics_dynamic_constant_buffer(0, &[2u8; 64])
            .unwrap();

        let addresses: Vec<_> = mock_list(&cmd)
            .commands
            .iter()
            .filter_map(|c| match c {
                MockCommand::SetRootDescriptor(Pipeline::Graphics, 0, RootParameterType::Cbv, address) => {
                    Some(*address)
                }
                _ => None,
            })
            .collect();
        assert_eq!(addresses.len(), 2);
        assert_eq!(addresses[1] - addresses[0], 256);
    }

    #[test]
    fn test_dynamic_buffer_needs_matching_root_descriptor() {
        let device = validating_device();
        let signature = device.create_shader_signature("per draw");
        signature.set_parameters(vec![
            ShaderParameter::buffer(0, ShaderType::PIXEL),
            ShaderParameter::constants(4, 0, ShaderType::PIXEL),
        ]);
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.bind_graphics_shader_signature(&signature).unwrap();
        assert!(matches!(
            cmd.bind_graphics_dynamic_constant_buffer(0, &[0u8; 16]),
            Err(CommandError::IncompatibleParameter { slot: 0, .. })
        ));
        cmd.bind_graphics_dynamic_structured_buffer(0, &[1.0f32, 2.0, 3.0, 4.0])
            .unwrap();
        assert!(matches!(
            cmd.bind_graphics_dynamic_structured_buffer(1, &[1u32]),
            Err(CommandError::IncompatibleParameter { slot: 1, .. })
        ));
        assert!(matches!(
            cmd.bind_graphics_dynamic_constant_buffer(2, &[0u8; 16]),
            Err(CommandError::SlotOutOfRange { slot: 2, count: 2, .. })
        ));
    }

    #[test]
    fn test_draw_needs_signature_and_pipeline() {
        let device = validating_device();
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        assert_eq!(
            cmd.draw(3, 1, 0, 0),
            Err(CommandError::NoShaderSignatureBound(Pipeline::Graphics))
        );

        let signature = device.create_shader_signature("empty");
        cmd.bind_graphics_shader_signature(&signature).unwrap();
        assert_eq!(
            cmd.draw(3, 1, 0, 0),
            Err(CommandError::NoPipelineStateBound(Pipeline::Graphics))
        );
    }

    #[test]
    fn test_copy_queue_rejects_draws() {
        let device = validating_device();
        let mut cmd = device.queue(QueueType::Copy).command_buffer().unwrap();
        assert!(matches!(
            cmd.draw(3, 1, 0, 0),
            Err(CommandError::UnsupportedOnQueue {
                queue: QueueType::Copy,
                ..
            })
        ));
        assert!(matches!(
            cmd.dispatch(1, 1, 1),
            Err(CommandError::UnsupportedOnQueue { .. })
        ));
    }

    #[test]
    fn test_dispatch_validates_bound_states() {
        let device = validating_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::structured("particles", 64, 16).with_unordered_access())
            .unwrap();
        let mut pipeline =
            compute_pipeline(&device, vec![ShaderParameter::rw_buffer(0, ShaderType::COMPUTE)]);
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        pipeline.bind(&mut cmd).unwrap();
        cmd.bind_compute_shader_argument(0, ShaderArgument::Resource(buffer.into()))
            .unwrap();
        assert_eq!(device.resource_state(buffer).unwrap(), ResourceState::UAV);
        cmd.dispatch(4, 1, 1).unwrap();

        cmd.transition_resource(buffer, ResourceState::COPY_SRC, false)
            .unwrap();
        assert_eq!(
            cmd.dispatch(4, 1, 1),
            Err(CommandError::StateMismatch {
                resource: buffer.into(),
                expected: ResourceState::UAV,
                actual: ResourceState::COPY_SRC,
            })
        );

        // A new signature drops the requirement.
        let other = device.create_shader_signature("other");
        other.set_parameters(vec![ShaderParameter::constants(1, 0, ShaderType::COMPUTE)]);
        cmd.bind_compute_shader_signature(&other).unwrap();
        cmd.dispatch(4, 1, 1).unwrap();
        assert_eq!(
            mock_list(&cmd).count(|c| matches!(c, MockCommand::Dispatch(..))),
            2
        );
    }

    #[test]
    fn test_table_arguments_commit_on_dispatch() {
        let device = validating_device();
        let first = device
            .create_buffer(&BufferDescriptor::structured("a", 4, 16))
            .unwrap();
        let second = device
            .create_buffer(&BufferDescriptor::structured("b", 4, 16))
            .unwrap();
        let mut pipeline = compute_pipeline(
            &device,
            vec![ShaderParameter::table(
                vec![DescriptorRange::new(RangeType::ShaderResource, 2, 0)],
                ShaderType::COMPUTE,
            )],
        );
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        pipeline.bind(&mut cmd).unwrap();
        cmd.bind_compute_shader_arguments(
            0,
            0,
            &[
                ShaderArgument::Resource(first.into()),
                ShaderArgument::Resource(second.into()),
            ],
        )
        .unwrap();
        assert!(matches!(
            cmd.bind_compute_shader_arguments(0, 1, &[ShaderArgument::Resource(first.into()); 2]),
            Err(CommandError::DescriptorOutOfRange { slot: 0, offset: 2, count: 2 })
        ));
        cmd.dispatch(1, 1, 1).unwrap();
        cmd.dispatch(1, 1, 1).unwrap();

        assert_eq!(
            device.resource_state(second).unwrap(),
            ResourceState::NON_PIXEL_SHADER
        );
        let list = mock_list(&cmd);
        assert_eq!(list.count(|c| matches!(c, MockCommand::SetDescriptorHeaps(_))), 1);
        assert!(list.count(|c| matches!(c, MockCommand::SetRootTable(Pipeline::Compute, 0, _))) >= 1);
    }

    #[test]
    fn test_mip_argument_needs_the_level() {
        let device = validating_device();
        let texture = device.create_texture(&TextureDescriptor::default()).unwrap();
        let signature = device.create_shader_signature("sampled");
        signature.set_parameters(vec![ShaderParameter::texture(0, ShaderType::COMPUTE)]);
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.bind_compute_shader_signature(&signature).unwrap();
        cmd.bind_compute_shader_argument(0, ShaderArgument::TextureMip { texture, mip: 0 })
            .unwrap();
        assert_eq!(
            cmd.bind_compute_shader_argument(0, ShaderArgument::TextureMip { texture, mip: 3 }),
            Err(CommandError::MissingView {
                resource: texture.into(),
                view: "per-mip shader resource",
            })
        );
    }

    #[test]
    fn test_set_buffer_data_records_copy() {
        let device = validating_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::vertex("quad", 4, 16))
            .unwrap();
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.set_buffer_data(buffer, 16, &[7u8; 32]).unwrap();
        assert_eq!(device.resource_state(buffer).unwrap(), ResourceState::COPY_DEST);

        let list = mock_list(&cmd);
        assert_eq!(
            list.count(|c| matches!(c, MockCommand::CopyBufferRegion(_, 16, _, _, 32))),
            1
        );
        assert_eq!(list.barrier_batches().len(), 1);

        assert!(matches!(
            cmd.set_buffer_data(buffer, 48, &[0u8; 32]),
            Err(CommandError::Resource(ResourceError::OutOfBounds { .. }))
        ));
        assert!(matches!(
            cmd.set_buffer_data(buffer, u64::MAX, &[7u8; 4]),
            Err(CommandError::Resource(ResourceError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_indirect_ranges_are_checked() {
        let device = validating_device();
        let arguments = device
            .create_buffer(&BufferDescriptor::byte_address("dispatch args", 64))
            .unwrap();
        let signature = device
            .create_indirect_command_signature(IndirectArgumentType::Dispatch, 0)
            .unwrap();
        let mut pipeline = compute_pipeline(
            &device,
            vec![ShaderParameter::constants(1, 0, ShaderType::COMPUTE)],
        );
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        pipeline.bind(&mut cmd).unwrap();

        assert!(matches!(
            cmd.execute_indirect(&signature, 1, arguments, u64::MAX, None),
            Err(CommandError::Resource(ResourceError::OutOfBounds { .. }))
        ));
        assert!(matches!(
            cmd.execute_indirect(&signature, 1, arguments, 0, Some((arguments, u64::MAX - 1))),
            Err(CommandError::Resource(ResourceError::OutOfBounds { .. }))
        ));
    }

    #[test]
    fn test_oversized_argument_offsets_are_out_of_range() {
        let device = validating_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::structured("a", 4, 16))
            .unwrap();
        let mut pipeline = compute_pipeline(
            &device,
            vec![
                ShaderParameter::table(
                    vec![DescriptorRange::new(RangeType::ShaderResource, 2, 0)],
                    ShaderType::COMPUTE,
                ),
                ShaderParameter::rw_buffer(0, ShaderType::COMPUTE),
            ],
        );
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        pipeline.bind(&mut cmd).unwrap();

        let arguments = [ShaderArgument::Resource(buffer.into()); 2];
        assert!(matches!(
            cmd.bind_compute_shader_arguments(0, u32::MAX, &arguments),
            Err(CommandError::DescriptorOutOfRange {
                slot: 0,
                count: 2,
                ..
            })
        ));
        assert!(matches!(
            cmd.bind_compute_shader_arguments(1, u32::MAX, &arguments),
            Err(CommandError::DescriptorOutOfRange {
                slot: 1,
                offset: u32::MAX,
                count: 1,
            })
        ));
    }

    #[test]
    fn test_commands_need_recording() {
        let device = validating_device();
        let buffer = device
            .create_buffer(&BufferDescriptor::structured("data", 4, 16))
            .unwrap();
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.end().unwrap();
        assert!(!cmd.is_recording());
        assert_eq!(
            cmd.transition_resource(buffer, ResourceState::COPY_DEST, false),
            Err(CommandError::NotRecording)
        );
    }

    #[test]
    fn test_same_topology_is_elided() {
        let device = validating_device();
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.set_primitive_topology(PrimitiveTopology::TriangleList, 0)
            .unwrap();
        cmd.set_primitive_topology(PrimitiveTopology::TriangleList, 0)
            .unwrap();
        cmd.set_primitive_topology(PrimitiveTopology::LineList, 0)
            .unwrap();
        assert_eq!(
            mock_list(&cmd).count(|c| matches!(c, MockCommand::SetTopology(_))),
            2
        );
    }

    #[test]
    fn test_query_ranges() {
        let device = validating_device();
        let timer = device.create_query(QueryType::Timer, 2).unwrap();
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.begin_query(&timer, 1).unwrap();
        cmd.end_query(&timer, 1).unwrap();
        cmd.resolve_query(&timer, 0, 2).unwrap();
        assert!(matches!(
            cmd.resolve_query(&timer, 1, 2),
            Err(CommandError::InvalidArgument(_))
        ));

        let occlusion = device.create_query(QueryType::Occlusion, 1).unwrap();
        let mut compute = device.queue(QueueType::Compute).command_buffer().unwrap();
        assert!(matches!(
            compute.begin_query(&occlusion, 0),
            Err(CommandError::UnsupportedOnQueue { .. })
        ));
    }
}
