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

//! The native graphics API seam.
//!
//! Everything the engine asks of the hardware goes through the three traits
//! in this module. Their methods mirror the `ID3D12Device`,
//! `ID3D12GraphicsCommandList` and `ID3D12CommandQueue` entry points, taking
//! the description structures of [`crate::renderer::api::native`].

use crate::renderer::api::native::*;
use crate::renderer::api::Pipeline;
use crate::renderer::error::NativeError;
use std::any::Any;
use std::fmt::Debug;

/// A native device: the factory for every native object.
pub trait NativeDevice: Send + Sync + Debug + 'static {
    /// Creates a command queue of the given type.
    /// ## Errors
    /// * `NativeError` - If the device cannot create the queue.
    fn create_command_queue(
        &self,
        list_type: CommandListType,
    ) -> Result<Box<dyn NativeQueue>, NativeError>;

    /// Creates a command list (with its allocator) of the given type, in the closed state.
    fn create_command_list(
        &self,
        list_type: CommandListType,
    ) -> Result<Box<dyn NativeCommandList>, NativeError>;

    /// Creates a root signature.
    /// ## Arguments
    /// * `desc` - The root signature layout.
    /// ## Returns
    /// The handle of the created root signature.
    /// ## Errors
    /// * `NativeError::InvalidArgument` - If the driver rejects the layout.
    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Result<NativeHandle, NativeError>;

    /// Creates a graphics pipeline state object.
    fn create_graphics_pipeline_state(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<NativeHandle, NativeError>;

    /// Creates a compute pipeline state object.
    fn create_compute_pipeline_state(
        &self,
        desc: &ComputePipelineDesc,
    ) -> Result<NativeHandle, NativeError>;

    /// Creates an indirect command signature.
    ///
    /// `root_signature` is only required when the arguments change root bindings.
    fn create_command_signature(
        &self,
        desc: &CommandSignatureDesc,
        root_signature: Option<NativeHandle>,
    ) -> Result<NativeHandle, NativeError>;

    /// Creates a query heap.
    fn create_query_heap(&self, desc: &QueryHeapDesc) -> Result<NativeHandle, NativeError>;

    /// Creates a committed resource and its implicit heap.
    /// ## Arguments
    /// * `desc` - The resource description.
    /// * `heap_type` - The memory pool of the implicit heap.
    /// * `initial_state` - The state the resource is created in.
    /// * `clear_value` - The optimized clear value of render and depth targets.
    /// ## Errors
    /// * `NativeError::OutOfMemory` - If the allocation fails.
    fn create_committed_resource(
        &self,
        desc: &ResourceDesc,
        heap_type: HeapType,
        initial_state: ResourceStates,
        clear_value: Option<&ClearValue>,
    ) -> Result<CommittedResource, NativeError>;

    /// Creates a descriptor heap.
    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapInfo, NativeError>;

    /// Size in bytes between two descriptors of a heap type.
    fn descriptor_handle_increment_size(&self, heap_type: DescriptorHeapType) -> u32;

    /// Writes a view into the descriptor at `dest`.
    fn create_view(&self, desc: &ViewDesc, dest: CpuDescriptorHandle) -> Result<(), NativeError>;

    /// Copies `count` descriptors from `src` to `dest`.
    fn copy_descriptors_simple(
        &self,
        count: u32,
        dest: CpuDescriptorHandle,
        src: CpuDescriptorHandle,
        heap_type: DescriptorHeapType,
    );

    /// Writes `data` into mapped memory of an upload-heap resource.
    fn write_buffer(&self, resource: NativeHandle, offset: u64, data: &[u8])
        -> Result<(), NativeError>;

    /// Reads mapped memory of a readback-heap resource into `out`.
    fn read_buffer(&self, resource: NativeHandle, offset: u64, out: &mut [u8])
        -> Result<(), NativeError>;

    /// Returns the number of quality levels for `format` at `sample_count`
    /// (zero when unsupported).
    fn multisample_quality_levels(&self, format: Format, sample_count: u32) -> u32;

    /// Assigns a debug name to a native object.
    fn set_name(&self, handle: NativeHandle, name: &str);

    /// Releases a native object.
    fn release(&self, handle: NativeHandle);

    /// Returns the removal reason if the device has been removed.
    fn device_removed_reason(&self) -> Option<NativeError>;
}

/// A native command queue with its fence.
pub trait NativeQueue: Send + Sync + Debug {
    /// The command list type the queue accepts.
    fn list_type(&self) -> CommandListType;

    /// Submits a closed command list.
    fn execute_command_list(&self, list: &mut dyn NativeCommandList) -> Result<(), NativeError>;

    /// Signals the queue's fence to `value` once prior work completes.
    fn signal(&self, value: u64) -> Result<(), NativeError>;

    /// The handle of the queue's fence.
    fn fence(&self) -> NativeHandle;

    /// The last value the queue's fence reached.
    fn completed_value(&self) -> u64;

    /// Blocks the calling thread until the queue's fence reaches `value`.
    fn wait_for_value(&self, value: u64) -> Result<(), NativeError>;

    /// Makes the queue wait on the GPU until `fence` reaches `value`.
    fn wait_for_fence(&self, fence: NativeHandle, value: u64) -> Result<(), NativeError>;

    /// Timestamp ticks per second.
    fn timestamp_frequency(&self) -> Result<u64, NativeError>;
}

/// A native command list and its allocator.
///
/// Graphics and compute root-binding calls take a [`Pipeline`] instead of
/// duplicating every `SetGraphicsRoot*`/`SetComputeRoot*` method.
pub trait NativeCommandList: Send + Debug {
    /// The list type.
    fn list_type(&self) -> CommandListType;

    /// Resets the allocator and reopens the list for recording.
    fn reset(&mut self) -> Result<(), NativeError>;

    /// Closes the list.
    fn close(&mut self) -> Result<(), NativeError>;

    /// Records resource barriers.
    fn resource_barrier(&mut self, barriers: &[ResourceBarrierDesc]);

    /// Binds shader-visible descriptor heaps.
    fn set_descriptor_heaps(&mut self, heaps: &[NativeHandle]);

    /// Binds a pipeline state object.
    fn set_pipeline_state(&mut self, pipeline_state: NativeHandle);

    /// Binds the root signature of a pipeline.
    fn set_root_signature(&mut self, pipeline: Pipeline, root_signature: NativeHandle);

    /// Binds a descriptor table.
    fn set_root_descriptor_table(
        &mut self,
        pipeline: Pipeline,
        root_index: u32,
        base: GpuDescriptorHandle,
    );

    /// Writes inline 32-bit constants.
    fn set_root_32bit_constants(
        &mut self,
        pipeline: Pipeline,
        root_index: u32,
        values: &[u32],
        dest_offset: u32,
    );

    /// Binds a root descriptor of type `Cbv`, `Srv` or `Uav`.
    fn set_root_descriptor(
        &mut self,
        pipeline: Pipeline,
        root_index: u32,
        parameter_type: RootParameterType,
        address: GpuVirtualAddress,
    );

    /// Sets the input-assembler topology.
    fn ia_set_primitive_topology(&mut self, topology: PrimitiveTopology);

    /// Binds vertex buffers starting at `start_slot`.
    fn ia_set_vertex_buffers(&mut self, start_slot: u32, views: &[VertexBufferView]);

    /// Binds (or unbinds) the index buffer.
    fn ia_set_index_buffer(&mut self, view: Option<&IndexBufferView>);

    /// Binds render target and depth-stencil views.
    fn om_set_render_targets(
        &mut self,
        render_targets: &[CpuDescriptorHandle],
        depth_stencil: Option<CpuDescriptorHandle>,
    );

    /// Sets the stencil reference value.
    fn om_set_stencil_ref(&mut self, reference: u32);

    /// Sets the constant blend factor.
    fn om_set_blend_factor(&mut self, factor: [f32; 4]);

    /// Sets the viewports.
    fn rs_set_viewports(&mut self, viewports: &[Viewport]);

    /// Sets the scissor rectangles.
    fn rs_set_scissor_rects(&mut self, rects: &[Rect]);

    /// Clears a render target view.
    fn clear_render_target_view(&mut self, view: CpuDescriptorHandle, color: [f32; 4]);

    /// Clears a depth-stencil view.
    fn clear_depth_stencil_view(
        &mut self,
        view: CpuDescriptorHandle,
        flags: ClearFlags,
        depth: f32,
        stencil: u8,
    );

    /// Clears an unordered access view with float values.
    fn clear_unordered_access_view_float(
        &mut self,
        gpu: GpuDescriptorHandle,
        cpu: CpuDescriptorHandle,
        resource: NativeHandle,
        values: [f32; 4],
    );

    /// Clears an unordered access view with integer values.
    fn clear_unordered_access_view_uint(
        &mut self,
        gpu: GpuDescriptorHandle,
        cpu: CpuDescriptorHandle,
        resource: NativeHandle,
        values: [u32; 4],
    );

    /// Copies a whole resource.
    fn copy_resource(&mut self, dest: NativeHandle, src: NativeHandle);

    /// Copies a byte range between buffers.
    fn copy_buffer_region(
        &mut self,
        dest: NativeHandle,
        dest_offset: u64,
        src: NativeHandle,
        src_offset: u64,
        num_bytes: u64,
    );

    /// Copies a buffer footprint into a texture subresource.
    fn copy_texture_region(
        &mut self,
        dest: NativeHandle,
        dest_subresource: u32,
        src: NativeHandle,
        footprint: PlacedSubresourceFootprint,
    );

    /// Resolves a multisampled subresource.
    fn resolve_subresource(
        &mut self,
        dest: NativeHandle,
        dest_subresource: u32,
        src: NativeHandle,
        src_subresource: u32,
        format: Format,
    );

    /// Draws non-indexed, instanced primitives.
    fn draw_instanced(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    );

    /// Draws indexed, instanced primitives.
    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    );

    /// Dispatches compute thread groups.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Executes commands described by an argument buffer.
    #[allow(clippy::too_many_arguments)]
    fn execute_indirect(
        &mut self,
        command_signature: NativeHandle,
        max_command_count: u32,
        argument_buffer: NativeHandle,
        argument_offset: u64,
        count_buffer: Option<NativeHandle>,
        count_offset: u64,
    );

    /// Begins a query.
    fn begin_query(&mut self, heap: NativeHandle, query_type: QueryType, index: u32);

    /// Ends a query (or writes a timestamp).
    fn end_query(&mut self, heap: NativeHandle, query_type: QueryType, index: u32);

    /// Resolves query results into a buffer.
    fn resolve_query_data(
        &mut self,
        heap: NativeHandle,
        query_type: QueryType,
        start_index: u32,
        count: u32,
        dest: NativeHandle,
        dest_offset: u64,
    );

    /// Opens a named profiling region.
    fn begin_event(&mut self, name: &str);

    /// Closes the innermost profiling region.
    fn end_event(&mut self);

    /// Allows backends and tests to reach the concrete list.
    fn as_any(&self) -> &dyn Any;
}
