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

//! A recording mock of the native seam, shared by the unit tests.

use super::{NativeCommandList, NativeDevice, NativeQueue};
use crate::renderer::api::native::*;
use crate::renderer::api::Pipeline;
use crate::renderer::error::NativeError;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const HEAP_ADDRESS_STRIDE: u64 = 0x0100_0000;
const DESCRIPTOR_INCREMENT: u32 = 32;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MockCommand {
    Barriers(Vec<ResourceBarrierDesc>),
    SetDescriptorHeaps(Vec<NativeHandle>),
    SetPipelineState(NativeHandle),
    SetRootSignature(Pipeline, NativeHandle),
    SetRootTable(Pipeline, u32, GpuDescriptorHandle),
    SetRootConstants(Pipeline, u32, Vec<u32>),
    SetRootDescriptor(Pipeline, u32, RootParameterType, GpuVirtualAddress),
    SetTopology(PrimitiveTopology),
    SetVertexBuffers(u32, Vec<VertexBufferView>),
    SetIndexBuffer(Option<IndexBufferView>),
    SetRenderTargets(Vec<CpuDescriptorHandle>, Option<CpuDescriptorHandle>),
    SetStencilRef(u32),
    SetBlendFactor([f32; 4]),
    SetViewports(Vec<Viewport>),
    SetScissorRects(Vec<Rect>),
    CopyBufferRegion(NativeHandle, u64, NativeHandle, u64, u64),
    Draw(u32, u32, u32, u32),
    DrawIndexed(u32, u32, u32, i32, u32),
    Dispatch(u32, u32, u32),
    Other(&'static str),
}

#[derive(Debug, Default)]
pub(crate) struct MockDevice {
    next_handle: AtomicU64,
    pub root_signatures_created: AtomicUsize,
    pub pipelines_created: AtomicUsize,
    pub fail_pipelines: AtomicBool,
    pub released: Mutex<Vec<NativeHandle>>,
    pub writes: Mutex<Vec<(NativeHandle, u64, Vec<u8>)>>,
    pub last_root_signature: Mutex<Option<RootSignatureDesc>>,
    pub last_graphics_pipeline: Mutex<Option<GraphicsPipelineDesc>>,
    pub views: Mutex<Vec<(CpuDescriptorHandle, ViewDesc)>>,
    pub descriptor_copies: AtomicUsize,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            next_handle: AtomicU64::new(1),
            ..Default::default()
        })
    }

    fn next(&self) -> NativeHandle {
        NativeHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }
}

impl NativeDevice for MockDevice {
    fn create_command_queue(
        &self,
        list_type: CommandListType,
    ) -> Result<Box<dyn NativeQueue>, NativeError> {
        Ok(Box::new(MockQueue {
            list_type,
            fence: self.next(),
            completed: AtomicU64::new(0),
        }))
    }

    fn create_command_list(
        &self,
        list_type: CommandListType,
    ) -> Result<Box<dyn NativeCommandList>, NativeError> {
        Ok(Box::new(MockCommandList {
            list_type,
            open: false,
            commands: Vec::new(),
        }))
    }

    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Result<NativeHandle, NativeError> {
        self.root_signatures_created.fetch_add(1, Ordering::Relaxed);
        *self.last_root_signature.lock().unwrap() = Some(desc.clone());
        Ok(self.next())
    }

    fn create_graphics_pipeline_state(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<NativeHandle, NativeError> {
        if self.fail_pipelines.load(Ordering::Relaxed) {
            return Err(NativeError::InvalidArgument("rejected by mock".to_string()));
        }
        self.pipelines_created.fetch_add(1, Ordering::Relaxed);
        *self.last_graphics_pipeline.lock().unwrap() = Some(desc.clone());
        Ok(self.next())
    }

    fn create_compute_pipeline_state(
        &self,
        _desc: &ComputePipelineDesc,
    ) -> Result<NativeHandle, NativeError> {
        if self.fail_pipelines.load(Ordering::Relaxed) {
            return Err(NativeError::InvalidArgument("rejected by mock".to_string()));
        }
        self.pipelines_created.fetch_add(1, Ordering::Relaxed);
        Ok(self.next())
    }

    fn create_command_signature(
        &self,
        _desc: &CommandSignatureDesc,
        _root_signature: Option<NativeHandle>,
    ) -> Result<NativeHandle, NativeError> {
        Ok(self.next())
    }

    fn create_query_heap(&self, _desc: &QueryHeapDesc) -> Result<NativeHandle, NativeError> {
        Ok(self.next())
    }

    fn create_committed_resource(
        &self,
        _desc: &ResourceDesc,
        _heap_type: HeapType,
        _initial_state: ResourceStates,
        _clear_value: Option<&ClearValue>,
    ) -> Result<CommittedResource, NativeError> {
        let handle = self.next();
        Ok(CommittedResource {
            handle,
            gpu_address: handle.0 * HEAP_ADDRESS_STRIDE,
        })
    }

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapInfo, NativeError> {
        let handle = self.next();
        let base = handle.0 * HEAP_ADDRESS_STRIDE;
        Ok(DescriptorHeapInfo {
            handle,
            cpu_start: CpuDescriptorHandle { ptr: base as usize },
            gpu_start: if desc.shader_visible {
                GpuDescriptorHandle { ptr: base }
            } else {
                GpuDescriptorHandle::NULL
            },
        })
    }

    fn descriptor_handle_increment_size(&self, _heap_type: DescriptorHeapType) -> u32 {
        DESCRIPTOR_INCREMENT
    }

    fn create_view(&self, desc: &ViewDesc, dest: CpuDescriptorHandle) -> Result<(), NativeError> {
        self.views.lock().unwrap().push((dest, *desc));
        Ok(())
    }

    fn copy_descriptors_simple(
        &self,
        count: u32,
        _dest: CpuDescriptorHandle,
        _src: CpuDescriptorHandle,
        _heap_type: DescriptorHeapType,
    ) {
        self.descriptor_copies
            .fetch_add(count as usize, Ordering::Relaxed);
    }

    fn write_buffer(
        &self,
        resource: NativeHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), NativeError> {
        self.writes
            .lock()
            .unwrap()
            .push((resource, offset, data.to_vec()));
        Ok(())
    }

    fn read_buffer(
        &self,
        _resource: NativeHandle,
        _offset: u64,
        out: &mut [u8],
    ) -> Result<(), NativeError> {
        out.fill(0);
        Ok(())
    }

    fn multisample_quality_levels(&self, _format: Format, sample_count: u32) -> u32 {
        u32::from(sample_count <= 8)
    }

    fn set_name(&self, _handle: NativeHandle, _name: &str) {}

    fn release(&self, handle: NativeHandle) {
        self.released.lock().unwrap().push(handle);
    }

    fn device_removed_reason(&self) -> Option<NativeError> {
        None
    }
}

#[derive(Debug)]
pub(crate) struct MockQueue {
    list_type: CommandListType,
    fence: NativeHandle,
    completed: AtomicU64,
}

impl NativeQueue for MockQueue {
    fn list_type(&self) -> CommandListType {
        self.list_type
    }

    fn execute_command_list(&self, _list: &mut dyn NativeCommandList) -> Result<(), NativeError> {
        Ok(())
    }

    fn signal(&self, value: u64) -> Result<(), NativeError> {
        self.completed.fetch_max(value, Ordering::AcqRel);
        Ok(())
    }

    fn fence(&self) -> NativeHandle {
        self.fence
    }

    fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn wait_for_value(&self, _value: u64) -> Result<(), NativeError> {
        Ok(())
    }

    fn wait_for_fence(&self, _fence: NativeHandle, _value: u64) -> Result<(), NativeError> {
        Ok(())
    }

    fn timestamp_frequency(&self) -> Result<u64, NativeError> {
        Ok(1_000_000)
    }
}

#[derive(Debug)]
pub(crate) struct MockCommandList {
    list_type: CommandListType,
    pub open: bool,
    pub commands: Vec<MockCommand>,
}

impl MockCommandList {
    pub fn barrier_batches(&self) -> Vec<&Vec<ResourceBarrierDesc>> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                MockCommand::Barriers(b) => Some(b),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&MockCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }
}

impl NativeCommandList for MockCommandList {
    fn list_type(&self) -> CommandListType {
        self.list_type
    }

    fn reset(&mut self) -> Result<(), NativeError> {
        self.open = true;
        self.commands.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), NativeError> {
        self.open = false;
        Ok(())
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrierDesc]) {
        self.commands.push(MockCommand::Barriers(barriers.to_vec()));
    }

    fn set_descriptor_heaps(&mut self, heaps: &[NativeHandle]) {
        self.commands
            .push(MockCommand::SetDescriptorHeaps(heaps.to_vec()));
    }

    fn set_pipeline_state(&mut self, pipeline_state: NativeHandle) {
        self.commands
            .push(MockCommand::SetPipelineState(pipeline_state));
    }

    fn set_root_signature(&mut self, pipeline: Pipeline, root_signature: NativeHandle) {
        self.commands
            .push(MockCommand::SetRootSignature(pipeline, root_signature));
    }

    fn set_root_descriptor_table(
        &mut self,
        pipeline: Pipeline,
        root_index: u32,
        base: GpuDescriptorHandle,
    ) {
        self.commands
            .push(MockCommand::SetRootTable(pipeline, root_index, base));
    }

    fn set_root_32bit_constants(
        &mut self,
        pipeline: Pipeline,
        root_index: u32,
        values: &[u32],
        _dest_offset: u32,
    ) {
        self.commands.push(MockCommand::SetRootConstants(
            pipeline,
            root_index,
            values.to_vec(),
        ));
    }

    fn set_root_descriptor(
        &mut self,
        pipeline: Pipeline,
        root_index: u32,
        parameter_type: RootParameterType,
        address: GpuVirtualAddress,
    ) {
        self.commands.push(MockCommand::SetRootDescriptor(
            pipeline,
            root_index,
            parameter_type,
            address,
        ));
    }

    fn ia_set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.commands.push(MockCommand::SetTopology(topology));
    }

    fn ia_set_vertex_buffers(&mut self, start_slot: u32, views: &[VertexBufferView]) {
        self.commands
            .push(MockCommand::SetVertexBuffers(start_slot, views.to_vec()));
    }

    fn ia_set_index_buffer(&mut self, view: Option<&IndexBufferView>) {
        self.commands
            .push(MockCommand::SetIndexBuffer(view.copied()));
    }

    fn om_set_render_targets(
        &mut self,
        render_targets: &[CpuDescriptorHandle],
        depth_stencil: Option<CpuDescriptorHandle>,
    ) {
        self.commands.push(MockCommand::SetRenderTargets(
            render_targets.to_vec(),
            depth_stencil,
        ));
    }

    fn om_set_stencil_ref(&mut self, reference: u32) {
        self.commands.push(MockCommand::SetStencilRef(reference));
    }

    fn om_set_blend_factor(&mut self, factor: [f32; 4]) {
        self.commands.push(MockCommand::SetBlendFactor(factor));
    }

    fn rs_set_viewports(&mut self, viewports: &[Viewport]) {
        self.commands
            .push(MockCommand::SetViewports(viewports.to_vec()));
    }

    fn rs_set_scissor_rects(&mut self, rects: &[Rect]) {
        self.commands
            .push(MockCommand::SetScissorRects(rects.to_vec()));
    }

    fn clear_render_target_view(&mut self, _view: CpuDescriptorHandle, _color: [f32; 4]) {
        self.commands.push(MockCommand::Other("clear_rtv"));
    }

    fn clear_depth_stencil_view(
        &mut self,
        _view: CpuDescriptorHandle,
        _flags: ClearFlags,
        _depth: f32,
        _stencil: u8,
    ) {
        self.commands.push(MockCommand::Other("clear_dsv"));
    }

    fn clear_unordered_access_view_float(
        &mut self,
        _gpu: GpuDescriptorHandle,
        _cpu: CpuDescriptorHandle,
        _resource: NativeHandle,
        _values: [f32; 4],
    ) {
        self.commands.push(MockCommand::Other("clear_uav_float"));
    }

    fn clear_unordered_access_view_uint(
        &mut self,
        _gpu: GpuDescriptorHandle,
        _cpu: CpuDescriptorHandle,
        _resource: NativeHandle,
        _values: [u32; 4],
    ) {
        self.commands.push(MockCommand::Other("clear_uav_uint"));
    }

    fn copy_resource(&mut self, _dest: NativeHandle, _src: NativeHandle) {
        self.commands.push(MockCommand::Other("copy_resource"));
    }

    fn copy_buffer_region(
        &mut self,
        dest: NativeHandle,
        dest_offset: u64,
        src: NativeHandle,
        src_offset: u64,
        num_bytes: u64,
    ) {
        self.commands.push(MockCommand::CopyBufferRegion(
            dest,
            dest_offset,
            src,
            src_offset,
            num_bytes,
        ));
    }

    fn copy_texture_region(
        &mut self,
        _dest: NativeHandle,
        _dest_subresource: u32,
        _src: NativeHandle,
        _footprint: PlacedSubresourceFootprint,
    ) {
        self.commands.push(MockCommand::Other("copy_texture_region"));
    }

    fn resolve_subresource(
        &mut self,
        _dest: NativeHandle,
        _dest_subresource: u32,
        _src: NativeHandle,
        _src_subresource: u32,
        _format: Format,
    ) {
        self.commands.push(MockCommand::Other("resolve_subresource"));
    }

    fn draw_instanced(
        &mut self,
        vertex_count: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    ) {
        self.commands.push(MockCommand::Draw(
            vertex_count,
            instance_count,
            start_vertex,
            start_instance,
        ));
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    ) {
        self.commands.push(MockCommand::DrawIndexed(
            index_count,
            instance_count,
            start_index,
            base_vertex,
            start_instance,
        ));
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.commands.push(MockCommand::Dispatch(x, y, z));
    }

    fn execute_indirect(
        &mut self,
        _command_signature: NativeHandle,
        _max_command_count: u32,
        _argument_buffer: NativeHandle,
        _argument_offset: u64,
        _count_buffer: Option<NativeHandle>,
        _count_offset: u64,
    ) {
        self.commands.push(MockCommand::Other("execute_indirect"));
    }

    fn begin_query(&mut self, _heap: NativeHandle, _query_type: QueryType, _index: u32) {
        self.commands.push(MockCommand::Other("begin_query"));
    }

    fn end_query(&mut self, _heap: NativeHandle, _query_type: QueryType, _index: u32) {
        self.commands.push(MockCommand::Other("end_query"));
    }

    fn resolve_query_data(
        &mut self,
        _heap: NativeHandle,
        _query_type: QueryType,
        _start_index: u32,
        _count: u32,
        _dest: NativeHandle,
        _dest_offset: u64,
    ) {
        self.commands.push(MockCommand::Other("resolve_query_data"));
    }

    fn begin_event(&mut self, _name: &str) {
        self.commands.push(MockCommand::Other("begin_event"));
    }

    fn end_event(&mut self) {
        self.commands.push(MockCommand::Other("end_event"));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
