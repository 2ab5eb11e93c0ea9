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

use super::state::{HeadlessObject, HeadlessState, ResourceMemory};
use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use umbra_core::renderer::api::native::{
    ClearFlags, CommandListType, CpuDescriptorHandle, Format, GpuDescriptorHandle,
    GpuVirtualAddress, IndexBufferView, NativeHandle, PlacedSubresourceFootprint,
    PrimitiveTopology, QueryType, Rect, ResourceBarrierDesc, ResourceStates, RootParameterType,
    VertexBufferView, Viewport, RESOURCE_BARRIER_ALL_SUBRESOURCES,
};
use umbra_core::renderer::{NativeCommandList, NativeError, Pipeline};

/// A recorded command with an effect on device memory.
///
/// Binding commands only update the list's counters; nothing is rasterized.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Op {
    Barriers(Vec<ResourceBarrierDesc>),
    CopyBuffer {
        dest: NativeHandle,
        dest_offset: u64,
        src: NativeHandle,
        src_offset: u64,
        num_bytes: u64,
    },
    CopyResource {
        dest: NativeHandle,
        src: NativeHandle,
    },
    CopyTexture {
        dest: NativeHandle,
        subresource: u32,
        src: NativeHandle,
        footprint: PlacedSubresourceFootprint,
    },
    Resolve {
        dest: NativeHandle,
        dest_subresource: u32,
        src: NativeHandle,
        src_subresource: u32,
    },
    ClearUnorderedAccess {
        resource: NativeHandle,
        word: u32,
    },
    Clear,
    BeginQuery {
        heap: NativeHandle,
        index: u32,
    },
    EndQuery {
        heap: NativeHandle,
        query_type: QueryType,
        index: u32,
    },
    ResolveQuery {
        heap: NativeHandle,
        start: u32,
        count: u32,
        dest: NativeHandle,
        dest_offset: u64,
    },
    Draw,
    Dispatch,
    ExecuteIndirect,
}

/// A command list of a [`HeadlessDevice`](super::HeadlessDevice).
///
/// Commands are recorded into a list of operations that the queue replays
/// against device memory on submission.
#[derive(Debug)]
pub struct HeadlessCommandList {
    state: Arc<HeadlessState>,
    list_type: CommandListType,
    open: bool,
    event_depth: u32,
    bindings: usize,
    pub(crate) ops: Vec<Op>,
}

impl HeadlessCommandList {
    pub(crate) fn new(state: Arc<HeadlessState>, list_type: CommandListType) -> Self {
        Self {
            state,
            list_type,
            open: false,
            event_depth: 0,
            bindings: 0,
            ops: Vec::new(),
        }
    }

    /// Returns `true` between `reset` and `close`.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Number of recorded operations that touch memory or issue work.
    pub fn op_count(&self) -> usize {
        self.ops.len()
    }

    /// Number of recorded binding and dynamic-state commands.
    pub fn binding_count(&self) -> usize {
        self.bindings
    }

    fn ensure_open(&self, command: &str) -> bool {
        if !self.open {
            self.state
                .report(format!("{command} recorded on a closed command list"));
        }
        self.open
    }

    fn record(&mut self, command: &str, op: Op) {
        if self.ensure_open(command) {
            self.ops.push(op);
        }
    }

    fn bind(&mut self, command: &str) {
        if self.ensure_open(command) {
            self.bindings += 1;
        }
    }

    /// Replays the recorded operations against device memory.
    pub(crate) fn replay(&self) {
        let state = &self.state;
        let mut objects = state.objects.lock().unwrap();
        let mut draws = 0u64;
        let mut occlusion_starts: HashMap<(NativeHandle, u32), u64> = HashMap::new();

        for op in &self.ops {
            match op {
                Op::Barriers(barriers) => {
                    state
                        .stats
                        .barriers
                        .fetch_add(barriers.len() as u64, Ordering::Relaxed);
                    for barrier in barriers {
                        apply_barrier(state, &mut objects, barrier);
                    }
                }
                &Op::CopyBuffer {
                    dest,
                    dest_offset,
                    src,
                    src_offset,
                    num_bytes,
                } => {
                    state.stats.copies.fetch_add(1, Ordering::Relaxed);
                    let Some(bytes) = read_range(
                        state,
                        &objects,
                        src,
                        0,
                        src_offset,
                        num_bytes,
                        ResourceStates::COPY_SOURCE,
                    ) else {
                        continue;
                    };
                    write_range(
                        state,
                        &mut objects,
                        dest,
                        0,
                        dest_offset,
                        &bytes,
                        ResourceStates::COPY_DEST,
                    );
                }
                &Op::CopyResource { dest, src } => {
                    state.stats.copies.fetch_add(1, Ordering::Relaxed);
                    copy_resource(state, &mut objects, dest, src);
                }
                &Op::CopyTexture {
                    dest,
                    subresource,
                    src,
                    footprint,
                } => {
                    state.stats.copies.fetch_add(1, Ordering::Relaxed);
                    copy_footprint(state, &mut objects, dest, subresource, src, footprint);
                }
                &Op::Resolve {
                    dest,
                    dest_subresource,
                    src,
                    src_subresource,
                } => {
                    let Some(texels) = subresource_bytes(
                        state,
                        &objects,
                        src,
                        src_subresource,
                        ResourceStates::RESOLVE_SOURCE,
                    ) else {
                        continue;
                    };
                    write_range(
                        state,
                        &mut objects,
                        dest,
                        dest_subresource,
                        0,
                        &texels,
                        ResourceStates::RESOLVE_DEST,
                    );
                }
                &Op::ClearUnorderedAccess { resource, word } => {
                    state.stats.clears.fetch_add(1, Ordering::Relaxed);
                    if let Some(memory) = resource_mut(state, &mut objects, resource) {
                        let pattern = word.to_le_bytes();
                        for block in &mut memory.subresources {
                            for (i, byte) in block.iter_mut().enumerate() {
                                *byte = pattern[i % 4];
                            }
                        }
                    }
                }
                Op::Clear => {
                    state.stats.clears.fetch_add(1, Ordering::Relaxed);
                }
                &Op::BeginQuery { heap, index } => {
                    occlusion_starts.insert((heap, index), draws);
                }
                &Op::EndQuery {
                    heap,
                    query_type,
                    index,
                } => {
                    let value = match query_type {
                        QueryType::Timestamp => state.ticks(),
                        QueryType::Occlusion | QueryType::BinaryOcclusion => {
                            let Some(start) = occlusion_starts.remove(&(heap, index)) else {
                                state.report(format!(
                                    "query {index} of {heap:?} ended without being begun"
                                ));
                                continue;
                            };
                            let passed = draws - start;
                            if query_type == QueryType::BinaryOcclusion {
                                passed.min(1)
                            } else {
                                passed
                            }
                        }
                    };
                    match objects.get_mut(&heap) {
                        Some(HeadlessObject::QueryHeap(values)) if (index as usize) < values.len() => {
                            values[index as usize] = value;
                        }
                        _ => state.report(format!("query {index} of {heap:?} does not exist")),
                    }
                }
                &Op::ResolveQuery {
                    heap,
                    start,
                    count,
                    dest,
                    dest_offset,
                } => {
                    let range = start as usize..(start + count) as usize;
                    let bytes: Vec<u8> = match objects.get(&heap) {
                        Some(HeadlessObject::QueryHeap(values)) if range.end <= values.len() => {
                            values[range].iter().flat_map(|v| v.to_le_bytes()).collect()
                        }
                        _ => {
                            state.report(format!(
                                "resolve of queries {start}..{} exceeds {heap:?}",
                                start + count
                            ));
                            continue;
                        }
                    };
                    write_range(
                        state,
                        &mut objects,
                        dest,
                        0,
                        dest_offset,
                        &bytes,
                        ResourceStates::COPY_DEST,
                    );
                }
                Op::Draw => {
                    draws += 1;
                    state.stats.draws.fetch_add(1, Ordering::Relaxed);
                }
                Op::Dispatch => {
                    state.stats.dispatches.fetch_add(1, Ordering::Relaxed);
                }
                Op::ExecuteIndirect => {
                    state
                        .stats
                        .indirect_executions
                        .fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

type Objects = HashMap<NativeHandle, HeadlessObject>;

fn resource<'a>(
    state: &HeadlessState,
    objects: &'a Objects,
    handle: NativeHandle,
) -> Option<&'a ResourceMemory> {
    match objects.get(&handle) {
        Some(HeadlessObject::Resource(memory)) => Some(memory),
        _ => {
            state.report(format!("{handle:?} is not a live resource"));
            None
        }
    }
}

fn resource_mut<'a>(
    state: &HeadlessState,
    objects: &'a mut Objects,
    handle: NativeHandle,
) -> Option<&'a mut ResourceMemory> {
    match objects.get_mut(&handle) {
        Some(HeadlessObject::Resource(memory)) => Some(memory),
        _ => {
            state.report(format!("{handle:?} is not a live resource"));
            None
        }
    }
}

fn apply_barrier(state: &HeadlessState, objects: &mut Objects, barrier: &ResourceBarrierDesc) {
    match *barrier {
        ResourceBarrierDesc::Transition {
            resource,
            subresource,
            state_before,
            state_after,
        } => {
            let Some(memory) = resource_mut(state, objects, resource) else {
                return;
            };
            let count = memory.states.len() as u32;
            let range = if subresource == RESOURCE_BARRIER_ALL_SUBRESOURCES {
                0..count
            } else if subresource < count {
                subresource..subresource + 1
            } else {
                state.report(format!(
                    "subresource {subresource} of {resource:?} is out of range"
                ));
                return;
            };
            for index in range {
                let current = &mut memory.states[index as usize];
                if *current != state_before {
                    state.report(format!(
                        "subresource {index} of {resource:?} is in {current:?}, not {state_before:?}"
                    ));
                }
                *current = state_after;
            }
        }
        ResourceBarrierDesc::Aliasing { before, after } => {
            for handle in before.into_iter().chain(after) {
                resource(state, objects, handle);
            }
        }
        ResourceBarrierDesc::Uav { resource: Some(handle) } => {
            resource(state, objects, handle);
        }
        ResourceBarrierDesc::Uav { resource: None } => {}
    }
}

fn check_state(
    state: &HeadlessState,
    memory: &ResourceMemory,
    handle: NativeHandle,
    subresource: u32,
    required: ResourceStates,
) {
    if let Some(current) = memory.states.get(subresource as usize) {
        if !current.contains(required) {
            state.report(format!(
                "subresource {subresource} of {handle:?} is in {current:?} but needs {required:?}"
            ));
        }
    }
}

fn read_range(
    state: &HeadlessState,
    objects: &Objects,
    handle: NativeHandle,
    subresource: u32,
    offset: u64,
    len: u64,
    required: ResourceStates,
) -> Option<Vec<u8>> {
    let memory = resource(state, objects, handle)?;
    check_state(state, memory, handle, subresource, required);
    let block = memory.subresources.get(subresource as usize)?;
    let end = offset.checked_add(len)?;
    if end > block.len() as u64 {
        state.report(format!(
            "read of {handle:?} at {offset}..{end} exceeds its {} bytes",
            block.len()
        ));
        return None;
    }
    Some(block[offset as usize..end as usize].to_vec())
}

fn write_range(
    state: &HeadlessState,
    objects: &mut Objects,
    handle: NativeHandle,
    subresource: u32,
    offset: u64,
    bytes: &[u8],
    required: ResourceStates,
) {
    let Some(memory) = resource_mut(state, objects, handle) else {
        return;
    };
    check_state(state, memory, handle, subresource, required);
    let Some(block) = memory.subresources.get_mut(subresource as usize) else {
        state.report(format!("{handle:?} has no subresource {subresource}"));
        return;
    };
    let end = offset as usize + bytes.len();
    if end > block.len() {
        state.report(format!(
            "write of {handle:?} at {offset}..{end} exceeds its {} bytes",
            block.len()
        ));
        return;
    }
    block[offset as usize..end].copy_from_slice(bytes);
}

fn subresource_bytes(
    state: &HeadlessState,
    objects: &Objects,
    handle: NativeHandle,
    subresource: u32,
    required: ResourceStates,
) -> Option<Vec<u8>> {
    let memory = resource(state, objects, handle)?;
    check_state(state, memory, handle, subresource, required);
    memory.subresources.get(subresource as usize).cloned()
}

fn copy_resource(state: &HeadlessState, objects: &mut Objects, dest: NativeHandle, src: NativeHandle) {
    let Some(source) = resource(state, objects, src) else {
        return;
    };
    for index in 0..source.states.len() as u32 {
        check_state(state, source, src, index, ResourceStates::COPY_SOURCE);
    }
    let blocks = source.subresources.clone();
    let Some(target) = resource_mut(state, objects, dest) else {
        return;
    };
    let sizes = |blocks: &[Vec<u8>]| blocks.iter().map(Vec::len).collect::<Vec<_>>();
    if sizes(&target.subresources) != sizes(&blocks) {
        state.report(format!(
            "{dest:?} and {src:?} have different layouts and cannot be copied"
        ));
        return;
    }
    for index in 0..target.states.len() as u32 {
        check_state(state, target, dest, index, ResourceStates::COPY_DEST);
    }
    target.subresources = blocks;
}

fn copy_footprint(
    state: &HeadlessState,
    objects: &mut Objects,
    dest: NativeHandle,
    subresource: u32,
    src: NativeHandle,
    footprint: PlacedSubresourceFootprint,
) {
    let row_bytes = match resource(state, objects, dest) {
        Some(memory) => memory.row_bytes(subresource),
        None => return,
    };
    let pitch = u64::from(footprint.row_pitch);
    let rows = u64::from(footprint.height) * u64::from(footprint.depth.max(1));
    let Some(source) = read_range(
        state,
        objects,
        src,
        0,
        footprint.offset,
        pitch * rows.saturating_sub(1) + row_bytes,
        ResourceStates::COPY_SOURCE,
    ) else {
        return;
    };
    let packed: Vec<u8> = (0..rows)
        .flat_map(|row| {
            let start = (row * pitch) as usize;
            source[start..start + row_bytes as usize].iter().copied()
        })
        .collect();
    write_range(
        state,
        objects,
        dest,
        subresource,
        0,
        &packed,
        ResourceStates::COPY_DEST,
    );
}

impl NativeCommandList for HeadlessCommandList {
    fn list_type(&self) -> CommandListType {
        self.list_type
    }

    fn reset(&mut self) -> Result<(), NativeError> {
        self.state.check_alive()?;
        self.open = true;
        self.event_depth = 0;
        self.bindings = 0;
        self.ops.clear();
        Ok(())
    }

    fn close(&mut self) -> Result<(), NativeError> {
        if !self.open {
            return Err(NativeError::InvalidArgument(
                "command list is already closed".to_string(),
            ));
        }
        if self.event_depth != 0 {
            return Err(NativeError::InvalidArgument(format!(
                "{} profiling events are still open",
                self.event_depth
            )));
        }
        self.open = false;
        Ok(())
    }

    fn resource_barrier(&mut self, barriers: &[ResourceBarrierDesc]) {
        self.record("ResourceBarrier", Op::Barriers(barriers.to_vec()));
    }

    fn set_descriptor_heaps(&mut self, _heaps: &[NativeHandle]) {
        self.bind("SetDescriptorHeaps");
    }

    fn set_pipeline_state(&mut self, _pipeline_state: NativeHandle) {
        self.bind("SetPipelineState");
    }

    fn set_root_signature(&mut self, _pipeline: Pipeline, _root_signature: NativeHandle) {
        self.bind("SetRootSignature");
    }

    fn set_root_descriptor_table(
        &mut self,
        _pipeline: Pipeline,
        _root_index: u32,
        _base: GpuDescriptorHandle,
    ) {
        self.bind("SetRootDescriptorTable");
    }

    fn set_root_32bit_constants(
        &mut self,
        _pipeline: Pipeline,
        _root_index: u32,
        _values: &[u32],
        _dest_offset: u32,
    ) {
        self.bind("SetRoot32BitConstants");
    }

    fn set_root_descriptor(
        &mut self,
        _pipeline: Pipeline,
        _root_index: u32,
        _parameter_type: RootParameterType,
        _address: GpuVirtualAddress,
    ) {
        self.bind("SetRootDescriptor");
    }

    fn ia_set_primitive_topology(&mut self, _topology: PrimitiveTopology) {
        self.bind("IASetPrimitiveTopology");
    }

    fn ia_set_vertex_buffers(&mut self, _start_slot: u32, _views: &[VertexBufferView]) {
        self.bind("IASetVertexBuffers");
    }

    fn ia_set_index_buffer(&mut self, _view: Option<&IndexBufferView>) {
        self.bind("IASetIndexBuffer");
    }

    fn om_set_render_targets(
        &mut self,
        _render_targets: &[CpuDescriptorHandle],
        _depth_stencil: Option<CpuDescriptorHandle>,
    ) {
        self.bind("OMSetRenderTargets");
    }

    fn om_set_stencil_ref(&mut self, _reference: u32) {
        self.bind("OMSetStencilRef");
    }

    fn om_set_blend_factor(&mut self, _factor: [f32; 4]) {
        self.bind("OMSetBlendFactor");
    }

    fn rs_set_viewports(&mut self, _viewports: &[Viewport]) {
        self.bind("RSSetViewports");
    }

    fn rs_set_scissor_rects(&mut self, _rects: &[Rect]) {
        self.bind("RSSetScissorRects");
    }

    fn clear_render_target_view(&mut self, _view: CpuDescriptorHandle, _color: [f32; 4]) {
        self.record("ClearRenderTargetView", Op::Clear);
    }

    fn clear_depth_stencil_view(
        &mut self,
        _view: CpuDescriptorHandle,
        _flags: ClearFlags,
        _depth: f32,
        _stencil: u8,
    ) {
        self.record("ClearDepthStencilView", Op::Clear);
    }

    fn clear_unordered_access_view_float(
        &mut self,
        _gpu: GpuDescriptorHandle,
        _cpu: CpuDescriptorHandle,
        resource: NativeHandle,
        values: [f32; 4],
    ) {
        self.record(
            "ClearUnorderedAccessViewFloat",
            Op::ClearUnorderedAccess {
                resource,
                word: values[0].to_bits(),
            },
        );
    }

    fn clear_unordered_access_view_uint(
        &mut self,
        _gpu: GpuDescriptorHandle,
        _cpu: CpuDescriptorHandle,
        resource: NativeHandle,
        values: [u32; 4],
    ) {
        self.record(
            "ClearUnorderedAccessViewUint",
            Op::ClearUnorderedAccess {
                resource,
                word: values[0],
            },
        );
    }

    fn copy_resource(&mut self, dest: NativeHandle, src: NativeHandle) {
        self.record("CopyResource", Op::CopyResource { dest, src });
    }

    fn copy_buffer_region(
        &mut self,
        dest: NativeHandle,
        dest_offset: u64,
        src: NativeHandle,
        src_offset: u64,
        num_bytes: u64,
    ) {
        self.record(
            "CopyBufferRegion",
            Op::CopyBuffer {
                dest,
                dest_offset,
                src,
                src_offset,
                num_bytes,
            },
        );
    }

    fn copy_texture_region(
        &mut self,
        dest: NativeHandle,
        dest_subresource: u32,
        src: NativeHandle,
        footprint: PlacedSubresourceFootprint,
    ) {
        self.record(
            "CopyTextureRegion",
            Op::CopyTexture {
                dest,
                subresource: dest_subresource,
                src,
                footprint,
            },
        );
    }

    fn resolve_subresource(
        &mut self,
        dest: NativeHandle,
        dest_subresource: u32,
        src: NativeHandle,
        src_subresource: u32,
        _format: Format,
    ) {
        self.record(
            "ResolveSubresource",
            Op::Resolve {
                dest,
                dest_subresource,
                src,
                src_subresource,
            },
        );
    }

    fn draw_instanced(
        &mut self,
        _vertex_count: u32,
        _instance_count: u32,
        _start_vertex: u32,
        _start_instance: u32,
    ) {
        self.record("DrawInstanced", Op::Draw);
    }

    fn draw_indexed_instanced(
        &mut self,
        _index_count: u32,
        _instance_count: u32,
        _start_index: u32,
        _base_vertex: i32,
        _start_instance: u32,
    ) {
        self.record("DrawIndexedInstanced", Op::Draw);
    }

    fn dispatch(&mut self, _x: u32, _y: u32, _z: u32) {
        self.record("Dispatch", Op::Dispatch);
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
        self.record("ExecuteIndirect", Op::ExecuteIndirect);
    }

    fn begin_query(&mut self, heap: NativeHandle, _query_type: QueryType, index: u32) {
        self.record("BeginQuery", Op::BeginQuery { heap, index });
    }

    fn end_query(&mut self, heap: NativeHandle, query_type: QueryType, index: u32) {
        self.record(
            "EndQuery",
            Op::EndQuery {
                heap,
                query_type,
                index,
            },
        );
    }

    fn resolve_query_data(
        &mut self,
        heap: NativeHandle,
        _query_type: QueryType,
        start_index: u32,
        count: u32,
        dest: NativeHandle,
        dest_offset: u64,
    ) {
        self.record(
            "ResolveQueryData",
            Op::ResolveQuery {
                heap,
                start: start_index,
                count,
                dest,
                dest_offset,
            },
        );
    }

    fn begin_event(&mut self, name: &str) {
        if self.ensure_open("BeginEvent") {
            log::trace!("Headless event '{name}'");
            self.event_depth += 1;
        }
    }

    fn end_event(&mut self) {
        if !self.ensure_open("EndEvent") {
            return;
        }
        match self.event_depth.checked_sub(1) {
            Some(depth) => self.event_depth = depth,
            None => self
                .state
                .report("EndEvent without a matching BeginEvent".to_string()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
