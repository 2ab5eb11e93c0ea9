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

use super::command::HeadlessCommandList;
use super::queue::HeadlessQueue;
use super::state::{HeadlessObject, HeadlessState, HeadlessStats, ResourceMemory, ADDRESS_STRIDE};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use umbra_core::renderer::api::native::{
    ClearValue, CommandListType, CommandSignatureDesc, CommittedResource,
    ComputePipelineDesc, CpuDescriptorHandle, DescriptorHeapDesc, DescriptorHeapInfo,
    DescriptorHeapType, Format, GpuDescriptorHandle, GraphicsPipelineDesc, HeapType,
    NativeHandle, QueryHeapDesc, ResourceDesc, ResourceDimension, ResourceStates, RootParameter,
    RootSignatureDesc, ViewDesc,
};
use umbra_core::renderer::{NativeCommandList, NativeDevice, NativeError, NativeQueue};

/// Maximum size of a root signature, in 32-bit words.
const MAX_ROOT_SIGNATURE_WORDS: u32 = 64;
const DESCRIPTOR_INCREMENT: u32 = 32;
const SAMPLER_INCREMENT: u32 = 16;

/// A native device that runs on the CPU.
///
/// Resources are plain memory and command lists are replayed on submission.
/// Drawing and dispatching produce no output, but copies, clears of
/// unordered access views, query resolves and barriers take effect. A
/// validation layer reports barriers whose "before" state does not match the
/// resource, copies from or to resources in the wrong state, and commands
/// recorded on closed lists; see [`validation_messages`](Self::validation_messages).
#[derive(Debug)]
pub struct HeadlessDevice {
    pub(crate) state: Arc<HeadlessState>,
}

impl HeadlessDevice {
    /// Creates a device with unlimited memory.
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    /// Creates a device whose resources may not exceed `bytes` in total.
    pub fn with_memory_budget(bytes: u64) -> Arc<Self> {
        Self::build(Some(bytes))
    }

    fn build(memory_budget: Option<u64>) -> Arc<Self> {
        log::info!("Created headless native device");
        Arc::new(Self {
            state: Arc::new(HeadlessState::new(memory_budget)),
        })
    }

    /// Simulates a device removal. Every later creation and submission fails.
    pub fn remove(&self, reason: impl Into<String>) {
        let reason = reason.into();
        log::warn!("Headless device removed: {reason}");
        *self.state.removed.lock().unwrap() = Some(reason);
    }

    /// Counters of the executed work.
    pub fn stats(&self) -> HeadlessStats {
        self.state.stats.snapshot()
    }

    /// Messages reported by the validation layer since the device was created.
    pub fn validation_messages(&self) -> Vec<String> {
        self.state.validation.lock().unwrap().clone()
    }

    /// Number of native objects not yet released.
    pub fn live_object_count(&self) -> usize {
        self.state.objects.lock().unwrap().len()
    }

    /// Bytes held by live resources.
    pub fn allocated_bytes(&self) -> u64 {
        self.state.allocated_bytes.load(Ordering::Acquire)
    }

    /// The debug name given to `handle`.
    pub fn object_name(&self, handle: NativeHandle) -> Option<String> {
        self.state.names.lock().unwrap().get(&handle).cloned()
    }

    /// A copy of the memory of one subresource; buffers have subresource 0 only.
    pub fn subresource_contents(&self, handle: NativeHandle, subresource: u32) -> Option<Vec<u8>> {
        match self.state.objects.lock().unwrap().get(&handle) {
            Some(HeadlessObject::Resource(memory)) => {
                memory.subresources.get(subresource as usize).cloned()
            }
            _ => None,
        }
    }

    /// The native state of every subresource of `handle`.
    pub fn resource_states(&self, handle: NativeHandle) -> Option<Vec<ResourceStates>> {
        match self.state.objects.lock().unwrap().get(&handle) {
            Some(HeadlessObject::Resource(memory)) => Some(memory.states.clone()),
            _ => None,
        }
    }

    fn require_root_signature(&self, handle: NativeHandle) -> Result<(), NativeError> {
        match self.state.objects.lock().unwrap().get(&handle) {
            Some(HeadlessObject::RootSignature) => Ok(()),
            _ => Err(NativeError::InvalidHandle(handle.0)),
        }
    }

    fn with_resource<T>(
        &self,
        handle: NativeHandle,
        f: impl FnOnce(&mut ResourceMemory) -> Result<T, NativeError>,
    ) -> Result<T, NativeError> {
        match self.state.objects.lock().unwrap().get_mut(&handle) {
            Some(HeadlessObject::Resource(memory)) => f(memory),
            _ => Err(NativeError::InvalidHandle(handle.0)),
        }
    }
}

fn root_signature_words(desc: &RootSignatureDesc) -> u32 {
    desc.parameters
        .iter()
        .map(|parameter| match parameter {
            RootParameter::DescriptorTable { .. } => 1,
            RootParameter::Constants {
                num_32bit_values, ..
            } => *num_32bit_values,
            RootParameter::Descriptor { .. } => 2,
        })
        .sum()
}

fn mapped_range(
    memory: &ResourceMemory,
    offset: u64,
    len: usize,
) -> Result<std::ops::Range<usize>, NativeError> {
    if memory.heap_type == HeapType::Default || !memory.is_buffer() {
        return Err(NativeError::InvalidArgument(
            "only upload and readback buffers can be mapped".to_string(),
        ));
    }
    let start = offset as usize;
    let end = start + len;
    if end > memory.subresources[0].len() {
        return Err(NativeError::InvalidArgument(format!(
            "mapped range {start}..{end} exceeds {} bytes",
            memory.subresources[0].len()
        )));
    }
    Ok(start..end)
}

impl NativeDevice for HeadlessDevice {
    fn create_command_queue(
        &self,
        list_type: CommandListType,
    ) -> Result<Box<dyn NativeQueue>, NativeError> {
        self.state.check_alive()?;
        if list_type == CommandListType::Bundle {
            return Err(NativeError::InvalidArgument(
                "bundles cannot be submitted to a queue".to_string(),
            ));
        }
        let fence = self.state.insert(HeadlessObject::Fence);
        let completed = Arc::new(AtomicU64::new(0));
        self.state
            .fences
            .lock()
            .unwrap()
            .insert(fence, completed.clone());
        log::debug!("Created headless {:?} queue", list_type);
        Ok(Box::new(HeadlessQueue::new(
            self.state.clone(),
            list_type,
            fence,
            completed,
        )))
    }

    fn create_command_list(
        &self,
        list_type: CommandListType,
    ) -> Result<Box<dyn NativeCommandList>, NativeError> {
        self.state.check_alive()?;
        Ok(Box::new(HeadlessCommandList::new(
            self.state.clone(),
            list_type,
        )))
    }

    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Result<NativeHandle, NativeError> {
        self.state.check_alive()?;
        let words = root_signature_words(desc);
        if words > MAX_ROOT_SIGNATURE_WORDS {
            return Err(NativeError::InvalidArgument(format!(
                "root signature takes {words} words, the limit is {MAX_ROOT_SIGNATURE_WORDS}"
            )));
        }
        Ok(self.state.insert(HeadlessObject::RootSignature))
    }

    fn create_graphics_pipeline_state(
        &self,
        desc: &GraphicsPipelineDesc,
    ) -> Result<NativeHandle, NativeError> {
        self.state.check_alive()?;
        self.require_root_signature(desc.root_signature)?;
        if desc.vs.as_ref().map_or(true, |vs| vs.is_empty()) {
            return Err(NativeError::InvalidArgument(
                "graphics pipelines need vertex shader bytecode".to_string(),
            ));
        }
        let targets = desc.num_render_targets as usize;
        if targets > desc.rtv_formats.len()
            || desc.rtv_formats[..targets].contains(&Format::Unknown)
        {
            return Err(NativeError::InvalidArgument(format!(
                "{targets} render targets do not all have a format"
            )));
        }
        Ok(self.state.insert(HeadlessObject::PipelineState))
    }

    fn create_compute_pipeline_state(
        &self,
        desc: &ComputePipelineDesc,
    ) -> Result<NativeHandle, NativeError> {
        self.state.check_alive()?;
        self.require_root_signature(desc.root_signature)?;
        if desc.cs.is_empty() {
            return Err(NativeError::InvalidArgument(
                "compute pipelines need shader bytecode".to_string(),
            ));
        }
        Ok(self.state.insert(HeadlessObject::PipelineState))
    }

    fn create_command_signature(
        &self,
        desc: &CommandSignatureDesc,
        root_signature: Option<NativeHandle>,
    ) -> Result<NativeHandle, NativeError> {
        self.state.check_alive()?;
        if let Some(root_signature) = root_signature {
            self.require_root_signature(root_signature)?;
        }
        let packed: u32 = desc.arguments.iter().map(|a| a.byte_size()).sum();
        if desc.arguments.is_empty() || desc.byte_stride < packed {
            return Err(NativeError::InvalidArgument(format!(
                "stride {} cannot hold {packed} bytes of arguments",
                desc.byte_stride
            )));
        }
        Ok(self.state.insert(HeadlessObject::CommandSignature))
    }

    fn create_query_heap(&self, desc: &QueryHeapDesc) -> Result<NativeHandle, NativeError> {
        self.state.check_alive()?;
        Ok(self
            .state
            .insert(HeadlessObject::QueryHeap(vec![0; desc.count as usize])))
    }

    fn create_committed_resource(
        &self,
        desc: &ResourceDesc,
        heap_type: HeapType,
        initial_state: ResourceStates,
        _clear_value: Option<&ClearValue>,
    ) -> Result<CommittedResource, NativeError> {
        self.state.check_alive()?;
        if desc.width == 0 || desc.height == 0 {
            return Err(NativeError::InvalidArgument(
                "resources cannot be empty".to_string(),
            ));
        }
        if desc.dimension != ResourceDimension::Buffer && heap_type != HeapType::Default {
            return Err(NativeError::InvalidArgument(
                "textures live in the default heap".to_string(),
            ));
        }
        let memory = ResourceMemory::new(*desc, heap_type, initial_state);
        self.state.reserve_memory(memory.byte_size())?;
        let is_buffer = memory.is_buffer();
        let handle = self.state.insert(HeadlessObject::Resource(memory));
        Ok(CommittedResource {
            handle,
            gpu_address: if is_buffer {
                handle.0 * ADDRESS_STRIDE
            } else {
                0
            },
        })
    }

    fn create_descriptor_heap(
        &self,
        desc: &DescriptorHeapDesc,
    ) -> Result<DescriptorHeapInfo, NativeError> {
        self.state.check_alive()?;
        if desc.shader_visible && !desc.heap_type.is_shader_visible_capable() {
            return Err(NativeError::InvalidArgument(format!(
                "{:?} heaps cannot be shader visible",
                desc.heap_type
            )));
        }
        let handle = self.state.insert(HeadlessObject::DescriptorHeap);
        let base = handle.0 * ADDRESS_STRIDE;
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

    fn descriptor_handle_increment_size(&self, heap_type: DescriptorHeapType) -> u32 {
        match heap_type {
            DescriptorHeapType::Sampler => SAMPLER_INCREMENT,
            _ => DESCRIPTOR_INCREMENT,
        }
    }

    fn create_view(&self, desc: &ViewDesc, dest: CpuDescriptorHandle) -> Result<(), NativeError> {
        if dest.is_null() {
            return Err(NativeError::InvalidArgument(
                "views cannot be written to a null descriptor".to_string(),
            ));
        }
        self.state.descriptors.lock().unwrap().insert(dest.ptr, *desc);
        Ok(())
    }

    fn copy_descriptors_simple(
        &self,
        count: u32,
        dest: CpuDescriptorHandle,
        src: CpuDescriptorHandle,
        heap_type: DescriptorHeapType,
    ) {
        let increment = self.descriptor_handle_increment_size(heap_type);
        let mut descriptors = self.state.descriptors.lock().unwrap();
        for i in 0..count {
            let from = src.offset(i, increment).ptr;
            match descriptors.get(&from).copied() {
                Some(view) => {
                    descriptors.insert(dest.offset(i, increment).ptr, view);
                }
                None => self
                    .state
                    .report(format!("copy of uninitialized descriptor {from:#x}")),
            }
        }
    }

    fn write_buffer(
        &self,
        resource: NativeHandle,
        offset: u64,
        data: &[u8],
    ) -> Result<(), NativeError> {
        self.with_resource(resource, |memory| {
            let range = mapped_range(memory, offset, data.len())?;
            memory.subresources[0][range].copy_from_slice(data);
            Ok(())
        })
    }

    fn read_buffer(
        &self,
        resource: NativeHandle,
        offset: u64,
        out: &mut [u8],
    ) -> Result<(), NativeError> {
        self.with_resource(resource, |memory| {
            let range = mapped_range(memory, offset, out.len())?;
            out.copy_from_slice(&memory.subresources[0][range]);
            Ok(())
        })
    }

    fn multisample_quality_levels(&self, format: Format, sample_count: u32) -> u32 {
        let supported = matches!(sample_count, 1 | 2 | 4 | 8) && format != Format::Unknown;
        u32::from(supported)
    }

    fn set_name(&self, handle: NativeHandle, name: &str) {
        self.state
            .names
            .lock()
            .unwrap()
            .insert(handle, name.to_string());
    }

    fn release(&self, handle: NativeHandle) {
        let removed = self.state.objects.lock().unwrap().remove(&handle);
        match removed {
            Some(HeadlessObject::Resource(memory)) => {
                self.state
                    .allocated_bytes
                    .fetch_sub(memory.byte_size(), Ordering::AcqRel);
            }
            Some(HeadlessObject::Fence) => {
                self.state.fences.lock().unwrap().remove(&handle);
            }
            Some(_) => {}
            None => self
                .state
                .report(format!("{handle:?} released twice or never created")),
        }
        self.state.names.lock().unwrap().remove(&handle);
    }

    fn device_removed_reason(&self) -> Option<NativeError> {
        self.state
            .removed
            .lock()
            .unwrap()
            .as_ref()
            .map(|reason| NativeError::DeviceRemoved {
                reason: reason.clone(),
            })
    }
}
