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

//! Objects owned by a headless device and the bookkeeping shared by its
//! queues and command lists.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use umbra_core::renderer::api::native::{
    Format, HeapType, NativeHandle, ResourceDesc, ResourceDimension,
    ResourceStates, ViewDesc,
};
use umbra_core::renderer::NativeError;

/// Spacing between the address ranges handed to resources and descriptor heaps.
pub(crate) const ADDRESS_STRIDE: u64 = 0x0100_0000;

/// Bytes per texel of the formats a texture can be created with.
pub(crate) fn texel_size(format: Format) -> u64 {
    match format {
        Format::R32G32B32A32Float => 16,
        Format::R32G32B32Float => 12,
        Format::R16G16B16A16Float
        | Format::R32G32Float
        | Format::R32G8X24Typeless
        | Format::D32FloatS8X24Uint
        | Format::R32FloatX8X24Typeless => 8,
        Format::R16Typeless
        | Format::R16Float
        | Format::D16Unorm
        | Format::R16Unorm
        | Format::R16Uint => 2,
        Format::R8Unorm => 1,
        Format::Unknown => 0,
        _ => 4,
    }
}

/// CPU memory backing a committed resource.
#[derive(Debug)]
pub(crate) struct ResourceMemory {
    pub desc: ResourceDesc,
    pub heap_type: HeapType,
    /// One tightly packed block per subresource; buffers have a single one.
    pub subresources: Vec<Vec<u8>>,
    /// The native state of every subresource, as barriers have left it.
    pub states: Vec<ResourceStates>,
}

impl ResourceMemory {
    pub fn new(desc: ResourceDesc, heap_type: HeapType, initial_state: ResourceStates) -> Self {
        let subresources: Vec<Vec<u8>> = if desc.dimension == ResourceDimension::Buffer {
            vec![vec![0; desc.width as usize]]
        } else {
            let mips = u32::from(desc.mip_levels.max(1));
            let layers = u32::from(desc.depth_or_array_size.max(1));
            (0..layers)
                .flat_map(|_| 0..mips)
                .map(|mip| {
                    let (width, height) = mip_extent(&desc, mip);
                    vec![0; (width * height * texel_size(desc.format)) as usize]
                })
                .collect()
        };
        let states = vec![initial_state; subresources.len()];
        Self {
            desc,
            heap_type,
            subresources,
            states,
        }
    }

    pub fn is_buffer(&self) -> bool {
        self.desc.dimension == ResourceDimension::Buffer
    }

    pub fn byte_size(&self) -> u64 {
        self.subresources.iter().map(|s| s.len() as u64).sum()
    }

    /// Returns the row length in bytes of `subresource`.
    pub fn row_bytes(&self, subresource: u32) -> u64 {
        let mip = subresource % u32::from(self.desc.mip_levels.max(1));
        mip_extent(&self.desc, mip).0 * texel_size(self.desc.format)
    }
}

fn mip_extent(desc: &ResourceDesc, mip: u32) -> (u64, u64) {
    (
        (desc.width >> mip).max(1),
        (u64::from(desc.height) >> mip).max(1),
    )
}

/// A native object created by a headless device.
#[derive(Debug)]
pub(crate) enum HeadlessObject {
    RootSignature,
    PipelineState,
    CommandSignature,
    QueryHeap(Vec<u64>),
    Resource(ResourceMemory),
    DescriptorHeap,
    Fence,
}

/// Counters of the work a headless device has executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    /// Command lists submitted to any queue.
    pub submissions: u64,
    /// Barriers replayed.
    pub barriers: u64,
    /// Draw calls, indexed or not.
    pub draws: u64,
    /// Compute dispatches.
    pub dispatches: u64,
    /// Indirect executions.
    pub indirect_executions: u64,
    /// Buffer, texture and whole-resource copies.
    pub copies: u64,
    /// Render target, depth-stencil and unordered access clears.
    pub clears: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatCounters {
    pub submissions: AtomicU64,
    pub barriers: AtomicU64,
    pub draws: AtomicU64,
    pub dispatches: AtomicU64,
    pub indirect_executions: AtomicU64,
    pub copies: AtomicU64,
    pub clears: AtomicU64,
}

impl StatCounters {
    pub fn snapshot(&self) -> HeadlessStats {
        HeadlessStats {
            submissions: self.submissions.load(Ordering::Relaxed),
            barriers: self.barriers.load(Ordering::Relaxed),
            draws: self.draws.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            indirect_executions: self.indirect_executions.load(Ordering::Relaxed),
            copies: self.copies.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}

/// State shared by a headless device, its queues and its command lists.
#[derive(Debug)]
pub(crate) struct HeadlessState {
    next_handle: AtomicU64,
    pub objects: Mutex<HashMap<NativeHandle, HeadlessObject>>,
    pub fences: Mutex<HashMap<NativeHandle, Arc<AtomicU64>>>,
    pub descriptors: Mutex<HashMap<usize, ViewDesc>>,
    pub names: Mutex<HashMap<NativeHandle, String>>,
    pub validation: Mutex<Vec<String>>,
    pub stats: StatCounters,
    pub allocated_bytes: AtomicU64,
    pub memory_budget: Option<u64>,
    pub removed: Mutex<Option<String>>,
    epoch: Instant,
}

impl HeadlessState {
    pub fn new(memory_budget: Option<u64>) -> Self {
        Self {
            next_handle: AtomicU64::new(1),
            objects: Mutex::new(HashMap::new()),
            fences: Mutex::new(HashMap::new()),
            descriptors: Mutex::new(HashMap::new()),
            names: Mutex::new(HashMap::new()),
            validation: Mutex::new(Vec::new()),
            stats: StatCounters::default(),
            allocated_bytes: AtomicU64::new(0),
            memory_budget,
            removed: Mutex::new(None),
            epoch: Instant::now(),
        }
    }

    pub fn next_handle(&self) -> NativeHandle {
        NativeHandle(self.next_handle.fetch_add(1, Ordering::Relaxed))
    }

    pub fn insert(&self, object: HeadlessObject) -> NativeHandle {
        let handle = self.next_handle();
        self.objects.lock().unwrap().insert(handle, object);
        handle
    }

    /// Fails with `DeviceRemoved` once the device has been removed.
    pub fn check_alive(&self) -> Result<(), NativeError> {
        match self.removed.lock().unwrap().as_ref() {
            Some(reason) => Err(NativeError::DeviceRemoved {
                reason: reason.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Records a message of the validation layer.
    pub fn report(&self, message: String) {
        log::error!("Headless validation: {message}");
        self.validation.lock().unwrap().push(message);
    }

    /// Nanoseconds since the device was created.
    pub fn ticks(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    pub fn reserve_memory(&self, bytes: u64) -> Result<(), NativeError> {
        let previous = self.allocated_bytes.fetch_add(bytes, Ordering::AcqRel);
        if let Some(budget) = self.memory_budget {
            if previous + bytes > budget {
                self.allocated_bytes.fetch_sub(bytes, Ordering::AcqRel);
                log::warn!(
                    "Headless allocation of {bytes} bytes exceeds the {budget} byte budget"
                );
                return Err(NativeError::OutOfMemory);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_core::renderer::api::native::{ResourceFlags, SampleDesc};

    #[test]
    fn test_texture_memory_has_one_block_per_subresource() {
        let desc = ResourceDesc::texture_2d(
            Format::R8G8B8A8Unorm,
            8,
            4,
            2,
            3,
            SampleDesc::default(),
            ResourceFlags::NONE,
        );
        let memory = ResourceMemory::new(desc, HeapType::Default, ResourceStates::COMMON);
        assert_eq!(memory.subresources.len(), 6);
        assert_eq!(memory.subresources[0].len(), 8 * 4 * 4);
        assert_eq!(memory.subresources[1].len(), 4 * 2 * 4);
        assert_eq!(memory.subresources[2].len(), 8);
        assert_eq!(memory.row_bytes(desc.subresource(1, 1)), 16);
        assert_eq!(memory.byte_size(), 2 * (128 + 32 + 8));
    }

    #[test]
    fn test_memory_budget_is_enforced() {
        let state = HeadlessState::new(Some(100));
        state.reserve_memory(60).unwrap();
        assert_eq!(state.reserve_memory(60), Err(NativeError::OutOfMemory));
        state.reserve_memory(40).unwrap();
    }
}
