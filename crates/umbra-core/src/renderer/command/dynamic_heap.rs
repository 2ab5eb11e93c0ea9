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

//! Per-command-buffer staging of descriptor tables.
//!
//! Bindings record CPU descriptor handles into a staging area, one per
//! pipeline and table slot. Before a draw or dispatch the stale tables of the
//! active pipeline are copied into a shader-visible heap in one contiguous
//! block each, and the block's GPU handle is set as the root table.
//!
//! Committing is split in two so the command buffer can bind the shader
//! visible heaps of every heap type at once between the phases:
//! [`reserve`](DynamicDescriptorHeap::reserve) picks the heap that will hold
//! the tables, [`commit`](DynamicDescriptorHeap::commit) copies and binds.

use crate::renderer::api::native::{
    CpuDescriptorHandle, DescriptorHeapDesc, DescriptorHeapType, GpuDescriptorHandle,
    NativeHandle,
};
use crate::renderer::api::Pipeline;
use crate::renderer::error::{CommandError, NativeError};
use crate::renderer::resource::NativeObject;
use crate::renderer::signature::{SignatureLayout, SlotLayout};
use crate::renderer::traits::{NativeCommandList, NativeDevice};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug)]
struct VisibleHeap {
    native: NativeObject,
    cpu_start: CpuDescriptorHandle,
    gpu_start: GpuDescriptorHandle,
}

#[derive(Debug)]
struct StagedTable {
    handles: Vec<CpuDescriptorHandle>,
    stale: bool,
}

/// Descriptor tables staged for one pipeline, keyed by slot.
type Staging = BTreeMap<u32, StagedTable>;

/// Shader-visible descriptors of one heap type for one command buffer.
#[derive(Debug)]
pub(crate) struct DynamicDescriptorHeap {
    device: Arc<dyn NativeDevice>,
    heap_type: DescriptorHeapType,
    descriptors_per_heap: u32,
    increment: u32,
    node_mask: u32,
    available: Vec<VisibleHeap>,
    retired: Vec<VisibleHeap>,
    /// The heap being filled and the number of descriptors used in it.
    current: Option<(VisibleHeap, u32)>,
    staging: [Staging; 2],
}

impl DynamicDescriptorHeap {
    pub fn new(
        device: Arc<dyn NativeDevice>,
        heap_type: DescriptorHeapType,
        descriptors_per_heap: u32,
        node_mask: u32,
    ) -> Self {
        let increment = device.descriptor_handle_increment_size(heap_type);
        Self {
            device,
            heap_type,
            descriptors_per_heap: descriptors_per_heap.max(1),
            increment,
            node_mask,
            available: Vec::new(),
            retired: Vec::new(),
            current: None,
            staging: [Staging::new(), Staging::new()],
        }
    }

    /// Resets the staging area of `pipeline` to the tables of `layout`.
    pub fn parse_layout(&mut self, pipeline: Pipeline, layout: &SignatureLayout) {
        let staging = &mut self.staging[pipeline.index()];
        staging.clear();
        for (slot, slot_layout) in layout.slots().iter().enumerate() {
            if let SlotLayout::Table {
                heap_type,
                num_descriptors,
                ..
            } = slot_layout
            {
                if *heap_type == self.heap_type {
                    staging.insert(
                        slot as u32,
                        StagedTable {
                            handles: vec![CpuDescriptorHandle::NULL; *num_descriptors as usize],
                            stale: false,
                        },
                    );
                }
            }
        }
    }

    /// Records `handles` at `offset` of the table at `slot`.
    pub fn stage(
        &mut self,
        pipeline: Pipeline,
        slot: u32,
        offset: u32,
        handles: &[CpuDescriptorHandle],
    ) -> Result<(), CommandError> {
        let table = self.staging[pipeline.index()]
            .get_mut(&slot)
            .ok_or(CommandError::IncompatibleParameter {
                slot,
                expected: "a descriptor table",
            })?;
        let count = table.handles.len() as u32;
        let end = offset as usize + handles.len();
        if end > table.handles.len() {
            return Err(CommandError::DescriptorOutOfRange {
                slot,
                offset: u32::try_from(end - 1).unwrap_or(u32::MAX),
                count,
            });
        }
        table.handles[offset as usize..end].copy_from_slice(handles);
        table.stale = true;
        Ok(())
    }

    fn stale_count(&self, pipeline: Pipeline) -> u32 {
        self.staging[pipeline.index()]
            .values()
            .filter(|t| t.stale)
            .map(|t| t.handles.len() as u32)
            .sum()
    }

    /// Makes room for the stale tables of `pipeline`.
    ///
    /// Returns the shader-visible heap the tables will live in, or `None` if
    /// nothing is stale.
    pub fn reserve(&mut self, pipeline: Pipeline) -> Result<Option<NativeHandle>, CommandError> {
        let required = self.stale_count(pipeline);
        if required == 0 {
            return Ok(None);
        }
        if self.ensure_space(required)? {
            for staging in &mut self.staging {
                for table in staging.values_mut() {
                    table.stale = true;
                }
            }
            let required = self.stale_count(pipeline);
            if required > self.descriptors_per_heap {
                return Err(self.too_many(required));
            }
        }
        Ok(self.current_heap())
    }

    /// Copies the stale tables of `pipeline` and sets them on `list`.
    ///
    /// Must follow a successful [`reserve`](Self::reserve) for the same pipeline.
    pub fn commit(&mut self, pipeline: Pipeline, list: &mut dyn NativeCommandList) {
        let Some((heap, used)) = self.current.as_mut() else {
            return;
        };
        for (slot, table) in self.staging[pipeline.index()].iter_mut() {
            if !table.stale {
                continue;
            }
            let cpu = heap.cpu_start.offset(*used, self.increment);
            let gpu = heap.gpu_start.offset(*used, self.increment);
            for (i, handle) in table.handles.iter().enumerate() {
                if !handle.is_null() {
                    self.device.copy_descriptors_simple(
                        1,
                        cpu.offset(i as u32, self.increment),
                        *handle,
                        self.heap_type,
                    );
                }
            }
            list.set_root_descriptor_table(pipeline, *slot, gpu);
            *used += table.handles.len() as u32;
            table.stale = false;
        }
    }

    /// Copies one descriptor into the shader-visible heap.
    ///
    /// Returns the heap and the GPU handle of the copy. Switching heaps marks
    /// every staged table stale.
    pub fn copy_descriptor(
        &mut self,
        src: CpuDescriptorHandle,
    ) -> Result<(NativeHandle, GpuDescriptorHandle), CommandError> {
        if self.ensure_space(1)? {
            for staging in &mut self.staging {
                for table in staging.values_mut() {
                    table.stale = true;
                }
            }
        }
        let (heap, used) = self
            .current
            .as_mut()
            .ok_or(CommandError::Native(NativeError::OutOfMemory))?;
        let cpu = heap.cpu_start.offset(*used, self.increment);
        let gpu = heap.gpu_start.offset(*used, self.increment);
        self.device.copy_descriptors_simple(1, cpu, src, self.heap_type);
        *used += 1;
        Ok((heap.native.handle(), gpu))
    }

    /// The shader-visible heap currently being filled.
    pub fn current_heap(&self) -> Option<NativeHandle> {
        self.current.as_ref().map(|(heap, _)| heap.native.handle())
    }

    /// Returns every heap to the pool and clears the staging areas.
    pub fn reset(&mut self) {
        if let Some((heap, _)) = self.current.take() {
            self.available.push(heap);
        }
        self.available.append(&mut self.retired);
        for staging in &mut self.staging {
            staging.clear();
        }
    }

    /// Ensures `count` descriptors fit in the current heap. Returns `true`
    /// if a new heap had to be started.
    fn ensure_space(&mut self, count: u32) -> Result<bool, CommandError> {
        if count > self.descriptors_per_heap {
            return Err(self.too_many(count));
        }
        if let Some((_, used)) = &self.current {
            if used + count <= self.descriptors_per_heap {
                return Ok(false);
            }
        }
        if let Some((full, _)) = self.current.take() {
            self.retired.push(full);
        }
        let heap = match self.available.pop() {
            Some(heap) => heap,
            None => self.create_heap()?,
        };
        self.current = Some((heap, 0));
        Ok(true)
    }

    fn create_heap(&self) -> Result<VisibleHeap, CommandError> {
        let info = self.device.create_descriptor_heap(&DescriptorHeapDesc {
            heap_type: self.heap_type,
            num_descriptors: self.descriptors_per_heap,
            shader_visible: true,
            node_mask: self.node_mask,
        })?;
        log::trace!(
            "Created shader-visible {:?} heap with {} descriptors",
            self.heap_type,
            self.descriptors_per_heap
        );
        Ok(VisibleHeap {
            native: NativeObject::owned(self.device.clone(), info.handle),
            cpu_start: info.cpu_start,
            gpu_start: info.gpu_start,
        })
    }

    fn too_many(&self, count: u32) -> CommandError {
        CommandError::InvalidArgument(format!(
            "{count} {:?} descriptors do not fit in a dynamic heap of {}",
            self.heap_type, self.descriptors_per_heap
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::ShaderType;
    use crate::renderer::signature::{DescriptorRange, RangeType, ShaderParameter, ShaderSignature};
    use crate::renderer::traits::mock::{MockCommand, MockCommandList, MockDevice};
    use std::sync::atomic::Ordering;

    fn layout(device: &Arc<MockDevice>) -> Arc<SignatureLayout> {
        let signature = ShaderSignature::new(device.clone(), "tables");
        signature.set_parameters(vec![
            ShaderParameter::constants(4, 0, ShaderType::ALL),
            ShaderParameter::table(
                vec![DescriptorRange::new(RangeType::ShaderResource, 3, 0)],
                ShaderType::ALL,
            ),
            ShaderParameter::sampler(0, ShaderType::ALL),
        ]);
        signature.compiled().unwrap()
    }

    fn list(device: &Arc<MockDevice>) -> Box<dyn NativeCommandList> {
        let mut list = device
            .create_command_list(crate::renderer::api::native::CommandListType::Direct)
            .unwrap();
        list.reset().unwrap();
        list
    }

    fn mock(list: &dyn NativeCommandList) -> &MockCommandList {
        list.as_any().downcast_ref::<MockCommandList>().unwrap()
    }

    #[test]
    fn test_stage_and_commit() {
        let device = MockDevice::new();
        let layout = layout(&device);
        let mut heap =
            DynamicDescriptorHeap::new(device.clone(), DescriptorHeapType::CbvSrvUav, 16, 1);
        heap.parse_layout(Pipeline::Graphics, &layout);

        assert_eq!(heap.reserve(Pipeline::Graphics).unwrap(), None);
        let src = CpuDescriptorHandle { ptr: 0x40 };
        heap.stage(Pipeline::Graphics, 1, 1, &[src, src]).unwrap();
        assert!(matches!(
            heap.stage(Pipeline::Graphics, 1, 2, &[src, src]),
            Err(CommandError::DescriptorOutOfRange { slot: 1, .. })
        ));
        assert!(matches!(
            heap.stage(Pipeline::Graphics, 0, 0, &[src]),
            Err(CommandError::IncompatibleParameter { slot: 0, .. })
        ));

        let mut list = list(&device);
        let visible = heap.reserve(Pipeline::Graphics).unwrap();
        assert!(visible.is_some());
        heap.commit(Pipeline::Graphics, list.as_mut());
        assert_eq!(device.descriptor_copies.load(Ordering::Relaxed), 2);
        assert_eq!(
            mock(list.as_ref()).count(|c| matches!(c, MockCommand::SetRootTable(Pipeline::Graphics, 1, _))),
            1
        );

        assert_eq!(heap.reserve(Pipeline::Graphics).unwrap(), None);
    }

    #[test]
    fn test_full_heap_switches_and_restages() {
        let device = MockDevice::new();
        let layout = layout(&device);
        let mut heap =
            DynamicDescriptorHeap::new(device.clone(), DescriptorHeapType::CbvSrvUav, 4, 1);
        heap.parse_layout(Pipeline::Graphics, &layout);
        let mut list = list(&device);
        let src = CpuDescriptorHandle { ptr: 0x40 };

        heap.stage(Pipeline::Graphics, 1, 0, &[src]).unwrap();
        let first = heap.reserve(Pipeline::Graphics).unwrap();
        heap.commit(Pipeline::Graphics, list.as_mut());

        heap.stage(Pipeline::Graphics, 1, 0, &[src]).unwrap();
        let second = heap.reserve(Pipeline::Graphics).unwrap();
        assert_ne!(first, second);

        heap.reset();
        heap.parse_layout(Pipeline::Graphics, &layout);
        heap.stage(Pipeline::Graphics, 1, 0, &[src]).unwrap();
        let recycled = heap.reserve(Pipeline::Graphics).unwrap();
        assert!(recycled == first || recycled == second);
    }

    #[test]
    fn test_sampler_tables_are_staged_separately() {
        let device = MockDevice::new();
        let layout = layout(&device);
        let mut samplers =
            DynamicDescriptorHeap::new(device.clone(), DescriptorHeapType::Sampler, 16, 1);
        samplers.parse_layout(Pipeline::Compute, &layout);
        let src = CpuDescriptorHandle { ptr: 0x80 };
        assert!(samplers.stage(Pipeline::Compute, 1, 0, &[src]).is_err());
        samplers.stage(Pipeline::Compute, 2, 0, &[src]).unwrap();
        assert!(samplers.stage(Pipeline::Graphics, 2, 0, &[src]).is_err());
    }
}
