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

//! CPU descriptor allocation.
//!
//! One [`DescriptorAllocator`] exists per descriptor heap type. It hands out
//! contiguous runs of descriptors from a list of non shader-visible native
//! heaps ("pages"), growing the list when no page has room. Each page keeps a
//! free list keyed by offset and coalesces neighbouring blocks on release.

use crate::renderer::api::native::{
    CpuDescriptorHandle, DescriptorHeapDesc, DescriptorHeapType, NativeHandle,
};
use crate::renderer::error::NativeError;
use crate::renderer::resource::NativeObject;
use crate::renderer::traits::NativeDevice;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct FreeList {
    // offset -> block size
    blocks: BTreeMap<u32, u32>,
    free: u32,
}

impl FreeList {
    fn with_capacity(capacity: u32) -> Self {
        let mut blocks = BTreeMap::new();
        blocks.insert(0, capacity);
        Self {
            blocks,
            free: capacity,
        }
    }

    fn allocate(&mut self, count: u32) -> Option<u32> {
        let (&offset, &size) = self.blocks.iter().find(|(_, size)| **size >= count)?;
        self.blocks.remove(&offset);
        if size > count {
            self.blocks.insert(offset + count, size - count);
        }
        self.free -= count;
        Some(offset)
    }

    fn release(&mut self, mut offset: u32, mut count: u32) {
        self.free += count;
        if let Some((&prev, &prev_size)) = self.blocks.range(..offset).next_back() {
            if prev + prev_size == offset {
                self.blocks.remove(&prev);
                offset = prev;
                count += prev_size;
            }
        }
        if let Some(&next_size) = self.blocks.get(&(offset + count)) {
            self.blocks.remove(&(offset + count));
            count += next_size;
        }
        self.blocks.insert(offset, count);
    }
}

/// One native descriptor heap of an allocator.
#[derive(Debug)]
pub(crate) struct DescriptorPage {
    heap: NativeObject,
    base: CpuDescriptorHandle,
    increment: u32,
    capacity: u32,
    free_list: Mutex<FreeList>,
}

impl DescriptorPage {
    fn new(
        device: &Arc<dyn NativeDevice>,
        heap_type: DescriptorHeapType,
        capacity: u32,
        node_mask: u32,
    ) -> Result<Self, NativeError> {
        let info = device.create_descriptor_heap(&DescriptorHeapDesc {
            heap_type,
            num_descriptors: capacity,
            shader_visible: false,
            node_mask,
        })?;
        log::debug!(
            "Created {:?} descriptor page with {} descriptors",
            heap_type,
            capacity
        );
        Ok(Self {
            heap: NativeObject::owned(device.clone(), info.handle),
            base: info.cpu_start,
            increment: device.descriptor_handle_increment_size(heap_type),
            capacity,
            free_list: Mutex::new(FreeList::with_capacity(capacity)),
        })
    }

    fn free_count(&self) -> u32 {
        self.free_list.lock().unwrap().free
    }

    fn heap(&self) -> NativeHandle {
        self.heap.handle()
    }
}

/// A contiguous run of CPU descriptors.
///
/// The descriptors return to their page when the allocation is dropped.
pub struct DescriptorAllocation {
    base: CpuDescriptorHandle,
    count: u32,
    increment: u32,
    offset: u32,
    page: Option<Arc<DescriptorPage>>,
}

impl DescriptorAllocation {
    /// An allocation holding no descriptors.
    pub fn null() -> Self {
        Self {
            base: CpuDescriptorHandle::NULL,
            count: 0,
            increment: 0,
            offset: 0,
            page: None,
        }
    }

    /// Returns `true` for an empty allocation.
    pub fn is_null(&self) -> bool {
        self.base.is_null()
    }

    /// The handle of the descriptor at `index`, or the first one.
    pub fn handle(&self, index: u32) -> CpuDescriptorHandle {
        debug_assert!(index < self.count.max(1));
        self.base.offset(index, self.increment)
    }

    /// Number of descriptors in the allocation.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// The native heap the descriptors live in.
    pub fn heap(&self) -> Option<NativeHandle> {
        self.page.as_ref().map(|p| p.heap())
    }
}

impl fmt::Debug for DescriptorAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptorAllocation")
            .field("base", &self.base)
            .field("count", &self.count)
            .field("offset", &self.offset)
            .finish()
    }
}

impl Drop for DescriptorAllocation {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            page.free_list
                .lock()
                .unwrap()
                .release(self.offset, self.count);
        }
    }
}

/// Allocates CPU descriptors of one heap type.
#[derive(Debug)]
pub struct DescriptorAllocator {
    device: Arc<dyn NativeDevice>,
    heap_type: DescriptorHeapType,
    descriptors_per_page: u32,
    node_mask: u32,
    pages: Mutex<Vec<Arc<DescriptorPage>>>,
}

impl DescriptorAllocator {
    pub(crate) fn new(
        device: Arc<dyn NativeDevice>,
        heap_type: DescriptorHeapType,
        descriptors_per_page: u32,
        node_mask: u32,
    ) -> Self {
        Self {
            device,
            heap_type,
            descriptors_per_page: descriptors_per_page.max(1),
            node_mask,
            pages: Mutex::new(Vec::new()),
        }
    }

    /// The heap type of the allocator.
    pub fn heap_type(&self) -> DescriptorHeapType {
        self.heap_type
    }

    /// Allocates `count` contiguous descriptors, creating a page if needed.
    ///
    /// Requests larger than the page size get a page of their own.
    pub fn allocate(&self, count: u32) -> Result<DescriptorAllocation, NativeError> {
        if count == 0 {
            return Ok(DescriptorAllocation::null());
        }
        let mut pages = self.pages.lock().unwrap();
        for page in pages.iter() {
            if let Some(offset) = page.free_list.lock().unwrap().allocate(count) {
                return Ok(Self::allocation(page, offset, count));
            }
        }

        let capacity = self.descriptors_per_page.max(count);
        let page = Arc::new(DescriptorPage::new(
            &self.device,
            self.heap_type,
            capacity,
            self.node_mask,
        )?);
        let offset = page
            .free_list
            .lock()
            .unwrap()
            .allocate(count)
            .ok_or(NativeError::OutOfMemory)?;
        let allocation = Self::allocation(&page, offset, count);
        pages.push(page);
        Ok(allocation)
    }

    fn allocation(page: &Arc<DescriptorPage>, offset: u32, count: u32) -> DescriptorAllocation {
        DescriptorAllocation {
            base: page.base.offset(offset, page.increment),
            count,
            increment: page.increment,
            offset,
            page: Some(page.clone()),
        }
    }

    /// Number of pages created so far.
    pub fn num_pages(&self) -> usize {
        self.pages.lock().unwrap().len()
    }

    /// Number of free descriptors across every page.
    pub fn free_descriptors(&self) -> u32 {
        self.pages
            .lock()
            .unwrap()
            .iter()
            .map(|p| p.free_count())
            .sum()
    }

    /// Total number of descriptors across every page.
    pub fn capacity(&self) -> u32 {
        self.pages.lock().unwrap().iter().map(|p| p.capacity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::traits::mock::MockDevice;

    fn allocator(per_page: u32) -> DescriptorAllocator {
        DescriptorAllocator::new(MockDevice::new(), DescriptorHeapType::CbvSrvUav, per_page, 1)
    }

    #[test]
    fn test_free_list_coalesces() {
        let mut list = FreeList::with_capacity(16);
        let a = list.allocate(4).unwrap();
        let b = list.allocate(4).unwrap();
        let c = list.allocate(4).unwrap();
        assert_eq!((a, b, c), (0, 4, 8));
        list.release(a, 4);
        list.release(c, 4);
        assert_eq!(list.blocks.len(), 2);
        list.release(b, 4);
        assert_eq!(list.blocks.len(), 1);
        assert_eq!(list.blocks.get(&0), Some(&16));
        assert_eq!(list.free, 16);
    }

    #[test]
    fn test_allocations_are_contiguous_and_distinct() {
        let allocator = allocator(8);
        let a = allocator.allocate(3).unwrap();
        let b = allocator.allocate(2).unwrap();
        assert_eq!(a.count(), 3);
        assert_eq!(a.handle(1).ptr - a.handle(0).ptr, 32);
        assert_eq!(b.handle(0), a.handle(0).offset(3, 32));
        assert_eq!(allocator.num_pages(), 1);
        assert_eq!(allocator.free_descriptors(), 3);
    }

    #[test]
    fn test_pages_grow_and_oversize_requests_get_their_own_page() {
        let allocator = allocator(4);
        let _a = allocator.allocate(4).unwrap();
        let _b = allocator.allocate(1).unwrap();
        assert_eq!(allocator.num_pages(), 2);
        let big = allocator.allocate(10).unwrap();
        assert_eq!(big.count(), 10);
        assert_eq!(allocator.num_pages(), 3);
        assert_eq!(allocator.capacity(), 18);
    }

    #[test]
    fn test_dropping_an_allocation_frees_it() {
        let allocator = allocator(4);
        let a = allocator.allocate(4).unwrap();
        assert_eq!(allocator.free_descriptors(), 0);
        drop(a);
        assert_eq!(allocator.free_descriptors(), 4);
        let _b = allocator.allocate(4).unwrap();
        assert_eq!(allocator.num_pages(), 1);
    }

    #[test]
    fn test_zero_count_is_null() {
        let allocator = allocator(4);
        assert!(allocator.allocate(0).unwrap().is_null());
        assert_eq!(allocator.num_pages(), 0);
    }
}
