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

//! Linear sub-allocator for transient CPU-to-GPU data.
//!
//! The [`UploadHeap`] hands out regions of CPU-writable upload pages to a
//! single command buffer. Allocations are never freed one by one: the whole
//! heap is reset once the command buffer's fence has completed, at which point
//! the GPU can no longer be reading any region.
//!
//! # Architecture
//!
//! ```text
//! page 0: [cb 64B|pad|cb 64B|pad|vertices ......|free    ]
//! page 1: [indices ....|free                             ]  <- current
//! large:  [one dedicated page for an oversized upload    ]
//! ```
//!
//! Full pages stay in use until [`reset`](UploadHeap::reset) moves them back to
//! the available pool. Dedicated pages for requests larger than the page size
//! are released on reset.

use crate::renderer::api::native::{
    GpuVirtualAddress, HeapType, NativeHandle, ResourceDesc, ResourceFlags, ResourceStates,
};
use crate::renderer::error::NativeError;
use crate::renderer::resource::NativeObject;
use crate::renderer::traits::NativeDevice;
use crate::utils::align_up;
use std::sync::Arc;

/// A region of an upload page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UploadAllocation {
    /// The upload page.
    pub resource: NativeHandle,
    /// Byte offset of the region within the page.
    pub offset: u64,
    /// GPU virtual address of the region.
    pub gpu_address: GpuVirtualAddress,
    /// Size of the region in bytes.
    pub size: u64,
}

#[derive(Debug)]
struct UploadPage {
    native: NativeObject,
    gpu_address: GpuVirtualAddress,
    size: u64,
}

impl UploadPage {
    fn new(device: &Arc<dyn NativeDevice>, size: u64) -> Result<Self, NativeError> {
        let committed = device.create_committed_resource(
            &ResourceDesc::buffer(size, ResourceFlags::NONE),
            HeapType::Upload,
            ResourceStates::GENERIC_READ,
            None,
        )?;
        device.set_name(committed.handle, "upload page");
        log::trace!("Created upload page {:?} ({} bytes)", committed.handle, size);
        Ok(Self {
            native: NativeObject::owned(device.clone(), committed.handle),
            gpu_address: committed.gpu_address,
            size,
        })
    }
}

/// Per-command-buffer upload memory.
#[derive(Debug)]
pub(crate) struct UploadHeap {
    device: Arc<dyn NativeDevice>,
    /// Size of a regular page.
    page_size: u64,
    /// Pages ready for reuse.
    available: Vec<UploadPage>,
    /// Full pages still referenced by recorded commands.
    retired: Vec<UploadPage>,
    /// Oversized pages, released on reset.
    dedicated: Vec<UploadPage>,
    /// The page being sub-allocated and its fill offset.
    current: Option<(UploadPage, u64)>,
}

impl UploadHeap {
    pub fn new(device: Arc<dyn NativeDevice>, page_size: u64) -> Self {
        Self {
            device,
            page_size: page_size.max(1),
            available: Vec::new(),
            retired: Vec::new(),
            dedicated: Vec::new(),
            current: None,
        }
    }

    /// Reserves `size` bytes aligned to `alignment`.
    pub fn allocate(&mut self, size: u64, alignment: u64) -> Result<UploadAllocation, NativeError> {
        if size > self.page_size {
            let page = UploadPage::new(&self.device, align_up(size, alignment))?;
            let allocation = UploadAllocation {
                resource: page.native.handle(),
                offset: 0,
                gpu_address: page.gpu_address,
                size,
            };
            self.dedicated.push(page);
            return Ok(allocation);
        }

        let fits = |(page, offset): &(UploadPage, u64)| align_up(*offset, alignment) + size <= page.size;
        if !self.current.as_ref().is_some_and(fits) {
            if let Some((full, _)) = self.current.take() {
                self.retired.push(full);
            }
            let page = match self.available.pop() {
                Some(page) => page,
                None => UploadPage::new(&self.device, self.page_size)?,
            };
            self.current = Some((page, 0));
        }

        let (page, offset) = self
            .current
            .as_mut()
            .ok_or(NativeError::OutOfMemory)?;
        let start = align_up(*offset, alignment);
        *offset = start + size;
        Ok(UploadAllocation {
            resource: page.native.handle(),
            offset: start,
            gpu_address: page.gpu_address + start,
            size,
        })
    }

    /// Copies `data` into a fresh region aligned to `alignment`.
    pub fn upload(&mut self, data: &[u8], alignment: u64) -> Result<UploadAllocation, NativeError> {
        let allocation = self.allocate(data.len().max(1) as u64, alignment)?;
        self.device
            .write_buffer(allocation.resource, allocation.offset, data)?;
        Ok(allocation)
    }

    /// Makes every page available again. Only valid once the GPU is done
    /// with the commands that referenced them.
    pub fn reset(&mut self) {
        if let Some((page, _)) = self.current.take() {
            self.available.push(page);
        }
        self.available.append(&mut self.retired);
        self.dedicated.clear();
    }

    /// Number of regular pages owned by the heap.
    pub fn num_pages(&self) -> usize {
        self.available.len() + self.retired.len() + usize::from(self.current.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::native::CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT;
    use crate::renderer::traits::mock::MockDevice;

    #[test]
    fn test_allocations_are_aligned_and_disjoint() {
        let mut heap = UploadHeap::new(MockDevice::new(), 4096);
        let a = heap.upload(&[1u8; 64], CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT).unwrap();
        let b = heap.upload(&[2u8; 64], CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT).unwrap();
        assert_eq!(a.resource, b.resource);
        assert_eq!(a.offset, 0);
        assert_eq!(b.offset, 256);
        assert_eq!(b.gpu_address - a.gpu_address, 256);
    }

    #[test]
    fn test_pages_roll_over_and_recycle() {
        let device = MockDevice::new();
        let mut heap = UploadHeap::new(device.clone(), 1024);
        let a = heap.allocate(768, 256).unwrap();
        let b = heap.allocate(512, 256).unwrap();
        assert_ne!(a.resource, b.resource);
        assert_eq!(b.offset, 0);
        assert_eq!(heap.num_pages(), 2);

        heap.reset();
        assert_eq!(heap.num_pages(), 2);
        let c = heap.allocate(128, 256).unwrap();
        assert!(c.resource == a.resource || c.resource == b.resource);
        assert!(device.released.lock().unwrap().is_empty());
    }

    #[test]
    fn test_oversized_uploads_get_a_dedicated_page() {
        let device = MockDevice::new();
        let mut heap = UploadHeap::new(device.clone(), 1024);
        let big = heap.upload(&vec![0u8; 5000], 4).unwrap();
        assert_eq!(big.offset, 0);
        assert_eq!(big.size, 5000);
        assert_eq!(heap.num_pages(), 0);

        heap.reset();
        assert_eq!(*device.released.lock().unwrap(), vec![big.resource]);
    }
}
