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

//! GPU resources and the device's resource registry.
//!
//! Buffers, textures and samplers are owned by the [`ResourceRegistry`] and
//! referred to by typed handles. An entry carries the native allocation, the
//! tracked [`ResourceState`] and the descriptor views created for it. Command
//! buffers hold transient `Arc` references to the entries they record against,
//! so destroying a handle while work is in flight is safe.

mod buffer;
mod sampler;
mod texture;

pub use self::buffer::*;
pub use self::sampler::*;
pub use self::texture::*;

use crate::renderer::api::native::{GpuVirtualAddress, NativeHandle};
use crate::renderer::api::ResourceState;
use crate::renderer::descriptor::DescriptorAllocation;
use crate::renderer::error::ResourceError;
use crate::renderer::traits::NativeDevice;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// An opaque handle to any resource in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId(pub usize);

/// An opaque handle to a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

/// An opaque handle to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub usize);

/// An opaque handle to a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SamplerId(pub usize);

impl From<BufferId> for ResourceId {
    fn from(id: BufferId) -> Self {
        ResourceId(id.0)
    }
}

impl From<TextureId> for ResourceId {
    fn from(id: TextureId) -> Self {
        ResourceId(id.0)
    }
}

impl From<SamplerId> for ResourceId {
    fn from(id: SamplerId) -> Self {
        ResourceId(id.0)
    }
}

/// A native object together with the device that releases it.
///
/// Borrowed objects (swapchain back buffers, for instance) are never released.
pub struct NativeObject {
    handle: NativeHandle,
    device: Arc<dyn NativeDevice>,
    owned: bool,
}

impl NativeObject {
    pub(crate) fn owned(device: Arc<dyn NativeDevice>, handle: NativeHandle) -> Self {
        Self {
            handle,
            device,
            owned: true,
        }
    }

    pub(crate) fn borrowed(device: Arc<dyn NativeDevice>, handle: NativeHandle) -> Self {
        Self {
            handle,
            device,
            owned: false,
        }
    }

    /// The native handle.
    pub fn handle(&self) -> NativeHandle {
        self.handle
    }
}

impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObject")
            .field("handle", &self.handle)
            .field("owned", &self.owned)
            .finish()
    }
}

impl Drop for NativeObject {
    fn drop(&mut self) {
        if self.owned && !self.handle.is_null() {
            log::trace!("Releasing native object {:?}", self.handle);
            self.device.release(self.handle);
        }
    }
}

/// The kind-specific part of a registry entry.
#[derive(Debug, Clone)]
pub enum ResourceKind {
    /// A buffer.
    Buffer(BufferInfo),
    /// A texture.
    Texture(TextureInfo),
    /// A sampler.
    Sampler(SamplerInfo),
}

impl ResourceKind {
    fn name(&self) -> &'static str {
        match self {
            ResourceKind::Buffer(_) => "buffer",
            ResourceKind::Texture(_) => "texture",
            ResourceKind::Sampler(_) => "sampler",
        }
    }
}

/// Descriptor views of a resource.
///
/// Per-mip views of a texture (`srv_mips`, `uav`) hold one descriptor per
/// mip level, indexed by mip.
#[derive(Debug, Default)]
pub(crate) struct ResourceViews {
    pub cbv: Option<DescriptorAllocation>,
    pub srv: Option<DescriptorAllocation>,
    pub srv_mips: Option<DescriptorAllocation>,
    pub uav: Option<DescriptorAllocation>,
    pub rtv: Option<DescriptorAllocation>,
    pub dsv: Option<DescriptorAllocation>,
    pub sampler: Option<DescriptorAllocation>,
}

/// A resource owned by the registry.
#[derive(Debug)]
pub(crate) struct ResourceEntry {
    pub id: ResourceId,
    pub name: String,
    pub native: Option<NativeObject>,
    pub gpu_address: GpuVirtualAddress,
    pub kind: ResourceKind,
    pub views: ResourceViews,
    state: AtomicU32,
}

impl ResourceEntry {
    pub fn new(
        id: ResourceId,
        name: String,
        native: Option<NativeObject>,
        gpu_address: GpuVirtualAddress,
        kind: ResourceKind,
        initial_state: ResourceState,
    ) -> Self {
        Self {
            id,
            name,
            native,
            gpu_address,
            kind,
            views: ResourceViews::default(),
            state: AtomicU32::new(initial_state.bits()),
        }
    }

    /// The tracked state.
    pub fn state(&self) -> ResourceState {
        ResourceState::from_bits_truncate(self.state.load(Ordering::Acquire))
    }

    pub fn set_state(&self, state: ResourceState) {
        self.state.store(state.bits(), Ordering::Release);
    }

    /// The native handle, or null for samplers.
    pub fn handle(&self) -> NativeHandle {
        self.native
            .as_ref()
            .map_or(NativeHandle::NULL, NativeObject::handle)
    }

    pub fn buffer(&self) -> Result<&BufferInfo, ResourceError> {
        match &self.kind {
            ResourceKind::Buffer(info) => Ok(info),
            _ => Err(ResourceError::WrongKind {
                id: self.id,
                expected: "buffer",
            }),
        }
    }

    pub fn texture(&self) -> Result<&TextureInfo, ResourceError> {
        match &self.kind {
            ResourceKind::Texture(info) => Ok(info),
            _ => Err(ResourceError::WrongKind {
                id: self.id,
                expected: "texture",
            }),
        }
    }

    pub fn sampler(&self) -> Result<&SamplerInfo, ResourceError> {
        match &self.kind {
            ResourceKind::Sampler(info) => Ok(info),
            _ => Err(ResourceError::WrongKind {
                id: self.id,
                expected: "sampler",
            }),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Owner of every live resource, keyed by [`ResourceId`].
#[derive(Debug, Default)]
pub(crate) struct ResourceRegistry {
    entries: Mutex<HashMap<ResourceId, Arc<ResourceEntry>>>,
    next_id: AtomicUsize,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Reserves a fresh id.
    pub fn reserve_id(&self) -> ResourceId {
        ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn insert(&self, entry: ResourceEntry) -> ResourceId {
        let id = entry.id;
        log::debug!("Registered {} '{}' as {:?}", entry.kind_name(), entry.name, id);
        self.entries.lock().unwrap().insert(id, Arc::new(entry));
        id
    }

    pub fn get(&self, id: impl Into<ResourceId>) -> Result<Arc<ResourceEntry>, ResourceError> {
        let id = id.into();
        self.entries
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(ResourceError::NotFound(id))
    }

    pub fn remove(&self, id: impl Into<ResourceId>) -> Result<Arc<ResourceEntry>, ResourceError> {
        let id = id.into();
        let entry = self
            .entries
            .lock()
            .unwrap()
            .remove(&id)
            .ok_or(ResourceError::NotFound(id))?;
        log::debug!("Destroyed {} '{}' ({:?})", entry.kind_name(), entry.name, id);
        Ok(entry)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::native::HeapType;
    use crate::renderer::traits::mock::MockDevice;

    fn buffer_entry(registry: &ResourceRegistry, device: &Arc<MockDevice>) -> ResourceEntry {
        let native: Arc<dyn NativeDevice> = device.clone();
        ResourceEntry::new(
            registry.reserve_id(),
            "test".to_string(),
            Some(NativeObject::owned(native, NativeHandle(42))),
            0x1000,
            ResourceKind::Buffer(BufferInfo {
                kind: BufferKind::ByteAddress,
                size: 64,
                element_count: 16,
                element_size: 4,
                heap_type: HeapType::Default,
                unordered_access: false,
            }),
            ResourceState::COMMON,
        )
    }

    #[test]
    fn test_registry_insert_get_remove() {
        let device = MockDevice::new();
        let registry = ResourceRegistry::new();
        let id = registry.insert(buffer_entry(&registry, &device));

        let entry = registry.get(id).unwrap();
        assert_eq!(entry.handle(), NativeHandle(42));
        assert!(entry.buffer().is_ok());
        assert_eq!(
            entry.texture().unwrap_err(),
            ResourceError::WrongKind {
                id,
                expected: "texture"
            }
        );

        registry.remove(id).unwrap();
        assert_eq!(registry.get(id).unwrap_err(), ResourceError::NotFound(id));
        assert!(
            device.released.lock().unwrap().is_empty(),
            "A transient hold keeps the native object alive"
        );
        drop(entry);
        assert_eq!(*device.released.lock().unwrap(), vec![NativeHandle(42)]);
    }

    #[test]
    fn test_borrowed_objects_are_not_released() {
        let device = MockDevice::new();
        let native: Arc<dyn NativeDevice> = device.clone();
        drop(NativeObject::borrowed(native, NativeHandle(7)));
        assert!(device.released.lock().unwrap().is_empty());
    }

    #[test]
    fn test_tracked_state() {
        let device = MockDevice::new();
        let registry = ResourceRegistry::new();
        let entry = buffer_entry(&registry, &device);
        assert_eq!(entry.state(), ResourceState::COMMON);
        entry.set_state(ResourceState::COPY_DEST);
        assert_eq!(entry.state(), ResourceState::COPY_DEST);
    }
}
