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

//! The device: factory for every GPU object and owner of the queues.

use crate::renderer::api::native::{
    DescriptorHeapType, Format, HeapType, NativeHandle, ShaderBytecode, SrvDimension,
    UavDimension, ViewDesc,
};
use crate::renderer::api::{
    DeviceSettings, IndirectArgumentType, QueryType, QueueType, ResourceState,
};
use crate::renderer::command::{CommandBuffer, CommandQueue, MipGenerator};
use crate::renderer::descriptor::{DescriptorAllocation, DescriptorAllocator};
use crate::renderer::error::{
    CommandError, NativeError, PipelineError, RenderError, ResourceError,
};
use crate::renderer::indirect::IndirectCommandSignature;
use crate::renderer::pipeline::{ComputePipelineState, GraphicsPipelineState};
use crate::renderer::query::Query;
use crate::renderer::render_target::RenderTarget;
use crate::renderer::resource::{
    BufferDescriptor, BufferId, BufferInfo, BufferKind, NativeObject, ResourceEntry, ResourceId,
    ResourceKind, ResourceRegistry, ResourceViews, SamplerDescriptor, SamplerId, SamplerInfo,
    TextureDescriptor, TextureId, TextureInfo, TextureUsage,
};
use crate::renderer::shader::{Shader, ShaderDescriptor};
use crate::renderer::signature::ShaderSignature;
use crate::renderer::traits::{NativeDevice, ShaderSourceWatcher};
use std::fmt;
use std::sync::Arc;

/// State shared by the device and every object it creates.
///
/// Holds no queues, so nothing created by the device can keep it alive.
pub(crate) struct DeviceContext {
    pub native: Arc<dyn NativeDevice>,
    pub resources: ResourceRegistry,
    pub allocators: [DescriptorAllocator; DescriptorHeapType::COUNT],
    pub settings: DeviceSettings,
    pub watcher: Option<Arc<dyn ShaderSourceWatcher>>,
    pub mips: Option<MipGenerator>,
}

impl fmt::Debug for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceContext")
            .field("resources", &self.resources.len())
            .field("settings", &self.settings)
            .field("mips", &self.mips.is_some())
            .finish()
    }
}

impl DeviceContext {
    fn allocate(
        &self,
        heap_type: DescriptorHeapType,
        count: u32,
    ) -> Result<DescriptorAllocation, NativeError> {
        self.allocators[heap_type as usize].allocate(count)
    }

    fn write_view(
        &self,
        allocation: &DescriptorAllocation,
        index: u32,
        desc: &ViewDesc,
    ) -> Result<(), NativeError> {
        self.native.create_view(desc, allocation.handle(index))
    }

    fn single_view(&self, desc: ViewDesc) -> Result<DescriptorAllocation, NativeError> {
        let allocation = self.allocate(desc.heap_type(), 1)?;
        self.write_view(&allocation, 0, &desc)?;
        Ok(allocation)
    }

    fn name_object(&self, handle: NativeHandle, name: &str) {
        if self.settings.debug_names {
            self.native.set_name(handle, name);
        }
    }
}

/// Options for [`Device::new`].
#[derive(Default)]
pub struct DeviceDescriptor {
    /// Runtime configuration.
    pub settings: DeviceSettings,
    /// Watches shader sources so pipelines rebuild when they change.
    pub watcher: Option<Arc<dyn ShaderSourceWatcher>>,
    /// Compiled downsampling shaders for
    /// [`CommandBuffer::generate_mips`], indexed by source parity:
    /// even/even, odd/even, even/odd, odd/odd (width/height).
    pub mip_shaders: Option<[ShaderBytecode; 4]>,
}

impl fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("settings", &self.settings)
            .field("watcher", &self.watcher)
            .field("mip_shaders", &self.mip_shaders.is_some())
            .finish()
    }
}

/// A GPU device with its direct, compute and copy queues.
///
/// Resources are owned by the device's registry and addressed by typed ids;
/// pipelines, signatures and render targets are plain owned or shared
/// objects that keep only the shared context alive. Dropping the device
/// waits for every queue to go idle.
pub struct Device {
    context: Arc<DeviceContext>,
    queues: [CommandQueue; 3],
}

impl fmt::Debug for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("context", &self.context)
            .field("queues", &self.queues)
            .finish()
    }
}

fn queue_index(queue_type: QueueType) -> usize {
    match queue_type {
        QueueType::Direct => 0,
        QueueType::Compute => 1,
        QueueType::Copy => 2,
    }
}

impl Device {
    /// Wraps a native device.
    pub fn new(
        native: Arc<dyn NativeDevice>,
        descriptor: DeviceDescriptor,
    ) -> Result<Self, RenderError> {
        if let Some(reason) = native.device_removed_reason() {
            return Err(RenderError::InitializationFailed(reason.to_string()));
        }
        let DeviceDescriptor {
            settings,
            watcher,
            mip_shaders,
        } = descriptor;

        let allocators = DescriptorHeapType::ALL.map(|heap_type| {
            DescriptorAllocator::new(
                native.clone(),
                heap_type,
                settings.descriptors_per_allocator_page,
                settings.node_mask,
            )
        });
        let mips = match mip_shaders {
            Some(shaders) => Some(MipGenerator::new(
                native.clone(),
                &shaders,
                settings.node_mask,
            )?),
            None => {
                log::warn!("No mip generation shaders supplied; generate_mips is unavailable");
                None
            }
        };

        let context = Arc::new(DeviceContext {
            native,
            resources: ResourceRegistry::new(),
            allocators,
            settings,
            watcher,
            mips,
        });
        let queues = [
            CommandQueue::new(context.clone(), QueueType::Direct)?,
            CommandQueue::new(context.clone(), QueueType::Compute)?,
            CommandQueue::new(context.clone(), QueueType::Copy)?,
        ];
        log::info!("Device initialized");

        Ok(Self { context, queues })
    }

    /// The settings the device was created with.
    pub fn settings(&self) -> &DeviceSettings {
        &self.context.settings
    }

    /// The queue of the given type.
    pub fn queue(&self, queue_type: QueueType) -> &CommandQueue {
        &self.queues[queue_index(queue_type)]
    }

    /// The direct (graphics) queue.
    pub fn direct_queue(&self) -> &CommandQueue {
        self.queue(QueueType::Direct)
    }

    /// Blocks until every queue has finished its submitted work.
    pub fn idle_gpu(&self) -> Result<(), RenderError> {
        for queue in &self.queues {
            queue.flush()?;
        }
        if let Some(reason) = self.context.native.device_removed_reason() {
            return Err(reason.into());
        }
        Ok(())
    }

    /// Allocates `count` contiguous CPU descriptors of `heap_type`.
    ///
    /// Pages grow on demand. The descriptors are returned to their page when
    /// the allocation is dropped.
    pub fn allocate_descriptors(
        &self,
        heap_type: DescriptorHeapType,
        count: u32,
    ) -> Result<DescriptorAllocation, NativeError> {
        self.context.allocate(heap_type, count)
    }

    // --- Resources ---

    /// Creates a buffer in the `COMMON` state (`COPY_DEST` for readback).
    ///
    /// Constant buffers get a CBV, structured and byte-address buffers an
    /// SRV, and a UAV when created with unordered access.
    pub fn create_buffer(&self, descriptor: &BufferDescriptor<'_>) -> Result<BufferId, ResourceError> {
        descriptor.validate()?;
        let context = &self.context;
        let name = descriptor.label.as_deref().unwrap_or("buffer").to_string();
        let kind = descriptor.kind;
        let initial_state = kind.initial_state();

        let committed = context.native.create_committed_resource(
            &descriptor.resource_desc(),
            kind.heap_type(),
            initial_state.to_native(),
            None,
        )?;
        let native = NativeObject::owned(context.native.clone(), committed.handle);
        context.name_object(committed.handle, &name);

        let info = BufferInfo {
            kind,
            size: descriptor.size(),
            element_count: descriptor.element_count,
            element_size: descriptor.element_size,
            heap_type: kind.heap_type(),
            unordered_access: descriptor.unordered_access,
        };
        let views = buffer_views(context, committed.handle, committed.gpu_address, &info)?;

        let mut entry = ResourceEntry::new(
            context.resources.reserve_id(),
            name,
            Some(native),
            committed.gpu_address,
            ResourceKind::Buffer(info),
            initial_state,
        );
        entry.views = views;
        log::debug!("Created {:?} buffer '{}' ({} bytes)", kind, entry.name, descriptor.size());
        Ok(BufferId(context.resources.insert(entry).0))
    }

    /// Creates a buffer and records the upload of `data` into it on `cmd`.
    pub fn create_buffer_with_data(
        &self,
        descriptor: &BufferDescriptor<'_>,
        data: &[u8],
        cmd: &mut CommandBuffer,
    ) -> Result<BufferId, CommandError> {
        let buffer = self.create_buffer(descriptor)?;
        if let Err(err) = cmd.set_buffer_data(buffer, 0, data) {
            self.destroy_buffer(buffer)?;
            return Err(err);
        }
        Ok(buffer)
    }

    /// Creates a 2D texture (array) in the `COMMON` state.
    ///
    /// The views follow the usage: SRVs of the whole chain and of each mip,
    /// one UAV per mip, and an RTV or DSV of mip 0.
    pub fn create_texture(
        &self,
        descriptor: &TextureDescriptor<'_>,
    ) -> Result<TextureId, ResourceError> {
        descriptor.validate()?;
        let context = &self.context;
        let name = descriptor.label.as_deref().unwrap_or("texture").to_string();
        let sample_count = descriptor.sample_count.count();
        let quality_levels = context
            .native
            .multisample_quality_levels(descriptor.format.to_native(), sample_count);
        if quality_levels == 0 {
            return Err(ResourceError::UnsupportedSampleCount {
                format: descriptor.format,
                count: sample_count,
            });
        }
        let sample_quality = if descriptor.sample_count.is_multisampled() {
            quality_levels - 1
        } else {
            0
        };

        let committed = context.native.create_committed_resource(
            &descriptor.resource_desc(sample_quality),
            HeapType::Default,
            ResourceState::COMMON.to_native(),
            descriptor.clear_value().as_ref(),
        )?;
        let native = NativeObject::owned(context.native.clone(), committed.handle);
        context.name_object(committed.handle, &name);

        let info = TextureInfo {
            format: descriptor.format,
            width: descriptor.size.width,
            height: descriptor.size.height,
            array_layers: descriptor.size.depth_or_array_layers,
            mip_levels: descriptor.resolved_mip_count(),
            sample_count: descriptor.sample_count,
            sample_quality,
            usage: descriptor.usage,
            clear_color: descriptor.clear_color,
            external: false,
        };
        self.insert_texture(name, native, info, ResourceState::COMMON)
    }

    /// Registers a texture owned by another component, such as a swapchain
    /// back buffer, in `state`.
    ///
    /// The device creates views for it but never releases the native object.
    pub fn register_external_texture(
        &self,
        handle: NativeHandle,
        descriptor: &TextureDescriptor<'_>,
        state: ResourceState,
    ) -> Result<TextureId, ResourceError> {
        descriptor.validate()?;
        if handle.is_null() {
            return Err(ResourceError::InvalidDescriptor(
                "external texture has a null handle".to_string(),
            ));
        }
        let name = descriptor
            .label
            .as_deref()
            .unwrap_or("external texture")
            .to_string();
        let native = NativeObject::borrowed(self.context.native.clone(), handle);
        let info = TextureInfo {
            format: descriptor.format,
            width: descriptor.size.width,
            height: descriptor.size.height,
            array_layers: descriptor.size.depth_or_array_layers,
            mip_levels: descriptor.resolved_mip_count(),
            sample_count: descriptor.sample_count,
            sample_quality: 0,
            usage: descriptor.usage,
            clear_color: descriptor.clear_color,
            external: true,
        };
        self.insert_texture(name, native, info, state)
    }

    fn insert_texture(
        &self,
        name: String,
        native: NativeObject,
        info: TextureInfo,
        state: ResourceState,
    ) -> Result<TextureId, ResourceError> {
        let context = &self.context;
        let views = texture_views(context, native.handle(), &info)?;
        log::debug!(
            "Created texture '{}' ({}x{}x{}, {} mips, {:?})",
            name,
            info.width,
            info.height,
            info.array_layers,
            info.mip_levels,
            info.format
        );
        let mut entry = ResourceEntry::new(
            context.resources.reserve_id(),
            name,
            Some(native),
            0,
            ResourceKind::Texture(info),
            state,
        );
        entry.views = views;
        Ok(TextureId(context.resources.insert(entry).0))
    }

    /// Creates a sampler, written once into a sampler descriptor.
    pub fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        let context = &self.context;
        let sampler = context.single_view(ViewDesc::Sampler(descriptor.to_native()))?;
        let mut entry = ResourceEntry::new(
            context.resources.reserve_id(),
            "sampler".to_string(),
            None,
            0,
            ResourceKind::Sampler(SamplerInfo {
                descriptor: *descriptor,
            }),
            ResourceState::COMMON,
        );
        entry.views = ResourceViews {
            sampler: Some(sampler),
            ..Default::default()
        };
        Ok(SamplerId(context.resources.insert(entry).0))
    }

    fn destroy(&self, id: ResourceId) -> Result<(), ResourceError> {
        let entry = self.context.resources.remove(id)?;
        log::debug!("Destroyed {} '{}'", entry.kind_name(), entry.name);
        Ok(())
    }

    /// Removes a buffer from the registry.
    ///
    /// Command buffers that recorded against it keep it alive until they
    /// are recycled.
    pub fn destroy_buffer(&self, buffer: BufferId) -> Result<(), ResourceError> {
        self.context.resources.get(buffer)?.buffer()?;
        self.destroy(buffer.into())
    }

    /// Removes a texture from the registry.
    pub fn destroy_texture(&self, texture: TextureId) -> Result<(), ResourceError> {
        self.context.resources.get(texture)?.texture()?;
        self.destroy(texture.into())
    }

    /// Removes a sampler from the registry.
    pub fn destroy_sampler(&self, sampler: SamplerId) -> Result<(), ResourceError> {
        self.context.resources.get(sampler)?.sampler()?;
        self.destroy(sampler.into())
    }

    /// The tracked state of a resource.
    pub fn resource_state(&self, resource: impl Into<ResourceId>) -> Result<ResourceState, ResourceError> {
        Ok(self.context.resources.get(resource)?.state())
    }

    /// Metadata of a buffer.
    pub fn buffer_info(&self, buffer: BufferId) -> Result<BufferInfo, ResourceError> {
        Ok(self.context.resources.get(buffer)?.buffer()?.clone())
    }

    /// Metadata of a texture.
    pub fn texture_info(&self, texture: TextureId) -> Result<TextureInfo, ResourceError> {
        Ok(self.context.resources.get(texture)?.texture()?.clone())
    }

    /// Number of live resources.
    pub fn resource_count(&self) -> usize {
        self.context.resources.len()
    }

    /// Copies `out.len()` bytes at `offset` from a readback buffer.
    ///
    /// Only meaningful once the copy into the buffer has completed.
    pub fn read_buffer(&self, buffer: BufferId, offset: u64, out: &mut [u8]) -> Result<(), ResourceError> {
        let entry = self.context.resources.get(buffer)?;
        let info = entry.buffer()?;
        if info.kind != BufferKind::Readback {
            return Err(ResourceError::WrongKind {
                id: entry.id,
                expected: "readback buffer",
            });
        }
        let end = offset + out.len() as u64;
        if end > info.size {
            return Err(ResourceError::OutOfBounds {
                requested: end,
                available: info.size,
            });
        }
        self.context.native.read_buffer(entry.handle(), offset, out)?;
        Ok(())
    }

    // --- Shaders and pipelines ---

    /// Wraps compiled bytecode; sources with a path are watched for changes.
    pub fn create_shader(
        &self,
        descriptor: ShaderDescriptor<'_>,
    ) -> Result<Arc<Shader>, PipelineError> {
        let shader = Arc::new(Shader::new(descriptor)?);
        log::debug!("Created {:?} shader '{}'", shader.stage(), shader.label());
        Ok(shader)
    }

    /// Creates an empty shader signature.
    pub fn create_shader_signature(&self, label: impl Into<String>) -> Arc<ShaderSignature> {
        Arc::new(ShaderSignature::new(self.context.native.clone(), label))
    }

    /// Creates an empty graphics pipeline state.
    pub fn create_graphics_pipeline(&self, label: impl Into<String>) -> GraphicsPipelineState {
        GraphicsPipelineState::new(
            self.context.native.clone(),
            self.context.watcher.clone(),
            label,
            self.context.settings.node_mask,
        )
    }

    /// Creates an empty compute pipeline state.
    pub fn create_compute_pipeline(&self, label: impl Into<String>) -> ComputePipelineState {
        ComputePipelineState::new(
            self.context.native.clone(),
            self.context.watcher.clone(),
            label,
            self.context.settings.node_mask,
        )
    }

    /// Creates a render target with no attachments.
    pub fn create_render_target(&self) -> Arc<RenderTarget> {
        Arc::new(RenderTarget::new(self.context.clone()))
    }

    /// Creates `count` queries of `query_type` with their readback buffer.
    pub fn create_query(&self, query_type: QueryType, count: u32) -> Result<Query, ResourceError> {
        Query::new(
            self.context.native.clone(),
            query_type,
            count,
            self.context.settings.node_mask,
        )
    }

    /// Creates the signature of indirect argument records.
    ///
    /// A `stride` of zero packs the records.
    pub fn create_indirect_command_signature(
        &self,
        argument_type: IndirectArgumentType,
        stride: u32,
    ) -> Result<IndirectCommandSignature, ResourceError> {
        IndirectCommandSignature::new(
            self.context.native.clone(),
            argument_type,
            stride,
            self.context.settings.node_mask,
        )
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Err(err) = self.idle_gpu() {
            log::error!("Failed to idle the GPU while dropping the device: {err}");
        }
        log::info!("Device destroyed");
    }
}

fn buffer_views(
    context: &DeviceContext,
    resource: NativeHandle,
    gpu_address: u64,
    info: &BufferInfo,
) -> Result<ResourceViews, NativeError> {
    let mut views = ResourceViews::default();
    let (format, num_elements, stride, raw) = match info.kind {
        BufferKind::Constant => {
            views.cbv = Some(context.single_view(ViewDesc::ConstantBuffer {
                buffer_location: gpu_address,
                size_in_bytes: info.size as u32,
            })?);
            return Ok(views);
        }
        BufferKind::Structured => (Format::Unknown, info.element_count, info.element_size, false),
        BufferKind::ByteAddress => (Format::R32Typeless, (info.size / 4) as u32, 0, true),
        BufferKind::Vertex | BufferKind::Index(_) | BufferKind::Readback => return Ok(views),
    };

    views.srv = Some(context.single_view(ViewDesc::ShaderResource {
        resource,
        format,
        dimension: SrvDimension::Buffer {
            first_element: 0,
            num_elements,
            structure_byte_stride: stride,
            raw,
        },
    })?);
    if info.unordered_access {
        views.uav = Some(context.single_view(ViewDesc::UnorderedAccess {
            resource,
            format,
            dimension: UavDimension::Buffer {
                first_element: 0,
                num_elements,
                structure_byte_stride: stride,
                raw,
            },
        })?);
    }
    Ok(views)
}

fn texture_srv_dimension(info: &TextureInfo, most_detailed_mip: u32, mip_levels: u32) -> SrvDimension {
    match (info.sample_count.is_multisampled(), info.array_layers > 1) {
        (true, false) => SrvDimension::Texture2DMs,
        (true, true) => SrvDimension::Texture2DMsArray {
            first_array_slice: 0,
            array_size: info.array_layers,
        },
        (false, false) => SrvDimension::Texture2D {
            most_detailed_mip,
            mip_levels,
        },
        (false, true) => SrvDimension::Texture2DArray {
            most_detailed_mip,
            mip_levels,
            first_array_slice: 0,
            array_size: info.array_layers,
        },
    }
}

fn texture_views(
    context: &DeviceContext,
    resource: NativeHandle,
    info: &TextureInfo,
) -> Result<ResourceViews, NativeError> {
    let mut views = ResourceViews::default();
    let usage = info.usage;
    let multisampled = info.sample_count.is_multisampled();

    if usage.contains(TextureUsage::SHADER_RESOURCE) {
        let format = info.format.shader_resource_format();
        views.srv = Some(context.single_view(ViewDesc::ShaderResource {
            resource,
            format,
            dimension: texture_srv_dimension(info, 0, info.mip_levels),
        })?);
        if !multisampled {
            let srv_mips = context.allocate(DescriptorHeapType::CbvSrvUav, info.mip_levels)?;
            for mip in 0..info.mip_levels {
                let desc = ViewDesc::ShaderResource {
                    resource,
                    format,
                    dimension: texture_srv_dimension(info, mip, 1),
                };
                context.write_view(&srv_mips, mip, &desc)?;
            }
            views.srv_mips = Some(srv_mips);
        }
    }

    if usage.contains(TextureUsage::UNORDERED_ACCESS) {
        let format = info.format.unordered_access_format();
        let uav = context.allocate(DescriptorHeapType::CbvSrvUav, info.mip_levels)?;
        for mip in 0..info.mip_levels {
            let dimension = if info.array_layers > 1 {
                UavDimension::Texture2DArray {
                    mip_slice: mip,
                    first_array_slice: 0,
                    array_size: info.array_layers,
                }
            } else {
                UavDimension::Texture2D { mip_slice: mip }
            };
            let desc = ViewDesc::UnorderedAccess {
                resource,
                format,
                dimension,
            };
            context.write_view(&uav, mip, &desc)?;
        }
        views.uav = Some(uav);
    }

    if usage.contains(TextureUsage::RENDER_TARGET) {
        views.rtv = Some(context.single_view(ViewDesc::RenderTarget {
            resource,
            format: info.format.to_native(),
            mip_slice: 0,
            multisampled,
        })?);
    }

    if usage.contains(TextureUsage::DEPTH_STENCIL) {
        views.dsv = Some(context.single_view(ViewDesc::DepthStencil {
            resource,
            format: info.format.to_native(),
            mip_slice: 0,
            multisampled,
        })?);
    }

    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::{Extent3D, IndexFormat, SampleCount, TextureFormat};
    use crate::renderer::traits::mock::MockDevice;
    use std::sync::atomic::Ordering;

    fn device() -> (Arc<MockDevice>, Device) {
        let mock = MockDevice::new();
        let device = Device::new(mock.clone(), DeviceDescriptor::default()).unwrap();
        (mock, device)
    }

    #[test]
    fn test_buffer_views_follow_kind() {
        let (_, device) = device();
        let constant = device
            .create_buffer(&BufferDescriptor::constant("constants", 64))
            .unwrap();
        let structured = device
            .create_buffer(&BufferDescriptor::structured("particles", 32, 16).with_unordered_access())
            .unwrap();
        let index = device
            .create_buffer(&BufferDescriptor::index("indices", 6, IndexFormat::Uint16))
            .unwrap();

        let resources = &device.context.resources;
        let entry = resources.get(constant).unwrap();
        assert!(entry.views.cbv.is_some());
        assert_eq!(entry.buffer().unwrap().size, 256);

        let entry = resources.get(structured).unwrap();
        assert!(entry.views.srv.is_some());
        assert!(entry.views.uav.is_some());
        assert!(entry.views.cbv.is_none());

        let entry = resources.get(index).unwrap();
        assert!(entry.views.srv.is_none());
        assert_eq!(device.resource_state(index).unwrap(), ResourceState::COMMON);
    }

    #[test]
    fn test_readback_buffers_start_as_copy_dest() {
        let (_, device) = device();
        let readback = device
            .create_buffer(&BufferDescriptor::readback("results", 64))
            .unwrap();
        assert_eq!(device.resource_state(readback).unwrap(), ResourceState::COPY_DEST);

        let mut out = [1u8; 16];
        device.read_buffer(readback, 48, &mut out).unwrap();
        assert_eq!(out, [0u8; 16]);
        assert!(matches!(
            device.read_buffer(readback, 56, &mut out),
            Err(ResourceError::OutOfBounds { .. })
        ));

        let structured = device
            .create_buffer(&BufferDescriptor::structured("data", 4, 4))
            .unwrap();
        assert!(matches!(
            device.read_buffer(structured, 0, &mut out[..4]),
            Err(ResourceError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_texture_views_follow_usage() {
        let (_, device) = device();
        let texture = device
            .create_texture(&TextureDescriptor {
                size: Extent3D {
                    width: 16,
                    height: 16,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 0,
                usage: TextureUsage::SHADER_RESOURCE
                    .union(TextureUsage::UNORDERED_ACCESS)
                    .union(TextureUsage::RENDER_TARGET),
                ..Default::default()
            })
            .unwrap();
        let entry = device.context.resources.get(texture).unwrap();
        let info = entry.texture().unwrap();
        assert_eq!(info.mip_levels, 5);
        assert_eq!(entry.views.srv_mips.as_ref().unwrap().count(), 5);
        assert_eq!(entry.views.uav.as_ref().unwrap().count(), 5);
        assert!(entry.views.rtv.is_some());
        assert!(entry.views.dsv.is_none());
    }

    #[test]
    fn test_unsupported_sample_count() {
        let (_, device) = device();
        let result = device.create_texture(&TextureDescriptor {
            size: Extent3D {
                width: 16,
                height: 16,
                depth_or_array_layers: 1,
            },
            sample_count: SampleCount::X16,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::RENDER_TARGET,
            ..Default::default()
        });
        assert_eq!(
            result.unwrap_err(),
            ResourceError::UnsupportedSampleCount {
                format: TextureFormat::Rgba8Unorm,
                count: 16,
            }
        );
    }

    #[test]
    fn test_destroy_releases_native_objects() {
        let (mock, device) = device();
        let buffer = device
            .create_buffer(&BufferDescriptor::vertex("vertices", 3, 12))
            .unwrap();
        let handle = device.context.resources.get(buffer).unwrap().handle();
        assert_eq!(device.resource_count(), 1);

        device.destroy_buffer(buffer).unwrap();
        assert_eq!(device.resource_count(), 0);
        assert!(mock.released.lock().unwrap().contains(&handle));
        assert!(matches!(
            device.destroy_buffer(buffer),
            Err(ResourceError::NotFound(_))
        ));
    }

    #[test]
    fn test_destroy_checks_the_resource_kind() {
        let (_mock, device) = device();
        let buffer = device
            .create_buffer(&BufferDescriptor::vertex("vertices", 3, 12))
            .unwrap();
        let sampler = device.create_sampler(&SamplerDescriptor::default()).unwrap();

        assert_eq!(
            device.destroy_sampler(SamplerId(buffer.0)),
            Err(ResourceError::WrongKind {
                id: buffer.into(),
                expected: "sampler",
            })
        );
        assert!(matches!(
            device.destroy_buffer(BufferId(sampler.0)),
            Err(ResourceError::WrongKind { .. })
        ));
        assert_eq!(device.resource_count(), 2);

        device.destroy_sampler(sampler).unwrap();
        assert_eq!(device.resource_count(), 1);
    }

    #[test]
    fn test_external_textures_are_not_released() {
        let (mock, device) = device();
        let handle = NativeHandle(0xBEEF);
        let texture = device
            .register_external_texture(
                handle,
                &TextureDescriptor {
                    usage: TextureUsage::RENDER_TARGET,
                    format: TextureFormat::Bgra8Unorm,
                    ..Default::default()
                },
                ResourceState::PRESENT,
            )
            .unwrap();
        assert!(device.texture_info(texture).unwrap().external);
        assert_eq!(device.resource_state(texture).unwrap(), ResourceState::PRESENT);

        device.destroy_texture(texture).unwrap();
        assert!(!mock.released.lock().unwrap().contains(&handle));
    }

    #[test]
    fn test_descriptor_allocation_grows_pages() {
        let (_, device) = device();
        let per_page = device.settings().descriptors_per_allocator_page;
        let first = device
            .allocate_descriptors(DescriptorHeapType::Rtv, per_page)
            .unwrap();
        let second = device
            .allocate_descriptors(DescriptorHeapType::Rtv, 1)
            .unwrap();
        assert_ne!(first.heap(), second.heap());
    }

    #[test]
    fn test_factories_use_settings() {
        let mock = MockDevice::new();
        let device = Device::new(
            mock.clone(),
            DeviceDescriptor {
                settings: DeviceSettings {
                    debug_names: false,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
        .unwrap();
        let signature = device.create_shader_signature("empty");
        assert_eq!(signature.num_parameters(), 0);
        let pipeline = device.create_compute_pipeline("compute");
        assert!(pipeline.is_dirty());
        assert_eq!(mock.pipelines_created.load(Ordering::Relaxed), 0);
        assert!(device.create_query(QueryType::Timer, 0).is_err());
    }
}
