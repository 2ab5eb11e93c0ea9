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

use crate::renderer::api::native::{self, ResourceFlags};
use crate::renderer::api::{Extent3D, LinearRgba, SampleCount, TextureFormat};
use crate::renderer::error::ResourceError;
use crate::umbra_bitflags;
use std::borrow::Cow;

umbra_bitflags! {
    /// The ways a texture may be bound.
    pub struct TextureUsage: u32 {
        /// Read by shaders.
        const SHADER_RESOURCE = 1 << 0;
        /// Bound as a color attachment.
        const RENDER_TARGET = 1 << 1;
        /// Bound as a depth/stencil attachment.
        const DEPTH_STENCIL = 1 << 2;
        /// Written by shaders.
        const UNORDERED_ACCESS = 1 << 3;
    }
}

/// Describes a 2D texture (or texture array) to create.
#[derive(Debug, Clone)]
pub struct TextureDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// Width, height and array layer count.
    pub size: Extent3D,
    /// Number of mip levels; zero requests the full chain.
    pub mip_level_count: u32,
    /// Samples per texel.
    pub sample_count: SampleCount,
    /// Texel format.
    pub format: TextureFormat,
    /// Allowed bindings.
    pub usage: TextureUsage,
    /// Optimized clear color of color attachments.
    pub clear_color: LinearRgba,
}

impl Default for TextureDescriptor<'_> {
    fn default() -> Self {
        Self {
            label: None,
            size: Extent3D {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: SampleCount::X1,
            format: TextureFormat::Rgba8Unorm,
            usage: TextureUsage::SHADER_RESOURCE,
            clear_color: LinearRgba::BLACK,
        }
    }
}

/// Number of levels in a full mip chain of a `width` x `height` texture.
pub fn full_mip_count(width: u32, height: u32) -> u32 {
    32 - width.max(height).max(1).leading_zeros()
}

impl TextureDescriptor<'_> {
    /// The mip level count after resolving zero to the full chain.
    pub fn resolved_mip_count(&self) -> u32 {
        if self.mip_level_count == 0 {
            full_mip_count(self.size.width, self.size.height)
        } else {
            self.mip_level_count
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ResourceError> {
        let label = self.label.as_deref().unwrap_or("unnamed");
        let invalid = |msg: &str| Err(ResourceError::InvalidDescriptor(format!("texture '{label}': {msg}")));
        if self.size.width == 0 || self.size.height == 0 || self.size.depth_or_array_layers == 0 {
            return invalid("zero-sized extent");
        }
        if self.size.depth_or_array_layers > u32::from(u16::MAX) {
            return invalid("too many array layers");
        }
        let mips = self.resolved_mip_count();
        if mips > full_mip_count(self.size.width, self.size.height) {
            return invalid("more mip levels than the full chain");
        }
        if self.sample_count.is_multisampled() {
            if mips > 1 {
                return invalid("multisampled textures cannot have mips");
            }
            if self.usage.contains(TextureUsage::UNORDERED_ACCESS) {
                return invalid("multisampled textures cannot be written by shaders");
            }
        }
        if self.format.is_depth() {
            if self
                .usage
                .intersects(TextureUsage::RENDER_TARGET.union(TextureUsage::UNORDERED_ACCESS))
            {
                return invalid("depth formats can only be used for depth/stencil and shader reads");
            }
        } else if self.usage.contains(TextureUsage::DEPTH_STENCIL) {
            return invalid("depth/stencil usage requires a depth format");
        }
        Ok(())
    }

    pub(crate) fn resource_desc(&self, sample_quality: u32) -> native::ResourceDesc {
        let mut flags = ResourceFlags::NONE;
        if self.usage.contains(TextureUsage::RENDER_TARGET) {
            flags.insert(ResourceFlags::ALLOW_RENDER_TARGET);
        }
        if self.usage.contains(TextureUsage::DEPTH_STENCIL) {
            flags.insert(ResourceFlags::ALLOW_DEPTH_STENCIL);
            if !self.usage.contains(TextureUsage::SHADER_RESOURCE) {
                flags.insert(ResourceFlags::DENY_SHADER_RESOURCE);
            }
        }
        if self.usage.contains(TextureUsage::UNORDERED_ACCESS) {
            flags.insert(ResourceFlags::ALLOW_UNORDERED_ACCESS);
        }
        native::ResourceDesc::texture_2d(
            self.format
                .resource_format(self.usage.contains(TextureUsage::SHADER_RESOURCE)),
            u64::from(self.size.width),
            self.size.height,
            self.size.depth_or_array_layers as u16,
            self.resolved_mip_count() as u16,
            native::SampleDesc {
                count: self.sample_count.count(),
                quality: sample_quality,
            },
            flags,
        )
    }

    pub(crate) fn clear_value(&self) -> Option<native::ClearValue> {
        if self.usage.contains(TextureUsage::DEPTH_STENCIL) {
            Some(native::ClearValue::DepthStencil {
                format: self.format.to_native(),
                depth: 1.0,
                stencil: 0,
            })
        } else if self.usage.contains(TextureUsage::RENDER_TARGET) {
            Some(native::ClearValue::Color {
                format: self.format.to_native(),
                color: self.clear_color.to_array(),
            })
        } else {
            None
        }
    }
}

/// Metadata of a texture in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    /// Texel format.
    pub format: TextureFormat,
    /// Width of mip 0.
    pub width: u32,
    /// Height of mip 0.
    pub height: u32,
    /// Number of array layers.
    pub array_layers: u32,
    /// Number of mip levels.
    pub mip_levels: u32,
    /// Samples per texel.
    pub sample_count: SampleCount,
    /// Native sample quality level.
    pub sample_quality: u32,
    /// Allowed bindings.
    pub usage: TextureUsage,
    /// Optimized clear color.
    pub clear_color: LinearRgba,
    /// `true` for textures owned by an external collaborator (swapchain).
    pub external: bool,
}

impl TextureInfo {
    /// The size of a mip level, clamped to one texel.
    pub fn mip_size(&self, mip: u32) -> (u32, u32) {
        ((self.width >> mip).max(1), (self.height >> mip).max(1))
    }

    /// The native subresource index of a mip level of an array slice.
    pub fn subresource(&self, mip: u32, array_slice: u32) -> u32 {
        mip + array_slice * self.mip_levels
    }

    /// Number of subresources.
    pub fn subresource_count(&self) -> u32 {
        self.mip_levels * self.array_layers
    }
}
