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

use crate::renderer::api::native::{self, HeapType, ResourceFlags};
use crate::renderer::api::{IndexFormat, ResourceState};
use crate::renderer::error::ResourceError;
use crate::utils::align_up;
use std::borrow::Cow;

/// The role a buffer is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Shader constants, bound through a constant buffer view.
    Constant,
    /// An array of fixed-size elements read (or written) by shaders.
    Structured,
    /// Raw 32-bit addressable memory.
    ByteAddress,
    /// Vertex data.
    Vertex,
    /// Index data.
    Index(IndexFormat),
    /// CPU-readable copy destination.
    Readback,
}

impl BufferKind {
    /// The state a freshly created buffer of this kind is tracked in.
    pub fn initial_state(&self) -> ResourceState {
        match self {
            BufferKind::Readback => ResourceState::COPY_DEST,
            _ => ResourceState::COMMON,
        }
    }

    pub(crate) fn heap_type(&self) -> HeapType {
        match self {
            BufferKind::Readback => HeapType::Readback,
            _ => HeapType::Default,
        }
    }
}

/// Describes a buffer to create.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// Debug label.
    pub label: Option<Cow<'a, str>>,
    /// What the buffer is for.
    pub kind: BufferKind,
    /// Number of elements.
    pub element_count: u32,
    /// Size of one element in bytes.
    pub element_size: u32,
    /// Allows unordered access (structured and byte-address buffers only).
    pub unordered_access: bool,
}

impl<'a> BufferDescriptor<'a> {
    /// A constant buffer of `size` bytes.
    pub fn constant(label: &'a str, size: u32) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            kind: BufferKind::Constant,
            element_count: 1,
            element_size: size,
            unordered_access: false,
        }
    }

    /// A structured buffer of `element_count` elements of `element_size` bytes.
    pub fn structured(label: &'a str, element_count: u32, element_size: u32) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            kind: BufferKind::Structured,
            element_count,
            element_size,
            unordered_access: false,
        }
    }

    /// A byte-address buffer of `size` bytes.
    pub fn byte_address(label: &'a str, size: u32) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            kind: BufferKind::ByteAddress,
            element_count: size.div_ceil(4),
            element_size: 4,
            unordered_access: false,
        }
    }

    /// A vertex buffer of `vertex_count` vertices of `stride` bytes.
    pub fn vertex(label: &'a str, vertex_count: u32, stride: u32) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            kind: BufferKind::Vertex,
            element_count: vertex_count,
            element_size: stride,
            unordered_access: false,
        }
    }

    /// An index buffer of `index_count` indices.
    pub fn index(label: &'a str, index_count: u32, format: IndexFormat) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            kind: BufferKind::Index(format),
            element_count: index_count,
            element_size: format.size(),
            unordered_access: false,
        }
    }

    /// A readback buffer of `size` bytes.
    pub fn readback(label: &'a str, size: u64) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            kind: BufferKind::Readback,
            element_count: u32::try_from(size).unwrap_or(u32::MAX),
            element_size: 1,
            unordered_access: false,
        }
    }

    /// Requests unordered access.
    pub fn with_unordered_access(mut self) -> Self {
        self.unordered_access = true;
        self
    }

    /// The buffer size in bytes. Constant buffers are padded to 256 bytes.
    pub fn size(&self) -> u64 {
        let size = u64::from(self.element_count) * u64::from(self.element_size);
        match self.kind {
            BufferKind::Constant => {
                align_up(size, native::CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT)
            }
            _ => size,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ResourceError> {
        if self.element_count == 0 || self.element_size == 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "buffer '{}' has zero size",
                self.label.as_deref().unwrap_or("unnamed")
            )));
        }
        if self.unordered_access
            && !matches!(self.kind, BufferKind::Structured | BufferKind::ByteAddress)
        {
            return Err(ResourceError::InvalidDescriptor(format!(
                "{:?} buffers cannot be written by shaders",
                self.kind
            )));
        }
        if let BufferKind::Index(format) = self.kind {
            if self.element_size != format.size() {
                return Err(ResourceError::InvalidDescriptor(format!(
                    "index size {} does not match {:?}",
                    self.element_size, format
                )));
            }
        }
        Ok(())
    }

    pub(crate) fn resource_desc(&self) -> native::ResourceDesc {
        let flags = if self.unordered_access {
            ResourceFlags::ALLOW_UNORDERED_ACCESS
        } else {
            ResourceFlags::NONE
        };
        native::ResourceDesc::buffer(self.size(), flags)
    }
}

/// Metadata of a buffer in the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferInfo {
    /// What the buffer is for.
    pub kind: BufferKind,
    /// Size in bytes.
    pub size: u64,
    /// Number of elements.
    pub element_count: u32,
    /// Size of one element in bytes.
    pub element_size: u32,
    /// The heap the buffer lives in.
    pub heap_type: HeapType,
    /// Whether an unordered access view exists.
    pub unordered_access: bool,
}

impl BufferInfo {
    pub(crate) fn vertex_buffer_view(
        &self,
        address: native::GpuVirtualAddress,
    ) -> native::VertexBufferView {
        native::VertexBufferView {
            buffer_location: address,
            size_in_bytes: u32::try_from(self.size).unwrap_or(u32::MAX),
            stride_in_bytes: self.element_size,
        }
    }

    pub(crate) fn index_buffer_view(
        &self,
        address: native::GpuVirtualAddress,
        offset: u64,
    ) -> Option<native::IndexBufferView> {
        let BufferKind::Index(format) = self.kind else {
            return None;
        };
        Some(native::IndexBufferView {
            buffer_location: address + offset,
            size_in_bytes: u32::try_from(self.size.saturating_sub(offset)).unwrap_or(u32::MAX),
            format: format.to_native(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_buffers_are_padded() {
        let desc = BufferDescriptor::constant("camera", 64);
        assert_eq!(desc.size(), 256);
        assert_eq!(desc.resource_desc().width, 256);
        assert_eq!(BufferDescriptor::vertex("quad", 4, 12).size(), 48);
    }

    #[test]
    fn test_validation() {
        assert!(BufferDescriptor::vertex("empty", 0, 12).validate().is_err());
        assert!(BufferDescriptor::vertex("rw", 4, 12)
            .with_unordered_access()
            .validate()
            .is_err());
        let rw = BufferDescriptor::structured("particles", 128, 32).with_unordered_access();
        assert!(rw.validate().is_ok());
        assert!(rw
            .resource_desc()
            .flags
            .contains(ResourceFlags::ALLOW_UNORDERED_ACCESS));
    }

    #[test]
    fn test_index_buffer_view() {
        let info = BufferInfo {
            kind: BufferKind::Index(IndexFormat::Uint16),
            size: 12,
            element_count: 6,
            element_size: 2,
            heap_type: HeapType::Default,
            unordered_access: false,
        };
        let view = info.index_buffer_view(0x1000, 4).unwrap();
        assert_eq!(view.buffer_location, 0x1004);
        assert_eq!(view.size_in_bytes, 8);
        assert_eq!(view.format, native::Format::R16Uint);
    }
}
