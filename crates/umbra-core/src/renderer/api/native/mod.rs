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

//! Native (Direct3D 12 shaped) handles, enumerations and constants.
//!
//! Every enumeration in this module carries the exact numeric value of its
//! D3D12 counterpart so a real binding can pass it through unchanged. The
//! engine-level types in [`crate::renderer::api::enums`] translate into these.

mod desc;

pub use self::desc::*;

use crate::umbra_bitflags;
use std::fmt;

/// Subresource index addressing every subresource of a resource.
pub const RESOURCE_BARRIER_ALL_SUBRESOURCES: u32 = 0xffff_ffff;
/// Required alignment of constant buffer views and their sizes.
pub const CONSTANT_BUFFER_DATA_PLACEMENT_ALIGNMENT: u64 = 256;
/// Required alignment of the row pitch of texture upload footprints.
pub const TEXTURE_DATA_PITCH_ALIGNMENT: u64 = 256;
/// Required alignment of the offset of texture upload footprints.
pub const TEXTURE_DATA_PLACEMENT_ALIGNMENT: u64 = 512;
/// Marks a descriptor range as following the previous one in its table.
pub const DESCRIPTOR_RANGE_OFFSET_APPEND: u32 = 0xffff_ffff;
/// Upper bound of viewport and scissor coordinates.
pub const VIEWPORT_BOUNDS_MAX: i32 = 32767;
/// Number of simultaneous render targets.
pub const SIMULTANEOUS_RENDER_TARGET_COUNT: usize = 8;
/// Default sample mask enabling every sample.
pub const DEFAULT_SAMPLE_MASK: u32 = 0xffff_ffff;
/// Default stencil read mask.
pub const DEFAULT_STENCIL_READ_MASK: u8 = 0xff;
/// Default stencil write mask.
pub const DEFAULT_STENCIL_WRITE_MASK: u8 = 0xff;

/// An opaque handle to a native object (device child, heap, fence, ...).
///
/// Ownership of the underlying object is expressed by
/// [`NativeObject`](crate::renderer::resource::NativeObject), not by the handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct NativeHandle(pub u64);

impl NativeHandle {
    /// The null handle.
    pub const NULL: Self = Self(0);

    /// Returns `true` for the null handle.
    pub const fn is_null(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for NativeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeHandle({:#x})", self.0)
    }
}

/// A GPU virtual address.
pub type GpuVirtualAddress = u64;

/// Mirrors `D3D12_CPU_DESCRIPTOR_HANDLE`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CpuDescriptorHandle {
    /// Address of the descriptor.
    pub ptr: usize,
}

impl CpuDescriptorHandle {
    /// The null descriptor handle.
    pub const NULL: Self = Self { ptr: 0 };

    /// Returns `true` for the null handle.
    pub const fn is_null(&self) -> bool {
        self.ptr == 0
    }

    /// Returns the handle `index` descriptors past this one.
    pub const fn offset(self, index: u32, increment: u32) -> Self {
        Self {
            ptr: self.ptr + index as usize * increment as usize,
        }
    }
}

/// Mirrors `D3D12_GPU_DESCRIPTOR_HANDLE`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct GpuDescriptorHandle {
    /// GPU address of the descriptor.
    pub ptr: u64,
}

impl GpuDescriptorHandle {
    /// The null descriptor handle.
    pub const NULL: Self = Self { ptr: 0 };

    /// Returns the handle `index` descriptors past this one.
    pub const fn offset(self, index: u32, increment: u32) -> Self {
        Self {
            ptr: self.ptr + index as u64 * increment as u64,
        }
    }
}

/// Mirrors `D3D12_FILL_MODE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FillMode {
    Wireframe = 2,
    Solid = 3,
}

/// Mirrors `D3D12_CULL_MODE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CullMode {
    None = 1,
    Front = 2,
    Back = 3,
}

/// Mirrors `D3D12_CONSERVATIVE_RASTERIZATION_MODE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ConservativeRasterizationMode {
    Off = 0,
    On = 1,
}

/// Mirrors `D3D12_COMPARISON_FUNC`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ComparisonFunc {
    Never = 1,
    Less = 2,
    Equal = 3,
    LessEqual = 4,
    Greater = 5,
    NotEqual = 6,
    GreaterEqual = 7,
    Always = 8,
}

/// Mirrors `D3D12_DEPTH_WRITE_MASK`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum DepthWriteMask {
    Zero = 0,
    All = 1,
}

/// Mirrors `D3D12_STENCIL_OP`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StencilOp {
    Keep = 1,
    Zero = 2,
    Replace = 3,
    IncrSat = 4,
    DecrSat = 5,
    Invert = 6,
    Incr = 7,
    Decr = 8,
}

/// Mirrors `D3D12_BLEND`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Blend {
    Zero = 1,
    One = 2,
    SrcColor = 3,
    InvSrcColor = 4,
    SrcAlpha = 5,
    InvSrcAlpha = 6,
    DestAlpha = 7,
    InvDestAlpha = 8,
    DestColor = 9,
    InvDestColor = 10,
    SrcAlphaSat = 11,
    BlendFactor = 14,
    InvBlendFactor = 15,
    Src1Color = 16,
    InvSrc1Color = 17,
    Src1Alpha = 18,
    InvSrc1Alpha = 19,
}

/// Mirrors `D3D12_BLEND_OP`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BlendOp {
    Add = 1,
    Subtract = 2,
    RevSubtract = 3,
    Min = 4,
    Max = 5,
}

/// Mirrors `D3D12_LOGIC_OP`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum LogicOp {
    Clear = 0,
    Set = 1,
    Copy = 2,
    CopyInverted = 3,
    Noop = 4,
    Invert = 5,
    And = 6,
    Nand = 7,
    Or = 8,
    Nor = 9,
    Xor = 10,
    Equiv = 11,
    AndReverse = 12,
    AndInverted = 13,
    OrReverse = 14,
    OrInverted = 15,
}

umbra_bitflags! {
    /// Mirrors `D3D12_COLOR_WRITE_ENABLE`.
    pub struct ColorWriteEnable: u8 {
        /// Red channel.
        const RED = 1;
        /// Green channel.
        const GREEN = 2;
        /// Blue channel.
        const BLUE = 4;
        /// Alpha channel.
        const ALPHA = 8;
        /// Every channel.
        const ALL = 1 | 2 | 4 | 8;
    }
}

umbra_bitflags! {
    /// Mirrors `D3D12_RESOURCE_STATES`.
    pub struct ResourceStates: u32 {
        /// `D3D12_RESOURCE_STATE_COMMON` (also `PRESENT`).
        const COMMON = 0;
        /// Vertex and constant buffer reads.
        const VERTEX_AND_CONSTANT_BUFFER = 0x1;
        /// Index buffer reads.
        const INDEX_BUFFER = 0x2;
        /// Render target writes.
        const RENDER_TARGET = 0x4;
        /// Unordered access.
        const UNORDERED_ACCESS = 0x8;
        /// Depth writes.
        const DEPTH_WRITE = 0x10;
        /// Depth reads.
        const DEPTH_READ = 0x20;
        /// Shader reads outside the pixel stage.
        const NON_PIXEL_SHADER_RESOURCE = 0x40;
        /// Shader reads in the pixel stage.
        const PIXEL_SHADER_RESOURCE = 0x80;
        /// Stream output.
        const STREAM_OUT = 0x100;
        /// Indirect arguments (also `PREDICATION`).
        const INDIRECT_ARGUMENT = 0x200;
        /// Copy destination.
        const COPY_DEST = 0x400;
        /// Copy source.
        const COPY_SOURCE = 0x800;
        /// Resolve destination.
        const RESOLVE_DEST = 0x1000;
        /// Resolve source.
        const RESOLVE_SOURCE = 0x2000;
        /// Every read state usable by upload heaps.
        const GENERIC_READ = 0x1 | 0x2 | 0x40 | 0x80 | 0x200 | 0x800;
    }
}

impl ResourceStates {
    /// `D3D12_RESOURCE_STATE_PRESENT`.
    pub const PRESENT: Self = Self::COMMON;
    /// `D3D12_RESOURCE_STATE_PREDICATION`.
    pub const PREDICATION: Self = Self::INDIRECT_ARGUMENT;
}

/// Mirrors `D3D12_RESOURCE_BARRIER_TYPE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ResourceBarrierType {
    Transition = 0,
    Aliasing = 1,
    Uav = 2,
}

/// Mirrors `D3D12_ROOT_PARAMETER_TYPE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum RootParameterType {
    DescriptorTable = 0,
    Constants32Bit = 1,
    Cbv = 2,
    Srv = 3,
    Uav = 4,
}

/// Mirrors `D3D12_DESCRIPTOR_RANGE_TYPE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum DescriptorRangeType {
    Srv = 0,
    Uav = 1,
    Cbv = 2,
    Sampler = 3,
}

/// Mirrors `D3D12_SHADER_VISIBILITY`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ShaderVisibility {
    All = 0,
    Vertex = 1,
    Hull = 2,
    Domain = 3,
    Geometry = 4,
    Pixel = 5,
}

umbra_bitflags! {
    /// Mirrors `D3D12_ROOT_SIGNATURE_FLAGS`.
    pub struct RootSignatureFlags: u32 {
        /// No flags.
        const NONE = 0;
        /// The input assembler may use an input layout.
        const ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT = 0x1;
        /// Denies the vertex stage access to the root signature.
        const DENY_VERTEX_SHADER_ROOT_ACCESS = 0x2;
        /// Denies the hull stage access to the root signature.
        const DENY_HULL_SHADER_ROOT_ACCESS = 0x4;
        /// Denies the domain stage access to the root signature.
        const DENY_DOMAIN_SHADER_ROOT_ACCESS = 0x8;
        /// Denies the geometry stage access to the root signature.
        const DENY_GEOMETRY_SHADER_ROOT_ACCESS = 0x10;
        /// Denies the pixel stage access to the root signature.
        const DENY_PIXEL_SHADER_ROOT_ACCESS = 0x20;
    }
}

/// Mirrors `D3D12_PRIMITIVE_TOPOLOGY_TYPE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum PrimitiveTopologyType {
    Undefined = 0,
    Point = 1,
    Line = 2,
    Triangle = 3,
    Patch = 4,
}

/// Mirrors `D3D_PRIMITIVE_TOPOLOGY`.
///
/// Patch lists are encoded as `33 + control_points - 1`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveTopology(pub i32);

impl PrimitiveTopology {
    /// `D3D_PRIMITIVE_TOPOLOGY_UNDEFINED`.
    pub const UNDEFINED: Self = Self(0);
    /// `D3D_PRIMITIVE_TOPOLOGY_POINTLIST`.
    pub const POINT_LIST: Self = Self(1);
    /// `D3D_PRIMITIVE_TOPOLOGY_LINELIST`.
    pub const LINE_LIST: Self = Self(2);
    /// `D3D_PRIMITIVE_TOPOLOGY_LINESTRIP`.
    pub const LINE_STRIP: Self = Self(3);
    /// `D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST`.
    pub const TRIANGLE_LIST: Self = Self(4);
    /// `D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP`.
    pub const TRIANGLE_STRIP: Self = Self(5);
    /// `D3D_PRIMITIVE_TOPOLOGY_LINELIST_ADJ`.
    pub const LINE_LIST_ADJ: Self = Self(10);
    /// `D3D_PRIMITIVE_TOPOLOGY_LINESTRIP_ADJ`.
    pub const LINE_STRIP_ADJ: Self = Self(11);
    /// `D3D_PRIMITIVE_TOPOLOGY_TRIANGLELIST_ADJ`.
    pub const TRIANGLE_LIST_ADJ: Self = Self(12);
    /// `D3D_PRIMITIVE_TOPOLOGY_TRIANGLESTRIP_ADJ`.
    pub const TRIANGLE_STRIP_ADJ: Self = Self(13);

    /// Returns the patch-list topology with `control_points` points (1..=32).
    pub const fn patch_list(control_points: u32) -> Self {
        Self(33 + control_points as i32 - 1)
    }
}

/// Mirrors `D3D12_INDEX_BUFFER_STRIP_CUT_VALUE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum IndexBufferStripCutValue {
    Disabled = 0,
    Cut0xFFFF = 1,
    Cut0xFFFFFFFF = 2,
}

/// Mirrors `D3D12_TEXTURE_ADDRESS_MODE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TextureAddressMode {
    Wrap = 1,
    Mirror = 2,
    Clamp = 3,
    Border = 4,
    MirrorOnce = 5,
}

/// Mirrors `D3D12_STATIC_BORDER_COLOR`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum StaticBorderColor {
    TransparentBlack = 0,
    OpaqueBlack = 1,
    OpaqueWhite = 2,
}

/// Mirrors `D3D12_FILTER_TYPE`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FilterType {
    Point = 0,
    Linear = 1,
}

/// Mirrors `D3D12_FILTER_REDUCTION_TYPE`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FilterReductionType {
    Standard = 0,
    Comparison = 1,
    Minimum = 2,
    Maximum = 3,
}

/// Mirrors `D3D12_FILTER`, built with the `D3D12_ENCODE_*_FILTER` rules.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Filter(pub u32);

impl Filter {
    const TYPE_MASK: u32 = 0x3;
    const MIN_SHIFT: u32 = 4;
    const MAG_SHIFT: u32 = 2;
    const MIP_SHIFT: u32 = 0;
    const REDUCTION_SHIFT: u32 = 7;
    const ANISOTROPIC_BIT: u32 = 0x40;

    /// `D3D12_ENCODE_BASIC_FILTER`.
    pub const fn basic(
        min: FilterType,
        mag: FilterType,
        mip: FilterType,
        reduction: FilterReductionType,
    ) -> Self {
        Self(
            ((min as u32 & Self::TYPE_MASK) << Self::MIN_SHIFT)
                | ((mag as u32 & Self::TYPE_MASK) << Self::MAG_SHIFT)
                | ((mip as u32 & Self::TYPE_MASK) << Self::MIP_SHIFT)
                | ((reduction as u32 & Self::TYPE_MASK) << Self::REDUCTION_SHIFT),
        )
    }

    /// `D3D12_ENCODE_ANISOTROPIC_FILTER`.
    pub const fn anisotropic(reduction: FilterReductionType) -> Self {
        Self(
            Self::ANISOTROPIC_BIT
                | Self::basic(
                    FilterType::Linear,
                    FilterType::Linear,
                    FilterType::Linear,
                    reduction,
                )
                .0,
        )
    }

    /// `D3D12_FILTER_MIN_MAG_MIP_POINT`.
    pub const MIN_MAG_MIP_POINT: Self = Self(0);
    /// `D3D12_FILTER_MIN_MAG_MIP_LINEAR`.
    pub const MIN_MAG_MIP_LINEAR: Self = Self(0x15);
    /// `D3D12_FILTER_ANISOTROPIC`.
    pub const ANISOTROPIC: Self = Self(0x55);
}

/// Mirrors the subset of `DXGI_FORMAT` used by the engine.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum Format {
    #[default]
    Unknown = 0,
    R32G32B32A32Float = 2,
    R32G32B32Float = 6,
    R16G16B16A16Float = 10,
    R32G32Float = 16,
    R32G8X24Typeless = 19,
    D32FloatS8X24Uint = 20,
    R32FloatX8X24Typeless = 21,
    R10G10B10A2Unorm = 24,
    R11G11B10Float = 26,
    R8G8B8A8Unorm = 28,
    R8G8B8A8UnormSrgb = 29,
    R16G16Float = 34,
    R32Typeless = 39,
    D32Float = 40,
    R32Float = 41,
    R32Uint = 42,
    R24G8Typeless = 44,
    D24UnormS8Uint = 45,
    R24UnormX8Typeless = 46,
    R16Typeless = 53,
    R16Float = 54,
    D16Unorm = 55,
    R16Unorm = 56,
    R16Uint = 57,
    R8Unorm = 61,
    B8G8R8A8Unorm = 87,
    B8G8R8A8UnormSrgb = 91,
}

/// Mirrors `D3D12_DESCRIPTOR_HEAP_TYPE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum DescriptorHeapType {
    CbvSrvUav = 0,
    Sampler = 1,
    Rtv = 2,
    Dsv = 3,
}

impl DescriptorHeapType {
    /// Number of descriptor heap types.
    pub const COUNT: usize = 4;

    /// All heap types, in numeric order.
    pub const ALL: [Self; 4] = [Self::CbvSrvUav, Self::Sampler, Self::Rtv, Self::Dsv];

    /// Returns `true` for the heap types that may be shader visible.
    pub const fn is_shader_visible_capable(&self) -> bool {
        matches!(self, Self::CbvSrvUav | Self::Sampler)
    }
}

/// Mirrors `D3D12_COMMAND_LIST_TYPE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum CommandListType {
    Direct = 0,
    Bundle = 1,
    Compute = 2,
    Copy = 3,
}

/// Mirrors `D3D12_HEAP_TYPE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum HeapType {
    Default = 1,
    Upload = 2,
    Readback = 3,
}

/// Mirrors `D3D12_RESOURCE_DIMENSION`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ResourceDimension {
    Unknown = 0,
    Buffer = 1,
    Texture1D = 2,
    Texture2D = 3,
    Texture3D = 4,
}

/// Mirrors `D3D12_TEXTURE_LAYOUT`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum TextureLayout {
    Unknown = 0,
    RowMajor = 1,
}

umbra_bitflags! {
    /// Mirrors `D3D12_RESOURCE_FLAGS`.
    pub struct ResourceFlags: u32 {
        /// No flags.
        const NONE = 0;
        /// The resource may be bound as a render target.
        const ALLOW_RENDER_TARGET = 0x1;
        /// The resource may be bound as a depth-stencil target.
        const ALLOW_DEPTH_STENCIL = 0x2;
        /// The resource may be bound for unordered access.
        const ALLOW_UNORDERED_ACCESS = 0x4;
        /// The resource may not be read by shaders.
        const DENY_SHADER_RESOURCE = 0x8;
    }
}

umbra_bitflags! {
    /// Mirrors `D3D12_CLEAR_FLAGS`.
    pub struct ClearFlags: u32 {
        /// Clear the depth plane.
        const DEPTH = 0x1;
        /// Clear the stencil plane.
        const STENCIL = 0x2;
    }
}

/// Mirrors `D3D12_INPUT_CLASSIFICATION`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum InputClassification {
    PerVertexData = 0,
    PerInstanceData = 1,
}

/// Mirrors `D3D12_QUERY_HEAP_TYPE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum QueryHeapType {
    Occlusion = 0,
    Timestamp = 1,
}

/// Mirrors `D3D12_QUERY_TYPE`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum QueryType {
    Occlusion = 0,
    BinaryOcclusion = 1,
    Timestamp = 2,
}

/// Mirrors `D3D12_INDIRECT_ARGUMENT_TYPE` (the argument kinds the engine issues).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum IndirectArgumentType {
    Draw = 0,
    DrawIndexed = 1,
    Dispatch = 2,
}

impl IndirectArgumentType {
    /// Size in bytes of one argument structure of this kind.
    pub const fn byte_size(&self) -> u32 {
        match self {
            Self::Draw => 16,
            Self::DrawIndexed => 20,
            Self::Dispatch => 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_encoding_matches_native_constants() {
        let linear = Filter::basic(
            FilterType::Linear,
            FilterType::Linear,
            FilterType::Linear,
            FilterReductionType::Standard,
        );
        assert_eq!(linear, Filter::MIN_MAG_MIP_LINEAR);
        assert_eq!(Filter::anisotropic(FilterReductionType::Standard), Filter::ANISOTROPIC);

        // D3D12_FILTER_COMPARISON_MIN_MAG_LINEAR_MIP_POINT
        let comparison = Filter::basic(
            FilterType::Linear,
            FilterType::Linear,
            FilterType::Point,
            FilterReductionType::Comparison,
        );
        assert_eq!(comparison.0, 0x94);
        // D3D12_FILTER_MAXIMUM_ANISOTROPIC
        assert_eq!(Filter::anisotropic(FilterReductionType::Maximum).0, 0x1d5);
    }

    #[test]
    fn test_resource_state_aliases() {
        assert_eq!(ResourceStates::GENERIC_READ.bits(), 0xac3);
        assert_eq!(ResourceStates::PRESENT.bits(), 0);
        assert_eq!(ResourceStates::PREDICATION.bits(), 0x200);
    }

    #[test]
    fn test_patch_list_topology() {
        assert_eq!(PrimitiveTopology::patch_list(1).0, 33);
        assert_eq!(PrimitiveTopology::patch_list(32).0, 64);
    }

    #[test]
    fn test_descriptor_handle_offsets() {
        let cpu = CpuDescriptorHandle { ptr: 0x1000 };
        assert_eq!(cpu.offset(3, 32).ptr, 0x1000 + 96);
        let gpu = GpuDescriptorHandle { ptr: 0x2000 };
        assert_eq!(gpu.offset(2, 64).ptr, 0x2000 + 128);
    }
}
