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

//! `#[repr(C)]` mirrors of the D3D12 description structures.
//!
//! Unions of the native API (root parameters, barriers, views) are expressed
//! as Rust enums carrying the same fields; the discriminant accessors return
//! the native type tags.

use super::*;
use std::sync::Arc;

/// Mirrors `D3D12_RASTERIZER_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub struct RasterizerDesc {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub front_counter_clockwise: bool,
    pub depth_bias: i32,
    pub depth_bias_clamp: f32,
    pub slope_scaled_depth_bias: f32,
    pub depth_clip_enable: bool,
    pub multisample_enable: bool,
    pub antialiased_line_enable: bool,
    pub forced_sample_count: u32,
    pub conservative_raster: ConservativeRasterizationMode,
}

impl Default for RasterizerDesc {
    /// `CD3DX12_RASTERIZER_DESC(D3D12_DEFAULT)`.
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Solid,
            cull_mode: CullMode::Back,
            front_counter_clockwise: false,
            depth_bias: 0,
            depth_bias_clamp: 0.0,
            slope_scaled_depth_bias: 0.0,
            depth_clip_enable: true,
            multisample_enable: false,
            antialiased_line_enable: false,
            forced_sample_count: 0,
            conservative_raster: ConservativeRasterizationMode::Off,
        }
    }
}

/// Mirrors `D3D12_DEPTH_STENCILOP_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct DepthStencilOpDesc {
    pub stencil_fail_op: StencilOp,
    pub stencil_depth_fail_op: StencilOp,
    pub stencil_pass_op: StencilOp,
    pub stencil_func: ComparisonFunc,
}

impl Default for DepthStencilOpDesc {
    fn default() -> Self {
        Self {
            stencil_fail_op: StencilOp::Keep,
            stencil_depth_fail_op: StencilOp::Keep,
            stencil_pass_op: StencilOp::Keep,
            stencil_func: ComparisonFunc::Always,
        }
    }
}

/// Mirrors `D3D12_DEPTH_STENCIL_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct DepthStencilDesc {
    pub depth_enable: bool,
    pub depth_write_mask: DepthWriteMask,
    pub depth_func: ComparisonFunc,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub front_face: DepthStencilOpDesc,
    pub back_face: DepthStencilOpDesc,
}

impl Default for DepthStencilDesc {
    fn default() -> Self {
        Self {
            depth_enable: true,
            depth_write_mask: DepthWriteMask::All,
            depth_func: ComparisonFunc::Less,
            stencil_enable: false,
            stencil_read_mask: DEFAULT_STENCIL_READ_MASK,
            stencil_write_mask: DEFAULT_STENCIL_WRITE_MASK,
            front_face: DepthStencilOpDesc::default(),
            back_face: DepthStencilOpDesc::default(),
        }
    }
}

/// Mirrors `D3D12_RENDER_TARGET_BLEND_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct RenderTargetBlendDesc {
    pub blend_enable: bool,
    pub logic_op_enable: bool,
    pub src_blend: Blend,
    pub dest_blend: Blend,
    pub blend_op: BlendOp,
    pub src_blend_alpha: Blend,
    pub dest_blend_alpha: Blend,
    pub blend_op_alpha: BlendOp,
    pub logic_op: LogicOp,
    pub render_target_write_mask: u8,
}

impl Default for RenderTargetBlendDesc {
    fn default() -> Self {
        Self {
            blend_enable: false,
            logic_op_enable: false,
            src_blend: Blend::One,
            dest_blend: Blend::Zero,
            blend_op: BlendOp::Add,
            src_blend_alpha: Blend::One,
            dest_blend_alpha: Blend::Zero,
            blend_op_alpha: BlendOp::Add,
            logic_op: LogicOp::Noop,
            render_target_write_mask: ColorWriteEnable::ALL.bits(),
        }
    }
}

/// Mirrors `D3D12_BLEND_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct BlendDesc {
    pub alpha_to_coverage_enable: bool,
    pub independent_blend_enable: bool,
    pub render_target: [RenderTargetBlendDesc; SIMULTANEOUS_RENDER_TARGET_COUNT],
}

/// Mirrors `D3D12_DESCRIPTOR_RANGE`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct DescriptorRange {
    pub range_type: DescriptorRangeType,
    pub num_descriptors: u32,
    pub base_shader_register: u32,
    pub register_space: u32,
    pub offset_in_descriptors_from_table_start: u32,
}

/// Mirrors `D3D12_ROOT_PARAMETER`; the native union becomes enum variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RootParameter {
    /// `D3D12_ROOT_PARAMETER_TYPE_DESCRIPTOR_TABLE`.
    DescriptorTable {
        /// The ranges of the table.
        ranges: Vec<DescriptorRange>,
        /// Stages that can see the parameter.
        visibility: ShaderVisibility,
    },
    /// `D3D12_ROOT_PARAMETER_TYPE_32BIT_CONSTANTS`.
    Constants {
        /// Register of the constants.
        shader_register: u32,
        /// Register space.
        register_space: u32,
        /// Number of 32-bit values.
        num_32bit_values: u32,
        /// Stages that can see the parameter.
        visibility: ShaderVisibility,
    },
    /// `D3D12_ROOT_PARAMETER_TYPE_CBV`, `_SRV` or `_UAV`.
    Descriptor {
        /// One of `Cbv`, `Srv`, `Uav`.
        parameter_type: RootParameterType,
        /// Register of the descriptor.
        shader_register: u32,
        /// Register space.
        register_space: u32,
        /// Stages that can see the parameter.
        visibility: ShaderVisibility,
    },
}

impl RootParameter {
    /// The native `ParameterType` tag.
    pub fn parameter_type(&self) -> RootParameterType {
        match self {
            Self::DescriptorTable { .. } => RootParameterType::DescriptorTable,
            Self::Constants { .. } => RootParameterType::Constants32Bit,
            Self::Descriptor { parameter_type, .. } => *parameter_type,
        }
    }

    /// The native `ShaderVisibility` of the parameter.
    pub fn visibility(&self) -> ShaderVisibility {
        match self {
            Self::DescriptorTable { visibility, .. }
            | Self::Constants { visibility, .. }
            | Self::Descriptor { visibility, .. } => *visibility,
        }
    }
}

/// Mirrors `D3D12_STATIC_SAMPLER_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub struct StaticSamplerDesc {
    pub filter: Filter,
    pub address_u: TextureAddressMode,
    pub address_v: TextureAddressMode,
    pub address_w: TextureAddressMode,
    pub mip_lod_bias: f32,
    pub max_anisotropy: u32,
    pub comparison_func: ComparisonFunc,
    pub border_color: StaticBorderColor,
    pub min_lod: f32,
    pub max_lod: f32,
    pub shader_register: u32,
    pub register_space: u32,
    pub shader_visibility: ShaderVisibility,
}

/// Mirrors `D3D12_SAMPLER_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
#[allow(missing_docs)]
pub struct SamplerDesc {
    pub filter: Filter,
    pub address_u: TextureAddressMode,
    pub address_v: TextureAddressMode,
    pub address_w: TextureAddressMode,
    pub mip_lod_bias: f32,
    pub max_anisotropy: u32,
    pub comparison_func: ComparisonFunc,
    pub border_color: [f32; 4],
    pub min_lod: f32,
    pub max_lod: f32,
}

/// Mirrors `D3D12_ROOT_SIGNATURE_DESC`.
#[derive(Debug, Clone, PartialEq, Default)]
#[allow(missing_docs)]
pub struct RootSignatureDesc {
    pub parameters: Vec<RootParameter>,
    pub static_samplers: Vec<StaticSamplerDesc>,
    pub flags: RootSignatureFlags,
}

/// Mirrors `D3D12_INPUT_ELEMENT_DESC`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct InputElementDesc {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub format: Format,
    pub input_slot: u32,
    pub aligned_byte_offset: u32,
    pub input_slot_class: InputClassification,
    pub instance_data_step_rate: u32,
}

impl InputElementDesc {
    /// A per-vertex element read from `input_slot` at `aligned_byte_offset`.
    pub fn per_vertex(
        semantic_name: &str,
        semantic_index: u32,
        format: Format,
        input_slot: u32,
        aligned_byte_offset: u32,
    ) -> Self {
        Self {
            semantic_name: semantic_name.to_string(),
            semantic_index,
            format,
            input_slot,
            aligned_byte_offset,
            input_slot_class: InputClassification::PerVertexData,
            instance_data_step_rate: 0,
        }
    }
}

/// Mirrors `DXGI_SAMPLE_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub struct SampleDesc {
    pub count: u32,
    pub quality: u32,
}

impl Default for SampleDesc {
    fn default() -> Self {
        Self {
            count: 1,
            quality: 0,
        }
    }
}

/// Shader bytecode shared between the engine and native pipeline descriptions.
pub type ShaderBytecode = Arc<[u8]>;

/// Mirrors `D3D12_GRAPHICS_PIPELINE_STATE_DESC`.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct GraphicsPipelineDesc {
    pub root_signature: NativeHandle,
    pub vs: Option<ShaderBytecode>,
    pub ps: Option<ShaderBytecode>,
    pub ds: Option<ShaderBytecode>,
    pub hs: Option<ShaderBytecode>,
    pub gs: Option<ShaderBytecode>,
    pub blend_state: BlendDesc,
    pub sample_mask: u32,
    pub rasterizer_state: RasterizerDesc,
    pub depth_stencil_state: DepthStencilDesc,
    pub input_layout: Vec<InputElementDesc>,
    pub ib_strip_cut_value: IndexBufferStripCutValue,
    pub primitive_topology_type: PrimitiveTopologyType,
    pub num_render_targets: u32,
    pub rtv_formats: [Format; SIMULTANEOUS_RENDER_TARGET_COUNT],
    pub dsv_format: Format,
    pub sample_desc: SampleDesc,
    pub node_mask: u32,
}

/// Mirrors `D3D12_COMPUTE_PIPELINE_STATE_DESC`.
#[derive(Debug, Clone, PartialEq)]
#[allow(missing_docs)]
pub struct ComputePipelineDesc {
    pub root_signature: NativeHandle,
    pub cs: ShaderBytecode,
    pub node_mask: u32,
}

/// Mirrors `D3D12_RESOURCE_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct ResourceDesc {
    pub dimension: ResourceDimension,
    pub alignment: u64,
    pub width: u64,
    pub height: u32,
    pub depth_or_array_size: u16,
    pub mip_levels: u16,
    pub format: Format,
    pub sample_desc: SampleDesc,
    pub layout: TextureLayout,
    pub flags: ResourceFlags,
}

impl ResourceDesc {
    /// `CD3DX12_RESOURCE_DESC::Buffer`.
    pub fn buffer(width: u64, flags: ResourceFlags) -> Self {
        Self {
            dimension: ResourceDimension::Buffer,
            alignment: 0,
            width,
            height: 1,
            depth_or_array_size: 1,
            mip_levels: 1,
            format: Format::Unknown,
            sample_desc: SampleDesc::default(),
            layout: TextureLayout::RowMajor,
            flags,
        }
    }

    /// `CD3DX12_RESOURCE_DESC::Tex2D`.
    pub fn texture_2d(
        format: Format,
        width: u64,
        height: u32,
        array_size: u16,
        mip_levels: u16,
        sample_desc: SampleDesc,
        flags: ResourceFlags,
    ) -> Self {
        Self {
            dimension: ResourceDimension::Texture2D,
            alignment: 0,
            width,
            height,
            depth_or_array_size: array_size,
            mip_levels,
            format,
            sample_desc,
            layout: TextureLayout::Unknown,
            flags,
        }
    }

    /// Subresource index of (`mip`, `array_slice`), as `D3D12CalcSubresource`.
    pub fn subresource(&self, mip: u32, array_slice: u32) -> u32 {
        mip + array_slice * self.mip_levels as u32
    }
}

/// Mirrors `D3D12_CLEAR_VALUE`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    /// Optimized color clear.
    Color {
        /// Format of the view the clear applies to.
        format: Format,
        /// RGBA clear color.
        color: [f32; 4],
    },
    /// Optimized depth/stencil clear.
    DepthStencil {
        /// Format of the view the clear applies to.
        format: Format,
        /// Depth clear value.
        depth: f32,
        /// Stencil clear value.
        stencil: u8,
    },
}

/// A committed resource returned by the native device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommittedResource {
    /// Handle of the resource.
    pub handle: NativeHandle,
    /// GPU virtual address (buffers only, zero otherwise).
    pub gpu_address: GpuVirtualAddress,
}

/// Mirrors `D3D12_RESOURCE_BARRIER`; the native union becomes enum variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceBarrierDesc {
    /// `D3D12_RESOURCE_TRANSITION_BARRIER`.
    Transition {
        /// The transitioned resource.
        resource: NativeHandle,
        /// Subresource index or [`RESOURCE_BARRIER_ALL_SUBRESOURCES`].
        subresource: u32,
        /// State before the barrier.
        state_before: ResourceStates,
        /// State after the barrier.
        state_after: ResourceStates,
    },
    /// `D3D12_RESOURCE_ALIASING_BARRIER`.
    Aliasing {
        /// The resource leaving the shared memory, if any.
        before: Option<NativeHandle>,
        /// The resource entering the shared memory, if any.
        after: Option<NativeHandle>,
    },
    /// `D3D12_RESOURCE_UAV_BARRIER`.
    Uav {
        /// The resource, or every UAV access when `None`.
        resource: Option<NativeHandle>,
    },
}

impl ResourceBarrierDesc {
    /// The native `Type` tag.
    pub fn barrier_type(&self) -> ResourceBarrierType {
        match self {
            Self::Transition { .. } => ResourceBarrierType::Transition,
            Self::Aliasing { .. } => ResourceBarrierType::Aliasing,
            Self::Uav { .. } => ResourceBarrierType::Uav,
        }
    }
}

/// Mirrors `D3D12_DESCRIPTOR_HEAP_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct DescriptorHeapDesc {
    pub heap_type: DescriptorHeapType,
    pub num_descriptors: u32,
    pub shader_visible: bool,
    pub node_mask: u32,
}

/// A descriptor heap returned by the native device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorHeapInfo {
    /// Handle of the heap.
    pub handle: NativeHandle,
    /// CPU handle of the first descriptor.
    pub cpu_start: CpuDescriptorHandle,
    /// GPU handle of the first descriptor (shader-visible heaps only).
    pub gpu_start: GpuDescriptorHandle,
}

/// Shader resource view dimensions used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SrvDimension {
    Buffer {
        first_element: u64,
        num_elements: u32,
        structure_byte_stride: u32,
        raw: bool,
    },
    Texture2D {
        most_detailed_mip: u32,
        mip_levels: u32,
    },
    Texture2DArray {
        most_detailed_mip: u32,
        mip_levels: u32,
        first_array_slice: u32,
        array_size: u32,
    },
    Texture2DMs,
    Texture2DMsArray {
        first_array_slice: u32,
        array_size: u32,
    },
}

/// Unordered access view dimensions used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum UavDimension {
    Buffer {
        first_element: u64,
        num_elements: u32,
        structure_byte_stride: u32,
        raw: bool,
    },
    Texture2D {
        mip_slice: u32,
    },
    Texture2DArray {
        mip_slice: u32,
        first_array_slice: u32,
        array_size: u32,
    },
}

/// The view descriptions accepted by `ID3D12Device::Create*View`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ViewDesc {
    /// `D3D12_CONSTANT_BUFFER_VIEW_DESC`.
    ConstantBuffer {
        /// GPU address of the constants.
        buffer_location: GpuVirtualAddress,
        /// Size, a multiple of 256.
        size_in_bytes: u32,
    },
    /// `D3D12_SHADER_RESOURCE_VIEW_DESC`.
    ShaderResource {
        /// The viewed resource.
        resource: NativeHandle,
        /// View format.
        format: Format,
        /// View dimension.
        dimension: SrvDimension,
    },
    /// `D3D12_UNORDERED_ACCESS_VIEW_DESC`.
    UnorderedAccess {
        /// The viewed resource.
        resource: NativeHandle,
        /// View format.
        format: Format,
        /// View dimension.
        dimension: UavDimension,
    },
    /// `D3D12_RENDER_TARGET_VIEW_DESC` (2D, single slice or array).
    RenderTarget {
        /// The viewed resource.
        resource: NativeHandle,
        /// View format.
        format: Format,
        /// Mip level.
        mip_slice: u32,
        /// Whether the resource is multisampled.
        multisampled: bool,
    },
    /// `D3D12_DEPTH_STENCIL_VIEW_DESC` (2D).
    DepthStencil {
        /// The viewed resource.
        resource: NativeHandle,
        /// View format.
        format: Format,
        /// Mip level.
        mip_slice: u32,
        /// Whether the resource is multisampled.
        multisampled: bool,
    },
    /// `D3D12_SAMPLER_DESC`.
    Sampler(SamplerDesc),
}

impl ViewDesc {
    /// The descriptor heap type the view must be written into.
    pub fn heap_type(&self) -> DescriptorHeapType {
        match self {
            Self::ConstantBuffer { .. }
            | Self::ShaderResource { .. }
            | Self::UnorderedAccess { .. } => DescriptorHeapType::CbvSrvUav,
            Self::RenderTarget { .. } => DescriptorHeapType::Rtv,
            Self::DepthStencil { .. } => DescriptorHeapType::Dsv,
            Self::Sampler(_) => DescriptorHeapType::Sampler,
        }
    }
}

/// Mirrors `D3D12_VERTEX_BUFFER_VIEW`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct VertexBufferView {
    pub buffer_location: GpuVirtualAddress,
    pub size_in_bytes: u32,
    pub stride_in_bytes: u32,
}

/// Mirrors `D3D12_INDEX_BUFFER_VIEW`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct IndexBufferView {
    pub buffer_location: GpuVirtualAddress,
    pub size_in_bytes: u32,
    pub format: Format,
}

/// Mirrors `D3D12_VIEWPORT`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[allow(missing_docs)]
pub struct Viewport {
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

/// Mirrors `D3D12_RECT`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(missing_docs)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Mirrors `D3D12_PLACED_SUBRESOURCE_FOOTPRINT`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct PlacedSubresourceFootprint {
    pub offset: u64,
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub row_pitch: u32,
}

/// Mirrors `D3D12_COMMAND_SIGNATURE_DESC`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct CommandSignatureDesc {
    pub byte_stride: u32,
    pub arguments: Vec<IndirectArgumentType>,
    pub node_mask: u32,
}

/// Mirrors `D3D12_QUERY_HEAP_DESC`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct QueryHeapDesc {
    pub heap_type: QueryHeapType,
    pub count: u32,
    pub node_mask: u32,
}
