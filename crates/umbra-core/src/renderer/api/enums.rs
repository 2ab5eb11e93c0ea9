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

//! Engine-level enumerations and their translation to native values.

use super::native;
use crate::umbra_bitflags;

/// The two binding pipelines of a command buffer.
///
/// Graphics and compute bindings are tracked independently.
/// The two binding pipelines a command buffer tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    /// Compute dispatches.
    Compute = 0,
    /// Draw calls.
    Graphics = 1,
}

impl Pipeline {
    /// Index usable for per-pipeline arrays.
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

/// The kind of a command queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueType {
    /// Graphics, compute and copy work.
    Direct,
    /// Compute and copy work.
    Compute,
    /// Copy work only.
    Copy,
}

impl QueueType {
    /// The native command list type of the queue.
    pub fn to_native(self) -> native::CommandListType {
        match self {
            QueueType::Direct => native::CommandListType::Direct,
            QueueType::Compute => native::CommandListType::Compute,
            QueueType::Copy => native::CommandListType::Copy,
        }
    }

    /// Returns `true` if draw calls may be recorded.
    pub fn supports_graphics(&self) -> bool {
        matches!(self, QueueType::Direct)
    }

    /// Returns `true` if dispatches may be recorded.
    pub fn supports_compute(&self) -> bool {
        !matches!(self, QueueType::Copy)
    }
}

umbra_bitflags! {
    /// A set of shader stages.
    pub struct ShaderType: u32 {
        /// No stage.
        const UNKNOWN = 0;
        /// Vertex stage.
        const VERTEX = 1 << 0;
        /// Tessellation control (hull) stage.
        const TESSELLATION_CONTROL = 1 << 1;
        /// Tessellation evaluation (domain) stage.
        const TESSELLATION_EVALUATION = 1 << 2;
        /// Geometry stage.
        const GEOMETRY = 1 << 3;
        /// Pixel stage.
        const PIXEL = 1 << 4;
        /// Every graphics stage.
        const ALL_GRAPHICS = (1 << 0) | (1 << 1) | (1 << 2) | (1 << 3) | (1 << 4);
        /// Compute stage.
        const COMPUTE = 1 << 5;
        /// Every stage.
        const ALL = (1 << 0) | (1 << 1) | (1 << 2) | (1 << 3) | (1 << 4) | (1 << 5);
    }
}

impl ShaderType {
    /// The individual graphics stages, in pipeline order.
    pub const GRAPHICS_STAGES: [ShaderType; 5] = [
        ShaderType::VERTEX,
        ShaderType::TESSELLATION_CONTROL,
        ShaderType::TESSELLATION_EVALUATION,
        ShaderType::GEOMETRY,
        ShaderType::PIXEL,
    ];

    /// Returns `true` if exactly one stage is set.
    pub const fn is_single_stage(&self) -> bool {
        self.bits != 0 && (self.bits & (self.bits - 1)) == 0
    }

    /// Translates a stage set to a native root-parameter visibility.
    ///
    /// A single graphics stage maps to that stage, anything else is visible
    /// to every stage.
    pub fn to_native_visibility(self) -> native::ShaderVisibility {
        match self {
            s if s == ShaderType::VERTEX => native::ShaderVisibility::Vertex,
            s if s == ShaderType::TESSELLATION_CONTROL => native::ShaderVisibility::Hull,
            s if s == ShaderType::TESSELLATION_EVALUATION => native::ShaderVisibility::Domain,
            s if s == ShaderType::GEOMETRY => native::ShaderVisibility::Geometry,
            s if s == ShaderType::PIXEL => native::ShaderVisibility::Pixel,
            _ => native::ShaderVisibility::All,
        }
    }
}

/// The kind of a shader signature parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// A descriptor table of nested ranges.
    Table,
    /// Inline 32-bit constants.
    Constants,
    /// A constant buffer.
    ConstantBuffer,
    /// A read-only buffer (structured or byte-address).
    Buffer,
    /// A read/write buffer.
    RWBuffer,
    /// A read-only texture.
    Texture,
    /// A read/write texture.
    RWTexture,
    /// A dynamically bound sampler.
    Sampler,
}

/// The argument kinds of an indirect command signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndirectArgumentType {
    /// Non-indexed draw arguments.
    Draw,
    /// Indexed draw arguments.
    DrawIndexed,
    /// Dispatch arguments.
    Dispatch,
}

impl IndirectArgumentType {
    /// The native argument type.
    pub fn to_native(self) -> native::IndirectArgumentType {
        match self {
            IndirectArgumentType::Draw => native::IndirectArgumentType::Draw,
            IndirectArgumentType::DrawIndexed => native::IndirectArgumentType::DrawIndexed,
            IndirectArgumentType::Dispatch => native::IndirectArgumentType::Dispatch,
        }
    }
}

umbra_bitflags! {
    /// The GPU-visible usage state of a resource.
    pub struct ResourceState: u32 {
        /// Default state, required for cross-queue sharing.
        const COMMON = 0;
        /// Read as a vertex buffer.
        const VERTEX_BUFFER = 1 << 0;
        /// Read as a constant buffer.
        const CONSTANT_BUFFER = 1 << 2;
        /// Read as an index buffer.
        const INDEX_BUFFER = 1 << 3;
        /// Written as a render target.
        const RENDER_TARGET = 1 << 4;
        /// Unordered access.
        const UAV = 1 << 5;
        /// Depth writes.
        const DEPTH_WRITE = 1 << 6;
        /// Depth reads.
        const DEPTH_READ = 1 << 7;
        /// Shader reads outside the pixel stage.
        const NON_PIXEL_SHADER = 1 << 8;
        /// Shader reads in the pixel stage.
        const PIXEL_SHADER = 1 << 9;
        /// Stream output.
        const STREAM_OUT = 1 << 10;
        /// Indirect arguments.
        const INDIRECT_ARGUMENT = 1 << 11;
        /// Copy destination.
        const COPY_DEST = 1 << 12;
        /// Copy source.
        const COPY_SRC = 1 << 13;
        /// Resolve destination.
        const RESOLVE_DEST = 1 << 14;
        /// Resolve source.
        const RESOLVE_SRC = 1 << 15;
        /// Every read-only state.
        const GENERIC_READ = (1 << 0) | (1 << 2) | (1 << 3) | (1 << 8) | (1 << 9) | (1 << 11) | (1 << 13);
        /// Presented by the swapchain.
        const PRESENT = 1 << 16;
        /// Used for predication.
        const PREDICATION = 1 << 17;
    }
}

impl ResourceState {
    const NATIVE_BITS: [(ResourceState, native::ResourceStates); 16] = [
        (ResourceState::VERTEX_BUFFER, native::ResourceStates::VERTEX_AND_CONSTANT_BUFFER),
        (ResourceState::CONSTANT_BUFFER, native::ResourceStates::VERTEX_AND_CONSTANT_BUFFER),
        (ResourceState::INDEX_BUFFER, native::ResourceStates::INDEX_BUFFER),
        (ResourceState::RENDER_TARGET, native::ResourceStates::RENDER_TARGET),
        (ResourceState::UAV, native::ResourceStates::UNORDERED_ACCESS),
        (ResourceState::DEPTH_WRITE, native::ResourceStates::DEPTH_WRITE),
        (ResourceState::DEPTH_READ, native::ResourceStates::DEPTH_READ),
        (ResourceState::NON_PIXEL_SHADER, native::ResourceStates::NON_PIXEL_SHADER_RESOURCE),
        (ResourceState::PIXEL_SHADER, native::ResourceStates::PIXEL_SHADER_RESOURCE),
        (ResourceState::STREAM_OUT, native::ResourceStates::STREAM_OUT),
        (ResourceState::INDIRECT_ARGUMENT, native::ResourceStates::INDIRECT_ARGUMENT),
        (ResourceState::COPY_DEST, native::ResourceStates::COPY_DEST),
        (ResourceState::COPY_SRC, native::ResourceStates::COPY_SOURCE),
        (ResourceState::RESOLVE_DEST, native::ResourceStates::RESOLVE_DEST),
        (ResourceState::RESOLVE_SRC, native::ResourceStates::RESOLVE_SOURCE),
        (ResourceState::PREDICATION, native::ResourceStates::PREDICATION),
    ];

    /// Translates the state set to `D3D12_RESOURCE_STATES`.
    ///
    /// `COMMON` and `PRESENT` both translate to zero.
    pub fn to_native(self) -> native::ResourceStates {
        Self::NATIVE_BITS
            .iter()
            .filter(|(engine, _)| self.contains(*engine))
            .fold(native::ResourceStates::COMMON, |acc, (_, native)| {
                acc.union(*native)
            })
    }

    /// Returns `true` if the state set contains a write state.
    pub fn is_write(&self) -> bool {
        self.intersects(
            ResourceState::RENDER_TARGET
                .union(ResourceState::UAV)
                .union(ResourceState::DEPTH_WRITE)
                .union(ResourceState::STREAM_OUT)
                .union(ResourceState::COPY_DEST)
                .union(ResourceState::RESOLVE_DEST),
        )
    }
}

umbra_bitflags! {
    /// Planes cleared by a render target clear.
    pub struct ClearFlags: u8 {
        /// Color attachments.
        const COLOR = 1 << 0;
        /// Depth plane.
        const DEPTH = 1 << 1;
        /// Stencil plane.
        const STENCIL = 1 << 2;
        /// Depth and stencil planes.
        const DEPTH_STENCIL = (1 << 1) | (1 << 2);
        /// Every plane.
        const ALL = (1 << 0) | (1 << 1) | (1 << 2);
    }
}

impl ClearFlags {
    /// The native depth/stencil clear flags of the set.
    pub fn to_native(self) -> native::ClearFlags {
        let mut flags = native::ClearFlags::EMPTY;
        if self.contains(ClearFlags::DEPTH) {
            flags.insert(native::ClearFlags::DEPTH);
        }
        if self.contains(ClearFlags::STENCIL) {
            flags.insert(native::ClearFlags::STENCIL);
        }
        flags
    }
}

/// Comparison used by depth, stencil and sampler tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CompareFunction {
    /// Never pass.
    Never,
    /// Pass if the source value is less than the destination.
    Less,
    /// Pass if the values are equal.
    Equal,
    /// Pass if the source value is less than or equal to the destination.
    LessOrEqual,
    /// Pass if the source value is greater than the destination.
    Greater,
    /// Pass if the values differ.
    NotEqual,
    /// Pass if the source value is greater than or equal to the destination.
    GreaterOrEqual,
    /// Always pass.
    Always,
}

impl CompareFunction {
    /// Translates to `D3D12_COMPARISON_FUNC`.
    pub fn to_native(self) -> native::ComparisonFunc {
        match self {
            CompareFunction::Never => native::ComparisonFunc::Never,
            CompareFunction::Less => native::ComparisonFunc::Less,
            CompareFunction::Equal => native::ComparisonFunc::Equal,
            CompareFunction::LessOrEqual => native::ComparisonFunc::LessEqual,
            CompareFunction::Greater => native::ComparisonFunc::Greater,
            CompareFunction::NotEqual => native::ComparisonFunc::NotEqual,
            CompareFunction::GreaterOrEqual => native::ComparisonFunc::GreaterEqual,
            CompareFunction::Always => native::ComparisonFunc::Always,
        }
    }
}

/// Operation applied to the stencil buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    /// Keep the stored value.
    Keep,
    /// Write zero.
    Zero,
    /// Write the stencil reference value.
    Reference,
    /// Increment and clamp.
    IncrementClamp,
    /// Decrement and clamp.
    DecrementClamp,
    /// Invert the bits.
    Invert,
    /// Increment and wrap.
    IncrementWrap,
    /// Decrement and wrap.
    DecrementWrap,
}

impl StencilOperation {
    /// Translates to `D3D12_STENCIL_OP`.
    pub fn to_native(self) -> native::StencilOp {
        match self {
            StencilOperation::Keep => native::StencilOp::Keep,
            StencilOperation::Zero => native::StencilOp::Zero,
            StencilOperation::Reference => native::StencilOp::Replace,
            StencilOperation::IncrementClamp => native::StencilOp::IncrSat,
            StencilOperation::DecrementClamp => native::StencilOp::DecrSat,
            StencilOperation::Invert => native::StencilOp::Invert,
            StencilOperation::IncrementWrap => native::StencilOp::Incr,
            StencilOperation::DecrementWrap => native::StencilOp::Decr,
        }
    }
}

/// Texel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Filter {
    /// The nearest texel.
    Nearest,
    /// Linear average of the closest texels.
    Linear,
}

impl Filter {
    /// Translates to `D3D12_FILTER_TYPE`.
    pub fn to_native(self) -> native::FilterType {
        match self {
            Filter::Nearest => native::FilterType::Point,
            Filter::Linear => native::FilterType::Linear,
        }
    }
}

/// Texture addressing outside the [0, 1] range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum WrapMode {
    /// Repeat the texture.
    Repeat,
    /// Mirror the texture.
    Mirror,
    /// Clamp to the edge.
    Clamp,
    /// Use the border color.
    Border,
    /// Mirror once, then clamp.
    MirrorOnce,
}

impl WrapMode {
    /// Translates to `D3D12_TEXTURE_ADDRESS_MODE`.
    pub fn to_native(self) -> native::TextureAddressMode {
        match self {
            WrapMode::Repeat => native::TextureAddressMode::Wrap,
            WrapMode::Mirror => native::TextureAddressMode::Mirror,
            WrapMode::Clamp => native::TextureAddressMode::Clamp,
            WrapMode::Border => native::TextureAddressMode::Border,
            WrapMode::MirrorOnce => native::TextureAddressMode::MirrorOnce,
        }
    }
}

/// Sampler reduction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum CompareMode {
    /// Plain filtering.
    None,
    /// Compare the reference value to the texel.
    CompareRefToTexture,
    /// Minimum of the fetched texels.
    Minimum,
    /// Maximum of the fetched texels.
    Maximum,
}

impl CompareMode {
    /// Translates to `D3D12_FILTER_REDUCTION_TYPE`.
    pub fn to_native(self) -> native::FilterReductionType {
        match self {
            CompareMode::None => native::FilterReductionType::Standard,
            CompareMode::CompareRefToTexture => native::FilterReductionType::Comparison,
            CompareMode::Minimum => native::FilterReductionType::Minimum,
            CompareMode::Maximum => native::FilterReductionType::Maximum,
        }
    }
}

/// Polygon fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    /// Draw edges only.
    Wireframe,
    /// Fill polygons.
    Solid,
}

impl FillMode {
    /// Translates to `D3D12_FILL_MODE`.
    pub fn to_native(self) -> native::FillMode {
        match self {
            FillMode::Wireframe => native::FillMode::Wireframe,
            FillMode::Solid => native::FillMode::Solid,
        }
    }
}

/// Faces discarded by the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    /// Draw every face.
    None,
    /// Cull front faces.
    Front,
    /// Cull back faces.
    Back,
    /// Cull every face.
    FrontAndBack,
}

impl CullMode {
    /// Translates to `D3D12_CULL_MODE`.
    ///
    /// `FrontAndBack` has no native equivalent and falls back to `Back`.
    pub fn to_native(self) -> native::CullMode {
        match self {
            CullMode::None => native::CullMode::None,
            CullMode::Front => native::CullMode::Front,
            CullMode::Back => native::CullMode::Back,
            CullMode::FrontAndBack => {
                log::warn!("CullMode::FrontAndBack is not supported natively, culling back faces");
                native::CullMode::Back
            }
        }
    }
}

/// Winding order of front faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    /// Clockwise triangles face the viewer.
    Clockwise,
    /// Counter-clockwise triangles face the viewer.
    CounterClockwise,
}

/// Input assembler topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    TriangleList,
    TriangleStrip,
    LineListAdj,
    LineStripAdj,
    TriangleListAdj,
    TriangleStripAdj,
    /// Tessellation patches; the control point count is a pipeline setting.
    PatchList,
}

impl PrimitiveTopology {
    /// Translates to `D3D12_PRIMITIVE_TOPOLOGY_TYPE`.
    pub fn to_native_type(self) -> native::PrimitiveTopologyType {
        match self {
            PrimitiveTopology::PointList => native::PrimitiveTopologyType::Point,
            PrimitiveTopology::LineList
            | PrimitiveTopology::LineStrip
            | PrimitiveTopology::LineListAdj
            | PrimitiveTopology::LineStripAdj => native::PrimitiveTopologyType::Line,
            PrimitiveTopology::TriangleList
            | PrimitiveTopology::TriangleStrip
            | PrimitiveTopology::TriangleListAdj
            | PrimitiveTopology::TriangleStripAdj => native::PrimitiveTopologyType::Triangle,
            PrimitiveTopology::PatchList => native::PrimitiveTopologyType::Patch,
        }
    }

    /// Translates to `D3D_PRIMITIVE_TOPOLOGY`.
    pub fn to_native(self, patch_control_points: u32) -> native::PrimitiveTopology {
        match self {
            PrimitiveTopology::PointList => native::PrimitiveTopology::POINT_LIST,
            PrimitiveTopology::LineList => native::PrimitiveTopology::LINE_LIST,
            PrimitiveTopology::LineStrip => native::PrimitiveTopology::LINE_STRIP,
            PrimitiveTopology::TriangleList => native::PrimitiveTopology::TRIANGLE_LIST,
            PrimitiveTopology::TriangleStrip => native::PrimitiveTopology::TRIANGLE_STRIP,
            PrimitiveTopology::LineListAdj => native::PrimitiveTopology::LINE_LIST_ADJ,
            PrimitiveTopology::LineStripAdj => native::PrimitiveTopology::LINE_STRIP_ADJ,
            PrimitiveTopology::TriangleListAdj => native::PrimitiveTopology::TRIANGLE_LIST_ADJ,
            PrimitiveTopology::TriangleStripAdj => native::PrimitiveTopology::TRIANGLE_STRIP_ADJ,
            PrimitiveTopology::PatchList => {
                native::PrimitiveTopology::patch_list(patch_control_points)
            }
        }
    }
}

/// Strip-cut index of strip topologies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveRestart {
    /// No restart index.
    Disabled,
    /// `0xFFFF` restarts the strip.
    Enabled16Bit,
    /// `0xFFFFFFFF` restarts the strip.
    Enabled32Bit,
}

impl PrimitiveRestart {
    /// Translates to `D3D12_INDEX_BUFFER_STRIP_CUT_VALUE`.
    pub fn to_native(self) -> native::IndexBufferStripCutValue {
        match self {
            PrimitiveRestart::Disabled => native::IndexBufferStripCutValue::Disabled,
            PrimitiveRestart::Enabled16Bit => native::IndexBufferStripCutValue::Cut0xFFFF,
            PrimitiveRestart::Enabled32Bit => native::IndexBufferStripCutValue::Cut0xFFFFFFFF,
        }
    }
}

/// The kind of a GPU query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// Elapsed GPU time between begin and end.
    Timer,
    /// Number of samples passing the depth/stencil tests.
    Occlusion,
    /// Whether any sample passed the depth/stencil tests.
    OcclusionPredicate,
}

/// Attachment slots of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum AttachmentPoint {
    Color0,
    Color1,
    Color2,
    Color3,
    Color4,
    Color5,
    Color6,
    Color7,
    Depth,
    DepthStencil,
}

impl AttachmentPoint {
    /// Number of attachment points.
    pub const COUNT: usize = 10;

    /// Every attachment point, in slot order.
    pub const ALL: [AttachmentPoint; 10] = [
        AttachmentPoint::Color0,
        AttachmentPoint::Color1,
        AttachmentPoint::Color2,
        AttachmentPoint::Color3,
        AttachmentPoint::Color4,
        AttachmentPoint::Color5,
        AttachmentPoint::Color6,
        AttachmentPoint::Color7,
        AttachmentPoint::Depth,
        AttachmentPoint::DepthStencil,
    ];

    /// Slot index of the attachment point.
    pub const fn index(&self) -> usize {
        *self as usize
    }

    /// The color slot index, or `None` for depth attachments.
    pub const fn color_index(&self) -> Option<usize> {
        match self {
            AttachmentPoint::Depth | AttachmentPoint::DepthStencil => None,
            _ => Some(*self as usize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_state_translation() {
        assert_eq!(ResourceState::COMMON.to_native(), native::ResourceStates::COMMON);
        assert_eq!(ResourceState::PRESENT.to_native(), native::ResourceStates::PRESENT);
        assert_eq!(
            ResourceState::GENERIC_READ.to_native(),
            native::ResourceStates::GENERIC_READ
        );
        assert_eq!(
            ResourceState::NON_PIXEL_SHADER
                .union(ResourceState::PIXEL_SHADER)
                .to_native()
                .bits(),
            0xc0
        );
        assert_eq!(ResourceState::COPY_SRC.to_native().bits(), 0x800);
        assert_eq!(ResourceState::PREDICATION.to_native().bits(), 0x200);
    }

    #[test]
    fn test_shader_visibility_translation() {
        assert_eq!(
            ShaderType::PIXEL.to_native_visibility(),
            native::ShaderVisibility::Pixel
        );
        assert_eq!(
            ShaderType::TESSELLATION_CONTROL.to_native_visibility(),
            native::ShaderVisibility::Hull
        );
        assert_eq!(
            ShaderType::VERTEX.union(ShaderType::PIXEL).to_native_visibility(),
            native::ShaderVisibility::All
        );
        assert_eq!(
            ShaderType::COMPUTE.to_native_visibility(),
            native::ShaderVisibility::All
        );
        assert!(ShaderType::GEOMETRY.is_single_stage());
        assert!(!ShaderType::ALL_GRAPHICS.is_single_stage());
        assert!(!ShaderType::UNKNOWN.is_single_stage());
    }

    #[test]
    fn test_cull_front_and_back_falls_back_to_back() {
        assert_eq!(CullMode::FrontAndBack.to_native(), native::CullMode::Back);
        assert_eq!(CullMode::None.to_native() as i32, 1);
    }

    #[test]
    fn test_topology_translation() {
        assert_eq!(
            PrimitiveTopology::TriangleStripAdj.to_native(0).0,
            13
        );
        assert_eq!(PrimitiveTopology::PatchList.to_native(3).0, 35);
        assert_eq!(
            PrimitiveTopology::LineStripAdj.to_native_type(),
            native::PrimitiveTopologyType::Line
        );
    }

    #[test]
    fn test_clear_flags_to_native() {
        assert_eq!(ClearFlags::COLOR.to_native(), native::ClearFlags::EMPTY);
        assert_eq!(ClearFlags::ALL.to_native().bits(), 0x3);
    }
}
