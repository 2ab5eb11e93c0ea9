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

//! Shader signatures: the binding layout a pipeline expects.
//!
//! A [`ShaderSignature`] is an ordered list of [`ShaderParameter`]s, one per
//! slot, plus static samplers baked into the layout. The native root
//! signature is built lazily and rebuilt after any change. Command buffers
//! read the derived [`SignatureLayout`] to know how each slot is fed.

use crate::renderer::api::native::{
    self, DescriptorHeapType, NativeHandle, RootParameterType, RootSignatureFlags,
};
use crate::renderer::api::ShaderType;
use crate::renderer::error::SignatureError;
use crate::renderer::resource::{NativeObject, SamplerDescriptor};
use crate::renderer::traits::NativeDevice;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// The kind of descriptors in a table range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeType {
    /// Constant buffer views (`b` registers).
    ConstantBuffer,
    /// Shader resource views (`t` registers).
    ShaderResource,
    /// Unordered access views (`u` registers).
    UnorderedAccess,
    /// Samplers (`s` registers).
    Sampler,
}

impl RangeType {
    /// The native range type.
    pub fn to_native(self) -> native::DescriptorRangeType {
        match self {
            RangeType::ConstantBuffer => native::DescriptorRangeType::Cbv,
            RangeType::ShaderResource => native::DescriptorRangeType::Srv,
            RangeType::UnorderedAccess => native::DescriptorRangeType::Uav,
            RangeType::Sampler => native::DescriptorRangeType::Sampler,
        }
    }

    /// The HLSL register class letter.
    pub fn register_class(self) -> char {
        match self {
            RangeType::ConstantBuffer => 'b',
            RangeType::ShaderResource => 't',
            RangeType::UnorderedAccess => 'u',
            RangeType::Sampler => 's',
        }
    }

    /// The descriptor heap the range's descriptors live in.
    pub fn heap_type(self) -> DescriptorHeapType {
        match self {
            RangeType::Sampler => DescriptorHeapType::Sampler,
            _ => DescriptorHeapType::CbvSrvUav,
        }
    }
}

/// A contiguous run of registers in a table parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorRange {
    /// Kind of the descriptors.
    pub range_type: RangeType,
    /// Number of descriptors.
    pub num_descriptors: u32,
    /// First shader register.
    pub base_register: u32,
    /// Register space.
    pub register_space: u32,
}

impl DescriptorRange {
    /// A range in register space 0.
    pub fn new(range_type: RangeType, num_descriptors: u32, base_register: u32) -> Self {
        Self {
            range_type,
            num_descriptors,
            base_register,
            register_space: 0,
        }
    }
}

/// One slot of a shader signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderParameter {
    /// A descriptor table made of one or more ranges.
    Table {
        /// The ranges, laid out back to back.
        ranges: Vec<DescriptorRange>,
        /// Stages that can see the table.
        visibility: ShaderType,
    },
    /// Inline 32-bit constants.
    Constants {
        /// Number of 32-bit values.
        num_constants: u32,
        /// Constant buffer register.
        register: u32,
        /// Register space.
        space: u32,
        /// Stages that can see the constants.
        visibility: ShaderType,
    },
    /// A root constant buffer view.
    ConstantBuffer {
        /// Constant buffer register.
        register: u32,
        /// Register space.
        space: u32,
        /// Stages that can see the buffer.
        visibility: ShaderType,
    },
    /// A root shader resource view of a buffer.
    Buffer {
        /// Shader resource register.
        register: u32,
        /// Register space.
        space: u32,
        /// Stages that can see the buffer.
        visibility: ShaderType,
    },
    /// A root unordered access view of a buffer.
    RWBuffer {
        /// Unordered access register.
        register: u32,
        /// Register space.
        space: u32,
        /// Stages that can see the buffer.
        visibility: ShaderType,
    },
    /// A single texture, bound through a one-descriptor table.
    Texture {
        /// Shader resource register.
        register: u32,
        /// Register space.
        space: u32,
        /// Stages that can see the texture.
        visibility: ShaderType,
    },
    /// A single writable texture, bound through a one-descriptor table.
    RWTexture {
        /// Unordered access register.
        register: u32,
        /// Register space.
        space: u32,
        /// Stages that can see the texture.
        visibility: ShaderType,
    },
    /// A single dynamic sampler, bound through a one-descriptor table.
    Sampler {
        /// Sampler register.
        register: u32,
        /// Register space.
        space: u32,
        /// Stages that can see the sampler.
        visibility: ShaderType,
    },
}

impl ShaderParameter {
    /// A table visible to `visibility`.
    pub fn table(ranges: Vec<DescriptorRange>, visibility: ShaderType) -> Self {
        ShaderParameter::Table { ranges, visibility }
    }

    /// `num_constants` inline constants at register `b{register}`, space 0.
    pub fn constants(num_constants: u32, register: u32, visibility: ShaderType) -> Self {
        ShaderParameter::Constants {
            num_constants,
            register,
            space: 0,
            visibility,
        }
    }

    /// A root constant buffer at register `b{register}`, space 0.
    pub fn constant_buffer(register: u32, visibility: ShaderType) -> Self {
        ShaderParameter::ConstantBuffer {
            register,
            space: 0,
            visibility,
        }
    }

    /// A root buffer SRV at register `t{register}`, space 0.
    pub fn buffer(register: u32, visibility: ShaderType) -> Self {
        ShaderParameter::Buffer {
            register,
            space: 0,
            visibility,
        }
    }

    /// A root buffer UAV at register `u{register}`, space 0.
    pub fn rw_buffer(register: u32, visibility: ShaderType) -> Self {
        ShaderParameter::RWBuffer {
            register,
            space: 0,
            visibility,
        }
    }

    /// A texture at register `t{register}`, space 0.
    pub fn texture(register: u32, visibility: ShaderType) -> Self {
        ShaderParameter::Texture {
            register,
            space: 0,
            visibility,
        }
    }

    /// A writable texture at register `u{register}`, space 0.
    pub fn rw_texture(register: u32, visibility: ShaderType) -> Self {
        ShaderParameter::RWTexture {
            register,
            space: 0,
            visibility,
        }
    }

    /// A sampler at register `s{register}`, space 0.
    pub fn sampler(register: u32, visibility: ShaderType) -> Self {
        ShaderParameter::Sampler {
            register,
            space: 0,
            visibility,
        }
    }

    /// The engine-level parameter kind.
    pub fn parameter_type(&self) -> crate::renderer::api::ParameterType {
        use crate::renderer::api::ParameterType;
        match self {
            ShaderParameter::Table { .. } => ParameterType::Table,
            ShaderParameter::Constants { .. } => ParameterType::Constants,
            ShaderParameter::ConstantBuffer { .. } => ParameterType::ConstantBuffer,
            ShaderParameter::Buffer { .. } => ParameterType::Buffer,
            ShaderParameter::RWBuffer { .. } => ParameterType::RWBuffer,
            ShaderParameter::Texture { .. } => ParameterType::Texture,
            ShaderParameter::RWTexture { .. } => ParameterType::RWTexture,
            ShaderParameter::Sampler { .. } => ParameterType::Sampler,
        }
    }

    /// Stages that can see the parameter.
    pub fn visibility(&self) -> ShaderType {
        match self {
            ShaderParameter::Table { visibility, .. }
            | ShaderParameter::Constants { visibility, .. }
            | ShaderParameter::ConstantBuffer { visibility, .. }
            | ShaderParameter::Buffer { visibility, .. }
            | ShaderParameter::RWBuffer { visibility, .. }
            | ShaderParameter::Texture { visibility, .. }
            | ShaderParameter::RWTexture { visibility, .. }
            | ShaderParameter::Sampler { visibility, .. } => *visibility,
        }
    }

    /// The ranges a table-backed parameter occupies, in table order.
    fn table_ranges(&self) -> Option<Vec<DescriptorRange>> {
        let single = |range_type, register: &u32, space: &u32| {
            Some(vec![DescriptorRange {
                range_type,
                num_descriptors: 1,
                base_register: *register,
                register_space: *space,
            }])
        };
        match self {
            ShaderParameter::Table { ranges, .. } => Some(ranges.clone()),
            ShaderParameter::Texture {
                register, space, ..
            } => single(RangeType::ShaderResource, register, space),
            ShaderParameter::RWTexture {
                register, space, ..
            } => single(RangeType::UnorderedAccess, register, space),
            ShaderParameter::Sampler {
                register, space, ..
            } => single(RangeType::Sampler, register, space),
            _ => None,
        }
    }

    /// The root descriptor kind of root-descriptor parameters.
    fn root_descriptor(&self) -> Option<(RangeType, u32, u32)> {
        match self {
            ShaderParameter::ConstantBuffer {
                register, space, ..
            } => Some((RangeType::ConstantBuffer, *register, *space)),
            ShaderParameter::Buffer {
                register, space, ..
            } => Some((RangeType::ShaderResource, *register, *space)),
            ShaderParameter::RWBuffer {
                register, space, ..
            } => Some((RangeType::UnorderedAccess, *register, *space)),
            _ => None,
        }
    }
}

/// A sampler baked into a signature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticSampler {
    /// The sampling description.
    pub sampler: SamplerDescriptor,
    /// Sampler register.
    pub register: u32,
    /// Register space.
    pub space: u32,
    /// Stages that can see the sampler.
    pub visibility: ShaderType,
}

/// A run of descriptors inside a table slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TableRange {
    pub offset: u32,
    pub count: u32,
    pub range_type: RangeType,
}

/// How a command buffer feeds one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SlotLayout {
    Constants {
        num_constants: u32,
    },
    RootDescriptor {
        range_type: RangeType,
    },
    Table {
        heap_type: DescriptorHeapType,
        num_descriptors: u32,
        ranges: Vec<TableRange>,
    },
}

impl SlotLayout {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SlotLayout::Constants { .. } => "a constants slot",
            SlotLayout::RootDescriptor { .. } => "a root descriptor slot",
            SlotLayout::Table { .. } => "a descriptor table",
        }
    }
}

/// The built native root signature with its per-slot layout.
#[derive(Debug)]
pub(crate) struct SignatureLayout {
    root: NativeObject,
    slots: Vec<SlotLayout>,
}

impl SignatureLayout {
    pub fn root(&self) -> NativeHandle {
        self.root.handle()
    }

    pub fn slot(&self, slot: u32) -> Option<&SlotLayout> {
        self.slots.get(slot as usize)
    }

    pub fn num_slots(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn slots(&self) -> &[SlotLayout] {
        &self.slots
    }

    /// The range type of the descriptor at `offset` of a table slot.
    pub fn table_range_at(&self, slot: u32, offset: u32) -> Option<RangeType> {
        match self.slot(slot)? {
            SlotLayout::Table { ranges, .. } => ranges
                .iter()
                .find(|r| offset >= r.offset && offset < r.offset + r.count)
                .map(|r| r.range_type),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct SignatureInner {
    parameters: Vec<ShaderParameter>,
    static_samplers: BTreeMap<u32, StaticSampler>,
    compiled: Option<Arc<SignatureLayout>>,
    dirty: bool,
}

/// The binding layout consumed by pipeline states and command buffers.
///
/// Shared through `Arc`; every mutation marks the signature dirty and the
/// native root signature is rebuilt on next use.
pub struct ShaderSignature {
    device: Arc<dyn NativeDevice>,
    label: String,
    inner: Mutex<SignatureInner>,
}

impl fmt::Debug for ShaderSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock().unwrap();
        f.debug_struct("ShaderSignature")
            .field("label", &self.label)
            .field("parameters", &inner.parameters.len())
            .field("static_samplers", &inner.static_samplers.len())
            .field("dirty", &inner.dirty)
            .finish()
    }
}

impl ShaderSignature {
    pub(crate) fn new(device: Arc<dyn NativeDevice>, label: impl Into<String>) -> Self {
        Self {
            device,
            label: label.into(),
            inner: Mutex::new(SignatureInner {
                parameters: Vec::new(),
                static_samplers: BTreeMap::new(),
                compiled: None,
                dirty: true,
            }),
        }
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns a copy of the parameter list.
    pub fn parameters(&self) -> Vec<ShaderParameter> {
        self.inner.lock().unwrap().parameters.clone()
    }

    /// Replaces the whole parameter list.
    pub fn set_parameters(&self, parameters: Vec<ShaderParameter>) {
        let mut inner = self.inner.lock().unwrap();
        inner.parameters = parameters;
        inner.dirty = true;
    }

    /// Returns the parameter at `index`.
    pub fn parameter(&self, index: usize) -> Result<ShaderParameter, SignatureError> {
        let inner = self.inner.lock().unwrap();
        inner
            .parameters
            .get(index)
            .cloned()
            .ok_or(SignatureError::ParameterOutOfRange {
                index,
                count: inner.parameters.len(),
            })
    }

    /// Sets the parameter at `index`.
    ///
    /// An existing slot is overwritten; `index == num_parameters()` appends.
    pub fn set_parameter(
        &self,
        index: usize,
        parameter: ShaderParameter,
    ) -> Result<(), SignatureError> {
        let mut inner = self.inner.lock().unwrap();
        let count = inner.parameters.len();
        match index.cmp(&count) {
            std::cmp::Ordering::Less => inner.parameters[index] = parameter,
            std::cmp::Ordering::Equal => inner.parameters.push(parameter),
            std::cmp::Ordering::Greater => {
                return Err(SignatureError::ParameterOutOfRange { index, count })
            }
        }
        inner.dirty = true;
        Ok(())
    }

    /// Number of parameter slots.
    pub fn num_parameters(&self) -> usize {
        self.inner.lock().unwrap().parameters.len()
    }

    /// Bakes `sampler` into the signature at static sampler slot `slot`.
    pub fn set_static_sampler(
        &self,
        slot: u32,
        sampler: SamplerDescriptor,
        register: u32,
        visibility: ShaderType,
        space: u32,
    ) {
        let mut inner = self.inner.lock().unwrap();
        inner.static_samplers.insert(
            slot,
            StaticSampler {
                sampler,
                register,
                space,
                visibility,
            },
        );
        inner.dirty = true;
    }

    /// The static sampler at `slot`.
    pub fn static_sampler(&self, slot: u32) -> Option<StaticSampler> {
        self.inner.lock().unwrap().static_samplers.get(&slot).copied()
    }

    /// Number of static samplers.
    pub fn num_static_samplers(&self) -> usize {
        self.inner.lock().unwrap().static_samplers.len()
    }

    /// Returns `true` if the native root signature must be rebuilt.
    pub fn is_dirty(&self) -> bool {
        self.inner.lock().unwrap().dirty
    }

    /// Validates the layout and translates it to a native root signature description.
    /// ## Errors
    /// * `SignatureError::EmptyTable` - A table has no ranges.
    /// * `SignatureError::MixedSamplerTable` - A table mixes sampler and non-sampler ranges.
    /// * `SignatureError::InvalidParameter` - A range or constants slot has zero size.
    /// * `SignatureError::RegisterAliasing` - Two bindings overlap in one register class and space.
    pub fn root_signature_desc(&self) -> Result<native::RootSignatureDesc, SignatureError> {
        let inner = self.inner.lock().unwrap();
        Self::build_desc(&inner.parameters, &inner.static_samplers)
    }

    /// The native root signature, rebuilt first if the signature is dirty.
    pub fn native_root_signature(&self) -> Result<NativeHandle, SignatureError> {
        Ok(self.compiled()?.root())
    }

    pub(crate) fn compiled(&self) -> Result<Arc<SignatureLayout>, SignatureError> {
        let mut inner = self.inner.lock().unwrap();
        if let (false, Some(compiled)) = (inner.dirty, inner.compiled.as_ref()) {
            return Ok(compiled.clone());
        }

        let desc = Self::build_desc(&inner.parameters, &inner.static_samplers)?;
        let handle = self.device.create_root_signature(&desc)?;
        self.device.set_name(handle, &self.label);
        let layout = Arc::new(SignatureLayout {
            root: NativeObject::owned(self.device.clone(), handle),
            slots: inner.parameters.iter().map(Self::slot_layout).collect(),
        });
        log::debug!(
            "Built root signature '{}' ({} parameters, {} static samplers)",
            self.label,
            inner.parameters.len(),
            inner.static_samplers.len()
        );
        inner.compiled = Some(layout.clone());
        inner.dirty = false;
        Ok(layout)
    }

    fn slot_layout(parameter: &ShaderParameter) -> SlotLayout {
        if let ShaderParameter::Constants { num_constants, .. } = parameter {
            return SlotLayout::Constants {
                num_constants: *num_constants,
            };
        }
        if let Some((range_type, _, _)) = parameter.root_descriptor() {
            return SlotLayout::RootDescriptor { range_type };
        }
        let ranges = parameter.table_ranges().unwrap_or_default();
        let mut offset = 0;
        let ranges: Vec<TableRange> = ranges
            .iter()
            .map(|r| {
                let range = TableRange {
                    offset,
                    count: r.num_descriptors,
                    range_type: r.range_type,
                };
                offset += r.num_descriptors;
                range
            })
            .collect();
        SlotLayout::Table {
            heap_type: ranges
                .first()
                .map_or(DescriptorHeapType::CbvSrvUav, |r| r.range_type.heap_type()),
            num_descriptors: offset,
            ranges,
        }
    }

    fn build_desc(
        parameters: &[ShaderParameter],
        static_samplers: &BTreeMap<u32, StaticSampler>,
    ) -> Result<native::RootSignatureDesc, SignatureError> {
        let mut bindings = Vec::new();
        let mut native_parameters = Vec::with_capacity(parameters.len());

        for (slot, parameter) in parameters.iter().enumerate() {
            let visibility = parameter.visibility().to_native_visibility();
            let label = format!("slot {slot}");

            if let ShaderParameter::Constants {
                num_constants,
                register,
                space,
                ..
            } = parameter
            {
                if *num_constants == 0 {
                    return Err(SignatureError::InvalidParameter {
                        slot,
                        reason: "zero 32-bit constants".to_string(),
                    });
                }
                bindings.push(Binding::new('b', *space, *register, 1, label));
                native_parameters.push(native::RootParameter::Constants {
                    shader_register: *register,
                    register_space: *space,
                    num_32bit_values: *num_constants,
                    visibility,
                });
            } else if let Some((range_type, register, space)) = parameter.root_descriptor() {
                bindings.push(Binding::new(
                    range_type.register_class(),
                    space,
                    register,
                    1,
                    label,
                ));
                native_parameters.push(native::RootParameter::Descriptor {
                    parameter_type: match range_type {
                        RangeType::ConstantBuffer => RootParameterType::Cbv,
                        RangeType::ShaderResource => RootParameterType::Srv,
                        _ => RootParameterType::Uav,
                    },
                    shader_register: register,
                    register_space: space,
                    visibility,
                });
            } else {
                let ranges = parameter.table_ranges().unwrap_or_default();
                if ranges.is_empty() {
                    return Err(SignatureError::EmptyTable { slot });
                }
                let samplers = ranges
                    .iter()
                    .filter(|r| r.range_type == RangeType::Sampler)
                    .count();
                if samplers != 0 && samplers != ranges.len() {
                    return Err(SignatureError::MixedSamplerTable { slot });
                }
                let mut offset = 0;
                let mut native_ranges = Vec::with_capacity(ranges.len());
                for range in &ranges {
                    if range.num_descriptors == 0 {
                        return Err(SignatureError::InvalidParameter {
                            slot,
                            reason: "descriptor range with zero descriptors".to_string(),
                        });
                    }
                    bindings.push(Binding::new(
                        range.range_type.register_class(),
                        range.register_space,
                        range.base_register,
                        range.num_descriptors,
                        label.clone(),
                    ));
                    native_ranges.push(native::DescriptorRange {
                        range_type: range.range_type.to_native(),
                        num_descriptors: range.num_descriptors,
                        base_shader_register: range.base_register,
                        register_space: range.register_space,
                        offset_in_descriptors_from_table_start: offset,
                    });
                    offset += range.num_descriptors;
                }
                native_parameters.push(native::RootParameter::DescriptorTable {
                    ranges: native_ranges,
                    visibility,
                });
            }
        }

        let mut native_samplers = Vec::with_capacity(static_samplers.len());
        for (slot, sampler) in static_samplers {
            bindings.push(Binding::new(
                's',
                sampler.space,
                sampler.register,
                1,
                format!("static sampler {slot}"),
            ));
            native_samplers.push(sampler.sampler.to_static(
                sampler.register,
                sampler.space,
                sampler.visibility.to_native_visibility(),
            ));
        }

        check_aliasing(&bindings)?;

        let visibilities = native_parameters
            .iter()
            .map(native::RootParameter::visibility)
            .chain(native_samplers.iter().map(|s| s.shader_visibility));
        let flags = root_signature_flags(visibilities);
        Ok(native::RootSignatureDesc {
            parameters: native_parameters,
            flags,
            static_samplers: native_samplers,
        })
    }
}

struct Binding {
    class: char,
    space: u32,
    start: u64,
    end: u64,
    label: String,
}

impl Binding {
    fn new(class: char, space: u32, register: u32, count: u32, label: String) -> Self {
        Self {
            class,
            space,
            start: u64::from(register),
            end: u64::from(register) + u64::from(count),
            label,
        }
    }
}

fn check_aliasing(bindings: &[Binding]) -> Result<(), SignatureError> {
    for (i, first) in bindings.iter().enumerate() {
        for second in &bindings[i + 1..] {
            if first.class == second.class
                && first.space == second.space
                && first.start < second.end
                && second.start < first.end
            {
                return Err(SignatureError::RegisterAliasing {
                    class: first.class,
                    register: first.start.max(second.start) as u32,
                    space: first.space,
                    first: first.label.clone(),
                    second: second.label.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Allows input layouts and denies root access to graphics stages nothing is visible to.
fn root_signature_flags(
    visibilities: impl Iterator<Item = native::ShaderVisibility>,
) -> RootSignatureFlags {
    const STAGE_FLAGS: [(native::ShaderVisibility, RootSignatureFlags); 5] = [
        (
            native::ShaderVisibility::Vertex,
            RootSignatureFlags::DENY_VERTEX_SHADER_ROOT_ACCESS,
        ),
        (
            native::ShaderVisibility::Hull,
            RootSignatureFlags::DENY_HULL_SHADER_ROOT_ACCESS,
        ),
        (
            native::ShaderVisibility::Domain,
            RootSignatureFlags::DENY_DOMAIN_SHADER_ROOT_ACCESS,
        ),
        (
            native::ShaderVisibility::Geometry,
            RootSignatureFlags::DENY_GEOMETRY_SHADER_ROOT_ACCESS,
        ),
        (
            native::ShaderVisibility::Pixel,
            RootSignatureFlags::DENY_PIXEL_SHADER_ROOT_ACCESS,
        ),
    ];

    let visible: Vec<native::ShaderVisibility> = visibilities.collect();
    let mut flags = RootSignatureFlags::ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT;
    if visible.contains(&native::ShaderVisibility::All) {
        return flags;
    }
    for (stage, deny) in STAGE_FLAGS {
        if !visible.contains(&stage) {
            flags.insert(deny);
        }
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::traits::mock::MockDevice;

    fn signature(device: &Arc<MockDevice>) -> ShaderSignature {
        ShaderSignature::new(device.clone(), "test")
    }

    #[test]
    fn test_parameter_accessors_and_bounds() {
        let device = MockDevice::new();
        let sig = signature(&device);
        sig.set_parameters(vec![
            ShaderParameter::constant_buffer(0, ShaderType::VERTEX),
            ShaderParameter::texture(0, ShaderType::PIXEL),
        ]);
        assert!(sig.is_dirty());
        assert_eq!(sig.num_parameters(), 2);
        assert_eq!(
            sig.parameter(1).unwrap(),
            ShaderParameter::texture(0, ShaderType::PIXEL)
        );
        assert_eq!(
            sig.parameter(2).unwrap_err(),
            SignatureError::ParameterOutOfRange { index: 2, count: 2 }
        );
    }

    #[test]
    fn test_same_slot_overwrites() {
        let device = MockDevice::new();
        let sig = signature(&device);
        sig.set_parameter(0, ShaderParameter::constant_buffer(0, ShaderType::ALL))
            .unwrap();
        sig.set_parameter(0, ShaderParameter::buffer(0, ShaderType::ALL))
            .unwrap();
        sig.set_parameter(1, ShaderParameter::constants(4, 1, ShaderType::ALL))
            .unwrap();
        sig.set_parameter(1, ShaderParameter::constants(8, 1, ShaderType::ALL))
            .unwrap();
        assert_eq!(sig.num_parameters(), 2);
        assert_eq!(
            sig.parameter(0).unwrap(),
            ShaderParameter::buffer(0, ShaderType::ALL)
        );
        assert!(matches!(
            sig.set_parameter(5, ShaderParameter::sampler(0, ShaderType::ALL)),
            Err(SignatureError::ParameterOutOfRange { index: 5, count: 2 })
        ));
    }

    #[test]
    fn test_register_aliasing_is_rejected() {
        let device = MockDevice::new();
        let sig = signature(&device);
        sig.set_parameters(vec![
            ShaderParameter::constant_buffer(0, ShaderType::ALL),
            ShaderParameter::constants(4, 0, ShaderType::ALL),
        ]);
        assert!(matches!(
            sig.root_signature_desc(),
            Err(SignatureError::RegisterAliasing {
                class: 'b',
                register: 0,
                ..
            })
        ));

        sig.set_parameters(vec![
            ShaderParameter::table(
                vec![DescriptorRange::new(RangeType::ShaderResource, 4, 0)],
                ShaderType::PIXEL,
            ),
            ShaderParameter::texture(2, ShaderType::PIXEL),
        ]);
        assert!(matches!(
            sig.native_root_signature(),
            Err(SignatureError::RegisterAliasing { register: 2, .. })
        ));
        assert_eq!(device.root_signatures_created.load(std::sync::atomic::Ordering::Relaxed), 0);

        sig.set_parameters(vec![
            ShaderParameter::texture(0, ShaderType::PIXEL),
            ShaderParameter::Texture {
                register: 0,
                space: 1,
                visibility: ShaderType::PIXEL,
            },
            ShaderParameter::rw_texture(0, ShaderType::PIXEL),
        ]);
        assert!(sig.root_signature_desc().is_ok());

        sig.set_parameters(vec![ShaderParameter::sampler(0, ShaderType::PIXEL)]);
        sig.set_static_sampler(0, SamplerDescriptor::default(), 0, ShaderType::PIXEL, 0);
        assert!(matches!(
            sig.root_signature_desc(),
            Err(SignatureError::RegisterAliasing { class: 's', .. })
        ));
    }

    #[test]
    fn test_invalid_tables_are_rejected() {
        let device = MockDevice::new();
        let sig = signature(&device);
        sig.set_parameters(vec![ShaderParameter::table(Vec::new(), ShaderType::ALL)]);
        assert_eq!(
            sig.root_signature_desc().unwrap_err(),
            SignatureError::EmptyTable { slot: 0 }
        );

        sig.set_parameters(vec![ShaderParameter::table(
            vec![
                DescriptorRange::new(RangeType::ShaderResource, 1, 0),
                DescriptorRange::new(RangeType::Sampler, 1, 0),
            ],
            ShaderType::ALL,
        )]);
        assert_eq!(
            sig.root_signature_desc().unwrap_err(),
            SignatureError::MixedSamplerTable { slot: 0 }
        );
    }

    #[test]
    fn test_native_translation() {
        let device = MockDevice::new();
        let sig = signature(&device);
        sig.set_parameters(vec![
            ShaderParameter::constants(4, 0, ShaderType::VERTEX),
            ShaderParameter::rw_buffer(1, ShaderType::PIXEL),
            ShaderParameter::table(
                vec![
                    DescriptorRange::new(RangeType::ShaderResource, 2, 0),
                    DescriptorRange::new(RangeType::ConstantBuffer, 1, 1),
                ],
                ShaderType::PIXEL,
            ),
            ShaderParameter::texture(5, ShaderType::PIXEL),
        ]);
        let desc = sig.root_signature_desc().unwrap();
        assert_eq!(desc.parameters.len(), 4);
        assert_eq!(
            desc.parameters[0],
            native::RootParameter::Constants {
                shader_register: 0,
                register_space: 0,
                num_32bit_values: 4,
                visibility: native::ShaderVisibility::Vertex,
            }
        );
        assert_eq!(desc.parameters[1].parameter_type(), RootParameterType::Uav);
        match &desc.parameters[2] {
            native::RootParameter::DescriptorTable { ranges, .. } => {
                assert_eq!(ranges.len(), 2);
                assert_eq!(ranges[1].offset_in_descriptors_from_table_start, 2);
                assert_eq!(ranges[1].range_type, native::DescriptorRangeType::Cbv);
            }
            other => panic!("expected a table, got {other:?}"),
        }
        assert_eq!(
            desc.parameters[3].parameter_type(),
            RootParameterType::DescriptorTable
        );

        assert!(desc
            .flags
            .contains(RootSignatureFlags::ALLOW_INPUT_ASSEMBLER_INPUT_LAYOUT));
        assert!(desc
            .flags
            .contains(RootSignatureFlags::DENY_GEOMETRY_SHADER_ROOT_ACCESS));
        assert!(!desc
            .flags
            .contains(RootSignatureFlags::DENY_VERTEX_SHADER_ROOT_ACCESS));
        assert!(!desc
            .flags
            .contains(RootSignatureFlags::DENY_PIXEL_SHADER_ROOT_ACCESS));
    }

    #[test]
    fn test_static_sampler_stages_keep_root_access() {
        let device = MockDevice::new();
        let sig = signature(&device);
        sig.set_parameters(vec![ShaderParameter::constants(4, 0, ShaderType::VERTEX)]);
        sig.set_static_sampler(0, SamplerDescriptor::default(), 0, ShaderType::GEOMETRY, 0);

        let desc = sig.root_signature_desc().unwrap();
        assert_eq!(desc.parameters.len(), 1);
        assert_eq!(desc.static_samplers.len(), 1);
        assert!(!desc
            .flags
            .contains(RootSignatureFlags::DENY_GEOMETRY_SHADER_ROOT_ACCESS));
        assert!(!desc
            .flags
            .contains(RootSignatureFlags::DENY_VERTEX_SHADER_ROOT_ACCESS));
        assert!(desc
            .flags
            .contains(RootSignatureFlags::DENY_PIXEL_SHADER_ROOT_ACCESS));
    }

    #[test]
    fn test_layout_is_built_lazily_and_once() {
        let device = MockDevice::new();
        let sig = signature(&device);
        sig.set_parameters(vec![
            ShaderParameter::constant_buffer(0, ShaderType::ALL),
            ShaderParameter::table(
                vec![
                    DescriptorRange::new(RangeType::ShaderResource, 3, 0),
                    DescriptorRange::new(RangeType::UnorderedAccess, 2, 0),
                ],
                ShaderType::ALL,
            ),
        ]);
        let first = sig.native_root_signature().unwrap();
        assert_eq!(sig.native_root_signature().unwrap(), first);
        assert!(!sig.is_dirty());
        assert_eq!(
            device
                .root_signatures_created
                .load(std::sync::atomic::Ordering::Relaxed),
            1
        );

        let layout = sig.compiled().unwrap();
        assert_eq!(layout.num_slots(), 2);
        assert_eq!(
            layout.table_range_at(1, 4),
            Some(RangeType::UnorderedAccess)
        );
        assert_eq!(layout.table_range_at(1, 5), None);
        assert_eq!(layout.table_range_at(0, 0), None);
        drop(layout);

        sig.set_static_sampler(0, SamplerDescriptor::linear_clamp(), 0, ShaderType::ALL, 0);
        let second = sig.native_root_signature().unwrap();
        assert_ne!(first, second);
        assert_eq!(*device.released.lock().unwrap(), vec![first]);
    }
}
