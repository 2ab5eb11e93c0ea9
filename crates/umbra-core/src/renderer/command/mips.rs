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

use super::{CommandBuffer, ShaderArgument};
use crate::renderer::api::native::{
    NativeHandle, ResourceBarrierDesc, ResourceStates, ShaderBytecode,
};
use crate::renderer::api::{Pipeline, ResourceState, ShaderType};
use crate::renderer::error::{CommandError, PipelineError};
use crate::renderer::pipeline::ComputePipelineState;
use crate::renderer::resource::{NativeObject, SamplerDescriptor, TextureId, TextureInfo, TextureUsage};
use crate::renderer::shader::{Shader, ShaderDescriptor};
use crate::renderer::signature::{
    DescriptorRange, RangeType, ShaderParameter, ShaderSignature, SignatureLayout,
};
use crate::renderer::traits::NativeDevice;
use std::sync::Arc;

const MIP_CONSTANTS: u32 = 6;
const THREAD_GROUP_SIZE: u32 = 8;
const VARIANT_LABELS: [&str; 4] = [
    "mips (even, even)",
    "mips (odd, even)",
    "mips (even, odd)",
    "mips (odd, odd)",
];

/// Picks the downsampling shader for a source mip of `width` x `height`.
///
/// Bit 0 is set for an odd width and bit 1 for an odd height, so odd
/// dimensions use the variants that take extra samples.
pub(crate) fn select_mips_variant(width: u32, height: u32) -> usize {
    ((width & 1) | ((height & 1) << 1)) as usize
}

/// The compute pipelines that downsample a mip chain, built once per device.
#[derive(Debug)]
pub(crate) struct MipGenerator {
    layout: Arc<SignatureLayout>,
    variants: [Arc<NativeObject>; 4],
}

impl MipGenerator {
    /// Builds the signature and the four pipeline variants.
    ///
    /// `shaders` is indexed by [`select_mips_variant`].
    pub fn new(
        device: Arc<dyn NativeDevice>,
        shaders: &[ShaderBytecode; 4],
        node_mask: u32,
    ) -> Result<Self, PipelineError> {
        let signature = Arc::new(ShaderSignature::new(device.clone(), "mip generation"));
        signature.set_parameters(vec![
            ShaderParameter::constants(MIP_CONSTANTS, 0, ShaderType::COMPUTE),
            ShaderParameter::table(
                vec![
                    DescriptorRange::new(RangeType::ShaderResource, 1, 0),
                    DescriptorRange::new(RangeType::UnorderedAccess, 1, 0),
                ],
                ShaderType::COMPUTE,
            ),
        ]);
        signature.set_static_sampler(
            0,
            SamplerDescriptor::linear_clamp(),
            0,
            ShaderType::COMPUTE,
            0,
        );

        let build = |variant: usize| -> Result<Arc<NativeObject>, PipelineError> {
            let label = VARIANT_LABELS[variant];
            let shader = Shader::new(ShaderDescriptor {
                label: Some(label),
                ..ShaderDescriptor::new(ShaderType::COMPUTE, shaders[variant].clone())
            })?;
            let mut pipeline = ComputePipelineState::new(device.clone(), None, label, node_mask);
            pipeline.set_shader(Arc::new(shader))?;
            pipeline.set_shader_signature(signature.clone());
            Ok(pipeline.prepare()?.0)
        };
        let variants = [build(0)?, build(1)?, build(2)?, build(3)?];
        let layout = signature.compiled()?;
        log::debug!("Built mip generation pipelines");

        Ok(Self { layout, variants })
    }
}

fn check_mip_source(info: &TextureInfo) -> Result<(), CommandError> {
    let reason = if info.sample_count.is_multisampled() {
        "is multisampled"
    } else if info.format.is_depth() {
        "has a depth format"
    } else if !info.usage.contains(TextureUsage::UNORDERED_ACCESS) {
        "does not allow unordered access"
    } else if !info.usage.contains(TextureUsage::SHADER_RESOURCE) {
        "cannot be read by shaders"
    } else {
        return Ok(());
    };
    Err(CommandError::InvalidArgument(format!(
        "cannot generate mips for a texture that {reason}"
    )))
}

impl CommandBuffer {
    /// Fills mips 1.. of `texture` by successively downsampling mip 0.
    ///
    /// The texture must be single-sampled, use a color format and allow both
    /// shader reads and unordered access. It is left in the `UAV` state. The
    /// compute signature and pipeline bound on this buffer are replaced.
    pub fn generate_mips(&mut self, texture: TextureId) -> Result<(), CommandError> {
        if !self.is_recording() {
            return Err(CommandError::NotRecording);
        }
        if !self.queue_type().supports_compute() {
            return Err(CommandError::UnsupportedOnQueue {
                operation: "generate mips",
                queue: self.queue_type(),
            });
        }
        let context = self.context().clone();
        let generator = context
            .mips
            .as_ref()
            .ok_or(CommandError::MipGenerationUnavailable)?;
        let entry = context.resources.get(texture)?;
        let info = entry.texture()?.clone();
        if info.mip_levels <= 1 {
            return Ok(());
        }
        check_mip_source(&info)?;
        log::trace!("Generating {} mips for '{}'", info.mip_levels - 1, entry.name);

        self.transition_resource(texture, ResourceState::UAV, false)?;
        self.bind_signature_layout(Pipeline::Compute, generator.layout.clone())?;
        let handle = entry.handle();

        for level in 1..info.mip_levels {
            let source = level - 1;
            self.transition_mip(
                handle,
                &info,
                source,
                ResourceStates::UNORDERED_ACCESS,
                ResourceStates::NON_PIXEL_SHADER_RESOURCE,
            );

            let (source_width, source_height) = info.mip_size(source);
            let (width, height) = info.mip_size(level);
            let variant = select_mips_variant(source_width, source_height);
            self.bind_pipeline_state(Pipeline::Compute, generator.variants[variant].clone())?;

            let constants = [
                source,
                1,
                variant as u32,
                u32::from(info.format.is_srgb()),
                (1.0 / width as f32).to_bits(),
                (1.0 / height as f32).to_bits(),
            ];
            self.bind_32bit_constants(Pipeline::Compute, 0, &constants, 0)?;
            self.bind_shader_arguments(
                Pipeline::Compute,
                1,
                0,
                &[
                    ShaderArgument::TextureMip { texture, mip: source },
                    ShaderArgument::TextureMip { texture, mip: level },
                ],
            )?;
            self.dispatch(
                width.div_ceil(THREAD_GROUP_SIZE),
                height.div_ceil(THREAD_GROUP_SIZE),
                info.array_layers,
            )?;
            self.add_uav_barrier(Some(texture.into()), false)?;
        }

        // Every source mip goes back to UAV so the whole texture matches its tracked state.
        for mip in 0..info.mip_levels - 1 {
            self.transition_mip(
                handle,
                &info,
                mip,
                ResourceStates::NON_PIXEL_SHADER_RESOURCE,
                ResourceStates::UNORDERED_ACCESS,
            );
        }
        self.flush_resource_barriers()
    }

    fn transition_mip(
        &mut self,
        resource: NativeHandle,
        info: &TextureInfo,
        mip: u32,
        state_before: ResourceStates,
        state_after: ResourceStates,
    ) {
        for slice in 0..info.array_layers {
            self.push_barrier(ResourceBarrierDesc::Transition {
                resource,
                subresource: info.subresource(mip, slice),
                state_before,
                state_after,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::Extent3D;
    use crate::renderer::resource::TextureDescriptor;
    use crate::renderer::traits::mock::{MockCommand, MockCommandList, MockDevice};
    use crate::renderer::{Device, DeviceDescriptor};
    use std::sync::atomic::Ordering;

    fn mip_device(mock: &Arc<MockDevice>) -> Device {
        Device::new(
            mock.clone(),
            DeviceDescriptor {
                mip_shaders: Some(std::array::from_fn(|i| Arc::from(vec![i as u8 + 1; 4]))),
                ..Default::default()
            },
        )
        .unwrap()
    }

    fn mipped_texture(device: &Device, usage: TextureUsage) -> TextureId {
        device
            .create_texture(&TextureDescriptor {
                size: Extent3D {
                    width: 8,
                    height: 6,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 0,
                usage,
                ..Default::default()
            })
            .unwrap()
    }

    #[test]
    fn test_variant_selection() {
        assert_eq!(select_mips_variant(8, 8), 0);
        assert_eq!(select_mips_variant(7, 8), 1);
        assert_eq!(select_mips_variant(8, 7), 2);
        assert_eq!(select_mips_variant(7, 7), 3);
    }

    #[test]
    fn test_generator_builds_four_variants() {
        let mock = MockDevice::new();
        let _device = mip_device(&mock);
        assert_eq!(mock.pipelines_created.load(Ordering::Relaxed), 4);
        assert_eq!(mock.root_signatures_created.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_generate_mips_dispatches_per_level() {
        let mock = MockDevice::new();
        let device = mip_device(&mock);
        let texture = mipped_texture(
            &device,
            TextureUsage::SHADER_RESOURCE.union(TextureUsage::UNORDERED_ACCESS),
        );
        assert_eq!(device.texture_info(texture).unwrap().mip_levels, 4);

        let mut cmd = device.direct_queue().command_buffer().unwrap();
        cmd.generate_mips(texture).unwrap();

        let list: &MockCommandList = cmd.native_list().as_any().downcast_ref().unwrap();
        let dispatches: Vec<_> = list
            .commands
            .iter()
            .filter_map(|c| match c {
                MockCommand::Dispatch(x, y, z) => Some((*x, *y, *z)),
                _ => None,
            })
            .collect();
        // 8x6 -> 4x3 -> 2x1 -> 1x1
        assert_eq!(dispatches, vec![(1, 1, 1), (1, 1, 1), (1, 1, 1)]);
        assert_eq!(
            list.count(|c| matches!(c, MockCommand::SetRootConstants(Pipeline::Compute, 0, _))),
            3
        );
        // 8x6 is even/even, 4x3 is even/odd, 2x1 is even/odd.
        assert_eq!(
            list.count(|c| matches!(c, MockCommand::SetPipelineState(_))),
            2
        );
        assert_eq!(device.resource_state(texture).unwrap(), ResourceState::UAV);
        assert_eq!(cmd.pending_barrier_count(), 0);
    }

    #[test]
    fn test_generate_mips_requirements() {
        let mock = MockDevice::new();
        let device = mip_device(&mock);
        let read_only = mipped_texture(&device, TextureUsage::SHADER_RESOURCE);
        let mut cmd = device.direct_queue().command_buffer().unwrap();
        assert!(matches!(
            cmd.generate_mips(read_only),
            Err(CommandError::InvalidArgument(_))
        ));

        let plain = Device::new(MockDevice::new(), DeviceDescriptor::default()).unwrap();
        let texture = mipped_texture(
            &plain,
            TextureUsage::SHADER_RESOURCE.union(TextureUsage::UNORDERED_ACCESS),
        );
        let mut cmd = plain.direct_queue().command_buffer().unwrap();
        assert_eq!(
            cmd.generate_mips(texture),
            Err(CommandError::MipGenerationUnavailable)
        );
    }
}
