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

use crate::renderer::api::native::{self, FilterReductionType, StaticBorderColor};
use crate::renderer::api::{CompareFunction, CompareMode, Filter, LinearRgba, WrapMode};
use serde::{Deserialize, Serialize};

/// Describes texture sampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerDescriptor {
    /// Minification filter.
    pub min_filter: Filter,
    /// Magnification filter.
    pub mag_filter: Filter,
    /// Filter between mip levels.
    pub mip_filter: Filter,
    /// Addressing along U.
    pub wrap_u: WrapMode,
    /// Addressing along V.
    pub wrap_v: WrapMode,
    /// Addressing along W.
    pub wrap_w: WrapMode,
    /// Reduction of the fetched texels.
    pub compare_mode: CompareMode,
    /// Comparison used by [`CompareMode::CompareRefToTexture`].
    pub compare_function: CompareFunction,
    /// Offset added to the computed mip level.
    pub lod_bias: f32,
    /// Lowest accessible mip level.
    pub min_lod: f32,
    /// Highest accessible mip level.
    pub max_lod: f32,
    /// Color of [`WrapMode::Border`] addressing.
    pub border_color: [f32; 4],
    /// Enables anisotropic filtering, overriding the filters.
    pub anisotropic_filtering: bool,
    /// Maximum anisotropy, clamped to 1..=16.
    pub max_anisotropy: u8,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            min_filter: Filter::Linear,
            mag_filter: Filter::Linear,
            mip_filter: Filter::Linear,
            wrap_u: WrapMode::Repeat,
            wrap_v: WrapMode::Repeat,
            wrap_w: WrapMode::Repeat,
            compare_mode: CompareMode::None,
            compare_function: CompareFunction::Always,
            lod_bias: 0.0,
            min_lod: 0.0,
            max_lod: f32::MAX,
            border_color: LinearRgba::TRANSPARENT.to_array(),
            anisotropic_filtering: false,
            max_anisotropy: 8,
        }
    }
}

impl SamplerDescriptor {
    /// Linear filtering with clamped addressing.
    pub fn linear_clamp() -> Self {
        Self {
            wrap_u: WrapMode::Clamp,
            wrap_v: WrapMode::Clamp,
            wrap_w: WrapMode::Clamp,
            ..Default::default()
        }
    }

    /// The encoded native filter.
    pub fn native_filter(&self) -> native::Filter {
        let reduction: FilterReductionType = self.compare_mode.to_native();
        if self.anisotropic_filtering {
            native::Filter::anisotropic(reduction)
        } else {
            native::Filter::basic(
                self.min_filter.to_native(),
                self.mag_filter.to_native(),
                self.mip_filter.to_native(),
                reduction,
            )
        }
    }

    fn native_anisotropy(&self) -> u32 {
        u32::from(self.max_anisotropy.clamp(1, 16))
    }

    /// Translates to a `D3D12_SAMPLER_DESC`.
    pub fn to_native(&self) -> native::SamplerDesc {
        native::SamplerDesc {
            filter: self.native_filter(),
            address_u: self.wrap_u.to_native(),
            address_v: self.wrap_v.to_native(),
            address_w: self.wrap_w.to_native(),
            mip_lod_bias: self.lod_bias,
            max_anisotropy: self.native_anisotropy(),
            comparison_func: self.compare_function.to_native(),
            border_color: self.border_color,
            min_lod: self.min_lod,
            max_lod: self.max_lod,
        }
    }

    /// The closest static border color.
    ///
    /// Static samplers only support transparent black, opaque black and
    /// opaque white.
    pub fn static_border_color(&self) -> StaticBorderColor {
        let [r, g, b, a] = self.border_color;
        if a < 0.5 {
            StaticBorderColor::TransparentBlack
        } else if r + g + b >= 1.5 {
            StaticBorderColor::OpaqueWhite
        } else {
            StaticBorderColor::OpaqueBlack
        }
    }

    /// Translates to a `D3D12_STATIC_SAMPLER_DESC` bound at `register`/`space`.
    pub fn to_static(
        &self,
        register: u32,
        space: u32,
        visibility: native::ShaderVisibility,
    ) -> native::StaticSamplerDesc {
        let border_color = self.static_border_color();
        let exact = match border_color {
            StaticBorderColor::TransparentBlack => [0.0; 4],
            StaticBorderColor::OpaqueBlack => [0.0, 0.0, 0.0, 1.0],
            StaticBorderColor::OpaqueWhite => [1.0; 4],
        };
        if exact != self.border_color {
            log::warn!(
                "Border color {:?} is not representable by a static sampler, using {:?}",
                self.border_color,
                border_color
            );
        }
        native::StaticSamplerDesc {
            filter: self.native_filter(),
            address_u: self.wrap_u.to_native(),
            address_v: self.wrap_v.to_native(),
            address_w: self.wrap_w.to_native(),
            mip_lod_bias: self.lod_bias,
            max_anisotropy: self.native_anisotropy(),
            comparison_func: self.compare_function.to_native(),
            border_color,
            min_lod: self.min_lod,
            max_lod: self.max_lod,
            shader_register: register,
            register_space: space,
            shader_visibility: visibility,
        }
    }
}

/// Metadata of a sampler in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplerInfo {
    /// The sampling description.
    pub descriptor: SamplerDescriptor,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_encoding() {
        assert_eq!(
            SamplerDescriptor::default().native_filter(),
            native::Filter::MIN_MAG_MIP_LINEAR
        );
        let point = SamplerDescriptor {
            min_filter: Filter::Nearest,
            mag_filter: Filter::Nearest,
            mip_filter: Filter::Nearest,
            ..Default::default()
        };
        assert_eq!(point.native_filter(), native::Filter::MIN_MAG_MIP_POINT);
        let aniso = SamplerDescriptor {
            anisotropic_filtering: true,
            max_anisotropy: 32,
            ..Default::default()
        };
        assert_eq!(aniso.native_filter(), native::Filter::ANISOTROPIC);
        assert_eq!(aniso.to_native().max_anisotropy, 16);
        let shadow = SamplerDescriptor {
            compare_mode: CompareMode::CompareRefToTexture,
            ..Default::default()
        };
        assert_eq!(shadow.native_filter().0, 0x95);
    }

    #[test]
    fn test_static_sampler_translation() {
        let sampler = SamplerDescriptor {
            border_color: [1.0; 4],
            ..SamplerDescriptor::linear_clamp()
        };
        let desc = sampler.to_static(2, 1, native::ShaderVisibility::Pixel);
        assert_eq!(desc.border_color, StaticBorderColor::OpaqueWhite);
        assert_eq!(desc.address_u, native::TextureAddressMode::Clamp);
        assert_eq!(desc.shader_register, 2);
        assert_eq!(desc.register_space, 1);
        assert_eq!(desc.shader_visibility, native::ShaderVisibility::Pixel);
    }

    #[test]
    fn test_descriptor_from_partial_json() {
        let sampler: SamplerDescriptor =
            serde_json::from_str(r#"{ "wrap_u": "Clamp", "max_anisotropy": 4 }"#).unwrap();
        assert_eq!(sampler.wrap_u, WrapMode::Clamp);
        assert_eq!(sampler.wrap_v, WrapMode::Repeat);
        assert_eq!(sampler.max_anisotropy, 4);
    }
}
