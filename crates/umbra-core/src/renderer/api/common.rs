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

//! Common value types shared by the rendering API.

use super::native;

/// Specifies the data type of indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// Indices are 16-bit unsigned integers.
    Uint16,
    /// Indices are 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Size of one index in bytes.
    pub const fn size(&self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }

    /// Index format of indices `size` bytes wide, if supported.
    pub const fn from_size(size: u32) -> Option<Self> {
        match size {
            2 => Some(IndexFormat::Uint16),
            4 => Some(IndexFormat::Uint32),
            _ => None,
        }
    }

    /// The native index format.
    pub fn to_native(self) -> native::Format {
        match self {
            IndexFormat::Uint16 => native::Format::R16Uint,
            IndexFormat::Uint32 => native::Format::R32Uint,
        }
    }
}

/// The number of samples per pixel for Multisample Anti-Aliasing (MSAA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleCount {
    /// 1 sample per pixel (MSAA disabled).
    #[default]
    X1,
    /// 2 samples per pixel.
    X2,
    /// 4 samples per pixel.
    X4,
    /// 8 samples per pixel.
    X8,
    /// 16 samples per pixel.
    X16,
}

impl SampleCount {
    /// The number of samples.
    pub const fn count(&self) -> u32 {
        match self {
            SampleCount::X1 => 1,
            SampleCount::X2 => 2,
            SampleCount::X4 => 4,
            SampleCount::X8 => 8,
            SampleCount::X16 => 16,
        }
    }

    /// Returns `true` for more than one sample per pixel.
    pub const fn is_multisampled(&self) -> bool {
        !matches!(self, SampleCount::X1)
    }
}

/// Defines the memory format of pixels in a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// One 8-bit unsigned normalized component.
    R8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA).
    Rgba8Unorm,
    /// Four 8-bit unsigned normalized components (RGBA) in the sRGB color space.
    Rgba8UnormSrgb,
    /// Four 8-bit unsigned normalized components (BGRA). A common swapchain format.
    Bgra8Unorm,
    /// Four 8-bit unsigned normalized components (BGRA) in the sRGB color space.
    Bgra8UnormSrgb,
    /// 10-bit RGB with a 2-bit alpha.
    Rgb10a2Unorm,
    /// Packed 11/11/10-bit float RGB.
    Rg11b10Float,
    /// One 16-bit float component.
    R16Float,
    /// Two 16-bit float components.
    Rg16Float,
    /// Four 16-bit float components.
    Rgba16Float,
    /// One 32-bit float component.
    R32Float,
    /// One 32-bit unsigned integer component.
    R32Uint,
    /// Two 32-bit float components.
    Rg32Float,
    /// Four 32-bit float components.
    Rgba32Float,
    /// A 16-bit unsigned normalized depth format.
    Depth16Unorm,
    /// A 24-bit unsigned normalized depth format with an 8-bit stencil component.
    Depth24PlusStencil8,
    /// A 32-bit float depth format.
    Depth32Float,
    /// A 32-bit float depth format with an 8-bit stencil component.
    Depth32FloatStencil8,
}

impl TextureFormat {
    /// Returns the size in bytes of a single pixel for this format.
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::R8Unorm => 1,
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb
            | TextureFormat::Rgb10a2Unorm
            | TextureFormat::Rg11b10Float => 4,
            TextureFormat::R16Float => 2,
            TextureFormat::Rg16Float => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::R32Float | TextureFormat::R32Uint => 4,
            TextureFormat::Rg32Float => 8,
            TextureFormat::Rgba32Float => 16,
            TextureFormat::Depth16Unorm => 2,
            TextureFormat::Depth24PlusStencil8 | TextureFormat::Depth32Float => 4,
            TextureFormat::Depth32FloatStencil8 => 8,
        }
    }

    /// Returns `true` for depth (and depth/stencil) formats.
    pub fn is_depth(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth16Unorm
                | TextureFormat::Depth24PlusStencil8
                | TextureFormat::Depth32Float
                | TextureFormat::Depth32FloatStencil8
        )
    }

    /// Returns `true` for formats with a stencil plane.
    pub fn has_stencil(&self) -> bool {
        matches!(
            self,
            TextureFormat::Depth24PlusStencil8 | TextureFormat::Depth32FloatStencil8
        )
    }

    /// Returns `true` for formats stored in the sRGB color space.
    pub fn is_srgb(&self) -> bool {
        matches!(
            self,
            TextureFormat::Rgba8UnormSrgb | TextureFormat::Bgra8UnormSrgb
        )
    }

    /// The native format of unordered access views, which are never sRGB.
    pub fn unordered_access_format(self) -> native::Format {
        match self {
            TextureFormat::Rgba8UnormSrgb => native::Format::R8G8B8A8Unorm,
            TextureFormat::Bgra8UnormSrgb => native::Format::B8G8R8A8Unorm,
            other => other.to_native(),
        }
    }

    /// The native format of render target and depth-stencil views.
    pub fn to_native(self) -> native::Format {
        match self {
            TextureFormat::R8Unorm => native::Format::R8Unorm,
            TextureFormat::Rgba8Unorm => native::Format::R8G8B8A8Unorm,
            TextureFormat::Rgba8UnormSrgb => native::Format::R8G8B8A8UnormSrgb,
            TextureFormat::Bgra8Unorm => native::Format::B8G8R8A8Unorm,
            TextureFormat::Bgra8UnormSrgb => native::Format::B8G8R8A8UnormSrgb,
            TextureFormat::Rgb10a2Unorm => native::Format::R10G10B10A2Unorm,
            TextureFormat::Rg11b10Float => native::Format::R11G11B10Float,
            TextureFormat::R16Float => native::Format::R16Float,
            TextureFormat::Rg16Float => native::Format::R16G16Float,
            TextureFormat::Rgba16Float => native::Format::R16G16B16A16Float,
            TextureFormat::R32Float => native::Format::R32Float,
            TextureFormat::R32Uint => native::Format::R32Uint,
            TextureFormat::Rg32Float => native::Format::R32G32Float,
            TextureFormat::Rgba32Float => native::Format::R32G32B32A32Float,
            TextureFormat::Depth16Unorm => native::Format::D16Unorm,
            TextureFormat::Depth24PlusStencil8 => native::Format::D24UnormS8Uint,
            TextureFormat::Depth32Float => native::Format::D32Float,
            TextureFormat::Depth32FloatStencil8 => native::Format::D32FloatS8X24Uint,
        }
    }

    /// The native format of the resource allocation.
    ///
    /// Depth formats read by shaders are allocated typeless so both a
    /// depth-stencil view and a shader resource view can be created.
    pub fn resource_format(self, shader_readable: bool) -> native::Format {
        if !shader_readable {
            return self.to_native();
        }
        match self {
            TextureFormat::Depth16Unorm => native::Format::R16Typeless,
            TextureFormat::Depth24PlusStencil8 => native::Format::R24G8Typeless,
            TextureFormat::Depth32Float => native::Format::R32Typeless,
            TextureFormat::Depth32FloatStencil8 => native::Format::R32G8X24Typeless,
            other => other.to_native(),
        }
    }

    /// The native format of shader resource views.
    pub fn shader_resource_format(self) -> native::Format {
        match self {
            TextureFormat::Depth16Unorm => native::Format::R16Unorm,
            TextureFormat::Depth24PlusStencil8 => native::Format::R24UnormX8Typeless,
            TextureFormat::Depth32Float => native::Format::R32Float,
            TextureFormat::Depth32FloatStencil8 => native::Format::R32FloatX8X24Typeless,
            other => other.to_native(),
        }
    }
}

/// A 3D extent (width, height, depth or array layers).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3D {
    /// Width in texels.
    pub width: u32,
    /// Height in texels.
    pub height: u32,
    /// Depth in texels, or array layer count for 2D textures.
    pub depth_or_array_layers: u32,
}

/// A viewport in render-target pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
    /// Minimum depth.
    pub min_depth: f32,
    /// Maximum depth.
    pub max_depth: f32,
}

impl Viewport {
    /// A viewport covering `width` x `height` with the full depth range.
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    /// Translates to `D3D12_VIEWPORT`.
    pub fn to_native(&self) -> native::Viewport {
        native::Viewport {
            top_left_x: self.x,
            top_left_y: self.y,
            width: self.width,
            height: self.height,
            min_depth: self.min_depth,
            max_depth: self.max_depth,
        }
    }
}

/// A scissor rectangle in render-target pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width.
    pub width: i32,
    /// Height.
    pub height: i32,
}

impl Rect {
    /// A rectangle at the origin.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
        }
    }

    /// Translates to `D3D12_RECT`.
    pub fn to_native(&self) -> native::Rect {
        native::Rect {
            left: self.x,
            top: self.y,
            right: self.x.saturating_add(self.width),
            bottom: self.y.saturating_add(self.height),
        }
    }

    /// The rectangle covering the whole addressable viewport range.
    pub fn full() -> Self {
        Self::new(native::VIEWPORT_BOUNDS_MAX, native::VIEWPORT_BOUNDS_MAX)
    }
}

/// A linear RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LinearRgba {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl LinearRgba {
    /// Opaque black.
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    /// Creates a color from its components.
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// The color as an `[r, g, b, a]` array.
    pub const fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_depth_formats_have_typeless_resources() {
        assert_eq!(
            TextureFormat::Depth32Float.resource_format(true),
            native::Format::R32Typeless
        );
        assert_eq!(
            TextureFormat::Depth32Float.resource_format(false),
            native::Format::D32Float
        );
        assert_eq!(
            TextureFormat::Depth24PlusStencil8.shader_resource_format(),
            native::Format::R24UnormX8Typeless
        );
        assert_eq!(
            TextureFormat::Rgba8Unorm.resource_format(true),
            native::Format::R8G8B8A8Unorm
        );
        assert!(TextureFormat::Depth24PlusStencil8.has_stencil());
        assert!(!TextureFormat::Depth32Float.has_stencil());
    }

    #[test]
    fn test_rect_to_native() {
        let rect = Rect {
            x: 10,
            y: 20,
            width: 100,
            height: 50,
        };
        assert_eq!(
            rect.to_native(),
            native::Rect {
                left: 10,
                top: 20,
                right: 110,
                bottom: 70
            }
        );
    }

    #[test]
    fn test_index_format_sizes() {
        assert_eq!(IndexFormat::from_size(2), Some(IndexFormat::Uint16));
        assert_eq!(IndexFormat::from_size(4), Some(IndexFormat::Uint32));
        assert_eq!(IndexFormat::from_size(8), None);
        assert_eq!(IndexFormat::Uint32.to_native(), native::Format::R32Uint);
    }
}
