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

use crate::renderer::api::{native, CullMode, FillMode, FrontFace, Rect, Viewport};
use crate::renderer::command::CommandBuffer;
use crate::renderer::error::CommandError;

/// Rasterizer configuration together with the viewports and scissor rects
/// bound alongside it.
#[derive(Debug, Clone)]
pub struct RasterizerState {
    front_fill: FillMode,
    back_fill: FillMode,
    cull_mode: CullMode,
    front_face: FrontFace,
    depth_bias: f32,
    slope_bias: f32,
    bias_clamp: f32,
    depth_clip_enabled: bool,
    scissor_enabled: bool,
    multisample_enabled: bool,
    antialiased_line_enabled: bool,
    forced_sample_count: u8,
    conservative_rasterization: bool,
    viewports: Vec<Viewport>,
    scissor_rects: Vec<Rect>,
    desc: native::RasterizerDesc,
    state_dirty: bool,
    viewports_dirty: bool,
    scissor_rects_dirty: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            front_fill: FillMode::Solid,
            back_fill: FillMode::Solid,
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            depth_bias: 0.0,
            slope_bias: 0.0,
            bias_clamp: 0.0,
            depth_clip_enabled: true,
            scissor_enabled: false,
            multisample_enabled: false,
            antialiased_line_enabled: false,
            forced_sample_count: 0,
            conservative_rasterization: false,
            viewports: vec![Viewport::new(1.0, 1.0)],
            scissor_rects: vec![Rect::full()],
            desc: native::RasterizerDesc::default(),
            state_dirty: true,
            viewports_dirty: true,
            scissor_rects_dirty: true,
        }
    }
}

impl RasterizerState {
    /// Creates a rasterizer state with solid fill, back-face culling and
    /// counter-clockwise front faces.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fill mode of front and back faces.
    ///
    /// The native rasterizer has a single fill mode; the front face mode is used.
    pub fn set_fill_mode(&mut self, front: FillMode, back: FillMode) {
        self.front_fill = front;
        self.back_fill = back;
        self.state_dirty = true;
    }

    /// The fill modes of front and back faces.
    pub fn fill_mode(&self) -> (FillMode, FillMode) {
        (self.front_fill, self.back_fill)
    }

    /// Sets the faces discarded by the rasterizer.
    pub fn set_cull_mode(&mut self, cull_mode: CullMode) {
        self.cull_mode = cull_mode;
        self.state_dirty = true;
    }

    /// The faces discarded by the rasterizer.
    pub fn cull_mode(&self) -> CullMode {
        self.cull_mode
    }

    /// Sets the winding order of front faces.
    pub fn set_front_facing(&mut self, front_face: FrontFace) {
        self.front_face = front_face;
        self.state_dirty = true;
    }

    /// The winding order of front faces.
    pub fn front_facing(&self) -> FrontFace {
        self.front_face
    }

    /// Sets the constant depth bias, slope-scaled bias and bias clamp.
    ///
    /// The native constant bias is an integer; the fractional part is dropped.
    pub fn set_depth_bias(&mut self, depth_bias: f32, slope_bias: f32, bias_clamp: f32) {
        self.depth_bias = depth_bias;
        self.slope_bias = slope_bias;
        self.bias_clamp = bias_clamp;
        self.state_dirty = true;
    }

    /// The constant depth bias, slope-scaled bias and bias clamp.
    pub fn depth_bias(&self) -> (f32, f32, f32) {
        (self.depth_bias, self.slope_bias, self.bias_clamp)
    }

    /// Enables clipping against the near and far planes.
    pub fn set_depth_clip_enabled(&mut self, enabled: bool) {
        self.depth_clip_enabled = enabled;
        self.state_dirty = true;
    }

    /// Returns `true` if depth clipping is enabled.
    pub fn depth_clip_enabled(&self) -> bool {
        self.depth_clip_enabled
    }

    /// Replaces the viewports with a single one.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.set_viewports(&[viewport]);
    }

    /// Replaces the viewports.
    pub fn set_viewports(&mut self, viewports: &[Viewport]) {
        self.viewports = viewports.to_vec();
        self.viewports_dirty = true;
    }

    /// The viewports.
    pub fn viewports(&self) -> &[Viewport] {
        &self.viewports
    }

    /// Enables the scissor test. When disabled, a full-range scissor rect is bound.
    pub fn set_scissor_enabled(&mut self, enabled: bool) {
        self.scissor_enabled = enabled;
        self.scissor_rects_dirty = true;
    }

    /// Returns `true` if the scissor test is enabled.
    pub fn scissor_enabled(&self) -> bool {
        self.scissor_enabled
    }

    /// Replaces the scissor rects with a single one.
    pub fn set_scissor_rect(&mut self, rect: Rect) {
        self.set_scissor_rects(&[rect]);
    }

    /// Replaces the scissor rects.
    pub fn set_scissor_rects(&mut self, rects: &[Rect]) {
        self.scissor_rects = rects.to_vec();
        self.scissor_rects_dirty = true;
    }

    /// The scissor rects.
    pub fn scissor_rects(&self) -> &[Rect] {
        &self.scissor_rects
    }

    /// Enables multisample rasterization.
    pub fn set_multisample_enabled(&mut self, enabled: bool) {
        self.multisample_enabled = enabled;
        self.state_dirty = true;
    }

    /// Returns `true` if multisample rasterization is enabled.
    pub fn multisample_enabled(&self) -> bool {
        self.multisample_enabled
    }

    /// Enables line antialiasing.
    pub fn set_antialiased_line_enabled(&mut self, enabled: bool) {
        self.antialiased_line_enabled = enabled;
        self.state_dirty = true;
    }

    /// Returns `true` if line antialiasing is enabled.
    pub fn antialiased_line_enabled(&self) -> bool {
        self.antialiased_line_enabled
    }

    /// Forces the sample count used while rasterizing (0 disables forcing).
    pub fn set_forced_sample_count(&mut self, count: u8) {
        self.forced_sample_count = count;
        self.state_dirty = true;
    }

    /// The forced sample count.
    pub fn forced_sample_count(&self) -> u8 {
        self.forced_sample_count
    }

    /// Enables conservative rasterization.
    pub fn set_conservative_rasterization_enabled(&mut self, enabled: bool) {
        self.conservative_rasterization = enabled;
        self.state_dirty = true;
    }

    /// Returns `true` if conservative rasterization is enabled.
    pub fn conservative_rasterization_enabled(&self) -> bool {
        self.conservative_rasterization
    }

    /// Returns `true` if the native description must be rebuilt.
    ///
    /// Viewport and scissor changes are dynamic state and do not count.
    pub fn is_dirty(&self) -> bool {
        self.state_dirty
    }

    /// Returns `true` if the viewports changed since the last [`bind`](Self::bind).
    pub fn viewports_dirty(&self) -> bool {
        self.viewports_dirty
    }

    /// Returns `true` if the scissor rects changed since the last [`bind`](Self::bind).
    pub fn scissor_rects_dirty(&self) -> bool {
        self.scissor_rects_dirty
    }

    /// Returns the native description, rebuilding it if the state is dirty.
    pub fn rasterizer_desc(&mut self) -> native::RasterizerDesc {
        if self.state_dirty {
            self.desc = native::RasterizerDesc {
                fill_mode: self.front_fill.to_native(),
                cull_mode: self.cull_mode.to_native(),
                front_counter_clockwise: self.front_face == FrontFace::CounterClockwise,
                depth_bias: self.depth_bias as i32,
                depth_bias_clamp: self.bias_clamp,
                slope_scaled_depth_bias: self.slope_bias,
                depth_clip_enable: self.depth_clip_enabled,
                multisample_enable: self.multisample_enabled,
                antialiased_line_enable: self.antialiased_line_enabled,
                forced_sample_count: u32::from(self.forced_sample_count),
                conservative_raster: if self.conservative_rasterization {
                    native::ConservativeRasterizationMode::On
                } else {
                    native::ConservativeRasterizationMode::Off
                },
            };
            self.state_dirty = false;
        }
        self.desc
    }

    /// Binds the viewports and scissor rects on `cmd`.
    pub fn bind(&mut self, cmd: &mut CommandBuffer) -> Result<(), CommandError> {
        cmd.set_viewports(&self.viewports)?;
        if self.scissor_enabled {
            cmd.set_scissor_rects(&self.scissor_rects)?;
        } else {
            cmd.set_scissor_rects(&[Rect::full()])?;
        }
        self.viewports_dirty = false;
        self.scissor_rects_dirty = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setters_mark_dirty_and_desc_clears() {
        let mut state = RasterizerState::new();
        assert!(state.is_dirty());
        state.rasterizer_desc();
        assert!(!state.is_dirty());

        state.set_cull_mode(CullMode::Back);
        assert!(state.is_dirty(), "Same value still marks dirty");
        state.rasterizer_desc();

        state.set_depth_clip_enabled(true);
        assert!(state.is_dirty());
        state.rasterizer_desc();
        state.set_forced_sample_count(0);
        assert!(state.is_dirty());
    }

    #[test]
    fn test_viewport_changes_do_not_dirty_the_native_state() {
        let mut state = RasterizerState::new();
        state.rasterizer_desc();
        state.set_viewport(Viewport::new(1280.0, 720.0));
        state.set_scissor_rect(Rect::new(64, 64));
        assert!(!state.is_dirty());
        assert!(state.viewports_dirty());
        assert!(state.scissor_rects_dirty());
    }

    #[test]
    fn test_native_translation() {
        let mut state = RasterizerState::new();
        state.set_fill_mode(FillMode::Wireframe, FillMode::Solid);
        state.set_cull_mode(CullMode::None);
        state.set_front_facing(FrontFace::Clockwise);
        state.set_depth_bias(2.75, 1.5, 0.25);
        state.set_conservative_rasterization_enabled(true);

        let desc = state.rasterizer_desc();
        assert_eq!(desc.fill_mode, native::FillMode::Wireframe);
        assert_eq!(desc.cull_mode, native::CullMode::None);
        assert!(!desc.front_counter_clockwise);
        assert_eq!(desc.depth_bias, 2);
        approx::assert_relative_eq!(desc.slope_scaled_depth_bias, 1.5);
        approx::assert_relative_eq!(desc.depth_bias_clamp, 0.25);
        assert_eq!(
            desc.conservative_raster,
            native::ConservativeRasterizationMode::On
        );
    }

    #[test]
    fn test_default_matches_native_default() {
        let mut state = RasterizerState::new();
        let desc = state.rasterizer_desc();
        assert_eq!(desc, native::RasterizerDesc {
            front_counter_clockwise: true,
            ..native::RasterizerDesc::default()
        });
    }
}
