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

use crate::renderer::api::native::{self, ColorWriteEnable, SIMULTANEOUS_RENDER_TARGET_COUNT};
use crate::renderer::api::LinearRgba;
use crate::renderer::command::CommandBuffer;
use crate::renderer::error::CommandError;

/// Operation combining the weighted source and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    /// `s + d`.
    Add,
    /// `s - d`.
    Subtract,
    /// `d - s`.
    ReverseSubtract,
    /// `min(s, d)`.
    Min,
    /// `max(s, d)`.
    Max,
}

impl BlendOperation {
    fn to_native(self) -> native::BlendOp {
        match self {
            BlendOperation::Add => native::BlendOp::Add,
            BlendOperation::Subtract => native::BlendOp::Subtract,
            BlendOperation::ReverseSubtract => native::BlendOp::RevSubtract,
            BlendOperation::Min => native::BlendOp::Min,
            BlendOperation::Max => native::BlendOp::Max,
        }
    }
}

/// Weight applied to a blend operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    SrcAlphaSat,
    /// The constant blend factor of the [`BlendState`].
    ConstBlendFactor,
    /// One minus the constant blend factor.
    OneMinusBlendFactor,
    Src1Color,
    OneMinusSrc1Color,
    Src1Alpha,
    OneMinusSrc1Alpha,
}

impl BlendFactor {
    fn to_native(self) -> native::Blend {
        match self {
            BlendFactor::Zero => native::Blend::Zero,
            BlendFactor::One => native::Blend::One,
            BlendFactor::SrcColor => native::Blend::SrcColor,
            BlendFactor::OneMinusSrcColor => native::Blend::InvSrcColor,
            BlendFactor::DstColor => native::Blend::DestColor,
            BlendFactor::OneMinusDstColor => native::Blend::InvDestColor,
            BlendFactor::SrcAlpha => native::Blend::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => native::Blend::InvSrcAlpha,
            BlendFactor::DstAlpha => native::Blend::DestAlpha,
            BlendFactor::OneMinusDstAlpha => native::Blend::InvDestAlpha,
            BlendFactor::SrcAlphaSat => native::Blend::SrcAlphaSat,
            BlendFactor::ConstBlendFactor => native::Blend::BlendFactor,
            BlendFactor::OneMinusBlendFactor => native::Blend::InvBlendFactor,
            BlendFactor::Src1Color => native::Blend::Src1Color,
            BlendFactor::OneMinusSrc1Color => native::Blend::InvSrc1Color,
            BlendFactor::Src1Alpha => native::Blend::Src1Alpha,
            BlendFactor::OneMinusSrc1Alpha => native::Blend::InvSrc1Alpha,
        }
    }
}

/// Logical operation applied instead of blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum LogicOperator {
    /// No operation; the destination is kept.
    None,
    Clear,
    Set,
    Copy,
    CopyInverted,
    Invert,
    And,
    Nand,
    Or,
    Nor,
    Xor,
    Equiv,
    AndReverse,
    AndInverted,
    OrReverse,
    OrInverted,
}

impl LogicOperator {
    fn to_native(self) -> native::LogicOp {
        match self {
            LogicOperator::None => native::LogicOp::Noop,
            LogicOperator::Clear => native::LogicOp::Clear,
            LogicOperator::Set => native::LogicOp::Set,
            LogicOperator::Copy => native::LogicOp::Copy,
            LogicOperator::CopyInverted => native::LogicOp::CopyInverted,
            LogicOperator::Invert => native::LogicOp::Invert,
            LogicOperator::And => native::LogicOp::And,
            LogicOperator::Nand => native::LogicOp::Nand,
            LogicOperator::Or => native::LogicOp::Or,
            LogicOperator::Nor => native::LogicOp::Nor,
            LogicOperator::Xor => native::LogicOp::Xor,
            LogicOperator::Equiv => native::LogicOp::Equiv,
            LogicOperator::AndReverse => native::LogicOp::AndReverse,
            LogicOperator::AndInverted => native::LogicOp::AndInverted,
            LogicOperator::OrReverse => native::LogicOp::OrReverse,
            LogicOperator::OrInverted => native::LogicOp::OrInverted,
        }
    }
}

/// The blend function of one render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendMode {
    /// Enables blending.
    pub blend_enabled: bool,
    /// Enables the logic operator.
    pub logic_op_enabled: bool,
    /// Weight of the source color.
    pub src_factor: BlendFactor,
    /// Weight of the destination color.
    pub dst_factor: BlendFactor,
    /// Color operation.
    pub blend_op: BlendOperation,
    /// Weight of the source alpha.
    pub src_alpha_factor: BlendFactor,
    /// Weight of the destination alpha.
    pub dst_alpha_factor: BlendFactor,
    /// Alpha operation.
    pub alpha_op: BlendOperation,
    /// Logic operator, used when `logic_op_enabled` is set.
    pub logic_op: LogicOperator,
    /// Writes the red channel.
    pub write_red: bool,
    /// Writes the green channel.
    pub write_green: bool,
    /// Writes the blue channel.
    pub write_blue: bool,
    /// Writes the alpha channel.
    pub write_alpha: bool,
}

impl Default for BlendMode {
    fn default() -> Self {
        Self {
            blend_enabled: false,
            logic_op_enabled: false,
            src_factor: BlendFactor::One,
            dst_factor: BlendFactor::Zero,
            blend_op: BlendOperation::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::Zero,
            alpha_op: BlendOperation::Add,
            logic_op: LogicOperator::None,
            write_red: true,
            write_green: true,
            write_blue: true,
            write_alpha: true,
        }
    }
}

impl BlendMode {
    /// Classic `src * a + dst * (1 - a)` alpha blending.
    pub fn alpha_blending() -> Self {
        Self {
            blend_enabled: true,
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::OneMinusSrcAlpha,
            ..Default::default()
        }
    }

    /// The channel write mask.
    pub fn write_mask(&self) -> ColorWriteEnable {
        let mut mask = ColorWriteEnable::EMPTY;
        for (enabled, channel) in [
            (self.write_red, ColorWriteEnable::RED),
            (self.write_green, ColorWriteEnable::GREEN),
            (self.write_blue, ColorWriteEnable::BLUE),
            (self.write_alpha, ColorWriteEnable::ALPHA),
        ] {
            if enabled {
                mask.insert(channel);
            }
        }
        mask
    }

    /// Sets the channel write flags from a write mask.
    pub fn set_write_mask(&mut self, mask: ColorWriteEnable) {
        self.write_red = mask.contains(ColorWriteEnable::RED);
        self.write_green = mask.contains(ColorWriteEnable::GREEN);
        self.write_blue = mask.contains(ColorWriteEnable::BLUE);
        self.write_alpha = mask.contains(ColorWriteEnable::ALPHA);
    }

    fn to_native(self) -> native::RenderTargetBlendDesc {
        native::RenderTargetBlendDesc {
            blend_enable: self.blend_enabled,
            logic_op_enable: self.logic_op_enabled,
            src_blend: self.src_factor.to_native(),
            dest_blend: self.dst_factor.to_native(),
            blend_op: self.blend_op.to_native(),
            src_blend_alpha: self.src_alpha_factor.to_native(),
            dest_blend_alpha: self.dst_alpha_factor.to_native(),
            blend_op_alpha: self.alpha_op.to_native(),
            logic_op: self.logic_op.to_native(),
            render_target_write_mask: self.write_mask().bits(),
        }
    }
}

/// Output-merger blend configuration for up to eight render targets.
#[derive(Debug, Clone)]
pub struct BlendState {
    modes: [BlendMode; SIMULTANEOUS_RENDER_TARGET_COUNT],
    alpha_to_coverage: bool,
    independent_blend: bool,
    sample_mask: u32,
    blend_factor: LinearRgba,
    desc: native::BlendDesc,
    dirty: bool,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            modes: [BlendMode::default(); SIMULTANEOUS_RENDER_TARGET_COUNT],
            alpha_to_coverage: false,
            independent_blend: false,
            sample_mask: native::DEFAULT_SAMPLE_MASK,
            blend_factor: LinearRgba::WHITE,
            desc: native::BlendDesc::default(),
            dirty: true,
        }
    }
}

impl BlendState {
    /// Creates a state with blending disabled on every target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the blend mode of render target 0.
    pub fn set_blend_mode(&mut self, mode: BlendMode) {
        self.modes[0] = mode;
        self.dirty = true;
    }

    /// Sets the blend modes of the first `modes.len()` render targets.
    ///
    /// Extra modes beyond the eighth are ignored.
    pub fn set_blend_modes(&mut self, modes: &[BlendMode]) {
        for (slot, mode) in self.modes.iter_mut().zip(modes) {
            *slot = *mode;
        }
        self.dirty = true;
    }

    /// The blend modes of all render targets, as set.
    pub fn blend_modes(&self) -> &[BlendMode; SIMULTANEOUS_RENDER_TARGET_COUNT] {
        &self.modes
    }

    /// Sets the constant used by [`BlendFactor::ConstBlendFactor`].
    pub fn set_const_blend_factor(&mut self, factor: LinearRgba) {
        self.blend_factor = factor;
        self.dirty = true;
    }

    /// The constant blend factor.
    pub fn const_blend_factor(&self) -> LinearRgba {
        self.blend_factor
    }

    /// Sets the multisample coverage mask.
    pub fn set_sample_mask(&mut self, sample_mask: u32) {
        self.sample_mask = sample_mask;
        self.dirty = true;
    }

    /// The multisample coverage mask.
    pub fn sample_mask(&self) -> u32 {
        self.sample_mask
    }

    /// Enables alpha-to-coverage.
    pub fn set_alpha_coverage(&mut self, enabled: bool) {
        self.alpha_to_coverage = enabled;
        self.dirty = true;
    }

    /// Returns `true` if alpha-to-coverage is enabled.
    pub fn alpha_coverage(&self) -> bool {
        self.alpha_to_coverage
    }

    /// Enables independent blend modes per render target. When disabled,
    /// every target uses the mode of target 0.
    pub fn set_independent_blend(&mut self, enabled: bool) {
        self.independent_blend = enabled;
        self.dirty = true;
    }

    /// Returns `true` if independent blending is enabled.
    pub fn independent_blend(&self) -> bool {
        self.independent_blend
    }

    /// Returns `true` if the native description must be rebuilt.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the native description, rebuilding it if the state is dirty.
    pub fn blend_desc(&mut self) -> native::BlendDesc {
        if self.dirty {
            let first = self.modes[0].to_native();
            let mut render_target = [first; SIMULTANEOUS_RENDER_TARGET_COUNT];
            if self.independent_blend {
                for (desc, mode) in render_target.iter_mut().zip(&self.modes).skip(1) {
                    *desc = mode.to_native();
                }
            }
            self.desc = native::BlendDesc {
                alpha_to_coverage_enable: self.alpha_to_coverage,
                independent_blend_enable: self.independent_blend,
                render_target,
            };
            self.dirty = false;
        }
        self.desc
    }

    /// Binds the constant blend factor on `cmd`.
    pub fn bind(&self, cmd: &mut CommandBuffer) -> Result<(), CommandError> {
        cmd.set_blend_factor(self.blend_factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirty_tracking_is_conservative() {
        let mut state = BlendState::new();
        assert!(state.is_dirty());
        state.blend_desc();
        assert!(!state.is_dirty());

        state.set_blend_mode(BlendMode::default());
        assert!(state.is_dirty());
        state.blend_desc();
        state.set_sample_mask(state.sample_mask());
        assert!(state.is_dirty());
        state.blend_desc();
        state.set_alpha_coverage(false);
        assert!(state.is_dirty());
    }

    #[test]
    fn test_alpha_blend_mode_translates_to_native_factors() {
        let mut state = BlendState::new();
        state.set_blend_mode(BlendMode {
            blend_enabled: true,
            src_factor: BlendFactor::SrcAlpha,
            dst_factor: BlendFactor::OneMinusSrcAlpha,
            ..Default::default()
        });

        let desc = state.blend_desc();
        assert!(desc.render_target[0].blend_enable);
        assert_eq!(desc.render_target[0].src_blend, native::Blend::SrcAlpha);
        assert_eq!(desc.render_target[0].dest_blend, native::Blend::InvSrcAlpha);
    }

    #[test]
    fn test_targets_mirror_target_zero_without_independent_blend() {
        let mut state = BlendState::new();
        let mut modes = [BlendMode::default(); 3];
        modes[0] = BlendMode::alpha_blending();
        modes[1].logic_op_enabled = true;
        modes[1].logic_op = LogicOperator::Xor;
        modes[2].write_red = false;
        state.set_blend_modes(&modes);

        let desc = state.blend_desc();
        assert!(!desc.independent_blend_enable);
        for target in &desc.render_target[1..] {
            assert_eq!(*target, desc.render_target[0]);
        }

        state.set_independent_blend(true);
        let desc = state.blend_desc();
        assert!(desc.render_target[1].logic_op_enable);
        assert_eq!(desc.render_target[1].logic_op, native::LogicOp::Xor);
        assert_eq!(
            desc.render_target[2].render_target_write_mask,
            ColorWriteEnable::ALL.without(ColorWriteEnable::RED).bits()
        );
        assert_eq!(desc.render_target[3], native::RenderTargetBlendDesc::default());
    }

    #[test]
    fn test_write_mask_round_trip() {
        let mut mode = BlendMode::default();
        assert_eq!(mode.write_mask(), ColorWriteEnable::ALL);

        let mask = ColorWriteEnable::GREEN.union(ColorWriteEnable::ALPHA);
        mode.set_write_mask(mask);
        assert!(!mode.write_red && mode.write_green && !mode.write_blue && mode.write_alpha);
        assert_eq!(mode.write_mask(), mask);
        assert_eq!(mode.to_native().render_target_write_mask, 0b1010);
    }

    #[test]
    fn test_operation_and_logic_translation() {
        assert_eq!(BlendOperation::Subtract.to_native(), native::BlendOp::Subtract);
        assert_eq!(
            BlendOperation::ReverseSubtract.to_native(),
            native::BlendOp::RevSubtract
        );
        assert_eq!(LogicOperator::None.to_native(), native::LogicOp::Noop);
        assert_eq!(
            BlendFactor::ConstBlendFactor.to_native(),
            native::Blend::BlendFactor
        );
    }
}
