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

use crate::renderer::api::{native, CompareFunction, StencilOperation};
use crate::renderer::command::CommandBuffer;
use crate::renderer::error::CommandError;

/// Depth test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthMode {
    /// Enables the depth test.
    pub depth_enable: bool,
    /// Enables depth writes.
    pub depth_write: bool,
    /// Comparison against the stored depth.
    pub depth_function: CompareFunction,
}

impl Default for DepthMode {
    fn default() -> Self {
        Self {
            depth_enable: true,
            depth_write: true,
            depth_function: CompareFunction::Less,
        }
    }
}

/// Stencil operations of one face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceOperation {
    /// Operation when the stencil test fails.
    pub stencil_fail: StencilOperation,
    /// Operation when the stencil test passes and the depth test fails.
    pub stencil_pass_depth_fail: StencilOperation,
    /// Operation when both tests pass.
    pub stencil_depth_pass: StencilOperation,
    /// Comparison against the stored stencil value.
    pub stencil_function: CompareFunction,
}

impl Default for FaceOperation {
    fn default() -> Self {
        Self {
            stencil_fail: StencilOperation::Keep,
            stencil_pass_depth_fail: StencilOperation::Keep,
            stencil_depth_pass: StencilOperation::Keep,
            stencil_function: CompareFunction::Always,
        }
    }
}

impl FaceOperation {
    fn to_native(self) -> native::DepthStencilOpDesc {
        native::DepthStencilOpDesc {
            stencil_fail_op: self.stencil_fail.to_native(),
            stencil_depth_fail_op: self.stencil_pass_depth_fail.to_native(),
            stencil_pass_op: self.stencil_depth_pass.to_native(),
            stencil_func: self.stencil_function.to_native(),
        }
    }
}

/// Stencil test configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilMode {
    /// Enables the stencil test.
    pub enabled: bool,
    /// Mask applied when reading the stencil buffer.
    pub read_mask: u8,
    /// Mask applied when writing the stencil buffer.
    pub write_mask: u8,
    /// Reference value of the test, bound as dynamic state.
    pub reference: u32,
    /// Operations of front-facing primitives.
    pub front_face: FaceOperation,
    /// Operations of back-facing primitives.
    pub back_face: FaceOperation,
}

impl Default for StencilMode {
    fn default() -> Self {
        Self {
            enabled: false,
            read_mask: native::DEFAULT_STENCIL_READ_MASK,
            write_mask: native::DEFAULT_STENCIL_WRITE_MASK,
            reference: 0,
            front_face: FaceOperation::default(),
            back_face: FaceOperation::default(),
        }
    }
}

/// Depth and stencil test configuration.
#[derive(Debug, Clone)]
pub struct DepthStencilState {
    depth_mode: DepthMode,
    stencil_mode: StencilMode,
    desc: native::DepthStencilDesc,
    dirty: bool,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_mode: DepthMode::default(),
            stencil_mode: StencilMode::default(),
            desc: native::DepthStencilDesc::default(),
            dirty: true,
        }
    }
}

impl DepthStencilState {
    /// Creates a state with depth test `Less`, depth writes on and stencil off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the depth test configuration.
    pub fn set_depth_mode(&mut self, depth_mode: DepthMode) {
        self.depth_mode = depth_mode;
        self.dirty = true;
    }

    /// The depth test configuration.
    pub fn depth_mode(&self) -> &DepthMode {
        &self.depth_mode
    }

    /// Sets the stencil test configuration.
    pub fn set_stencil_mode(&mut self, stencil_mode: StencilMode) {
        self.stencil_mode = stencil_mode;
        self.dirty = true;
    }

    /// The stencil test configuration.
    pub fn stencil_mode(&self) -> &StencilMode {
        &self.stencil_mode
    }

    /// Returns `true` if the native description must be rebuilt.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the native description, rebuilding it if the state is dirty.
    pub fn depth_stencil_desc(&mut self) -> native::DepthStencilDesc {
        if self.dirty {
            self.desc = native::DepthStencilDesc {
                depth_enable: self.depth_mode.depth_enable,
                depth_write_mask: if self.depth_mode.depth_write {
                    native::DepthWriteMask::All
                } else {
                    native::DepthWriteMask::Zero
                },
                depth_func: self.depth_mode.depth_function.to_native(),
                stencil_enable: self.stencil_mode.enabled,
                stencil_read_mask: self.stencil_mode.read_mask,
                stencil_write_mask: self.stencil_mode.write_mask,
                front_face: self.stencil_mode.front_face.to_native(),
                back_face: self.stencil_mode.back_face.to_native(),
            };
            self.dirty = false;
        }
        self.desc
    }

    /// Binds the stencil reference value on `cmd`.
    pub fn bind(&self, cmd: &mut CommandBuffer) -> Result<(), CommandError> {
        cmd.set_stencil_reference(self.stencil_mode.reference)
    }
}
