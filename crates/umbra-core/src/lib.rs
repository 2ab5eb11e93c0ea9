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

//! # Umbra Core
//!
//! Pipeline state, resource binding and command recording over Direct3D 12
//! semantics.
//!
//! The crate owns the engine-level model (state descriptors, shader
//! signatures, resources, pipeline states, command buffers, queues and the
//! device) and talks to the hardware only through the
//! [`NativeDevice`](renderer::traits::NativeDevice) seam. Concrete native
//! backends live in `umbra-infra`.

#![warn(missing_docs)]

pub mod renderer;
pub mod utils;

pub use renderer::{CommandBuffer, CommandQueue, Device, DeviceDescriptor, RenderError};
