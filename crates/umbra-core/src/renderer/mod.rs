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

//! The rendering core: state descriptors, shader signatures, resources,
//! pipeline states, command recording and the device.

pub mod api;
pub mod command;
pub mod descriptor;
pub mod device;
pub mod error;
pub mod indirect;
pub mod observer;
pub mod pipeline;
pub mod query;
pub mod render_target;
pub mod resource;
pub mod shader;
pub mod signature;
pub mod state;
pub mod traits;

pub use self::api::*;
pub use self::command::{CommandBuffer, CommandQueue, QueueSemaphore, ShaderArgument};
pub use self::descriptor::DescriptorAllocation;
pub use self::device::{Device, DeviceDescriptor};
pub use self::error::{
    CommandError, NativeError, PipelineError, RenderError, ResourceError, SignatureError,
};
pub use self::indirect::IndirectCommandSignature;
pub use self::observer::{DirtyFlag, InvalidationList};
pub use self::pipeline::{ComputePipelineState, GraphicsPipelineState};
pub use self::query::Query;
pub use self::render_target::RenderTarget;
pub use self::resource::{BufferId, ResourceId, SamplerId, TextureId};
pub use self::shader::Shader;
pub use self::signature::{ShaderParameter, ShaderSignature};
pub use self::state::{BlendState, DepthStencilState, RasterizerState};
pub use self::traits::{NativeCommandList, NativeDevice, NativeQueue, ShaderSourceWatcher};
