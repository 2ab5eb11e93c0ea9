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

//! Command recording and submission.
//!
//! A [`CommandQueue`] hands out [`CommandBuffer`]s that track resource
//! states, bindings and transient allocations while recording, and takes
//! them back for reuse once their fence value completes.

mod buffer;
mod dynamic_heap;
mod mips;
mod queue;
mod upload;

pub use self::buffer::{CommandBuffer, ShaderArgument};
pub(crate) use self::mips::MipGenerator;
pub use self::queue::{CommandQueue, QueueSemaphore};
