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

//! A CPU-only implementation of the native device seam.
//!
//! The headless backend lets the engine run without a GPU: tests and tools
//! get real resource memory, fence values, query results and a validation
//! layer that checks the barriers the engine records.

mod command;
mod device;
mod queue;
mod state;

pub use self::command::HeadlessCommandList;
pub use self::device::HeadlessDevice;
pub use self::queue::{HeadlessQueue, HEADLESS_TIMESTAMP_FREQUENCY};
pub use self::state::HeadlessStats;
