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

use super::command::HeadlessCommandList;
use super::state::HeadlessState;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use umbra_core::renderer::api::native::{CommandListType, NativeHandle};
use umbra_core::renderer::{NativeCommandList, NativeError, NativeQueue};

/// Timestamp ticks are nanoseconds.
pub const HEADLESS_TIMESTAMP_FREQUENCY: u64 = 1_000_000_000;

/// A queue of a [`HeadlessDevice`](super::HeadlessDevice).
///
/// Submitted lists run to completion on the calling thread, so every signal
/// completes immediately.
#[derive(Debug)]
pub struct HeadlessQueue {
    state: Arc<HeadlessState>,
    list_type: CommandListType,
    fence: NativeHandle,
    completed: Arc<AtomicU64>,
}

impl HeadlessQueue {
    pub(crate) fn new(
        state: Arc<HeadlessState>,
        list_type: CommandListType,
        fence: NativeHandle,
        completed: Arc<AtomicU64>,
    ) -> Self {
        Self {
            state,
            list_type,
            fence,
            completed,
        }
    }
}

impl Drop for HeadlessQueue {
    fn drop(&mut self) {
        self.state.objects.lock().unwrap().remove(&self.fence);
        self.state.fences.lock().unwrap().remove(&self.fence);
    }
}

impl NativeQueue for HeadlessQueue {
    fn list_type(&self) -> CommandListType {
        self.list_type
    }

    fn execute_command_list(&self, list: &mut dyn NativeCommandList) -> Result<(), NativeError> {
        self.state.check_alive()?;
        let list = list
            .as_any()
            .downcast_ref::<HeadlessCommandList>()
            .ok_or_else(|| {
                NativeError::InvalidArgument(
                    "command list was not created by the headless device".to_string(),
                )
            })?;
        if list.list_type() != self.list_type {
            return Err(NativeError::InvalidArgument(format!(
                "a {:?} command list cannot run on a {:?} queue",
                list.list_type(),
                self.list_type
            )));
        }
        if list.is_open() {
            return Err(NativeError::InvalidArgument(
                "command list must be closed before execution".to_string(),
            ));
        }
        list.replay();
        self.state.stats.submissions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn signal(&self, value: u64) -> Result<(), NativeError> {
        self.state.check_alive()?;
        self.completed.fetch_max(value, Ordering::AcqRel);
        Ok(())
    }

    fn fence(&self) -> NativeHandle {
        self.fence
    }

    fn completed_value(&self) -> u64 {
        self.completed.load(Ordering::Acquire)
    }

    fn wait_for_value(&self, value: u64) -> Result<(), NativeError> {
        if self.completed_value() < value {
            return Err(NativeError::InvalidArgument(format!(
                "fence value {value} was never signaled and would block forever"
            )));
        }
        Ok(())
    }

    fn wait_for_fence(&self, fence: NativeHandle, value: u64) -> Result<(), NativeError> {
        let completed = self
            .state
            .fences
            .lock()
            .unwrap()
            .get(&fence)
            .cloned()
            .ok_or(NativeError::InvalidHandle(fence.0))?;
        if completed.load(Ordering::Acquire) < value {
            return Err(NativeError::InvalidArgument(format!(
                "{fence:?} has not reached {value}; headless queues cannot wait for later work"
            )));
        }
        Ok(())
    }

    fn timestamp_frequency(&self) -> Result<u64, NativeError> {
        Ok(HEADLESS_TIMESTAMP_FREQUENCY)
    }
}
