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

use super::CommandBuffer;
use crate::renderer::api::native::NativeHandle;
use crate::renderer::api::QueueType;
use crate::renderer::device::DeviceContext;
use crate::renderer::error::{CommandError, NativeError};
use crate::renderer::traits::NativeQueue;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A fence value another queue can wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueSemaphore {
    /// The fence of the signaling queue.
    pub fence: NativeHandle,
    /// The value the fence reaches once the signaled work completes.
    pub value: u64,
}

/// A hardware queue with its fence and its pool of command buffers.
///
/// Executed command buffers wait in the in-flight list until the fence value
/// they were submitted with completes; [`command_buffer`](Self::command_buffer)
/// then hands them out again.
pub struct CommandQueue {
    context: Arc<DeviceContext>,
    queue_type: QueueType,
    native: Box<dyn NativeQueue>,
    next_fence_value: AtomicU64,
    in_flight: Mutex<VecDeque<(u64, CommandBuffer)>>,
}

impl fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandQueue")
            .field("queue_type", &self.queue_type)
            .field("last_signaled", &self.last_signaled_value())
            .field("completed", &self.completed_fence_value())
            .finish()
    }
}

impl CommandQueue {
    pub(crate) fn new(
        context: Arc<DeviceContext>,
        queue_type: QueueType,
    ) -> Result<Self, NativeError> {
        let native = context
            .native
            .create_command_queue(queue_type.to_native())?;
        log::debug!("Created {:?} command queue", queue_type);
        Ok(Self {
            context,
            queue_type,
            native,
            next_fence_value: AtomicU64::new(1),
            in_flight: Mutex::new(VecDeque::new()),
        })
    }

    /// The kind of work the queue accepts.
    pub fn queue_type(&self) -> QueueType {
        self.queue_type
    }

    /// Returns a command buffer that is already recording.
    ///
    /// Reuses the oldest in-flight buffer if the GPU has finished with it,
    /// otherwise creates a new one.
    pub fn command_buffer(&self) -> Result<CommandBuffer, CommandError> {
        let completed = self.completed_fence_value();
        let recycled = {
            let mut in_flight = self.in_flight.lock().unwrap();
            match in_flight.front() {
                Some((value, _)) if *value <= completed => in_flight.pop_front(),
                _ => None,
            }
        };
        let mut buffer = match recycled {
            Some((_, buffer)) => buffer,
            None => {
                log::trace!("Allocating a new {:?} command buffer", self.queue_type);
                CommandBuffer::new(self.context.clone(), self.queue_type)?
            }
        };
        buffer.begin()?;
        Ok(buffer)
    }

    /// Ends `buffer` if needed, submits it and signals the fence.
    ///
    /// Returns the fence value that marks the buffer's completion.
    pub fn execute_command_buffer(&self, mut buffer: CommandBuffer) -> Result<u64, CommandError> {
        if buffer.queue_type() != self.queue_type {
            return Err(CommandError::InvalidArgument(format!(
                "a {:?} command buffer cannot run on a {:?} queue",
                buffer.queue_type(),
                self.queue_type
            )));
        }
        if buffer.is_recording() {
            buffer.end()?;
        }
        self.native.execute_command_list(buffer.native_list_mut())?;
        let value = self.signal()?;
        self.in_flight.lock().unwrap().push_back((value, buffer));
        Ok(value)
    }

    /// Signals the next fence value and returns it.
    pub fn signal(&self) -> Result<u64, NativeError> {
        let value = self.next_fence_value.fetch_add(1, Ordering::AcqRel);
        self.native.signal(value)?;
        Ok(value)
    }

    /// The last fence value signaled.
    pub fn last_signaled_value(&self) -> u64 {
        self.next_fence_value.load(Ordering::Acquire) - 1
    }

    /// The last fence value the GPU has reached.
    pub fn completed_fence_value(&self) -> u64 {
        self.native.completed_value()
    }

    /// Returns `true` once the GPU has reached `value`.
    pub fn is_fence_complete(&self, value: u64) -> bool {
        self.completed_fence_value() >= value
    }

    /// Blocks until the GPU reaches `value`.
    pub fn wait_for_fence_value(&self, value: u64) -> Result<(), NativeError> {
        if self.is_fence_complete(value) {
            return Ok(());
        }
        self.native.wait_for_value(value)
    }

    /// Signals the fence and waits until all submitted work completes, then
    /// releases every in-flight reference.
    pub fn flush(&self) -> Result<(), NativeError> {
        let value = self.signal()?;
        self.wait_for_fence_value(value)?;
        for (_, buffer) in self.in_flight.lock().unwrap().iter_mut() {
            buffer.release_references();
        }
        Ok(())
    }

    /// Signals the fence and returns a semaphore other queues can wait on.
    pub fn signal_semaphore(&self) -> Result<QueueSemaphore, NativeError> {
        let value = self.signal()?;
        Ok(QueueSemaphore {
            fence: self.native.fence(),
            value,
        })
    }

    /// Makes the GPU wait for `semaphore` before running later submissions.
    pub fn wait_semaphore(&self, semaphore: &QueueSemaphore) -> Result<(), NativeError> {
        self.native.wait_for_fence(semaphore.fence, semaphore.value)
    }

    /// Ticks per second of the queue's timestamp counter.
    pub fn timestamp_frequency(&self) -> Result<u64, NativeError> {
        self.native.timestamp_frequency()
    }

    /// Number of submitted buffers not yet handed out again.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::ResourceState;
    use crate::renderer::resource::BufferDescriptor;
    use crate::renderer::traits::mock::MockDevice;
    use crate::renderer::{Device, DeviceDescriptor};

    #[test]
    fn test_fence_values_increase() {
        let device = Device::new(MockDevice::new(), DeviceDescriptor::default()).unwrap();
        let queue = device.direct_queue();
        let first = queue.signal().unwrap();
        let second = queue.signal().unwrap();
        assert!(second > first);
        assert_eq!(queue.last_signaled_value(), second);
        assert!(queue.is_fence_complete(second));
        queue.wait_for_fence_value(second).unwrap();
    }

    #[test]
    fn test_completed_buffers_are_recycled() {
        let device = Device::new(MockDevice::new(), DeviceDescriptor::default()).unwrap();
        let buffer = device
            .create_buffer(&BufferDescriptor::structured("data", 4, 16))
            .unwrap();
        let queue = device.direct_queue();

        let mut cmd = queue.command_buffer().unwrap();
        cmd.transition_resource(buffer, ResourceState::COPY_DEST, false)
            .unwrap();
        assert_eq!(cmd.referenced_resource_count(), 1);
        let value = queue.execute_command_buffer(cmd).unwrap();
        assert_eq!(queue.in_flight_count(), 1);
        assert!(queue.is_fence_complete(value));

        let cmd = queue.command_buffer().unwrap();
        assert_eq!(queue.in_flight_count(), 0);
        assert!(cmd.is_recording());
        assert_eq!(cmd.referenced_resource_count(), 0);
        assert_eq!(cmd.pending_barrier_count(), 0);
    }

    #[test]
    fn test_semaphores_carry_the_fence() {
        let device = Device::new(MockDevice::new(), DeviceDescriptor::default()).unwrap();
        let compute = device.queue(QueueType::Compute);
        let semaphore = compute.signal_semaphore().unwrap();
        assert!(!semaphore.fence.is_null());
        assert_eq!(semaphore.value, compute.last_signaled_value());
        device.direct_queue().wait_semaphore(&semaphore).unwrap();
    }

    #[test]
    fn test_queue_type_mismatch_is_rejected() {
        let device = Device::new(MockDevice::new(), DeviceDescriptor::default()).unwrap();
        let cmd = device.queue(QueueType::Copy).command_buffer().unwrap();
        assert!(matches!(
            device.direct_queue().execute_command_buffer(cmd),
            Err(CommandError::InvalidArgument(_))
        ));
    }
}
