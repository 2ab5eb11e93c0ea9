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

//! GPU queries and their readback.

use crate::renderer::api::native::{
    self, HeapType, NativeHandle, QueryHeapDesc, QueryHeapType, ResourceDesc, ResourceFlags,
    ResourceStates,
};
use crate::renderer::api::QueryType;
use crate::renderer::error::ResourceError;
use crate::renderer::resource::NativeObject;
use crate::renderer::traits::NativeDevice;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

const RESULT_SIZE: u64 = 8;

struct QueryObjects {
    heap: NativeObject,
    readback: NativeObject,
}

/// A heap of GPU queries with a CPU-readable result buffer.
///
/// Timer queries take two timestamps per index; their result is the tick
/// delta, convertible with the queue's timestamp frequency.
pub struct Query {
    device: Arc<dyn NativeDevice>,
    query_type: QueryType,
    count: u32,
    objects: Arc<QueryObjects>,
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("query_type", &self.query_type)
            .field("count", &self.count)
            .field("heap", &self.objects.heap)
            .finish()
    }
}

impl Query {
    pub(crate) fn new(
        device: Arc<dyn NativeDevice>,
        query_type: QueryType,
        count: u32,
        node_mask: u32,
    ) -> Result<Self, ResourceError> {
        if count == 0 {
            return Err(ResourceError::InvalidDescriptor(
                "a query heap needs at least one query".to_string(),
            ));
        }
        let slots = count * slots_per_query(query_type);
        let heap_type = match query_type {
            QueryType::Timer => QueryHeapType::Timestamp,
            QueryType::Occlusion | QueryType::OcclusionPredicate => QueryHeapType::Occlusion,
        };
        let heap = device.create_query_heap(&QueryHeapDesc {
            heap_type,
            count: slots,
            node_mask,
        })?;
        let heap = NativeObject::owned(device.clone(), heap);

        let readback = device.create_committed_resource(
            &ResourceDesc::buffer(u64::from(slots) * RESULT_SIZE, ResourceFlags::NONE),
            HeapType::Readback,
            ResourceStates::COPY_DEST,
            None,
        )?;
        let readback = NativeObject::owned(device.clone(), readback.handle);
        log::debug!("Created {:?} query heap with {} queries", query_type, count);

        Ok(Self {
            device,
            query_type,
            count,
            objects: Arc::new(QueryObjects { heap, readback }),
        })
    }

    /// The kind of queries in the heap.
    pub fn query_type(&self) -> QueryType {
        self.query_type
    }

    /// Number of queries.
    pub fn count(&self) -> u32 {
        self.count
    }

    pub(crate) fn heap(&self) -> NativeHandle {
        self.objects.heap.handle()
    }

    pub(crate) fn readback(&self) -> NativeHandle {
        self.objects.readback.handle()
    }

    pub(crate) fn shared_objects(&self) -> Arc<dyn Any + Send + Sync> {
        self.objects.clone()
    }

    pub(crate) fn slots_per_query(&self) -> u32 {
        slots_per_query(self.query_type)
    }

    pub(crate) fn native_type(&self) -> native::QueryType {
        match self.query_type {
            QueryType::Timer => native::QueryType::Timestamp,
            QueryType::Occlusion => native::QueryType::Occlusion,
            QueryType::OcclusionPredicate => native::QueryType::BinaryOcclusion,
        }
    }

    /// Reads resolved results for `count` queries starting at `start`.
    ///
    /// Only valid once the command buffer that resolved them has completed.
    /// Timer results are tick deltas; occlusion results are sample counts
    /// (or 0/1 for predicates).
    pub fn read_results(&self, start: u32, count: u32) -> Result<Vec<u64>, ResourceError> {
        let end = start.saturating_add(count);
        if end > self.count {
            return Err(ResourceError::OutOfBounds {
                requested: u64::from(end),
                available: u64::from(self.count),
            });
        }
        let per_query = self.slots_per_query();
        let slots = (count * per_query) as usize;
        let mut bytes = vec![0u8; slots * RESULT_SIZE as usize];
        self.device.read_buffer(
            self.readback(),
            u64::from(start * per_query) * RESULT_SIZE,
            &mut bytes,
        )?;
        let values: Vec<u64> = bytes
            .chunks_exact(RESULT_SIZE as usize)
            .map(|chunk| {
                let mut word = [0u8; 8];
                word.copy_from_slice(chunk);
                u64::from_le_bytes(word)
            })
            .collect();

        Ok(match self.query_type {
            QueryType::Timer => values
                .chunks_exact(2)
                .map(|pair| pair[1].saturating_sub(pair[0]))
                .collect(),
            _ => values,
        })
    }

    /// The elapsed time of timer query `index`, in seconds.
    pub fn elapsed_seconds(&self, index: u32, frequency: u64) -> Result<f64, ResourceError> {
        if self.query_type != QueryType::Timer {
            return Err(ResourceError::InvalidDescriptor(format!(
                "{:?} queries do not measure time",
                self.query_type
            )));
        }
        if frequency == 0 {
            return Err(ResourceError::InvalidDescriptor(
                "timestamp frequency is zero".to_string(),
            ));
        }
        let ticks = self.read_results(index, 1)?[0];
        Ok(ticks as f64 / frequency as f64)
    }
}

fn slots_per_query(query_type: QueryType) -> u32 {
    match query_type {
        QueryType::Timer => 2,
        QueryType::Occlusion | QueryType::OcclusionPredicate => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::traits::mock::MockDevice;
    use approx::assert_relative_eq;

    #[test]
    fn test_timer_queries_use_two_slots() {
        let device = MockDevice::new();
        let query = Query::new(device.clone(), QueryType::Timer, 4, 1).unwrap();
        assert_eq!(query.slots_per_query(), 2);
        assert_eq!(query.native_type(), native::QueryType::Timestamp);
        assert_eq!(query.read_results(0, 4).unwrap(), vec![0; 4]);
        assert_relative_eq!(query.elapsed_seconds(3, 1_000_000).unwrap(), 0.0);
        assert!(query.read_results(3, 2).is_err());
    }

    #[test]
    fn test_occlusion_queries() {
        let device = MockDevice::new();
        let query = Query::new(device.clone(), QueryType::OcclusionPredicate, 2, 1).unwrap();
        assert_eq!(query.native_type(), native::QueryType::BinaryOcclusion);
        assert!(query.elapsed_seconds(0, 1_000).is_err());
        assert!(Query::new(device, QueryType::Occlusion, 0, 1).is_err());
    }

    #[test]
    fn test_dropping_releases_heap_and_readback() {
        let device = MockDevice::new();
        let query = Query::new(device.clone(), QueryType::Occlusion, 1, 1).unwrap();
        let (heap, readback) = (query.heap(), query.readback());
        drop(query);
        let released = device.released.lock().unwrap();
        assert!(released.contains(&heap));
        assert!(released.contains(&readback));
    }
}
