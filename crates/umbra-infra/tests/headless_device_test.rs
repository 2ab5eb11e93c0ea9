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

use anyhow::Result;
use approx::assert_relative_eq;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use umbra_core::renderer::resource::{BufferDescriptor, TextureDescriptor, TextureUsage};
use umbra_core::renderer::shader::ShaderDescriptor;
use umbra_core::renderer::{
    Device, DeviceDescriptor, DeviceSettings, Extent3D, QueryType, QueueType, ResourceState,
    ShaderParameter, ShaderSourceWatcher, ShaderType,
};
use umbra_infra::{FileChangeRouter, HeadlessDevice};

fn init_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .is_test(true)
        .try_init();
}

fn validating_settings() -> DeviceSettings {
    DeviceSettings {
        validate_resource_states: true,
        ..Default::default()
    }
}

fn headless_device() -> Result<(Arc<HeadlessDevice>, Device)> {
    init_logger();
    let native = HeadlessDevice::new();
    let device = Device::new(
        native.clone(),
        DeviceDescriptor {
            settings: validating_settings(),
            mip_shaders: Some(std::array::from_fn(|i| Arc::from(vec![i as u8 + 1; 16]))),
            ..Default::default()
        },
    )?;
    Ok((native, device))
}

#[test]
fn test_uploaded_data_reaches_the_readback_buffer() -> Result<()> {
    let (native, device) = headless_device()?;
    let values: [u32; 8] = [1, 2, 3, 5, 8, 13, 21, 34];
    let size = std::mem::size_of_val(&values) as u32;

    let mut cmd = device.direct_queue().command_buffer()?;
    let buffer = device.create_buffer_with_data(
        &BufferDescriptor::byte_address("fibonacci", size),
        bytemuck::cast_slice(&values),
        &mut cmd,
    )?;
    let readback = device.create_buffer(&BufferDescriptor::readback("fibonacci readback", size as u64))?;
    cmd.copy_resource(readback, buffer)?;
    let fence = device.direct_queue().execute_command_buffer(cmd)?;
    device.direct_queue().wait_for_fence_value(fence)?;

    let mut out = vec![0u8; size as usize];
    device.read_buffer(readback, 0, &mut out)?;
    let read: Vec<u32> = out
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned)
        .collect();
    assert_eq!(read, values);
    assert_eq!(device.resource_state(buffer)?, ResourceState::COPY_SRC);
    assert!(
        native.validation_messages().is_empty(),
        "{:?}",
        native.validation_messages()
    );
    assert_eq!(native.stats().copies, 2);
    Ok(())
}

#[test]
fn test_partial_uploads_land_at_their_offset() -> Result<()> {
    let (native, device) = headless_device()?;
    let mut cmd = device.queue(QueueType::Copy).command_buffer()?;
    let buffer = device.create_buffer(&BufferDescriptor::byte_address("target", 16))?;
    let readback = device.create_buffer(&BufferDescriptor::readback("target readback", 16))?;
    cmd.set_buffer_data(buffer, 8, &[0xaa; 4])?;
    cmd.copy_resource(readback, buffer)?;
    device.queue(QueueType::Copy).execute_command_buffer(cmd)?;
    device.idle_gpu()?;

    let mut out = [0u8; 16];
    device.read_buffer(readback, 0, &mut out)?;
    assert_eq!(&out[..8], &[0; 8]);
    assert_eq!(&out[8..12], &[0xaa; 4]);
    assert_eq!(&out[12..], &[0; 4]);
    assert!(native.validation_messages().is_empty());
    Ok(())
}

#[test]
fn test_unordered_access_clear_fills_every_word() -> Result<()> {
    let (native, device) = headless_device()?;
    let buffer = device.create_buffer(
        &BufferDescriptor::byte_address("counters", 32).with_unordered_access(),
    )?;
    let readback = device.create_buffer(&BufferDescriptor::readback("counters readback", 32))?;

    let mut cmd = device.queue(QueueType::Compute).command_buffer()?;
    cmd.clear_resource_uint(buffer, [0xdead_beef, 0, 0, 0])?;
    cmd.copy_resource(readback, buffer)?;
    device.queue(QueueType::Compute).execute_command_buffer(cmd)?;
    device.idle_gpu()?;

    let mut out = [0u8; 32];
    device.read_buffer(readback, 0, &mut out)?;
    assert!(out
        .chunks_exact(4)
        .all(|word| bytemuck::pod_read_unaligned::<u32>(word) == 0xdead_beef));
    assert_eq!(native.stats().clears, 1);
    assert!(native.validation_messages().is_empty());
    Ok(())
}

#[test]
fn test_timer_queries_measure_forward() -> Result<()> {
    let (native, device) = headless_device()?;
    let query = device.create_query(QueryType::Timer, 2)?;
    let buffer = device.create_buffer(&BufferDescriptor::byte_address("payload", 64))?;

    let mut cmd = device.direct_queue().command_buffer()?;
    cmd.begin_query(&query, 0)?;
    cmd.set_buffer_data(buffer, 0, &[7; 64])?;
    cmd.end_query(&query, 0)?;
    cmd.begin_query(&query, 1)?;
    cmd.end_query(&query, 1)?;
    cmd.resolve_query(&query, 0, 2)?;
    device.direct_queue().execute_command_buffer(cmd)?;
    device.idle_gpu()?;

    let ticks = query.read_results(0, 2)?;
    assert_eq!(ticks.len(), 2);
    let frequency = device.direct_queue().timestamp_frequency()?;
    assert_eq!(frequency, umbra_infra::graphics::headless::HEADLESS_TIMESTAMP_FREQUENCY);
    let seconds = query.elapsed_seconds(0, frequency)?;
    assert!(seconds >= 0.0);
    assert_relative_eq!(seconds, ticks[0] as f64 / frequency as f64);
    assert!(native.validation_messages().is_empty());
    Ok(())
}

#[test]
fn test_generated_mips_leave_consistent_states() -> Result<()> {
    let (native, device) = headless_device()?;
    let texture = device.create_texture(&TextureDescriptor {
        size: Extent3D {
            width: 16,
            height: 8,
            depth_or_array_layers: 2,
        },
        mip_level_count: 0,
        usage: TextureUsage::SHADER_RESOURCE.union(TextureUsage::UNORDERED_ACCESS),
        ..Default::default()
    })?;
    let mip_levels = device.texture_info(texture)?.mip_levels;
    assert_eq!(mip_levels, 5);

    let mut cmd = device.direct_queue().command_buffer()?;
    cmd.generate_mips(texture)?;
    device.direct_queue().execute_command_buffer(cmd)?;
    device.idle_gpu()?;

    assert_eq!(device.resource_state(texture)?, ResourceState::UAV);
    assert_eq!(native.stats().dispatches, u64::from(mip_levels - 1));
    assert!(
        native.validation_messages().is_empty(),
        "{:?}",
        native.validation_messages()
    );
    Ok(())
}

#[test]
fn test_queues_synchronize_through_semaphores() -> Result<()> {
    let (_native, device) = headless_device()?;
    let buffer = device.create_buffer(&BufferDescriptor::byte_address("shared", 16))?;

    let mut upload = device.queue(QueueType::Copy).command_buffer()?;
    upload.set_buffer_data(buffer, 0, &[1; 16])?;
    device.queue(QueueType::Copy).execute_command_buffer(upload)?;
    let semaphore = device.queue(QueueType::Copy).signal_semaphore()?;
    device.direct_queue().wait_semaphore(&semaphore)?;
    assert!(device.queue(QueueType::Copy).is_fence_complete(semaphore.value));

    let never_signaled = umbra_core::renderer::QueueSemaphore {
        value: semaphore.value + 10,
        ..semaphore
    };
    assert!(device.direct_queue().wait_semaphore(&never_signaled).is_err());
    Ok(())
}

#[test]
fn test_dropping_the_device_releases_every_object() -> Result<()> {
    let (native, device) = headless_device()?;
    let buffer = device.create_buffer(&BufferDescriptor::constant("frame constants", 256))?;
    let mut cmd = device.direct_queue().command_buffer()?;
    cmd.set_buffer_data(buffer, 0, &[0; 64])?;
    device.direct_queue().execute_command_buffer(cmd)?;
    assert!(native.live_object_count() > 0);
    assert!(native.allocated_bytes() > 0);

    drop(device);
    assert_eq!(native.live_object_count(), 0);
    assert_eq!(native.allocated_bytes(), 0);
    assert!(
        native.validation_messages().is_empty(),
        "{:?}",
        native.validation_messages()
    );
    Ok(())
}

#[test]
fn test_removed_device_fails_submissions() -> Result<()> {
    let (native, device) = headless_device()?;
    let cmd = device.direct_queue().command_buffer()?;
    native.remove("driver reset");
    assert!(device.direct_queue().execute_command_buffer(cmd).is_err());
    assert!(device.idle_gpu().is_err());
    Ok(())
}

#[test]
fn test_changed_sources_rebuild_their_pipelines() -> Result<()> {
    init_logger();
    let native = HeadlessDevice::new();
    let router = Arc::new(FileChangeRouter::new());
    let device = Device::new(
        native.clone(),
        DeviceDescriptor {
            settings: validating_settings(),
            watcher: Some(router.clone() as Arc<dyn ShaderSourceWatcher>),
            ..Default::default()
        },
    )?;

    let source = PathBuf::from("shaders/particles.hlsl");
    let shader = device.create_shader(ShaderDescriptor {
        label: Some("particles"),
        source_path: Some(source.clone()),
        ..ShaderDescriptor::new(ShaderType::COMPUTE, vec![0x44, 0x58, 0x42, 0x43])
    })?;
    let signature = device.create_shader_signature("particles");
    signature.set_parameters(vec![ShaderParameter::constants(4, 0, ShaderType::COMPUTE)]);

    let mut pipeline = device.create_compute_pipeline("particles");
    pipeline.set_shader(shader.clone())?;
    pipeline.set_shader_signature(signature);
    let first = pipeline.native_pipeline()?;
    assert_eq!(pipeline.rebuild_count(), 1);
    assert_eq!(router.watched_path_count(), 1);

    router.sender().send(source).expect("router is alive");
    assert_eq!(router.pump(), 1);
    assert!(pipeline.is_dirty());

    let mut cmd = device.direct_queue().command_buffer()?;
    pipeline.bind(&mut cmd)?;
    cmd.bind_compute_32bit_constants(0, &[1, 2, 3, 4], 0)?;
    cmd.dispatch(4, 1, 1)?;
    device.direct_queue().execute_command_buffer(cmd)?;
    device.idle_gpu()?;

    assert_eq!(pipeline.rebuild_count(), 2);
    assert_ne!(pipeline.native_pipeline()?, first);
    assert_eq!(router.notify_changed(Path::new("shaders/unrelated.hlsl")), 0);
    assert_eq!(native.stats().dispatches, 1);
    assert!(native.validation_messages().is_empty());
    Ok(())
}
