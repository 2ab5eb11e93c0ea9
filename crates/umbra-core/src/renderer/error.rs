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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! Configuration errors (bad slots, missing stages, register aliasing) and
//! resource-state violations are returned by the call that detects them.
//! Native device failures are classified by [`NativeError::is_fatal`]; fatal
//! failures surface as [`RenderError::DeviceLost`].

use crate::renderer::api::{AttachmentPoint, Pipeline, QueueType, ResourceState, ShaderType, TextureFormat};
use crate::renderer::resource::ResourceId;
use std::fmt;

/// An error reported by the native device seam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeError {
    /// The device was removed or reset; every object created from it is lost.
    DeviceRemoved {
        /// The removal reason reported by the driver.
        reason: String,
    },
    /// A native allocation failed.
    OutOfMemory,
    /// The native API rejected a description.
    InvalidArgument(String),
    /// The native object referenced by a handle does not exist.
    InvalidHandle(u64),
    /// The requested feature is not supported by the device.
    Unsupported(String),
}

impl NativeError {
    /// Returns `true` for failures that require recreating the device.
    pub fn is_fatal(&self) -> bool {
        matches!(self, NativeError::DeviceRemoved { .. } | NativeError::OutOfMemory)
    }
}

impl fmt::Display for NativeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeError::DeviceRemoved { reason } => write!(f, "Device removed: {reason}"),
            NativeError::OutOfMemory => write!(f, "Native allocation failed: out of memory"),
            NativeError::InvalidArgument(msg) => write!(f, "Invalid native argument: {msg}"),
            NativeError::InvalidHandle(handle) => {
                write!(f, "Invalid native handle: {handle:#x}")
            }
            NativeError::Unsupported(msg) => write!(f, "Unsupported by the device: {msg}"),
        }
    }
}

impl std::error::Error for NativeError {}

/// An error related to the layout or creation of a shader signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    /// A parameter index is not within the signature's parameter list.
    ParameterOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of parameters in the signature.
        count: usize,
    },
    /// A table parameter has no descriptor ranges.
    EmptyTable {
        /// The slot of the table.
        slot: usize,
    },
    /// A table parameter mixes sampler and non-sampler ranges.
    MixedSamplerTable {
        /// The slot of the table.
        slot: usize,
    },
    /// Two bindings alias the same register and space.
    RegisterAliasing {
        /// The register class (`b`, `t`, `u` or `s`).
        class: char,
        /// The first aliased register.
        register: u32,
        /// The register space.
        space: u32,
        /// Description of the first binding.
        first: String,
        /// Description of the second binding.
        second: String,
    },
    /// A parameter of the given kind cannot be used in this position.
    InvalidParameter {
        /// The slot of the parameter.
        slot: usize,
        /// What is wrong with it.
        reason: String,
    },
    /// The native device rejected the root signature.
    Native(NativeError),
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureError::ParameterOutOfRange { index, count } => write!(
                f,
                "Shader parameter index {index} is out of range (signature has {count} parameters)"
            ),
            SignatureError::EmptyTable { slot } => {
                write!(f, "Table parameter at slot {slot} has no descriptor ranges")
            }
            SignatureError::MixedSamplerTable { slot } => write!(
                f,
                "Table parameter at slot {slot} mixes sampler and non-sampler ranges"
            ),
            SignatureError::RegisterAliasing {
                class,
                register,
                space,
                first,
                second,
            } => write!(
                f,
                "Register {class}{register} (space {space}) is bound by both {first} and {second}"
            ),
            SignatureError::InvalidParameter { slot, reason } => {
                write!(f, "Invalid parameter at slot {slot}: {reason}")
            }
            SignatureError::Native(err) => write!(f, "Root signature creation failed: {err}"),
        }
    }
}

impl std::error::Error for SignatureError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SignatureError::Native(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NativeError> for SignatureError {
    fn from(err: NativeError) -> Self {
        SignatureError::Native(err)
    }
}

/// An error related to the creation or use of a GPU resource (buffers, textures, samplers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The handle does not name a live resource.
    NotFound(ResourceId),
    /// The resource exists but is of a different kind.
    WrongKind {
        /// The resource.
        id: ResourceId,
        /// The kind the operation needs.
        expected: &'static str,
    },
    /// The creation parameters are invalid.
    InvalidDescriptor(String),
    /// An access exceeds the resource's bounds.
    OutOfBounds {
        /// Requested size in bytes (or subresource index).
        requested: u64,
        /// Available size in bytes (or subresource count).
        available: u64,
    },
    /// The format does not support the requested sample count.
    UnsupportedSampleCount {
        /// The texture format.
        format: TextureFormat,
        /// The requested sample count.
        count: u32,
    },
    /// The native device failed to create or access the resource.
    Native(NativeError),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::NotFound(id) => write!(f, "Resource not found with ID: {id:?}"),
            ResourceError::WrongKind { id, expected } => {
                write!(f, "Resource {id:?} is not a {expected}")
            }
            ResourceError::InvalidDescriptor(msg) => {
                write!(f, "Invalid resource descriptor: {msg}")
            }
            ResourceError::OutOfBounds {
                requested,
                available,
            } => write!(
                f,
                "Resource access out of bounds: requested {requested}, available {available}"
            ),
            ResourceError::UnsupportedSampleCount { format, count } => {
                write!(f, "Format {format:?} does not support {count} samples")
            }
            ResourceError::Native(err) => write!(f, "Backend-specific resource error: {err}"),
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Native(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NativeError> for ResourceError {
    fn from(err: NativeError) -> Self {
        ResourceError::Native(err)
    }
}

/// An error related to building a graphics or compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// No shader signature has been assigned.
    MissingShaderSignature,
    /// A required shader stage is missing.
    MissingShader(ShaderType),
    /// A shader was assigned to a stage the pipeline does not accept.
    InvalidShaderStage(ShaderType),
    /// Only one of the two tessellation stages is present.
    IncompleteTessellation,
    /// Tessellation stages require the patch-list topology and vice versa.
    TessellationTopologyMismatch,
    /// The patch control point count is not within 1..=32.
    InvalidPatchControlPoints(u32),
    /// No render target has been assigned.
    MissingRenderTarget,
    /// A color attachment uses a depth format.
    IncompatibleColorTarget {
        /// The attachment point.
        attachment: AttachmentPoint,
        /// The texture's format.
        format: TextureFormat,
    },
    /// The depth attachment uses a color format.
    IncompatibleDepthStencilFormat(TextureFormat),
    /// Attachments of the render target have different sample counts.
    MismatchedSampleCounts,
    /// The shader signature could not be built.
    Signature(SignatureError),
    /// A render-target attachment could not be resolved.
    Resource(ResourceError),
    /// The native device rejected the pipeline description.
    Native(NativeError),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::MissingShaderSignature => {
                write!(f, "The pipeline has no shader signature")
            }
            PipelineError::MissingShader(stage) => {
                write!(f, "The pipeline is missing a shader for stage {stage:?}")
            }
            PipelineError::InvalidShaderStage(stage) => {
                write!(f, "Shader stage {stage:?} cannot be used by this pipeline")
            }
            PipelineError::IncompleteTessellation => write!(
                f,
                "Tessellation requires both a control and an evaluation shader"
            ),
            PipelineError::TessellationTopologyMismatch => write!(
                f,
                "Tessellation shaders and the patch-list topology must be used together"
            ),
            PipelineError::InvalidPatchControlPoints(points) => {
                write!(f, "Invalid number of patch control points: {points}")
            }
            PipelineError::MissingRenderTarget => write!(f, "The pipeline has no render target"),
            PipelineError::IncompatibleColorTarget { attachment, format } => write!(
                f,
                "Incompatible color target format {format:?} at {attachment:?}"
            ),
            PipelineError::IncompatibleDepthStencilFormat(format) => {
                write!(f, "Incompatible depth/stencil format: {format:?}")
            }
            PipelineError::MismatchedSampleCounts => write!(
                f,
                "Render target attachments have different sample counts"
            ),
            PipelineError::Signature(err) => write!(f, "Shader signature error: {err}"),
            PipelineError::Resource(err) => write!(f, "Render target error: {err}"),
            PipelineError::Native(err) => write!(f, "Pipeline creation failed: {err}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Signature(err) => Some(err),
            PipelineError::Resource(err) => Some(err),
            PipelineError::Native(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SignatureError> for PipelineError {
    fn from(err: SignatureError) -> Self {
        PipelineError::Signature(err)
    }
}

impl From<ResourceError> for PipelineError {
    fn from(err: ResourceError) -> Self {
        PipelineError::Resource(err)
    }
}

impl From<NativeError> for PipelineError {
    fn from(err: NativeError) -> Self {
        PipelineError::Native(err)
    }
}

/// An error raised while recording a command buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The command buffer is not between `begin` and `end`.
    NotRecording,
    /// The operation is not supported by the command buffer's queue type.
    UnsupportedOnQueue {
        /// The operation.
        operation: &'static str,
        /// The queue type of the command buffer.
        queue: QueueType,
    },
    /// No shader signature is bound for the pipeline.
    NoShaderSignatureBound(Pipeline),
    /// No pipeline state object is bound for the pipeline.
    NoPipelineStateBound(Pipeline),
    /// The slot is not within the bound signature.
    SlotOutOfRange {
        /// The pipeline.
        pipeline: Pipeline,
        /// The requested slot.
        slot: u32,
        /// Number of slots in the bound signature.
        count: u32,
    },
    /// The slot's parameter kind cannot accept the argument.
    IncompatibleParameter {
        /// The slot.
        slot: u32,
        /// What the operation needed.
        expected: &'static str,
    },
    /// A descriptor offset is not within the slot's table.
    DescriptorOutOfRange {
        /// The slot.
        slot: u32,
        /// The requested descriptor offset.
        offset: u32,
        /// Number of descriptors in the table.
        count: u32,
    },
    /// The resource has no view of the required kind.
    MissingView {
        /// The resource.
        resource: ResourceId,
        /// The view kind.
        view: &'static str,
    },
    /// A bound resource is not in the state its binding requires.
    StateMismatch {
        /// The resource.
        resource: ResourceId,
        /// The state required by the binding.
        expected: ResourceState,
        /// The tracked state.
        actual: ResourceState,
    },
    /// The device was created without mip generation shaders.
    MipGenerationUnavailable,
    /// An argument is invalid.
    InvalidArgument(String),
    /// A resource could not be resolved or accessed.
    Resource(ResourceError),
    /// A pipeline could not be built.
    Pipeline(PipelineError),
    /// A shader signature could not be built.
    Signature(SignatureError),
    /// A native call failed.
    Native(NativeError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::NotRecording => write!(f, "The command buffer is not recording"),
            CommandError::UnsupportedOnQueue { operation, queue } => {
                write!(f, "'{operation}' is not supported on a {queue:?} queue")
            }
            CommandError::NoShaderSignatureBound(pipeline) => {
                write!(f, "No shader signature bound for the {pipeline:?} pipeline")
            }
            CommandError::NoPipelineStateBound(pipeline) => {
                write!(f, "No pipeline state bound for the {pipeline:?} pipeline")
            }
            CommandError::SlotOutOfRange {
                pipeline,
                slot,
                count,
            } => write!(
                f,
                "Slot {slot} is out of range for the bound {pipeline:?} signature ({count} slots)"
            ),
            CommandError::IncompatibleParameter { slot, expected } => {
                write!(f, "Slot {slot} is not {expected}")
            }
            CommandError::DescriptorOutOfRange {
                slot,
                offset,
                count,
            } => write!(
                f,
                "Descriptor offset {offset} is out of range for the table at slot {slot} ({count} descriptors)"
            ),
            CommandError::MissingView { resource, view } => {
                write!(f, "Resource {resource:?} has no {view} view")
            }
            CommandError::StateMismatch {
                resource,
                expected,
                actual,
            } => write!(
                f,
                "Resource {resource:?} is tracked in {actual:?} but its binding requires {expected:?}"
            ),
            CommandError::MipGenerationUnavailable => {
                write!(f, "The device was created without mip generation shaders")
            }
            CommandError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            CommandError::Resource(err) => write!(f, "Resource error: {err}"),
            CommandError::Pipeline(err) => write!(f, "Pipeline error: {err}"),
            CommandError::Signature(err) => write!(f, "Shader signature error: {err}"),
            CommandError::Native(err) => write!(f, "Native command error: {err}"),
        }
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CommandError::Resource(err) => Some(err),
            CommandError::Pipeline(err) => Some(err),
            CommandError::Signature(err) => Some(err),
            CommandError::Native(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for CommandError {
    fn from(err: ResourceError) -> Self {
        CommandError::Resource(err)
    }
}

impl From<PipelineError> for CommandError {
    fn from(err: PipelineError) -> Self {
        CommandError::Pipeline(err)
    }
}

impl From<SignatureError> for CommandError {
    fn from(err: SignatureError) -> Self {
        CommandError::Signature(err)
    }
}

impl From<NativeError> for CommandError {
    fn from(err: NativeError) -> Self {
        CommandError::Native(err)
    }
}

/// A high-level error that can occur within the device or its queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A failure occurred while initializing the device.
    InitializationFailed(String),
    /// The graphics device was lost. Every object must be recreated.
    DeviceLost(String),
    /// A non-fatal native failure.
    Native(NativeError),
    /// An error occurred while managing a GPU resource.
    Resource(ResourceError),
    /// An error occurred while building a pipeline.
    Pipeline(PipelineError),
    /// An error occurred while building a shader signature.
    Signature(SignatureError),
    /// An error occurred while recording or submitting a command buffer.
    Command(CommandError),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InitializationFailed(msg) => {
                write!(f, "Failed to initialize the device: {msg}")
            }
            RenderError::DeviceLost(msg) => write!(
                f,
                "The graphics device was lost and needs to be reinitialized: {msg}"
            ),
            RenderError::Native(err) => write!(f, "Native device error: {err}"),
            RenderError::Resource(err) => write!(f, "Graphics resource operation failed: {err}"),
            RenderError::Pipeline(err) => write!(f, "Pipeline operation failed: {err}"),
            RenderError::Signature(err) => write!(f, "Shader signature operation failed: {err}"),
            RenderError::Command(err) => write!(f, "Command recording failed: {err}"),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Native(err) => Some(err),
            RenderError::Resource(err) => Some(err),
            RenderError::Pipeline(err) => Some(err),
            RenderError::Signature(err) => Some(err),
            RenderError::Command(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NativeError> for RenderError {
    fn from(err: NativeError) -> Self {
        if err.is_fatal() {
            log::error!("Fatal native error: {err}");
            RenderError::DeviceLost(err.to_string())
        } else {
            RenderError::Native(err)
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        match err {
            ResourceError::Native(native) => native.into(),
            other => RenderError::Resource(other),
        }
    }
}

impl From<PipelineError> for RenderError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Native(native) => native.into(),
            other => RenderError::Pipeline(other),
        }
    }
}

impl From<SignatureError> for RenderError {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::Native(native) => native.into(),
            other => RenderError::Signature(other),
        }
    }
}

impl From<CommandError> for RenderError {
    fn from(err: CommandError) -> Self {
        match err {
            CommandError::Native(native) => native.into(),
            other => RenderError::Command(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn native_error_classification() {
        assert!(NativeError::OutOfMemory.is_fatal());
        assert!(NativeError::DeviceRemoved {
            reason: "hung".to_string()
        }
        .is_fatal());
        assert!(!NativeError::InvalidArgument("bad".to_string()).is_fatal());
    }

    #[test]
    fn fatal_native_errors_become_device_lost() {
        let err: RenderError = CommandError::Native(NativeError::OutOfMemory).into();
        assert!(matches!(err, RenderError::DeviceLost(_)));

        let err: RenderError = ResourceError::Native(NativeError::Unsupported("x".into())).into();
        assert!(matches!(err, RenderError::Native(NativeError::Unsupported(_))));
    }

    #[test]
    fn signature_error_display() {
        let err = SignatureError::RegisterAliasing {
            class: 'b',
            register: 0,
            space: 0,
            first: "slot 0".to_string(),
            second: "slot 1".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Register b0 (space 0) is bound by both slot 0 and slot 1"
        );
    }

    #[test]
    fn render_error_display_wrapping_pipeline_error() {
        let signature_err = SignatureError::EmptyTable { slot: 2 };
        let pipeline_err: PipelineError = signature_err.into();
        let render_err: RenderError = pipeline_err.into();
        assert_eq!(
            format!("{render_err}"),
            "Pipeline operation failed: Shader signature error: Table parameter at slot 2 has no descriptor ranges"
        );
        assert!(render_err.source().is_some());
        assert!(render_err.source().and_then(|e| e.source()).is_some());
    }
}
