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

//! A set of texture attachments rendered to by graphics pipelines.

use crate::renderer::api::native::{Format, SampleDesc, SIMULTANEOUS_RENDER_TARGET_COUNT};
use crate::renderer::api::AttachmentPoint;
use crate::renderer::device::DeviceContext;
use crate::renderer::error::{PipelineError, ResourceError};
use crate::renderer::observer::{DirtyFlag, InvalidationList};
use crate::renderer::resource::{ResourceEntry, TextureId};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Native formats of a render target, as baked into a pipeline state object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TargetFormats {
    pub num_render_targets: u32,
    pub rtv_formats: [Format; SIMULTANEOUS_RENDER_TARGET_COUNT],
    pub dsv_format: Format,
    pub sample_desc: SampleDesc,
}

/// Up to eight color attachments plus a depth or depth/stencil attachment.
///
/// Pipelines subscribe to the render target at construction; attaching a
/// different texture marks them dirty so the next bind picks up the new
/// format set.
pub struct RenderTarget {
    context: Arc<DeviceContext>,
    attachments: Mutex<[Option<TextureId>; AttachmentPoint::COUNT]>,
    listeners: InvalidationList,
}

impl fmt::Debug for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderTarget")
            .field("attachments", &*self.attachments.lock().unwrap())
            .finish()
    }
}

impl RenderTarget {
    pub(crate) fn new(context: Arc<DeviceContext>) -> Self {
        Self {
            context,
            attachments: Mutex::new([None; AttachmentPoint::COUNT]),
            listeners: InvalidationList::new(),
        }
    }

    /// Attaches `texture` at `point`.
    ///
    /// Subscribed pipelines are invalidated only when the attachment changes.
    pub fn attach_texture(
        &self,
        point: AttachmentPoint,
        texture: TextureId,
    ) -> Result<(), ResourceError> {
        self.context.resources.get(texture)?.texture()?;
        let changed = {
            let mut attachments = self.attachments.lock().unwrap();
            let slot = &mut attachments[point.index()];
            let changed = *slot != Some(texture);
            *slot = Some(texture);
            changed
        };
        if changed {
            log::trace!("Attached {:?} at {:?}", texture, point);
            self.listeners.notify();
        }
        Ok(())
    }

    /// Removes the attachment at `point` and returns it.
    pub fn detach_texture(&self, point: AttachmentPoint) -> Option<TextureId> {
        let previous = self.attachments.lock().unwrap()[point.index()].take();
        if previous.is_some() {
            self.listeners.notify();
        }
        previous
    }

    /// Removes every attachment.
    pub fn reset(&self) {
        let had_any = {
            let mut attachments = self.attachments.lock().unwrap();
            let had_any = attachments.iter().any(Option::is_some);
            *attachments = [None; AttachmentPoint::COUNT];
            had_any
        };
        if had_any {
            self.listeners.notify();
        }
    }

    /// The texture attached at `point`.
    pub fn texture(&self, point: AttachmentPoint) -> Option<TextureId> {
        self.attachments.lock().unwrap()[point.index()]
    }

    /// Every attachment, indexed by [`AttachmentPoint::index`].
    pub fn attachments(&self) -> [Option<TextureId>; AttachmentPoint::COUNT] {
        *self.attachments.lock().unwrap()
    }

    /// Width and height of the first attachment, if any.
    pub fn size(&self) -> Option<(u32, u32)> {
        self.resolve().ok()?.first().and_then(|(_, entry)| {
            entry
                .texture()
                .ok()
                .map(|info| (info.width, info.height))
        })
    }

    /// Subscribes `flag` to attachment changes.
    pub fn subscribe(&self, flag: &DirtyFlag) {
        self.listeners.subscribe(flag);
    }

    /// Stops marking `flag` on attachment changes.
    pub fn unsubscribe(&self, flag: &DirtyFlag) {
        self.listeners.unsubscribe(flag);
    }

    /// Resolves every attachment to its registry entry, colors first.
    pub(crate) fn resolve(&self) -> Result<Vec<(AttachmentPoint, Arc<ResourceEntry>)>, ResourceError> {
        let attachments = self.attachments();
        AttachmentPoint::ALL
            .iter()
            .filter_map(|point| attachments[point.index()].map(|id| (*point, id)))
            .map(|(point, id)| Ok((point, self.context.resources.get(id)?)))
            .collect()
    }

    /// The format set of the attachments.
    /// ## Errors
    /// * `PipelineError::IncompatibleColorTarget` - A color attachment has a depth format.
    /// * `PipelineError::IncompatibleDepthStencilFormat` - The depth attachment has a color format.
    /// * `PipelineError::MismatchedSampleCounts` - Attachments disagree on sample count or quality.
    pub(crate) fn target_formats(&self) -> Result<TargetFormats, PipelineError> {
        let mut formats = TargetFormats {
            num_render_targets: 0,
            rtv_formats: [Format::Unknown; SIMULTANEOUS_RENDER_TARGET_COUNT],
            dsv_format: Format::Unknown,
            sample_desc: SampleDesc::default(),
        };
        let mut sample_desc: Option<SampleDesc> = None;

        for (point, entry) in self.resolve()? {
            let info = entry.texture()?;
            match point.color_index() {
                Some(index) => {
                    if info.format.is_depth() {
                        return Err(PipelineError::IncompatibleColorTarget {
                            attachment: point,
                            format: info.format,
                        });
                    }
                    formats.rtv_formats[index] = info.format.to_native();
                    formats.num_render_targets = formats.num_render_targets.max(index as u32 + 1);
                }
                None => {
                    if !info.format.is_depth() {
                        return Err(PipelineError::IncompatibleDepthStencilFormat(info.format));
                    }
                    if formats.dsv_format == Format::Unknown
                        || point == AttachmentPoint::DepthStencil
                    {
                        formats.dsv_format = info.format.to_native();
                    }
                }
            }

            let desc = SampleDesc {
                count: info.sample_count.count(),
                quality: info.sample_quality,
            };
            match sample_desc {
                Some(existing) if existing != desc => {
                    return Err(PipelineError::MismatchedSampleCounts)
                }
                _ => sample_desc = Some(desc),
            }
        }

        formats.sample_desc = sample_desc.unwrap_or_default();
        Ok(formats)
    }
}
