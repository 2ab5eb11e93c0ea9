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

//! Indirect command signatures.

use crate::renderer::api::native::{CommandSignatureDesc, NativeHandle};
use crate::renderer::api::{IndirectArgumentType, Pipeline};
use crate::renderer::error::ResourceError;
use crate::renderer::resource::NativeObject;
use crate::renderer::traits::NativeDevice;
use std::sync::Arc;

/// The layout of the argument records read by
/// [`CommandBuffer::execute_indirect`](crate::renderer::CommandBuffer::execute_indirect).
#[derive(Debug)]
pub struct IndirectCommandSignature {
    native: Arc<NativeObject>,
    argument_type: IndirectArgumentType,
    stride: u32,
}

impl IndirectCommandSignature {
    /// `stride` of zero uses the packed size of one argument record.
    pub(crate) fn new(
        device: Arc<dyn NativeDevice>,
        argument_type: IndirectArgumentType,
        stride: u32,
        node_mask: u32,
    ) -> Result<Self, ResourceError> {
        let packed = argument_type.to_native().byte_size();
        let stride = if stride == 0 { packed } else { stride };
        if stride < packed || stride % 4 != 0 {
            return Err(ResourceError::InvalidDescriptor(format!(
                "indirect stride {stride} cannot hold {argument_type:?} arguments of {packed} bytes"
            )));
        }
        let handle = device.create_command_signature(
            &CommandSignatureDesc {
                byte_stride: stride,
                arguments: vec![argument_type.to_native()],
                node_mask,
            },
            None,
        )?;
        Ok(Self {
            native: Arc::new(NativeObject::owned(device, handle)),
            argument_type,
            stride,
        })
    }

    /// The kind of command each record issues.
    pub fn argument_type(&self) -> IndirectArgumentType {
        self.argument_type
    }

    /// Distance in bytes between two records.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// The pipeline the commands run on.
    pub fn pipeline(&self) -> Pipeline {
        match self.argument_type {
            IndirectArgumentType::Dispatch => Pipeline::Compute,
            IndirectArgumentType::Draw | IndirectArgumentType::DrawIndexed => Pipeline::Graphics,
        }
    }

    pub(crate) fn handle(&self) -> NativeHandle {
        self.native.handle()
    }

    pub(crate) fn native_object(&self) -> &Arc<NativeObject> {
        &self.native
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::traits::mock::MockDevice;

    #[test]
    fn test_default_stride_is_packed() {
        let device = MockDevice::new();
        let signature =
            IndirectCommandSignature::new(device.clone(), IndirectArgumentType::DrawIndexed, 0, 1)
                .unwrap();
        assert_eq!(signature.stride(), 20);
        assert_eq!(signature.pipeline(), Pipeline::Graphics);

        let dispatch =
            IndirectCommandSignature::new(device.clone(), IndirectArgumentType::Dispatch, 16, 1)
                .unwrap();
        assert_eq!(dispatch.pipeline(), Pipeline::Compute);
        assert!(
            IndirectCommandSignature::new(device, IndirectArgumentType::Draw, 8, 1).is_err()
        );
    }
}
