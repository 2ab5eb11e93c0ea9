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

//! Device-wide settings.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A collection of settings that configure a [`Device`](crate::renderer::Device).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Size in bytes of one upload heap page.
    pub upload_page_size: u64,
    /// Number of CPU descriptors in one allocator page.
    pub descriptors_per_allocator_page: u32,
    /// Number of descriptors in one shader-visible dynamic descriptor heap.
    pub descriptors_per_dynamic_heap: u32,
    /// If `true`, draws and dispatches check the tracked state of every bound resource.
    pub validate_resource_states: bool,
    /// Node mask passed to native object creation.
    pub node_mask: u32,
    /// If `true`, native objects are given their debug labels.
    pub debug_names: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            upload_page_size: 2 * 1024 * 1024,
            descriptors_per_allocator_page: 256,
            descriptors_per_dynamic_heap: 1024,
            validate_resource_states: cfg!(debug_assertions),
            node_mask: 1,
            debug_names: true,
        }
    }
}

impl DeviceSettings {
    /// Parses settings from a JSON document. Missing fields take their default value.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse device settings")
    }

    /// Loads settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read device settings from '{}'", path.display()))?;
        let settings = Self::from_json(&json)?;
        log::info!("Loaded device settings from '{}'", path.display());
        Ok(settings)
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize device settings")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = DeviceSettings::default();
        assert_eq!(settings.upload_page_size, 2 * 1024 * 1024);
        assert_eq!(settings.descriptors_per_allocator_page, 256);
        assert_eq!(settings.descriptors_per_dynamic_heap, 1024);
        assert_eq!(settings.node_mask, 1);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings =
            DeviceSettings::from_json(r#"{ "upload_page_size": 4096, "debug_names": false }"#)
                .unwrap();
        assert_eq!(settings.upload_page_size, 4096);
        assert!(!settings.debug_names);
        assert_eq!(settings.descriptors_per_dynamic_heap, 1024);
    }

    #[test]
    fn test_json_round_trip_and_errors() {
        let settings = DeviceSettings {
            validate_resource_states: true,
            ..Default::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(DeviceSettings::from_json(&json).unwrap(), settings);
        assert!(DeviceSettings::from_json("{ not json").is_err());
    }
}
