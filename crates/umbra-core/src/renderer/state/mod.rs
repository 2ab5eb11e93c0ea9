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

//! Fixed-function state descriptors of a graphics pipeline.
//!
//! Each descriptor keeps an engine-level description, a dirty flag set by
//! every setter, and a lazily rebuilt native description. The dirty flag is
//! conservative: setting a value equal to the current one still marks the
//! state dirty.

mod blend;
mod depth_stencil;
mod rasterizer;

pub use self::blend::*;
pub use self::depth_stencil::*;
pub use self::rasterizer::*;
