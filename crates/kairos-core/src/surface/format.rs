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

//! Defines the texel formats a surface can be created with.

/// The format of the texels in a surface.
///
/// Formats describe the intended storage layout on a backend. The CPU
/// reference backend stores every component as `f32` regardless of the
/// declared precision; the format then only determines the component count
/// and the upload/readback layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceFormat {
    /// Single 8-bit normalized unsigned channel.
    R8Unorm,
    /// Four 8-bit normalized unsigned channels.
    Rgba8Unorm,
    /// Single 16-bit float channel.
    R16Float,
    /// Two 16-bit float channels.
    Rg16Float,
    /// Four 16-bit float channels.
    Rgba16Float,
    /// Single 32-bit float channel.
    R32Float,
    /// Two 32-bit float channels.
    Rg32Float,
    /// Four 32-bit float channels.
    Rgba32Float,
}

impl SurfaceFormat {
    /// Returns the number of components per texel.
    pub const fn component_count(&self) -> u32 {
        match self {
            SurfaceFormat::R8Unorm | SurfaceFormat::R16Float | SurfaceFormat::R32Float => 1,
            SurfaceFormat::Rg16Float | SurfaceFormat::Rg32Float => 2,
            SurfaceFormat::Rgba8Unorm
            | SurfaceFormat::Rgba16Float
            | SurfaceFormat::Rgba32Float => 4,
        }
    }

    /// Returns the size of one texel in bytes for the declared storage layout.
    pub const fn bytes_per_texel(&self) -> u32 {
        match self {
            SurfaceFormat::R8Unorm => 1,
            SurfaceFormat::R16Float => 2,
            SurfaceFormat::Rgba8Unorm | SurfaceFormat::Rg16Float | SurfaceFormat::R32Float => 4,
            SurfaceFormat::Rgba16Float | SurfaceFormat::Rg32Float => 8,
            SurfaceFormat::Rgba32Float => 16,
        }
    }
}
