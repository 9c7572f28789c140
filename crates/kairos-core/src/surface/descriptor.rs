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

//! Defines the descriptor and handle types used to create and reference surfaces.

use crate::math::Extent2D;
use crate::surface::format::SurfaceFormat;
use std::borrow::Cow;

/// Flags describing the allowed usages of a surface.
///
/// Multiple usages can be combined using bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceUsage {
    bits: u32,
}

impl SurfaceUsage {
    /// No usages.
    pub const NONE: Self = Self { bits: 0 };
    /// The surface can be used as the source of a copy operation.
    pub const COPY_SRC: Self = Self { bits: 1 << 0 };
    /// The surface can be used as the destination of a copy operation.
    pub const COPY_DST: Self = Self { bits: 1 << 1 };
    /// The surface can be read (sampled) by a pass.
    pub const SAMPLED: Self = Self { bits: 1 << 2 };
    /// The surface can be written by a pass.
    pub const STORAGE: Self = Self { bits: 1 << 3 };
    /// Read plus write access for passes that both consume and produce the surface.
    pub const SAMPLED_STORAGE: Self = Self {
        bits: Self::SAMPLED.bits | Self::STORAGE.bits,
    };

    /// Creates a new set of usage flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if these flags contain every usage in `other`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if these flags are empty (no usages).
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for SurfaceUsage {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for SurfaceUsage {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// A descriptor used to create a surface through a backend device.
#[derive(Debug, Clone)]
pub struct SurfaceDescriptor<'a> {
    /// An optional debug label.
    pub label: Option<Cow<'a, str>>,
    /// The dimensions (width, height) of mip level 0.
    pub extent: Extent2D,
    /// The format of the texels in the surface.
    pub format: SurfaceFormat,
    /// The number of mipmap levels for the surface.
    pub mip_level_count: u32,
    /// A bitmask of [`SurfaceUsage`] flags describing how the surface will be used.
    pub usage: SurfaceUsage,
}

impl<'a> SurfaceDescriptor<'a> {
    /// Creates a single-mip descriptor with the given label, extent, and format.
    pub fn new(label: &'a str, extent: Extent2D, format: SurfaceFormat, usage: SurfaceUsage) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            extent,
            format,
            mip_level_count: 1,
            usage,
        }
    }

    /// Returns the extent of the given mip level (halved per level, at least 1x1).
    pub fn mip_extent(&self, level: u32) -> Extent2D {
        let mut extent = self.extent;
        for _ in 0..level {
            extent = extent.half();
        }
        extent
    }
}

/// An opaque handle to a surface owned by a backend device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub usize);
