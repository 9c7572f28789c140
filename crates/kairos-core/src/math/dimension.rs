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

//! Provides the `Extent2D` struct for representing sizes in 2D.
//!
//! The type describes the dimensions of surfaces or regions within them.
//! It uses integer (`u32`) components, making it suitable for representing
//! pixel-based coordinates and sizes.

use serde::{Deserialize, Serialize};

/// A two-dimensional extent, typically representing width and height.
///
/// This is commonly used for surface dimensions or render resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Extent2D {
    /// The width component of the extent.
    pub width: u32,
    /// The height component of the extent.
    pub height: u32,
}

impl Extent2D {
    /// Creates a new `Extent2D` with the specified width and height.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// The total number of texels covered by the extent.
    #[inline]
    pub const fn texel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Returns the extent of the next mip level (half size, floored, at least 1).
    #[inline]
    pub const fn half(&self) -> Self {
        Self {
            width: if self.width > 1 { self.width / 2 } else { 1 },
            height: if self.height > 1 { self.height / 2 } else { 1 },
        }
    }

    /// Checks whether either dimension is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Checks whether this extent fits inside `other` in both dimensions.
    #[inline]
    pub const fn fits_within(&self, other: Self) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}
