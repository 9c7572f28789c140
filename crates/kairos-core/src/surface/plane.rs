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

//! Provides CPU-side typed texel storage for surfaces.

use crate::math::{Extent2D, Vec2};
use crate::surface::error::SurfaceError;

/// A texel type that supports the arithmetic needed for filtering.
///
/// Implemented for the component layouts the CPU backend stores planes with
/// (`f32`, `[f32; 2]`, `[f32; 4]`).
pub trait Texel: bytemuck::Pod {
    /// The all-zero texel.
    const ZERO: Self;

    /// Adds two texels component-wise.
    fn add(self, rhs: Self) -> Self;

    /// Multiplies every component by a scalar.
    fn scale(self, factor: f32) -> Self;
}

impl Texel for f32 {
    const ZERO: Self = 0.0;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        self + rhs
    }

    #[inline]
    fn scale(self, factor: f32) -> Self {
        self * factor
    }
}

impl Texel for [f32; 2] {
    const ZERO: Self = [0.0; 2];

    #[inline]
    fn add(self, rhs: Self) -> Self {
        [self[0] + rhs[0], self[1] + rhs[1]]
    }

    #[inline]
    fn scale(self, factor: f32) -> Self {
        [self[0] * factor, self[1] * factor]
    }
}

impl Texel for [f32; 4] {
    const ZERO: Self = [0.0; 4];

    #[inline]
    fn add(self, rhs: Self) -> Self {
        [
            self[0] + rhs[0],
            self[1] + rhs[1],
            self[2] + rhs[2],
            self[3] + rhs[3],
        ]
    }

    #[inline]
    fn scale(self, factor: f32) -> Self {
        [
            self[0] * factor,
            self[1] * factor,
            self[2] * factor,
            self[3] * factor,
        ]
    }
}

/// A 2D grid of typed texels stored in row-major order.
///
/// `Plane` is the CPU-side storage unit behind surfaces: the reference backend
/// keeps one plane per mip level, and staging uploads move caller data into
/// planes. Out-of-range reads clamp to the nearest edge texel, matching the
/// clamp-to-edge sampling every pass of the pipeline assumes.
#[derive(Debug, Clone, PartialEq)]
pub struct Plane<T> {
    extent: Extent2D,
    data: Vec<T>,
}

impl<T: Texel> Plane<T> {
    /// Creates a zero-filled plane with the given extent.
    pub fn new(extent: Extent2D) -> Self {
        Self {
            extent,
            data: vec![T::ZERO; extent.texel_count()],
        }
    }

    /// Creates a plane with every texel set to `value`.
    pub fn filled(extent: Extent2D, value: T) -> Self {
        Self {
            extent,
            data: vec![value; extent.texel_count()],
        }
    }

    /// Creates a plane from existing row-major texel data.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InvalidDescriptor`] if `data.len()` does not
    /// match the extent's texel count.
    pub fn from_vec(extent: Extent2D, data: Vec<T>) -> Result<Self, SurfaceError> {
        if data.len() != extent.texel_count() {
            return Err(SurfaceError::InvalidDescriptor(format!(
                "plane data length {} does not match extent {}x{}",
                data.len(),
                extent.width,
                extent.height
            )));
        }
        Ok(Self { extent, data })
    }

    /// Returns the extent of the plane.
    #[inline]
    pub fn extent(&self) -> Extent2D {
        self.extent
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.extent.width && y < self.extent.height);
        (y as usize) * (self.extent.width as usize) + x as usize
    }

    /// Returns the texel at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinates are outside the plane.
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> T {
        self.data[self.index(x, y)]
    }

    /// Writes the texel at `(x, y)`.
    ///
    /// # Panics
    /// Panics if the coordinates are outside the plane.
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    /// Returns the texel at signed coordinates, clamped to the nearest edge.
    #[inline]
    pub fn get_clamped(&self, x: i32, y: i32) -> T {
        let cx = x.clamp(0, self.extent.width as i32 - 1) as u32;
        let cy = y.clamp(0, self.extent.height as i32 - 1) as u32;
        self.get(cx, cy)
    }

    /// Sets every texel to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    /// Returns the texels as a row-major slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Returns the texels as a mutable row-major slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Samples the plane bilinearly at normalized coordinates with
    /// clamp-to-edge addressing.
    ///
    /// `uv` maps `[0, 1]` across the full extent, with texel centers at
    /// half-texel offsets.
    pub fn sample_bilinear(&self, uv: Vec2) -> T {
        let pos = Vec2::new(
            uv.x * self.extent.width as f32 - 0.5,
            uv.y * self.extent.height as f32 - 0.5,
        );
        let base = pos.floor();
        let frac = pos - base;
        let x = base.x as i32;
        let y = base.y as i32;

        let t00 = self.get_clamped(x, y);
        let t10 = self.get_clamped(x + 1, y);
        let t01 = self.get_clamped(x, y + 1);
        let t11 = self.get_clamped(x + 1, y + 1);

        let top = t00.scale(1.0 - frac.x).add(t10.scale(frac.x));
        let bottom = t01.scale(1.0 - frac.x).add(t11.scale(frac.x));
        top.scale(1.0 - frac.y).add(bottom.scale(frac.y))
    }
}
