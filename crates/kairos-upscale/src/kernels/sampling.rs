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

//! Reconstruction filters.

use kairos_core::math::Vec2;

/// Normalized sinc, `sin(pi x) / (pi x)`.
pub fn sinc(x: f32) -> f32 {
    if x.abs() < 1e-6 {
        1.0
    } else {
        let px = std::f32::consts::PI * x;
        px.sin() / px
    }
}

/// Lanczos kernel with two lobes, evaluated on the radial distance.
///
/// Distances beyond the 2-texel support are clamped onto the zero crossing
/// instead of being cut off, so a biased kernel stays continuous.
pub fn lanczos2(x: f32) -> f32 {
    let x = x.abs().min(2.0);
    sinc(x) * sinc(0.5 * x)
}

/// The 2x2 integer footprint and weights of a bilinear fetch at `pos`
/// (texel-center coordinates: texel (0,0) has its center at 0.5/0.5).
#[derive(Debug, Clone, Copy)]
pub struct BilinearSamples {
    /// Top-left texel of the footprint; the other three are +1 in x/y.
    pub base: [i32; 2],
    /// Weights in reading order: (0,0), (1,0), (0,1), (1,1). Sum to 1.
    pub weights: [f32; 4],
}

impl BilinearSamples {
    /// Offset of the tap at `index` relative to [`BilinearSamples::base`].
    pub const OFFSETS: [[i32; 2]; 4] = [[0, 0], [1, 0], [0, 1], [1, 1]];
}

/// Decomposes a continuous position into its bilinear footprint.
pub fn bilinear_samples(pos: Vec2) -> BilinearSamples {
    let shifted = pos - Vec2::splat(0.5);
    let base = shifted.floor();
    let frac = shifted - base;
    let (fx, fy) = (frac.x, frac.y);
    BilinearSamples {
        base: [base.x as i32, base.y as i32],
        weights: [
            (1.0 - fx) * (1.0 - fy),
            fx * (1.0 - fy),
            (1.0 - fx) * fy,
            fx * fy,
        ],
    }
}
