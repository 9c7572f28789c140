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

//! Color-space helpers shared by the pass kernels.
//!
//! Rectification operates in YCoCg, where luma and chroma decorrelate and an
//! axis-aligned envelope hugs the neighborhood tighter than it would in RGB.

use kairos_core::math::{LinearRgba, EPSILON};

/// Rec. 709 luminance of a linear RGB triple.
pub fn luminance(rgb: [f32; 3]) -> f32 {
    LinearRgba::rgb(rgb[0], rgb[1], rgb[2]).luminance()
}

/// Relative difference between two luminance values: 0 for equal inputs,
/// approaching 1 when one dwarfs the other. Scale-free, so a dim and a
/// bright region flicker on equal terms.
pub fn luma_divergence(a: f32, b: f32) -> f32 {
    (a - b).abs() / a.max(b).max(EPSILON)
}

/// Converts linear RGB to YCoCg.
pub fn rgb_to_ycocg(rgb: [f32; 3]) -> [f32; 3] {
    let [r, g, b] = rgb;
    [
        0.25 * r + 0.5 * g + 0.25 * b,
        r - b,
        g - 0.5 * (r + b),
    ]
}

/// Converts YCoCg back to linear RGB. Exact inverse of [`rgb_to_ycocg`].
pub fn ycocg_to_rgb(ycocg: [f32; 3]) -> [f32; 3] {
    let [y, co, cg] = ycocg;
    let tmp = y - 0.5 * cg;
    [tmp + 0.5 * co, y + 0.5 * cg, tmp - 0.5 * co]
}

/// Compresses HDR color into `[0, 1)` for difference analysis.
pub fn tonemap(rgb: [f32; 3]) -> [f32; 3] {
    let max = rgb[0].max(rgb[1]).max(rgb[2]).max(0.0);
    let scale = 1.0 / (max + 1.0);
    [rgb[0] * scale, rgb[1] * scale, rgb[2] * scale]
}

/// Undoes [`tonemap`]. The denominator is floored so saturated input cannot
/// blow up to infinity.
pub fn inverse_tonemap(rgb: [f32; 3]) -> [f32; 3] {
    let max = rgb[0].max(rgb[1]).max(rgb[2]).max(0.0);
    let scale = 1.0 / (1.0 - max).max(1e-3);
    [rgb[0] * scale, rgb[1] * scale, rgb[2] * scale]
}

/// Zero unless every component is finite. A NaN or infinity from the
/// renderer would otherwise poison the history forever.
pub fn scrub_non_finite(rgb: [f32; 3]) -> [f32; 3] {
    if rgb.iter().all(|c| c.is_finite()) {
        rgb
    } else {
        [0.0, 0.0, 0.0]
    }
}
