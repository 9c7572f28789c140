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

//! Jitter-aware Lanczos upsampling.
//!
//! Each display pixel maps to a position in the render grid and gathers the
//! neighborhood of jittered samples around it with a radial Lanczos-2
//! kernel. The kernel bias divides the tap distance: at high upscale ratios
//! every render sample must cover several display pixels, so the footprint
//! widens with the ratio (up to 1.99x). Where the pixel's history cannot be
//! trusted the bias falls back toward 1, tightening the kernel around the
//! nearest fresh samples so moving and disoccluded regions stay true to the
//! current frame.

use crate::config::Tunables;
use crate::constants::FrameConstants;
use kairos_core::math::{clamp, lerp, saturate, Extent2D, Vec2, EPSILON};
use kairos_core::surface::Plane;

use super::color::rgb_to_ycocg;
use super::rectify::RectificationBox;
use super::sampling::lanczos2;

const FULL_TAPS: [[i32; 2]; 9] = [
    [-1, -1],
    [0, -1],
    [1, -1],
    [-1, 0],
    [0, 0],
    [1, 0],
    [-1, 1],
    [0, 1],
    [1, 1],
];

const REDUCED_TAPS: [[i32; 2]; 5] = [[0, 0], [-1, 0], [1, 0], [0, -1], [0, 1]];

/// One display pixel's freshly upsampled color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpsampledSample {
    /// Weight-normalized neighborhood color in YCoCg.
    pub ycocg: [f32; 3],
    /// Raw kernel weight sum; the sample's confidence for accumulation and
    /// lock decay.
    pub weight_sum: f32,
}

/// Kernel bias for one display pixel.
///
/// The wide value follows the upscale ratio (capped at `max_kernel_bias`)
/// and applies where history is dependable; `tightness` is how unreliable
/// the pixel's history is (reactivity, disocclusion) and pulls the bias
/// down toward the plain reconstruction kernel.
pub fn kernel_bias(constants: &FrameConstants, tunables: &Tunables, tightness: f32) -> f32 {
    let ratio = (1.0 / constants.downscale_factor[0]).max(1.0 / constants.downscale_factor[1]);
    let wide = clamp(ratio, 1.0, tunables.max_kernel_bias);
    let narrow = 1.0 + tunables.narrow_kernel_fraction * (wide - 1.0);
    lerp(wide, narrow, saturate(tightness))
}

/// Gathers the jittered neighborhood of one display pixel.
///
/// `source_pos` is the pixel center mapped into render texel units. The same
/// sweep feeds every tap into `bounds` with the rectification weight curve
/// `exp(bias_curve * offset²)`, so the caller gets the color box without a
/// second gather. Taps are clamped to the active `render_size` region.
pub fn upsample_at(
    prepared_color: &Plane<[f32; 4]>,
    render_size: Extent2D,
    source_pos: Vec2,
    jitter: Vec2,
    bias: f32,
    reduced: bool,
    bias_curve: f32,
    bounds: &mut RectificationBox,
) -> UpsampledSample {
    // Continuous index of the texel whose jittered sample is nearest.
    let ideal = source_pos - Vec2::new(0.5 + jitter.x, 0.5 + jitter.y);
    let base = Vec2::new(ideal.x.round(), ideal.y.round());
    let frac = ideal - base;

    let taps: &[[i32; 2]] = if reduced { &REDUCED_TAPS } else { &FULL_TAPS };

    let mut color = [0.0f32; 3];
    let mut weight_sum = 0.0f32;
    for tap in taps {
        let dx = tap[0] as f32 - frac.x;
        let dy = tap[1] as f32 - frac.y;
        let distance_sq = dx * dx + dy * dy;
        let weight = lanczos2(distance_sq.sqrt() / bias);

        let tx = (base.x as i32 + tap[0]).clamp(0, render_size.width as i32 - 1) as u32;
        let ty = (base.y as i32 + tap[1]).clamp(0, render_size.height as i32 - 1) as u32;
        let texel = prepared_color.get(tx, ty);
        let ycocg = rgb_to_ycocg([texel[0], texel[1], texel[2]]);

        for c in 0..3 {
            color[c] += ycocg[c] * weight;
        }
        weight_sum += weight;

        bounds.add(ycocg, (bias_curve * distance_sq).exp());
    }

    let normalizer = if weight_sum.abs() > EPSILON {
        weight_sum
    } else {
        1.0
    };
    UpsampledSample {
        ycocg: [
            color[0] / normalizer,
            color[1] / normalizer,
            color[2] / normalizer,
        ],
        weight_sum,
    }
}
