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

//! Robust contrast-adaptive sharpening.
//!
//! Sharpens the accumulated output with a cross of four neighbors and a
//! negative-lobe filter whose strength is limited per pixel so the result
//! never clips outside the local neighborhood range. A noise estimate over
//! the cross further attenuates the lobe, which keeps film grain and dither
//! patterns from being amplified.

use kairos_core::math::{saturate, EPSILON};
use kairos_core::surface::Plane;

/// Largest negative lobe the limiter may choose.
const RCAS_LIMIT: f32 = 0.25 - 1.0 / 16.0;

/// Twice the perceptual luma of a texel.
fn luma2(texel: [f32; 4]) -> f32 {
    texel[1] + 0.5 * (texel[0] + texel[2])
}

/// Sharpens `color` into `output`.
///
/// `sharpness` in `[0, 1]` maps exponentially onto the lobe gain: 1.0 is the
/// full effect, 0.0 still sharpens at a quarter strength. Alpha passes
/// through untouched.
pub fn run_rcas(color: &Plane<[f32; 4]>, sharpness: f32, output: &mut Plane<[f32; 4]>) {
    let extent = color.extent();
    let gain = (-2.0 * (1.0 - saturate(sharpness))).exp2();

    for y in 0..extent.height {
        for x in 0..extent.width {
            let xi = x as i32;
            let yi = y as i32;
            let b = color.get_clamped(xi, yi - 1);
            let d = color.get_clamped(xi - 1, yi);
            let e = color.get(x, y);
            let f = color.get_clamped(xi + 1, yi);
            let h = color.get_clamped(xi, yi + 1);

            // Per-channel limiter: the lobe may not push the result past the
            // ring minimum or above the peak.
            let mut raw_lobe = f32::NEG_INFINITY;
            for c in 0..3 {
                let ring_min = b[c].min(d[c]).min(f[c]).min(h[c]);
                let ring_max = b[c].max(d[c]).max(f[c]).max(h[c]);
                let hit_min = ring_min.min(e[c]) / (4.0 * ring_max);
                let hit_max = (1.0 - ring_max.max(e[c])) / (4.0 * ring_min - 4.0);
                // NaN from a degenerate ring drops out of the max here.
                raw_lobe = raw_lobe.max((-hit_min).max(hit_max));
            }
            let limited = (-RCAS_LIMIT).max(raw_lobe.min(0.0));

            // Noise attenuation on the luma cross.
            let luma_b = luma2(b);
            let luma_d = luma2(d);
            let luma_e = luma2(e);
            let luma_f = luma2(f);
            let luma_h = luma2(h);
            let deviation = 0.25 * (luma_b + luma_d + luma_f + luma_h) - luma_e;
            let range = luma_b
                .max(luma_d)
                .max(luma_e)
                .max(luma_f)
                .max(luma_h)
                - luma_b.min(luma_d).min(luma_e).min(luma_f).min(luma_h);
            let noise = 1.0 - 0.5 * saturate(deviation.abs() / range.max(EPSILON));

            let lobe = limited * gain * noise;
            let normalizer = 1.0 / (4.0 * lobe + 1.0);
            let mut sharpened = [0.0f32; 4];
            for c in 0..3 {
                sharpened[c] = (lobe * (b[c] + d[c] + f[c] + h[c]) + e[c]) * normalizer;
            }
            sharpened[3] = e[3];
            output.set(x, y, sharpened);
        }
    }
}
