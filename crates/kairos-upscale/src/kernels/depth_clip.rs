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

//! Depth-clip pass kernel.
//!
//! Compares the dilated current depth against the reconstructed previous
//! depth at the reprojected position and turns the difference into a
//! disocclusion factor: 0 where the surface was visible last frame, rising
//! to 1 where the reprojection lands on geometry that was nearer before.
//! A view-space separation small enough to be explained by a single slanted
//! triangle spanning the screen does not count as a disocclusion.
//!
//! The same sweep also prepares the analysis color (scrubbed RGB plus an
//! exposure-stabilized luma in alpha) and dilates the caller's reactivity
//! masks so a single reactive texel covers the whole area its geometry can
//! reach under jitter.

use crate::config::Tunables;
use crate::constants::FrameConstants;
use kairos_core::math::{lerp, saturate, Vec2};
use kairos_core::surface::Plane;

use super::color::{luminance, scrub_non_finite};
use super::sampling::{bilinear_samples, BilinearSamples};

/// Bilinear taps under this weight carry too little signal to judge.
const BILINEAR_WEIGHT_THRESHOLD: f32 = 0.01;

/// Runs disocclusion detection, color preparation and mask dilation.
#[allow(clippy::too_many_arguments)]
pub fn run_depth_clip(
    color: &Plane<[f32; 4]>,
    dilated_depth: &Plane<f32>,
    reconstructed_depth: &Plane<f32>,
    dilated_motion_vectors: &Plane<[f32; 2]>,
    reactive_mask: Option<&Plane<f32>>,
    transparency_and_composition_mask: Option<&Plane<f32>>,
    constants: &FrameConstants,
    tunables: &Tunables,
    disocclusion: &mut Plane<f32>,
    prepared_color: &mut Plane<[f32; 4]>,
    dilated_reactive: &mut Plane<[f32; 2]>,
) {
    let render = constants.render_extent();
    let render_diagonal = Vec2::new(render.width as f32, render.height as f32).length();
    let d2v = constants.device_to_view_depth;

    // Length ratio of a corner view ray to the central one. The depth of the
    // plane the rays hit cancels out of the ratio.
    let kfov = (1.0 + d2v[2] * d2v[2] + d2v[3] * d2v[3]).sqrt();
    let half_viewport = render_diagonal * 0.5;

    // Separation tolerances tighten at low resolution where a texel spans
    // more of the scene.
    let resolution_factor = saturate(render_diagonal / Vec2::new(1920.0, 1080.0).length());
    let power = lerp(1.0, 3.0, resolution_factor);

    let luma_scale = constants.exposure / constants.pre_exposure;

    for y in 0..render.height {
        for x in 0..render.width {
            let uv = Vec2::new(
                (x as f32 + 0.5) / render.width as f32,
                (y as f32 + 0.5) / render.height as f32,
            );
            let motion = dilated_motion_vectors.get(x, y);
            let previous_pos = Vec2::new(
                (uv.x + motion[0]) * render.width as f32,
                (uv.y + motion[1]) * render.height as f32,
            );
            let current_view = constants.view_depth(dilated_depth.get(x, y));

            let samples = bilinear_samples(previous_pos);
            let mut clip = 0.0;
            let mut weight_sum = 0.0;
            for (offset, weight) in BilinearSamples::OFFSETS.iter().zip(samples.weights) {
                if weight <= BILINEAR_WEIGHT_THRESHOLD {
                    continue;
                }
                let tx = samples.base[0] + offset[0];
                let ty = samples.base[1] + offset[1];
                if tx < 0 || ty < 0 || tx >= render.width as i32 || ty >= render.height as i32 {
                    continue;
                }
                let previous_view =
                    constants.view_depth(reconstructed_depth.get(tx as u32, ty as u32));
                let depth_diff = current_view - previous_view;
                if depth_diff > 0.0 {
                    let depth_threshold = current_view.max(previous_view);
                    let required_separation = tunables.depth_separation_constant
                        * kfov
                        * half_viewport
                        * depth_threshold;
                    clip += weight * saturate(required_separation / depth_diff).powf(power);
                    weight_sum += weight;
                }
            }
            let value = if weight_sum > 0.0 {
                saturate(1.0 - clip / weight_sum)
            } else {
                0.0
            };
            disocclusion.set(x, y, value);

            let raw = color.get(x, y);
            let rgb = scrub_non_finite([raw[0], raw[1], raw[2]]);
            let luma = luminance(rgb) * luma_scale;
            prepared_color.set(x, y, [rgb[0], rgb[1], rgb[2], luma]);

            let reactive = dilate_mask(reactive_mask, x, y);
            let transparency = dilate_mask(transparency_and_composition_mask, x, y);
            dilated_reactive.set(x, y, [reactive, transparency]);
        }
    }
}

/// 3x3 max dilation of an optional mask. Absent masks read as zero.
fn dilate_mask(mask: Option<&Plane<f32>>, x: u32, y: u32) -> f32 {
    let Some(mask) = mask else {
        return 0.0;
    };
    let mut value: f32 = 0.0;
    for dy in -1..=1i32 {
        for dx in -1..=1i32 {
            value = value.max(mask.get_clamped(x as i32 + dx, y as i32 + dy));
        }
    }
    saturate(value)
}
