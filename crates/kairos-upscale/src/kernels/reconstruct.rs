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

//! Reconstruct-previous-depth pass kernel.
//!
//! Two jobs in one sweep over the render grid. First, depth and motion are
//! dilated: every texel takes the motion vector and depth of the nearest
//! (closest to camera) sample in its 3x3 neighborhood, so silhouette edges
//! move with the foreground instead of the background. Second, the dilated
//! depth is scattered along its own motion vector onto the grid position it
//! came from last frame; a nearest-wins merge per target texel rebuilds an
//! estimate of the previous frame's depth on the current grid. The depth-clip
//! pass compares against this estimate to find disocclusions.

use crate::config::ContextFlags;
use crate::constants::FrameConstants;
use kairos_core::math::Vec2;
use kairos_core::surface::Plane;

use super::sampling::{bilinear_samples, BilinearSamples};

/// Device-depth value representing the far plane.
pub fn far_depth(flags: ContextFlags) -> f32 {
    if flags.contains(ContextFlags::DEPTH_INVERTED) {
        0.0
    } else {
        1.0
    }
}

/// Whether `a` is closer to the camera than `b`, in device depth.
fn nearer(a: f32, b: f32, inverted: bool) -> bool {
    if inverted {
        a > b
    } else {
        a < b
    }
}

/// Runs dilation and previous-depth scatter for one frame.
pub fn run_reconstruct_previous_depth(
    depth: &Plane<f32>,
    motion_vectors: &Plane<[f32; 2]>,
    flags: ContextFlags,
    constants: &FrameConstants,
    reconstructed_depth: &mut Plane<f32>,
    dilated_depth: &mut Plane<f32>,
    dilated_motion_vectors: &mut Plane<[f32; 2]>,
) {
    let render = constants.render_extent();
    let inverted = flags.contains(ContextFlags::DEPTH_INVERTED);
    reconstructed_depth.fill(far_depth(flags));

    let scale = constants.motion_vector_scale;
    let cancellation = constants.motion_vector_jitter_cancellation;

    for y in 0..render.height {
        for x in 0..render.width {
            // Nearest depth in the 3x3 neighborhood wins; its motion vector
            // comes along.
            let mut nearest_pos = (x, y);
            let mut nearest_depth = depth.get(x, y);
            for dy in -1..=1i32 {
                for dx in -1..=1i32 {
                    let sx = (x as i32 + dx).clamp(0, render.width as i32 - 1) as u32;
                    let sy = (y as i32 + dy).clamp(0, render.height as i32 - 1) as u32;
                    let sample = depth.get(sx, sy);
                    if nearer(sample, nearest_depth, inverted) {
                        nearest_depth = sample;
                        nearest_pos = (sx, sy);
                    }
                }
            }

            let raw = motion_vectors.get(nearest_pos.0, nearest_pos.1);
            let motion_uv = Vec2::new(
                raw[0] * scale[0] + cancellation[0],
                raw[1] * scale[1] + cancellation[1],
            );

            dilated_depth.set(x, y, nearest_depth);
            dilated_motion_vectors.set(x, y, [motion_uv.x, motion_uv.y]);

            // Scatter into the bilinear footprint of the position this texel
            // occupied last frame.
            let previous_pos = Vec2::new(
                (x as f32 + 0.5) + motion_uv.x * render.width as f32,
                (y as f32 + 0.5) + motion_uv.y * render.height as f32,
            );
            let samples = bilinear_samples(previous_pos);
            for (offset, weight) in BilinearSamples::OFFSETS.iter().zip(samples.weights) {
                if weight <= 0.0 {
                    continue;
                }
                let tx = samples.base[0] + offset[0];
                let ty = samples.base[1] + offset[1];
                if tx < 0 || ty < 0 || tx >= render.width as i32 || ty >= render.height as i32 {
                    continue;
                }
                let (tx, ty) = (tx as u32, ty as u32);
                if nearer(nearest_depth, reconstructed_depth.get(tx, ty), inverted) {
                    reconstructed_depth.set(tx, ty, nearest_depth);
                }
            }
        }
    }
}
