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

//! Create-locks pass kernel.
//!
//! Scans the prepared luma for features thinner than one render texel.
//! Such a feature only intersects the sample grid on some jitter phases, so
//! without help it flickers at the jitter frequency. Each detection writes a
//! lock request at the display pixel the feature lands on this frame; the
//! accumulation pass turns requests into lock lifetime.
//!
//! A texel qualifies when it is a luma ridge against its dissimilar
//! neighbors and no 2x2 quad around it is uniformly similar. A uniform quad
//! means the feature is at least two texels wide and the regular history
//! accumulation resolves it fine.

use crate::config::Tunables;
use crate::constants::FrameConstants;
use kairos_core::surface::Plane;

use super::color::luma_divergence;

/// Bit per 3x3 neighbor, row major, center = 4.
const fn bit(index: u32) -> u32 {
    1 << index
}

/// The four 2x2 quads that contain the center texel.
const QUADS: [u32; 4] = [
    bit(0) | bit(1) | bit(3) | bit(4),
    bit(1) | bit(2) | bit(4) | bit(5),
    bit(3) | bit(4) | bit(6) | bit(7),
    bit(4) | bit(5) | bit(7) | bit(8),
];

fn is_thin_feature(luma: &Plane<f32>, x: u32, y: u32, threshold: f32) -> bool {
    let nucleus = luma.get(x, y);

    let mut similar_mask = bit(4);
    let mut dissimilar_min = f32::MAX;
    let mut dissimilar_max = 0.0f32;
    for dy in -1..=1i32 {
        for dx in -1..=1i32 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let index = ((dy + 1) * 3 + (dx + 1)) as u32;
            let sample = luma.get_clamped(x as i32 + dx, y as i32 + dy);
            if luma_divergence(sample, nucleus) < threshold {
                similar_mask |= bit(index);
            } else {
                dissimilar_min = dissimilar_min.min(sample);
                dissimilar_max = dissimilar_max.max(sample);
            }
        }
    }

    let is_ridge = nucleus > dissimilar_max || nucleus < dissimilar_min;
    if !is_ridge {
        return false;
    }

    QUADS.iter().all(|&quad| similar_mask & quad != quad)
}

/// Detects thin features and raises lock requests at their display positions.
pub fn run_create_locks(
    prepared_color: &Plane<[f32; 4]>,
    constants: &FrameConstants,
    tunables: &Tunables,
    new_locks: &mut Plane<f32>,
) {
    let render = constants.render_extent();
    let display = constants.display_extent();
    let jitter = constants.jitter_offset;

    // The luma channel of the prepared color, as its own plane so the
    // clamped neighborhood reads stay cheap.
    let mut luma = Plane::new(render);
    for y in 0..render.height {
        for x in 0..render.width {
            luma.set(x, y, prepared_color.get(x, y)[3]);
        }
    }

    new_locks.fill(0.0);
    for y in 0..render.height {
        for x in 0..render.width {
            if !is_thin_feature(&luma, x, y, tunables.thin_feature_luma_threshold) {
                continue;
            }
            // The display pixel this render texel's jittered sample lands on.
            let dx = ((x as f32 + 0.5 + jitter[0]) * display.width as f32 / render.width as f32)
                .floor() as i32;
            let dy = ((y as f32 + 0.5 + jitter[1]) * display.height as f32 / render.height as f32)
                .floor() as i32;
            if dx < 0 || dy < 0 || dx >= display.width as i32 || dy >= display.height as i32 {
                continue;
            }
            new_locks.set(dx as u32, dy as u32, 1.0);
        }
    }
}
