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

//! Sub-pixel jitter sequence.
//!
//! Every frame the camera projection is offset by a sub-pixel amount so that
//! over a full cycle the render-resolution samples cover the display-resolution
//! pixel grid. The offsets follow a low-discrepancy Halton sequence in bases
//! 2 and 3, centered on zero.

use kairos_core::math::Vec2;

/// Evaluates the Halton sequence for 1-based `index` in the given base.
///
/// Returns a value in `[0, 1)`.
pub fn halton(mut index: u32, base: u32) -> f32 {
    let mut f = 1.0f32;
    let mut result = 0.0f32;
    while index > 0 {
        f /= base as f32;
        result += f * (index % base) as f32;
        index /= base;
    }
    result
}

/// Number of distinct jitter positions for a render-to-display scale factor.
///
/// Grows quadratically with the per-axis ratio so the sample density stays
/// constant in display space: a 2x upscale cycles through 32 positions.
pub fn jitter_phase_count(render_size: u32, display_size: u32) -> u32 {
    let ratio = display_size as f32 / render_size.max(1) as f32;
    (8.0 * ratio * ratio).round() as u32
}

/// Jitter offset for a frame, in units of render-resolution pixels.
///
/// Both components lie in `[-0.5, 0.5)`. The sequence restarts every
/// `phase_count` frames.
pub fn jitter_offset(frame_index: u32, phase_count: u32) -> Vec2 {
    let index = frame_index % phase_count.max(1) + 1;
    Vec2::new(halton(index, 2) - 0.5, halton(index, 3) - 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_halton_base2_prefix() {
        assert!((halton(1, 2) - 0.5).abs() < 1e-6);
        assert!((halton(2, 2) - 0.25).abs() < 1e-6);
        assert!((halton(3, 2) - 0.75).abs() < 1e-6);
        assert!((halton(4, 2) - 0.125).abs() < 1e-6);
    }

    #[test]
    fn test_phase_count_scales_quadratically() {
        assert_eq!(jitter_phase_count(960, 1920), 32);
        assert_eq!(jitter_phase_count(1280, 1920), 18);
        assert_eq!(jitter_phase_count(1920, 1920), 8);
        assert_eq!(jitter_phase_count(640, 1920), 72);
    }

    #[test]
    fn test_offsets_centered_and_bounded() {
        let phases = jitter_phase_count(960, 1920);
        let mut sum = Vec2::ZERO;
        for frame in 0..phases {
            let offset = jitter_offset(frame, phases);
            assert!(offset.x >= -0.5 && offset.x < 0.5);
            assert!(offset.y >= -0.5 && offset.y < 0.5);
            sum = sum + offset;
        }
        // A full cycle of a low-discrepancy sequence averages out near zero.
        assert!((sum.x / phases as f32).abs() < 0.05);
        assert!((sum.y / phases as f32).abs() < 0.05);
    }

    #[test]
    fn test_sequence_repeats_after_cycle() {
        let phases = jitter_phase_count(960, 1920);
        for frame in 0..4 {
            assert_eq!(jitter_offset(frame, phases), jitter_offset(frame + phases, phases));
        }
    }

    #[test]
    fn test_distinct_positions_within_cycle() {
        let phases = jitter_phase_count(960, 1920);
        for a in 0..phases {
            for b in (a + 1)..phases {
                assert_ne!(
                    jitter_offset(a, phases),
                    jitter_offset(b, phases),
                    "frames {a} and {b} share a jitter position"
                );
            }
        }
    }

    #[test]
    fn test_zero_phase_count_does_not_panic() {
        let offset = jitter_offset(7, 0);
        assert!(offset.x.abs() <= 0.5);
    }
}
