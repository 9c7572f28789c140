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

//! History rectification.
//!
//! The reprojected history is only trustworthy while it still resembles what
//! the current frame actually shows. Each output pixel builds a weighted
//! color box over its freshly upsampled neighborhood (mean, standard
//! deviation and raw bounds, in YCoCg) and clamps the history into an
//! envelope derived from it. Everything here is transient per-pixel state;
//! nothing survives the frame.

use kairos_core::math::{lerp, saturate, EPSILON};

/// Weighted moments and bounds of the current frame's neighborhood colors.
#[derive(Debug, Clone, Copy)]
pub struct RectificationBox {
    sum: [f32; 3],
    sum_sq: [f32; 3],
    weight: f32,
    aabb_min: [f32; 3],
    aabb_max: [f32; 3],
}

impl RectificationBox {
    pub fn new() -> Self {
        Self {
            sum: [0.0; 3],
            sum_sq: [0.0; 3],
            weight: 0.0,
            aabb_min: [f32::INFINITY; 3],
            aabb_max: [f32::NEG_INFINITY; 3],
        }
    }

    /// Folds one neighborhood sample in. The raw bounds ignore the weight;
    /// the moments honor it.
    pub fn add(&mut self, color: [f32; 3], weight: f32) {
        for c in 0..3 {
            self.sum[c] += color[c] * weight;
            self.sum_sq[c] += color[c] * color[c] * weight;
            self.aabb_min[c] = self.aabb_min[c].min(color[c]);
            self.aabb_max[c] = self.aabb_max[c].max(color[c]);
        }
        self.weight += weight;
    }

    fn guarded_weight(&self) -> f32 {
        if self.weight.abs() > EPSILON {
            self.weight
        } else {
            1.0
        }
    }

    /// Weighted mean color.
    pub fn center(&self) -> [f32; 3] {
        let w = self.guarded_weight();
        [self.sum[0] / w, self.sum[1] / w, self.sum[2] / w]
    }

    /// Weighted standard deviation per component.
    pub fn vec(&self) -> [f32; 3] {
        let w = self.guarded_weight();
        let center = self.center();
        let mut vec = [0.0; 3];
        for c in 0..3 {
            vec[c] = (self.sum_sq[c] / w - center[c] * center[c]).abs().sqrt();
        }
        vec
    }

    /// Raw componentwise minimum over every added sample.
    pub fn aabb_min(&self) -> [f32; 3] {
        self.aabb_min
    }

    /// Raw componentwise maximum over every added sample.
    pub fn aabb_max(&self) -> [f32; 3] {
        self.aabb_max
    }
}

impl Default for RectificationBox {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of clamping one history color against its box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectificationOutcome {
    /// History color after rectification.
    pub history: [f32; 3],
    /// Multiplier for the accumulated history weight.
    pub weight_factor: f32,
    /// Whether the history fell outside the envelope.
    pub clamped: bool,
}

/// Clamps `history` into the box's envelope.
///
/// The envelope is the sigma-scaled deviation around the mean, intersected
/// with the raw bounds. `protection` is how strongly the caller wants the
/// history preserved despite falling outside (locks and luma instability
/// raise it, reactivity lowers it); at 0 the history snaps fully to the
/// envelope and the accumulated weight collapses to `weight_floor`.
pub fn rectify_history(
    history: [f32; 3],
    bounds: &RectificationBox,
    sigma: f32,
    protection: f32,
    weight_floor: f32,
) -> RectificationOutcome {
    let center = bounds.center();
    let vec = bounds.vec();

    let mut outside = false;
    let mut clamped = history;
    for c in 0..3 {
        let lo = (center[c] - vec[c] * sigma).max(bounds.aabb_min[c]);
        let hi = (center[c] + vec[c] * sigma).min(bounds.aabb_max[c]).max(lo);
        if history[c] < lo {
            clamped[c] = lo;
            outside = true;
        } else if history[c] > hi {
            clamped[c] = hi;
            outside = true;
        }
    }

    if !outside {
        return RectificationOutcome {
            history,
            weight_factor: 1.0,
            clamped: false,
        };
    }

    let protection = saturate(protection);
    let mut rectified = [0.0; 3];
    for c in 0..3 {
        rectified[c] = lerp(clamped[c], history[c], protection);
    }
    RectificationOutcome {
        history: rectified,
        weight_factor: protection.max(weight_floor),
        clamped: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn box_of(samples: &[([f32; 3], f32)]) -> RectificationBox {
        let mut bounds = RectificationBox::new();
        for &(color, weight) in samples {
            bounds.add(color, weight);
        }
        bounds
    }

    #[test]
    fn aabb_bounds_every_input() {
        let samples = [
            ([0.2, -0.1, 0.05], 0.9),
            ([0.8, 0.3, -0.2], 0.4),
            ([0.5, 0.0, 0.0], 0.1),
            ([0.35, 0.2, 0.6], 0.7),
        ];
        let bounds = box_of(&samples);

        for (color, _) in samples {
            for c in 0..3 {
                assert!(bounds.aabb_min()[c] <= color[c]);
                assert!(bounds.aabb_max()[c] >= color[c]);
            }
        }
        // The weighted mean cannot escape the raw bounds either.
        let center = bounds.center();
        for c in 0..3 {
            assert!(center[c] >= bounds.aabb_min()[c] - 1e-6);
            assert!(center[c] <= bounds.aabb_max()[c] + 1e-6);
        }
    }

    #[test]
    fn uniform_samples_have_zero_deviation() {
        let bounds = box_of(&[([0.5, 0.1, -0.1], 1.0), ([0.5, 0.1, -0.1], 0.3)]);
        let center = bounds.center();
        for c in 0..3 {
            assert!((center[c] - [0.5, 0.1, -0.1][c]).abs() < 1e-6);
            assert!(bounds.vec()[c] < 1e-3);
        }
    }

    #[test]
    fn history_inside_envelope_is_untouched() {
        let bounds = box_of(&[([0.0, 0.0, 0.0], 1.0), ([1.0, 0.2, 0.2], 1.0)]);
        let history = [0.5, 0.1, 0.1];

        let outcome = rectify_history(history, &bounds, 2.0, 0.0, 0.1);

        assert_eq!(outcome.history, history);
        assert_eq!(outcome.weight_factor, 1.0);
        assert!(!outcome.clamped);
    }

    #[test]
    fn unprotected_history_snaps_to_the_envelope() {
        let bounds = box_of(&[([0.4, 0.0, 0.0], 1.0), ([0.6, 0.0, 0.0], 1.0)]);
        let history = [2.0, 0.0, 0.0];

        let outcome = rectify_history(history, &bounds, 1.0, 0.0, 0.1);

        assert!(outcome.clamped);
        // Envelope top: center 0.5 + deviation 0.1, capped by the aabb at 0.6.
        assert!((outcome.history[0] - 0.6).abs() < 1e-5);
        assert_eq!(outcome.weight_factor, 0.1);
    }

    #[test]
    fn full_protection_keeps_the_color_but_flags_the_clamp() {
        let bounds = box_of(&[([0.4, 0.0, 0.0], 1.0), ([0.6, 0.0, 0.0], 1.0)]);
        let history = [2.0, 0.0, 0.0];

        let outcome = rectify_history(history, &bounds, 1.0, 1.0, 0.1);

        assert!(outcome.clamped);
        assert_eq!(outcome.history, history);
        assert_eq!(outcome.weight_factor, 1.0);
    }

    #[test]
    fn tighter_sigma_clamps_harder() {
        let bounds = box_of(&[
            ([0.0, 0.0, 0.0], 1.0),
            ([0.5, 0.0, 0.0], 1.0),
            ([1.0, 0.0, 0.0], 1.0),
        ]);
        let history = [1.5, 0.0, 0.0];

        let loose = rectify_history(history, &bounds, 2.0, 0.0, 0.1);
        let tight = rectify_history(history, &bounds, 0.5, 0.0, 0.1);

        assert!(tight.history[0] < loose.history[0]);
    }

    #[test]
    fn single_sample_box_pins_the_history() {
        let bounds = box_of(&[([0.25, 0.1, -0.3], 0.8)]);

        let outcome = rectify_history([0.9, 0.9, 0.9], &bounds, 2.0, 0.0, 0.1);

        for c in 0..3 {
            assert!((outcome.history[c] - [0.25, 0.1, -0.3][c]).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_box_does_not_divide_by_zero() {
        let bounds = RectificationBox::new();
        assert_eq!(bounds.center(), [0.0, 0.0, 0.0]);
        assert_eq!(bounds.vec(), [0.0, 0.0, 0.0]);
    }
}
