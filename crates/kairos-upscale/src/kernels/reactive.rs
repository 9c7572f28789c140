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

//! Reactive-mask generation from an opaque-only render.
//!
//! Integrations that cannot author a reactivity mask can render the scene
//! twice, once with only opaque geometry, and let this kernel derive the
//! mask from where the full frame diverges: additive blends, transparency,
//! and particles all show up as color the opaque pass never produced.

use crate::context::ReactiveFlags;
use kairos_core::math::saturate;
use kairos_core::surface::Plane;

use super::color::{inverse_tonemap, luminance, scrub_non_finite, tonemap};

/// Derives a reactivity mask from the difference between the opaque-only
/// and the final pre-upscale color.
pub fn run_generate_reactive(
    color_opaque_only: &Plane<[f32; 4]>,
    color_pre_upscale: &Plane<[f32; 4]>,
    scale: f32,
    cutoff_threshold: f32,
    binary_value: f32,
    flags: ReactiveFlags,
    out_reactive: &mut Plane<f32>,
) {
    let extent = out_reactive.extent();
    for y in 0..extent.height {
        for x in 0..extent.width {
            let opaque = color_opaque_only.get(x, y);
            let full = color_pre_upscale.get(x, y);
            let mut opaque = scrub_non_finite([opaque[0], opaque[1], opaque[2]]);
            let mut full = scrub_non_finite([full[0], full[1], full[2]]);

            if flags.contains(ReactiveFlags::APPLY_TONEMAP) {
                opaque = tonemap(opaque);
                full = tonemap(full);
            }
            if flags.contains(ReactiveFlags::APPLY_INVERSE_TONEMAP) {
                opaque = inverse_tonemap(opaque);
                full = inverse_tonemap(full);
            }

            let delta = [
                (full[0] - opaque[0]).abs(),
                (full[1] - opaque[1]).abs(),
                (full[2] - opaque[2]).abs(),
            ];
            let measure = if flags.contains(ReactiveFlags::USE_COMPONENTS_MAX) {
                delta[0].max(delta[1]).max(delta[2])
            } else {
                luminance(delta)
            };

            let mut reactive = measure * scale;
            if flags.contains(ReactiveFlags::APPLY_THRESHOLD) {
                reactive = if reactive < cutoff_threshold {
                    0.0
                } else {
                    binary_value
                };
            }
            out_reactive.set(x, y, saturate(reactive));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::math::Extent2D;

    const EXTENT: Extent2D = Extent2D::new(8, 8);

    fn run(
        opaque: &Plane<[f32; 4]>,
        full: &Plane<[f32; 4]>,
        scale: f32,
        flags: ReactiveFlags,
    ) -> Plane<f32> {
        let mut out = Plane::new(EXTENT);
        run_generate_reactive(opaque, full, scale, 0.2, 0.9, flags, &mut out);
        out
    }

    #[test]
    fn transparency_shows_up_as_reactivity() {
        let opaque = Plane::filled(EXTENT, [0.2, 0.2, 0.2, 1.0]);
        let mut full = opaque.clone();
        // A particle overlay brightens one texel.
        full.set(3, 3, [0.2, 0.7, 0.2, 1.0]);

        let out = run(&opaque, &full, 1.0, ReactiveFlags::USE_COMPONENTS_MAX);
        assert!((out.get(3, 3) - 0.5).abs() < 1e-6);
        assert_eq!(out.get(0, 0), 0.0);
    }

    #[test]
    fn threshold_binarizes_the_mask() {
        let opaque = Plane::filled(EXTENT, [0.2, 0.2, 0.2, 1.0]);
        let mut full = opaque.clone();
        full.set(3, 3, [0.2, 0.7, 0.2, 1.0]);
        full.set(4, 4, [0.2, 0.25, 0.2, 1.0]);

        let flags = ReactiveFlags::USE_COMPONENTS_MAX | ReactiveFlags::APPLY_THRESHOLD;
        let out = run(&opaque, &full, 1.0, flags);
        // 0.5 passes the 0.2 cutoff and snaps to the binary value; 0.05
        // falls below it.
        assert!((out.get(3, 3) - 0.9).abs() < 1e-6);
        assert_eq!(out.get(4, 4), 0.0);
    }

    #[test]
    fn luma_measure_is_softer_than_components_max() {
        let opaque = Plane::filled(EXTENT, [0.0, 0.0, 0.0, 1.0]);
        let full = Plane::filled(EXTENT, [0.0, 0.0, 0.5, 1.0]);

        let by_max = run(&opaque, &full, 1.0, ReactiveFlags::USE_COMPONENTS_MAX);
        let by_luma = run(&opaque, &full, 1.0, ReactiveFlags::NONE);
        assert!(by_max.get(0, 0) > by_luma.get(0, 0));
        assert!((by_max.get(0, 0) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn tonemap_compresses_hdr_differences() {
        let opaque = Plane::filled(EXTENT, [2.0, 0.0, 0.0, 1.0]);
        let full = Plane::filled(EXTENT, [4.0, 0.0, 0.0, 1.0]);

        let raw = run(&opaque, &full, 1.0, ReactiveFlags::USE_COMPONENTS_MAX);
        let mapped = run(
            &opaque,
            &full,
            1.0,
            ReactiveFlags::USE_COMPONENTS_MAX | ReactiveFlags::APPLY_TONEMAP,
        );
        // An HDR delta of 2.0 saturates the raw mask; tonemapped it stays
        // proportionate.
        assert_eq!(raw.get(0, 0), 1.0);
        assert!(mapped.get(0, 0) < 0.2);
    }

    #[test]
    fn scale_amplifies_small_differences() {
        let opaque = Plane::filled(EXTENT, [0.2, 0.2, 0.2, 1.0]);
        let full = Plane::filled(EXTENT, [0.2, 0.3, 0.2, 1.0]);

        let unit = run(&opaque, &full, 1.0, ReactiveFlags::USE_COMPONENTS_MAX);
        let amplified = run(&opaque, &full, 5.0, ReactiveFlags::USE_COMPONENTS_MAX);
        assert!((unit.get(0, 0) - 0.1).abs() < 1e-6);
        assert!((amplified.get(0, 0) - 0.5).abs() < 1e-6);
    }
}
