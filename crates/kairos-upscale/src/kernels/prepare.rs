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

//! Luminance-pyramid pass kernel.
//!
//! Reduces the render-resolution scene luminance into a mip chain whose
//! deeper levels describe region-level brightness. The chain feeds
//! shading-change detection during accumulation and, under auto exposure,
//! a log-average reduction into a single exposure scalar.

use crate::config::Tunables;
use crate::constants::{active_mip_extent, FrameConstants};
use kairos_core::surface::Plane;

use super::color::luminance;

/// Fills the luminance pyramid and optionally reduces it to an exposure.
///
/// Texels store scene luminance with the renderer's pre-exposure removed and
/// no analysis exposure applied; readers apply `exposure` themselves. The
/// returned value, present only when requested, is
/// `key_value / log_average_luminance` over the active mip 0 region.
pub fn run_luminance_pyramid(
    color: &Plane<[f32; 4]>,
    pyramid: &mut [Plane<f32>],
    constants: &FrameConstants,
    tunables: &Tunables,
    compute_auto_exposure: bool,
) -> Option<f32> {
    let render = constants.render_extent();
    let inverse_pre_exposure = 1.0 / constants.pre_exposure;

    let base_extent = active_mip_extent(render, 0);
    for y in 0..base_extent.height {
        for x in 0..base_extent.width {
            let mut sum = 0.0;
            for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                let sx = (2 * x + dx).min(render.width.saturating_sub(1));
                let sy = (2 * y + dy).min(render.height.saturating_sub(1));
                let texel = color.get(sx, sy);
                sum += luminance([texel[0], texel[1], texel[2]]) * inverse_pre_exposure;
            }
            pyramid[0].set(x, y, 0.25 * sum);
        }
    }

    for level in 1..pyramid.len() {
        let extent = active_mip_extent(render, level as u32);
        let source_extent = active_mip_extent(render, level as u32 - 1);
        let (source, remainder) = pyramid.split_at_mut(level);
        let source = &source[level - 1];
        let target = &mut remainder[0];
        for y in 0..extent.height {
            for x in 0..extent.width {
                let mut sum = 0.0;
                for (dx, dy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
                    let sx = (2 * x + dx).min(source_extent.width.saturating_sub(1));
                    let sy = (2 * y + dy).min(source_extent.height.saturating_sub(1));
                    sum += source.get(sx, sy);
                }
                target.set(x, y, 0.25 * sum);
            }
        }
    }

    if compute_auto_exposure {
        let mut log_sum = 0.0f64;
        for y in 0..base_extent.height {
            for x in 0..base_extent.width {
                log_sum += f64::from(pyramid[0].get(x, y).max(1e-4).ln());
            }
        }
        let average = (log_sum / base_extent.texel_count() as f64).exp() as f32;
        Some(tunables.exposure_key_value / average.max(1e-4))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContextFlags;
    use crate::test_device::test_constants;
    use kairos_core::math::Extent2D;

    fn pyramid_for(render: Extent2D) -> Vec<Plane<f32>> {
        let mips = crate::constants::luma_pyramid_mip_count(render);
        (0..mips)
            .map(|level| {
                let mut extent = render.half();
                for _ in 0..level {
                    extent = extent.half();
                }
                Plane::new(extent)
            })
            .collect()
    }

    #[test]
    fn test_uniform_scene_is_uniform_at_every_level() {
        let render = Extent2D::new(64, 64);
        let color = Plane::filled(render, [0.5, 0.5, 0.5, 1.0]);
        let mut pyramid = pyramid_for(render);
        let constants = test_constants(ContextFlags::NONE, render, Extent2D::new(128, 128));

        let exposure = run_luminance_pyramid(
            &color,
            &mut pyramid,
            &constants,
            &Default::default(),
            true,
        );

        for level in 0..pyramid.len() {
            let extent = active_mip_extent(render, level as u32);
            assert!((pyramid[level].get(0, 0) - 0.5).abs() < 1e-5);
            assert!(
                (pyramid[level].get(extent.width - 1, extent.height - 1) - 0.5).abs() < 1e-5
            );
        }

        // Log average of a constant is the constant.
        let exposure = exposure.unwrap();
        assert!((exposure - 0.18 / 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_mip_zero_averages_quads() {
        let render = Extent2D::new(4, 2);
        let mut color = Plane::filled(render, [0.0, 0.0, 0.0, 1.0]);
        // One white texel in the left 2x2 quad.
        color.set(0, 0, [1.0, 1.0, 1.0, 1.0]);
        let mut pyramid = pyramid_for(render);
        let constants = test_constants(ContextFlags::NONE, render, Extent2D::new(8, 4));

        run_luminance_pyramid(&color, &mut pyramid, &constants, &Default::default(), false);

        assert!((pyramid[0].get(0, 0) - 0.25).abs() < 1e-5);
        assert!(pyramid[0].get(1, 0).abs() < 1e-6);
    }

    #[test]
    fn test_pre_exposure_is_removed() {
        let render = Extent2D::new(8, 8);
        let color = Plane::filled(render, [0.8, 0.8, 0.8, 1.0]);
        let mut pyramid = pyramid_for(render);
        let mut constants = test_constants(ContextFlags::NONE, render, Extent2D::new(16, 16));
        constants.pre_exposure = 2.0;

        run_luminance_pyramid(&color, &mut pyramid, &constants, &Default::default(), false);

        assert!((pyramid[0].get(0, 0) - 0.4).abs() < 1e-5);
    }
}
