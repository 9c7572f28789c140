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

//! Per-frame constant block shared by every pass.
//!
//! [`FrameConstants`] is derived once at the top of a dispatch from the
//! context configuration and the dispatch parameters, then handed read-only
//! to every pass. Passes never consult the dispatch description directly.

use crate::config::{ContextDescription, ContextFlags};
use crate::context::DispatchDescription;
use kairos_core::math::{saturate, Extent2D, Vec2};

/// Mip level of the luminance pyramid sampled by shading-change detection.
pub const SHADING_CHANGE_MIP_LEVEL: u32 = 4;

/// Number of mip levels of the luminance pyramid, which is allocated at half
/// the maximum render resolution.
pub fn luma_pyramid_mip_count(max_render_size: Extent2D) -> u32 {
    let half = max_render_size.half();
    let largest = half.width.max(half.height).max(1);
    32 - largest.leading_zeros()
}

/// Extent of the pyramid data valid at a given render resolution.
///
/// Mip 0 lives at half render resolution; deeper levels halve again, never
/// below 1x1. Under dynamic resolution this is smaller than the allocated
/// plane and the texels beyond it are stale.
pub fn active_mip_extent(render_size: Extent2D, level: u32) -> Extent2D {
    let mut extent = render_size.half();
    for _ in 0..level {
        extent = extent.half();
    }
    extent
}

/// Parameters uniform across one dispatched frame.
///
/// Plain data, tightly packed, so a GPU backend can upload it as a single
/// constant buffer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameConstants {
    /// Resolution the inputs were rendered at this frame.
    pub render_size: [u32; 2],
    /// Largest render resolution any dispatch may use.
    pub max_render_size: [u32; 2],
    /// Output resolution.
    pub display_size: [u32; 2],
    /// Extent of the shading-change pyramid mip at this frame's render
    /// resolution.
    pub luma_mip_extent: [u32; 2],
    /// Sub-pixel camera offset this frame, in render-resolution pixels.
    pub jitter_offset: [f32; 2],
    /// Converts a raw motion-vector texel into a UV-space displacement.
    pub motion_vector_scale: [f32; 2],
    /// UV-space correction subtracted from motion vectors that were rendered
    /// with jitter baked in. Zero unless jitter cancellation is enabled.
    pub motion_vector_jitter_cancellation: [f32; 2],
    /// Per-axis render/display ratio, below 1.0 whenever upscaling happens.
    pub downscale_factor: [f32; 2],
    /// Multiplied with a UV-space motion vector to yield the normalized
    /// velocity factor before saturation.
    pub velocity_factor_scale: [f32; 2],
    /// Device-depth to view-depth transform, resolved for the context's
    /// depth-inverted/depth-infinite flags. See [`FrameConstants::view_depth`].
    pub device_to_view_depth: [f32; 4],
    /// Luminance-pyramid mip level for shading-change detection, clamped to
    /// the pyramid's actual depth.
    pub luma_mip_level: u32,
    /// Frames dispatched since creation or the last reset.
    pub frame_index: u32,
    /// Length of the jitter cycle at this frame's render resolution.
    pub jitter_phase_count: u32,
    /// Frame time normalized from milliseconds into `[0, 1]` seconds.
    pub delta_time: f32,
    /// Exposure already applied to the input color by the renderer.
    pub pre_exposure: f32,
    /// `pre_exposure` of the previous dispatch, used when reading history.
    pub previous_pre_exposure: f32,
    /// Exposure applied while analyzing color (auto-derived or caller-given).
    pub exposure: f32,
    /// Scale from view-space depth units to meters.
    pub view_space_to_meters: f32,
}

impl FrameConstants {
    /// Render resolution as an extent.
    pub fn render_extent(&self) -> Extent2D {
        Extent2D::new(self.render_size[0], self.render_size[1])
    }

    /// Display resolution as an extent.
    pub fn display_extent(&self) -> Extent2D {
        Extent2D::new(self.display_size[0], self.display_size[1])
    }

    /// This frame's jitter offset in UV space of the render grid.
    pub fn jitter_uv(&self) -> Vec2 {
        Vec2::new(
            self.jitter_offset[0] / self.render_size[0].max(1) as f32,
            self.jitter_offset[1] / self.render_size[1].max(1) as f32,
        )
    }

    /// Converts a device depth value into a positive view-space depth.
    pub fn view_depth(&self, device_depth: f32) -> f32 {
        self.device_to_view_depth[1] / (device_depth - self.device_to_view_depth[0])
    }
}

/// Derives [`FrameConstants`] from the context configuration plus the
/// per-dispatch parameters.
#[derive(Debug, Clone)]
pub struct FrameConstantsBuilder {
    flags: ContextFlags,
    max_render_size: Extent2D,
    display_size: Extent2D,
    velocity_normalization: f32,
}

impl FrameConstantsBuilder {
    /// Captures the creation-time parameters the derivation needs.
    pub fn new(desc: &ContextDescription) -> Self {
        Self {
            flags: desc.flags,
            max_render_size: desc.max_render_size,
            display_size: desc.display_size,
            velocity_normalization: desc.tunables.velocity_normalization,
        }
    }

    /// Builds the constant block for one frame.
    ///
    /// `exposure` is the already-resolved analysis exposure; the caller picks
    /// between the auto-exposure reduction and the dispatch-supplied value.
    pub fn build(
        &self,
        dispatch: &DispatchDescription,
        frame_index: u32,
        previous_jitter: Vec2,
        previous_pre_exposure: f32,
        exposure: f32,
    ) -> FrameConstants {
        let render = dispatch.render_size;
        let display = self.display_size;

        let motion_target = if self.flags.contains(ContextFlags::DISPLAY_RES_MOTION_VECTORS) {
            display
        } else {
            render
        };
        let motion_vector_scale = [
            dispatch.motion_vector_scale.x / motion_target.width.max(1) as f32,
            dispatch.motion_vector_scale.y / motion_target.height.max(1) as f32,
        ];
        let jitter_cancellation = if self
            .flags
            .contains(ContextFlags::MOTION_VECTOR_JITTER_CANCELLATION)
        {
            [
                (previous_jitter.x - dispatch.jitter_offset.x) / motion_target.width.max(1) as f32,
                (previous_jitter.y - dispatch.jitter_offset.y) / motion_target.height.max(1) as f32,
            ]
        } else {
            [0.0, 0.0]
        };

        let mip_count = luma_pyramid_mip_count(self.max_render_size);
        let luma_mip_level = SHADING_CHANGE_MIP_LEVEL.min(mip_count.saturating_sub(1));
        let active = active_mip_extent(render, luma_mip_level);
        let luma_mip_extent = [active.width, active.height];

        FrameConstants {
            render_size: [render.width, render.height],
            max_render_size: [self.max_render_size.width, self.max_render_size.height],
            display_size: [display.width, display.height],
            luma_mip_extent,
            jitter_offset: [dispatch.jitter_offset.x, dispatch.jitter_offset.y],
            motion_vector_scale,
            motion_vector_jitter_cancellation: jitter_cancellation,
            downscale_factor: [
                render.width as f32 / display.width.max(1) as f32,
                render.height as f32 / display.height.max(1) as f32,
            ],
            velocity_factor_scale: [
                display.width as f32 / self.velocity_normalization,
                display.height as f32 / self.velocity_normalization,
            ],
            device_to_view_depth: device_to_view_depth(
                self.flags,
                dispatch.camera_near,
                dispatch.camera_far,
                dispatch.camera_fov_angle_vertical,
                render,
            ),
            luma_mip_level,
            frame_index,
            jitter_phase_count: crate::jitter::jitter_phase_count(render.width, display.width),
            delta_time: saturate(dispatch.frame_time_delta / 1000.0),
            pre_exposure: dispatch.pre_exposure,
            previous_pre_exposure,
            exposure,
            view_space_to_meters: if dispatch.view_space_to_meters_factor > 0.0 {
                dispatch.view_space_to_meters_factor
            } else {
                1.0
            },
        }
    }
}

/// Resolves the 4-element device-to-view depth transform.
///
/// Element 0 and 1 drive [`FrameConstants::view_depth`]; elements 2 and 3 are
/// the reciprocal projection scales used to lift a texel into view space.
/// Near and far are reordered internally, so swapped inputs have no effect;
/// only the depth flags decide the transform.
fn device_to_view_depth(
    flags: ContextFlags,
    camera_near: f32,
    camera_far: f32,
    fov_angle_vertical: f32,
    render_size: Extent2D,
) -> [f32; 4] {
    let inverted = flags.contains(ContextFlags::DEPTH_INVERTED);
    let infinite = flags.contains(ContextFlags::DEPTH_INFINITE);

    let mut f_min = camera_near.min(camera_far);
    let mut f_max = camera_near.max(camera_far);
    if inverted {
        std::mem::swap(&mut f_min, &mut f_max);
    }
    let f_q = f_max / (f_min - f_max);

    let elem_c = match (inverted, infinite) {
        (false, false) | (true, false) => f_q,
        (false, true) => -1.0 - f32::EPSILON,
        (true, true) => f32::EPSILON,
    };
    let elem_e = match (inverted, infinite) {
        (false, false) | (true, false) => f_q * f_min,
        (false, true) => -f_min - f32::EPSILON,
        (true, true) => f_max,
    };

    let aspect = render_size.width as f32 / render_size.height.max(1) as f32;
    let half_fov = 0.5 * fov_angle_vertical;
    let cot_half_fov = half_fov.cos() / half_fov.sin();

    [
        -elem_c,
        elem_e,
        aspect / cot_half_fov,
        1.0 / cot_half_fov,
    ]
}
