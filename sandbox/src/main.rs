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

// Kairos Sandbox
// Demo binary: runs the temporal upscaler over a synthetic scrolling scene
// on the CPU backend and compares the result against a plain bilinear resize.

use anyhow::Result;
use kairos_core::math::{Extent2D, Vec2, FRAC_PI_2, TAU};
use kairos_core::surface::{SurfaceDescriptor, SurfaceFormat, SurfaceUsage};
use kairos_cpu::CpuDevice;
use kairos_upscale::jitter::{jitter_offset, jitter_phase_count};
use kairos_upscale::{
    ContextDescription, ContextFlags, DispatchDescription, QualityMode, UpscaleContext,
    UpscaleDevice,
};

const RENDER: Extent2D = Extent2D::new(320, 180);
const DISPLAY: Extent2D = Extent2D::new(640, 360);
const FRAMES: u32 = 96;
const CUT_FRAME: u32 = 48;

/// Horizontal scroll of the pattern, in render UV per frame.
const SCROLL_UV: f32 = 0.75 / RENDER.width as f32;

/// Procedural test pattern: a soft gradient crossed by rails well under one
/// render texel wide. The rails alias heavily at render resolution and only
/// resolve once samples from several jittered frames are combined.
fn scene(uv: Vec2, phase: f32) -> [f32; 3] {
    let x = uv.x - phase;
    let band = ((x * TAU * 3.0).sin() + 1.0) * 0.5;
    let rail = (x * 48.0).rem_euclid(1.0) < 0.08 || (uv.y * 27.0).rem_euclid(1.0) < 0.08;
    if rail {
        [0.95, 0.93, 0.88]
    } else {
        [
            0.10 + 0.20 * band,
            0.16 + 0.24 * uv.y,
            0.48 - 0.22 * uv.y + 0.08 * band,
        ]
    }
}

/// Renders one frame at `extent`, sampling the scene at each texel center
/// offset by `jitter` (given in texels of that extent).
fn render(extent: Extent2D, jitter: Vec2, phase: f32) -> Vec<[f32; 4]> {
    let mut texels = Vec::with_capacity(extent.texel_count());
    for y in 0..extent.height {
        for x in 0..extent.width {
            let uv = Vec2::new(
                (x as f32 + 0.5 + jitter.x) / extent.width as f32,
                (y as f32 + 0.5 + jitter.y) / extent.height as f32,
            );
            let [r, g, b] = scene(uv, phase);
            texels.push([r, g, b, 1.0]);
        }
    }
    texels
}

/// Peak signal-to-noise ratio of `sample` against the reference frame, over
/// the RGB channels, with a peak of 1.0.
fn psnr(reference: &[[f32; 4]], sample: impl Fn(u32, u32) -> [f32; 4]) -> f32 {
    let mut sum = 0.0f64;
    for y in 0..DISPLAY.height {
        for x in 0..DISPLAY.width {
            let want = reference[(y * DISPLAY.width + x) as usize];
            let got = sample(x, y);
            for channel in 0..3 {
                let err = f64::from(want[channel] - got[channel]);
                sum += err * err;
            }
        }
    }
    let mse = (sum / (DISPLAY.texel_count() as f64 * 3.0)).max(1e-12);
    (-10.0 * mse.log10()) as f32
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    log::info!(
        "Kairos sandbox: upscaling {}x{} -> {}x{} over {} frames",
        RENDER.width,
        RENDER.height,
        DISPLAY.width,
        DISPLAY.height,
        FRAMES
    );

    let mut device = CpuDevice::new();
    let mut context = UpscaleContext::new(
        &mut device,
        &ContextDescription::new(QualityMode::Performance, ContextFlags::NONE, DISPLAY),
    )?;

    let color = device.create_surface(&SurfaceDescriptor::new(
        "scene_color",
        RENDER,
        SurfaceFormat::Rgba16Float,
        SurfaceUsage::SAMPLED,
    ))?;
    let depth = device.create_surface(&SurfaceDescriptor::new(
        "scene_depth",
        RENDER,
        SurfaceFormat::R32Float,
        SurfaceUsage::SAMPLED,
    ))?;
    let motion_vectors = device.create_surface(&SurfaceDescriptor::new(
        "scene_motion",
        RENDER,
        SurfaceFormat::Rg16Float,
        SurfaceUsage::SAMPLED,
    ))?;
    let output = device.create_surface(&SurfaceDescriptor::new(
        "upscaled",
        DISPLAY,
        SurfaceFormat::Rgba16Float,
        SurfaceUsage::STORAGE,
    ))?;

    device.upload_r(depth, &vec![0.5; RENDER.texel_count()])?;
    // The pattern scrolls right by SCROLL_UV per frame, so every texel's
    // previous position sits that far to the left.
    device.upload_rg(motion_vectors, &vec![[-SCROLL_UV, 0.0]; RENDER.texel_count()])?;

    let phase_count = jitter_phase_count(RENDER.width, DISPLAY.width);
    let mut sequence = 0u32;
    for frame in 0..FRAMES {
        let reset = frame == CUT_FRAME;
        if reset {
            sequence = 0;
            log::info!(" -> frame {frame}: simulating a camera cut, history resets");
        }
        let jitter = jitter_offset(sequence, phase_count);
        let phase = frame as f32 * SCROLL_UV;
        device.upload_rgba(color, &render(RENDER, jitter, phase))?;

        let stats = context.dispatch(
            &mut device,
            &DispatchDescription {
                color,
                depth,
                motion_vectors,
                output,
                exposure: None,
                reactive_mask: None,
                transparency_and_composition_mask: None,
                jitter_offset: jitter,
                motion_vector_scale: Vec2::new(RENDER.width as f32, RENDER.height as f32),
                render_size: RENDER,
                enable_sharpening: false,
                sharpness: 0.0,
                frame_time_delta: 16.6,
                pre_exposure: 1.0,
                reset,
                camera_near: 0.1,
                camera_far: 100.0,
                camera_fov_angle_vertical: FRAC_PI_2,
                view_space_to_meters_factor: 1.0,
            },
        )?;
        sequence += 1;

        if frame % 16 == 0 {
            log::info!(
                " -> frame {:>2}: {} passes in {:.1} ms, sequence position {}/{}, exposure {:.2}",
                frame,
                stats.pass_count,
                stats.cpu_time_ms,
                stats.frame_index,
                stats.jitter_phase_count,
                stats.exposure
            );
        }
    }

    // Score the final frame against an unjittered render at display
    // resolution. The bilinear baseline resizes the same frame's render
    // resolution input.
    let last_phase = (FRAMES - 1) as f32 * SCROLL_UV;
    let reference = render(DISPLAY, Vec2::ZERO, last_phase);
    device.upload_rgba(color, &render(RENDER, Vec2::ZERO, last_phase))?;

    let upscaled = device.plane_rgba(output)?;
    let source = device.plane_rgba(color)?;
    let temporal = psnr(&reference, |x, y| upscaled.get(x, y));
    let bilinear = psnr(&reference, |x, y| {
        source.sample_bilinear(Vec2::new(
            (x as f32 + 0.5) / DISPLAY.width as f32,
            (y as f32 + 0.5) / DISPLAY.height as f32,
        ))
    });

    log::info!("Upscaled output: {temporal:.2} dB against the reference render");
    log::info!("Bilinear resize: {bilinear:.2} dB against the reference render");
    log::info!("Temporal gain:   {:+.2} dB", temporal - bilinear);

    context.destroy(&mut device);
    log::info!(
        "Context destroyed, {} caller surfaces remain",
        device.live_surface_count()
    );
    Ok(())
}
