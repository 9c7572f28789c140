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

//! Pass execution over in-memory surfaces.
//!
//! Each job resolves its handles against the device and hands the planes to
//! the matching kernel. Write bindings are detached from the slot table for
//! the duration of the pass, so a job that names the same surface as a read
//! and a write fails with [`SurfaceError::InvalidHandle`] instead of racing
//! its own output.

use kairos_core::surface::{SurfaceError, SurfaceId};
use kairos_upscale::kernels::accumulate::{run_accumulate, AccumulateInputs, AccumulateOutputs};
use kairos_upscale::kernels::depth_clip::run_depth_clip;
use kairos_upscale::kernels::locks::run_create_locks;
use kairos_upscale::kernels::prepare::run_luminance_pyramid;
use kairos_upscale::kernels::rcas::run_rcas;
use kairos_upscale::kernels::reactive::run_generate_reactive;
use kairos_upscale::kernels::reconstruct::run_reconstruct_previous_depth;
use kairos_upscale::pass::{
    AccumulateJob, CreateLocksJob, DepthClipJob, GenerateReactiveJob, LuminancePyramidJob, PassJob,
    RcasJob, ReconstructPreviousDepthJob,
};
use kairos_upscale::{PassContext, PassOutput};

use crate::device::{CpuDevice, CpuSurface};

pub(crate) fn run(
    device: &mut CpuDevice,
    job: &PassJob,
    ctx: &PassContext,
) -> Result<PassOutput, SurfaceError> {
    log::trace!("Executing {} pass", job.name());
    match job {
        PassJob::LuminancePyramid(job) => luminance_pyramid(device, job, ctx),
        PassJob::ReconstructPreviousDepth(job) => reconstruct_previous_depth(device, job, ctx),
        PassJob::DepthClip(job) => depth_clip(device, job, ctx),
        PassJob::CreateLocks(job) => create_locks(device, job, ctx),
        PassJob::Accumulate(job) => accumulate(device, job, ctx),
        PassJob::Rcas(job) => rcas(device, job),
        PassJob::GenerateReactive(job) => generate_reactive(device, job),
    }
}

/// Detaches the given surfaces, runs `body` with the rest of the device
/// readable, and reattaches them afterwards.
///
/// Detaching fails when a surface is missing or named twice; whatever was
/// already taken is put back before the error surfaces.
fn with_writes<const N: usize, R>(
    device: &mut CpuDevice,
    ids: [SurfaceId; N],
    body: impl FnOnce(&CpuDevice, &mut [CpuSurface; N]) -> Result<R, SurfaceError>,
) -> Result<R, SurfaceError> {
    let mut taken: Vec<CpuSurface> = Vec::with_capacity(N);
    for (index, id) in ids.into_iter().enumerate() {
        match device.take(id) {
            Ok(surface) => taken.push(surface),
            Err(err) => {
                for (&slot, surface) in ids[..index].iter().zip(taken) {
                    device.restore(slot, surface);
                }
                return Err(err);
            }
        }
    }
    let mut writes = match <[CpuSurface; N]>::try_from(taken) {
        Ok(writes) => writes,
        Err(taken) => {
            for (slot, surface) in ids.into_iter().zip(taken) {
                device.restore(slot, surface);
            }
            return Err(SurfaceError::Backend(
                "write binding count mismatch".to_string(),
            ));
        }
    };

    let result = body(device, &mut writes);
    for (slot, surface) in ids.into_iter().zip(writes) {
        device.restore(slot, surface);
    }
    result
}

fn luminance_pyramid(
    device: &mut CpuDevice,
    job: &LuminancePyramidJob,
    ctx: &PassContext,
) -> Result<PassOutput, SurfaceError> {
    with_writes(device, [job.luma_pyramid], |device, writes| {
        let [pyramid] = writes;
        let color = device.surface(job.color)?.plane_rgba()?;
        let auto_exposure = run_luminance_pyramid(
            color,
            pyramid.mips_r_mut()?,
            ctx.constants,
            ctx.tunables,
            job.compute_auto_exposure,
        );
        Ok(PassOutput { auto_exposure })
    })
}

fn reconstruct_previous_depth(
    device: &mut CpuDevice,
    job: &ReconstructPreviousDepthJob,
    ctx: &PassContext,
) -> Result<PassOutput, SurfaceError> {
    with_writes(
        device,
        [
            job.reconstructed_depth,
            job.dilated_depth,
            job.dilated_motion_vectors,
        ],
        |device, writes| {
            let [reconstructed, dilated_depth, dilated_motion] = writes;
            let depth = device.surface(job.depth)?.plane_r()?;
            let motion_vectors = device.surface(job.motion_vectors)?.plane_rg()?;
            run_reconstruct_previous_depth(
                depth,
                motion_vectors,
                ctx.flags,
                ctx.constants,
                reconstructed.plane_r_mut()?,
                dilated_depth.plane_r_mut()?,
                dilated_motion.plane_rg_mut()?,
            );
            Ok(PassOutput::default())
        },
    )
}

fn depth_clip(
    device: &mut CpuDevice,
    job: &DepthClipJob,
    ctx: &PassContext,
) -> Result<PassOutput, SurfaceError> {
    with_writes(
        device,
        [job.disocclusion, job.prepared_color, job.dilated_reactive],
        |device, writes| {
            let [disocclusion, prepared_color, dilated_reactive] = writes;
            let color = device.surface(job.color)?.plane_rgba()?;
            let dilated_depth = device.surface(job.dilated_depth)?.plane_r()?;
            let reconstructed = device.surface(job.reconstructed_depth)?.plane_r()?;
            let dilated_motion = device.surface(job.dilated_motion_vectors)?.plane_rg()?;
            let reactive_mask = job
                .reactive_mask
                .map(|id| device.surface(id)?.plane_r())
                .transpose()?;
            let transparency_mask = job
                .transparency_and_composition_mask
                .map(|id| device.surface(id)?.plane_r())
                .transpose()?;
            run_depth_clip(
                color,
                dilated_depth,
                reconstructed,
                dilated_motion,
                reactive_mask,
                transparency_mask,
                ctx.constants,
                ctx.tunables,
                disocclusion.plane_r_mut()?,
                prepared_color.plane_rgba_mut()?,
                dilated_reactive.plane_rg_mut()?,
            );
            Ok(PassOutput::default())
        },
    )
}

fn create_locks(
    device: &mut CpuDevice,
    job: &CreateLocksJob,
    ctx: &PassContext,
) -> Result<PassOutput, SurfaceError> {
    with_writes(device, [job.new_locks], |device, writes| {
        let [new_locks] = writes;
        let prepared_color = device.surface(job.prepared_color)?.plane_rgba()?;
        run_create_locks(
            prepared_color,
            ctx.constants,
            ctx.tunables,
            new_locks.plane_r_mut()?,
        );
        Ok(PassOutput::default())
    })
}

fn accumulate(
    device: &mut CpuDevice,
    job: &AccumulateJob,
    ctx: &PassContext,
) -> Result<PassOutput, SurfaceError> {
    with_writes(
        device,
        [
            job.history_color,
            job.lock_status,
            job.luma_history,
            job.temporal_reactive,
            job.output,
        ],
        |device, writes| {
            let [history_color, lock_status, luma_history, temporal_reactive, output] = writes;
            let inputs = AccumulateInputs {
                prepared_color: device.surface(job.prepared_color)?.plane_rgba()?,
                disocclusion: device.surface(job.disocclusion)?.plane_r()?,
                dilated_reactive: device.surface(job.dilated_reactive)?.plane_rg()?,
                dilated_motion_vectors: device.surface(job.dilated_motion_vectors)?.plane_rg()?,
                shading_luma_mip: device
                    .surface(job.luma_pyramid)?
                    .mip_r(ctx.constants.luma_mip_level as usize)?,
                new_locks: device.surface(job.new_locks)?.plane_r()?,
                previous_history_color: device.surface(job.previous_history_color)?.plane_rgba()?,
                previous_lock_status: device.surface(job.previous_lock_status)?.plane_rg()?,
                previous_luma_history: device.surface(job.previous_luma_history)?.plane_rgba()?,
                previous_temporal_reactive: device
                    .surface(job.previous_temporal_reactive)?
                    .plane_r()?,
            };
            let mut outputs = AccumulateOutputs {
                history_color: history_color.plane_rgba_mut()?,
                lock_status: lock_status.plane_rg_mut()?,
                luma_history: luma_history.plane_rgba_mut()?,
                temporal_reactive: temporal_reactive.plane_r_mut()?,
                output: output.plane_rgba_mut()?,
            };
            run_accumulate(&inputs, ctx.constants, ctx.tunables, &mut outputs);
            Ok(PassOutput::default())
        },
    )
}

fn rcas(device: &mut CpuDevice, job: &RcasJob) -> Result<PassOutput, SurfaceError> {
    with_writes(device, [job.output], |device, writes| {
        let [output] = writes;
        let color = device.surface(job.color)?.plane_rgba()?;
        run_rcas(color, job.sharpness, output.plane_rgba_mut()?);
        Ok(PassOutput::default())
    })
}

fn generate_reactive(
    device: &mut CpuDevice,
    job: &GenerateReactiveJob,
) -> Result<PassOutput, SurfaceError> {
    with_writes(device, [job.out_reactive], |device, writes| {
        let [out_reactive] = writes;
        let color_opaque_only = device.surface(job.color_opaque_only)?.plane_rgba()?;
        let color_pre_upscale = device.surface(job.color_pre_upscale)?.plane_rgba()?;
        run_generate_reactive(
            color_opaque_only,
            color_pre_upscale,
            job.scale,
            job.cutoff_threshold,
            job.binary_value,
            job.flags,
            out_reactive.plane_r_mut()?,
        );
        Ok(PassOutput::default())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::math::{Extent2D, Vec2, FRAC_PI_2};
    use kairos_core::surface::{SurfaceDescriptor, SurfaceFormat, SurfaceUsage};
    use kairos_upscale::{
        ContextDescription, ContextFlags, DispatchDescription, FrameConstants,
        FrameConstantsBuilder, QualityMode, Tunables, UpscaleDevice,
    };

    const RENDER: Extent2D = Extent2D::new(8, 8);
    const DISPLAY: Extent2D = Extent2D::new(16, 16);

    fn constants() -> FrameConstants {
        let desc = ContextDescription {
            quality: QualityMode::Performance,
            flags: ContextFlags::NONE,
            max_render_size: RENDER,
            display_size: DISPLAY,
            tunables: Tunables::default(),
            message_callback: None,
        };
        let dispatch = DispatchDescription {
            color: SurfaceId(0),
            depth: SurfaceId(1),
            motion_vectors: SurfaceId(2),
            output: SurfaceId(3),
            exposure: None,
            reactive_mask: None,
            transparency_and_composition_mask: None,
            jitter_offset: Vec2::ZERO,
            motion_vector_scale: Vec2::new(RENDER.width as f32, RENDER.height as f32),
            render_size: RENDER,
            enable_sharpening: false,
            sharpness: 0.0,
            frame_time_delta: 16.6,
            pre_exposure: 1.0,
            reset: false,
            camera_near: 0.1,
            camera_far: 100.0,
            camera_fov_angle_vertical: FRAC_PI_2,
            view_space_to_meters_factor: 1.0,
        };
        FrameConstantsBuilder::new(&desc).build(&dispatch, 0, Vec2::ZERO, 1.0, 1.0)
    }

    fn rgba_surface(device: &mut CpuDevice, extent: Extent2D) -> SurfaceId {
        device
            .create_surface(&SurfaceDescriptor::new(
                "test",
                extent,
                SurfaceFormat::Rgba16Float,
                SurfaceUsage::SAMPLED_STORAGE,
            ))
            .unwrap()
    }

    #[test]
    fn aliased_read_write_binding_fails_and_restores() {
        let mut device = CpuDevice::new();
        let surface = rgba_surface(&mut device, DISPLAY);
        let frame = constants();
        let tunables = Tunables::default();
        let ctx = PassContext {
            constants: &frame,
            tunables: &tunables,
            flags: ContextFlags::NONE,
        };

        let job = PassJob::Rcas(RcasJob {
            color: surface,
            output: surface,
            sharpness: 0.5,
        });
        assert!(matches!(
            device.execute(&job, &ctx),
            Err(SurfaceError::InvalidHandle)
        ));
        // The failed pass must leave the surface attached.
        assert!(device.plane_rgba(surface).is_ok());
    }

    #[test]
    fn unknown_write_binding_fails_without_side_effects() {
        let mut device = CpuDevice::new();
        let color = rgba_surface(&mut device, DISPLAY);
        let frame = constants();
        let tunables = Tunables::default();
        let ctx = PassContext {
            constants: &frame,
            tunables: &tunables,
            flags: ContextFlags::NONE,
        };

        let job = PassJob::Rcas(RcasJob {
            color,
            output: SurfaceId(99),
            sharpness: 0.5,
        });
        assert!(matches!(
            device.execute(&job, &ctx),
            Err(SurfaceError::InvalidHandle)
        ));
        assert!(device.plane_rgba(color).is_ok());
    }

    #[test]
    fn rcas_runs_through_the_device() {
        let mut device = CpuDevice::new();
        let color = rgba_surface(&mut device, DISPLAY);
        let output = rgba_surface(&mut device, DISPLAY);
        device
            .upload_rgba(
                color,
                &vec![[0.25, 0.25, 0.25, 1.0]; DISPLAY.texel_count()],
            )
            .unwrap();

        let frame = constants();
        let tunables = Tunables::default();
        let ctx = PassContext {
            constants: &frame,
            tunables: &tunables,
            flags: ContextFlags::NONE,
        };
        let job = PassJob::Rcas(RcasJob {
            color,
            output,
            sharpness: 1.0,
        });
        device.execute(&job, &ctx).unwrap();

        // Sharpening a flat field changes nothing.
        let out = device.plane_rgba(output).unwrap().get(8, 8);
        assert!((out[0] - 0.25).abs() < 1e-4, "out {out:?}");
    }

    #[test]
    fn wrong_channel_count_is_a_backend_error() {
        let mut device = CpuDevice::new();
        let color = rgba_surface(&mut device, RENDER);
        let narrow = device
            .create_surface(&SurfaceDescriptor::new(
                "narrow",
                RENDER,
                SurfaceFormat::R32Float,
                SurfaceUsage::SAMPLED_STORAGE,
            ))
            .unwrap();
        let frame = constants();
        let tunables = Tunables::default();
        let ctx = PassContext {
            constants: &frame,
            tunables: &tunables,
            flags: ContextFlags::NONE,
        };

        // Channel counts are checked before any texel moves.
        let job = PassJob::LuminancePyramid(LuminancePyramidJob {
            color: narrow,
            luma_pyramid: color,
            compute_auto_exposure: false,
        });
        assert!(matches!(
            device.execute(&job, &ctx),
            Err(SurfaceError::Backend(_))
        ));
        assert!(device.plane_rgba(color).is_ok());
        assert!(device.plane_r(narrow).is_ok());
    }
}
