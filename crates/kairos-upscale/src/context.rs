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

//! Context lifecycle and per-frame orchestration.
//!
//! [`UpscaleContext`] owns the resource ring and drives one frame per
//! [`dispatch`](UpscaleContext::dispatch): it derives the frame constants,
//! resolves ring and caller surfaces into typed pass jobs, and submits the
//! fixed pass chain to the device. All per-pixel work happens inside the
//! passes; the context only routes surfaces and carries the state that
//! crosses frames (jitter, exposure, the frame counter).

use crate::config::{ContextDescription, ContextFlags, MessageCallback, Tunables};
use crate::constants::{FrameConstants, FrameConstantsBuilder};
use crate::device::{DeviceId, PassContext, UpscaleDevice};
use crate::error::UpscaleError;
use crate::pass::{
    AccumulateJob, CreateLocksJob, DepthClipJob, GenerateReactiveJob, LuminancePyramidJob,
    PassJob, RcasJob, ReconstructPreviousDepthJob,
};
use crate::ring::{FrameResources, Generation, PersistentSurface, ResourceRing, ScratchSurface};
use crate::validation::validate_dispatch;
use bytemuck::Zeroable;
use kairos_core::math::{Extent2D, Vec2};
use kairos_core::surface::SurfaceId;
use kairos_core::Stopwatch;
use serde::{Deserialize, Serialize};

/// Options of the standalone reactive-mask generation pass.
///
/// Multiple flags can be combined using bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ReactiveFlags {
    bits: u32,
}

impl ReactiveFlags {
    /// No flags.
    pub const NONE: Self = Self { bits: 0 };
    /// Tonemap both inputs before measuring their difference.
    pub const APPLY_TONEMAP: Self = Self { bits: 1 << 0 };
    /// Apply the inverse tonemap to both inputs before measuring.
    pub const APPLY_INVERSE_TONEMAP: Self = Self { bits: 1 << 1 };
    /// Zero differences at or below the cutoff and write the binary value
    /// above it.
    pub const APPLY_THRESHOLD: Self = Self { bits: 1 << 2 };
    /// Measure the difference as the per-component maximum instead of the
    /// luminance of the difference.
    pub const USE_COMPONENTS_MAX: Self = Self { bits: 1 << 3 };

    /// Creates a new set of flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if these flags contain every flag in `other`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if these flags are empty.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for ReactiveFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for ReactiveFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Everything the context needs to upscale one frame.
///
/// Surface handles are borrowed for the duration of the dispatch only; the
/// context never retains them across calls.
#[derive(Debug, Clone)]
pub struct DispatchDescription {
    /// Rendered scene color at render resolution, jittered.
    pub color: SurfaceId,
    /// Device depth at render resolution.
    pub depth: SurfaceId,
    /// Motion vectors; resolution and encoding follow the context flags.
    pub motion_vectors: SurfaceId,
    /// Display-resolution target the upscaled frame is written to.
    pub output: SurfaceId,
    /// Analysis exposure for this frame. Ignored under
    /// [`ContextFlags::AUTO_EXPOSURE`]; defaults to 1.0 when absent.
    pub exposure: Option<f32>,
    /// Caller-authored reactivity mask, if any.
    pub reactive_mask: Option<SurfaceId>,
    /// Caller-authored transparency-and-composition mask, if any.
    pub transparency_and_composition_mask: Option<SurfaceId>,
    /// Sub-pixel camera offset applied this frame, in render pixels.
    pub jitter_offset: Vec2,
    /// Scale turning a stored motion vector into a texel displacement.
    pub motion_vector_scale: Vec2,
    /// Resolution the inputs were rendered at. May shrink below the maximum
    /// under [`ContextFlags::DYNAMIC_RESOLUTION`].
    pub render_size: Extent2D,
    /// Run the sharpening pass after accumulation.
    pub enable_sharpening: bool,
    /// Sharpening strength in `[0, 1]`.
    pub sharpness: f32,
    /// Time since the previous dispatch, in milliseconds.
    pub frame_time_delta: f32,
    /// Exposure already baked into the input color. Must be positive.
    pub pre_exposure: f32,
    /// Discard all history before blending (camera cut, scene load).
    pub reset: bool,
    /// Distance to the near clipping plane.
    pub camera_near: f32,
    /// Distance to the far clipping plane.
    pub camera_far: f32,
    /// Vertical field of view, in radians.
    pub camera_fov_angle_vertical: f32,
    /// Scale from view-space units to meters.
    pub view_space_to_meters_factor: f32,
}

/// Inputs of the standalone reactive-mask generation pass.
#[derive(Debug, Clone)]
pub struct GenerateReactiveDescription {
    /// Scene color rendered with opaque geometry only.
    pub color_opaque_only: SurfaceId,
    /// Final scene color before upscaling, including transparency.
    pub color_pre_upscale: SurfaceId,
    /// Output reactivity mask, render resolution.
    pub out_reactive: SurfaceId,
    /// Resolution the two input colors were rendered at.
    pub render_size: Extent2D,
    /// Multiplier on the measured difference.
    pub scale: f32,
    /// Differences at or below this value produce zero reactivity under
    /// [`ReactiveFlags::APPLY_THRESHOLD`].
    pub cutoff_threshold: f32,
    /// Value written where the thresholded difference saturates.
    pub binary_value: f32,
    /// Generation options.
    pub flags: ReactiveFlags,
}

/// Summary of one completed dispatch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchStats {
    /// Index of the frame inside the jitter sequence.
    pub frame_index: u32,
    /// Number of pass jobs submitted; six when sharpening is enabled.
    pub pass_count: usize,
    /// Whether persisted history was cleared before blending.
    pub reset: bool,
    /// Length of the jitter cycle at this frame's render resolution.
    pub jitter_phase_count: u32,
    /// Analysis exposure the frame was processed with.
    pub exposure: f32,
    /// CPU time spent recording and executing the frame, in milliseconds.
    pub cpu_time_ms: f32,
}

/// How a dispatch treats the persisted history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    /// Persisted surfaces are cleared first; accumulation restarts.
    Reset,
    /// History carries over from the previous dispatch.
    Steady,
}

/// A live upscaler instance bound to one device.
///
/// Created once per output target, dispatched once per rendered frame. The
/// context owns the double-buffered resource ring; caller surfaces are bound
/// per dispatch and released before it returns.
#[derive(Debug)]
pub struct UpscaleContext {
    device_id: DeviceId,
    flags: ContextFlags,
    max_render_size: Extent2D,
    tunables: Tunables,
    message_callback: Option<MessageCallback>,
    builder: FrameConstantsBuilder,
    ring: ResourceRing,
    /// Constant block of the most recent dispatch. The standalone reactive
    /// pass reuses it; its kernel reads no per-frame state.
    constants: FrameConstants,
    /// Index of the next frame. Restarts at zero on reset.
    frame_index: u32,
    dispatched_once: bool,
    previous_jitter: Vec2,
    previous_pre_exposure: f32,
    /// Exposure reduced by the previous frame's luminance pass. Applied with
    /// one frame of latency under [`ContextFlags::AUTO_EXPOSURE`].
    auto_exposure: f32,
}

impl UpscaleContext {
    /// Creates a context and allocates both ring generations up front.
    ///
    /// Fails with [`UpscaleError::InvalidArgument`] on degenerate sizes,
    /// [`UpscaleError::IncompleteInterface`] when the device cannot allocate
    /// display-sized surfaces, and [`UpscaleError::Device`] when a surface
    /// allocation itself fails.
    pub fn new(
        device: &mut dyn UpscaleDevice,
        desc: &ContextDescription,
    ) -> Result<Self, UpscaleError> {
        if desc.display_size.is_empty() {
            return Err(UpscaleError::InvalidArgument(
                "display_size has a zero dimension",
            ));
        }
        if desc.max_render_size.is_empty() {
            return Err(UpscaleError::InvalidArgument(
                "max_render_size has a zero dimension",
            ));
        }
        if !desc.max_render_size.fits_within(desc.display_size) {
            return Err(UpscaleError::InvalidArgument(
                "max_render_size exceeds display_size",
            ));
        }
        if desc.flags.contains(ContextFlags::DEBUG_CHECKING) && desc.message_callback.is_none() {
            return Err(UpscaleError::InvalidArgument(
                "DEBUG_CHECKING is set without a message_callback",
            ));
        }

        let limit = device.capabilities().max_surface_extent;
        if !desc.display_size.fits_within(limit) {
            return Err(UpscaleError::IncompleteInterface(
                "display_size exceeds the device's maximum surface extent",
            ));
        }

        let ring = ResourceRing::new(device, desc.display_size, desc.max_render_size)?;
        log::info!(
            "Created upscale context: max render {}x{}, display {}x{} ({:?})",
            desc.max_render_size.width,
            desc.max_render_size.height,
            desc.display_size.width,
            desc.display_size.height,
            desc.quality,
        );

        Ok(Self {
            device_id: device.device_id(),
            flags: desc.flags,
            max_render_size: desc.max_render_size,
            tunables: desc.tunables,
            message_callback: desc.message_callback,
            builder: FrameConstantsBuilder::new(desc),
            ring,
            constants: FrameConstants::zeroed(),
            frame_index: 0,
            dispatched_once: false,
            previous_jitter: Vec2::ZERO,
            previous_pre_exposure: 1.0,
            auto_exposure: 1.0,
        })
    }

    /// Upscales one frame.
    ///
    /// Builds the frame constants, binds every surface into the fixed pass
    /// chain, and submits the chain in order. The first failure
    /// short-circuits; nothing further is submitted.
    pub fn dispatch(
        &mut self,
        device: &mut dyn UpscaleDevice,
        dispatch: &DispatchDescription,
    ) -> Result<DispatchStats, UpscaleError> {
        let watch = Stopwatch::new();
        self.check_device(device)?;
        let render = dispatch.render_size;
        if render.is_empty() {
            return Err(UpscaleError::InvalidArgument(
                "render_size has a zero dimension",
            ));
        }
        if !render.fits_within(self.max_render_size) {
            return Err(UpscaleError::OutOfRange {
                requested: render,
                maximum: self.max_render_size,
            });
        }

        if self.flags.contains(ContextFlags::DEBUG_CHECKING) {
            if let Some(report) = self.message_callback {
                validate_dispatch(self.flags, self.max_render_size, dispatch, report);
            }
        }

        let kind = if dispatch.reset || !self.dispatched_once {
            FrameKind::Reset
        } else {
            FrameKind::Steady
        };
        if kind == FrameKind::Reset {
            self.ring.clear_persisted(device)?;
            self.frame_index = 0;
            self.previous_jitter = Vec2::ZERO;
            self.previous_pre_exposure = dispatch.pre_exposure;
            log::debug!("Persisted history cleared; accumulation restarts");
        }

        let exposure = if self.flags.contains(ContextFlags::AUTO_EXPOSURE) {
            self.auto_exposure
        } else {
            dispatch.exposure.unwrap_or(1.0)
        };
        self.constants = self.builder.build(
            dispatch,
            self.frame_index,
            self.previous_jitter,
            self.previous_pre_exposure,
            exposure,
        );

        let frame = FrameResources::bind(dispatch);
        let current = Generation::from_frame_index(self.frame_index);
        let jobs = self.frame_jobs(&frame, current, dispatch);

        let mut reduced_exposure = None;
        let ctx = PassContext {
            constants: &self.constants,
            tunables: &self.tunables,
            flags: self.flags,
        };
        for job in &jobs {
            debug_assert!(
                job.accesses_disjoint(),
                "pass {} binds a surface for both read and write",
                job.name(),
            );
            let output = device.execute(job, &ctx)?;
            if let Some(value) = output.auto_exposure {
                reduced_exposure = Some(value);
            }
        }

        let stats = DispatchStats {
            frame_index: self.frame_index,
            pass_count: jobs.len(),
            reset: kind == FrameKind::Reset,
            jitter_phase_count: self.constants.jitter_phase_count,
            exposure,
            cpu_time_ms: watch.elapsed_ms(),
        };

        if let Some(value) = reduced_exposure {
            self.auto_exposure = value;
        }
        self.previous_jitter = dispatch.jitter_offset;
        self.previous_pre_exposure = dispatch.pre_exposure;
        self.frame_index = self.frame_index.wrapping_add(1);
        self.dispatched_once = true;

        Ok(stats)
    }

    /// Derives a reactivity mask from the difference between an opaque-only
    /// and the final render of the same frame.
    ///
    /// Runs as a single pass, independent of the frame state; it neither
    /// reads nor advances the accumulation history.
    pub fn generate_reactive_mask(
        &mut self,
        device: &mut dyn UpscaleDevice,
        desc: &GenerateReactiveDescription,
    ) -> Result<(), UpscaleError> {
        self.check_device(device)?;
        if desc.render_size.is_empty() {
            return Err(UpscaleError::InvalidArgument(
                "render_size has a zero dimension",
            ));
        }
        if !desc.render_size.fits_within(self.max_render_size) {
            return Err(UpscaleError::OutOfRange {
                requested: desc.render_size,
                maximum: self.max_render_size,
            });
        }

        let job = PassJob::GenerateReactive(GenerateReactiveJob {
            color_opaque_only: desc.color_opaque_only,
            color_pre_upscale: desc.color_pre_upscale,
            out_reactive: desc.out_reactive,
            scale: desc.scale,
            cutoff_threshold: desc.cutoff_threshold,
            binary_value: desc.binary_value,
            flags: desc.flags,
        });
        let ctx = PassContext {
            constants: &self.constants,
            tunables: &self.tunables,
            flags: self.flags,
        };
        device.execute(&job, &ctx)?;
        Ok(())
    }

    /// Releases every internal surface.
    ///
    /// Individual release failures are logged and skipped so a partially
    /// broken device cannot leak the remaining surfaces.
    pub fn destroy(self, device: &mut dyn UpscaleDevice) {
        if device.device_id() != self.device_id {
            log::error!(
                "Upscale context destroyed with a device it was not created on; surfaces leak"
            );
            return;
        }
        self.ring.destroy(device);
        log::info!("Destroyed upscale context");
    }

    fn check_device(&self, device: &dyn UpscaleDevice) -> Result<(), UpscaleError> {
        let actual = device.device_id();
        if actual != self.device_id {
            return Err(UpscaleError::WrongDevice {
                expected: self.device_id,
                actual,
            });
        }
        Ok(())
    }

    /// Resolves the fixed pass chain for one frame.
    ///
    /// The chain is always luminance pyramid, reconstruct previous depth,
    /// depth clip, create locks, accumulate; a sharpening pass is appended
    /// when requested, rerouting accumulation through the internal surface.
    fn frame_jobs(
        &self,
        frame: &FrameResources,
        current: Generation,
        dispatch: &DispatchDescription,
    ) -> Vec<PassJob> {
        let previous = current.previous();
        let accumulate_target = if dispatch.enable_sharpening {
            self.ring.scratch(ScratchSurface::InternalUpscaled)
        } else {
            frame.output
        };

        let mut jobs = vec![
            PassJob::LuminancePyramid(LuminancePyramidJob {
                color: frame.color,
                luma_pyramid: self.ring.scratch(ScratchSurface::LumaPyramid),
                compute_auto_exposure: self.flags.contains(ContextFlags::AUTO_EXPOSURE),
            }),
            PassJob::ReconstructPreviousDepth(ReconstructPreviousDepthJob {
                depth: frame.depth,
                motion_vectors: frame.motion_vectors,
                reconstructed_depth: self.ring.scratch(ScratchSurface::ReconstructedPrevDepth),
                dilated_depth: self.ring.persisted(PersistentSurface::DilatedDepth, current),
                dilated_motion_vectors: self
                    .ring
                    .persisted(PersistentSurface::DilatedMotionVectors, current),
            }),
            PassJob::DepthClip(DepthClipJob {
                color: frame.color,
                dilated_depth: self.ring.persisted(PersistentSurface::DilatedDepth, current),
                reconstructed_depth: self.ring.scratch(ScratchSurface::ReconstructedPrevDepth),
                dilated_motion_vectors: self
                    .ring
                    .persisted(PersistentSurface::DilatedMotionVectors, current),
                reactive_mask: frame.reactive_mask,
                transparency_and_composition_mask: frame.transparency_and_composition_mask,
                disocclusion: self.ring.scratch(ScratchSurface::Disocclusion),
                prepared_color: self.ring.scratch(ScratchSurface::PreparedColor),
                dilated_reactive: self.ring.scratch(ScratchSurface::DilatedReactive),
            }),
            PassJob::CreateLocks(CreateLocksJob {
                prepared_color: self.ring.scratch(ScratchSurface::PreparedColor),
                new_locks: self.ring.scratch(ScratchSurface::NewLocks),
            }),
            PassJob::Accumulate(AccumulateJob {
                prepared_color: self.ring.scratch(ScratchSurface::PreparedColor),
                disocclusion: self.ring.scratch(ScratchSurface::Disocclusion),
                dilated_reactive: self.ring.scratch(ScratchSurface::DilatedReactive),
                dilated_motion_vectors: self
                    .ring
                    .persisted(PersistentSurface::DilatedMotionVectors, current),
                luma_pyramid: self.ring.scratch(ScratchSurface::LumaPyramid),
                new_locks: self.ring.scratch(ScratchSurface::NewLocks),
                previous_history_color: self
                    .ring
                    .persisted(PersistentSurface::HistoryColor, previous),
                previous_lock_status: self.ring.persisted(PersistentSurface::LockStatus, previous),
                previous_luma_history: self
                    .ring
                    .persisted(PersistentSurface::LumaHistory, previous),
                previous_temporal_reactive: self
                    .ring
                    .persisted(PersistentSurface::TemporalReactive, previous),
                history_color: self.ring.persisted(PersistentSurface::HistoryColor, current),
                lock_status: self.ring.persisted(PersistentSurface::LockStatus, current),
                luma_history: self.ring.persisted(PersistentSurface::LumaHistory, current),
                temporal_reactive: self
                    .ring
                    .persisted(PersistentSurface::TemporalReactive, current),
                output: accumulate_target,
            }),
        ];

        if dispatch.enable_sharpening {
            jobs.push(PassJob::Rcas(RcasJob {
                color: self.ring.scratch(ScratchSurface::InternalUpscaled),
                output: frame.output,
                sharpness: dispatch.sharpness.clamp(0.0, 1.0),
            }));
        }

        jobs
    }
}
