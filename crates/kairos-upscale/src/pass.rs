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

//! Typed pass jobs.
//!
//! A dispatch is a fixed chain of passes: luminance pyramid, reconstruct
//! previous depth, depth clip, create locks, accumulate, and optionally a
//! sharpening pass. The orchestrator resolves every surface handle into a
//! job up front; backends receive fully-bound jobs and never consult the
//! dispatch description or the ring themselves.

use crate::context::ReactiveFlags;
use kairos_core::surface::SurfaceId;

/// Bound surfaces for the luminance-pyramid pass.
#[derive(Debug, Clone)]
pub struct LuminancePyramidJob {
    /// Input color at render resolution.
    pub color: SurfaceId,
    /// Mipped luminance pyramid to fill, half render resolution at mip 0.
    pub luma_pyramid: SurfaceId,
    /// Reduce the pyramid to a log-average exposure and report it in the
    /// pass output.
    pub compute_auto_exposure: bool,
}

/// Bound surfaces for the reconstruct-previous-depth pass.
#[derive(Debug, Clone)]
pub struct ReconstructPreviousDepthJob {
    /// Input device depth.
    pub depth: SurfaceId,
    /// Raw input motion vectors.
    pub motion_vectors: SurfaceId,
    /// Previous frame's nearest depth scattered onto the current grid.
    pub reconstructed_depth: SurfaceId,
    /// Nearest-depth dilated depth, current generation.
    pub dilated_depth: SurfaceId,
    /// Nearest-depth dilated motion vectors, current generation.
    pub dilated_motion_vectors: SurfaceId,
}

/// Bound surfaces for the depth-clip pass.
#[derive(Debug, Clone)]
pub struct DepthClipJob {
    /// Input color at render resolution.
    pub color: SurfaceId,
    /// Dilated device depth, current generation.
    pub dilated_depth: SurfaceId,
    /// Scattered previous depth from the reconstruct pass.
    pub reconstructed_depth: SurfaceId,
    /// Dilated motion vectors, current generation.
    pub dilated_motion_vectors: SurfaceId,
    /// Caller reactivity mask, constant zero when absent.
    pub reactive_mask: Option<SurfaceId>,
    /// Caller transparency-and-composition mask, constant zero when absent.
    pub transparency_and_composition_mask: Option<SurfaceId>,
    /// Per-texel disocclusion factor, 1.0 where history is invalid.
    pub disocclusion: SurfaceId,
    /// Exposure-adjusted color with luma in alpha.
    pub prepared_color: SurfaceId,
    /// Dilated reactive and transparency masks, paired per texel.
    pub dilated_reactive: SurfaceId,
}

/// Bound surfaces for the lock-creation pass.
#[derive(Debug, Clone)]
pub struct CreateLocksJob {
    /// Prepared color carrying luma, render resolution.
    pub prepared_color: SurfaceId,
    /// Display-resolution mask of new-lock requests.
    pub new_locks: SurfaceId,
}

/// Bound surfaces for the accumulation pass.
///
/// Reads the previous generation of every persisted surface and writes the
/// current one; the generation split is resolved by the orchestrator before
/// the job reaches a backend.
#[derive(Debug, Clone)]
pub struct AccumulateJob {
    /// Prepared color from the depth-clip pass.
    pub prepared_color: SurfaceId,
    /// Disocclusion factor from the depth-clip pass.
    pub disocclusion: SurfaceId,
    /// Dilated reactive and transparency masks.
    pub dilated_reactive: SurfaceId,
    /// Dilated motion vectors, current generation.
    pub dilated_motion_vectors: SurfaceId,
    /// Luminance pyramid for shading-change detection.
    pub luma_pyramid: SurfaceId,
    /// New-lock requests from the lock pass.
    pub new_locks: SurfaceId,
    /// History color and weight, previous generation.
    pub previous_history_color: SurfaceId,
    /// Lock status, previous generation.
    pub previous_lock_status: SurfaceId,
    /// Luma window, previous generation.
    pub previous_luma_history: SurfaceId,
    /// Temporal reactive factor, previous generation.
    pub previous_temporal_reactive: SurfaceId,
    /// History color and weight, current generation.
    pub history_color: SurfaceId,
    /// Lock status, current generation.
    pub lock_status: SurfaceId,
    /// Luma window, current generation.
    pub luma_history: SurfaceId,
    /// Temporal reactive factor, current generation.
    pub temporal_reactive: SurfaceId,
    /// Display-resolution target: the caller's output, or the internal
    /// surface when a sharpening pass follows.
    pub output: SurfaceId,
}

/// Bound surfaces for the sharpening pass.
#[derive(Debug, Clone)]
pub struct RcasJob {
    /// Accumulated color to sharpen.
    pub color: SurfaceId,
    /// The caller's output surface.
    pub output: SurfaceId,
    /// Sharpening strength in `[0, 1]`.
    pub sharpness: f32,
}

/// Bound surfaces for standalone reactive-mask generation.
#[derive(Debug, Clone)]
pub struct GenerateReactiveJob {
    /// Scene color rendered with opaque geometry only.
    pub color_opaque_only: SurfaceId,
    /// Final scene color before upscaling.
    pub color_pre_upscale: SurfaceId,
    /// Output reactivity mask.
    pub out_reactive: SurfaceId,
    /// Multiplier on the detected difference.
    pub scale: f32,
    /// Differences at or below this threshold produce zero reactivity.
    pub cutoff_threshold: f32,
    /// Value written where the thresholded difference saturates.
    pub binary_value: f32,
    /// Generation options.
    pub flags: ReactiveFlags,
}

/// One fully-bound pass, ready for a backend to execute.
#[derive(Debug, Clone)]
pub enum PassJob {
    /// Luminance pyramid and optional auto-exposure reduction.
    LuminancePyramid(LuminancePyramidJob),
    /// Depth/motion dilation and previous-depth scatter.
    ReconstructPreviousDepth(ReconstructPreviousDepthJob),
    /// Disocclusion estimation and color preparation.
    DepthClip(DepthClipJob),
    /// Thin-feature detection raising lock requests.
    CreateLocks(CreateLocksJob),
    /// History reprojection, rectification, and blending.
    Accumulate(AccumulateJob),
    /// Contrast-adaptive sharpening.
    Rcas(RcasJob),
    /// Standalone reactive-mask generation.
    GenerateReactive(GenerateReactiveJob),
}

impl PassJob {
    /// Stable name of the pass, used in logs and stats.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LuminancePyramid(_) => "luminance_pyramid",
            Self::ReconstructPreviousDepth(_) => "reconstruct_previous_depth",
            Self::DepthClip(_) => "depth_clip",
            Self::CreateLocks(_) => "create_locks",
            Self::Accumulate(_) => "accumulate",
            Self::Rcas(_) => "rcas",
            Self::GenerateReactive(_) => "generate_reactive",
        }
    }

    /// Surfaces this pass reads.
    pub fn reads(&self) -> Vec<SurfaceId> {
        match self {
            Self::LuminancePyramid(job) => vec![job.color],
            Self::ReconstructPreviousDepth(job) => vec![job.depth, job.motion_vectors],
            Self::DepthClip(job) => {
                let mut reads = vec![
                    job.color,
                    job.dilated_depth,
                    job.reconstructed_depth,
                    job.dilated_motion_vectors,
                ];
                reads.extend(job.reactive_mask);
                reads.extend(job.transparency_and_composition_mask);
                reads
            }
            Self::CreateLocks(job) => vec![job.prepared_color],
            Self::Accumulate(job) => vec![
                job.prepared_color,
                job.disocclusion,
                job.dilated_reactive,
                job.dilated_motion_vectors,
                job.luma_pyramid,
                job.new_locks,
                job.previous_history_color,
                job.previous_lock_status,
                job.previous_luma_history,
                job.previous_temporal_reactive,
            ],
            Self::Rcas(job) => vec![job.color],
            Self::GenerateReactive(job) => vec![job.color_opaque_only, job.color_pre_upscale],
        }
    }

    /// Surfaces this pass writes.
    pub fn writes(&self) -> Vec<SurfaceId> {
        match self {
            Self::LuminancePyramid(job) => vec![job.luma_pyramid],
            Self::ReconstructPreviousDepth(job) => vec![
                job.reconstructed_depth,
                job.dilated_depth,
                job.dilated_motion_vectors,
            ],
            Self::DepthClip(job) => vec![job.disocclusion, job.prepared_color, job.dilated_reactive],
            Self::CreateLocks(job) => vec![job.new_locks],
            Self::Accumulate(job) => vec![
                job.history_color,
                job.lock_status,
                job.luma_history,
                job.temporal_reactive,
                job.output,
            ],
            Self::Rcas(job) => vec![job.output],
            Self::GenerateReactive(job) => vec![job.out_reactive],
        }
    }

    /// Whether no surface is both read and written by this pass.
    ///
    /// Holds by construction for jobs built by the orchestrator: history
    /// reads come from the previous ring generation, writes go to the
    /// current one.
    pub fn accesses_disjoint(&self) -> bool {
        let writes = self.writes();
        self.reads().iter().all(|read| !writes.contains(read))
    }
}
