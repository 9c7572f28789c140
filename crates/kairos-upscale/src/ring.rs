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

//! Surface ownership across frames.
//!
//! Temporal state is double buffered: each persisted surface exists in two
//! generations, and a frame reads the previous generation while writing the
//! current one. The generation is selected by frame-index parity and passed
//! explicitly into every access, so a pass can never read and write the same
//! generation by accident. Scratch surfaces live for one dispatch's pass
//! chain and have a single copy.

use crate::constants::luma_pyramid_mip_count;
use crate::context::DispatchDescription;
use crate::device::UpscaleDevice;
use kairos_core::math::Extent2D;
use kairos_core::surface::{SurfaceDescriptor, SurfaceError, SurfaceFormat, SurfaceId, SurfaceUsage};

/// Per-pixel state carried from frame to frame, one surface per variant,
/// two generations each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistentSurface {
    /// Nearest-depth dilated device depth, render resolution.
    DilatedDepth,
    /// Nearest-depth dilated motion vectors, render resolution.
    DilatedMotionVectors,
    /// Lock lifetime and temporal luminance, display resolution.
    LockStatus,
    /// Accumulated color with its weight in alpha, display resolution.
    HistoryColor,
    /// Rolling window of the last four exposure-normalized lumas, display
    /// resolution.
    LumaHistory,
    /// Signed temporal reactive factor, display resolution.
    TemporalReactive,
}

impl PersistentSurface {
    /// Every persisted surface, in allocation order.
    pub const ALL: [Self; 6] = [
        Self::DilatedDepth,
        Self::DilatedMotionVectors,
        Self::LockStatus,
        Self::HistoryColor,
        Self::LumaHistory,
        Self::TemporalReactive,
    ];

    const fn index(self) -> usize {
        match self {
            Self::DilatedDepth => 0,
            Self::DilatedMotionVectors => 1,
            Self::LockStatus => 2,
            Self::HistoryColor => 3,
            Self::LumaHistory => 4,
            Self::TemporalReactive => 5,
        }
    }

    const fn format(self) -> SurfaceFormat {
        match self {
            Self::DilatedDepth => SurfaceFormat::R32Float,
            Self::DilatedMotionVectors => SurfaceFormat::Rg16Float,
            Self::LockStatus => SurfaceFormat::Rg16Float,
            Self::HistoryColor => SurfaceFormat::Rgba16Float,
            Self::LumaHistory => SurfaceFormat::Rgba16Float,
            Self::TemporalReactive => SurfaceFormat::R16Float,
        }
    }

    fn extent(self, display_size: Extent2D, max_render_size: Extent2D) -> Extent2D {
        match self {
            Self::DilatedDepth | Self::DilatedMotionVectors => max_render_size,
            Self::LockStatus | Self::HistoryColor | Self::LumaHistory | Self::TemporalReactive => {
                display_size
            }
        }
    }

    const fn label(self, generation: Generation) -> &'static str {
        match (self, generation.0) {
            (Self::DilatedDepth, 0) => "kairos_dilated_depth_0",
            (Self::DilatedDepth, _) => "kairos_dilated_depth_1",
            (Self::DilatedMotionVectors, 0) => "kairos_dilated_motion_vectors_0",
            (Self::DilatedMotionVectors, _) => "kairos_dilated_motion_vectors_1",
            (Self::LockStatus, 0) => "kairos_lock_status_0",
            (Self::LockStatus, _) => "kairos_lock_status_1",
            (Self::HistoryColor, 0) => "kairos_history_color_0",
            (Self::HistoryColor, _) => "kairos_history_color_1",
            (Self::LumaHistory, 0) => "kairos_luma_history_0",
            (Self::LumaHistory, _) => "kairos_luma_history_1",
            (Self::TemporalReactive, 0) => "kairos_temporal_reactive_0",
            (Self::TemporalReactive, _) => "kairos_temporal_reactive_1",
        }
    }
}

/// Surfaces produced and consumed within a single dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScratchSurface {
    /// Mipped luminance pyramid at half render resolution.
    LumaPyramid,
    /// Previous frame's depth scattered onto the current grid.
    ReconstructedPrevDepth,
    /// Disocclusion factor from the depth-clip pass.
    Disocclusion,
    /// Exposure-adjusted input color with its luma in alpha.
    PreparedColor,
    /// Dilated reactive and transparency masks, paired per texel.
    DilatedReactive,
    /// New-lock requests raised by the lock pass.
    NewLocks,
    /// Accumulation output when a sharpening pass follows.
    InternalUpscaled,
}

impl ScratchSurface {
    /// Every scratch surface, in allocation order.
    pub const ALL: [Self; 7] = [
        Self::LumaPyramid,
        Self::ReconstructedPrevDepth,
        Self::Disocclusion,
        Self::PreparedColor,
        Self::DilatedReactive,
        Self::NewLocks,
        Self::InternalUpscaled,
    ];

    const fn index(self) -> usize {
        match self {
            Self::LumaPyramid => 0,
            Self::ReconstructedPrevDepth => 1,
            Self::Disocclusion => 2,
            Self::PreparedColor => 3,
            Self::DilatedReactive => 4,
            Self::NewLocks => 5,
            Self::InternalUpscaled => 6,
        }
    }

    const fn format(self) -> SurfaceFormat {
        match self {
            Self::LumaPyramid => SurfaceFormat::R16Float,
            Self::ReconstructedPrevDepth => SurfaceFormat::R32Float,
            Self::Disocclusion => SurfaceFormat::R16Float,
            Self::PreparedColor => SurfaceFormat::Rgba16Float,
            Self::DilatedReactive => SurfaceFormat::Rg16Float,
            Self::NewLocks => SurfaceFormat::R8Unorm,
            Self::InternalUpscaled => SurfaceFormat::Rgba16Float,
        }
    }

    fn extent(self, display_size: Extent2D, max_render_size: Extent2D) -> Extent2D {
        match self {
            Self::LumaPyramid => max_render_size.half(),
            Self::ReconstructedPrevDepth
            | Self::Disocclusion
            | Self::PreparedColor
            | Self::DilatedReactive => max_render_size,
            Self::NewLocks | Self::InternalUpscaled => display_size,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::LumaPyramid => "kairos_luma_pyramid",
            Self::ReconstructedPrevDepth => "kairos_reconstructed_previous_depth",
            Self::Disocclusion => "kairos_disocclusion",
            Self::PreparedColor => "kairos_prepared_color",
            Self::DilatedReactive => "kairos_dilated_reactive",
            Self::NewLocks => "kairos_new_locks",
            Self::InternalUpscaled => "kairos_internal_upscaled",
        }
    }
}

/// Which half of the double buffer a frame writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(usize);

impl Generation {
    /// The generation written by the frame with this index.
    pub const fn from_frame_index(frame_index: u32) -> Self {
        Self((frame_index % 2) as usize)
    }

    /// The other half, read as history.
    pub const fn previous(self) -> Self {
        Self(self.0 ^ 1)
    }
}

/// Owns every internal surface of a context.
///
/// All surfaces are allocated up front at creation, sized by the maximum
/// render resolution, and live until [`ResourceRing::destroy`].
#[derive(Debug)]
pub struct ResourceRing {
    persisted: [[SurfaceId; PersistentSurface::ALL.len()]; 2],
    scratch: [SurfaceId; ScratchSurface::ALL.len()],
}

impl ResourceRing {
    /// Allocates both generations of every persisted surface plus the
    /// scratch set. On failure every surface created so far is released
    /// before the error is returned.
    pub fn new(
        device: &mut dyn UpscaleDevice,
        display_size: Extent2D,
        max_render_size: Extent2D,
    ) -> Result<Self, SurfaceError> {
        let mut created = Vec::new();
        match Self::allocate(device, display_size, max_render_size, &mut created) {
            Ok(ring) => Ok(ring),
            Err(err) => {
                for id in created.into_iter().rev() {
                    if let Err(destroy_err) = device.destroy_surface(id) {
                        log::warn!(
                            "Failed to release surface {:?} while unwinding ring allocation: {}",
                            id,
                            destroy_err
                        );
                    }
                }
                Err(err)
            }
        }
    }

    fn allocate(
        device: &mut dyn UpscaleDevice,
        display_size: Extent2D,
        max_render_size: Extent2D,
        created: &mut Vec<SurfaceId>,
    ) -> Result<Self, SurfaceError> {
        let mut persisted = [[SurfaceId(0); PersistentSurface::ALL.len()]; 2];
        for generation in [Generation(0), Generation(1)] {
            for surface in PersistentSurface::ALL {
                let desc = SurfaceDescriptor::new(
                    surface.label(generation),
                    surface.extent(display_size, max_render_size),
                    surface.format(),
                    SurfaceUsage::SAMPLED_STORAGE,
                );
                let id = device.create_surface(&desc)?;
                created.push(id);
                persisted[generation.0][surface.index()] = id;
            }
        }

        let mut scratch = [SurfaceId(0); ScratchSurface::ALL.len()];
        for surface in ScratchSurface::ALL {
            let mip_level_count = match surface {
                ScratchSurface::LumaPyramid => luma_pyramid_mip_count(max_render_size),
                _ => 1,
            };
            let desc = SurfaceDescriptor {
                label: Some(surface.label().into()),
                extent: surface.extent(display_size, max_render_size),
                format: surface.format(),
                mip_level_count,
                usage: SurfaceUsage::SAMPLED_STORAGE,
            };
            let id = device.create_surface(&desc)?;
            created.push(id);
            scratch[surface.index()] = id;
        }

        Ok(Self { persisted, scratch })
    }

    /// Handle of a persisted surface in the given generation.
    pub fn persisted(&self, surface: PersistentSurface, generation: Generation) -> SurfaceId {
        self.persisted[generation.0][surface.index()]
    }

    /// Handle of a scratch surface.
    pub fn scratch(&self, surface: ScratchSurface) -> SurfaceId {
        self.scratch[surface.index()]
    }

    /// Zeroes both generations of every persisted surface.
    pub fn clear_persisted(&self, device: &mut dyn UpscaleDevice) -> Result<(), SurfaceError> {
        for generation in &self.persisted {
            for id in generation {
                device.clear_surface(*id)?;
            }
        }
        Ok(())
    }

    /// Releases every surface. Failures are logged and do not stop the
    /// remaining releases.
    pub fn destroy(self, device: &mut dyn UpscaleDevice) {
        let ids = self
            .persisted
            .iter()
            .flatten()
            .chain(self.scratch.iter())
            .copied();
        for id in ids {
            if let Err(err) = device.destroy_surface(id) {
                log::warn!("Failed to release ring surface {:?}: {}", id, err);
            }
        }
    }
}

/// External surfaces bound for exactly one dispatch.
///
/// Assembled from the dispatch description at the top of a frame and dropped
/// when the dispatch returns; the context never retains caller handles.
#[derive(Debug, Clone, Copy)]
pub struct FrameResources {
    /// Rendered color at render resolution.
    pub color: SurfaceId,
    /// Device depth at render resolution.
    pub depth: SurfaceId,
    /// Motion vectors, render or display resolution per the context flags.
    pub motion_vectors: SurfaceId,
    /// Display-resolution output target.
    pub output: SurfaceId,
    /// Caller-authored reactivity mask, if any.
    pub reactive_mask: Option<SurfaceId>,
    /// Caller-authored transparency-and-composition mask, if any.
    pub transparency_and_composition_mask: Option<SurfaceId>,
}

impl FrameResources {
    /// Captures the caller's handles for the current dispatch.
    pub fn bind(dispatch: &DispatchDescription) -> Self {
        Self {
            color: dispatch.color,
            depth: dispatch.depth,
            motion_vectors: dispatch.motion_vectors,
            output: dispatch.output,
            reactive_mask: dispatch.reactive_mask,
            transparency_and_composition_mask: dispatch.transparency_and_composition_mask,
        }
    }
}
