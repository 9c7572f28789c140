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

//! Recording device used by unit tests. Allocates nothing; it hands out ids,
//! remembers descriptors, and logs which passes were submitted.

use crate::config::{ContextDescription, ContextFlags, QualityMode};
use crate::constants::{FrameConstants, FrameConstantsBuilder};
use crate::context::DispatchDescription;
use crate::device::{DeviceCapabilities, DeviceId, PassContext, PassOutput, UpscaleDevice};
use crate::pass::PassJob;
use kairos_core::math::{Extent2D, Vec2};
use kairos_core::surface::{SurfaceDescriptor, SurfaceError, SurfaceFormat, SurfaceId};

/// Dispatch description with neutral camera parameters and no jitter.
/// Motion vectors are interpreted as UV displacements (scale = render size).
/// The caller surface ids sit above the ring's allocation range so they
/// never alias a ring surface, matching a real device's unique handles.
pub(crate) fn test_dispatch(render_size: Extent2D) -> DispatchDescription {
    DispatchDescription {
        color: SurfaceId(100),
        depth: SurfaceId(101),
        motion_vectors: SurfaceId(102),
        output: SurfaceId(103),
        exposure: None,
        reactive_mask: None,
        transparency_and_composition_mask: None,
        jitter_offset: Vec2::ZERO,
        motion_vector_scale: Vec2::new(render_size.width as f32, render_size.height as f32),
        render_size,
        enable_sharpening: false,
        sharpness: 0.0,
        frame_time_delta: 16.6,
        pre_exposure: 1.0,
        reset: false,
        camera_near: 0.1,
        camera_far: 100.0,
        camera_fov_angle_vertical: std::f32::consts::FRAC_PI_2,
        view_space_to_meters_factor: 1.0,
    }
}

/// Frame constants for kernel tests, frame 0, unit exposure.
pub(crate) fn test_constants(
    flags: ContextFlags,
    render_size: Extent2D,
    display_size: Extent2D,
) -> FrameConstants {
    let desc = ContextDescription {
        quality: QualityMode::Performance,
        flags,
        max_render_size: render_size,
        display_size,
        tunables: Default::default(),
        message_callback: None,
    };
    FrameConstantsBuilder::new(&desc).build(&test_dispatch(render_size), 0, Vec2::ZERO, 1.0, 1.0)
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedSurface {
    pub extent: Extent2D,
    pub format: SurfaceFormat,
    pub mip_level_count: u32,
    pub live: bool,
}

#[derive(Debug)]
pub(crate) struct MockDevice {
    id: DeviceId,
    capabilities: DeviceCapabilities,
    surfaces: Vec<RecordedSurface>,
    executed: Vec<PassJob>,
    clears: usize,
    creates_until_failure: Option<usize>,
    auto_exposure: Option<f32>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self {
            id: DeviceId::allocate(),
            capabilities: DeviceCapabilities {
                max_surface_extent: Extent2D::new(8192, 8192),
            },
            surfaces: Vec::new(),
            executed: Vec::new(),
            clears: 0,
            creates_until_failure: None,
            auto_exposure: None,
        }
    }

    pub fn with_max_extent(extent: Extent2D) -> Self {
        let mut device = Self::new();
        device.capabilities.max_surface_extent = extent;
        device
    }

    /// Makes every `create_surface` after the next `remaining` ones fail.
    pub fn fail_creates_after(&mut self, remaining: usize) {
        self.creates_until_failure = Some(remaining);
    }

    /// Value the luminance pass reports as auto exposure.
    pub fn report_auto_exposure(&mut self, exposure: f32) {
        self.auto_exposure = Some(exposure);
    }

    pub fn live_surface_count(&self) -> usize {
        self.surfaces.iter().filter(|s| s.live).count()
    }

    pub fn clear_count(&self) -> usize {
        self.clears
    }

    pub fn descriptor_of(&self, id: SurfaceId) -> &RecordedSurface {
        &self.surfaces[id.0]
    }

    pub fn executed_passes(&self) -> Vec<&'static str> {
        self.executed.iter().map(PassJob::name).collect()
    }

    pub fn executed_jobs(&self) -> &[PassJob] {
        &self.executed
    }

    pub fn reset_recording(&mut self) {
        self.executed.clear();
        self.clears = 0;
    }
}

impl UpscaleDevice for MockDevice {
    fn device_id(&self) -> DeviceId {
        self.id
    }

    fn capabilities(&self) -> DeviceCapabilities {
        self.capabilities
    }

    fn create_surface(&mut self, desc: &SurfaceDescriptor) -> Result<SurfaceId, SurfaceError> {
        if let Some(remaining) = &mut self.creates_until_failure {
            if *remaining == 0 {
                return Err(SurfaceError::OutOfMemory {
                    bytes: (desc.extent.texel_count() as u64)
                        * desc.format.bytes_per_texel() as u64,
                });
            }
            *remaining -= 1;
        }
        let id = SurfaceId(self.surfaces.len());
        self.surfaces.push(RecordedSurface {
            extent: desc.extent,
            format: desc.format,
            mip_level_count: desc.mip_level_count,
            live: true,
        });
        Ok(id)
    }

    fn destroy_surface(&mut self, id: SurfaceId) -> Result<(), SurfaceError> {
        let surface = self.surfaces.get_mut(id.0).ok_or(SurfaceError::InvalidHandle)?;
        if !surface.live {
            return Err(SurfaceError::InvalidHandle);
        }
        surface.live = false;
        Ok(())
    }

    fn clear_surface(&mut self, id: SurfaceId) -> Result<(), SurfaceError> {
        if !self.surfaces.get(id.0).is_some_and(|s| s.live) {
            return Err(SurfaceError::InvalidHandle);
        }
        self.clears += 1;
        Ok(())
    }

    fn execute(&mut self, job: &PassJob, _ctx: &PassContext) -> Result<PassOutput, SurfaceError> {
        self.executed.push(job.clone());
        let mut output = PassOutput::default();
        if matches!(job, PassJob::LuminancePyramid(_)) {
            output.auto_exposure = self.auto_exposure;
        }
        Ok(output)
    }
}
