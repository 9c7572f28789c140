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

//! Backend abstraction executing the upscaler's passes.
//!
//! The context never touches texels itself; it creates surfaces through an
//! [`UpscaleDevice`] and submits typed [`PassJob`]s to it. A backend is free
//! to run them on a GPU queue or, like the bundled CPU backend, synchronously
//! in memory.

use crate::config::{ContextFlags, Tunables};
use crate::constants::FrameConstants;
use crate::pass::PassJob;
use kairos_core::surface::{SurfaceDescriptor, SurfaceError, SurfaceId};
use kairos_core::math::Extent2D;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a device instance.
///
/// A context records the id of the device it was created on and refuses to
/// dispatch on any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(u64);

impl DeviceId {
    /// Allocates a process-unique id. Called once per device instance.
    pub fn allocate() -> Self {
        Self(NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Static limits a backend reports at context creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// Largest surface extent the backend can allocate.
    pub max_surface_extent: Extent2D,
}

/// Read-only frame state handed to every pass execution.
#[derive(Debug, Clone, Copy)]
pub struct PassContext<'a> {
    /// The frame's constant block.
    pub constants: &'a FrameConstants,
    /// The context's tuning constants.
    pub tunables: &'a Tunables,
    /// Feature flags the context was created with.
    pub flags: ContextFlags,
}

/// Values a pass reports back to the orchestrator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassOutput {
    /// Exposure reduced from the frame's luminance, reported by the
    /// luminance-pyramid pass when auto exposure is enabled.
    pub auto_exposure: Option<f32>,
}

/// A device that allocates surfaces and executes upscaler passes.
///
/// All methods take `&mut self`; the upscaler is single threaded per device
/// and serializes every pass of a dispatch through one exclusive borrow.
pub trait UpscaleDevice: Send + Sync + fmt::Debug {
    /// The id allocated when this device was created.
    fn device_id(&self) -> DeviceId;

    /// Static limits of this backend.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Allocates a surface and returns its handle.
    fn create_surface(&mut self, desc: &SurfaceDescriptor) -> Result<SurfaceId, SurfaceError>;

    /// Releases a surface. The handle is invalid afterwards.
    fn destroy_surface(&mut self, id: SurfaceId) -> Result<(), SurfaceError>;

    /// Fills every mip of a surface with zeroes.
    fn clear_surface(&mut self, id: SurfaceId) -> Result<(), SurfaceError>;

    /// Runs one pass to completion.
    fn execute(&mut self, job: &PassJob, ctx: &PassContext) -> Result<PassOutput, SurfaceError>;
}
