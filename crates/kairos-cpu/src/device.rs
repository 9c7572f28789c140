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

//! In-memory surface storage and the backend device.
//!
//! Every surface lives in a slot table indexed by its [`SurfaceId`]; handles
//! are monotonic and never reused, so a destroyed surface's id stays invalid
//! for the lifetime of the device. Texels are stored as `f32` planes
//! regardless of the declared precision, one plane per mip level, which lets
//! pass execution hand them to the kernels without conversion.

use std::fmt;

use kairos_core::math::Extent2D;
use kairos_core::surface::{
    Plane, SurfaceDescriptor, SurfaceError, SurfaceFormat, SurfaceId, Texel,
};
use kairos_upscale::{
    DeviceCapabilities, DeviceId, PassContext, PassJob, PassOutput, UpscaleDevice,
};

use crate::execute;

/// Texel storage of one surface, split by component count.
#[derive(Clone)]
pub(crate) enum SurfaceStore {
    R(Vec<Plane<f32>>),
    Rg(Vec<Plane<[f32; 2]>>),
    Rgba(Vec<Plane<[f32; 4]>>),
}

/// One allocated surface: a descriptor snapshot plus its mip planes.
pub(crate) struct CpuSurface {
    label: Option<String>,
    extent: Extent2D,
    format: SurfaceFormat,
    store: SurfaceStore,
}

impl CpuSurface {
    fn allocate(desc: &SurfaceDescriptor) -> Result<Self, SurfaceError> {
        if desc.extent.is_empty() {
            return Err(SurfaceError::InvalidDescriptor(format!(
                "zero extent {}x{}",
                desc.extent.width, desc.extent.height
            )));
        }
        if desc.mip_level_count == 0 {
            return Err(SurfaceError::InvalidDescriptor(
                "zero mip levels".to_string(),
            ));
        }

        let levels = 0..desc.mip_level_count;
        let store = match desc.format.component_count() {
            1 => SurfaceStore::R(levels.map(|m| Plane::new(desc.mip_extent(m))).collect()),
            2 => SurfaceStore::Rg(levels.map(|m| Plane::new(desc.mip_extent(m))).collect()),
            _ => SurfaceStore::Rgba(levels.map(|m| Plane::new(desc.mip_extent(m))).collect()),
        };
        Ok(Self {
            label: desc.label.as_ref().map(|label| label.to_string()),
            extent: desc.extent,
            format: desc.format,
            store,
        })
    }

    fn mip_count(&self) -> usize {
        match &self.store {
            SurfaceStore::R(mips) => mips.len(),
            SurfaceStore::Rg(mips) => mips.len(),
            SurfaceStore::Rgba(mips) => mips.len(),
        }
    }

    fn clear(&mut self) {
        match &mut self.store {
            SurfaceStore::R(mips) => mips.iter_mut().for_each(|mip| mip.fill(0.0)),
            SurfaceStore::Rg(mips) => mips.iter_mut().for_each(|mip| mip.fill([0.0; 2])),
            SurfaceStore::Rgba(mips) => mips.iter_mut().for_each(|mip| mip.fill([0.0; 4])),
        }
    }

    fn wrong_store(&self, wanted: &str) -> SurfaceError {
        SurfaceError::Backend(format!(
            "surface {:?} holds {:?} texels, pass asked for {wanted}",
            self.label, self.format
        ))
    }

    fn missing_mip(&self, level: usize) -> SurfaceError {
        SurfaceError::Backend(format!(
            "surface {:?} has {} mip level(s), pass asked for level {level}",
            self.label,
            self.mip_count()
        ))
    }

    pub(crate) fn plane_r(&self) -> Result<&Plane<f32>, SurfaceError> {
        self.mip_r(0)
    }

    pub(crate) fn plane_rg(&self) -> Result<&Plane<[f32; 2]>, SurfaceError> {
        match &self.store {
            SurfaceStore::Rg(mips) => mips.first().ok_or_else(|| self.missing_mip(0)),
            _ => Err(self.wrong_store("two channels")),
        }
    }

    pub(crate) fn plane_rgba(&self) -> Result<&Plane<[f32; 4]>, SurfaceError> {
        match &self.store {
            SurfaceStore::Rgba(mips) => mips.first().ok_or_else(|| self.missing_mip(0)),
            _ => Err(self.wrong_store("four channels")),
        }
    }

    pub(crate) fn mip_r(&self, level: usize) -> Result<&Plane<f32>, SurfaceError> {
        match &self.store {
            SurfaceStore::R(mips) => mips.get(level).ok_or_else(|| self.missing_mip(level)),
            _ => Err(self.wrong_store("one channel")),
        }
    }

    pub(crate) fn plane_r_mut(&mut self) -> Result<&mut Plane<f32>, SurfaceError> {
        let wrong_store = self.wrong_store("one channel");
        match &mut self.store {
            SurfaceStore::R(mips) if !mips.is_empty() => Ok(&mut mips[0]),
            SurfaceStore::R(_) => Err(SurfaceError::Backend("surface has no mips".to_string())),
            _ => Err(wrong_store),
        }
    }

    pub(crate) fn plane_rg_mut(&mut self) -> Result<&mut Plane<[f32; 2]>, SurfaceError> {
        let wrong_store = self.wrong_store("two channels");
        match &mut self.store {
            SurfaceStore::Rg(mips) if !mips.is_empty() => Ok(&mut mips[0]),
            SurfaceStore::Rg(_) => Err(SurfaceError::Backend("surface has no mips".to_string())),
            _ => Err(wrong_store),
        }
    }

    pub(crate) fn plane_rgba_mut(&mut self) -> Result<&mut Plane<[f32; 4]>, SurfaceError> {
        let wrong_store = self.wrong_store("four channels");
        match &mut self.store {
            SurfaceStore::Rgba(mips) if !mips.is_empty() => Ok(&mut mips[0]),
            SurfaceStore::Rgba(_) => Err(SurfaceError::Backend("surface has no mips".to_string())),
            _ => Err(wrong_store),
        }
    }

    /// Every mip plane of a single-channel surface, for the pyramid pass.
    pub(crate) fn mips_r_mut(&mut self) -> Result<&mut [Plane<f32>], SurfaceError> {
        let wrong_store = self.wrong_store("one channel");
        match &mut self.store {
            SurfaceStore::R(mips) => Ok(mips.as_mut_slice()),
            _ => Err(wrong_store),
        }
    }
}

impl fmt::Debug for CpuSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuSurface")
            .field("label", &self.label)
            .field("extent", &self.extent)
            .field("format", &self.format)
            .field("mip_count", &self.mip_count())
            .finish()
    }
}

fn copy_into<T: Texel>(plane: &mut Plane<T>, texels: &[T]) -> Result<(), SurfaceError> {
    let extent = plane.extent();
    if texels.len() != extent.texel_count() {
        return Err(SurfaceError::InvalidDescriptor(format!(
            "texel slice length {} does not match extent {}x{}",
            texels.len(),
            extent.width,
            extent.height
        )));
    }
    plane.as_mut_slice().copy_from_slice(texels);
    Ok(())
}

/// Backend holding every surface in memory and running passes synchronously
/// on the calling thread.
#[derive(Debug)]
pub struct CpuDevice {
    id: DeviceId,
    surfaces: Vec<Option<CpuSurface>>,
}

impl CpuDevice {
    pub fn new() -> Self {
        Self {
            id: DeviceId::allocate(),
            surfaces: Vec::new(),
        }
    }

    pub(crate) fn surface(&self, id: SurfaceId) -> Result<&CpuSurface, SurfaceError> {
        self.surfaces
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or(SurfaceError::InvalidHandle)
    }

    fn surface_mut(&mut self, id: SurfaceId) -> Result<&mut CpuSurface, SurfaceError> {
        self.surfaces
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or(SurfaceError::InvalidHandle)
    }

    /// Detaches a surface from its slot for the duration of a pass.
    ///
    /// While detached the id resolves to [`SurfaceError::InvalidHandle`], so
    /// a job binding the same surface for reading and writing fails instead
    /// of observing half-written texels.
    pub(crate) fn take(&mut self, id: SurfaceId) -> Result<CpuSurface, SurfaceError> {
        self.surfaces
            .get_mut(id.0)
            .and_then(Option::take)
            .ok_or(SurfaceError::InvalidHandle)
    }

    pub(crate) fn restore(&mut self, id: SurfaceId, surface: CpuSurface) {
        if let Some(slot) = self.surfaces.get_mut(id.0) {
            *slot = Some(surface);
        }
    }

    /// Copies `texels` into mip 0 of a single-channel surface.
    pub fn upload_r(&mut self, id: SurfaceId, texels: &[f32]) -> Result<(), SurfaceError> {
        copy_into(self.surface_mut(id)?.plane_r_mut()?, texels)
    }

    /// Copies `texels` into mip 0 of a two-channel surface.
    pub fn upload_rg(&mut self, id: SurfaceId, texels: &[[f32; 2]]) -> Result<(), SurfaceError> {
        copy_into(self.surface_mut(id)?.plane_rg_mut()?, texels)
    }

    /// Copies `texels` into mip 0 of a four-channel surface.
    pub fn upload_rgba(&mut self, id: SurfaceId, texels: &[[f32; 4]]) -> Result<(), SurfaceError> {
        copy_into(self.surface_mut(id)?.plane_rgba_mut()?, texels)
    }

    /// Mip 0 of a single-channel surface.
    pub fn plane_r(&self, id: SurfaceId) -> Result<&Plane<f32>, SurfaceError> {
        self.surface(id)?.plane_r()
    }

    /// Mip 0 of a two-channel surface.
    pub fn plane_rg(&self, id: SurfaceId) -> Result<&Plane<[f32; 2]>, SurfaceError> {
        self.surface(id)?.plane_rg()
    }

    /// Mip 0 of a four-channel surface.
    pub fn plane_rgba(&self, id: SurfaceId) -> Result<&Plane<[f32; 4]>, SurfaceError> {
        self.surface(id)?.plane_rgba()
    }

    /// One mip of a single-channel surface.
    pub fn mip_r(&self, id: SurfaceId, level: usize) -> Result<&Plane<f32>, SurfaceError> {
        self.surface(id)?.mip_r(level)
    }

    /// Number of currently allocated surfaces.
    pub fn live_surface_count(&self) -> usize {
        self.surfaces.iter().filter(|slot| slot.is_some()).count()
    }
}

impl Default for CpuDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl UpscaleDevice for CpuDevice {
    fn device_id(&self) -> DeviceId {
        self.id
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            max_surface_extent: Extent2D::new(16_384, 16_384),
        }
    }

    fn create_surface(&mut self, desc: &SurfaceDescriptor) -> Result<SurfaceId, SurfaceError> {
        let surface = CpuSurface::allocate(desc)?;
        let id = SurfaceId(self.surfaces.len());
        log::trace!(
            "Allocated surface {:?}: {}x{} {:?}, {} mip(s)",
            surface.label,
            surface.extent.width,
            surface.extent.height,
            surface.format,
            surface.mip_count()
        );
        self.surfaces.push(Some(surface));
        Ok(id)
    }

    fn destroy_surface(&mut self, id: SurfaceId) -> Result<(), SurfaceError> {
        let surface = self.take(id)?;
        log::trace!("Destroyed surface {:?}", surface.label);
        Ok(())
    }

    fn clear_surface(&mut self, id: SurfaceId) -> Result<(), SurfaceError> {
        self.surface_mut(id)?.clear();
        Ok(())
    }

    fn execute(&mut self, job: &PassJob, ctx: &PassContext) -> Result<PassOutput, SurfaceError> {
        execute::run(self, job, ctx)
    }
}
