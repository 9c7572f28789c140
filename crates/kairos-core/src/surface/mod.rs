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

//! Defines the surface vocabulary shared between the upscaler and its backends.
//!
//! A *surface* is a 2D grid of texels owned by a backend device. The upscaler
//! only ever refers to surfaces through opaque [`SurfaceId`] handles; the
//! texel data itself lives behind the device boundary. [`Plane`] provides the
//! CPU-side typed storage used by the reference backend and by upload staging.

pub mod descriptor;
pub mod error;
pub mod format;
pub mod plane;

pub use descriptor::{SurfaceDescriptor, SurfaceId, SurfaceUsage};
pub use error::SurfaceError;
pub use format::SurfaceFormat;
pub use plane::{Plane, Texel};
