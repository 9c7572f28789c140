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

//! # Kairos Upscale
//!
//! The temporal super-resolution pipeline. From a sequence of low-resolution
//! jittered frames (color, depth, motion vectors, optional masks) the
//! [`UpscaleContext`] produces a temporally-stable higher-resolution output by
//! blending each fresh sample with a continuously refined per-pixel history.
//!
//! The crate is backend-agnostic: all per-pixel math lives in [`kernels`] as
//! pure functions over CPU planes, and the [`UpscaleDevice`] trait is the seam
//! a backend implements to own surface storage and run typed pass jobs.

pub mod config;
pub mod constants;
pub mod context;
pub mod device;
pub mod error;
pub mod jitter;
pub mod kernels;
pub mod lock;
pub mod pass;
pub mod ring;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_device;

pub use config::{ContextDescription, ContextFlags, QualityMode, Tunables};
pub use constants::{FrameConstants, FrameConstantsBuilder};
pub use context::{
    DispatchDescription, DispatchStats, GenerateReactiveDescription, ReactiveFlags, UpscaleContext,
};
pub use device::{DeviceCapabilities, DeviceId, PassContext, PassOutput, UpscaleDevice};
pub use error::UpscaleError;
pub use pass::PassJob;
pub use validation::ValidationSeverity;
