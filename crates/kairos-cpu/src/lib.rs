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

//! # Kairos CPU
//!
//! Reference backend running the upscale pipeline synchronously in memory.
//! Surfaces are plain texel planes held by a [`CpuDevice`], and pass jobs
//! call straight into the [`kairos_upscale::kernels`] functions. The backend
//! makes the whole pipeline runnable and testable without a GPU, and is the
//! reference a GPU port gets checked against.

pub mod device;
mod execute;

pub use device::CpuDevice;
