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

//! Per-pixel pass math.
//!
//! Each pass kernel is a pure function over explicit pixel grids: it reads
//! its input planes, walks every output texel once, and writes planes it
//! holds exclusively. No kernel logs, allocates surfaces, or keeps state
//! between calls; everything frame-wide arrives through [`FrameConstants`]
//! and [`Tunables`].
//!
//! [`FrameConstants`]: crate::constants::FrameConstants
//! [`Tunables`]: crate::config::Tunables

pub mod accumulate;
pub mod color;
pub mod depth_clip;
pub mod locks;
pub mod prepare;
pub mod rcas;
pub mod reactive;
pub mod reconstruct;
pub mod rectify;
pub mod sampling;
pub mod upsample;
