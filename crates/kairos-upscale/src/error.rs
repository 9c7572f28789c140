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

//! Defines the error type returned by the upscaler's entry points.

use crate::device::DeviceId;
use kairos_core::math::Extent2D;
use kairos_core::surface::SurfaceError;
use thiserror::Error;

/// An error returned by context creation, dispatch, or reactive-mask generation.
///
/// Propagation is fail-fast: the first failure short-circuits the operation
/// and nothing further is submitted to the device.
#[derive(Debug, Error)]
pub enum UpscaleError {
    /// A caller-supplied parameter violates the documented contract.
    /// Checked eagerly at entry.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The requested render size exceeds the maximum configured at context
    /// creation.
    #[error("render size {requested:?} exceeds the maximum {maximum:?} configured at creation")]
    OutOfRange {
        /// The render size the dispatch asked for.
        requested: Extent2D,
        /// The maximum render size the context was created with.
        maximum: Extent2D,
    },

    /// The device does not provide a capability the requested configuration
    /// needs.
    #[error("device interface incomplete: {0}")]
    IncompleteInterface(&'static str),

    /// The device passed to `dispatch` is not the device the context was
    /// created on.
    #[error("device {actual:?} is not the device {expected:?} this context was created on")]
    WrongDevice {
        /// The device the context was created on.
        expected: DeviceId,
        /// The device handed to the failing call.
        actual: DeviceId,
    },

    /// A surface operation failed inside the backend.
    #[error(transparent)]
    Device(#[from] SurfaceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_errors_convert() {
        fn fails() -> Result<(), UpscaleError> {
            Err(SurfaceError::InvalidHandle)?
        }
        assert!(matches!(fails(), Err(UpscaleError::Device(_))));
    }

    #[test]
    fn out_of_range_mentions_both_sizes() {
        let err = UpscaleError::OutOfRange {
            requested: Extent2D::new(2560, 1440),
            maximum: Extent2D::new(1920, 1080),
        };
        let text = err.to_string();
        assert!(text.contains("2560"));
        assert!(text.contains("1080"));
    }
}
