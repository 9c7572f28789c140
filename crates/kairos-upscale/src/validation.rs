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

//! Non-fatal dispatch validation.
//!
//! Under [`ContextFlags::DEBUG_CHECKING`] every dispatch is screened for
//! parameters that are legal but almost certainly wrong (a jitter offset
//! larger than a pixel, swapped depth planes, a frame time that looks like
//! seconds). Findings go exclusively to the context's message callback; the
//! dispatch itself proceeds unchanged.

use crate::config::{ContextFlags, MessageCallback};
use crate::context::DispatchDescription;
use kairos_core::math::Extent2D;
use std::fmt;

/// Weight of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationSeverity {
    /// Suspicious but possibly intentional.
    Warning,
    /// Certain to produce broken output.
    Error,
}

impl fmt::Display for ValidationSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationSeverity::Warning => write!(f, "warning"),
            ValidationSeverity::Error => write!(f, "error"),
        }
    }
}

/// Screens one dispatch description and reports findings through `report`.
pub(crate) fn validate_dispatch(
    flags: ContextFlags,
    max_render_size: Extent2D,
    dispatch: &DispatchDescription,
    report: MessageCallback,
) {
    if dispatch.jitter_offset.x.abs() > 1.0 || dispatch.jitter_offset.y.abs() > 1.0 {
        report(
            ValidationSeverity::Warning,
            "jitter_offset lies outside [-1, 1]; offsets are in render pixels, not UV",
        );
    }

    let scale = dispatch.motion_vector_scale;
    if scale.x == 0.0 || scale.y == 0.0 {
        report(
            ValidationSeverity::Warning,
            "motion_vector_scale has a zero component; motion vectors collapse to zero",
        );
    }
    if scale.x.abs() > 2.0 * max_render_size.width as f32
        || scale.y.abs() > 2.0 * max_render_size.height as f32
    {
        report(
            ValidationSeverity::Warning,
            "motion_vector_scale exceeds twice the render resolution",
        );
    }

    if flags.contains(ContextFlags::DEPTH_INVERTED) {
        if dispatch.camera_near < dispatch.camera_far {
            report(
                ValidationSeverity::Warning,
                "depth is flagged inverted but camera_near is less than camera_far",
            );
        }
    } else if dispatch.camera_near > dispatch.camera_far {
        report(
            ValidationSeverity::Warning,
            "camera_near is greater than camera_far without the inverted-depth flag",
        );
    }

    if dispatch.camera_fov_angle_vertical <= 0.0 {
        report(
            ValidationSeverity::Error,
            "camera_fov_angle_vertical must be positive",
        );
    } else if dispatch.camera_fov_angle_vertical > std::f32::consts::PI {
        report(
            ValidationSeverity::Error,
            "camera_fov_angle_vertical exceeds pi; the value is radians, not degrees",
        );
    }

    if dispatch.frame_time_delta < 1.0 {
        report(
            ValidationSeverity::Warning,
            "frame_time_delta is below 1.0; the value is milliseconds (~16.6 at 60Hz)",
        );
    }

    if dispatch.pre_exposure <= 0.0 {
        report(ValidationSeverity::Error, "pre_exposure must be positive");
    }

    if dispatch.render_size != max_render_size && !flags.contains(ContextFlags::DYNAMIC_RESOLUTION)
    {
        report(
            ValidationSeverity::Warning,
            "render_size differs from max_render_size without the dynamic-resolution flag",
        );
    }
}
