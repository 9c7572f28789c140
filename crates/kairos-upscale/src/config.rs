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

//! Context-level configuration: quality presets, feature flags, and tunables.

use crate::validation::ValidationSeverity;
use kairos_core::math::Extent2D;
use serde::{Deserialize, Serialize};

/// Quality presets mapping a display resolution to a render resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityMode {
    /// 1.5x upscale per axis.
    Quality,
    /// 1.7x upscale per axis.
    Balanced,
    /// 2.0x upscale per axis.
    Performance,
    /// 3.0x upscale per axis.
    UltraPerformance,
}

impl QualityMode {
    /// Returns the per-axis downscale ratio between display and render size.
    pub const fn downscale_factor(&self) -> f32 {
        match self {
            QualityMode::Quality => 1.5,
            QualityMode::Balanced => 1.7,
            QualityMode::Performance => 2.0,
            QualityMode::UltraPerformance => 3.0,
        }
    }

    /// Derives the render resolution for a display resolution under this preset.
    ///
    /// The division truncates rather than rounds, so a 1920x1080 display at
    /// `Balanced` renders at 1129x635.
    pub fn render_size_for(&self, display_size: Extent2D) -> Extent2D {
        let ratio = self.downscale_factor();
        Extent2D::new(
            (display_size.width as f32 / ratio) as u32,
            (display_size.height as f32 / ratio) as u32,
        )
    }
}

/// Flags selecting how the context interprets its inputs.
///
/// Multiple flags can be combined using bitwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContextFlags {
    bits: u32,
}

impl ContextFlags {
    /// No flags.
    pub const NONE: Self = Self { bits: 0 };
    /// Input color is high dynamic range (linear, components may exceed 1.0).
    pub const HDR_INPUT: Self = Self { bits: 1 << 0 };
    /// Motion vectors are provided at display resolution instead of render resolution.
    pub const DISPLAY_RES_MOTION_VECTORS: Self = Self { bits: 1 << 1 };
    /// Motion vectors already include the per-frame jitter and the context
    /// must cancel it during reprojection.
    pub const MOTION_VECTOR_JITTER_CANCELLATION: Self = Self { bits: 1 << 2 };
    /// The depth buffer is inverted (1.0 at the near plane).
    pub const DEPTH_INVERTED: Self = Self { bits: 1 << 3 };
    /// The depth buffer uses an infinite far plane.
    pub const DEPTH_INFINITE: Self = Self { bits: 1 << 4 };
    /// Derive the exposure scalar from the luminance pyramid instead of the
    /// per-dispatch value.
    pub const AUTO_EXPOSURE: Self = Self { bits: 1 << 5 };
    /// The render resolution may change from dispatch to dispatch (up to the
    /// maximum configured at creation).
    pub const DYNAMIC_RESOLUTION: Self = Self { bits: 1 << 6 };
    /// Run the non-fatal validation checks and report findings through the
    /// message callback.
    pub const DEBUG_CHECKING: Self = Self { bits: 1 << 7 };

    /// Creates a new set of flags from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    /// Returns the raw bits.
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Combines two sets of flags.
    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Checks if these flags contain every flag in `other`.
    pub const fn contains(&self, other: Self) -> bool {
        (self.bits & other.bits) == other.bits
    }

    /// Checks if these flags are empty.
    pub const fn is_empty(&self) -> bool {
        self.bits == 0
    }
}

impl std::ops::BitOr for ContextFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for ContextFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

/// Empirically tuned constants of the accumulation pipeline.
///
/// The defaults are calibrated against reference content. They are exposed as
/// plain fields so integrations can override individual values, but none of
/// them is derived from first principles; treat a change as a visual tuning
/// exercise, not a correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tunables {
    /// Average per-tap Lanczos weight of a full jitter cycle. Normalizes the
    /// accumulated sample weight so one cycle of samples counts as one frame
    /// of history per tap.
    pub average_lanczos_weight: f32,
    /// Exponent curve used for rectification tap weights (`exp(bias * d^2)`)
    /// when the pixel is at rest.
    pub rectification_bias_calm: f32,
    /// Exponent curve at full velocity. More negative than the calm value, so
    /// the color envelope tightens as motion rises.
    pub rectification_bias_moving: f32,
    /// Standard-deviation multiplier of the rectification envelope when the
    /// pixel is undisturbed (no disocclusion, masks, or motion).
    pub rectification_sigma_calm: f32,
    /// Standard-deviation multiplier at full disturbance.
    pub rectification_sigma_active: f32,
    /// Motion magnitude, in display-resolution pixels per frame, that maps to
    /// a velocity factor of 1.0.
    pub velocity_normalization: f32,
    /// Upper bound of the upsampling kernel bias. The bias widens with the
    /// display/render ratio and saturates here.
    pub max_kernel_bias: f32,
    /// Fraction of the wide-kernel excess retained by the narrow kernel used
    /// in reactive or disoccluded regions.
    pub narrow_kernel_fraction: f32,
    /// Lower bound applied to the history weight factor after rectification
    /// down-weights a clamped history.
    pub accumulation_weight_floor: f32,
    /// Lifetime assigned to a freshly created lock.
    pub lock_initial_lifetime: f32,
    /// Relative luminance disagreement between a lock's temporal luma and the
    /// current luma above which the lock is re-created.
    pub relock_luminance_threshold: f32,
    /// Relative luma difference against the neighborhood ring above which the
    /// lock pass treats a pixel as a thin feature.
    pub thin_feature_luma_threshold: f32,
    /// Per-frame fade rate of the temporal reactive factor at a 60 Hz frame
    /// time. The stored factor keeps its magnitude in `[0, 1]`; its sign
    /// encodes whether the pixel was moving last frame and must not be
    /// normalized away.
    pub temporal_reactive_decay: f32,
    /// Proportionality constant of the view-space depth separation required
    /// to declare a disocclusion.
    pub depth_separation_constant: f32,
    /// Scene key value used by the auto-exposure log-average reduction.
    pub exposure_key_value: f32,
    /// Use the reduced 5-tap neighborhood in upsampling and rectification
    /// instead of the full 9-tap one.
    pub reduced_taps: bool,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            average_lanczos_weight: 0.74,
            rectification_bias_calm: -2.0,
            rectification_bias_moving: -3.0,
            rectification_sigma_calm: 2.0,
            rectification_sigma_active: 0.5,
            velocity_normalization: 20.0,
            max_kernel_bias: 1.99,
            narrow_kernel_fraction: 0.3,
            accumulation_weight_floor: 0.1,
            lock_initial_lifetime: 1.0,
            relock_luminance_threshold: 0.25,
            thin_feature_luma_threshold: 0.1,
            temporal_reactive_decay: 0.1,
            depth_separation_constant: 1.37e-5,
            exposure_key_value: 0.18,
            reduced_taps: false,
        }
    }
}

/// Sink for the findings of the optional validation pass.
///
/// Only invoked when [`ContextFlags::DEBUG_CHECKING`] is set; the core never
/// produces textual diagnostics through any other channel.
pub type MessageCallback = fn(ValidationSeverity, &str);

/// Creation-time description of an upscale context.
#[derive(Debug, Clone)]
pub struct ContextDescription {
    /// The quality preset the caller sized its render targets for.
    pub quality: QualityMode,
    /// Input-interpretation flags.
    pub flags: ContextFlags,
    /// The largest render resolution any dispatch may use.
    pub max_render_size: Extent2D,
    /// The output resolution. Fixed for the lifetime of the context.
    pub display_size: Extent2D,
    /// Pipeline tuning constants.
    pub tunables: Tunables,
    /// Sink for validation findings, used only under `DEBUG_CHECKING`.
    pub message_callback: Option<MessageCallback>,
}

impl ContextDescription {
    /// Creates a description with default tunables and no callback, deriving
    /// `max_render_size` from the quality preset.
    pub fn new(quality: QualityMode, flags: ContextFlags, display_size: Extent2D) -> Self {
        Self {
            quality,
            flags,
            max_render_size: quality.render_size_for(display_size),
            display_size,
            tunables: Tunables::default(),
            message_callback: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_render_sizes() {
        let display = Extent2D::new(1920, 1080);
        assert_eq!(
            QualityMode::Performance.render_size_for(display),
            Extent2D::new(960, 540)
        );
        assert_eq!(
            QualityMode::Balanced.render_size_for(display),
            Extent2D::new(1129, 635)
        );
        assert_eq!(
            QualityMode::UltraPerformance.render_size_for(display),
            Extent2D::new(640, 360)
        );
    }

    #[test]
    fn test_flags_combine() {
        let flags = ContextFlags::HDR_INPUT | ContextFlags::DEPTH_INVERTED;
        assert!(flags.contains(ContextFlags::HDR_INPUT));
        assert!(flags.contains(ContextFlags::DEPTH_INVERTED));
        assert!(!flags.contains(ContextFlags::AUTO_EXPOSURE));
        assert!(ContextFlags::NONE.is_empty());
        assert!(ContextFlags::default().is_empty());
    }

    #[test]
    fn test_description_derives_render_size() {
        let desc = ContextDescription::new(
            QualityMode::Performance,
            ContextFlags::NONE,
            Extent2D::new(1920, 1080),
        );
        assert_eq!(desc.max_render_size, Extent2D::new(960, 540));
        assert_eq!(desc.tunables, Tunables::default());
    }
}
