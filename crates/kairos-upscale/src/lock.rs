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

//! Per-pixel lock state.
//!
//! A lock marks a display pixel whose feature is thinner than the render
//! grid can resolve every frame (wires, specular glints, sub-pixel text).
//! While a lock is alive the accumulation pass trusts history harder at that
//! pixel so the feature does not flicker in and out. The lock carries the
//! scene luminance observed at creation; when the scene visibly changes
//! underneath it, the lock is re-created rather than allowed to smear stale
//! color.

use crate::kernels::color::luma_divergence;

/// Persisted lock payload, stored as an `[f32; 2]` texel in the ring.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LockTexel {
    /// Remaining lifetime in `[0, 1]`. Zero means no lock.
    pub lifetime: f32,
    /// Scene luminance captured when the lock was created or rebased.
    pub temporal_luma: f32,
}

impl LockTexel {
    /// A dead lock.
    pub const ZERO: Self = Self {
        lifetime: 0.0,
        temporal_luma: 0.0,
    };

    /// Whether this texel carries a live lock.
    pub fn is_live(&self) -> bool {
        self.lifetime > 0.0
    }

    /// Packs into the ring texel layout.
    pub fn to_array(self) -> [f32; 2] {
        [self.lifetime, self.temporal_luma]
    }

    /// Unpacks from the ring texel layout.
    pub fn from_array(texel: [f32; 2]) -> Self {
        Self {
            lifetime: texel[0],
            temporal_luma: texel[1],
        }
    }
}

/// Outcome of advancing a lock by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    /// No lock, and nothing asked for one.
    Unlocked,
    /// A lock was created this frame.
    NewLock,
    /// An existing lock was re-created because the scene changed under it.
    Relocked,
    /// An existing lock survived and decayed.
    Locked,
    /// The lock ended this frame, by leaving the screen or by running out of
    /// lifetime.
    Killed,
}

/// Everything the transition function observes for one pixel.
#[derive(Debug, Clone, Copy)]
pub struct LockInputs {
    /// The estimated next-frame position of this pixel lies outside the
    /// screen.
    pub reprojected_offscreen: bool,
    /// The lock pass flagged this pixel as a thin feature this frame.
    pub new_lock_requested: bool,
    /// This frame's exposure-normalized luminance at the pixel.
    pub current_luma: f32,
    /// Combined depth-clip/velocity confidence in `[0, 1]`; relocks only
    /// happen while confidence is low.
    pub confidence: f32,
    /// The accumulation pass's Lanczos weight sum at this pixel this frame.
    pub weight_sum: f32,
    /// Length of the jitter cycle.
    pub jitter_phase_count: u32,
    /// Average per-tap Lanczos weight over a full cycle.
    pub average_lanczos_weight: f32,
    /// Lifetime given to a fresh lock.
    pub initial_lifetime: f32,
    /// Relative luminance disagreement that triggers a relock.
    pub relock_threshold: f32,
}

/// Advances one pixel's lock by one frame.
///
/// Transition priority: an offscreen reprojection kills unconditionally; a
/// dead texel can only be (re)created by a request; a live lock first checks
/// for relock, then for a refreshing request, and otherwise decays. Lifetime
/// never goes negative; hitting exactly zero is the kill.
pub fn advance_lock(previous: LockTexel, inputs: &LockInputs) -> (LockTexel, LockState) {
    if inputs.reprojected_offscreen {
        return (LockTexel::ZERO, LockState::Killed);
    }

    if !previous.is_live() {
        if inputs.new_lock_requested {
            return (
                LockTexel {
                    lifetime: inputs.initial_lifetime,
                    temporal_luma: inputs.current_luma,
                },
                LockState::NewLock,
            );
        }
        return (LockTexel::ZERO, LockState::Unlocked);
    }

    let divergence = luma_divergence(inputs.current_luma, previous.temporal_luma);
    if divergence > inputs.relock_threshold && inputs.confidence < 0.5 {
        return (
            LockTexel {
                lifetime: inputs.initial_lifetime,
                temporal_luma: inputs.current_luma,
            },
            LockState::Relocked,
        );
    }

    if inputs.new_lock_requested {
        return (
            LockTexel {
                lifetime: inputs.initial_lifetime,
                temporal_luma: inputs.current_luma,
            },
            LockState::NewLock,
        );
    }

    // One cycle of average-weight frames spends the whole initial lifetime.
    let decay = (inputs.weight_sum / inputs.average_lanczos_weight)
        / inputs.jitter_phase_count.max(1) as f32;
    let lifetime = (previous.lifetime - decay).max(0.0);
    if lifetime == 0.0 {
        (LockTexel::ZERO, LockState::Killed)
    } else {
        (
            LockTexel {
                lifetime,
                temporal_luma: previous.temporal_luma,
            },
            LockState::Locked,
        )
    }
}
