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

//! Defines the error type for surface creation and access.

use std::fmt;

/// An error related to the creation or use of a surface resource.
#[derive(Debug)]
pub enum SurfaceError {
    /// The descriptor used to create the surface is invalid (zero extent,
    /// unsupported mip count for the format, mismatched data length, ...).
    InvalidDescriptor(String),
    /// The handle used to reference a surface is invalid or already destroyed.
    InvalidHandle,
    /// The backend could not allocate storage for the surface.
    OutOfMemory {
        /// The number of bytes the allocation asked for.
        bytes: u64,
    },
    /// An error originating from the specific backend implementation.
    Backend(String),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SurfaceError::InvalidDescriptor(msg) => {
                write!(f, "Invalid surface descriptor: {msg}")
            }
            SurfaceError::InvalidHandle => write!(f, "Invalid surface handle or ID."),
            SurfaceError::OutOfMemory { bytes } => {
                write!(f, "Out of memory allocating surface ({bytes} bytes).")
            }
            SurfaceError::Backend(msg) => {
                write!(f, "Backend-specific surface error: {msg}")
            }
        }
    }
}

impl std::error::Error for SurfaceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SurfaceError::InvalidDescriptor("zero extent".to_string());
        assert!(err.to_string().contains("zero extent"));

        let err = SurfaceError::OutOfMemory { bytes: 1024 };
        assert!(err.to_string().contains("1024"));
    }
}
