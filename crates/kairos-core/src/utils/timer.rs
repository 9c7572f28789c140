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

//! Provides a simple stopwatch for measuring elapsed time.

use std::time::{Duration, Instant};

/// A simple stopwatch that starts counting when created.
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    start: Instant,
}

impl Stopwatch {
    /// Creates a new stopwatch, started at the current instant.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Returns the time elapsed since the stopwatch was started or last restarted.
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Returns the elapsed time in milliseconds as an `f32`.
    pub fn elapsed_ms(&self) -> f32 {
        self.elapsed().as_secs_f32() * 1000.0
    }

    /// Restarts the stopwatch at the current instant.
    pub fn restart(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stopwatch_advances() {
        let sw = Stopwatch::new();
        assert!(sw.elapsed() >= Duration::ZERO);
        assert!(sw.elapsed_ms() >= 0.0);
    }

    #[test]
    fn test_stopwatch_restart() {
        let mut sw = Stopwatch::new();
        let before = sw.elapsed();
        sw.restart();
        // A restarted stopwatch cannot be ahead of its previous reading plus
        // the time spent restarting.
        assert!(sw.elapsed() <= before + Duration::from_secs(1));
    }
}
