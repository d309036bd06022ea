//! Wall-clock time source for the renderer's `u_time` uniform.

/// Milliseconds since the Unix epoch.
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}

/// Milliseconds since the Unix epoch.
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Seconds elapsed since the clock started, never decreasing.
///
/// The offset from the start keeps the value small enough to survive the trip
/// through an `f32` uniform without losing sub-second precision.
#[derive(Clone, Copy, Debug)]
pub struct RenderClock {
    origin_ms: f64,
    last: f64,
}

impl RenderClock {
    pub fn start() -> Self {
        Self::starting_at(now_ms())
    }

    pub fn starting_at(origin_ms: f64) -> Self {
        Self {
            origin_ms,
            last: 0.0,
        }
    }

    /// Advances to the given wall-clock time. A timestamp earlier than a previous
    /// one leaves the value unchanged.
    pub fn tick_at(&mut self, now_ms: f64) -> f64 {
        let seconds = (now_ms - self.origin_ms) / 1000.0;
        if seconds > self.last {
            self.last = seconds;
        }
        self.last
    }

    pub fn seconds(&self) -> f64 {
        self.last
    }
}
