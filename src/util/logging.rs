//! # Logging Utilities
//!
//! Rate limiting for events raised from the interrupt path, where a noisy
//! channel can produce a CRC error every few milliseconds, and hex dumps of
//! frames for debugging.
//!
//! ```rust
//! use rf95_rs::util::logging::{LogThrottle, log_frame_hex};
//!
//! let mut throttle = LogThrottle::new(1000, 5); // 5 messages per second
//! if throttle.allow() {
//!     log::warn!("CRC error detected");
//! }
//! log_frame_hex("RX", &[0xFF, 0x01, 0x00, 0x00, 0x68, 0x69]);
//! ```

use std::time::Instant;

/// Throttling structure for rate-limiting log messages
#[derive(Debug)]
pub struct LogThrottle {
    /// Time window for throttling (in milliseconds)
    window_ms: u64,
    /// Maximum messages allowed per window
    cap: u32,
    /// Current message count in window
    count: u32,
    /// Messages refused since the last allowed one
    suppressed: u32,
    /// Start time of current window
    t0: Instant,
}

impl LogThrottle {
    /// Create new throttle with time window and message cap
    pub fn new(window_ms: u64, cap: u32) -> Self {
        Self {
            window_ms,
            cap,
            count: 0,
            suppressed: 0,
            t0: Instant::now(),
        }
    }

    /// Check if logging is allowed (resets counter after window expires)
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(self.t0).as_millis() as u64;

        if elapsed_ms > self.window_ms {
            self.t0 = now;
            self.count = 0;
        }

        self.count = self.count.saturating_add(1);
        if self.count <= self.cap {
            true
        } else {
            self.suppressed = self.suppressed.saturating_add(1);
            false
        }
    }

    /// Number of messages refused since the last call, resetting the tally
    pub fn take_suppressed(&mut self) -> u32 {
        std::mem::take(&mut self.suppressed)
    }
}

/// Log frame data in hex format for debugging
pub fn log_frame_hex(prefix: &str, data: &[u8]) {
    log::debug!("{}", format_frame_hex(prefix, data));
}

/// Format frame data as `prefix: aabbcc`, truncated to keep log lines bounded
pub fn format_frame_hex(prefix: &str, data: &[u8]) -> String {
    const MAX_LOG_BYTES: usize = 64;

    let shown = &data[..data.len().min(MAX_LOG_BYTES)];
    let suffix = if data.len() > MAX_LOG_BYTES {
        format!(" ... ({} bytes total)", data.len())
    } else {
        String::new()
    };
    format!("{prefix}: {}{suffix}", hex::encode(shown))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_caps_within_window() {
        let mut throttle = LogThrottle::new(60_000, 2);
        assert!(throttle.allow());
        assert!(throttle.allow());
        assert!(!throttle.allow());
        assert!(!throttle.allow());
        assert_eq!(throttle.take_suppressed(), 2);
        assert_eq!(throttle.take_suppressed(), 0);
    }

    #[test]
    fn test_format_frame_hex_truncates() {
        assert_eq!(format_frame_hex("TX", &[0xFF, 0x01]), "TX: ff01");
        let long = vec![0xAB; 100];
        let line = format_frame_hex("RX", &long);
        assert!(line.ends_with("... (100 bytes total)"));
        assert_eq!(line.matches("ab").count(), 64);
    }
}
