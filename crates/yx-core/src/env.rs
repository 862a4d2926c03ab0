//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system resources (time, randomness). A
//! monotonic clock is required for all TTL/windowing state (replay cache,
//! dedup cache, rate limiter, reassembly buffer); wall-clock time is used
//! only for forensic logging, via [`std::time::SystemTime`] at the call
//! site, never through this trait.

use std::time::Duration;

/// Abstract environment providing a monotonic clock and randomness.
///
/// # Invariants
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards within a single process lifetime.
/// - `random_bytes()` uses cryptographically secure entropy in production.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The instant type used by this environment. Production uses
    /// [`std::time::Instant`]; simulation environments use a virtual clock.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current monotonic time.
    fn now(&self) -> Self::Instant;

    /// Fill `buffer` with random bytes (used for AES-GCM nonces).
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generate a random 12-byte AES-GCM nonce.
    fn random_nonce(&self) -> [u8; yx_crypto::AES_NONCE_SIZE] {
        let mut nonce = [0u8; yx_crypto::AES_NONCE_SIZE];
        self.random_bytes(&mut nonce);
        nonce
    }
}

/// Production environment: real system clock and OS-backed RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        use rand::RngCore;
        rand::rngs::OsRng.fill_bytes(buffer);
    }
}


#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let env = SystemEnvironment;
        let first = env.now();
        let second = env.now();
        assert!(second >= first);
    }

    #[test]
    fn random_bytes_fills_buffer() {
        let env = SystemEnvironment;
        let mut a = [0u8; 16];
        let mut b = [0u8; 16];
        env.random_bytes(&mut a);
        env.random_bytes(&mut b);
        assert_ne!(a, b, "two independent draws should not collide");
    }
}
