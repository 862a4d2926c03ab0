//! Deterministic virtual-clock, seeded-RNG [`Environment`](yx_core::Environment)
//! for simulation.
//!
//! Production code uses `yx_core::SystemEnvironment`; every test and chaos
//! scenario in this crate uses [`SimEnvironment`] instead so that TTL
//! expiry, replay windows, and rate-limiter sliding windows advance only
//! when a test explicitly calls [`SimEnvironment::advance`], and so AES-GCM
//! nonces are reproducible across runs given the same seed.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use yx_core::Environment;

/// A virtual clock plus a seeded CSPRNG, shared by clone so every peer in
/// a simulation observes the same advancing time.
#[derive(Clone)]
pub struct SimEnvironment {
    elapsed: Arc<Mutex<Duration>>,
    rng: Arc<Mutex<ChaCha8Rng>>,
}

impl SimEnvironment {
    /// Build a fresh environment starting at time zero, seeded for
    /// reproducible randomness.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            elapsed: Arc::new(Mutex::new(Duration::ZERO)),
            rng: Arc::new(Mutex::new(ChaCha8Rng::seed_from_u64(seed))),
        }
    }

    /// Move the virtual clock forward by `by`. All registered peers
    /// sharing this environment observe the new time immediately.
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock().unwrap_or_else(std::sync::PoisonError::into_inner) += by;
    }

    /// Current virtual elapsed time.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Environment for SimEnvironment {
    type Instant = Duration;

    fn now(&self) -> Self::Instant {
        self.elapsed()
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.rng.lock().unwrap_or_else(std::sync::PoisonError::into_inner).fill_bytes(buffer);
    }
}
