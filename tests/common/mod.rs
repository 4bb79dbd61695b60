//! Shared helpers for integration tests.

#![allow(dead_code)]

use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Environment variable that pins the proptest RNG seed.
pub const PROPTEST_SEED_ENV: &str = "TASKCHAIN_PROPTEST_SEED";

pub use taskchain::test_utils::{CountingContext, TestError, init_test_logging};

/// Counts how many times a stage ran.
#[derive(Debug, Clone, Default)]
pub struct HitCounter(Arc<AtomicUsize>);

impl HitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn hits(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Error used by the pipeline scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("the method or operation is not implemented")]
pub struct NotImplemented;

/// Proptest config with `cases` cases and an optional pinned seed.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = std::env::var(PROPTEST_SEED_ENV)
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
        {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}
