//! Deterministic, stage-scoped random number generation.
//!
//! A [`DungeonRng`] is never constructed directly by pipeline code; it is
//! always obtained through [`DungeonRng::derive`], which mixes the master
//! seed, a stage label and the config hash through a cryptographic hash so
//! that changing any one of the three inputs reshuffles every stage's
//! stream. This mirrors the template's `util::srng` pattern of hashing a
//! seed value into a concrete `GameRng`, but uses a keyed cryptographic mix
//! rather than a fast non-cryptographic hash, since here the seed inputs
//! (stage label, config hash) are adversary-free but must still avalanche
//! fully on any change.

use rand::{Rng, RngCore, SeedableRng};
use rand::seq::SliceRandom;
use sha2::{Digest, Sha256};

/// The single-threaded RNG handle owned by one pipeline stage.
///
/// Exposes only the primitives `spec.md` §4.1 allows: raw `u64`, an
/// unbiased bounded draw, a half-open unit float, and a Fisher-Yates
/// shuffle. Stage code must never reach past this surface for randomness,
/// so that every RNG-observable decision is replayable from `(seed, stage
/// label, config hash)`.
pub struct DungeonRng {
    inner: rand_xorshift::XorShiftRng,
}

fn keyed_seed(master_seed: u64, stage_label: &str, config_hash: u64) -> [u8; 16] {
    let mut hasher = Sha256::new();
    hasher.update(master_seed.to_le_bytes());
    hasher.update(stage_label.as_bytes());
    hasher.update(config_hash.to_le_bytes());
    let digest = hasher.finalize();
    let mut seed = [0u8; 16];
    seed.copy_from_slice(&digest[..16]);
    seed
}

impl DungeonRng {
    /// Derive a stage RNG from the master seed, a stage label (e.g.
    /// `"synthesis"`) and the config hash.
    pub fn derive(master_seed: u64, stage_label: &str, config_hash: u64) -> Self {
        let seed = keyed_seed(master_seed, stage_label, config_hash);
        DungeonRng {
            inner: rand_xorshift::XorShiftRng::from_seed(seed),
        }
    }

    /// Raw 64 random bits.
    pub fn u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    /// Unbiased draw in `[0, n)`. Panics if `n == 0`.
    pub fn u64_below(&mut self, n: u64) -> u64 {
        assert!(n > 0, "u64_below requires n > 0");
        self.inner.gen_range(0..n)
    }

    /// Half-open unit float `[0.0, 1.0)`.
    pub fn f64_unit(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /// In-place Fisher-Yates shuffle.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        slice.shuffle(&mut self.inner);
    }

    /// Derive a deterministic per-attempt sub-RNG by consuming one `u64`
    /// draw from `self` and mixing it with `attempt`. Used by synthesis's
    /// bounded retry loop so that retries stay reproducible without callers
    /// needing to know how many attempts will be made.
    pub fn sub_rng(&mut self, attempt: u32) -> DungeonRng {
        let drawn = self.u64();
        let seed = keyed_seed(drawn, "retry", attempt as u64);
        DungeonRng {
            inner: rand_xorshift::XorShiftRng::from_seed(seed),
        }
    }
}
