//! Binding affinity landscape and its memo table.
//!
//! Affinity is a function of the genetic distance between a receptor and its closest epitope. It
//! is flat for close matches (`distance <= MIN_DIST`), decays exponentially in between and
//! vanishes beyond `MAX_DIST`.

use cached::{Cached, UnboundCache};
use std::cell::RefCell;

/// Largest distance at which a receptor still binds.
pub const MAX_DIST: usize = 7;

/// Distance below which affinity no longer improves.
pub const MIN_DIST: usize = 4;

/// Exponent offset of the affinity landscape.
pub const GERMLINE_AFFINITY: i32 = 6;

/// Number of binding phenotypes (`0..=MAX_DIST`).
pub const BINDING_PHENOTYPES: usize = MAX_DIST + 1;

pub type AffinityRow = [f64; BINDING_PHENOTYPES];

/// Affinity for a distance, computed without the memo table.
pub fn binding_affinity(distance: usize, factor: f64) -> f64 {
    if distance > MAX_DIST {
        0.
    } else {
        let distance = distance.max(MIN_DIST) as i32;
        factor.powi(GERMLINE_AFFINITY - distance)
    }
}

/// Memoized affinity rows, one per distinct affinity factor.
///
/// Factors are keyed by their exact bit pattern. They are scenario constants, so the table stays
/// small and lives as long as the owning simulation.
pub struct AffinityTable {
    cache: RefCell<UnboundCache<u64, AffinityRow>>,
}

impl AffinityTable {
    pub fn new() -> Self {
        Self {
            cache: RefCell::new(UnboundCache::new()),
        }
    }

    /// Affinity of all binding phenotypes for `factor`.
    pub fn row(&self, factor: f64) -> AffinityRow {
        let key = factor.to_bits();
        let mut cache = self.cache.borrow_mut();
        if let Some(row) = cache.cache_get(&key) {
            return *row;
        }
        log::debug!("Adding affinity factor {factor} to affinity table.");
        let mut row = [0.; BINDING_PHENOTYPES];
        row.iter_mut()
            .enumerate()
            .for_each(|(distance, value)| *value = binding_affinity(distance, factor));
        cache.cache_set(key, row);
        row
    }

    #[inline]
    pub fn affinity(&self, distance: usize, factor: f64) -> f64 {
        if distance > MAX_DIST {
            return 0.;
        }
        self.row(factor)[distance]
    }

    /// Affinity normalized size of `count` cells at `distance`.
    #[inline]
    pub fn apparent_size(&self, count: f64, distance: usize, factor: f64) -> f64 {
        if distance > MAX_DIST {
            return 0.;
        }
        count * self.affinity(distance, factor)
    }

    /// Number of distinct affinity factors seen so far.
    pub fn len(&self) -> usize {
        self.cache.borrow().cache_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AffinityTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AffinityTable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("AffinityTable")
            .field("factors", &self.len())
            .finish()
    }
}
