use rand::prelude::*;

use super::{OrderOne, OrderZero, Reaction};
use crate::core::system::{ImmuneSystem, PopulationRef};
use crate::errors::Result;

/// Spontaneous formation, `0 -> A`.
#[derive(Clone, Debug)]
pub struct Formation {
    name: String,
    base: OrderZero,
    a: PopulationRef,
}

impl Formation {
    pub fn new(name: &str, k: f64, a: impl Into<PopulationRef>) -> Self {
        Self {
            name: name.to_string(),
            base: OrderZero::new(k),
            a: a.into(),
        }
    }
}

impl Reaction for Formation {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, _system: &ImmuneSystem) -> f64 {
        self.base.rate()
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        system.increase(self.a, 1, rng)
    }
}

/// First order decay, `A -> 0`.
#[derive(Clone, Debug)]
pub struct Decay {
    name: String,
    base: OrderOne,
}

impl Decay {
    pub fn new(name: &str, k: f64, a: impl Into<PopulationRef>) -> Self {
        Self {
            name: name.to_string(),
            base: OrderOne::new(k, a),
        }
    }
}

impl Reaction for Decay {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        system.decrease(self.base.a(), 1, rng)
    }
}

/// First order replication, `A -> 2A`.
#[derive(Clone, Debug)]
pub struct Replication {
    name: String,
    base: OrderOne,
}

impl Replication {
    pub fn new(name: &str, k: f64, a: impl Into<PopulationRef>) -> Self {
        Self {
            name: name.to_string(),
            base: OrderOne::new(k, a),
        }
    }
}

impl Reaction for Replication {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        self.base.rate(system)
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        system.increase(self.base.a(), 1, rng)
    }
}

/// Logistic death rate `max(k_min, r * |A| / capacity) * |A|`, constants are not `ln 2` scaled.
#[inline]
fn logistic_rate(r: f64, k_min: f64, capacity: f64, size: u64) -> f64 {
    let size = size as f64;
    k_min.max(r * size / capacity) * size
}

/// Cumulative split between the three targets of [`PopulationDecay`].
const DECAY_SPLIT: [f64; 2] = [0.33, 0.66];

/// Density dependent decay of an aggregate, applied to one of three sub-populations.
#[derive(Clone, Debug)]
pub struct PopulationDecay {
    name: String,
    r: f64,
    k_min: f64,
    capacity: f64,
    source: PopulationRef,
    targets: [PopulationRef; 3],
}

impl PopulationDecay {
    pub fn new(
        name: &str,
        r: f64,
        k_min: f64,
        capacity: f64,
        source: impl Into<PopulationRef>,
        targets: [PopulationRef; 3],
    ) -> Self {
        Self {
            name: name.to_string(),
            r,
            k_min,
            capacity,
            source: source.into(),
            targets,
        }
    }
}

impl Reaction for PopulationDecay {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        logistic_rate(self.r, self.k_min, self.capacity, system.size(self.source))
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        let draw: f64 = rng.random();
        let target = if draw <= DECAY_SPLIT[0] {
            self.targets[0]
        } else if draw <= DECAY_SPLIT[1] {
            self.targets[1]
        } else {
            self.targets[2]
        };
        // an empty target absorbs the event
        if system.size(target) > 0 {
            system.decrease(target, 1, rng)?;
        }
        Ok(())
    }
}

/// Density dependent decay of an aggregate, applied to a single sub-population.
#[derive(Clone, Debug)]
pub struct TPopulationDecay {
    name: String,
    r: f64,
    k_min: f64,
    capacity: f64,
    source: PopulationRef,
    target: PopulationRef,
}

impl TPopulationDecay {
    pub fn new(
        name: &str,
        r: f64,
        k_min: f64,
        capacity: f64,
        source: impl Into<PopulationRef>,
        target: impl Into<PopulationRef>,
    ) -> Self {
        Self {
            name: name.to_string(),
            r,
            k_min,
            capacity,
            source: source.into(),
            target: target.into(),
        }
    }
}

impl Reaction for TPopulationDecay {
    fn name(&self) -> &str {
        &self.name
    }

    fn rate(&self, system: &ImmuneSystem) -> f64 {
        logistic_rate(self.r, self.k_min, self.capacity, system.size(self.source))
    }

    fn react(&self, system: &mut ImmuneSystem, rng: &mut dyn RngCore) -> Result<()> {
        if system.size(self.target) > 0 {
            system.decrease(self.target, 1, rng)?;
        }
        Ok(())
    }
}
