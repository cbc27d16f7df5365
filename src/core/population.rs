//! Plain counted populations and group aggregates.

use super::system::PopulationRef;
use crate::errors::{ImmuneError, Result};

/// A named, non-negative cell or particle count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Population {
    name: String,
    count: u64,
}

impl Population {
    pub fn new(name: &str, count: u64) -> Self {
        Self {
            name: name.to_string(),
            count,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn size(&self) -> u64 {
        self.count
    }

    pub fn set_size(&mut self, count: u64) {
        self.count = count;
    }

    pub fn increase(&mut self, n: u64) {
        self.count += n;
    }

    /// Remove `n` individuals, failing without modification if fewer are present.
    pub fn decrease(&mut self, n: u64) -> Result<()> {
        match self.count.checked_sub(n) {
            Some(count) => {
                self.count = count;
                Ok(())
            }
            None => Err(ImmuneError::InconsistencyError(format!(
                "Cannot remove {n} from population {} of size {}",
                self.name, self.count
            ))),
        }
    }
}

/// Named aggregate over other populations.
///
/// The group does not own its members, it only references them. Sizes and member selection are
/// resolved through the owning [`ImmuneSystem`](super::system::ImmuneSystem).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupPopulation {
    name: String,
    members: Vec<PopulationRef>,
}

impl GroupPopulation {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            members: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_population(&mut self, member: PopulationRef) {
        self.members.push(member);
    }

    pub fn members(&self) -> &[PopulationRef] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::system::CountRef;

    #[test]
    fn increase_and_decrease() {
        let mut population = Population::new("T", 10);
        population.increase(5);
        assert_eq!(population.size(), 15);
        population.decrease(15).unwrap();
        assert_eq!(population.size(), 0);
    }

    #[test]
    fn decrease_below_zero_is_rejected() {
        let mut population = Population::new("T", 2);
        assert!(matches!(
            population.decrease(3),
            Err(ImmuneError::InconsistencyError(_))
        ));
        assert_eq!(population.size(), 2);
    }

    #[test]
    fn group_members_keep_order() {
        let mut group = GroupPopulation::new("GC");
        assert!(group.is_empty());
        group.add_population(PopulationRef::Count(CountRef(1)));
        group.add_population(PopulationRef::Count(CountRef(0)));
        assert_eq!(group.len(), 2);
        assert_eq!(group.members()[0], PopulationRef::Count(CountRef(1)));
        assert_eq!(group.name(), "GC");
    }
}
