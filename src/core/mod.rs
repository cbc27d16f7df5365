//! This module contains the core datatypes and the simulation kernel of the library.

pub mod affinity;
pub mod antigen;
pub mod bcell;
pub mod gene;
pub mod kernel;
pub mod population;
pub mod reactions;
pub mod system;

pub use affinity::AffinityTable;
pub use antigen::{Antigen, AntigenList, AntigenType, Epitope, WeightKind};
pub use bcell::{BCell, Weighting};
pub use gene::Gene;
pub use kernel::TotalReaction;
pub use population::{GroupPopulation, Population};
pub use reactions::Reaction;
pub use system::{AntigenRef, BCellRef, CountRef, GroupRef, ImmuneSystem, PopulationRef};
