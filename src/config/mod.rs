//! Configuration data structures for simulation setups.

mod parameters;
mod schedule;
mod settings;

pub use parameters::{FormationRanges, Parameters, TriangularRange};
pub use schedule::{Phase, PhaseKind, Schedule};
pub use settings::{Settings, SettingsError};
