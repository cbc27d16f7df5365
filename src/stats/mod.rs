//! Statistics and metric trait implementations

pub mod repertoire;

pub use repertoire::Crossreactivity;
pub use repertoire::Neutralization;
pub use repertoire::RepertoireProfile;
