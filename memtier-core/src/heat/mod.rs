//! Heat
//!
//! Wall-clock importance weighting. [`score`] holds the pure heat formula
//! and tier classification; [`store`] persists one [`HeatEntry`] per memory
//! as JSON Lines.

pub mod score;
pub mod store;

pub use score::{HeatEntry, MAX_DECAYING_HEAT, classify, compute_heat};
pub use store::{DecayOptions, DecayReport, HeatStats, HeatStore, ScoredHeat, TierTransition};
