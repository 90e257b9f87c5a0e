//! Turnover-weighted selection of replacement locations.
//!
//! Every region gets its own draw, so small regions are never crowded out by
//! large ones. Randomness comes from a caller-supplied [`rand::Rng`].

pub mod runner;
pub mod weighted;

pub use runner::{SamplingConfig, SamplingSummary, sample_replacements, select_replacements};
pub use weighted::generate_replacement_locations;
