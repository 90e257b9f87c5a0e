//! Sample frame preparation.
//!
//! Acceptor locations (`Merge_Num == 1`) absorb the turnover and outlet count
//! of their paired donor (`Merge_Num == 2`). Donors and locations below the
//! outlet threshold are then removed, and acceptors that claim the same donor
//! are reported for manual correction.

pub mod duplicates;
pub mod merge;
pub mod postproc;
pub mod runner;

pub use runner::{FrameConfig, FrameOutputs, FrameSummary, prepare_sample_frame};
