/*!
# BSL Analyzer Module

Batch analysis driver: input checks, file discovery, parallel per-file analysis.
*/

pub mod engine;

pub use engine::{AnalysisEngine, AnalysisOptions};
