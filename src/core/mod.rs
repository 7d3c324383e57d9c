/*!
# Core Module

Core functionality for the BSL analyzer: fatal errors, source positions,
file helpers and batch result structures.
*/

pub mod errors;
pub mod fs_utils;
pub mod position;
pub mod results;

pub use errors::{AnalyzerError, AnalyzerResult};
pub use fs_utils::{collect_source_files, read_bsl_file};
pub use position::{PackedSpan, Position, Span};
pub use results::{AnalysisInfo, FileInfo, FileMetrics};
