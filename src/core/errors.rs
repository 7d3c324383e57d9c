/*!
# Error System for BSL Analyzer

Fatal errors only: everything that must stop a batch run before (or instead of)
per-file analysis. Problems inside a single file are not errors here, they are
reported as findings (`ParseError`) or logged pass failures.
*/

use std::path::PathBuf;
use thiserror::Error;

pub type AnalyzerResult<T> = Result<T, AnalyzerError>;

/// Фатальные ошибки анализатора
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Workspace dir `{0}` does not exist")]
    WorkspaceNotFound(PathBuf),

    #[error("Source dir `{0}` does not exist")]
    SourceNotFound(PathBuf),

    #[error("Source dir `{0}` contains more than one `../` reference")]
    TooManyParentRefs(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown reporter `{0}`")]
    UnknownReporter(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Analysis of {path} failed: {reason}")]
    FileFailed { path: PathBuf, reason: String },

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),
}

impl AnalyzerError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Ошибка конфигурации/входных путей (анализ не начинался).
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::WorkspaceNotFound(_)
                | Self::SourceNotFound(_)
                | Self::TooManyParentRefs(_)
                | Self::Config(_)
                | Self::UnknownReporter(_)
        )
    }
}
