//! JSON отчет: `AnalysisInfo` целиком, с отпечатками блоков если они считались.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{write_report_file, ReportFormat, ReportGenerator};
use crate::core::results::AnalysisInfo;

pub const JSON_REPORT_FILE: &str = "bsl-json.json";

#[derive(Debug, Default)]
pub struct JsonReporter;

impl JsonReporter {
    pub fn new() -> Self {
        Self
    }

    /// Пишет `<dir>/bsl-json.json`, возвращает путь
    pub fn write_to_dir(&self, info: &AnalysisInfo, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(JSON_REPORT_FILE);
        write_report_file(&path, &self.generate_report(info)?)?;
        Ok(path)
    }
}

impl ReportGenerator for JsonReporter {
    fn generate_report(&self, info: &AnalysisInfo) -> Result<String> {
        serde_json::to_string_pretty(info).context("Failed to serialize analysis results")
    }

    fn supported_format() -> ReportFormat {
        ReportFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::results::FileInfo;
    use tempfile::TempDir;

    #[test]
    fn writes_report_into_new_dir() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("out");
        let info = AnalysisInfo::new(vec![FileInfo::empty("a.bsl")], "src");

        let path = JsonReporter::new().write_to_dir(&info, &out).unwrap();
        assert_eq!(path, out.join(JSON_REPORT_FILE));

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["file_info"][0]["path"], "a.bsl");
        assert_eq!(written["file_info"][0]["diagnostics"], serde_json::json!([]));
    }
}
