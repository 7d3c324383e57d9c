/*!
# Reports Module

Модуль для генерации отчетов пакетного анализа.

## Поддерживаемые форматы:
- **console** - человекочитаемый отчет в stdout
- **json** - `AnalysisInfo` целиком в `<outputDir>/bsl-json.json`

## Использование:

```rust,ignore
use bsl_analyzer_core::reports::{parse_reporters, ReportManager};

let formats = parse_reporters(&["console".into(), "json".into()])?;
ReportManager::new("./reports").write_reports(&analysis_info, &formats, &mut std::io::stdout())?;
```
*/

pub mod json;
pub mod text;

pub use json::JsonReporter;
pub use text::TextReporter;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::errors::{AnalyzerError, AnalyzerResult};
use crate::core::results::AnalysisInfo;

/// Формат отчета
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// Текстовый отчет для консоли
    Console,
    /// JSON файл
    Json,
}

impl ReportFormat {
    pub fn key(self) -> &'static str {
        match self {
            ReportFormat::Console => "console",
            ReportFormat::Json => "json",
        }
    }
}

impl std::str::FromStr for ReportFormat {
    type Err = AnalyzerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "console" => Ok(ReportFormat::Console),
            "json" => Ok(ReportFormat::Json),
            _ => Err(AnalyzerError::UnknownReporter(s.to_string())),
        }
    }
}

/// Ключи репортеров из командной строки; неизвестный ключ - фатальная ошибка
pub fn parse_reporters(keys: &[String]) -> AnalyzerResult<Vec<ReportFormat>> {
    let mut formats = Vec::new();
    for key in keys {
        let format: ReportFormat = key.parse()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    Ok(formats)
}

/// Трейт для генерации отчетов
pub trait ReportGenerator {
    /// Генерирует отчет на основе результатов анализа
    fn generate_report(&self, info: &AnalysisInfo) -> Result<String>;

    /// Возвращает поддерживаемый формат отчета
    fn supported_format() -> ReportFormat
    where
        Self: Sized;
}

/// Менеджер отчетов
pub struct ReportManager {
    output_dir: PathBuf,
}

impl ReportManager {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self { output_dir: output_dir.into() }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Выводит все запрошенные отчеты; консольный - в `console`
    pub fn write_reports<W: Write>(
        &self,
        info: &AnalysisInfo,
        formats: &[ReportFormat],
        console: &mut W,
    ) -> Result<()> {
        for format in formats {
            match format {
                ReportFormat::Console => {
                    console
                        .write_all(TextReporter::new().generate_report(info)?.as_bytes())
                        .context("Failed to write console report")?;
                }
                ReportFormat::Json => {
                    let path = JsonReporter::new().write_to_dir(info, &self.output_dir)?;
                    info!("JSON report written to {}", path.display());
                }
            }
        }
        Ok(())
    }
}

/// Записывает отчет в файл, создавая каталог
pub(crate) fn write_report_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        crate::cli_common::ensure_dir_exists(parent)?;
    }
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reporter_keys() {
        let formats = parse_reporters(&["console".into(), "JSON".into(), "json".into()]).unwrap();
        assert_eq!(formats, vec![ReportFormat::Console, ReportFormat::Json]);

        let err = parse_reporters(&["sarif".into()]).unwrap_err();
        assert!(matches!(err, AnalyzerError::UnknownReporter(ref k) if k == "sarif"));
        assert!(err.is_configuration());
    }

    #[test]
    fn manager_writes_console_and_json() {
        console::set_colors_enabled(false);
        let dir = tempfile::TempDir::new().unwrap();
        let info = AnalysisInfo::new(Vec::new(), "src");
        let mut console_out = Vec::new();

        ReportManager::new(dir.path())
            .write_reports(&info, &[ReportFormat::Console, ReportFormat::Json], &mut console_out)
            .unwrap();

        assert!(String::from_utf8(console_out).unwrap().contains("0 files analyzed"));
        assert!(dir.path().join(json::JSON_REPORT_FILE).is_file());
    }
}
