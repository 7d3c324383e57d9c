/*!
# Text Reporter

Консольный отчет: замечания сгруппированы по файлам, в конце сводка.
Цвета через `console::style`, отключаются автоматически без терминала.
*/

use anyhow::Result;
use console::style;
use std::fmt::Write;

use super::{ReportFormat, ReportGenerator};
use crate::core::results::AnalysisInfo;
use crate::diagnostics::DiagnosticSeverity;

/// Текстовый репортер для консольного вывода
pub struct TextReporter {
    /// Показывать файлы без замечаний
    show_clean_files: bool,
}

impl TextReporter {
    pub fn new() -> Self {
        Self { show_clean_files: false }
    }

    pub fn with_clean_files(mut self, show: bool) -> Self {
        self.show_clean_files = show;
        self
    }

    fn severity_label(severity: DiagnosticSeverity) -> String {
        let label = severity.to_string();
        match severity {
            DiagnosticSeverity::Error => style(label).red().bold().to_string(),
            DiagnosticSeverity::Warning => style(label).yellow().to_string(),
            DiagnosticSeverity::Information => style(label).blue().to_string(),
            DiagnosticSeverity::Hint => style(label).dim().to_string(),
        }
    }
}

impl Default for TextReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGenerator for TextReporter {
    fn generate_report(&self, info: &AnalysisInfo) -> Result<String> {
        let mut out = String::new();

        for file in &info.file_info {
            if file.diagnostics.is_empty() && !self.show_clean_files {
                continue;
            }
            writeln!(out, "{}", style(file.path.display()).bold())?;
            for d in &file.diagnostics {
                writeln!(
                    out,
                    "  {}:{} {} {} {}",
                    d.line(),
                    d.column(),
                    Self::severity_label(d.severity),
                    style(&d.code).cyan(),
                    d.message
                )?;
            }
        }

        writeln!(
            out,
            "\n{} files analyzed, {} with findings: {} errors, {} warnings, {} info, {} hints",
            info.file_info.len(),
            info.files_with_diagnostics(),
            info.count_severity(DiagnosticSeverity::Error),
            info.count_severity(DiagnosticSeverity::Warning),
            info.count_severity(DiagnosticSeverity::Information),
            info.count_severity(DiagnosticSeverity::Hint),
        )?;

        Ok(out)
    }

    fn supported_format() -> ReportFormat {
        ReportFormat::Console
    }
}
