/*!
# Analysis Results

Структуры результатов пакетного анализа. Переживают разбор файла: дерево
освобождается сразу после извлечения `FileInfo`.
Используются репортерами для генерации отчетов.
*/

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ast_core::{SyntaxKind, SyntaxTree};
use crate::diagnostics::{Diagnostic, DiagnosticSeverity};
use crate::fingerprint::BlockFindings;

/// Структурные метрики файла
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetrics {
    pub lines: usize,
    pub procedures: usize,
    pub functions: usize,
    pub statements: usize,
}

impl FileMetrics {
    pub fn from_tree(tree: &SyntaxTree) -> Self {
        let source = tree.source();
        Self {
            lines: if source.is_empty() { 0 } else { source.lines().count() },
            procedures: tree.count_kind(SyntaxKind::Procedure),
            functions: tree.count_kind(SyntaxKind::Function),
            statements: tree.count_kind(SyntaxKind::Statement),
        }
    }
}

/// Результат анализа одного файла
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Путь относительно каталога проекта
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
    pub metrics: FileMetrics,
    /// Отпечатки блоков (режим 1С)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<BlockFindings>>,
}

impl FileInfo {
    /// Пустой результат (шаблоны, которые не анализируются)
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            diagnostics: Vec::new(),
            metrics: FileMetrics::default(),
            blocks: None,
        }
    }

    pub fn count_severity(&self, severity: DiagnosticSeverity) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == severity).count()
    }
}

/// Итог пакетного анализа
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisInfo {
    pub date: DateTime<Local>,
    pub file_info: Vec<FileInfo>,
    pub source_dir: String,
}

impl AnalysisInfo {
    pub fn new(file_info: Vec<FileInfo>, source_dir: impl Into<String>) -> Self {
        Self {
            date: Local::now(),
            file_info,
            source_dir: source_dir.into(),
        }
    }

    /// Общее количество замечаний
    pub fn total_diagnostics(&self) -> usize {
        self.file_info.iter().map(|f| f.diagnostics.len()).sum()
    }

    pub fn count_severity(&self, severity: DiagnosticSeverity) -> usize {
        self.file_info.iter().map(|f| f.count_severity(severity)).sum()
    }

    /// Файлы с замечаниями
    pub fn files_with_diagnostics(&self) -> usize {
        self.file_info.iter().filter(|f| !f.diagnostics.is_empty()).count()
    }

    pub fn has_errors(&self) -> bool {
        self.count_severity(DiagnosticSeverity::Error) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::position::{Position, Span};
    use crate::parser::BslParser;

    fn diagnostic(severity: DiagnosticSeverity) -> Diagnostic {
        Diagnostic {
            code: "Test".into(),
            message: "m".into(),
            severity,
            range: Span::point(Position::start()),
            anchor: None,
        }
    }

    #[test]
    fn metrics_from_tree() {
        let result = BslParser::new().parse(
            "Процедура А()\n\tБ = 1;\n\tВ();\nКонецПроцедуры\n\nФункция Г()\n\tВозврат 1;\nКонецФункции\n",
        );
        let metrics = FileMetrics::from_tree(&result.tree);
        assert_eq!(
            metrics,
            FileMetrics { lines: 8, procedures: 1, functions: 1, statements: 3 }
        );
        assert_eq!(FileMetrics::from_tree(&BslParser::new().parse("").tree).lines, 0);
    }

    #[test]
    fn counts_and_json_shape() {
        let mut a = FileInfo::empty("a.bsl");
        a.diagnostics = vec![diagnostic(DiagnosticSeverity::Error), diagnostic(DiagnosticSeverity::Hint)];
        let b = FileInfo::empty("b.bsl");
        let info = AnalysisInfo::new(vec![a, b], "src");

        assert_eq!(info.total_diagnostics(), 2);
        assert_eq!(info.files_with_diagnostics(), 1);
        assert!(info.has_errors());

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["source_dir"], "src");
        assert_eq!(json["file_info"][0]["path"], "a.bsl");
        assert!(json["file_info"][0].get("blocks").is_none());
    }
}
