/*!
# Diagnostics

Diagnostic model and the pass interface. Every pass implements [`BslDiagnostic`]:
it declares the node kinds it wants to see, receives them through
[`runner::DiagnosticRunner`] during a single tree walk and records findings into
its own [`DiagnosticStorage`].

Passes are configured once from the rules config and then shared read-only
between worker threads.
*/

pub mod identical_expressions;
pub mod if_condition_complexity;
pub mod number_of_values_in_structure_constructor;
pub mod parse_error;
pub mod runner;

pub use identical_expressions::IdenticalExpressionsDiagnostic;
pub use if_condition_complexity::IfConditionComplexityDiagnostic;
pub use number_of_values_in_structure_constructor::NumberOfValuesInStructureConstructorDiagnostic;
pub use parse_error::ParseErrorDiagnostic;
pub use runner::DiagnosticRunner;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree, VisitControl};
use crate::core::position::{Position, Span};

/// Уровень серьезности замечания в отчете
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "info",
            Self::Hint => "hint",
        };
        f.write_str(s)
    }
}

/// Тип диагностики
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticType {
    Error,
    CodeSmell,
    Vulnerability,
    SecurityHotspot,
}

/// Важность диагностики (шкала Sonar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCriticality {
    Info,
    Minor,
    Major,
    Critical,
    Blocker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticTag {
    Standard,
    Suspicious,
    BrainOverload,
    BadPractice,
    Error,
    Unpredictable,
    Design,
}

/// Целочисленный параметр диагностики
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticParameter {
    pub name: &'static str,
    pub description: &'static str,
    pub default_value: i64,
}

/// Метаданные диагностики
#[derive(Debug)]
pub struct DiagnosticInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub diagnostic_type: DiagnosticType,
    pub criticality: DiagnosticCriticality,
    pub minutes_to_fix: u32,
    pub tags: &'static [DiagnosticTag],
    pub parameters: &'static [DiagnosticParameter],
}

impl DiagnosticInfo {
    /// Серьезность замечания по умолчанию
    pub fn severity(&self) -> DiagnosticSeverity {
        if self.diagnostic_type == DiagnosticType::Error {
            return DiagnosticSeverity::Error;
        }
        match self.criticality {
            DiagnosticCriticality::Blocker
            | DiagnosticCriticality::Critical
            | DiagnosticCriticality::Major => DiagnosticSeverity::Warning,
            DiagnosticCriticality::Minor => DiagnosticSeverity::Information,
            DiagnosticCriticality::Info => DiagnosticSeverity::Hint,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&DiagnosticParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Замечание анализатора
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub severity: DiagnosticSeverity,
    pub range: Span,
    /// Узел привязки; действителен, пока живо дерево
    #[serde(skip)]
    pub anchor: Option<NodeId>,
}

impl Diagnostic {
    pub fn line(&self) -> usize {
        self.range.start.line
    }

    pub fn column(&self) -> usize {
        self.range.start.column
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}: {}", self.range.start, self.severity, self.code, self.message)
    }
}

/// Накопитель замечаний одной диагностики за один проход по файлу
#[derive(Debug)]
pub struct DiagnosticStorage {
    code: &'static str,
    severity: DiagnosticSeverity,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticStorage {
    pub fn new(code: &'static str, severity: DiagnosticSeverity) -> Self {
        Self { code, severity, diagnostics: Vec::new() }
    }

    /// Замечание на весь диапазон узла
    pub fn add(&mut self, tree: &SyntaxTree, node: NodeId, message: impl Into<String>) {
        let range = tree
            .span(node)
            .unwrap_or_else(|| Span::point(Position::start()));
        self.diagnostics.push(Diagnostic {
            code: self.code.to_string(),
            message: message.into(),
            severity: self.severity,
            range,
            anchor: Some(node),
        });
    }

    /// Замечание без узла привязки (ошибки разбора)
    pub fn add_range(&mut self, range: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            code: self.code.to_string(),
            message: message.into(),
            severity: self.severity,
            range,
            anchor: None,
        });
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

/// Контекст вызова диагностики: дерево файла и её накопитель
pub struct DiagnosticContext<'a> {
    pub tree: &'a SyntaxTree,
    pub storage: &'a mut DiagnosticStorage,
}

/// Диагностический проход по синтаксическому дереву
pub trait BslDiagnostic: Send + Sync {
    fn info(&self) -> &'static DiagnosticInfo;

    /// Виды узлов, на которых вызывается `visit`
    fn node_kinds(&self) -> &'static [SyntaxKind] {
        &[]
    }

    /// Применить параметры из конфигурации (до начала анализа)
    fn configure(&mut self, _parameters: &HashMap<String, toml::Value>) -> Result<()> {
        Ok(())
    }

    fn visit(&self, _ctx: &mut DiagnosticContext<'_>, _node: NodeId) -> Result<VisitControl> {
        Ok(VisitControl::Continue)
    }

    /// Проверка файла целиком, до обхода дерева
    fn check_file(&self, _ctx: &mut DiagnosticContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// Целочисленный параметр из конфигурации (число или строка с числом)
pub fn int_parameter(parameters: &HashMap<String, toml::Value>, name: &str) -> Result<Option<i64>> {
    let Some(value) = parameters.get(name) else {
        return Ok(None);
    };
    if let Some(v) = value.as_integer() {
        return Ok(Some(v));
    }
    if let Some(v) = value.as_str().and_then(|s| s.trim().parse::<i64>().ok()) {
        return Ok(Some(v));
    }
    bail!("Parameter '{}' must be an integer, got {}", name, value)
}

/// Параметр размера/количества: целое неотрицательное
pub fn usize_parameter(parameters: &HashMap<String, toml::Value>, name: &str) -> Result<Option<usize>> {
    match int_parameter(parameters, name)? {
        Some(v) if v < 0 => bail!("Parameter '{}' must not be negative, got {}", name, v),
        Some(v) => Ok(Some(v as usize)),
        None => Ok(None),
    }
}
