/*!
# Builtin Rules for BSL Analyzer

Registry of the diagnostics shipped with the analyzer and their default
configurations.
*/

use std::collections::HashMap;

use crate::diagnostics::{
    BslDiagnostic, DiagnosticInfo, IdenticalExpressionsDiagnostic, IfConditionComplexityDiagnostic,
    NumberOfValuesInStructureConstructorDiagnostic, ParseErrorDiagnostic,
};

use super::RuleConfig;

/// Built-in BSL diagnostics
pub struct BuiltinRules;

impl BuiltinRules {
    /// Fresh instances of every builtin diagnostic, in registration order
    pub fn all() -> Vec<Box<dyn BslDiagnostic>> {
        vec![
            Box::new(ParseErrorDiagnostic),
            Box::new(IdenticalExpressionsDiagnostic::default()),
            Box::new(IfConditionComplexityDiagnostic::default()),
            Box::new(NumberOfValuesInStructureConstructorDiagnostic::default()),
        ]
    }

    /// Codes of every builtin diagnostic
    pub fn codes() -> Vec<&'static str> {
        Self::all().iter().map(|d| d.info().code).collect()
    }

    /// Metadata by diagnostic code
    pub fn info(code: &str) -> Option<&'static DiagnosticInfo> {
        Self::all().into_iter().map(|d| d.info()).find(|info| info.code == code)
    }

    /// Get all builtin rule configurations with default parameters
    pub fn default_configs() -> HashMap<String, RuleConfig> {
        Self::all()
            .iter()
            .map(|diagnostic| {
                let info = diagnostic.info();
                let parameters = info
                    .parameters
                    .iter()
                    .map(|p| (p.name.to_string(), toml::Value::Integer(p.default_value)))
                    .collect();
                let config = RuleConfig {
                    enabled: true,
                    severity: None,
                    description: Some(info.name.to_string()),
                    parameters,
                };
                (info.code.to_string(), config)
            })
            .collect()
    }
}
