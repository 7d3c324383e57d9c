/*!
# Rules for BSL Analyzer

Configurable diagnostics: enable/disable, severity override and parameters
per diagnostic code, plus block fingerprint and batch settings.

## Usage

```rust,ignore
use bsl_analyzer_core::rules::{RulesConfig, RulesManager};

let config = RulesConfig::load_from_file("bsl-rules.toml")?;
let manager = RulesManager::new_with_config(config);
let runner = manager.build_runner()?;
let diagnostics = runner.run(&parse_result.tree, "Module.bsl");
```

## Configuration Example

```toml
version = "1.0"

[rules.IdenticalExpressions]
enabled = true
severity = "error"

[rules.IdenticalExpressions.parameters]
minExpressionSize = 3

[rules.ParseError]
enabled = false

[fingerprint]
enabled = true
codes = ["IdenticalExpressions"]

[settings]
threads = 4
fail_fast = false
extensions = ["bsl", "os"]
```
*/

pub mod builtin;
pub mod config;

pub use builtin::BuiltinRules;
pub use config::{ConfigFormat, FingerprintSettings, GlobalSettings, RuleConfig, RuleSeverity, RulesConfig};

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::diagnostics::DiagnosticRunner;

/// Rules manager - main entry point for rules system
pub struct RulesManager {
    /// Frozen configuration snapshot
    config: Arc<RulesConfig>,
}

impl RulesManager {
    /// Create new rules manager with default configuration
    pub fn new() -> Self {
        Self::new_with_config(RulesConfig::default())
    }

    /// Create rules manager with custom configuration
    pub fn new_with_config(config: RulesConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    /// Create rules manager from configuration file; warnings are logged
    pub fn from_file<P: AsRef<std::path::Path>>(config_path: P) -> Result<Self> {
        let config = RulesConfig::load_from_file(config_path)?;
        for warning in config.validate() {
            warn!("Rules config: {}", warning);
        }
        Ok(Self::new_with_config(config))
    }

    /// Get configuration
    pub fn config(&self) -> &RulesConfig {
        &self.config
    }

    /// Shared configuration snapshot
    pub fn shared_config(&self) -> Arc<RulesConfig> {
        Arc::clone(&self.config)
    }

    /// Validate configuration
    pub fn validate_config(&self) -> Vec<String> {
        self.config.validate()
    }

    /// Configured, enabled builtin diagnostics ready to run
    pub fn build_runner(&self) -> Result<DiagnosticRunner> {
        let mut passes = Vec::new();

        for mut diagnostic in BuiltinRules::all() {
            let info = diagnostic.info();
            let rule = self.config.get_rule(info.code);

            if !rule.map(|r| r.enabled).unwrap_or(true) {
                debug!("Rule {} is disabled", info.code);
                continue;
            }

            let mut severity = info.severity();
            if let Some(rule) = rule {
                diagnostic
                    .configure(&rule.parameters)
                    .with_context(|| format!("Invalid parameters for rule '{}'", info.code))?;
                if let Some(overridden) = rule.severity {
                    severity = overridden.into();
                }
            }

            passes.push((diagnostic, severity));
        }

        debug!("{} diagnostics enabled", passes.len());
        Ok(DiagnosticRunner::with_severities(passes))
    }
}

impl Default for RulesManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticSeverity;
    use crate::parser::BslParser;

    #[test]
    fn test_rules_manager_creation() {
        let manager = RulesManager::new();
        assert_eq!(manager.config().rules.len(), 4);
        assert_eq!(manager.build_runner().unwrap().len(), 4);
    }

    #[test]
    fn test_disabled_rules_and_severity_override() {
        let mut config = RulesConfig::default();
        config.rules.get_mut("ParseError").unwrap().enabled = false;
        config.rules.get_mut("IdenticalExpressions").unwrap().severity = Some(RuleSeverity::Hint);

        let runner = RulesManager::new_with_config(config).build_runner().unwrap();
        assert!(!runner.codes().contains(&"ParseError"));

        let result = BslParser::new().parse("А = б = б;\nВ = ;");
        let found = runner.run(&result.tree, "test.bsl");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].severity, DiagnosticSeverity::Hint);
    }

    #[test]
    fn test_parameters_applied() {
        let mut config = RulesConfig::default();
        config
            .rules
            .get_mut("IfConditionComplexity")
            .unwrap()
            .parameters
            .insert("maxIfConditionComplexity".to_string(), toml::Value::Integer(0));
        let runner = RulesManager::new_with_config(config).build_runner().unwrap();

        let result = BslParser::new().parse("Если а И б Тогда\nКонецЕсли;");
        let found = runner.run(&result.tree, "test.bsl");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].code, "IfConditionComplexity");
    }

    #[test]
    fn test_invalid_parameter_fails() {
        let mut config = RulesConfig::default();
        config
            .rules
            .get_mut("IdenticalExpressions")
            .unwrap()
            .parameters
            .insert("minExpressionSize".to_string(), toml::Value::Integer(-2));
        let err = RulesManager::new_with_config(config).build_runner().unwrap_err();
        assert!(format!("{:#}", err).contains("IdenticalExpressions"));
    }
}
