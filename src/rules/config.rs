/*!
# Rules Configuration System

Configuration structures and loading for BSL diagnostics.
Supports TOML, YAML and JSON configuration files; the format is chosen by the
file extension. Saving always produces TOML.
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::diagnostics::DiagnosticSeverity;

use super::builtin::BuiltinRules;

/// Rule severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSeverity {
    /// Error - blocks CI
    Error,
    /// Warning - should be fixed but doesn't block
    Warning,
    /// Info - informational message
    Info,
    /// Hint - subtle suggestion
    Hint,
}

impl std::fmt::Display for RuleSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleSeverity::Error => write!(f, "error"),
            RuleSeverity::Warning => write!(f, "warning"),
            RuleSeverity::Info => write!(f, "info"),
            RuleSeverity::Hint => write!(f, "hint"),
        }
    }
}

impl From<RuleSeverity> for DiagnosticSeverity {
    fn from(severity: RuleSeverity) -> Self {
        match severity {
            RuleSeverity::Error => DiagnosticSeverity::Error,
            RuleSeverity::Warning => DiagnosticSeverity::Warning,
            RuleSeverity::Info => DiagnosticSeverity::Information,
            RuleSeverity::Hint => DiagnosticSeverity::Hint,
        }
    }
}

/// Configuration for a single diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether the rule is enabled
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Severity override; metadata decides when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<RuleSeverity>,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Diagnostic parameters (`minExpressionSize`, `maxValuesCount`, ...)
    #[serde(default)]
    pub parameters: HashMap<String, toml::Value>,
}

fn default_true() -> bool {
    true
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            severity: None,
            description: None,
            parameters: HashMap::new(),
        }
    }
}

/// Block fingerprint settings ("1C mode")
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FingerprintSettings {
    /// Compute block fingerprints for every file
    #[serde(default)]
    pub enabled: bool,

    /// Diagnostic codes grouped by block; empty means all codes
    #[serde(default)]
    pub codes: Vec<String>,
}

/// Global analysis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalSettings {
    /// Parallel processing threads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,

    /// Stop scheduling files after the first failed one
    #[serde(default)]
    pub fail_fast: bool,

    /// Source file extensions, without the dot
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Also analyze `.txt` templates
    #[serde(default)]
    pub templates: bool,
}

fn default_extensions() -> Vec<String> {
    vec!["bsl".to_string(), "os".to_string()]
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            threads: None,
            fail_fast: false,
            extensions: default_extensions(),
            templates: false,
        }
    }
}

/// Global rules configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Configuration version
    #[serde(default = "default_version")]
    pub version: String,

    /// Rule configurations by diagnostic code
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,

    /// Block fingerprints
    #[serde(default)]
    pub fingerprint: FingerprintSettings,

    /// Global settings
    #[serde(default)]
    pub settings: GlobalSettings,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            rules: BuiltinRules::default_configs(),
            fingerprint: FingerprintSettings::default(),
            settings: GlobalSettings::default(),
        }
    }
}

/// Supported config file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
    Json,
}

impl ConfigFormat {
    /// Format by file extension, TOML for anything unknown
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => ConfigFormat::Yaml,
            Some("json") => ConfigFormat::Json,
            _ => ConfigFormat::Toml,
        }
    }
}

impl RulesConfig {
    /// Load configuration, format by extension
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules config from {}", path.display()))?;
        Self::from_str_with_format(&content, ConfigFormat::from_path(path))
            .with_context(|| format!("Failed to parse rules config from {}", path.display()))
    }

    pub fn from_str_with_format(content: &str, format: ConfigFormat) -> Result<Self> {
        let config: Self = match format {
            ConfigFormat::Toml => toml::from_str(content).context("Invalid TOML")?,
            ConfigFormat::Yaml => serde_yaml::from_str(content).context("Invalid YAML")?,
            ConfigFormat::Json => serde_json::from_str(content).context("Invalid JSON")?,
        };
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize rules config to TOML")?;

        std::fs::write(&path, content).with_context(|| {
            format!(
                "Failed to write rules config to {}",
                path.as_ref().display()
            )
        })?;

        Ok(())
    }

    /// Get rule configuration
    pub fn get_rule(&self, code: &str) -> Option<&RuleConfig> {
        self.rules.get(code)
    }

    /// Rules without a config entry are enabled
    pub fn is_rule_enabled(&self, code: &str) -> bool {
        self.get_rule(code).map(|r| r.enabled).unwrap_or(true)
    }

    /// Validate configuration, returns warnings
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut codes: Vec<&String> = self.rules.keys().collect();
        codes.sort();

        for code in codes {
            let Some(info) = BuiltinRules::info(code) else {
                warnings.push(format!("Unknown rule '{}'", code));
                continue;
            };

            let rule = &self.rules[code];
            let mut names: Vec<&String> = rule.parameters.keys().collect();
            names.sort();
            for name in names {
                if info.parameter(name).is_none() {
                    warnings.push(format!("Rule '{}' has unknown parameter '{}'", code, name));
                } else if rule.parameters[name].as_integer() == Some(0) {
                    warnings.push(format!("Rule '{}' parameter '{}' is zero", code, name));
                }
            }
        }

        for code in &self.fingerprint.codes {
            if BuiltinRules::info(code).is_none() {
                warnings.push(format!("Fingerprint code '{}' is not a known rule", code));
            }
        }

        if self.settings.threads == Some(0) {
            warnings.push("settings.threads is 0, the number of CPUs will be used".to_string());
        }

        warnings
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<()> {
        Self::default().save_to_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = RulesConfig::default();
        assert_eq!(config.rules.len(), 4);
        assert!(config.is_rule_enabled("IdenticalExpressions"));
        assert!(config.validate().is_empty());
        assert_eq!(config.settings.extensions, vec!["bsl", "os"]);
    }

    #[test]
    fn test_rule_severity_conversion() {
        let error: DiagnosticSeverity = RuleSeverity::Error.into();
        assert_eq!(error, DiagnosticSeverity::Error);

        let info: DiagnosticSeverity = RuleSeverity::Info.into();
        assert_eq!(info, DiagnosticSeverity::Information);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bsl-rules.toml");

        let mut config = RulesConfig::default();
        config.fingerprint.enabled = true;
        config.fingerprint.codes = vec!["IdenticalExpressions".to_string()];
        config.save_to_file(&path).unwrap();

        let loaded = RulesConfig::load_from_file(&path).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_formats_by_extension() {
        let dir = TempDir::new().unwrap();

        let yaml = dir.path().join("rules.yml");
        std::fs::write(
            &yaml,
            "rules:\n  IfConditionComplexity:\n    severity: hint\n    parameters:\n      maxIfConditionComplexity: 5\n",
        )
        .unwrap();
        let config = RulesConfig::load_from_file(&yaml).unwrap();
        let rule = config.get_rule("IfConditionComplexity").unwrap();
        assert_eq!(rule.severity, Some(RuleSeverity::Hint));
        assert_eq!(rule.parameters["maxIfConditionComplexity"].as_integer(), Some(5));
        // неуказанные правила включены
        assert!(config.is_rule_enabled("IdenticalExpressions"));

        let json = dir.path().join("rules.json");
        std::fs::write(
            &json,
            r#"{"rules": {"ParseError": {"enabled": false}}, "settings": {"fail_fast": true}}"#,
        )
        .unwrap();
        let config = RulesConfig::load_from_file(&json).unwrap();
        assert!(!config.is_rule_enabled("ParseError"));
        assert!(config.settings.fail_fast);
        assert_eq!(config.settings.extensions, vec!["bsl", "os"]);
    }

    #[test]
    fn test_broken_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "rules = 5").unwrap();
        let err = RulesConfig::load_from_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse rules config"));

        assert!(RulesConfig::load_from_file(dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = RulesConfig::default();
        config.rules.insert("NoSuchRule".to_string(), RuleConfig::default());
        let identical = config.rules.get_mut("IdenticalExpressions").unwrap();
        identical.parameters.insert("minExpressionSize".to_string(), toml::Value::Integer(0));
        identical.parameters.insert("typo".to_string(), toml::Value::Integer(1));
        config.settings.threads = Some(0);

        let warnings = config.validate();
        assert_eq!(
            warnings,
            vec![
                "Rule 'IdenticalExpressions' parameter 'minExpressionSize' is zero".to_string(),
                "Rule 'IdenticalExpressions' has unknown parameter 'typo'".to_string(),
                "Unknown rule 'NoSuchRule'".to_string(),
                "settings.threads is 0, the number of CPUs will be used".to_string(),
            ]
        );
    }
}
