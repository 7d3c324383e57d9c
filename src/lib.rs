/*!
# BSL Analyzer Core

Static analyzer for 1C:Enterprise / OneScript BSL sources: a fault-tolerant
parser, a pluggable diagnostic runner with the redundant-expression check,
and structural fingerprints of code blocks for cross-version deduplication
of findings.

## Architecture

```text
BSL Analyzer Core
├── Parser          - logos lexer, recursive descent grammar
├── AST Core        - arena CST, visitor, preorder traversal
├── Expression Tree - binary tree rewrite and structural comparer
├── Diagnostics     - diagnostic contract, runner, built-in checks
├── Fingerprint     - canonical form, SHA-1, per-block findings
├── Rules           - TOML/YAML/JSON rule configuration
├── Analyzer        - parallel batch engine
└── Reports         - console and JSON output
```

## Usage

### CLI
```bash
# Analyze ./src of the workspace, print to console and write bsl-json.json
bsl-analyzer analyze --workspace-dir . --src-dir src --reporter console,json

# Group findings by code block fingerprints
bsl-analyzer analyze -w . -s src --fingerprint --reporter json

# Print fingerprints of one module
bsl-analyzer fingerprint ./Module.bsl --canonical
```

### Library
```rust
use bsl_analyzer_core::analyze_text;

let diagnostics = analyze_text("Если а = а Тогда\nКонецЕсли;").unwrap();
assert_eq!(diagnostics[0].code, "IdenticalExpressions");
```
*/

pub mod analyzer;
pub mod ast_core;
pub mod cli_common;
pub mod core;
pub mod diagnostics;
pub mod expression_tree;
pub mod fingerprint;
pub mod parser;
pub mod reports;
pub mod rules;

// Re-export main types for convenience
pub use analyzer::{AnalysisEngine, AnalysisOptions};
pub use ast_core::{NodeId, SyntaxKind, SyntaxTree};
pub use self::core::{AnalysisInfo, AnalyzerError, AnalyzerResult, FileInfo, Position, Span};
pub use diagnostics::{Diagnostic, DiagnosticRunner, DiagnosticSeverity};
pub use fingerprint::{BlockFindings, Fingerprint};
pub use parser::{BslParser, ParseResult};
pub use reports::{ReportFormat, ReportManager};
pub use rules::{RulesConfig, RulesManager};

use anyhow::Result;

/// Analyze a single module text with the default rule set
pub fn analyze_text(text: &str) -> Result<Vec<Diagnostic>> {
    let runner = RulesManager::new().build_runner()?;
    let parsed = BslParser::new().parse(text);
    Ok(runner.run(&parsed.tree, "<text>"))
}

/// Analyze a single BSL file with the default rule set
pub fn analyze_file<P: AsRef<std::path::Path>>(file_path: P) -> Result<Vec<Diagnostic>> {
    let runner = RulesManager::new().build_runner()?;
    let parsed = BslParser::new().parse_file(file_path.as_ref())?;
    Ok(runner.run(&parsed.tree, &file_path.as_ref().display().to_string()))
}
