/*!
# BSL Parser

Front end for BSL (1C:Enterprise / OneScript) sources: `logos` lexer plus a
recursive descent parser that produces the arena CST from [`crate::ast_core`].

## Usage

```rust
use bsl_analyzer_core::parser::BslParser;

let result = BslParser::new().parse(r#"
    Процедура ТестоваяПроцедура() Экспорт
        Сообщить("Тест");
    КонецПроцедуры
"#);
assert!(result.errors.is_empty());
```
*/

pub mod grammar;
pub mod lexer;

pub use lexer::{BslLexer, Token, TokenType};

use anyhow::{Context, Result};
use std::path::Path;

use crate::ast_core::{SyntaxError, SyntaxTree};
use crate::core::fs_utils::{read_bsl_file, strip_bom};

/// Результат разбора: дерево строится всегда, ошибки идут отдельным списком
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub tree: SyntaxTree,
    pub errors: Vec<SyntaxError>,
}

impl ParseResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Main BSL parser
#[derive(Debug, Default, Clone, Copy)]
pub struct BslParser {
    lexer: BslLexer,
}

impl BslParser {
    pub fn new() -> Self {
        Self { lexer: BslLexer::new() }
    }

    /// Parses BSL code from string
    pub fn parse(&self, text: &str) -> ParseResult {
        let source = strip_bom(text);
        let lexed = self.lexer.tokenize(source);

        let mut parser = grammar::Parser::new(source, &lexed.tokens);
        for error in &lexed.errors {
            parser.report(format!("Unexpected character '{}'", error.text), error.position);
        }
        let tree = parser.parse_file();

        tracing::trace!(
            "Parsed {} tokens into {} nodes, {} error(s)",
            tree.tokens().len(),
            tree.len(),
            tree.errors().len()
        );

        let errors = tree.errors().to_vec();
        ParseResult { tree, errors }
    }

    /// Parses BSL file with encoding detection and BOM handling
    pub fn parse_file<P: AsRef<Path>>(&self, file_path: P) -> Result<ParseResult> {
        let content = read_bsl_file(file_path.as_ref())
            .with_context(|| format!("Failed to read file: {}", file_path.as_ref().display()))?;
        Ok(self.parse(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast_core::SyntaxKind;

    #[test]
    fn bom_is_stripped() {
        let result = BslParser::new().parse("\u{FEFF}А = 1;");
        assert!(!result.has_errors());
        assert_eq!(result.tree.source(), "А = 1;");
        assert_eq!(result.tree.tokens()[0].start.column, 1);
    }

    #[test]
    fn lexical_errors_become_parse_errors() {
        let result = BslParser::new().parse("А = 1;\nБ = $;");
        assert!(result.has_errors());
        assert!(result.errors[0].message.contains("'$'"));
        assert_eq!(result.errors[0].range.start.line, 2);
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Модуль.bsl");
        std::fs::write(&path, "Процедура А()\nКонецПроцедуры").unwrap();

        let result = BslParser::new().parse_file(&path).unwrap();
        assert_eq!(result.tree.count_kind(SyntaxKind::Sub), 1);
    }
}
