//! Группировка замечаний по отпечаткам блоков кода (режим 1С).
//!
//! Блоки: раздел переменных модуля, каждая процедура/функция и непустой
//! блок кода файла. Замечание относится к блоку, если строка его начала
//! попадает в строки блока (включительно).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree};
use crate::diagnostics::Diagnostic;

use super::{digest, fingerprint};

/// Зарезервированный хеш: файл не разобран
pub const PARSE_ERROR_HASH: &str = "ParseError";

/// Блок кода с диапазоном строк
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeBlock {
    pub node: NodeId,
    pub kind: SyntaxKind,
    pub first_line: usize,
    pub last_line: usize,
}

impl CodeBlock {
    pub fn contains_line(&self, line: usize) -> bool {
        line >= self.first_line && line <= self.last_line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDiagnostics {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
}

/// Замечания блока, сгруппированные по коду
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockFindings {
    pub hash: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_diagnostics: Vec<CodeDiagnostics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_hash: Option<String>,
}

/// Блоки верхнего уровня в порядке следования
pub fn code_blocks(tree: &SyntaxTree) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    for child in tree.children(tree.root()) {
        match tree.kind(child) {
            SyntaxKind::ModuleVars => push_block(tree, child, &mut blocks),
            SyntaxKind::Subs => {
                for sub in tree.children_of_kind(child, SyntaxKind::Sub) {
                    push_block(tree, sub, &mut blocks);
                }
            }
            SyntaxKind::FileCodeBlock => {
                if let Some(code) = tree.first_child_of_kind(child, SyntaxKind::CodeBlock) {
                    push_block(tree, code, &mut blocks);
                }
            }
            _ => {}
        }
    }
    blocks
}

fn push_block(tree: &SyntaxTree, node: NodeId, blocks: &mut Vec<CodeBlock>) {
    // пустой блок кода файла не имеет строк
    if let Some(span) = tree.span(node) {
        blocks.push(CodeBlock {
            node,
            kind: tree.kind(node),
            first_line: span.start.line,
            last_line: span.end.line,
        });
    }
}

/// Замечания по блокам; блоки без замечаний не попадают в результат.
///
/// `codes` ограничивает учитываемые коды замечаний, пустой список - все коды.
pub fn block_findings(tree: &SyntaxTree, diagnostics: &[Diagnostic], codes: &[String]) -> Vec<BlockFindings> {
    if tree.source().is_empty() {
        return Vec::new();
    }

    let blocks = code_blocks(tree);

    let qualifying: Vec<&Diagnostic> = diagnostics
        .iter()
        .filter(|d| codes.is_empty() || codes.iter().any(|c| c == &d.code))
        .collect();

    let mut result = Vec::new();
    for block in &blocks {
        let mut by_code: BTreeMap<&str, Vec<Diagnostic>> = BTreeMap::new();
        for diagnostic in qualifying.iter().filter(|d| block.contains_line(d.line())) {
            by_code.entry(diagnostic.code.as_str()).or_default().push((*diagnostic).clone());
        }
        if by_code.is_empty() {
            continue;
        }

        let code_diagnostics = by_code
            .into_iter()
            .map(|(code, mut diagnostics)| {
                diagnostics.sort_by_key(|d| (d.line(), d.column()));
                CodeDiagnostics { code: code.to_string(), diagnostics }
            })
            .collect();

        result.push(BlockFindings {
            hash: fingerprint(tree, block.node),
            code_diagnostics,
            file_hash: None,
        });
    }

    // не выделено ни одного блока: файл целиком под зарезервированным хешем
    if blocks.is_empty() && tree.has_errors() {
        result.push(BlockFindings {
            hash: PARSE_ERROR_HASH.to_string(),
            code_diagnostics: Vec::new(),
            file_hash: Some(digest(tree.source())),
        });
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{DiagnosticSeverity, DiagnosticRunner, IdenticalExpressionsDiagnostic, ParseErrorDiagnostic};
    use crate::core::position::{Position, Span};
    use crate::parser::BslParser;
    use pretty_assertions::assert_eq;

    const MODULE: &str = "Перем А;\n\
                          \n\
                          Процедура Первая()\n\
                          \tЕсли х = х Тогда\n\
                          \tКонецЕсли;\n\
                          КонецПроцедуры\n\
                          \n\
                          Функция Вторая()\n\
                          \tВозврат 1;\n\
                          КонецФункции\n\
                          \n\
                          Б = в <> в;\n";

    fn diagnostic(code: &str, line: usize, column: usize) -> Diagnostic {
        Diagnostic {
            code: code.to_string(),
            message: String::new(),
            severity: DiagnosticSeverity::Warning,
            range: Span::point(Position::new(line, column, 0)),
            anchor: None,
        }
    }

    #[test]
    fn blocks_and_line_ranges() {
        let result = BslParser::new().parse(MODULE);
        let blocks = code_blocks(&result.tree);
        let summary: Vec<(SyntaxKind, usize, usize)> =
            blocks.iter().map(|b| (b.kind, b.first_line, b.last_line)).collect();
        assert_eq!(
            summary,
            vec![
                (SyntaxKind::ModuleVars, 1, 1),
                (SyntaxKind::Sub, 3, 6),
                (SyntaxKind::Sub, 8, 10),
                (SyntaxKind::CodeBlock, 12, 12),
            ]
        );
    }

    #[test]
    fn findings_grouped_per_block_and_sparse() {
        let result = BslParser::new().parse(MODULE);
        let runner = DiagnosticRunner::from_passes(vec![Box::new(IdenticalExpressionsDiagnostic::default())]);
        let diagnostics = runner.run(&result.tree, "module.bsl");
        assert_eq!(diagnostics.len(), 2);

        let blocks = block_findings(&result.tree, &diagnostics, &[]);
        assert_eq!(blocks.len(), 2, "the function and module vars have no findings");
        assert!(blocks.iter().all(|b| b.hash.len() == 40 && b.file_hash.is_none()));
        assert_eq!(blocks[0].code_diagnostics[0].code, "IdenticalExpressions");
        assert_eq!(blocks[0].code_diagnostics[0].diagnostics[0].line(), 4);
        assert_eq!(blocks[1].code_diagnostics[0].diagnostics[0].line(), 12);

        let all = code_blocks(&result.tree);
        assert_eq!(blocks[0].hash, fingerprint(&result.tree, all[1].node));
    }

    #[test]
    fn codes_sorted_and_filtered() {
        let result = BslParser::new().parse(MODULE);
        let diagnostics = vec![
            diagnostic("Zeta", 5, 1),
            diagnostic("Alpha", 4, 9),
            diagnostic("Alpha", 4, 2),
            diagnostic("Other", 20, 1),
        ];

        let blocks = block_findings(&result.tree, &diagnostics, &[]);
        assert_eq!(blocks.len(), 1);
        let codes: Vec<&str> = blocks[0].code_diagnostics.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["Alpha", "Zeta"]);
        let columns: Vec<usize> = blocks[0].code_diagnostics[0].diagnostics.iter().map(|d| d.column()).collect();
        assert_eq!(columns, vec![2, 9]);

        let filtered = block_findings(&result.tree, &diagnostics, &["Zeta".to_string()]);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].code_diagnostics.len(), 1);
        assert!(block_findings(&result.tree, &diagnostics, &["Missing".to_string()]).is_empty());
    }

    #[test]
    fn moved_block_keeps_hash() {
        let moved = format!("\n\n// сдвиг\n{}", MODULE.replace("Перем А;\n", ""));
        let a = BslParser::new().parse(MODULE);
        let b = BslParser::new().parse(&moved);
        let runner = DiagnosticRunner::from_passes(vec![Box::new(IdenticalExpressionsDiagnostic::default())]);
        let fa = block_findings(&a.tree, &runner.run(&a.tree, "a.bsl"), &[]);
        let fb = block_findings(&b.tree, &runner.run(&b.tree, "b.bsl"), &[]);
        assert_eq!(fa[0].hash, fb[0].hash);
        assert_ne!(fa[0].code_diagnostics[0].diagnostics[0].line(), fb[0].code_diagnostics[0].diagnostics[0].line());
    }

    #[test]
    fn unparsable_file_gets_reserved_hash() {
        // ни одного токена, только ошибки лексера
        let source = "$ $\n";
        let result = BslParser::new().parse(source);
        assert!(result.has_errors());
        let runner = DiagnosticRunner::from_passes(vec![Box::new(ParseErrorDiagnostic)]);
        let blocks = block_findings(&result.tree, &runner.run(&result.tree, "x.bsl"), &[]);
        assert_eq!(
            blocks,
            vec![BlockFindings {
                hash: PARSE_ERROR_HASH.to_string(),
                code_diagnostics: Vec::new(),
                file_hash: Some(digest(source)),
            }]
        );
    }

    #[test]
    fn partially_parsed_code_block_keeps_findings() {
        let source = "Х = а = а;\nУ = ;\n";
        let result = BslParser::new().parse(source);
        assert!(result.has_errors());
        let runner = DiagnosticRunner::from_passes(vec![
            Box::new(IdenticalExpressionsDiagnostic::default()),
            Box::new(ParseErrorDiagnostic),
        ]);
        let diagnostics = runner.run(&result.tree, "x.bsl");

        let blocks = block_findings(&result.tree, &diagnostics, &[]);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].hash, fingerprint(&result.tree, code_blocks(&result.tree)[0].node));
        assert_eq!(blocks[0].file_hash, None);
        let codes: Vec<&str> = blocks[0].code_diagnostics.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, vec!["IdenticalExpressions", "ParseError"]);
        assert_eq!(blocks[0].code_diagnostics[0].diagnostics[0].line(), 1);
    }

    #[test]
    fn empty_file_is_skipped() {
        let result = BslParser::new().parse("");
        assert!(block_findings(&result.tree, &[diagnostic("X", 1, 1)], &[]).is_empty());
        let comments = BslParser::new().parse("// только комментарий\n");
        assert!(code_blocks(&comments.tree).is_empty());
    }
}
