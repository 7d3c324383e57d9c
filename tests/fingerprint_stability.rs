/*!
# Fingerprint Stability Tests

Блоки, которые не менялись по смыслу, сохраняют хэш между версиями модуля:
перестановка процедур, комментарии, отступы и сдвиг строк на него не влияют.
*/

use bsl_analyzer_core::fingerprint::{block_findings, code_blocks, Fingerprint, PARSE_ERROR_HASH};
use bsl_analyzer_core::{analyze_text, BslParser, SyntaxKind};
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

const V1: &str = "\
Перем Кэш;

Процедура Первая()
\tБ = в = в;
КонецПроцедуры

Функция Вторая(х)
\tВозврат х + 1;
КонецФункции
";

const V2: &str = "\
Перем   Кэш;

// вторая теперь выше
Функция Вторая(х)
    Возврат х + 1; // без изменений
КонецФункции



Процедура Первая()
    Б = в   =   в;
КонецПроцедуры
";

fn hashes(source: &str) -> BTreeSet<String> {
    let parsed = BslParser::new().parse(source);
    assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
    code_blocks(&parsed.tree)
        .iter()
        .map(|block| Fingerprint::of(&parsed.tree, block.node).hash)
        .collect()
}

#[test]
fn reordered_and_reformatted_module_keeps_hashes() {
    let v1 = hashes(V1);
    assert_eq!(v1.len(), 3);
    assert_eq!(v1, hashes(V2));
}

#[test]
fn edited_block_changes_only_its_hash() {
    let v3 = V1.replace("Возврат х + 1;", "Возврат х + 2;");
    let v1 = hashes(V1);
    let v3 = hashes(&v3);

    assert_eq!(v1.intersection(&v3).count(), 2);
    assert_eq!(v1.difference(&v3).count(), 1);
}

#[test]
fn findings_follow_their_block() {
    let findings_of = |source: &str| {
        let parsed = BslParser::new().parse(source);
        let diagnostics = analyze_text(source).unwrap();
        block_findings(&parsed.tree, &diagnostics, &[])
    };

    let v1 = findings_of(V1);
    let v2 = findings_of(V2);

    assert_eq!(v1.len(), 1);
    assert_eq!(v1[0].hash, v2[0].hash);
    assert_eq!(v1[0].code_diagnostics[0].code, "IdenticalExpressions");
    // строки разные, ключ один
    assert_eq!(v1[0].code_diagnostics[0].diagnostics[0].line(), 4);
    assert_eq!(v2[0].code_diagnostics[0].diagnostics[0].line(), 11);
}

#[test]
fn block_kinds_in_source_order() {
    let parsed = BslParser::new().parse(V1);
    let kinds: Vec<SyntaxKind> = code_blocks(&parsed.tree).iter().map(|b| b.kind).collect();
    assert_eq!(kinds, vec![SyntaxKind::ModuleVars, SyntaxKind::Sub, SyntaxKind::Sub]);

    let lines: Vec<(usize, usize)> =
        code_blocks(&parsed.tree).iter().map(|b| (b.first_line, b.last_line)).collect();
    assert_eq!(lines, vec![(1, 1), (3, 5), (7, 9)]);
}

#[test]
fn broken_file_keeps_block_hash() {
    let source = "А = а = а;\nБ = (1;\n";
    let parsed = BslParser::new().parse(source);
    assert!(parsed.has_errors());

    let findings = block_findings(&parsed.tree, &analyze_text(source).unwrap(), &[]);
    assert_eq!(findings.len(), 1);
    assert_ne!(findings[0].hash, PARSE_ERROR_HASH);
    let codes: Vec<&str> = findings[0].code_diagnostics.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes, vec!["IdenticalExpressions", "ParseError"]);
}

#[test]
fn file_without_blocks_is_hashed_whole() {
    let parsed = BslParser::new().parse("$");
    assert!(parsed.has_errors());
    assert!(code_blocks(&parsed.tree).is_empty());

    let findings = block_findings(&parsed.tree, &analyze_text("$").unwrap(), &[]);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].hash, PARSE_ERROR_HASH);
    assert!(findings[0].code_diagnostics.is_empty());
    assert!(findings[0].file_hash.is_some());
}
