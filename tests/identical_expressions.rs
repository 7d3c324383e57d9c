/*!
# Identical Expressions End-to-End Tests

Parser, runner and default rule set together, the way the CLI runs them.
*/

use bsl_analyzer_core::diagnostics::{DiagnosticRunner, IdenticalExpressionsDiagnostic};
use bsl_analyzer_core::rules::{RuleConfig, RulesConfig, RulesManager};
use bsl_analyzer_core::{analyze_text, BslParser, Diagnostic, DiagnosticSeverity};
use pretty_assertions::assert_eq;

const MODULE: &str = "\
Функция Первая(а)
    Если а = а Тогда
        Возврат 1;
    КонецЕсли;
    Возврат 0;
КонецФункции

Функция Вторая(а)
    Если а > 0 Тогда
        Возврат 1;
    КонецЕсли;
    Возврат 0;
КонецФункции
";

fn codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics.iter().map(|d| d.code.as_str()).collect()
}

#[test]
fn condition_with_same_operands_is_reported() {
    let diagnostics = analyze_text(MODULE).unwrap();

    assert_eq!(codes(&diagnostics), vec!["IdenticalExpressions"]);
    let found = &diagnostics[0];
    assert_eq!((found.line(), found.column()), (2, 10));
    assert_eq!(found.severity, DiagnosticSeverity::Error);
    assert_eq!(found.message, "The same expression on both sides of the \"=\" operator: а");
}

#[test]
fn sibling_function_is_clean() {
    let diagnostics = analyze_text(MODULE).unwrap();
    assert!(diagnostics.iter().all(|d| d.line() < 8));
}

#[test]
fn logical_chains_and_arithmetic() {
    let source = "\
Процедура Проверка()
    Х = а ИЛИ б ИЛИ а;
    Х = (а И б) ИЛИ (б И а);
    Х = а + б = б + а;
    Х = Ф(а) - Ф(а);
КонецПроцедуры
";
    let lines: Vec<usize> = analyze_text(source).unwrap().iter().map(|d| d.line()).collect();
    assert_eq!(lines, vec![2, 3, 5]);
}

#[test]
fn rule_can_be_disabled() {
    let mut config = RulesConfig::default();
    config.rules.insert(
        "IdenticalExpressions".to_string(),
        RuleConfig { enabled: false, ..RuleConfig::default() },
    );

    let runner = RulesManager::new_with_config(config).build_runner().unwrap();
    let parsed = BslParser::new().parse(MODULE);
    assert!(runner.run(&parsed.tree, "Module.bsl").is_empty());
}

#[test]
fn runner_with_single_pass() {
    let parsed = BslParser::new().parse("Если а <> а ИЛИ б Тогда\nКонецЕсли;");
    let runner = DiagnosticRunner::from_passes(vec![Box::new(IdenticalExpressionsDiagnostic::default())]);

    let found = runner.run(&parsed.tree, "Module.bsl");
    assert_eq!(codes(&found), vec!["IdenticalExpressions"]);
    assert!(found[0].message.contains("\"<>\""));
}
