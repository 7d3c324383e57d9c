//! Ошибки лексического и синтаксического разбора как замечания.

use anyhow::Result;

use super::{
    BslDiagnostic, DiagnosticContext, DiagnosticCriticality, DiagnosticInfo, DiagnosticTag,
    DiagnosticType,
};

pub const PARSE_ERROR_CODE: &str = "ParseError";

static INFO: DiagnosticInfo = DiagnosticInfo {
    code: PARSE_ERROR_CODE,
    name: "Source code parse error",
    diagnostic_type: DiagnosticType::Error,
    criticality: DiagnosticCriticality::Critical,
    minutes_to_fix: 5,
    tags: &[DiagnosticTag::Error],
    parameters: &[],
};

#[derive(Default)]
pub struct ParseErrorDiagnostic;

impl BslDiagnostic for ParseErrorDiagnostic {
    fn info(&self) -> &'static DiagnosticInfo {
        &INFO
    }

    fn check_file(&self, ctx: &mut DiagnosticContext<'_>) -> Result<()> {
        for error in ctx.tree.errors() {
            ctx.storage.add_range(error.range, format!("Parse error: {}", error.message));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticRunner;
    use crate::parser::BslParser;

    #[test]
    fn one_finding_per_error() {
        let result = BslParser::new().parse("Процедура А()\n  Б = ;\n  В = $;\nКонецПроцедуры");
        let found = DiagnosticRunner::from_passes(vec![Box::new(ParseErrorDiagnostic)])
            .run(&result.tree, "test.bsl");

        assert_eq!(found.len(), result.errors.len());
        assert!(found.len() >= 2);
        assert!(found.iter().all(|d| d.code == PARSE_ERROR_CODE && d.anchor.is_none()));
        assert_eq!(found[0].line(), 2);
        assert!(found[0].message.starts_with("Parse error: Expected expression"));
    }

    #[test]
    fn clean_source_has_no_findings() {
        let result = BslParser::new().parse("А = 1;");
        let found = DiagnosticRunner::from_passes(vec![Box::new(ParseErrorDiagnostic)])
            .run(&result.tree, "test.bsl");
        assert!(found.is_empty());
    }
}
