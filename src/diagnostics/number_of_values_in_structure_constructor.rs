//! Слишком много значений в конструкторе структуры.

use anyhow::Result;
use std::collections::HashMap;

use crate::ast_core::{NodeId, SyntaxKind, VisitControl};

use super::{
    usize_parameter, BslDiagnostic, DiagnosticContext, DiagnosticCriticality, DiagnosticInfo,
    DiagnosticParameter, DiagnosticTag, DiagnosticType,
};

const MAX_VALUES_COUNT: usize = 3;

static INFO: DiagnosticInfo = DiagnosticInfo {
    code: "NumberOfValuesInStructureConstructor",
    name: "Limit on the number of property values passed to the structure constructor",
    diagnostic_type: DiagnosticType::CodeSmell,
    criticality: DiagnosticCriticality::Minor,
    minutes_to_fix: 10,
    tags: &[DiagnosticTag::Standard, DiagnosticTag::BrainOverload],
    parameters: &[DiagnosticParameter {
        name: "maxValuesCount",
        description: "Allowed number of values passed to the constructor",
        default_value: MAX_VALUES_COUNT as i64,
    }],
};

const STRUCTURE_TYPES: &[&str] = &["структура", "structure", "фиксированнаяструктура", "fixedstructure"];

pub struct NumberOfValuesInStructureConstructorDiagnostic {
    max_values_count: usize,
}

impl Default for NumberOfValuesInStructureConstructorDiagnostic {
    fn default() -> Self {
        Self { max_values_count: MAX_VALUES_COUNT }
    }
}

impl BslDiagnostic for NumberOfValuesInStructureConstructorDiagnostic {
    fn info(&self) -> &'static DiagnosticInfo {
        &INFO
    }

    fn node_kinds(&self) -> &'static [SyntaxKind] {
        &[SyntaxKind::NewExpression]
    }

    fn configure(&mut self, parameters: &HashMap<String, toml::Value>) -> Result<()> {
        if let Some(count) = usize_parameter(parameters, "maxValuesCount")? {
            self.max_values_count = count;
        }
        Ok(())
    }

    fn visit(&self, ctx: &mut DiagnosticContext<'_>, node: NodeId) -> Result<VisitControl> {
        let tree = ctx.tree;

        let Some(type_name) = tree.first_child_of_kind(node, SyntaxKind::TypeName) else {
            return Ok(VisitControl::Continue);
        };
        let type_name = tree.text(type_name).to_lowercase();
        if !STRUCTURE_TYPES.contains(&type_name.as_str()) {
            return Ok(VisitControl::Continue);
        }

        // первый параметр - строка ключей, остальные - значения
        let params = tree
            .first_child_of_kind(node, SyntaxKind::DoCall)
            .and_then(|call| tree.first_child_of_kind(call, SyntaxKind::CallParamList))
            .map(|list| tree.children_of_kind(list, SyntaxKind::CallParam).count())
            .unwrap_or(0);

        if params > self.max_values_count + 1 {
            ctx.storage.add(
                tree,
                node,
                format!(
                    "Pass no more than {} values to the structure constructor, use Insert() for the rest",
                    self.max_values_count
                ),
            );
        }
        Ok(VisitControl::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{Diagnostic, DiagnosticRunner};
    use crate::parser::BslParser;

    fn check_with(source: &str, diagnostic: NumberOfValuesInStructureConstructorDiagnostic) -> Vec<Diagnostic> {
        let result = BslParser::new().parse(source);
        assert!(result.errors.is_empty(), "{:?}", result.errors);
        DiagnosticRunner::from_passes(vec![Box::new(diagnostic)]).run(&result.tree, "test.bsl")
    }

    #[test]
    fn counts_values_after_keys() {
        let d = || NumberOfValuesInStructureConstructorDiagnostic::default();
        assert!(check_with("С = Новый Структура(\"А,Б,В\", 1, 2, 3);", d()).is_empty());
        assert_eq!(check_with("С = Новый Структура(\"А,Б,В,Г\", 1, 2, 3, 4);", d()).len(), 1);
        assert_eq!(check_with("С = New FixedStructure(\"А,Б,В,Г\", 1, 2, 3, 4);", d()).len(), 1);
        assert_eq!(check_with("С = Новый ФИКСИРОВАННАЯСТРУКТУРА(\"А\", 1, , 3, 4);", d()).len(), 1);
        assert!(check_with("С = Новый Массив(1, 2, 3, 4, 5);", d()).is_empty());
        assert!(check_with("С = Новый Структура;", d()).is_empty());
    }

    #[test]
    fn nested_constructors_are_visited() {
        let found = check_with(
            "С = Новый Структура(\"А\", Новый Структура(\"А,Б,В,Г,Д\", 1, 2, 3, 4, 5));",
            NumberOfValuesInStructureConstructorDiagnostic::default(),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].column(), 26);
    }

    #[test]
    fn limit_is_configurable() {
        let mut diagnostic = NumberOfValuesInStructureConstructorDiagnostic::default();
        let mut params = HashMap::new();
        params.insert("maxValuesCount".to_string(), toml::Value::Integer(1));
        diagnostic.configure(&params).unwrap();
        let found = check_with("С = Новый Структура(\"А,Б\", 1, 2);", diagnostic);
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains("no more than 1"));
    }
}
