//! Слишком сложное условие в `Если` / `ИначеЕсли`.

use anyhow::Result;
use std::collections::HashMap;

use crate::ast_core::{preorder, NodeId, SyntaxKind, VisitControl};

use super::{
    usize_parameter, BslDiagnostic, DiagnosticContext, DiagnosticCriticality, DiagnosticInfo,
    DiagnosticParameter, DiagnosticTag, DiagnosticType,
};

const MAX_IF_CONDITION_COMPLEXITY: usize = 3;

static INFO: DiagnosticInfo = DiagnosticInfo {
    code: "IfConditionComplexity",
    name: "Usage of complex expressions in the \"If\" condition",
    diagnostic_type: DiagnosticType::CodeSmell,
    criticality: DiagnosticCriticality::Minor,
    minutes_to_fix: 5,
    tags: &[DiagnosticTag::BrainOverload],
    parameters: &[DiagnosticParameter {
        name: "maxIfConditionComplexity",
        description: "Acceptable number of logical operations in a condition",
        default_value: MAX_IF_CONDITION_COMPLEXITY as i64,
    }],
};

pub struct IfConditionComplexityDiagnostic {
    max_if_condition_complexity: usize,
}

impl Default for IfConditionComplexityDiagnostic {
    fn default() -> Self {
        Self { max_if_condition_complexity: MAX_IF_CONDITION_COMPLEXITY }
    }
}

impl BslDiagnostic for IfConditionComplexityDiagnostic {
    fn info(&self) -> &'static DiagnosticInfo {
        &INFO
    }

    fn node_kinds(&self) -> &'static [SyntaxKind] {
        &[SyntaxKind::IfBranch, SyntaxKind::ElsifBranch]
    }

    fn configure(&mut self, parameters: &HashMap<String, toml::Value>) -> Result<()> {
        if let Some(max) = usize_parameter(parameters, "maxIfConditionComplexity")? {
            self.max_if_condition_complexity = max;
        }
        Ok(())
    }

    fn visit(&self, ctx: &mut DiagnosticContext<'_>, node: NodeId) -> Result<VisitControl> {
        let tree = ctx.tree;
        let Some(condition) = tree.first_child_of_kind(node, SyntaxKind::Expression) else {
            return Ok(VisitControl::Continue);
        };

        let operations = preorder(tree, condition)
            .filter(|id| tree.kind(*id) == SyntaxKind::BoolOperation)
            .count();

        if operations > self.max_if_condition_complexity {
            ctx.storage.add(
                tree,
                condition,
                format!(
                    "Simplify the condition: {} logical operations, at most {} allowed",
                    operations, self.max_if_condition_complexity
                ),
            );
        }
        Ok(VisitControl::Continue)
    }
}
