//! Одинаковые выражения слева и справа от бинарного оператора.
//!
//! Выражение нормализуется в семантическое дерево, из него собираются все
//! бинарные операции, и для каждой проверяется: равны ли операнды, либо не
//! повторяется ли левый операнд дальше в правой цепочке той же связки `И`/`ИЛИ`.

use anyhow::Result;
use std::collections::HashMap;

use crate::ast_core::{NodeId, SyntaxKind, SyntaxTree, VisitControl};
use crate::expression_tree::{
    BinaryOperationNode, BslExpression, BslOperator, ExpressionTreeBuilder, NodeEqualityComparer,
    TransitiveOperationsIgnoringComparer,
};

use super::{
    usize_parameter, BslDiagnostic, DiagnosticContext, DiagnosticCriticality, DiagnosticInfo,
    DiagnosticParameter, DiagnosticTag, DiagnosticType,
};

const MIN_EXPRESSION_SIZE: usize = 3;

static INFO: DiagnosticInfo = DiagnosticInfo {
    code: "IdenticalExpressions",
    name: "There are identical sub-expressions to the left and to the right of the operator",
    diagnostic_type: DiagnosticType::Error,
    criticality: DiagnosticCriticality::Major,
    minutes_to_fix: 5,
    tags: &[DiagnosticTag::Suspicious],
    parameters: &[DiagnosticParameter {
        name: "minExpressionSize",
        description: "Minimal number of grammar children for an expression to be checked",
        default_value: MIN_EXPRESSION_SIZE as i64,
    }],
};

pub struct IdenticalExpressionsDiagnostic {
    min_expression_size: usize,
}

impl Default for IdenticalExpressionsDiagnostic {
    fn default() -> Self {
        Self { min_expression_size: MIN_EXPRESSION_SIZE }
    }
}

impl BslDiagnostic for IdenticalExpressionsDiagnostic {
    fn info(&self) -> &'static DiagnosticInfo {
        &INFO
    }

    fn node_kinds(&self) -> &'static [SyntaxKind] {
        &[SyntaxKind::Expression]
    }

    fn configure(&mut self, parameters: &HashMap<String, toml::Value>) -> Result<()> {
        if let Some(size) = usize_parameter(parameters, "minExpressionSize")? {
            self.min_expression_size = size;
        }
        Ok(())
    }

    fn visit(&self, ctx: &mut DiagnosticContext<'_>, node: NodeId) -> Result<VisitControl> {
        let tree = ctx.tree;

        // слишком короткое выражение само не проверяем, но вложенные (аргументы, скобки) - да
        if tree.child_count(node) < self.min_expression_size {
            return Ok(VisitControl::Continue);
        }

        let Some(expression) = ExpressionTreeBuilder::new(tree).build(node) else {
            return Ok(VisitControl::Continue);
        };

        let comparer =
            TransitiveOperationsIgnoringComparer::new(tree).logical_operations_as_transitive(true);

        for binary in flatten_binary_operations(&expression) {
            if check_equality(&comparer, binary) {
                let message = format!(
                    "The same expression on both sides of the \"{}\" operator: {}",
                    tree.text(binary.node),
                    some_text(tree, binary)
                );
                ctx.storage.add(tree, node, message);
            }
        }

        // вложенные выражения уже вошли в семантическое дерево
        Ok(VisitControl::SkipChildren)
    }
}

fn check_equality(comparer: &impl NodeEqualityComparer, node: &BinaryOperationNode) -> bool {
    if comparer.are_equal(&node.left, &node.right) {
        return true;
    }

    if !is_complementary(node) {
        return false;
    }

    // левый операнд не должен встречаться ни в одном звене правой цепочки
    let searchable = node.left.as_ref();
    let mut link = node.right.as_binary();
    while let Some(current) = link {
        if comparer.are_equal(searchable, &current.left)
            || comparer.are_equal(searchable, &current.right)
        {
            return true;
        }
        link = if is_complementary(current) { current.right.as_binary() } else { None };
    }
    false
}

/// `a И (b И ...)` / `a ИЛИ (b ИЛИ ...)`
fn is_complementary(node: &BinaryOperationNode) -> bool {
    node.operator.is_logical()
        && node.right.as_binary().map(|right| right.operator == node.operator).unwrap_or(false)
}

/// Левый операнд, иначе правый, иначе вся операция
fn some_text<'t>(tree: &'t SyntaxTree, node: &BinaryOperationNode) -> &'t str {
    for range in [node.left.range(), node.right.range(), node.range] {
        if !range.is_empty() {
            return tree.range_text(range);
        }
    }
    ""
}

fn flatten_binary_operations(expression: &BslExpression) -> Vec<&BinaryOperationNode> {
    let mut list = Vec::new();
    gather_binary_operations(&mut list, expression);
    list
}

fn gather_binary_operations<'e>(list: &mut Vec<&'e BinaryOperationNode>, expression: &'e BslExpression) {
    match expression {
        BslExpression::Call(call) => {
            for argument in &call.arguments {
                gather_binary_operations(list, argument);
            }
        }
        BslExpression::Unary(unary) => gather_binary_operations(list, &unary.operand),
        BslExpression::Ternary(ternary) => {
            gather_binary_operations(list, &ternary.condition);
            gather_binary_operations(list, &ternary.true_part);
            gather_binary_operations(list, &ternary.false_part);
        }
        BslExpression::Binary(binary) => {
            // операнды разыменования и индекса не сравниваем
            if matches!(binary.operator, BslOperator::Dereference | BslOperator::IndexAccess) {
                return;
            }
            // а + а и а * а - не ошибка
            if !matches!(binary.operator, BslOperator::Add | BslOperator::Multiply) {
                list.push(binary);
            }
            gather_binary_operations(list, &binary.left);
            gather_binary_operations(list, &binary.right);
        }
        BslExpression::Terminal(_) => {}
    }
}
